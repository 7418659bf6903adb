//! Order-independent query chains.
//!
//! A [`Table`] is the long-lived entry point: it owns the table name, optional
//! column metadata, the hook registry and the error handler. Every call to
//! [`Table::query`] starts a fresh [`Chain`] that owns its own
//! [`QueryIntent`], so chains started concurrently from one table never share
//! state.
//!
//! Clause families can be called in any order; the compiler renders them in
//! SQL order:
//!
//! ```rust,ignore
//! let users = Table::new("users")?;
//!
//! let rows: Vec<Record> = users
//!     .query()
//!     .limit().to(5)
//!     .filter().field("age").is(30)
//!     .order().by("name")
//!     .select().fields(["id", "name"])
//!     .all(&client)
//!     .await?
//!     .into_result()?;
//! // SELECT id, name FROM users WHERE age = $1 ORDER BY name LIMIT 5
//! ```
//!
//! # Scoping
//!
//! `Chain<S>` tracks at the type level whether a WHERE condition was added:
//! [`Open`] chains can `insert`, `update_all` and `delete_all`; [`Scoped`]
//! chains can `update` and `delete`.

mod clauses;

#[cfg(test)]
mod tests;

pub use clauses::{
    ConditionSink, FieldStep, Filter, Group, GroupBuilder, Having, HavingSink, Join, Limit, Order,
    Select, Union, WhereSink,
};

use crate::compiler::{Compiled, compile};
use crate::condition::Connector;
use crate::error::{OrmError, OrmResult};
use crate::gateway::Gateway;
use crate::hook::{
    Completion, ErrorHandler, HookRegistry, HookTarget, LoggingErrorHandler, Operation, Outcome,
    Pipeline, PipelineConfig,
};
use crate::ident;
use crate::intent::QueryIntent;
use crate::meta::TableMeta;
use crate::row::FromRow;
use crate::value::Payload;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Chain state: no WHERE condition yet.
#[derive(Debug, Clone, Copy)]
pub struct Open;

/// Chain state: at least one WHERE condition.
#[derive(Debug, Clone, Copy)]
pub struct Scoped;

/// A table and everything shared by the chains started from it.
pub struct Table {
    name: String,
    meta: Option<TableMeta>,
    hooks: HookRegistry,
    handler: Arc<dyn ErrorHandler>,
    config: PipelineConfig,
}

impl Table {
    /// Create a table handle.
    ///
    /// `name` is a table reference with an optional alias (`users`,
    /// `public.users`, `users u`). Anything else is rejected.
    pub fn new(name: impl Into<String>) -> OrmResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(OrmError::invalid_query("table name cannot be empty"));
        }
        let name = ident::table_ref(&name)?;
        Ok(Self {
            name,
            meta: None,
            hooks: HookRegistry::new(),
            handler: Arc::new(LoggingErrorHandler),
            config: PipelineConfig::default(),
        })
    }

    /// Attach column metadata for operand type checks.
    pub fn with_meta(mut self, meta: TableMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Replace the default [`LoggingErrorHandler`].
    pub fn with_error_handler<H: ErrorHandler + 'static>(mut self, handler: H) -> Self {
        self.handler = Arc::new(handler);
        self
    }

    /// Replace the error handler with a shared one.
    pub fn with_error_handler_arc(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meta(&self) -> Option<&TableMeta> {
        self.meta.as_ref()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Hooks run by every chain of this table.
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Start a new chain with an empty intent.
    pub fn query(&self) -> Chain<'_, Open> {
        Chain {
            table: self,
            intent: QueryIntent::for_table(self.name.clone()),
            pending: None,
            _state: PhantomData,
        }
    }

    fn pipeline(&self) -> Pipeline<'_> {
        Pipeline {
            registry: &self.hooks,
            handler: &*self.handler,
            config: &self.config,
            meta: self.meta.as_ref(),
        }
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("meta", &self.meta)
            .field("hooks", &self.hooks)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// One statement under construction.
///
/// Created by [`Table::query`], consumed by a terminal call.
pub struct Chain<'t, S = Open> {
    table: &'t Table,
    intent: QueryIntent,
    /// Connector for the next condition added to either tree.
    pending: Option<Connector>,
    _state: PhantomData<S>,
}

impl<S> fmt::Debug for Chain<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("table", &self.table.name)
            .field("intent", &self.intent)
            .field("pending", &self.pending)
            .finish()
    }
}

impl<'t, S> Chain<'t, S> {
    fn into_state<T>(self) -> Chain<'t, T> {
        Chain {
            table: self.table,
            intent: self.intent,
            pending: self.pending,
            _state: PhantomData,
        }
    }

    // ==================== Connectors ====================

    /// Join the next condition with `AND` (the default).
    pub fn and(mut self) -> Self {
        self.pending = Some(Connector::And);
        self
    }

    /// Join the next condition with `OR`.
    pub fn or(mut self) -> Self {
        self.pending = Some(Connector::Or);
        self
    }

    // ==================== Clause families ====================

    /// WHERE conditions.
    pub fn filter(self) -> Filter<'t, S> {
        Filter::new(self)
    }

    /// HAVING conditions.
    pub fn having(self) -> Having<'t, S> {
        Having::new(self)
    }

    pub fn select(self) -> Select<'t, S> {
        Select::new(self)
    }

    pub fn group(self) -> Group<'t, S> {
        Group::new(self)
    }

    pub fn order(self) -> Order<'t, S> {
        Order::new(self)
    }

    /// LIMIT and OFFSET.
    pub fn limit(self) -> Limit<'t, S> {
        Limit::new(self)
    }

    pub fn union(self) -> Union<'t, S> {
        Union::new(self)
    }

    pub fn join(self) -> Join<'t, S> {
        Join::new(self)
    }

    // ==================== Inspection ====================

    pub fn table(&self) -> &'t Table {
        self.table
    }

    pub fn intent(&self) -> &QueryIntent {
        &self.intent
    }

    pub fn into_intent(self) -> QueryIntent {
        self.intent
    }

    /// Compile without executing or running hooks.
    pub fn compile(&self, op: Operation, payload: Option<&Payload>) -> OrmResult<Compiled> {
        compile(&self.intent, op, payload, self.table.meta.as_ref())
    }

    /// SQL of the SELECT this chain would run.
    pub fn to_sql(&self) -> OrmResult<String> {
        self.compile(Operation::Select, None).map(|c| c.sql)
    }

    // ==================== Reads ====================

    /// Run the SELECT and map every row with [`FromRow`].
    pub async fn all<T, G>(self, gateway: &G) -> OrmResult<Completion<Vec<T>>>
    where
        G: Gateway,
        T: FromRow<G::Row>,
    {
        self.all_with(gateway, T::from_row).await
    }

    /// Run the SELECT and map every row with `map`.
    pub async fn all_with<T, G, F>(self, gateway: &G, map: F) -> OrmResult<Completion<Vec<T>>>
    where
        G: Gateway,
        F: Fn(&G::Row) -> OrmResult<T>,
    {
        let target = HookTarget::Select {
            intent: &self.intent,
        };
        self.table
            .pipeline()
            .run(target, gateway, |outcome| match outcome {
                Outcome::Rows(rows) => rows.iter().map(&map).collect(),
                Outcome::Affected(_) => Ok(Vec::new()),
            })
            .await
    }

    /// Run the SELECT and map the first row, if any.
    ///
    /// No LIMIT is added; set one with `limit().to(1)` when the result set can
    /// be large.
    pub async fn fetch<T, G>(self, gateway: &G) -> OrmResult<Completion<Option<T>>>
    where
        G: Gateway,
        T: FromRow<G::Row>,
    {
        self.fetch_with(gateway, T::from_row).await
    }

    /// Like [`Chain::fetch`] with a mapping closure.
    pub async fn fetch_with<T, G, F>(
        self,
        gateway: &G,
        map: F,
    ) -> OrmResult<Completion<Option<T>>>
    where
        G: Gateway,
        F: Fn(&G::Row) -> OrmResult<T>,
    {
        let target = HookTarget::Select {
            intent: &self.intent,
        };
        self.table
            .pipeline()
            .run(target, gateway, |outcome| match outcome {
                Outcome::Rows(rows) => rows.first().map(&map).transpose(),
                Outcome::Affected(_) => Ok(None),
            })
            .await
    }

    async fn mutate<G: Gateway>(
        self,
        gateway: &G,
        op: Operation,
        payload: Option<&Payload>,
    ) -> OrmResult<Completion<u64>> {
        let intent = &self.intent;
        let target = match (op, payload) {
            (Operation::Insert, Some(payload)) => HookTarget::Insert { intent, payload },
            (Operation::Update, Some(payload)) => HookTarget::Update { intent, payload },
            (Operation::Delete, _) => HookTarget::Delete { intent },
            _ => {
                return Err(OrmError::invalid_query(format!(
                    "{op} is not a mutation with this payload"
                )));
            }
        };
        self.table
            .pipeline()
            .run(target, gateway, |outcome| match outcome {
                Outcome::Affected(n) => Ok(n),
                Outcome::Rows(rows) => Ok(rows.len() as u64),
            })
            .await
    }
}

impl<'t> Chain<'t, Open> {
    /// INSERT `payload`. Returns the affected row count.
    pub async fn insert<G: Gateway>(
        self,
        gateway: &G,
        payload: &Payload,
    ) -> OrmResult<Completion<u64>> {
        self.mutate(gateway, Operation::Insert, Some(payload)).await
    }

    /// UPDATE every row of the table.
    pub async fn update_all<G: Gateway>(
        self,
        gateway: &G,
        payload: &Payload,
    ) -> OrmResult<Completion<u64>> {
        self.mutate(gateway, Operation::Update, Some(payload)).await
    }

    /// DELETE every row of the table.
    pub async fn delete_all<G: Gateway>(self, gateway: &G) -> OrmResult<Completion<u64>> {
        self.mutate(gateway, Operation::Delete, None).await
    }
}

impl<'t> Chain<'t, Scoped> {
    /// UPDATE rows matching the WHERE clause.
    pub async fn update<G: Gateway>(
        self,
        gateway: &G,
        payload: &Payload,
    ) -> OrmResult<Completion<u64>> {
        self.mutate(gateway, Operation::Update, Some(payload)).await
    }

    /// DELETE rows matching the WHERE clause.
    pub async fn delete<G: Gateway>(self, gateway: &G) -> OrmResult<Completion<u64>> {
        self.mutate(gateway, Operation::Delete, None).await
    }
}
