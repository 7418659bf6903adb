use super::config::PipelineConfig;
use super::error_handler::{ErrorDisposition, ErrorHandler};
use super::registry::HookRegistry;
use super::types::{HookContext, HookEvent, HookTarget, QueryResult, Stage};
use crate::compiler::{Compiled, compile};
use crate::error::{OrmError, OrmResult};
use crate::gateway::Gateway;
use crate::hook::Operation;
use crate::meta::TableMeta;

/// Value produced by a terminal call, plus anything that went wrong after the
/// value was obtained.
///
/// An after-hook failure does not discard the result: the value is returned
/// with the error attached. Use [`Completion::into_result`] when the error
/// should win.
#[derive(Debug)]
#[must_use]
pub struct Completion<T> {
    pub value: T,
    /// First after-hook failure (after the error handler), if any.
    pub after_hook_error: Option<OrmError>,
    /// Error the error handler chose to suppress, if any.
    pub suppressed: Option<OrmError>,
}

impl<T> Completion<T> {
    /// `true` when nothing failed.
    pub fn is_clean(&self) -> bool {
        self.after_hook_error.is_none() && self.suppressed.is_none()
    }

    /// Get the value, or the after-hook error if one occurred.
    pub fn into_result(self) -> OrmResult<T> {
        match self.after_hook_error {
            Some(err) => Err(err),
            None => Ok(self.value),
        }
    }

    /// Split into the value and the after-hook error.
    pub fn into_parts(self) -> (T, Option<OrmError>) {
        (self.value, self.after_hook_error)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Completion<U> {
        Completion {
            value: f(self.value),
            after_hook_error: self.after_hook_error,
            suppressed: self.suppressed,
        }
    }
}

/// What the gateway returned.
pub(crate) enum Outcome<R> {
    Rows(Vec<R>),
    Affected(u64),
}

impl<R> Outcome<R> {
    fn summary(&self) -> QueryResult {
        match self {
            Outcome::Rows(rows) => QueryResult::Rows(rows.len()),
            Outcome::Affected(n) => QueryResult::Affected(*n),
        }
    }
}

/// Runs one terminal call through before-hooks, compile, execute and
/// after-hooks.
pub(crate) struct Pipeline<'a> {
    pub(crate) registry: &'a HookRegistry,
    pub(crate) handler: &'a dyn ErrorHandler,
    pub(crate) config: &'a PipelineConfig,
    pub(crate) meta: Option<&'a TableMeta>,
}

impl Pipeline<'_> {
    /// Drive `target` to completion. `finish` turns the gateway outcome into
    /// the caller's value and runs after the after-hooks.
    pub(crate) async fn run<G, O, F>(
        &self,
        target: HookTarget<'_>,
        gateway: &G,
        finish: F,
    ) -> OrmResult<Completion<O>>
    where
        G: Gateway,
        O: Default,
        F: FnOnce(Outcome<G::Row>) -> OrmResult<O>,
    {
        let op = target.operation();
        let intent = target.intent();
        let table = intent.table();
        let mut stage = Stage::Idle;

        if let Some(err) = intent.build_error() {
            self.transition(&mut stage, Stage::Failed, op, table);
            return Err(OrmError::invalid_query(err));
        }

        // Before-hooks
        self.transition(&mut stage, Stage::BeforeHooks, op, table);
        let event = HookEvent::before(op);
        let ctx = HookContext {
            target,
            event,
            stage,
            compiled: None,
        };
        for hook in self.registry.hooks_for(event) {
            if let Err(err) = hook.on_before(&ctx).await {
                self.transition(&mut stage, Stage::Failed, op, table);
                return self.handle(as_hook_error(err, event), &context_for(event, table));
            }
        }

        // Compile
        self.transition(&mut stage, Stage::Compiling, op, table);
        let compiled = match compile(intent, op, target.payload(), self.meta) {
            Ok(compiled) => compiled,
            Err(err) => {
                self.transition(&mut stage, Stage::Failed, op, table);
                return Err(err);
            }
        };
        if compiled.unscoped && self.config.warn_on_unscoped {
            tracing::warn!(
                target: "pgchain.pipeline",
                table,
                operation = %op,
                sql = %self.config.loggable_sql(&compiled.sql),
                "{op} without WHERE affects every row"
            );
        }

        // Execute
        self.transition(&mut stage, Stage::Executing, op, table);
        let outcome = match self.execute(gateway, op, &compiled).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.transition(&mut stage, Stage::Failed, op, table);
                let context = format!("execute {op} on {table}");
                return self.handle(err, &context);
            }
        };

        // After-hooks
        self.transition(&mut stage, Stage::AfterHooks, op, table);
        let event = HookEvent::after(op);
        let summary = outcome.summary();
        let ctx = HookContext {
            target,
            event,
            stage,
            compiled: Some(&compiled),
        };
        let mut after_hook_error = None;
        let mut suppressed = None;
        for hook in self.registry.hooks_for(event) {
            if let Err(err) = hook.on_after(&ctx, &summary).await {
                let err = as_hook_error(err, event);
                match self.handler.handle_error(&err, &context_for(event, table)) {
                    ErrorDisposition::Rethrow => after_hook_error = Some(err),
                    ErrorDisposition::Replace(replacement) => after_hook_error = Some(replacement),
                    ErrorDisposition::Suppress => suppressed = Some(err),
                }
                break;
            }
        }

        // Map
        let value = match finish(outcome) {
            Ok(value) => value,
            Err(err) => {
                self.transition(&mut stage, Stage::Failed, op, table);
                let context = format!("map rows of {table}");
                return match (self.handle(err, &context), after_hook_error) {
                    (Err(err), Some(after)) => Err(err.with_after_hook(after)),
                    (Err(err), None) => Err(err),
                    (Ok(mut completion), after) => {
                        completion.after_hook_error = after;
                        Ok(completion)
                    }
                };
            }
        };

        if after_hook_error.is_some() {
            self.transition(&mut stage, Stage::Failed, op, table);
        } else {
            self.transition(&mut stage, Stage::Done, op, table);
        }
        Ok(Completion {
            value,
            after_hook_error,
            suppressed,
        })
    }

    async fn execute<G: Gateway>(
        &self,
        gateway: &G,
        op: Operation,
        compiled: &Compiled,
    ) -> OrmResult<Outcome<G::Row>> {
        tracing::trace!(
            target: "pgchain.pipeline",
            operation = %op,
            param_count = compiled.params.len(),
            sql = %self.config.loggable_sql(&compiled.sql),
            "executing"
        );
        match op {
            Operation::Select => gateway
                .query(&compiled.sql, &compiled.params)
                .await
                .map(Outcome::Rows),
            _ => gateway
                .execute(&compiled.sql, &compiled.params)
                .await
                .map(Outcome::Affected),
        }
    }

    fn handle<O: Default>(&self, err: OrmError, context: &str) -> OrmResult<Completion<O>> {
        match self.handler.handle_error(&err, context) {
            ErrorDisposition::Rethrow => Err(err),
            ErrorDisposition::Replace(replacement) => Err(replacement),
            ErrorDisposition::Suppress => Ok(Completion {
                value: O::default(),
                after_hook_error: None,
                suppressed: Some(err),
            }),
        }
    }

    fn transition(&self, stage: &mut Stage, next: Stage, op: Operation, table: &str) {
        tracing::trace!(
            target: "pgchain.pipeline",
            table,
            operation = %op,
            from = ?*stage,
            to = ?next,
            "stage"
        );
        *stage = next;
    }
}

fn context_for(event: HookEvent, table: &str) -> String {
    format!("{event} on {table}")
}

fn as_hook_error(err: OrmError, event: HookEvent) -> OrmError {
    if err.is_hook() {
        err
    } else {
        OrmError::hook(event, err.to_string())
    }
}
