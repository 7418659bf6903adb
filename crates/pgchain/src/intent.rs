//! Everything a chain has collected about one statement.
//!
//! A [`QueryIntent`] is owned by exactly one chain. Clause builders mutate it in
//! whatever order the caller likes; the compiler renders it in a fixed clause
//! order, so call order never changes the SQL.

use crate::condition::ConditionTree;
use crate::error::{OrmError, OrmResult};
use crate::ident;

/// Selected column set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Columns {
    /// `*`
    #[default]
    All,
    /// Explicit columns, deduplicated, first occurrence wins the position.
    Fields(Vec<String>),
}

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// One ORDER BY key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub field: String,
    pub direction: Direction,
}

/// JOIN type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub on: String,
}

/// `UNION` vs `UNION ALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionMode {
    Distinct,
    All,
}

impl UnionMode {
    pub fn as_sql(&self) -> &'static str {
        match self {
            UnionMode::Distinct => "UNION",
            UnionMode::All => "UNION ALL",
        }
    }
}

/// A raw query appended with UNION / UNION ALL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Union {
    pub mode: UnionMode,
    pub query: String,
}

/// Full mutable description of one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryIntent {
    table: String,
    columns: Columns,
    distinct: bool,
    filter: ConditionTree,
    group_by: Vec<String>,
    having: ConditionTree,
    order_by: Vec<OrderKey>,
    limit: Option<u64>,
    offset: Option<u64>,
    joins: Vec<Join>,
    unions: Vec<Union>,
    build_error: Option<String>,
}

impl QueryIntent {
    /// Create an empty intent for `table` (optionally aliased: `users u`).
    pub fn new(table: impl Into<String>) -> OrmResult<Self> {
        let table = table.into();
        if table.trim().is_empty() {
            return Err(OrmError::invalid_query("table name cannot be empty"));
        }
        Ok(Self::for_table(ident::table_ref(&table)?))
    }

    /// Table name is already validated by the caller.
    pub(crate) fn for_table(table: String) -> Self {
        Self {
            table,
            columns: Columns::All,
            distinct: false,
            filter: ConditionTree::new(),
            group_by: Vec::new(),
            having: ConditionTree::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            joins: Vec::new(),
            unions: Vec::new(),
            build_error: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// The WHERE tree.
    pub fn filter(&self) -> &ConditionTree {
        &self.filter
    }

    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    pub fn having(&self) -> &ConditionTree {
        &self.having
    }

    pub fn order_by(&self) -> &[OrderKey] {
        &self.order_by
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn unions(&self) -> &[Union] {
        &self.unions
    }

    /// First error recorded by a fluent mutation, if any.
    pub fn build_error(&self) -> Option<&str> {
        self.build_error.as_deref()
    }

    /// Whether the statement has a WHERE clause.
    pub fn is_scoped(&self) -> bool {
        !self.filter.is_empty()
    }

    /// Names of select-only clause families that are set.
    ///
    /// Mutations reject all of these.
    pub fn select_only_clauses(&self) -> Vec<&'static str> {
        let mut present = Vec::new();
        if matches!(self.columns, Columns::Fields(_)) {
            present.push("column selection");
        }
        if self.distinct {
            present.push("DISTINCT");
        }
        if !self.joins.is_empty() {
            present.push("JOIN");
        }
        if !self.group_by.is_empty() {
            present.push("GROUP BY");
        }
        if !self.having.is_empty() {
            present.push("HAVING");
        }
        if !self.order_by.is_empty() {
            present.push("ORDER BY");
        }
        if self.limit.is_some() {
            present.push("LIMIT");
        }
        if self.offset.is_some() {
            present.push("OFFSET");
        }
        if !self.unions.is_empty() {
            present.push("UNION");
        }
        present
    }

    // ==================== Mutations ====================

    /// Keep the first error only; later ones are usually fallout.
    pub(crate) fn record_error(&mut self, err: OrmError) {
        if self.build_error.is_some() {
            return;
        }
        let message = match err {
            OrmError::InvalidQuery(message) => message,
            other => other.to_string(),
        };
        self.build_error = Some(message);
    }

    pub(crate) fn select_all(&mut self) {
        self.columns = Columns::All;
    }

    pub(crate) fn select_fields<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cols: Vec<String> = Vec::new();
        for field in fields {
            let field = field.into();
            if field.trim().is_empty() {
                self.record_error(OrmError::invalid_query("selected column cannot be empty"));
                continue;
            }
            let field = match ident::select_item(&field) {
                Ok(field) => field,
                Err(err) => {
                    self.record_error(err);
                    continue;
                }
            };
            if !cols.contains(&field) {
                cols.push(field);
            }
        }
        self.columns = if cols.is_empty() {
            Columns::All
        } else {
            Columns::Fields(cols)
        };
    }

    pub(crate) fn set_distinct(&mut self, distinct: bool) {
        self.distinct = distinct;
    }

    pub(crate) fn filter_mut(&mut self) -> &mut ConditionTree {
        &mut self.filter
    }

    pub(crate) fn having_mut(&mut self) -> &mut ConditionTree {
        &mut self.having
    }

    pub(crate) fn set_group_by<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut group = Vec::new();
        for field in fields {
            let field = field.into();
            if field.trim().is_empty() {
                self.record_error(OrmError::invalid_query("GROUP BY field cannot be empty"));
                continue;
            }
            match ident::column(&field) {
                Ok(field) => group.push(field),
                Err(err) => self.record_error(err),
            }
        }
        self.group_by = group;
    }

    pub(crate) fn set_order(&mut self, field: String, direction: Direction) {
        self.order_by.clear();
        self.push_order(field, direction);
    }

    pub(crate) fn push_order(&mut self, field: String, direction: Direction) {
        if field.trim().is_empty() {
            self.record_error(OrmError::invalid_query("ORDER BY field cannot be empty"));
            return;
        }
        match ident::column_or_aggregate(&field) {
            Ok(field) => self.order_by.push(OrderKey { field, direction }),
            Err(err) => self.record_error(err),
        }
    }

    pub(crate) fn set_limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    pub(crate) fn set_offset(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    /// `on` is inserted verbatim; `table` must be a table reference.
    pub(crate) fn push_join(&mut self, kind: JoinKind, table: String, on: String) {
        if table.trim().is_empty() || on.trim().is_empty() {
            self.record_error(OrmError::invalid_query(
                "JOIN requires a table and an ON condition",
            ));
            return;
        }
        match ident::table_ref(&table) {
            Ok(table) => self.joins.push(Join { kind, table, on }),
            Err(err) => self.record_error(err),
        }
    }

    pub(crate) fn push_union(&mut self, mode: UnionMode, query: String) {
        if query.trim().is_empty() {
            self.record_error(OrmError::invalid_query("UNION query cannot be empty"));
            return;
        }
        self.unions.push(Union { mode, query });
    }
}
