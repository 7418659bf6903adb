use super::truncate_sql_bytes;
use super::types::{Hook, HookContext, Operation, QueryResult};
use crate::error::{OrmError, OrmResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::Level;

/// A `tracing` hook that emits every executed statement with its result.
///
/// Register it for all events with
/// [`HookRegistry::register_global`](super::HookRegistry::register_global);
/// it only acts on after-events, where the compiled SQL is known.
#[derive(Debug, Clone)]
pub struct TracingSqlHook {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for TracingSqlHook {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl TracingSqlHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }
}

#[async_trait]
impl Hook for TracingSqlHook {
    async fn on_after(&self, ctx: &HookContext<'_>, result: &QueryResult) -> OrmResult<()> {
        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let Some(compiled) = ctx.compiled else {
            return Ok(());
        };
        let sql = self.truncate_sql(&compiled.sql);
        emit_at_level!(
            self.level,
            target: "pgchain.sql",
            table = ctx.table(),
            operation = %ctx.operation(),
            param_count = compiled.params.len(),
            unscoped = compiled.unscoped,
            result = %result,
            sql = %sql,
        );
        Ok(())
    }
}

/// Rejects UPDATE and DELETE statements without a WHERE clause.
///
/// Acts on before-events, so nothing is compiled or sent when it fires.
#[derive(Debug, Clone)]
pub struct UnscopedGuard {
    guard_update: bool,
    guard_delete: bool,
}

impl Default for UnscopedGuard {
    fn default() -> Self {
        Self {
            guard_update: true,
            guard_delete: true,
        }
    }
}

impl UnscopedGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let unscoped UPDATE through.
    pub fn allow_update(mut self) -> Self {
        self.guard_update = false;
        self
    }

    /// Let unscoped DELETE through.
    pub fn allow_delete(mut self) -> Self {
        self.guard_delete = false;
        self
    }
}

#[async_trait]
impl Hook for UnscopedGuard {
    async fn on_before(&self, ctx: &HookContext<'_>) -> OrmResult<()> {
        let guarded = match ctx.operation() {
            Operation::Update => self.guard_update,
            Operation::Delete => self.guard_delete,
            _ => false,
        };
        if guarded && ctx.is_unscoped() {
            return Err(OrmError::hook(
                ctx.event,
                format!(
                    "refusing {} on {} without a WHERE clause",
                    ctx.operation(),
                    ctx.table()
                ),
            ));
        }
        Ok(())
    }
}

/// Counts completed operations and rows.
#[derive(Debug, Default)]
pub struct StatsHook {
    select_count: AtomicU64,
    insert_count: AtomicU64,
    update_count: AtomicU64,
    delete_count: AtomicU64,
    rows_returned: AtomicU64,
    rows_affected: AtomicU64,
    unscoped_count: AtomicU64,
}

/// Snapshot of [`StatsHook`] counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookStats {
    pub select_count: u64,
    pub insert_count: u64,
    pub update_count: u64,
    pub delete_count: u64,
    /// Rows returned by SELECTs.
    pub rows_returned: u64,
    /// Rows affected by mutations.
    pub rows_affected: u64,
    /// Completed UPDATE/DELETE without WHERE.
    pub unscoped_count: u64,
}

impl HookStats {
    pub fn total(&self) -> u64 {
        self.select_count + self.insert_count + self.update_count + self.delete_count
    }
}

impl StatsHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of current statistics.
    pub fn stats(&self) -> HookStats {
        HookStats {
            select_count: self.select_count.load(Ordering::Relaxed),
            insert_count: self.insert_count.load(Ordering::Relaxed),
            update_count: self.update_count.load(Ordering::Relaxed),
            delete_count: self.delete_count.load(Ordering::Relaxed),
            rows_returned: self.rows_returned.load(Ordering::Relaxed),
            rows_affected: self.rows_affected.load(Ordering::Relaxed),
            unscoped_count: self.unscoped_count.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.select_count,
            &self.insert_count,
            &self.update_count,
            &self.delete_count,
            &self.rows_returned,
            &self.rows_affected,
            &self.unscoped_count,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[async_trait]
impl Hook for StatsHook {
    async fn on_after(&self, ctx: &HookContext<'_>, result: &QueryResult) -> OrmResult<()> {
        let counter = match ctx.operation() {
            Operation::Select => &self.select_count,
            Operation::Insert => &self.insert_count,
            Operation::Update => &self.update_count,
            Operation::Delete => &self.delete_count,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        match result {
            QueryResult::Rows(n) => {
                self.rows_returned.fetch_add(*n as u64, Ordering::Relaxed);
            }
            QueryResult::Affected(n) => {
                self.rows_affected.fetch_add(*n, Ordering::Relaxed);
            }
        }
        if ctx.is_unscoped() {
            self.unscoped_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}
