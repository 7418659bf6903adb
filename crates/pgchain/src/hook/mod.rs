//! Before/after hooks around every data operation.
//!
//! Each terminal call on a chain runs through a fixed lifecycle:
//!
//! ```text
//! Idle → BeforeHooks → Compiling → Executing → AfterHooks → Done
//!                 ↘          ↘           ↘           ↘
//!                                Failed
//! ```
//!
//! Hooks are registered per [`HookEvent`] (`beforeSelect` … `afterDelete`) and
//! run sequentially in registration order. A failing before-hook stops the
//! operation before any SQL is compiled; a gateway failure skips the
//! after-hooks. Failures pass through the table's [`ErrorHandler`].
//!
//! # Example
//!
//! ```rust,ignore
//! use pgchain::{Operation, OrmError, Table, UnscopedGuard};
//!
//! let users = Table::new("users")?;
//! users.hooks().register_global(UnscopedGuard::new());
//! users.hooks().before(Operation::Insert, |ctx| {
//!     match ctx.payload().and_then(|p| p.get("email")) {
//!         Some(_) => Ok(()),
//!         None => Err(OrmError::invalid_query("email is required")),
//!     }
//! });
//! ```

mod builtin;
mod config;
mod error_handler;
mod pipeline;
mod registry;
mod types;

#[cfg(test)]
mod tests;

pub use builtin::{HookStats, StatsHook, TracingSqlHook, UnscopedGuard};
pub use config::PipelineConfig;
pub use error_handler::{ErrorDisposition, ErrorHandler, LoggingErrorHandler};
pub use pipeline::Completion;
pub(crate) use pipeline::{Outcome, Pipeline};
pub use registry::{HookId, HookRegistry};
pub use types::{Hook, HookContext, HookEvent, HookTarget, Operation, Phase, QueryResult, Stage};

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
