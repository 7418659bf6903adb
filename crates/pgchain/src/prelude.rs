//! Convenient imports for typical `pgchain` usage.
//!
//! ```ignore
//! use pgchain::prelude::*;
//! ```

pub use crate::{
    Completion, FromRow, Gateway, Hook, HookContext, Operation, OrmError, OrmResult, Payload,
    QueryResult, Record, RowExt, Table, TableMeta, UnscopedGuard, Value,
};

#[cfg(feature = "pool")]
pub use crate::{create_pool, create_pool_with_config};
