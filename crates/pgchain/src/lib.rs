//! # pgchain
//!
//! Order-independent query chains for PostgreSQL, with a before/after hook
//! pipeline around every data operation.
//!
//! ## Features
//!
//! - **Order independent**: clause families (`filter`, `select`, `group`,
//!   `order`, `limit`, `having`, `union`, `join`) can be chained in any order
//!   and always compile to the same SQL
//! - **Parameterized**: values are bound as `$1..$n`, never inlined; table,
//!   column and sort names are validated as SQL identifiers
//! - **Hook pipeline**: `beforeSelect` … `afterDelete` callbacks run in
//!   registration order; a failing before-hook stops the operation
//! - **Scoping in the type system**: `update`/`delete` need a WHERE clause,
//!   `update_all`/`delete_all` say so explicitly
//! - **Transaction-friendly**: pass a transaction anywhere a `Gateway` is expected
//!
//! ## Example
//!
//! ```ignore
//! use pgchain::prelude::*;
//!
//! let users = Table::new("users")?;
//! users.hooks().register_global(UnscopedGuard::new());
//!
//! // SELECT * FROM users WHERE age = $1 AND name LIKE $2
//! // `User: FromRow`
//! let found: Vec<User> = users
//!     .query()
//!     .filter().field("age").is(30)
//!     .and()
//!     .filter().field("name").like("%John%")
//!     .all(&client)
//!     .await?
//!     .into_result()?;
//!
//! // INSERT INTO users (name, age) VALUES ($1, $2)
//! users
//!     .query()
//!     .insert(&client, &Payload::new().set("name", "alice").set("age", 30))
//!     .await?;
//!
//! // DELETE FROM users WHERE id = $1
//! users.query().filter().field("id").is(7).delete(&client).await?;
//! ```

pub mod builder;
pub mod compiler;
pub mod condition;
pub mod error;
pub mod gateway;
pub mod hook;
pub mod ident;
pub mod intent;
pub mod meta;
pub mod prelude;
pub mod row;
pub mod value;

pub use builder::{Chain, Open, Scoped, Table};
pub use compiler::{Compiled, compile};
pub use condition::{ConditionTree, Connector, FieldKind, Node, Operand, Operator};
pub use error::{OrmError, OrmResult};
pub use gateway::{Executed, Gateway, MemoryGateway};
pub use hook::{
    Completion, ErrorDisposition, ErrorHandler, Hook, HookContext, HookEvent, HookId,
    HookRegistry, HookStats, HookTarget, LoggingErrorHandler, Operation, Phase, PipelineConfig,
    QueryResult, Stage, StatsHook, TracingSqlHook, UnscopedGuard,
};
pub use ident::{Ident, IdentPart};
pub use intent::{Columns, Direction, QueryIntent};
pub use meta::{ColumnType, TableMeta};
pub use row::{FromRow, FromValue, Record, RowExt};
pub use value::{Payload, Value};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config, create_pool_with_manager_config};
