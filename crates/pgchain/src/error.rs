//! Error types for pgchain

use crate::hook::HookEvent;
use crate::value::Value;
use thiserror::Error;

/// Result type alias for pgchain operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for query construction and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// Malformed query intent (empty table, empty field, disallowed clause)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The gateway could not reach the database
    #[error("Connection error: {0}")]
    Connection(String),

    /// The database rejected the compiled SQL
    #[error("Query execution error: {message} (sql: {sql})")]
    QueryExecution {
        /// SQLSTATE code reported by the server, if any.
        code: Option<String>,
        message: String,
        sql: String,
        /// Debug rendering of the bound parameters.
        params: String,
    },

    /// Row-to-model conversion failed
    #[error("Mapping error on column '{column}': {message}")]
    Mapping { column: String, message: String },

    /// A registered hook failed
    #[error("Hook error in {event}: {message}")]
    Hook { event: HookEvent, message: String },

    /// A failure raised after an after-hook had already failed in the same call
    #[error("{error} (after-hook also failed: {after_hook})")]
    WithAfterHook {
        error: Box<OrmError>,
        after_hook: Box<OrmError>,
    },

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl OrmError {
    /// Create an invalid query error
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }

    /// Create a mapping error for a specific column
    pub fn mapping(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Mapping {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a hook error for the given event
    pub fn hook(event: HookEvent, message: impl Into<String>) -> Self {
        Self::Hook {
            event,
            message: message.into(),
        }
    }

    /// Create an execution error without a driver error (used by custom gateways)
    pub fn execution(message: impl Into<String>, sql: &str, params: &[Value]) -> Self {
        Self::QueryExecution {
            code: None,
            message: message.into(),
            sql: sql.to_string(),
            params: format!("{params:?}"),
        }
    }

    /// Attach an after-hook failure that happened before `self`.
    pub fn with_after_hook(self, after_hook: OrmError) -> Self {
        Self::WithAfterHook {
            error: Box::new(self),
            after_hook: Box::new(after_hook),
        }
    }

    /// The error itself, without an attached after-hook failure.
    pub fn root(&self) -> &OrmError {
        match self {
            Self::WithAfterHook { error, .. } => error.root(),
            other => other,
        }
    }

    /// The attached after-hook failure, if any.
    pub fn after_hook_error(&self) -> Option<&OrmError> {
        match self {
            Self::WithAfterHook { after_hook, .. } => Some(after_hook.as_ref()),
            _ => None,
        }
    }

    /// Check if this is an invalid query error
    pub fn is_invalid_query(&self) -> bool {
        matches!(self.root(), Self::InvalidQuery(_))
    }

    /// Check if this is a hook error
    pub fn is_hook(&self) -> bool {
        matches!(self.root(), Self::Hook { .. })
    }

    /// Check if this is a connection error
    pub fn is_connection(&self) -> bool {
        matches!(self.root(), Self::Connection(_))
    }

    /// Check if this is a unique violation (SQLSTATE 23505)
    pub fn is_unique_violation(&self) -> bool {
        self.sqlstate() == Some("23505")
    }

    /// Check if this is a foreign key violation (SQLSTATE 23503)
    pub fn is_foreign_key_violation(&self) -> bool {
        self.sqlstate() == Some("23503")
    }

    /// The SQLSTATE code of a database-reported error.
    pub fn sqlstate(&self) -> Option<&str> {
        match self.root() {
            Self::QueryExecution { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Translate a tokio_postgres error, keeping the failing SQL and params for diagnostics.
    pub fn from_db_error(err: tokio_postgres::Error, sql: &str, params: &[Value]) -> Self {
        if let Some(db_err) = err.as_db_error() {
            return Self::QueryExecution {
                code: Some(db_err.code().code().to_string()),
                message: db_err.message().to_string(),
                sql: sql.to_string(),
                params: format!("{params:?}"),
            };
        }
        if err.is_closed() {
            return Self::Connection(err.to_string());
        }
        // Socket-level failures surface as an io error source.
        if std::error::Error::source(&err).is_some_and(|s| s.is::<std::io::Error>()) {
            return Self::Connection(err.to_string());
        }
        Self::execution(err.to_string(), sql, params)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
