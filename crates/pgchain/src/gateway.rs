//! The execution boundary between compiled SQL and a database connection.
//!
//! The pipeline only ever talks to a [`Gateway`]: it hands over SQL with `$n`
//! placeholders plus the ordered parameter list, and gets rows or an affected
//! count back. Implementations are provided for `tokio-postgres` clients and
//! transactions, and for `deadpool-postgres` clients with the `pool` feature.
//! [`MemoryGateway`] serves canned [`Record`]s without a database.

use crate::error::{OrmError, OrmResult};
use crate::row::Record;
use crate::value::{Value, as_sql_refs};
use std::sync::{Mutex, MutexGuard};
use tokio_postgres::Row;

/// Executes compiled statements.
pub trait Gateway: Send + Sync {
    /// Raw row type produced by [`Gateway::query`].
    type Row: Send;

    /// Run a statement that returns rows.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<Vec<Self::Row>>> + Send;

    /// Run a statement and return the number of rows affected.
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send;
}

impl Gateway for tokio_postgres::Client {
    type Row = Row;

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        tokio_postgres::Client::query(self, sql, &as_sql_refs(params))
            .await
            .map_err(|e| OrmError::from_db_error(e, sql, params))
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        tokio_postgres::Client::execute(self, sql, &as_sql_refs(params))
            .await
            .map_err(|e| OrmError::from_db_error(e, sql, params))
    }
}

impl Gateway for tokio_postgres::Transaction<'_> {
    type Row = Row;

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        tokio_postgres::Transaction::query(self, sql, &as_sql_refs(params))
            .await
            .map_err(|e| OrmError::from_db_error(e, sql, params))
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        tokio_postgres::Transaction::execute(self, sql, &as_sql_refs(params))
            .await
            .map_err(|e| OrmError::from_db_error(e, sql, params))
    }
}

#[cfg(feature = "pool")]
impl Gateway for deadpool_postgres::Client {
    type Row = Row;

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        // Delegate to the deref target (ClientWrapper / tokio_postgres::Client).
        Gateway::query(&**self, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        Gateway::execute(&**self, sql, params).await
    }
}

#[cfg(feature = "pool")]
impl Gateway for deadpool_postgres::ClientWrapper {
    type Row = Row;

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        Gateway::query(&**self, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        Gateway::execute(&**self, sql, params).await
    }
}

#[cfg(feature = "pool")]
impl Gateway for deadpool_postgres::Transaction<'_> {
    type Row = Row;

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        Gateway::query(&**self, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        Gateway::execute(&**self, sql, params).await
    }
}

/// A statement seen by [`MemoryGateway`].
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub sql: String,
    pub params: Vec<Value>,
}

/// In-memory gateway returning canned rows and recording every statement.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    rows: Vec<Record>,
    affected: u64,
    failure: Option<String>,
    log: Mutex<Vec<Executed>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows returned by every query.
    pub fn with_rows(mut self, rows: Vec<Record>) -> Self {
        self.rows = rows;
        self
    }

    /// Count returned by every execute.
    pub fn with_affected(mut self, affected: u64) -> Self {
        self.affected = affected;
        self
    }

    /// Fail every call with an execution error carrying `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    fn log(&self) -> MutexGuard<'_, Vec<Executed>> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Statements received so far, in order.
    pub fn executed(&self) -> Vec<Executed> {
        self.log().clone()
    }

    /// Last statement received.
    pub fn last(&self) -> Option<Executed> {
        self.log().last().cloned()
    }

    pub fn call_count(&self) -> usize {
        self.log().len()
    }

    fn record(&self, sql: &str, params: &[Value]) -> OrmResult<()> {
        self.log().push(Executed {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        match &self.failure {
            Some(message) => Err(OrmError::execution(message.clone(), sql, params)),
            None => Ok(()),
        }
    }
}

impl Gateway for MemoryGateway {
    type Row = Record;

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Record>> {
        self.record(sql, params)?;
        Ok(self.rows.clone())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        self.record(sql, params)?;
        Ok(self.affected)
    }
}
