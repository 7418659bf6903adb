use crate::error::OrmError;

/// What to do with an error on the failed path.
#[derive(Debug)]
pub enum ErrorDisposition {
    /// Return the error to the caller unchanged.
    Rethrow,
    /// Return a different error instead.
    Replace(OrmError),
    /// Swallow the error. The terminal call yields the default value and keeps
    /// the error in `Completion::suppressed`.
    Suppress,
}

/// Intercepts hook, connection, execution and mapping failures.
///
/// `context` names the event and table, e.g. `"beforeInsert on users"`.
pub trait ErrorHandler: Send + Sync {
    fn handle_error(&self, error: &OrmError, context: &str) -> ErrorDisposition;
}

impl<F> ErrorHandler for F
where
    F: Fn(&OrmError, &str) -> ErrorDisposition + Send + Sync,
{
    fn handle_error(&self, error: &OrmError, context: &str) -> ErrorDisposition {
        self(error, context)
    }
}

/// Default handler: log at `error` level and rethrow.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingErrorHandler;

impl ErrorHandler for LoggingErrorHandler {
    fn handle_error(&self, error: &OrmError, context: &str) -> ErrorDisposition {
        tracing::error!(
            target: "pgchain.pipeline",
            context,
            sqlstate = error.sqlstate().unwrap_or("-"),
            error = %error,
            "operation failed"
        );
        ErrorDisposition::Rethrow
    }
}
