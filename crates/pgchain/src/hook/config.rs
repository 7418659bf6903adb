/// Pipeline behaviour shared by every chain started from a table.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Emit a `tracing` warning for UPDATE/DELETE without WHERE. Default `true`.
    pub warn_on_unscoped: bool,
    /// Truncate SQL in pipeline log events (in bytes). `None` means no truncation.
    pub max_logged_sql_length: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            warn_on_unscoped: true,
            max_logged_sql_length: Some(200),
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the unscoped-mutation warning.
    pub fn warn_on_unscoped(mut self, enabled: bool) -> Self {
        self.warn_on_unscoped = enabled;
        self
    }

    /// Set the maximum SQL length written to logs.
    pub fn with_max_logged_sql_length(mut self, len: usize) -> Self {
        self.max_logged_sql_length = Some(len);
        self
    }

    /// Log SQL in full.
    pub fn no_sql_truncation(mut self) -> Self {
        self.max_logged_sql_length = None;
        self
    }

    pub(crate) fn loggable_sql(&self, sql: &str) -> String {
        match self.max_logged_sql_length {
            Some(max) if sql.len() > max => format!("{}...", super::truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }
}
