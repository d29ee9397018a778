//! Crate-wide error types.
//!
//! Library modules return specific error types where it matters
//! (adapter-boundary failures use [`crate::search::SourceError`], which
//! the engine absorbs rather than propagates); everything that reaches a
//! caller is unified here.

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level engine error.
///
/// Adapter failures never appear here: they are swallowed into empty
/// results at the aggregation boundary. What remains is persistence,
/// configuration, and task plumbing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from the reprocess store
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database migration failure
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Database(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("missing search section");
        assert!(err.to_string().contains("missing search section"));
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::config("bad value").context("while loading config");
        let msg = err.to_string();
        assert!(msg.contains("while loading config"));
    }

    #[test]
    fn test_result_ext() {
        let result: Result<()> = Err(Error::config("test"));
        let with_ctx = result.with_context("additional context");
        assert!(with_ctx.unwrap_err().to_string().contains("additional context"));
    }
}
