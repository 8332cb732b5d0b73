//! Domain error types.
//!
//! Grammar problems are not errors: an unresolvable token degrades to an
//! inline diagnostic in the substituted text. This enum covers hard
//! failures only: configuration, storage, and I/O.

/// Top-level error type for stockchat.
#[derive(Debug, thiserror::Error)]
pub enum StockchatError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("import error in {file}: {reason}")]
    Import { file: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StockchatError> for std::process::ExitCode {
    fn from(err: &StockchatError) -> Self {
        let code: u8 = match err {
            StockchatError::Io(_) => 1,
            StockchatError::ConfigParse { .. }
            | StockchatError::ConfigMissing { .. }
            | StockchatError::ConfigInvalid { .. } => 2,
            StockchatError::Database { .. } | StockchatError::DatabaseQuery { .. } => 3,
            StockchatError::Import { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
