//! Error handling for the mvpa CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Analysis library error
    #[error("{0}")]
    Analysis(#[from] mvpa_core::MvpaError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session script failed
    #[error("{origin}:{line}: {message}")]
    Script {
        /// Script file or `-e` expression
        origin: String,
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },

    /// Invalid command arguments
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    /// Command is registered but not available in this build
    #[error("Command '{name}' is unavailable: {reason}")]
    Unavailable {
        /// Command name
        name: String,
        /// Why it is unavailable
        reason: String,
    },

    /// Command panicked
    #[error("Internal error: {0}")]
    Panic(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0:#}")]
    Generic(#[from] anyhow::Error),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid arguments error
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArgs(msg.into())
    }

    /// Create a script error
    pub fn script(origin: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Script {
            origin: origin.into(),
            line,
            message: message.into(),
        }
    }

    /// Kind name shown next to the message in top-level reports
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Analysis(e) => e.kind_name(),
            Self::Config(_) => "ConfigError",
            Self::Script { .. } => "ScriptError",
            Self::InvalidArgs(_) => "UsageError",
            Self::Unavailable { .. } => "UnavailableCommand",
            Self::Panic(_) => "Panic",
            Self::Io(_) => "IoError",
            Self::Json(_) => "SerializationError",
            Self::Generic(_) => "Error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_follow_the_source() {
        let e: CliError = mvpa_core::MvpaError::param("bad").into();
        assert_eq!(e.kind_name(), "ParameterError");
        assert_eq!(CliError::script("x.mvpa", 3, "boom").to_string(), "x.mvpa:3: boom");
        assert_eq!(CliError::script("x", 1, "y").kind_name(), "ScriptError");
    }
}
