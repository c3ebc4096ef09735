//! Error types for the analysis library

use thiserror::Error;

/// Result type for library operations
pub type Result<T> = std::result::Result<T, MvpaError>;

/// Errors raised by dataset handling and analyses
#[derive(Error, Debug)]
pub enum MvpaError {
    /// Matrix or attribute dimensions do not fit together
    #[error("Shape mismatch: {reason}")]
    Shape {
        /// What did not fit
        reason: String,
    },

    /// Requested attribute is missing
    #[error("No {collection} attribute named '{name}'")]
    MissingAttribute {
        /// Collection searched (sa, fa, a)
        collection: &'static str,
        /// Attribute name
        name: String,
    },

    /// Attribute exists but has an unusable type or value
    #[error("Invalid attribute '{name}': {reason}")]
    InvalidAttribute {
        /// Attribute name
        name: String,
        /// Why it cannot be used
        reason: String,
    },

    /// Malformed input file or expression
    #[error("Invalid format: {reason}")]
    InvalidFormat {
        /// Reason for invalid format
        reason: String,
    },

    /// Invalid analysis parameter
    #[error("Invalid parameter: {reason}")]
    InvalidParameter {
        /// Which parameter and why
        reason: String,
    },

    /// Classifier could not be trained or applied
    #[error("Classifier error: {reason}")]
    Classifier {
        /// Failure reason
        reason: String,
    },

    /// No usable partitions could be generated
    #[error("Partitioning error: {reason}")]
    Partition {
        /// Failure reason
        reason: String,
    },

    /// Selection produced no samples or features
    #[error("Empty selection: {reason}")]
    EmptySelection {
        /// Which selection came up empty
        reason: String,
    },

    /// I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: String,
        /// Source I/O error
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary (de)serialization error
    #[error("Binary encoding error: {0}")]
    Bincode(#[from] bincode::Error),
}

impl MvpaError {
    /// Create a shape error
    pub fn shape(reason: impl Into<String>) -> Self {
        Self::Shape { reason: reason.into() }
    }

    /// Create an invalid format error
    pub fn format(reason: impl Into<String>) -> Self {
        Self::InvalidFormat { reason: reason.into() }
    }

    /// Create an invalid parameter error
    pub fn param(reason: impl Into<String>) -> Self {
        Self::InvalidParameter { reason: reason.into() }
    }

    /// Create an invalid attribute error
    pub fn attribute(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Short name of the error kind, used in top-level reports
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Shape { .. } => "ShapeError",
            Self::MissingAttribute { .. } | Self::InvalidAttribute { .. } => "AttributeError",
            Self::InvalidFormat { .. } | Self::Json(_) | Self::Bincode(_) => "FormatError",
            Self::InvalidParameter { .. } => "ParameterError",
            Self::Classifier { .. } => "ClassifierError",
            Self::Partition { .. } => "PartitionError",
            Self::EmptySelection { .. } => "SelectionError",
            Self::Io { .. } => "IoError",
        }
    }
}
