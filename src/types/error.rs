//! Error types for the crossfacet library.

use thiserror::Error;

/// All errors that can occur in the crossfacet library.
#[derive(Error, Debug)]
pub enum FacetError {
    /// Two dimensions share the same name.
    #[error("Duplicate dimension name: {0}")]
    DuplicateDimension(String),

    /// A dimension was declared without a name.
    #[error("Dimension name must not be empty")]
    EmptyDimensionName,

    /// A dimension does not reference any record field.
    #[error("Dimension {0} does not reference a field")]
    MissingField(String),

    /// A static dimension declares no bucket values.
    #[error("Dimension {0} declares no values")]
    NoValues(String),

    /// A bucket value is declared twice in one dimension.
    #[error("Dimension {dimension} declares bucket {value} more than once")]
    DuplicateBucket { dimension: String, value: String },

    /// The default bucket for missing fields is not a declared value.
    #[error("Dimension {dimension}: missing-value bucket {value} is not a declared value")]
    InvalidMissingBucket { dimension: String, value: String },

    /// Dimension not found by name.
    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    /// Bucket value not declared for the dimension.
    #[error("Value {value} is not a bucket of dimension {dimension}")]
    UnknownBucket { dimension: String, value: String },

    /// A `dimension=value` selection could not be parsed.
    #[error("Invalid selection {0:?}: expected dimension=value")]
    InvalidSelection(String),

    /// Operation requires a configuration loaded by a previous `load`.
    #[error("No dimension configuration has been loaded")]
    NotLoaded,

    /// Record positions must fit in a 32-bit bitmap.
    #[error("Too many records: {0} exceeds the bitmap capacity")]
    TooManyRecords(usize),

    /// Record file has an unexpected shape.
    #[error("Invalid record set: {0}")]
    InvalidRecordSet(String),

    /// File extension not handled by any reader.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl FacetError {
    /// Whether this error was raised while validating a dimension configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateDimension(_)
                | Self::EmptyDimensionName
                | Self::MissingField(_)
                | Self::NoValues(_)
                | Self::DuplicateBucket { .. }
                | Self::InvalidMissingBucket { .. }
        )
    }

    /// Whether this error rejected a filter operation.
    pub fn is_filter_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownDimension(_) | Self::UnknownBucket { .. } | Self::InvalidSelection(_)
        )
    }
}

/// Convenience result type for crossfacet operations.
pub type FacetResult<T> = Result<T, FacetError>;
