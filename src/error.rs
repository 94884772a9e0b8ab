use thiserror::Error;

/// Raw input could not be turned into a table. Terminal for the invocation.
#[derive(Debug, Error)]
pub enum DataFormatError {
    #[error("data must be a JSON or CSV string, an array, or an object")]
    UnsupportedInput,

    #[error("unsupported value type for field '{0}'")]
    UnsupportedValue(String),

    #[error("array elements must be all objects or all scalars")]
    MixedSequence,

    #[error("column '{name}' has {got} values, expected {expected}")]
    RaggedColumns {
        name: String,
        got: usize,
        expected: usize,
    },

    #[error("could not parse string data as JSON or CSV")]
    UnparseableText,

    #[error("insufficient data")]
    InsufficientData,
}

/// A valid table exists but no role assignment satisfies the chart kind.
/// Terminal for the invocation.
#[derive(Debug, Error)]
pub enum RoleAssignmentError {
    #[error("insufficient data")]
    InsufficientData,

    #[error("no positive values")]
    NoPositiveValues,

    #[error("column '{0}' must be numeric")]
    NonNumeric(String),

    #[error("bin count must be at least 1")]
    InvalidBins,
}
