use thiserror::Error;

/// Configuration failures raised before any binning pass runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BinError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Invalid value selection: {0}")]
    InvalidValueSelection(String),

    #[error("{what} has dimensions {found:?}, expected {expected:?}")]
    DimensionMismatch {
        what: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },
}

pub type Result<T> = std::result::Result<T, BinError>;
