use thiserror::Error;

use crate::methods::method::MethodKind;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Matrix or method is not set")]
    NotReady,
    #[error("Index ({row}, {col}) is out of range for a {rows}x{cols} matrix")]
    OutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
    #[error("No step to undo")]
    NoHistory,
    #[error("No more steps, the reduction is finished")]
    NoMoreSteps,
    /// A pivot the classifier vouched for turned out to be near zero.
    #[error("Unexpected zero pivot in row {row} during back-substitution")]
    Degenerate { row: usize },
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),
    #[error("Invalid range: low ({low}) must be lower than high ({high})")]
    InvalidRange { low: f64, high: f64 },
    #[error("Step was never performed, its factor is unknown")]
    UnrecordedStep,
    #[error("Workspace does not belong to the {0} method")]
    WorkspaceMismatch(MethodKind),
    #[error("System of {size} equations exceeds the configured maximum of {max}")]
    TooLarge { size: usize, max: usize },
    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SolverError>;
