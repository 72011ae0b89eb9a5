use thiserror::Error;

#[derive(Debug, Error)]
pub enum PairsTradingError {
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Alignment error: {0}")]
    Alignment(String),

    #[error("Insufficient history: at least {required} observations required, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Singular matrix in {context}")]
    SingularMatrix { context: String },

    #[error("Date error: {0}")]
    DateError(String),
}
