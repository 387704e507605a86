use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Data unavailable: {0}")]
    NoData(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}
