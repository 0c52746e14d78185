use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("tracing cancelled")]
    Cancelled,
}
