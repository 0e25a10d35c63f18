#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Exceeded point count: {0} should be no more than {1}")]
    ExceededPointCount(usize, usize),

    #[error("Insufficient data: {expected} bytes are expected but {actual} bytes are found")]
    InsufficientData { expected: usize, actual: usize },

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    #[error("Pipeline construction error: {0}")]
    PipelineConstruction(String),

    #[error("Readback error: {0}")]
    Readback(String),

    #[error("Validation error: {0} should be {1}")]
    Validation(String, String),
}
