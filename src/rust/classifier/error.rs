use ort::Error as OrtError;

/// Represents the different types of errors that can occur on the guess path.
///
/// Every variant is local to a single guess; none of them leave the stroke
/// buffer in a different state than before the guess.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    /// The pixel buffer could not be allocated for the requested size
    #[error("Failed to allocate pixel buffer for {width}x{height}")]
    AllocationFailed { width: u32, height: u32 },
    /// The classifier failed to load at session start
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    /// Input construction or inference raised an error
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    /// Error occurred while loading or validating the ONNX model
    #[error("Model error: {0}")]
    ModelError(String),
    /// Error occurred due to invalid configuration
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::ModelError(err.to_string())
    }
}
