/// Domain errors raised by the pure listing logic.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Image index {index} out of range for {len} image(s)")]
    ImageIndexOutOfRange { index: usize, len: usize },
}
