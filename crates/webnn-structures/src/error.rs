use std::error::Error;
use std::fmt::{Display, Formatter};

/// Common error type for WebNN data operations.
///
/// Covers everything that can go wrong while turning wire data into typed values and back:
/// short buffers, unknown discriminants, invalid descriptors and internal invariants.
///
/// # Examples
/// ```
/// use webnn_structures::WebnnDataError;
///
/// fn validate_rank(rank: usize) -> Result<(), WebnnDataError> {
///     if rank > 8 {
///         return Err(WebnnDataError::BadParameters("Rank must be <= 8".into()));
///     }
///     Ok(())
/// }
///
/// assert!(validate_rank(9).is_err());
/// assert!(validate_rank(4).is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebnnDataError {
    /// Failed to deserialize bytes into data structures
    DeserializationError(String),
    /// Failed to serialize data structures into bytes
    SerializationError(String),
    /// Invalid parameters provided to a function
    BadParameters(String),
    /// Internal error indicating a bug
    InternalError(String),
}

impl Display for WebnnDataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WebnnDataError::DeserializationError(msg) => {
                write!(f, "Failed to Deserialize Bytes: {}", msg)
            }
            WebnnDataError::SerializationError(msg) => {
                write!(f, "Failed to Serialize Bytes: {}", msg)
            }
            WebnnDataError::BadParameters(msg) => write!(f, "Bad Parameters: {}", msg),
            WebnnDataError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
        }
    }
}
impl Error for WebnnDataError {}
