use thiserror::Error;
use webnn_structures::WebnnDataError;

/// Errors surfaced by the client and server command loops.
///
/// Every variant returned from `handle_commands` is fatal to the stream it came from.
#[derive(Debug, Error)]
pub enum WireError {
    /// A command could not be framed or decoded.
    #[error("Malformed command stream: {0}")]
    Data(#[from] WebnnDataError),

    /// A well-formed command could not be applied (unknown object, stale generation, duplicate
    /// allocation, unknown request serial, ...).
    #[error("Fatal command stream error: {0}")]
    FatalStream(String),

    #[error("Wire connection is disconnected")]
    Disconnected,
}

pub type WireResult<T> = Result<T, WireError>;
