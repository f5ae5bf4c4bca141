//! Error types for the fountain codec.
//!
//! Per-block problems (`MalformedBlock`) are local to one block: callers
//! drop the block and keep reading the channel. `ChecksumFailure` is the one
//! terminal error, raised only when a fully peeled transfer does not match
//! its session checksum.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, FountainError>;

#[derive(Debug, Error)]
pub enum FountainError {
    /// Block buffer or block fields inconsistent with the wire layout.
    #[error("malformed block: {0}")]
    MalformedBlock(String),

    /// Reconstructed bytes do not match the session checksum.
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumFailure { expected: u32, actual: u32 },

    /// Encoder constructed with unusable input or parameters.
    #[error("encoder misuse: {0}")]
    EncoderMisuse(String),

    /// Reconstruction requested before every symbol is known.
    #[error("transfer incomplete: {resolved} of {total} symbols resolved")]
    Incomplete { resolved: usize, total: usize },

    /// Container frame truncated or inconsistent.
    #[error("container error: {0}")]
    Container(String),

    #[error("metadata error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(#[from] base64::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
