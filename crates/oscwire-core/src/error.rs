//! Error types for the OSC codec

use thiserror::Error;

/// Result type alias for codec and address operations
pub type Result<T> = std::result::Result<T, Error>;

/// OSC error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed constructor or mutator input
    #[error("validation error: {0}")]
    Validation(String),

    /// Attempt to pack an incomplete or unencodable entity
    #[error("encode error: {0}")]
    Encode(String),

    /// Malformed wire data
    #[error("decode error: {0}")]
    Decode(String),

    /// Wire data ends before a field is complete
    #[error("buffer too small: need {needed} bytes, have {have}")]
    BufferTooSmall { needed: usize, have: usize },

    /// Enclosing bundle is scheduled later than a bundle it contains
    #[error("bundle ordering error: outer timestamp {outer} is newer than enclosed {inner}")]
    Ordering { outer: i64, inner: i64 },

    /// 64-bit value outside its representable bounds
    #[error("value out of range: {0}")]
    Range(String),

    /// Address pattern could not be compiled
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
}

impl Error {
    /// True for every failure caused by malformed wire data
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode(_) | Error::BufferTooSmall { .. })
    }

    /// True for failures raised while packing
    pub fn is_encode(&self) -> bool {
        matches!(self, Error::Encode(_))
    }

    pub(crate) fn truncated(needed: usize, have: usize) -> Self {
        Error::BufferTooSmall { needed, have }
    }
}
