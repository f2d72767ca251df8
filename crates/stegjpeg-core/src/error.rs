//! Error types for hide/extract operations.

use std::fmt;
use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StegJpegError>;

/// Errors that can occur while transcoding a JPEG or moving payload bytes.
#[derive(Error)]
pub enum StegJpegError {
    /// The input is not a baseline sequential, Huffman-coded JPEG with at
    /// most three components (progressive, arithmetic-coded, DNL, or a
    /// nonzero restart interval).
    #[error("input is not a baseline sequential Huffman-coded JPEG")]
    UnsupportedFormat,

    /// A marker segment was truncated or internally inconsistent.
    #[error("malformed marker segment: {reason}")]
    MalformedSegment { reason: String },

    /// The entropy-coded data produced no Huffman table match within 16 bits.
    #[error("entropy-coded data produced no Huffman code match within 16 bits")]
    InvalidHuffmanCode,

    /// Re-encoding asked for a symbol the active Huffman table cannot code.
    #[error("symbol 0x{symbol:02x} has no code in the active Huffman table")]
    UnencodableSymbol { symbol: u8 },

    /// The input ended in the middle of an entropy-coded block.
    #[error("input exhausted in the middle of an entropy-coded block")]
    UnexpectedEof,

    /// An underlying byte source or sink failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The hiding depth is outside the valid range.
    #[error("depth must be between 1 and 63, got {0}")]
    InvalidDepth(usize),

    /// No carrier image was set on the builder.
    #[error("no carrier image set")]
    CarrierNotSet,

    /// No output target was set on the builder.
    #[error("no output target set")]
    TargetNotSet,

    /// Neither a payload message nor a payload file was set on the builder.
    #[error("no payload message or file set")]
    MissingPayload,
}

impl StegJpegError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        StegJpegError::MalformedSegment {
            reason: reason.into(),
        }
    }
}

impl fmt::Debug for StegJpegError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Use Display for Debug so unwrap() shows user-friendly messages
        write!(f, "{self}")
    }
}
