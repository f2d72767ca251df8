//! # stegjpeg-core
//!
//! Hides an arbitrary byte stream inside a baseline sequential JPEG by
//! replacing quantized DCT coefficients with payload bytes, and recovers
//! it again. The carrier is transcoded at the entropy-coded level: blocks
//! are Huffman-decoded, selected coefficients overwritten, and the scan
//! re-encoded against a replacement AC table that can code any byte
//! value. The rewritten quantization tables mark the hiding positions, so
//! any decoder of the output finds them as the set of zero entries.
//!
//! ## Usage
//!
//! Hide and recover a message through the byte-slice helpers:
//!
//! ```no_run
//! use stegjpeg_core::{extract_from_jpeg, hide_in_jpeg, HideOptions};
//!
//! # fn main() -> stegjpeg_core::Result<()> {
//! let cover = std::fs::read("cover.jpg")?;
//! let stego = hide_in_jpeg(&cover, b"my secret", &HideOptions::default())?;
//! std::fs::write("stego.jpg", &stego)?;
//!
//! let recovered = extract_from_jpeg(&stego)?;
//! assert!(recovered.starts_with(b"my secret"));
//! # Ok(())
//! # }
//! ```
//!
//! Or work with files through the builder API:
//!
//! ```no_run
//! # fn main() -> stegjpeg_core::Result<()> {
//! stegjpeg_core::api::hide::prepare()
//!     .with_image("cover.jpg")
//!     .with_output("stego.jpg")
//!     .with_message("my secret")
//!     .with_depth(7)
//!     .execute()?;
//!
//! let recovered = stegjpeg_core::api::extract::prepare()
//!     .from_stego_file("stego.jpg")
//!     .execute()?;
//! # Ok(())
//! # }
//! ```

mod cover;
mod error;
mod payload;

pub mod api;
pub mod jpeg;

pub use cover::CoverJpeg;
pub use error::{Result, StegJpegError};
pub use payload::{PayloadSource, SeekablePayload, StreamingPayload};

use std::io::Cursor;

/// Default number of payload bytes hidden per 8x8 block of each
/// component.
pub const DEFAULT_DEPTH: usize = 7;

/// Options for a hide operation.
#[derive(Debug, Clone)]
pub struct HideOptions {
    /// Zigzag positions to mark per component quantization table, 1-63.
    /// Each marked position carries one payload byte per block.
    pub depth: usize,
    /// Rewind the payload and keep embedding once it is exhausted.
    pub repeat: bool,
}

impl Default for HideOptions {
    fn default() -> Self {
        HideOptions {
            depth: DEFAULT_DEPTH,
            repeat: false,
        }
    }
}

/// Hide `payload` inside `jpeg` and return the stego image bytes.
pub fn hide_in_jpeg(jpeg: &[u8], payload: &[u8], options: &HideOptions) -> Result<Vec<u8>> {
    let mut cover = CoverJpeg::open(Cursor::new(jpeg))?;
    let mut payload = SeekablePayload::new(Cursor::new(payload));
    let mut output = Vec::new();
    cover.hide(&mut payload, options, &mut output)?;
    Ok(output)
}

/// Recover the hidden byte stream from a stego JPEG.
pub fn extract_from_jpeg(jpeg: &[u8]) -> Result<Vec<u8>> {
    CoverJpeg::open(Cursor::new(jpeg))?.extract()
}
