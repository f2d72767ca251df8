use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, StegJpegError};
use crate::payload::SeekablePayload;
use crate::{CoverJpeg, HideOptions, DEFAULT_DEPTH};

/// Prepare a hide operation with default options.
pub fn prepare() -> HideApi {
    HideApi::default()
}

/// Builder for hiding a payload in a JPEG file.
#[derive(Debug)]
pub struct HideApi {
    image: Option<PathBuf>,
    output: Option<PathBuf>,
    message: Option<String>,
    file: Option<PathBuf>,
    depth: usize,
    repeat: bool,
}

impl Default for HideApi {
    fn default() -> Self {
        HideApi {
            image: None,
            output: None,
            message: None,
            file: None,
            depth: DEFAULT_DEPTH,
            repeat: false,
        }
    }
}

impl HideApi {
    /// The cover JPEG, used read-only.
    pub fn with_image<A: AsRef<Path>>(mut self, image: A) -> Self {
        self.image = Some(image.as_ref().to_path_buf());
        self
    }

    /// Where the stego JPEG will be written.
    pub fn with_output<A: AsRef<Path>>(mut self, output: A) -> Self {
        self.output = Some(output.as_ref().to_path_buf());
        self
    }

    /// A text message to hide.
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    /// A file whose contents will be hidden. Takes precedence over a
    /// message when both are set.
    pub fn with_file<A: AsRef<Path>>(mut self, file: A) -> Self {
        self.file = Some(file.as_ref().to_path_buf());
        self
    }

    /// Number of payload bytes hidden per 8x8 block of each component.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Rewind and repeat the payload until the image is full.
    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn execute(self) -> Result<()> {
        let Some(image) = self.image else {
            return Err(StegJpegError::CarrierNotSet);
        };
        let Some(output) = self.output else {
            return Err(StegJpegError::TargetNotSet);
        };
        let options = HideOptions {
            depth: self.depth,
            repeat: self.repeat,
        };

        let mut cover = CoverJpeg::open(BufReader::new(File::open(image)?))?;
        let mut sink = BufWriter::new(File::create(output)?);

        match (self.file, self.message) {
            (Some(file), _) => {
                let mut payload = SeekablePayload::new(BufReader::new(File::open(file)?));
                cover.hide(&mut payload, &options, &mut sink)?;
            }
            (None, Some(message)) => {
                let mut payload = SeekablePayload::new(Cursor::new(message.into_bytes()));
                cover.hide(&mut payload, &options, &mut sink)?;
            }
            (None, None) => return Err(StegJpegError::MissingPayload),
        }
        sink.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_requires_a_carrier() {
        let result = prepare().with_output("/tmp/out.jpg").with_message("x").execute();
        assert!(matches!(result, Err(StegJpegError::CarrierNotSet)));
    }

    #[test]
    fn execute_requires_an_output() {
        let result = prepare().with_image("/tmp/in.jpg").with_message("x").execute();
        assert!(matches!(result, Err(StegJpegError::TargetNotSet)));
    }
}
