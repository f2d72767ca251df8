use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::{Result, StegJpegError};
use crate::CoverJpeg;

/// Prepare an extract operation.
pub fn prepare() -> ExtractApi {
    ExtractApi::default()
}

/// Builder for recovering a payload from a stego JPEG file.
#[derive(Debug, Default)]
pub struct ExtractApi {
    image: Option<PathBuf>,
}

impl ExtractApi {
    /// The stego JPEG to read.
    pub fn from_stego_file<A: AsRef<Path>>(mut self, image: A) -> Self {
        self.image = Some(image.as_ref().to_path_buf());
        self
    }

    /// Recover the raw hidden byte stream.
    pub fn execute(self) -> Result<Vec<u8>> {
        self.open()?.extract()
    }

    /// Produce the verbose coefficient report instead of the raw stream.
    pub fn execute_report(self) -> Result<String> {
        self.open()?.extract_report()
    }

    fn open(self) -> Result<CoverJpeg<BufReader<File>>> {
        let Some(image) = self.image else {
            return Err(StegJpegError::CarrierNotSet);
        };
        CoverJpeg::open(BufReader::new(File::open(image)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_requires_a_carrier() {
        assert!(matches!(
            prepare().execute(),
            Err(StegJpegError::CarrierNotSet)
        ));
    }
}
