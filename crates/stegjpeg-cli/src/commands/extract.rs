use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;

use crate::CliResult;

/// Recovers data hidden in the quantized DCT coefficients of a JPEG
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Show all quantized DCT coefficients alongside the recovered bytes
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Stego JPEG to read
    #[arg(value_name = "injpeg")]
    pub image: PathBuf,
}

impl ExtractArgs {
    pub fn run(self) -> CliResult<()> {
        log::debug!("extracting from {:?} (verbose: {})", self.image, self.verbose);
        let api = stegjpeg_core::api::extract::prepare().from_stego_file(self.image);

        let mut stdout = io::stdout().lock();
        if self.verbose {
            let report = api.execute_report()?;
            stdout.write_all(report.as_bytes())?;
        } else {
            let payload = api.execute()?;
            stdout.write_all(&payload)?;
            stdout.write_all(b"\n")?;
        }

        Ok(())
    }
}
