use std::path::{Path, PathBuf};

use clap::Args;

use crate::CliResult;

/// Hides data in the quantized DCT coefficients of a baseline JPEG
#[derive(Args, Debug)]
pub struct HideArgs {
    /// Number of payload bytes hidden per 8x8 block of each component
    #[arg(
        short = 'd',
        long = "depth",
        value_name = "depth",
        default_value_t = 7,
        value_parser = clap::value_parser!(u8).range(1..=63)
    )]
    pub depth: u8,

    /// Rewind and repeat the payload until the image is full
    #[arg(short = 'r', long = "repeat")]
    pub repeat: bool,

    /// Filename to output
    #[arg(
        short = 'o',
        long = "out",
        value_name = "outfile",
        default_value = "out.jpg"
    )]
    pub out: PathBuf,

    /// Cover JPEG, used read-only
    #[arg(value_name = "injpeg")]
    pub image: PathBuf,

    /// Payload: a file whose contents are hidden, or the literal string
    /// formed by joining the remaining arguments with spaces
    #[arg(value_name = "data", required = true, num_args = 1..)]
    pub data: Vec<String>,
}

impl HideArgs {
    pub fn run(self) -> CliResult<()> {
        let data = self.data.join(" ");
        log::debug!(
            "hiding into {:?} (depth {}, repeat {})",
            self.out,
            self.depth,
            self.repeat
        );

        let mut api = stegjpeg_core::api::hide::prepare()
            .with_image(self.image)
            .with_output(self.out)
            .with_depth(self.depth as usize)
            .with_repeat(self.repeat);

        if Path::new(&data).is_file() {
            api = api.with_file(&data);
        } else {
            api = api.with_message(&data);
        }

        api.execute()
    }
}
