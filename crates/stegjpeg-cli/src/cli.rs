use clap::{Parser, Subcommand};

use crate::commands::{extract::ExtractArgs, hide::HideArgs};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Hide(HideArgs),
    Extract(ExtractArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn hide_accepts_flags_and_trailing_data() {
        let args = CliArgs::parse_from([
            "stegjpeg", "hide", "-d", "3", "-r", "-o", "x.jpg", "in.jpg", "hello", "world",
        ]);
        match args.command {
            Commands::Hide(hide) => {
                assert_eq!(hide.depth, 3);
                assert!(hide.repeat);
                assert_eq!(hide.out.to_str(), Some("x.jpg"));
                assert_eq!(hide.image.to_str(), Some("in.jpg"));
                assert_eq!(hide.data, vec!["hello".to_string(), "world".to_string()]);
            }
            _ => panic!("expected hide subcommand"),
        }
    }

    #[test]
    fn hide_rejects_out_of_range_depth() {
        assert!(CliArgs::try_parse_from(["stegjpeg", "hide", "-d", "64", "in.jpg", "x"]).is_err());
        assert!(CliArgs::try_parse_from(["stegjpeg", "hide", "-d", "0", "in.jpg", "x"]).is_err());
    }

    #[test]
    fn extract_accepts_verbose() {
        let args = CliArgs::parse_from(["stegjpeg", "extract", "-v", "in.jpg"]);
        match args.command {
            Commands::Extract(extract) => {
                assert!(extract.verbose);
                assert_eq!(extract.image.to_str(), Some("in.jpg"));
            }
            _ => panic!("expected extract subcommand"),
        }
    }
}
