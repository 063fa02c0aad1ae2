//! CLI module for audiocut.

mod output;
pub mod preflight;
pub mod session;

pub use output::Output;
pub use session::Session;

use clap::Parser;

/// audiocut - grab audio from online videos
///
/// Interactive: pick a full download or a trimmed segment from the menu.
#[derive(Parser, Debug)]
#[command(name = "audiocut")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "AUDIOCUT_CONFIG")]
    pub config: Option<String>,

    /// Write a default configuration file to the config path and exit
    #[arg(long)]
    pub init_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments() {
        let cli = Cli::try_parse_from(["audiocut"]).unwrap();
        assert_eq!(cli.verbose, 0);
        assert!(!cli.init_config);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from(["audiocut", "-vv", "--config", "my.toml"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config.as_deref(), Some("my.toml"));
    }

    #[test]
    fn test_init_config_flag() {
        let cli = Cli::try_parse_from(["audiocut", "--init-config"]).unwrap();
        assert!(cli.init_config);
    }
}
