//! Command-line interface for snek3d.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "snek3d", about = "3D snake arena renderer")]
pub struct Cli {
    /// Content root holding `Models/` and `Videos/`
    #[arg(long, default_value = "Content")]
    pub content: PathBuf,

    /// Start the promo video overlay immediately
    #[arg(long)]
    pub start_video: bool,

    /// Debug-level logging for this crate
    #[arg(long, short)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["snek3d"]).unwrap();
        assert_eq!(cli.content, PathBuf::from("Content"));
        assert!(!cli.start_video);
        assert!(!cli.verbose);
    }

    #[test]
    fn all_flags() {
        let cli =
            Cli::try_parse_from(["snek3d", "--content", "/tmp/assets", "--start-video", "-v"])
                .unwrap();
        assert_eq!(cli.content, PathBuf::from("/tmp/assets"));
        assert!(cli.start_video);
        assert!(cli.verbose);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(Cli::try_parse_from(["snek3d", "--fullscreen"]).is_err());
    }
}
