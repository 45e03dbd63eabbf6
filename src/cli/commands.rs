use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::transcode::TranscodeTarget;

#[derive(Parser, Debug)]
#[command(name = "dvtag")]
#[command(version)]
#[command(about = "Tag doujin voice works with metadata from the online catalog", long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Library root containing work folders (RJ/BJ/VJ numbers in their names)
    pub dirpath: PathBuf,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    pub version: Option<bool>,

    /// Transcode WAV files to FLAC before tagging
    #[arg(long = "w2f", conflicts_with = "w2m")]
    pub w2f: bool,

    /// Transcode WAV files to MP3 before tagging
    #[arg(long = "w2m")]
    pub w2m: bool,

    /// Configuration file (defaults to ./dvtag.toml when present)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Number of folders processed in parallel
    #[arg(short = 'j', long = "jobs", value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: Option<u16>,

    /// Also write a per-folder CSV report
    #[arg(long = "report")]
    pub report: Option<PathBuf>,
}

impl Cli {
    /// Parses the process arguments, accepting `-w2f` / `-w2m` spellings.
    pub fn parse_normalized() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    pub fn transcode_target(&self) -> Option<TranscodeTarget> {
        if self.w2f {
            Some(TranscodeTarget::Flac)
        } else if self.w2m {
            Some(TranscodeTarget::Mp3)
        } else {
            None
        }
    }
}

/// Rewrites `-w2f` and `-w2m` to their double-dash forms so clap does not
/// read them as bundled short flags.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| match arg.to_str() {
            Some("-w2f") => OsString::from("--w2f"),
            Some("-w2m") => OsString::from("--w2m"),
            _ => arg,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(normalize_args(args.iter().copied()))
    }

    #[test]
    fn legacy_transcode_flags() {
        let cli = parse(&["dvtag", "-w2f", "/music"]).unwrap();
        assert_eq!(cli.transcode_target(), Some(TranscodeTarget::Flac));
        assert_eq!(cli.dirpath, PathBuf::from("/music"));

        let cli = parse(&["dvtag", "/music", "--w2m"]).unwrap();
        assert_eq!(cli.transcode_target(), Some(TranscodeTarget::Mp3));
    }

    #[test]
    fn transcode_flags_conflict() {
        let err = parse(&["dvtag", "-w2f", "-w2m", "/music"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn dirpath_is_required() {
        let err = parse(&["dvtag", "-w2f"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn short_v_prints_version() {
        let err = parse(&["dvtag", "-v"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn run_options() {
        let cli = parse(&["dvtag", "-c", "my.toml", "-j", "3", "--report", "out.csv", "lib"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("my.toml")));
        assert_eq!(cli.jobs, Some(3));
        assert_eq!(cli.report, Some(PathBuf::from("out.csv")));
        assert_eq!(cli.transcode_target(), None);
        assert!(parse(&["dvtag", "-j", "0", "lib"]).is_err());
    }
}
