mod help_text;

use crate::config::Settings;
use clap::{ArgAction, CommandFactory, Parser, ValueEnum};
use std::path::PathBuf;

/// Mirror a directory with rsync, guarded by a reviewed dry run
#[derive(Parser, Debug)]
#[command(
    name = "folder-mirror",
    version,
    about,
    long_about = help_text::ROOT_LONG_ABOUT,
    disable_help_flag = true
)]
pub struct Cli {
    /// Directory to copy from
    #[arg(value_name = "SOURCE_DIR")]
    pub source: Option<String>,

    /// Directory to make identical to SOURCE_DIR
    #[arg(value_name = "TARGET_DIR")]
    pub target: Option<String>,

    /// Preview the mirror without changing anything and record a confirmation marker
    #[arg(long)]
    pub dry_run: bool,

    /// Open the dry-run output in $VISUAL or $EDITOR when done
    #[arg(long, requires = "dry_run")]
    pub view: bool,

    /// Print help
    #[arg(long, action = ArgAction::SetTrue)]
    pub help: bool,

    /// Increase logging verbosity (-v debug, -vv trace). Takes precedence over RUST_LOG.
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "log_level")]
    pub verbose: u8,

    /// Set the log level explicitly. Takes precedence over RUST_LOG.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Config file (default: ~/.config/folder-mirror/config.toml)
    #[arg(long, value_name = "FILE", env = "FOLDER_MIRROR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Confirmation marker file [default: /tmp/folder_mirror_marker]
    #[arg(long, value_name = "PATH", env = "FOLDER_MIRROR_MARKER")]
    pub marker_file: Option<PathBuf>,

    /// Maximum marker age in seconds [default: 3600]
    #[arg(long, value_name = "SECS", env = "FOLDER_MIRROR_MARKER_TIMEOUT")]
    pub marker_timeout: Option<u64>,

    /// File receiving the dry-run output [default: /tmp/folder_mirror.log]
    #[arg(long, value_name = "PATH", env = "FOLDER_MIRROR_LOG")]
    pub log_file: Option<PathBuf>,

    /// rsync program to run [default: rsync]
    #[arg(long, value_name = "PROGRAM", env = "FOLDER_MIRROR_RSYNC")]
    pub rsync_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl Cli {
    pub fn try_parse() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }

    pub fn usage() -> String {
        Self::command().render_long_help().to_string()
    }

    /// Both directories, unless help was requested or one is missing.
    pub fn directories(&self) -> Option<(&str, &str)> {
        if self.help {
            return None;
        }
        Some((self.source.as_deref()?, self.target.as_deref()?))
    }

    /// Log filter requested on the command line, if any.
    pub fn log_directive(&self) -> Option<&'static str> {
        match (self.log_level, self.verbose) {
            (Some(level), _) => Some(level.as_directive()),
            (None, 0) => None,
            (None, 1) => Some("debug"),
            (None, _) => Some("trace"),
        }
    }

    /// Settings given as flags or environment variables.
    pub fn settings(&self) -> Settings {
        Settings {
            marker_file: self.marker_file.clone(),
            marker_timeout_secs: self.marker_timeout,
            log_file: self.log_file.clone(),
            rsync_path: self.rsync_path.clone(),
            rules_dir: None,
        }
    }
}
