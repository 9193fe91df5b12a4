use crate::runner;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MARKER_FILE: &str = "/tmp/folder_mirror_marker";
pub const DEFAULT_MARKER_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_LOG_FILE: &str = "/tmp/folder_mirror.log";
/// Rule directory, relative to the home directory.
pub const DEFAULT_RULES_SUBDIR: &str = "loadrc/bashrc";
/// Config file location, relative to the home directory.
pub const DEFAULT_CONFIG_SUBPATH: &str = ".config/folder-mirror/config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("cannot determine home directory")]
    NoHome,
}

/// A partial configuration, as given on the command line or in the config
/// file. Unset fields fall through to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub marker_file: Option<PathBuf>,
    pub marker_timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
    pub rsync_path: Option<String>,
    pub rules_dir: Option<PathBuf>,
}

impl Settings {
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads an explicitly requested config file, or the default one under
    /// `home` if it exists. Only an explicit file is required to exist.
    pub fn load(explicit: Option<&Path>, home: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match (explicit, home) {
            (Some(path), _) => path.to_path_buf(),
            (None, Some(home)) => {
                let default = home.join(DEFAULT_CONFIG_SUBPATH);
                if !default.is_file() {
                    return Ok(Settings::default());
                }
                default
            }
            (None, None) => return Ok(Settings::default()),
        };

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_toml(&content, &path)
    }

    /// Fields set in `self` win over those in `fallback`.
    pub fn or(self, fallback: Settings) -> Settings {
        Settings {
            marker_file: self.marker_file.or(fallback.marker_file),
            marker_timeout_secs: self.marker_timeout_secs.or(fallback.marker_timeout_secs),
            log_file: self.log_file.or(fallback.log_file),
            rsync_path: self.rsync_path.or(fallback.rsync_path),
            rules_dir: self.rules_dir.or(fallback.rules_dir),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    pub marker_file: PathBuf,
    pub marker_timeout: Duration,
    /// Where the preview output is saved.
    pub log_file: PathBuf,
    pub rsync_path: String,
    /// Directory holding `mirror_exclude` and `mirror_include`.
    pub rules_dir: PathBuf,
}

impl MirrorConfig {
    pub fn resolve(settings: Settings, home: Option<&Path>) -> Result<Self, ConfigError> {
        let rules_dir = match settings.rules_dir {
            Some(dir) => dir,
            None => home.ok_or(ConfigError::NoHome)?.join(DEFAULT_RULES_SUBDIR),
        };

        Ok(MirrorConfig {
            marker_file: settings
                .marker_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MARKER_FILE)),
            marker_timeout: Duration::from_secs(
                settings
                    .marker_timeout_secs
                    .unwrap_or(DEFAULT_MARKER_TIMEOUT_SECS),
            ),
            log_file: settings
                .log_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            rsync_path: settings
                .rsync_path
                .unwrap_or_else(|| runner::DEFAULT_PROGRAM.to_string()),
            rules_dir,
        })
    }
}

/// The home directory, honouring `$HOME`.
pub fn home_dir() -> Option<PathBuf> {
    home::home_dir().filter(|home| !home.as_os_str().is_empty())
}
