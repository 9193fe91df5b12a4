use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const EXCLUDE_FILENAME: &str = "mirror_exclude";
pub const INCLUDE_FILENAME: &str = "mirror_include";

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("exclude rule file does not exist: {}", .0.display())]
    ExcludeMissing(PathBuf),
    #[error("cannot read rule file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reads a newline-delimited pattern list, skipping blank lines and `#`
/// comments.
pub fn read_rule_file(path: &Path) -> Result<Vec<String>, RuleError> {
    let content = std::fs::read_to_string(path).map_err(|source| RuleError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFiles {
    pub exclude: PathBuf,
    pub include: Option<PathBuf>,
}

impl RuleFiles {
    /// Finds the rule files in `dir`. The exclude list is mandatory, the
    /// include list optional.
    pub fn locate(dir: &Path) -> Result<Self, RuleError> {
        let exclude = dir.join(EXCLUDE_FILENAME);
        match std::fs::metadata(&exclude) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RuleError::ExcludeMissing(exclude));
            }
            Err(source) => {
                return Err(RuleError::Read {
                    path: exclude,
                    source,
                });
            }
        }

        let include = dir.join(INCLUDE_FILENAME);
        let include = include.exists().then_some(include);

        Ok(RuleFiles { exclude, include })
    }

    /// Number of active patterns in the exclude and include lists.
    pub fn count_patterns(&self) -> Result<(usize, Option<usize>), RuleError> {
        let exclude = read_rule_file(&self.exclude)?;
        debug!("{} exclude patterns: {:?}", exclude.len(), exclude);

        let include = match &self.include {
            Some(path) => {
                let include = read_rule_file(path)?;
                debug!("{} include patterns: {:?}", include.len(), include);
                Some(include.len())
            }
            None => None,
        };

        Ok((exclude.len(), include))
    }

    /// rsync reads the patterns itself, so only the file paths are passed.
    pub fn sync_args(&self) -> Vec<String> {
        let mut args = vec![format!("--exclude-from={}", self.exclude.display())];
        if let Some(include) = &self.include {
            args.push(format!("--include-from={}", include.display()));
        }
        args
    }
}
