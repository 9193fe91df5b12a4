//! Confirmation marker gating the apply step on a recent preview.
//!
//! The marker is a single file holding the Unix timestamp (decimal ASCII) of
//! the last successful preview. An apply is only allowed while that
//! timestamp is younger than the configured maximum age.

use chrono::Utc;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    #[error("marker file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("cannot parse marker timestamp {content:?}: {source}")]
    Unparsable {
        content: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("marker file is too old ({age} seconds, maximum {max_age})")]
    Expired { age: u64, max_age: u64 },
    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("IO error: {0}")]
    Io(std::io::Error),
}

#[derive(Debug, Clone)]
pub struct MarkerFile {
    path: PathBuf,
    max_age: Duration,
}

impl MarkerFile {
    pub fn new(path: impl Into<PathBuf>, max_age: Duration) -> Self {
        MarkerFile {
            path: path.into(),
            max_age,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records the current time, replacing any previous marker.
    ///
    /// The timestamp is written to a temporary file next to the marker and
    /// renamed into place, so a concurrent reader never sees a partial value.
    pub fn create(&self) -> Result<(), MarkerError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp_file =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| self.classify(parent, e))?;

        write!(temp_file, "{}", Utc::now().timestamp()).map_err(MarkerError::Io)?;

        temp_file
            .persist(&self.path)
            .map_err(|e| self.classify(&self.path, e.error))?;

        Ok(())
    }

    /// Validates the marker and returns its age.
    pub fn check(&self) -> Result<Duration, MarkerError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => MarkerError::NotFound(self.path.clone()),
            _ => self.classify(&self.path, e),
        })?;

        let trimmed = content.trim();
        let timestamp: i64 = trimmed.parse().map_err(|source| MarkerError::Unparsable {
            content: trimmed.to_string(),
            source,
        })?;

        // A timestamp from the future counts as brand new.
        let age = u64::try_from(Utc::now().timestamp().saturating_sub(timestamp)).unwrap_or(0);
        let max_age = self.max_age.as_secs();
        if age > max_age {
            return Err(MarkerError::Expired { age, max_age });
        }

        Ok(Duration::from_secs(age))
    }

    pub fn remove(&self) -> Result<(), MarkerError> {
        std::fs::remove_file(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => MarkerError::NotFound(self.path.clone()),
            _ => self.classify(&self.path, e),
        })
    }

    fn classify(&self, path: &Path, e: std::io::Error) -> MarkerError {
        if e.kind() == ErrorKind::PermissionDenied {
            MarkerError::PermissionDenied(path.to_path_buf())
        } else {
            MarkerError::Io(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(3600);

    fn marker_in(temp: &TempDir) -> MarkerFile {
        MarkerFile::new(temp.path().join("marker"), HOUR)
    }

    #[test]
    fn test_create_then_check_is_valid() {
        let temp = TempDir::new().unwrap();
        let marker = marker_in(&temp);

        marker.create().unwrap();
        let age = marker.check().unwrap();

        assert!(age <= Duration::from_secs(5));
    }

    #[test]
    fn test_create_writes_current_timestamp() {
        let temp = TempDir::new().unwrap();
        let marker = marker_in(&temp);

        marker.create().unwrap();

        let written: i64 = fs::read_to_string(marker.path()).unwrap().parse().unwrap();
        assert!((Utc::now().timestamp() - written).abs() <= 5);
    }

    #[test]
    fn test_create_truncates_previous_content() {
        let temp = TempDir::new().unwrap();
        let marker = marker_in(&temp);
        fs::write(marker.path(), "this is much longer than any timestamp").unwrap();

        marker.create().unwrap();

        marker.check().unwrap();
    }

    #[test]
    fn test_missing_marker() {
        let temp = TempDir::new().unwrap();
        let err = marker_in(&temp).check().unwrap_err();

        assert!(matches!(err, MarkerError::NotFound(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_unparsable_marker() {
        let temp = TempDir::new().unwrap();
        let marker = marker_in(&temp);
        fs::write(marker.path(), "yesterday").unwrap();

        let err = marker.check().unwrap_err();

        assert!(matches!(err, MarkerError::Unparsable { .. }));
        assert!(err.to_string().contains("cannot parse"));
    }

    #[test]
    fn test_expired_marker_reports_both_ages() {
        let temp = TempDir::new().unwrap();
        let marker = marker_in(&temp);
        let stale = Utc::now().timestamp() - 7200;
        fs::write(marker.path(), stale.to_string()).unwrap();

        let err = marker.check().unwrap_err();

        match err {
            MarkerError::Expired { age, max_age } => {
                assert!(age >= 7200);
                assert_eq!(max_age, 3600);
            }
            other => panic!("Expected Expired, got {other:?}"),
        }
        let message = marker.check().unwrap_err().to_string();
        assert!(message.contains("too old"));
        assert!(message.contains("3600"));
    }

    #[test]
    fn test_recent_marker_with_whitespace() {
        let temp = TempDir::new().unwrap();
        let marker = marker_in(&temp);
        let recent = Utc::now().timestamp() - 60;
        fs::write(marker.path(), format!("  {recent}\n")).unwrap();

        let age = marker.check().unwrap();

        assert!(age >= Duration::from_secs(60));
    }

    #[test]
    fn test_future_marker_is_valid() {
        let temp = TempDir::new().unwrap();
        let marker = marker_in(&temp);
        fs::write(marker.path(), (Utc::now().timestamp() + 600).to_string()).unwrap();

        assert_eq!(marker.check().unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_custom_max_age() {
        let temp = TempDir::new().unwrap();
        let marker = MarkerFile::new(temp.path().join("marker"), Duration::from_secs(10));
        fs::write(marker.path(), (Utc::now().timestamp() - 60).to_string()).unwrap();

        assert!(matches!(
            marker.check(),
            Err(MarkerError::Expired { max_age: 10, .. })
        ));
    }

    #[test]
    fn test_remove() {
        let temp = TempDir::new().unwrap();
        let marker = marker_in(&temp);
        marker.create().unwrap();

        marker.remove().unwrap();

        assert!(!marker.path().exists());
        assert!(matches!(marker.remove(), Err(MarkerError::NotFound(_))));
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let temp = TempDir::new().unwrap();
        let marker = MarkerFile::new(temp.path().join("no/such/dir/marker"), HOUR);

        assert!(marker.create().is_err());
    }
}
