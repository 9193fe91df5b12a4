//! Existence, emptiness and creation checks for the mirrored directories.
//!
//! Remote paths cannot be inspected locally. They are assumed to exist, and
//! every operation that would need the local filesystem refuses them.

use crate::paths::DirPath;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PrecheckError {
    #[error("cannot {operation} remote directory {path}, use a local path")]
    RemoteUnsupported {
        operation: &'static str,
        path: String,
    },
    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn local_or<'a>(path: &'a DirPath, operation: &'static str) -> Result<&'a Path, PrecheckError> {
    match path {
        DirPath::Local(local) => Ok(local),
        DirPath::Remote(raw) => Err(PrecheckError::RemoteUnsupported {
            operation,
            path: raw.clone(),
        }),
    }
}

fn classify(path: &Path, source: std::io::Error) -> PrecheckError {
    if source.kind() == ErrorKind::PermissionDenied {
        PrecheckError::PermissionDenied(path.to_path_buf())
    } else {
        PrecheckError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Remote paths always count as existing. A local path must be a directory
/// (following symlinks).
pub fn dir_exists(path: &DirPath) -> bool {
    match path {
        DirPath::Remote(_) => true,
        DirPath::Local(local) => std::fs::metadata(local).is_ok_and(|meta| meta.is_dir()),
    }
}

/// Creates a local directory and any missing parents. Succeeds if the
/// directory is already there.
pub fn create_dir(path: &DirPath) -> Result<(), PrecheckError> {
    let local = local_or(path, "create")?;

    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }

    builder.create(local).map_err(|e| classify(local, e))
}

pub fn is_dir_empty(path: &DirPath) -> Result<bool, PrecheckError> {
    let local = local_or(path, "inspect")?;

    let mut entries = std::fs::read_dir(local).map_err(|e| classify(local, e))?;
    match entries.next() {
        None => Ok(true),
        Some(Ok(_)) => Ok(false),
        Some(Err(e)) => Err(classify(local, e)),
    }
}
