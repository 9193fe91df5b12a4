//! Source/target path handling.
//!
//! Arguments are either local filesystem paths or remote endpoints in the
//! `host:/path` form understood by rsync. Only local paths can be compared
//! for containment; remote ones are opaque to us.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("remote source paths are not supported, use a local path: {0}")]
    RemoteSource(String),
    #[error("remote target paths are not supported, use a local path: {0}")]
    RemoteTarget(String),
    #[error("cannot resolve {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirPath {
    Local(PathBuf),
    /// Anything containing a colon, e.g. `user@host:/srv/data`.
    Remote(String),
}

impl DirPath {
    pub fn parse(raw: &str) -> Self {
        if raw.contains(':') {
            DirPath::Remote(raw.to_string())
        } else {
            DirPath::Local(PathBuf::from(raw))
        }
    }

    /// Renders the argument passed to the sync tool. The trailing slash makes
    /// rsync copy the directory's contents instead of the directory itself.
    pub fn with_trailing_slash(&self) -> String {
        let mut rendered = self.to_string();
        if !rendered.ends_with('/') {
            rendered.push('/');
        }
        rendered
    }
}

impl fmt::Display for DirPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirPath::Local(path) => write!(f, "{}", path.display()),
            DirPath::Remote(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRelationship {
    Same,
    /// The first path contains the second.
    Ancestor,
    /// The first path lives inside the second.
    Descendant,
    Unrelated,
}

impl PathRelationship {
    /// Compares two already-normalized paths component by component, so
    /// `/foo` is never considered a parent of `/foobar`.
    pub fn between(first: &Path, second: &Path) -> Self {
        if first == second {
            PathRelationship::Same
        } else if second.starts_with(first) {
            PathRelationship::Ancestor
        } else if first.starts_with(second) {
            PathRelationship::Descendant
        } else {
            PathRelationship::Unrelated
        }
    }

    pub fn overlaps(self) -> bool {
        !matches!(self, PathRelationship::Unrelated)
    }
}

/// Makes `path` absolute against the current directory and resolves `.` and
/// `..` lexically. Symlinks are left alone.
pub fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(prefix) => resolved.push(prefix.as_os_str()),
            Component::RootDir => resolved.push(component),
            Component::CurDir => {}
            Component::ParentDir => {
                // ".." at the root stays at the root.
                if resolved.parent().is_some() {
                    resolved.pop();
                }
            }
            Component::Normal(part) => resolved.push(part),
        }
    }
    Ok(resolved)
}

/// Reports whether `source` and `target` are the same directory or one is
/// nested inside the other.
///
/// Both paths are first compared lexically. If that finds no overlap and the
/// target exists, a symlink at the end of either path triggers a second
/// comparison on the fully resolved locations. A target that does not exist
/// yet can never overlap.
pub fn check_same_or_nested(source: &DirPath, target: &DirPath) -> Result<bool, PathError> {
    let source = match source {
        DirPath::Local(path) => path,
        DirPath::Remote(raw) => return Err(PathError::RemoteSource(raw.clone())),
    };
    let target = match target {
        DirPath::Local(path) => path,
        DirPath::Remote(raw) => return Err(PathError::RemoteTarget(raw.clone())),
    };

    let abs_source = absolute(source).map_err(|e| io_error(source, e))?;
    let abs_target = absolute(target).map_err(|e| io_error(target, e))?;

    if PathRelationship::between(&abs_source, &abs_target).overlaps() {
        return Ok(true);
    }

    let target_meta = match std::fs::symlink_metadata(&abs_target) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(io_error(&abs_target, e)),
    };
    let source_meta =
        std::fs::symlink_metadata(&abs_source).map_err(|e| io_error(&abs_source, e))?;

    if !source_meta.file_type().is_symlink() && !target_meta.file_type().is_symlink() {
        return Ok(false);
    }

    let real_source = abs_source
        .canonicalize()
        .map_err(|e| io_error(&abs_source, e))?;
    let real_target = abs_target
        .canonicalize()
        .map_err(|e| io_error(&abs_target, e))?;

    Ok(PathRelationship::between(&real_source, &real_target).overlaps())
}

fn io_error(path: &Path, source: std::io::Error) -> PathError {
    PathError::Io {
        path: path.to_path_buf(),
        source,
    }
}
