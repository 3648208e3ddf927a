//! Path validation for workspace candidates
//!
//! Every directory the detector hands out has passed through
//! [`PathValidator::validate`], which is the only way to build a
//! [`WorkspacePath`].

use crate::error::{GitspaceError, GitspaceResult};
use serde::{Serialize, Serializer};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// An absolute, symlink-resolved directory that was readable and
/// traversable when it was validated
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspacePath(PathBuf);

impl WorkspacePath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for WorkspacePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for WorkspacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl Serialize for WorkspacePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Sanitizes and authorizes candidate directories
#[derive(Debug, Clone, Default)]
pub struct PathValidator {
    boundary: Option<PathBuf>,
}

impl PathValidator {
    /// Validator without a root boundary
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator that rejects anything resolving outside `root`
    ///
    /// The boundary itself is canonicalized when it exists so symlinked
    /// roots (`/tmp` -> `/private/tmp` on macOS) compare correctly.
    pub fn with_boundary(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let boundary = root.canonicalize().unwrap_or(root);
        Self {
            boundary: Some(boundary),
        }
    }

    /// The configured boundary, if any
    pub fn boundary(&self) -> Option<&Path> {
        self.boundary.as_deref()
    }

    /// Validate a raw path string
    pub fn validate(&self, raw: &str) -> GitspaceResult<WorkspacePath> {
        if raw.trim().is_empty() {
            return Err(GitspaceError::PathInvalid {
                path: raw.to_string(),
                reason: "empty path".to_string(),
            });
        }
        if raw.contains('\0') {
            return Err(GitspaceError::PathInvalid {
                path: raw.escape_debug().to_string(),
                reason: "contains a NUL byte".to_string(),
            });
        }

        self.validate_path(Path::new(raw))
    }

    /// Validate an already-typed path
    pub fn validate_path(&self, path: &Path) -> GitspaceResult<WorkspacePath> {
        // Reject lexical escapes before touching the file system
        if let Some(ref boundary) = self.boundary {
            if has_parent_components(path) {
                let absolute = std::path::absolute(path)
                    .map_err(|e| GitspaceError::io(format!("resolving {}", path.display()), e))?;
                if !normalize_lexically(&absolute).starts_with(boundary) {
                    return Err(GitspaceError::PathTraversal {
                        path: path.display().to_string(),
                        boundary: Some(boundary.clone()),
                    });
                }
            }
        }

        let canonical = path.canonicalize().map_err(|e| match e.kind() {
            ErrorKind::NotFound => GitspaceError::NotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => GitspaceError::PermissionDenied(path.to_path_buf()),
            _ => GitspaceError::io(format!("resolving {}", path.display()), e),
        })?;

        check_containment(&canonical, self.boundary.as_deref())?;

        let metadata = std::fs::metadata(&canonical).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => GitspaceError::PermissionDenied(canonical.clone()),
            _ => GitspaceError::io(format!("reading metadata of {}", canonical.display()), e),
        })?;
        if !metadata.is_dir() {
            return Err(GitspaceError::NotADirectory(canonical));
        }

        if !can_read_and_traverse(&canonical) {
            return Err(GitspaceError::PermissionDenied(canonical));
        }

        debug!(path = %canonical.display(), "Validated workspace candidate");
        Ok(WorkspacePath(canonical))
    }
}

/// A resolved path must be free of `..` and, when bounded, inside the boundary
fn check_containment(resolved: &Path, boundary: Option<&Path>) -> GitspaceResult<()> {
    if has_parent_components(resolved) {
        return Err(GitspaceError::PathTraversal {
            path: resolved.display().to_string(),
            boundary: None,
        });
    }
    match boundary {
        Some(boundary) if !resolved.starts_with(boundary) => Err(GitspaceError::PathTraversal {
            path: resolved.display().to_string(),
            boundary: Some(boundary.to_path_buf()),
        }),
        _ => Ok(()),
    }
}

fn has_parent_components(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}

/// Resolve `.` and `..` without consulting the file system
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(unix)]
fn can_read_and_traverse(path: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: c_path is a valid NUL-terminated string that outlives the call
    unsafe { libc::access(c_path.as_ptr(), libc::R_OK | libc::X_OK) == 0 }
}

#[cfg(not(unix))]
fn can_read_and_traverse(path: &Path) -> bool {
    std::fs::read_dir(path).is_ok()
}
