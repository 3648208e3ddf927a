//! Stale index lock cleanup
//!
//! A git process killed mid-write leaves `index.lock` behind and every
//! later write fails with "Unable to create ... index.lock". The lock
//! lives in the working tree's own git directory, which for worktrees and
//! submodules is not `<root>/.git`.

use crate::error::{GitspaceError, GitspaceResult};
use crate::git::resolver::GitResolver;
use crate::workspace::WorkspacePath;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// What happened to the index lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LockCleanup {
    /// No lock present
    Absent { path: PathBuf },

    /// Lock removed
    Removed { path: PathBuf, age_secs: u64 },

    /// Lock younger than the stale threshold, left in place
    Kept { path: PathBuf, age_secs: u64 },
}

impl LockCleanup {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Absent { path } | Self::Removed { path, .. } | Self::Kept { path, .. } => path,
        }
    }
}

/// Remove the workspace's `index.lock` if it is older than `stale_after`
/// (or unconditionally with `force`)
pub async fn cleanup_index_lock(
    resolver: &GitResolver,
    workspace: &WorkspacePath,
    stale_after: Duration,
    force: bool,
) -> GitspaceResult<LockCleanup> {
    let git_dir = resolver.git_dir(workspace).await?;
    let path = git_dir.join("index.lock");

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "No index lock");
            return Ok(LockCleanup::Absent { path });
        }
        Err(e) => {
            return Err(GitspaceError::io(
                format!("reading metadata of {}", path.display()),
                e,
            ))
        }
    };

    // An mtime in the future counts as brand new
    let age = metadata
        .modified()
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .unwrap_or(Duration::ZERO);
    let age_secs = age.as_secs();

    if !force && age < stale_after {
        info!(
            path = %path.display(),
            age_secs,
            "Index lock is recent; another git process may be running"
        );
        return Ok(LockCleanup::Kept { path, age_secs });
    }

    match tokio::fs::remove_file(&path).await {
        Ok(()) => {
            info!(path = %path.display(), age_secs, force, "Removed index lock");
            Ok(LockCleanup::Removed { path, age_secs })
        }
        // Released by its owner in the meantime
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(LockCleanup::Absent { path }),
        Err(e) => Err(GitspaceError::io(
            format!("removing {}", path.display()),
            e,
        )),
    }
}
