//! Read-only views of a workspace's pending changes

use crate::error::{GitspaceError, GitspaceResult};
use crate::git::resolver::GitResolver;
use crate::workspace::WorkspacePath;
use serde::Serialize;
use tracing::debug;

const STATUS_ARGS: &[&str] = &["status", "--porcelain=v1", "-z", "--untracked-files=all"];
const DIFF_ARGS: &[&str] = &["diff", "--no-color", "--no-ext-diff"];

/// One path reported by `git status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    /// Index (staged) status letter, `' '` when unchanged
    pub index: char,

    /// Working tree status letter, `' '` when unchanged
    pub worktree: char,

    pub path: String,

    /// Source path of a rename or copy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orig_path: Option<String>,
}

impl StatusEntry {
    pub fn is_staged(&self) -> bool {
        !matches!(self.index, ' ' | '?' | '!')
    }

    pub fn is_untracked(&self) -> bool {
        self.index == '?'
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkingTreeStatus {
    pub root: WorkspacePath,
    pub clean: bool,
    pub entries: Vec<StatusEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceDiff {
    pub root: WorkspacePath,
    pub staged: bool,
    pub diff: String,
}

/// Pending changes in `workspace`, staged and unstaged
pub async fn working_tree_status(
    resolver: &GitResolver,
    workspace: &WorkspacePath,
) -> GitspaceResult<WorkingTreeStatus> {
    let output = resolver.query(workspace.as_path(), STATUS_ARGS).await?;
    let entries = parse_porcelain(&output.stdout)?;
    debug!(root = %workspace, entries = entries.len(), "Read working tree status");

    Ok(WorkingTreeStatus {
        root: workspace.clone(),
        clean: entries.is_empty(),
        entries,
    })
}

/// Unified diff of the working tree against the index, or of the index
/// against `HEAD` when `staged`
pub async fn diff(
    resolver: &GitResolver,
    workspace: &WorkspacePath,
    staged: bool,
) -> GitspaceResult<WorkspaceDiff> {
    let mut args = DIFF_ARGS.to_vec();
    if staged {
        args.push("--cached");
    }
    let output = resolver.query(workspace.as_path(), &args).await?;

    Ok(WorkspaceDiff {
        root: workspace.clone(),
        staged,
        diff: output.stdout,
    })
}

/// Parse `git status --porcelain=v1 -z`
///
/// Records are NUL-terminated `XY path`; renames and copies carry their
/// source path as the following record.
fn parse_porcelain(stdout: &str) -> GitspaceResult<Vec<StatusEntry>> {
    let mut records = stdout.split('\0').filter(|r| !r.is_empty());
    let mut entries = Vec::new();

    while let Some(record) = records.next() {
        let mut chars = record.chars();
        let (Some(index), Some(worktree), Some(' ')) = (chars.next(), chars.next(), chars.next())
        else {
            return Err(GitspaceError::Internal(format!(
                "unexpected git status record: {record:?}"
            )));
        };

        let orig_path = if matches!(index, 'R' | 'C') || matches!(worktree, 'R' | 'C') {
            records.next().map(str::to_string)
        } else {
            None
        };
        entries.push(StatusEntry {
            index,
            worktree,
            path: chars.as_str().to_string(),
            orig_path,
        });
    }

    Ok(entries)
}
