//! Git root resolution
//!
//! Asks git for the repository that encloses a directory and classifies
//! it. Git walks upward from the starting directory and stops at the
//! first repository boundary, so the closest repository always wins:
//! a submodule resolves to its own root and a worktree to its own
//! working directory.

use crate::error::{GitspaceError, GitspaceResult};
use crate::git::runner::{GitOutput, GitRunner};
use crate::workspace::{PathValidator, WorkspacePath};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Oldest git that understands `--show-superproject-working-tree`
pub const MIN_GIT_VERSION: semver::Version = semver::Version::new(2, 13, 0);

/// Layout flags, printed in this order
const LAYOUT_ARGS: &[&str] = &[
    "rev-parse",
    "--is-bare-repository",
    "--is-inside-work-tree",
    "--absolute-git-dir",
    "--git-common-dir",
];

const TOPLEVEL_ARG: &str = "--show-toplevel";
const SUPERPROJECT_ARG: &str = "--show-superproject-working-tree";

/// Repository layout around a resolved root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryKind {
    Normal,
    Worktree,
    Submodule,
    Bare,
}

impl fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Worktree => write!(f, "worktree"),
            Self::Submodule => write!(f, "submodule"),
            Self::Bare => write!(f, "bare"),
        }
    }
}

/// What git reports about the repository enclosing a directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoInfo {
    /// Working tree root
    pub root: WorkspacePath,

    /// This working tree's git directory
    pub git_dir: PathBuf,

    /// Directory shared by all worktrees of the repository
    pub common_dir: PathBuf,

    /// Layout classification
    pub kind: RepositoryKind,

    /// Enclosing superproject when this is a submodule (diagnostic only)
    pub superproject: Option<PathBuf>,
}

/// Resolves repository roots by querying git
#[derive(Clone)]
pub struct GitResolver {
    runner: Arc<dyn GitRunner>,
    validator: PathValidator,
    detect_superproject: bool,
}

impl GitResolver {
    /// Create a resolver over `runner`
    pub fn new(runner: Arc<dyn GitRunner>, validator: PathValidator) -> Self {
        Self {
            runner,
            validator,
            detect_superproject: true,
        }
    }

    /// Enable or disable the superproject query
    pub fn with_superproject_detection(mut self, enabled: bool) -> Self {
        self.detect_superproject = enabled;
        self
    }

    /// The underlying runner
    pub fn runner(&self) -> &Arc<dyn GitRunner> {
        &self.runner
    }

    /// Resolve the repository enclosing `dir`
    ///
    /// A working tree costs a single git invocation. Only when git refuses
    /// `--show-toplevel` (bare repositories, the inside of a git directory)
    /// is a second query made to tell the two apart.
    pub async fn resolve_from(&self, dir: &WorkspacePath) -> GitspaceResult<RepoInfo> {
        let mut args = LAYOUT_ARGS.to_vec();
        args.push(TOPLEVEL_ARG);
        if self.detect_superproject {
            args.push(SUPERPROJECT_ARG);
        }

        let output = match self.query(dir.as_path(), &args).await {
            Ok(output) => output,
            Err(GitspaceError::GitCommand { ref stderr, .. })
                if stderr.contains("must be run in a work tree") =>
            {
                let layout = self.query(dir.as_path(), LAYOUT_ARGS).await?;
                return Err(self.classify_without_work_tree(dir, &layout));
            }
            Err(e) => return Err(e),
        };

        let lines = output.lines();
        if lines.len() < 2 || lines[0] == "true" || lines[1] != "true" {
            // Older git prints an empty top-level instead of failing
            return Err(self.classify_without_work_tree(dir, &output));
        }
        let [_, _, git_dir, common_dir, toplevel, rest @ ..] = lines.as_slice() else {
            return Err(GitspaceError::Internal(format!(
                "unexpected output from git {}: {:?}",
                args.join(" "),
                output.stdout
            )));
        };

        let git_dir = canonical_or_raw(PathBuf::from(*git_dir));
        // --git-common-dir may be relative to the directory git ran in
        let common_dir = canonical_or_raw(dir.as_path().join(common_dir));
        let superproject = rest.first().map(|p| PathBuf::from(*p));

        let root = self.validator.validate_path(Path::new(toplevel))?;

        let kind = if superproject.is_some() {
            RepositoryKind::Submodule
        } else if git_dir != common_dir {
            RepositoryKind::Worktree
        } else {
            RepositoryKind::Normal
        };

        debug!(
            dir = %dir,
            root = %root,
            kind = %kind,
            "Resolved repository root"
        );

        Ok(RepoInfo {
            root,
            git_dir,
            common_dir,
            kind,
            superproject,
        })
    }

    fn classify_without_work_tree(&self, dir: &WorkspacePath, layout: &GitOutput) -> GitspaceError {
        match layout.lines().first() {
            Some(&"true") => GitspaceError::BareRepository(dir.as_path().to_path_buf()),
            Some(_) => GitspaceError::OutsideWorkTree(dir.as_path().to_path_buf()),
            None => GitspaceError::Internal(format!(
                "unexpected output from git {}: {:?}",
                LAYOUT_ARGS.join(" "),
                layout.stdout
            )),
        }
    }

    /// Absolute git directory for the working tree containing `dir`
    ///
    /// Worktrees and submodules keep their git directory outside the
    /// working tree, so `<root>/.git` is not always a directory.
    pub async fn git_dir(&self, dir: &WorkspacePath) -> GitspaceResult<PathBuf> {
        let output = self
            .query(dir.as_path(), &["rev-parse", "--absolute-git-dir"])
            .await?;
        output
            .lines()
            .first()
            .map(|l| PathBuf::from(*l))
            .ok_or_else(|| {
                GitspaceError::Internal("git rev-parse --absolute-git-dir printed nothing".to_string())
            })
    }

    /// Installed git version
    pub async fn git_version(&self) -> GitspaceResult<semver::Version> {
        let output = self.runner.run(&std::env::temp_dir(), &["--version"]).await?;
        if !output.success() {
            return Err(GitspaceError::git_command(
                format!("{} --version", self.runner.executable()),
                output.code,
                output.stderr.trim(),
            ));
        }
        parse_git_version(&output.stdout).ok_or_else(|| {
            GitspaceError::Internal(format!("unrecognized git version: {}", output.stdout.trim()))
        })
    }

    /// Whether git can be run at all
    pub async fn is_available(&self) -> bool {
        self.git_version().await.is_ok()
    }

    pub(crate) async fn query(&self, dir: &Path, args: &[&str]) -> GitspaceResult<GitOutput> {
        let output = self.runner.run(dir, args).await?;
        if output.success() {
            return Ok(output);
        }

        let stderr = output.stderr.trim();
        if stderr.to_lowercase().contains("not a git repository") {
            return Err(GitspaceError::NotARepository(dir.to_path_buf()));
        }
        Err(GitspaceError::git_command(
            format!("{} {}", self.runner.executable(), args.join(" ")),
            output.code,
            stderr,
        ))
    }
}

fn canonical_or_raw(path: PathBuf) -> PathBuf {
    path.canonicalize().unwrap_or(path)
}

/// Parse `git --version` output
///
/// Accepts vendor suffixes such as `git version 2.39.3 (Apple Git-146)` and
/// `git version 2.41.0.windows.1`.
pub fn parse_git_version(output: &str) -> Option<semver::Version> {
    let token = output
        .trim()
        .strip_prefix("git version")?
        .split_whitespace()
        .next()?;

    let mut parts = token.split('.').map(|p| p.parse::<u64>());
    let major = parts.next()?.ok()?;
    let minor = parts.next().and_then(Result::ok).unwrap_or(0);
    let patch = parts.next().and_then(Result::ok).unwrap_or(0);
    Some(semver::Version::new(major, minor, patch))
}
