//! Error types for gitspace
//!
//! All modules use `GitspaceResult<T>` as their return type.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for gitspace operations
pub type GitspaceResult<T> = Result<T, GitspaceError>;

/// All errors that can occur in gitspace
#[derive(Error, Debug)]
pub enum GitspaceError {
    // Path validation errors
    #[error("Invalid path: {path}: {reason}")]
    PathInvalid { path: String, reason: String },

    #[error("Path traversal rejected: {path} {}", fmt_escape(.boundary))]
    PathTraversal {
        path: String,
        boundary: Option<PathBuf>,
    },

    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Permission denied: {0} (read and traverse access required)")]
    PermissionDenied(PathBuf),

    // Git errors
    #[error("git executable not found: {executable}")]
    GitNotFound { executable: String },

    #[error("git command failed: {command} (exit code {}): {stderr}", fmt_code(.code))]
    GitCommand {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("git command timed out after {timeout_secs}s: {command}")]
    GitCommandTimeout { command: String, timeout_secs: u64 },

    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("Bare repository unsupported: {0} has no working tree")]
    BareRepository(PathBuf),

    #[error("Outside of any working tree: {0}")]
    OutsideWorkTree(PathBuf),

    // Detection errors
    #[error("Cannot determine workspace from {}: {}", .start.display(), fmt_attempts(.attempts))]
    Workspace {
        start: PathBuf,
        attempts: Vec<StrategyAttempt>,
        #[source]
        source: Box<GitspaceError>,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("TOML edit error: {0}")]
    TomlEdit(#[from] toml_edit::TomlError),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// One strategy's outcome, recorded while a detection runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyAttempt {
    /// Strategy name (override, environment, git-command, fallback-cwd)
    pub method: String,

    /// Why the strategy did not produce a workspace
    pub outcome: String,
}

impl fmt::Display for StrategyAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.method, self.outcome)
    }
}

fn fmt_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

fn fmt_escape(boundary: &Option<PathBuf>) -> String {
    match boundary {
        Some(boundary) => format!("escapes {}", boundary.display()),
        None => "still contains '..' after resolution".to_string(),
    }
}

fn fmt_attempts(attempts: &[StrategyAttempt]) -> String {
    if attempts.is_empty() {
        return "no strategy applied".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Stderr fragments git prints when another process holds a repository lock
const LOCK_CONTENTION_MARKERS: &[&str] = &["index.lock", "Unable to create", "cannot lock ref"];

impl GitspaceError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a git command error from captured output
    pub fn git_command(command: impl Into<String>, code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::GitCommand {
            command: command.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Whether this is one of the path validation failures
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::PathInvalid { .. }
                | Self::PathTraversal { .. }
                | Self::NotFound(_)
                | Self::NotADirectory(_)
                | Self::PermissionDenied(_)
        )
    }

    /// Check if error is retryable
    ///
    /// Timeouts are always retryable. Command errors only when git reports
    /// lock contention from a concurrent process.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::GitCommandTimeout { .. } => true,
            Self::GitCommand { stderr, .. } => LOCK_CONTENTION_MARKERS
                .iter()
                .any(|marker| stderr.contains(marker)),
            _ => false,
        }
    }

    /// The innermost error behind an aggregate detection failure
    pub fn specific(&self) -> &GitspaceError {
        match self {
            Self::Workspace { source, .. } => source.specific(),
            other => other,
        }
    }

    /// Stable snake_case tag, used on the stdio protocol
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PathInvalid { .. } => "path_invalid",
            Self::PathTraversal { .. } => "path_traversal",
            Self::NotFound(_) => "not_found",
            Self::NotADirectory(_) => "not_a_directory",
            Self::PermissionDenied(_) => "permission_denied",
            Self::GitNotFound { .. } => "git_not_found",
            Self::GitCommand { .. } => "git_command",
            Self::GitCommandTimeout { .. } => "git_command_timeout",
            Self::NotARepository(_) => "not_a_repository",
            Self::BareRepository(_) => "bare_repository",
            Self::OutsideWorkTree(_) => "outside_work_tree",
            Self::Workspace { .. } => "workspace",
            Self::ConfigInvalid { .. } | Self::ConfigDirCreate { .. } => "config",
            Self::Io { .. } | Self::CommandFailed { .. } => "io",
            Self::Json(_) => "json",
            Self::TomlParse(_) | Self::TomlSerialize(_) | Self::TomlEdit(_) => "toml",
            Self::Internal(_) => "internal",
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Workspace { source, .. } => source.hint(),
            Self::GitNotFound { .. } => {
                Some("Install git and make sure it is on PATH, or set git.executable")
            }
            Self::PathTraversal { .. } => Some("Check workspace.allowed_root in the config"),
            Self::NotARepository(_) => Some("Run: git init, or pass --override <dir>"),
            Self::BareRepository(_) => Some("Check out a working tree: git worktree add <dir>"),
            Self::OutsideWorkTree(_) => Some("Run from inside the working tree, not the .git directory"),
            Self::GitCommandTimeout { .. } => Some("Raise git.timeout_secs if the repository is slow"),
            Self::PermissionDenied(_) => Some("Grant read and execute permission on the directory"),
            _ => None,
        }
    }
}
