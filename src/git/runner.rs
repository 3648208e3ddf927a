//! Git process execution
//!
//! Provides a trait for running read-only git queries so the resolver can
//! be exercised against scripted output instead of a real git binary.

use crate::error::{GitspaceError, GitspaceResult};
use crate::platform;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Base delay between retries, multiplied by the attempt number
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Captured result of one git invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    /// Exit code (None when terminated by a signal)
    pub code: Option<i32>,

    /// Captured stdout
    pub stdout: String,

    /// Captured stderr
    pub stderr: String,
}

impl GitOutput {
    /// Whether git exited with status 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Non-empty stdout lines with surrounding whitespace removed
    pub fn lines(&self) -> Vec<&str> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect()
    }
}

/// Abstract git execution interface
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Run git with `args` from `dir`
    ///
    /// A non-zero exit is not an error at this level; callers inspect the
    /// returned output. Errors are reserved for git being missing, failing
    /// to spawn, or exceeding the timeout.
    async fn run(&self, dir: &Path, args: &[&str]) -> GitspaceResult<GitOutput>;

    /// Executable name for display
    fn executable(&self) -> &str;
}

/// Runs the real git executable with a timeout and bounded retries
#[derive(Debug, Clone)]
pub struct CommandRunner {
    executable: String,
    timeout: Duration,
    retries: u32,
}

impl CommandRunner {
    /// Create a runner for `executable`
    pub fn new(executable: impl Into<String>, timeout: Duration, retries: u32) -> Self {
        Self {
            executable: executable.into(),
            timeout,
            retries,
        }
    }

    fn display(&self, args: &[&str]) -> String {
        format!("{} {}", self.executable, args.join(" "))
    }

    async fn run_once(&self, dir: &Path, args: &[&str]) -> GitspaceResult<GitOutput> {
        let command = self.display(args);
        debug!(dir = %dir.display(), command = %command, "Running git");

        let child = Command::new(&self.executable)
            .args(args)
            .current_dir(dir)
            .env("GIT_OPTIONAL_LOCKS", "0")
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => GitspaceError::GitNotFound {
                    executable: self.executable.clone(),
                },
                _ => GitspaceError::command_failed(command.clone(), e),
            })?;

        // Dropping the wait future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| GitspaceError::command_failed(command.clone(), e))?,
            Err(_) => {
                return Err(GitspaceError::GitCommandTimeout {
                    command,
                    timeout_secs: self.timeout.as_secs(),
                })
            }
        };

        Ok(GitOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new("git", Duration::from_secs(30), 1)
    }
}

#[async_trait]
impl GitRunner for CommandRunner {
    async fn run(&self, dir: &Path, args: &[&str]) -> GitspaceResult<GitOutput> {
        platform::check_command_args(args);

        let mut attempt = 0;
        loop {
            let result = match self.run_once(dir, args).await {
                Ok(output) if !output.success() => {
                    // Surface lock contention as an error so it can be retried
                    let err = GitspaceError::git_command(
                        self.display(args),
                        output.code,
                        output.stderr.trim(),
                    );
                    if err.is_retryable() {
                        Err(err)
                    } else {
                        Ok(output)
                    }
                }
                other => other,
            };

            match result {
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, "Retrying git command");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                other => return other,
            }
        }
    }

    fn executable(&self) -> &str {
        &self.executable
    }
}

/// Wraps a runner and counts invocations
///
/// Used to report how many git processes a long-running host has spawned.
pub struct CountingRunner<R> {
    inner: R,
    calls: AtomicUsize,
}

impl<R: GitRunner> CountingRunner<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    /// Invocations so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: GitRunner> GitRunner for CountingRunner<R> {
    async fn run(&self, dir: &Path, args: &[&str]) -> GitspaceResult<GitOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.run(dir, args).await
    }

    fn executable(&self) -> &str {
        self.inner.executable()
    }
}
