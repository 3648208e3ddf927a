//! Git repository fixtures for tests

use std::path::{Path, PathBuf};
use std::process::Command;

/// Whether a git executable is on PATH
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run git in `dir` with a hermetic identity, panicking on failure
pub fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args([
            "-c",
            "init.defaultBranch=main",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "protocol.file.allow=always",
            "-c",
            "user.name=Test User",
            "-c",
            "user.email=test@example.com",
        ])
        .args(args)
        .current_dir(dir)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .output()
        .expect("spawn git");

    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Create a repository with one commit at `dir`, returning its canonical path
pub fn init_repo(dir: &Path) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    git(dir, &["init", "-q"]);
    std::fs::write(dir.join("README.md"), "# Test Repo\n").unwrap();
    git(dir, &["add", "README.md"]);
    git(dir, &["commit", "-q", "-m", "Initial commit"]);
    dir.canonicalize().unwrap()
}

/// Attach a detached worktree of `repo` at `target`
pub fn add_worktree(repo: &Path, target: &Path) -> PathBuf {
    git(
        repo,
        &["worktree", "add", "-q", "--detach", target.to_str().unwrap(), "HEAD"],
    );
    target.canonicalize().unwrap()
}

/// Add `source` (a repository with commits) to `repo` as submodule `name`
pub fn add_submodule(repo: &Path, source: &Path, name: &str) -> PathBuf {
    git(
        repo,
        &["submodule", "add", "-q", source.to_str().unwrap(), name],
    );
    git(repo, &["commit", "-q", "-m", "Add submodule"]);
    repo.join(name).canonicalize().unwrap()
}

/// Create a bare repository at `dir`
pub fn init_bare(dir: &Path) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    git(dir, &["init", "-q", "--bare"]);
    dir.canonicalize().unwrap()
}
