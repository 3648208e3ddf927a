//! Integration tests for gitspace

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Binary with an isolated config and no workspace hints
    fn gitspace(config_dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("gitspace");
        cmd.env("GITSPACE_CONFIG", config_dir.join("config.toml"))
            .env_remove("WORKSPACE_FOLDER_PATHS")
            .env_remove("PROJECT_ROOT")
            .env_remove("RUST_LOG");
        cmd
    }

    fn git_available() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = std::process::Command::new("git")
            .args([
                "-c",
                "init.defaultBranch=main",
                "-c",
                "commit.gpgsign=false",
                "-c",
                "user.name=Test User",
                "-c",
                "user.email=test@example.com",
            ])
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap()
            .status;
        assert!(status.success(), "git {args:?} failed");
    }

    fn init_repo(dir: &Path) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        git(dir, &["init", "-q"]);
        std::fs::write(dir.join("README.md"), "# Test\n").unwrap();
        git(dir, &["add", "README.md"]);
        git(dir, &["commit", "-q", "-m", "Initial commit"]);
        dir.canonicalize().unwrap()
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        gitspace(temp.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("workspace"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        gitspace(temp.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("gitspace"));
    }

    #[test]
    fn config_path_honors_env() {
        let temp = TempDir::new().unwrap();
        gitspace(temp.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                temp.path().join("config.toml").to_str().unwrap(),
            ));
    }

    #[test]
    fn config_show_defaults() {
        let temp = TempDir::new().unwrap();
        gitspace(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[workspace]"))
            .stdout(predicate::str::contains("cache_ttl_secs = 60"));
    }

    #[test]
    fn config_init_and_set() {
        let temp = TempDir::new().unwrap();
        gitspace(temp.path())
            .args(["config", "init"])
            .assert()
            .success();
        assert!(temp.path().join("config.toml").exists());

        gitspace(temp.path())
            .args(["config", "set", "git.timeout_secs", "45"])
            .assert()
            .success();
        gitspace(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("timeout_secs = 45"));
    }

    #[test]
    fn config_set_rejects_unknown_key() {
        let temp = TempDir::new().unwrap();
        gitspace(temp.path())
            .args(["config", "set", "git.colour", "red"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown key"));
    }

    #[test]
    fn invalid_config_fails_with_path() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "[git]\ntimeout_secs = 0\n").unwrap();
        gitspace(temp.path())
            .arg("detect")
            .assert()
            .failure()
            .stderr(predicate::str::contains("timeout_secs"));
    }

    #[test]
    fn detect_with_override_prints_canonical_path() {
        let temp = TempDir::new().unwrap();
        let work = temp.path().join("work");
        std::fs::create_dir_all(&work).unwrap();

        gitspace(temp.path())
            .args(["detect", "--override", work.to_str().unwrap()])
            .assert()
            .success()
            .stdout(format!("{}\n", work.canonicalize().unwrap().display()));
    }

    #[test]
    fn detect_with_missing_override_fails() {
        let temp = TempDir::new().unwrap();
        gitspace(temp.path())
            .args(["detect", "--override", "/nonexistent/gitspace/override"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"))
            .stderr(predicate::str::contains("Path not found"));
    }

    #[test]
    fn detect_from_nested_directory_finds_root() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let repo = init_repo(&temp.path().join("repo"));
        let nested = repo.join("src/deep/nested");
        std::fs::create_dir_all(&nested).unwrap();

        gitspace(temp.path())
            .current_dir(&nested)
            .args(["detect", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(format!(
                "\"path\":\"{}\"",
                repo.display()
            )))
            .stdout(predicate::str::contains("\"method\":\"git-command\""))
            .stdout(predicate::str::contains("\"kind\":\"normal\""));
    }

    #[test]
    fn repo_rejects_bare_repository() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let bare = temp.path().join("bare.git");
        std::fs::create_dir_all(&bare).unwrap();
        git(&bare, &["init", "-q", "--bare"]);

        gitspace(temp.path())
            .args(["repo", bare.to_str().unwrap()])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Bare repository"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn cleanup_lock_removes_forced_lock() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let repo = init_repo(&temp.path().join("repo"));
        let lock = repo.join(".git/index.lock");
        std::fs::write(&lock, "").unwrap();

        gitspace(temp.path())
            .current_dir(&repo)
            .arg("cleanup-lock")
            .assert()
            .success()
            .stdout(predicate::str::contains("only"));
        assert!(lock.exists());

        gitspace(temp.path())
            .current_dir(&repo)
            .args(["cleanup-lock", "--force"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed index lock"));
        assert!(!lock.exists());
    }

    #[test]
    fn serve_answers_requests() {
        let temp = TempDir::new().unwrap();
        let work = temp.path().canonicalize().unwrap();
        let input = format!(
            "{{\"id\":1,\"method\":\"detect\",\"params\":{{\"override\":\"{}\"}}}}\n\
             {{\"id\":2,\"method\":\"bogus\"}}\n",
            work.display()
        );

        gitspace(temp.path())
            .arg("serve")
            .write_stdin(input)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"id\":1"))
            .stdout(predicate::str::contains("\"method\":\"override\""))
            .stdout(predicate::str::contains("\"unknown_method\""));
    }

    #[cfg(unix)]
    #[test]
    fn serve_exits_on_interrupt_with_stdin_open() {
        use std::io::{BufRead, BufReader, Write};
        use std::process::Stdio;
        use std::time::{Duration, Instant};

        let temp = TempDir::new().unwrap();
        let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin!("gitspace"))
            .arg("serve")
            .env("GITSPACE_CONFIG", temp.path().join("config.toml"))
            .env_remove("RUST_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();

        // One answered request proves the loop is running
        let mut stdin = child.stdin.take().unwrap();
        writeln!(stdin, "{{\"id\":1,\"method\":\"stats\"}}").unwrap();
        let mut stdout = BufReader::new(child.stdout.take().unwrap());
        let mut line = String::new();
        stdout.read_line(&mut line).unwrap();
        assert!(line.contains("\"id\":1"));

        let pid = i32::try_from(child.id()).unwrap();
        // SAFETY: pid belongs to a child this test spawned and has not reaped
        assert_eq!(unsafe { libc::kill(pid, libc::SIGINT) }, 0);

        let deadline = Instant::now() + Duration::from_secs(5);
        let status = loop {
            if let Some(status) = child.try_wait().unwrap() {
                break Some(status);
            }
            if Instant::now() > deadline {
                break None;
            }
            std::thread::sleep(Duration::from_millis(50));
        };
        drop(stdin);
        if status.is_none() {
            child.kill().unwrap();
        }
        assert!(status.is_some_and(|s| s.success()), "serve ignored SIGINT");
    }

    #[test]
    fn changes_and_diff_report_pending_edits() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let repo = init_repo(&temp.path().join("repo"));
        std::fs::write(repo.join("README.md"), "# Edited\n").unwrap();
        std::fs::write(repo.join("new.txt"), "new\n").unwrap();
        git(&repo, &["add", "new.txt"]);

        gitspace(temp.path())
            .current_dir(&repo)
            .arg("changes")
            .assert()
            .success()
            .stdout(predicate::str::contains(" M README.md"))
            .stdout(predicate::str::contains("A  new.txt"));

        gitspace(temp.path())
            .current_dir(&repo)
            .arg("diff")
            .assert()
            .success()
            .stdout(predicate::str::contains("+# Edited"))
            .stdout(predicate::str::contains("new.txt").not());

        gitspace(temp.path())
            .args(["diff", "--staged", "--override", repo.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("+new"));
    }

    #[test]
    fn completions_for_bash() {
        let temp = TempDir::new().unwrap();
        gitspace(temp.path())
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("gitspace"));
    }

    #[test]
    fn status_runs() {
        // Status reports problems but should not panic
        let temp = TempDir::new().unwrap();
        gitspace(temp.path())
            .current_dir(temp.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("Platform"));
    }
}
