//! Cleanup-lock command - remove a stale index.lock

use crate::cli::args::CleanupLockArgs;
use crate::config::Config;
use crate::error::GitspaceResult;
use crate::git::{cleanup_index_lock, LockCleanup};
use crate::ui::{self, UiContext};
use crate::workspace::WorkspaceDetector;
use std::time::Duration;

/// Execute the cleanup-lock command
pub async fn execute(args: CleanupLockArgs, config: &Config) -> GitspaceResult<()> {
    let ctx = UiContext::detect();
    let detector = WorkspaceDetector::from_config(config);
    let workspace = detector.detect(args.override_path.as_deref()).await?;

    let result = cleanup_index_lock(
        detector.resolver(),
        &workspace,
        Duration::from_secs(config.git.stale_lock_secs),
        args.force,
    )
    .await?;

    match result {
        LockCleanup::Absent { ref path } => {
            ui::step_ok_detail(&ctx, "No index lock", &path.display().to_string())
        }
        LockCleanup::Removed { ref path, age_secs } => ui::step_ok_detail(
            &ctx,
            &format!("Removed index lock ({age_secs}s old)"),
            &path.display().to_string(),
        ),
        LockCleanup::Kept { ref path, age_secs } => ui::step_warn_hint(
            &ctx,
            &format!("Index lock at {} is only {age_secs}s old", path.display()),
            "Another git process may be running; use --force to remove it anyway",
        ),
    }
    Ok(())
}
