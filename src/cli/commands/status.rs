//! Status command - check git and the detected workspace

use crate::config::Config;
use crate::error::GitspaceResult;
use crate::git::MIN_GIT_VERSION;
use crate::platform::PlatformInfo;
use crate::ui::{self, UiContext};
use crate::workspace::WorkspaceDetector;

/// Execute the status command
pub async fn execute(config: &Config) -> GitspaceResult<()> {
    let ctx = UiContext::detect();
    ui::header(&ctx, "gitspace status");

    let detector = WorkspaceDetector::from_config(config);
    let mut all_ok = true;

    ui::section(&ctx, "Git:");
    match detector.resolver().git_version().await {
        Ok(version) if version >= MIN_GIT_VERSION => {
            ui::step_ok_detail(&ctx, &format!("git {version}"), &config.git.executable);
        }
        Ok(version) => {
            ui::step_warn_hint(
                &ctx,
                &format!("git {version} is older than {MIN_GIT_VERSION}"),
                "Submodule detection needs --show-superproject-working-tree",
            );
        }
        Err(e) => {
            ui::step_error_detail(&ctx, "git unavailable", &e.to_string());
            if let Some(hint) = e.hint() {
                ui::step_warn(&ctx, hint);
            }
            all_ok = false;
        }
    }

    ui::section(&ctx, "Platform:");
    let platform = PlatformInfo::detect();
    ui::key_value(&ctx, "os", &format!("{} ({})", platform.os, platform.family));
    ui::key_value(&ctx, "arch", platform.arch);
    if let Some(ref release) = platform.release {
        ui::key_value(&ctx, "release", release);
    }

    ui::section(&ctx, "Workspace:");
    let request = detector.request(None)?;
    match detector.detect_from(request).await {
        Ok(resolution) => {
            ui::step_ok_detail(&ctx, &resolution.path.to_string(), &resolution.method.to_string());
            if let Some(kind) = resolution.kind {
                ui::key_value(&ctx, "kind", &kind.to_string());
            }
            if let Some(ref superproject) = resolution.superproject {
                ui::key_value(&ctx, "superproject", &superproject.display().to_string());
            }
            if resolution.degraded {
                ui::step_warn_hint(
                    &ctx,
                    "Not inside a git repository",
                    "git operations will fail here",
                );
            }
        }
        Err(e) => {
            ui::step_error_detail(&ctx, "Detection failed", &e.specific().to_string());
            if let Some(hint) = e.hint() {
                ui::step_warn(&ctx, hint);
            }
            all_ok = false;
        }
    }

    if all_ok {
        ui::summary(&ctx, true, "All checks passed");
    } else {
        ui::summary(&ctx, false, "Some checks failed - see above for details");
    }
    Ok(())
}
