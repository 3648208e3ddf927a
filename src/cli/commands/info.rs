//! Info command - cached versus live workspace

use crate::cli::args::{DetectArgs, OutputFormat};
use crate::config::Config;
use crate::error::GitspaceResult;
use crate::ui::{self, UiContext};
use crate::workspace::{DetectionInfo, WorkspaceDetector};
use tracing::debug;

/// Execute the info command
pub async fn execute(args: DetectArgs, config: &Config) -> GitspaceResult<()> {
    let detector = WorkspaceDetector::from_config(config);
    let request = detector.request(args.override_path.as_deref())?;

    // Populate the cache the way a host would before inspecting it
    if let Err(e) = detector.detect_from(request.clone()).await {
        debug!(error = %e, "Initial detection failed");
    }
    let info = detector.info_for(&request).await;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&info)?),
        OutputFormat::Text => print_text(&info),
    }
    Ok(())
}

fn print_text(info: &DetectionInfo) {
    let ctx = UiContext::detect();
    ui::header(&ctx, "Workspace");
    ui::key_value(&ctx, "key", &info.key);

    ui::section(&ctx, "Cached");
    match info.cached {
        Some(ref cached) => {
            ui::key_value(&ctx, "path", &cached.path.to_string());
            ui::key_value(&ctx, "method", &cached.method.to_string());
            ui::key_value(&ctx, "age", &format!("{}s", cached.age_secs));
            ui::key_value(&ctx, "resolved", &cached.resolved_at.to_rfc3339());
        }
        None => ui::key_value(&ctx, "path", "(none)"),
    }

    ui::section(&ctx, "Live");
    match (&info.live, &info.live_error) {
        (Some(live), _) => {
            ui::key_value(&ctx, "path", &live.path.to_string());
            ui::key_value(&ctx, "method", &live.method.to_string());
            if let Some(kind) = live.kind {
                ui::key_value(&ctx, "kind", &kind.to_string());
            }
            ui::key_value_status(&ctx, "degraded", &live.degraded.to_string(), !live.degraded);
        }
        (None, Some(error)) => ui::step_error_detail(&ctx, "Resolution failed", error),
        (None, None) => {}
    }

    ui::summary(
        &ctx,
        !info.drift,
        if info.drift {
            "Cached workspace is stale; run invalidate"
        } else {
            "Cache agrees with a fresh resolution"
        },
    );
}
