//! Changes command - pending changes in the detected workspace

use crate::cli::args::{DetectArgs, OutputFormat};
use crate::config::Config;
use crate::error::GitspaceResult;
use crate::git::working_tree_status;
use crate::ui::{self, UiContext};
use crate::workspace::WorkspaceDetector;

/// Execute the changes command
pub async fn execute(args: DetectArgs, config: &Config) -> GitspaceResult<()> {
    let detector = WorkspaceDetector::from_config(config);
    let workspace = detector.detect(args.override_path.as_deref()).await?;
    let status = working_tree_status(detector.resolver(), &workspace).await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&status)?),
        OutputFormat::Text if status.clean => {
            ui::step_ok_detail(&UiContext::detect(), "Working tree clean", &status.root.to_string())
        }
        OutputFormat::Text => {
            for entry in &status.entries {
                match entry.orig_path {
                    Some(ref orig) => {
                        println!("{}{} {} -> {}", entry.index, entry.worktree, orig, entry.path)
                    }
                    None => println!("{}{} {}", entry.index, entry.worktree, entry.path),
                }
            }
        }
    }
    Ok(())
}
