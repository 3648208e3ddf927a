//! Repo command - what git reports about a directory

use crate::cli::args::{OutputFormat, RepoArgs};
use crate::config::Config;
use crate::error::{GitspaceError, GitspaceResult};
use crate::ui::{self, UiContext};
use crate::workspace::WorkspaceDetector;

/// Execute the repo command
pub async fn execute(args: RepoArgs, config: &Config) -> GitspaceResult<()> {
    let detector = WorkspaceDetector::from_config(config);
    let dir = match args.dir {
        Some(dir) => dir,
        None => std::env::current_dir()
            .map_err(|e| GitspaceError::io("reading the current directory", e))?
            .to_string_lossy()
            .into_owned(),
    };

    let start = detector.validator().validate(&dir)?;
    let info = detector.resolver().resolve_from(&start).await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&info)?),
        OutputFormat::Text => {
            let ctx = UiContext::detect();
            ui::key_value(&ctx, "root", &info.root.to_string());
            ui::key_value(&ctx, "kind", &info.kind.to_string());
            ui::key_value(&ctx, "git dir", &info.git_dir.display().to_string());
            ui::key_value(&ctx, "common dir", &info.common_dir.display().to_string());
            if let Some(ref superproject) = info.superproject {
                ui::key_value(&ctx, "superproject", &superproject.display().to_string());
            }
        }
    }
    Ok(())
}
