//! Diff command - print the workspace diff

use crate::cli::args::DiffArgs;
use crate::config::Config;
use crate::error::GitspaceResult;
use crate::git;
use crate::workspace::WorkspaceDetector;

/// Execute the diff command
pub async fn execute(args: DiffArgs, config: &Config) -> GitspaceResult<()> {
    let detector = WorkspaceDetector::from_config(config);
    let workspace = detector.detect(args.override_path.as_deref()).await?;
    let diff = git::diff(detector.resolver(), &workspace, args.staged).await?;

    print!("{}", diff.diff);
    Ok(())
}
