//! Detect command - print the workspace for the current directory

use crate::cli::args::{DetectArgs, OutputFormat};
use crate::config::Config;
use crate::error::GitspaceResult;
use crate::workspace::WorkspaceDetector;

/// Execute the detect command
///
/// Text output is the bare path so the command composes in shell
/// substitutions; degraded results are reported on stderr by the logger.
pub async fn execute(args: DetectArgs, config: &Config) -> GitspaceResult<()> {
    let detector = WorkspaceDetector::from_config(config);
    let request = detector.request(args.override_path.as_deref())?;
    let resolution = detector.detect_from(request).await?;

    match args.format {
        OutputFormat::Text => println!("{}", resolution.path),
        OutputFormat::Json => println!("{}", serde_json::to_string(&resolution)?),
    }
    Ok(())
}
