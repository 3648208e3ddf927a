//! Serve command - stdio JSON request loop

use crate::config::Config;
use crate::error::GitspaceResult;
use crate::server;

/// Execute the serve command
pub async fn execute(config: &Config) -> GitspaceResult<()> {
    server::serve_stdio(config).await
}
