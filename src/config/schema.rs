//! Configuration schema for gitspace
//!
//! Configuration is stored at `~/.config/gitspace/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Workspace detection settings
    pub workspace: WorkspaceConfig,

    /// Git executable settings
    pub git: GitConfig,
}

/// Workspace detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Operator-supplied workspace, tried before anything else
    pub override_path: Option<String>,

    /// Environment variables consulted for a host-provided workspace hint,
    /// in order. `WORKSPACE_FOLDER_PATHS` may hold several `;`-separated
    /// folders; only the first is used.
    pub hint_vars: Vec<String>,

    /// Seconds a resolved workspace is served from cache (0 = no caching)
    pub cache_ttl_secs: u64,

    /// Candidate paths must resolve inside this directory
    pub allowed_root: Option<PathBuf>,

    /// Fall back to the current directory outside of any repository
    pub fallback_to_cwd: bool,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            override_path: None,
            hint_vars: vec![
                "WORKSPACE_FOLDER_PATHS".to_string(),
                "PROJECT_ROOT".to_string(),
            ],
            cache_ttl_secs: 60,
            allowed_root: None,
            fallback_to_cwd: true,
        }
    }
}

impl WorkspaceConfig {
    /// Cache TTL as a duration
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Git executable settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Executable name or path
    pub executable: String,

    /// Per-invocation timeout in seconds
    pub timeout_secs: u64,

    /// Extra attempts for timeouts and lock contention
    pub retries: u32,

    /// Ask git for the superproject of submodules
    pub detect_superproject: bool,

    /// Age in seconds after which an `index.lock` counts as stale
    pub stale_lock_secs: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            executable: "git".to_string(),
            timeout_secs: 30,
            retries: 1,
            detect_superproject: true,
            stale_lock_secs: 60,
        }
    }
}

impl GitConfig {
    /// Timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Check values serde cannot express constraints for
    ///
    /// Returns the reason for the first invalid value.
    pub fn check(&self) -> Result<(), String> {
        if self.git.executable.trim().is_empty() {
            return Err("git.executable must not be empty".to_string());
        }
        if self.git.timeout_secs == 0 {
            return Err("git.timeout_secs must be greater than 0".to_string());
        }
        if self.workspace.hint_vars.iter().any(|v| v.trim().is_empty()) {
            return Err("workspace.hint_vars must not contain empty names".to_string());
        }
        if let Some(ref path) = self.workspace.override_path {
            if path.trim().is_empty() {
                return Err("workspace.override_path must not be empty when set".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[workspace]"));
        assert!(toml.contains("[git]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.workspace.cache_ttl_secs, 60);
        assert_eq!(config.git.executable, "git");
        assert_eq!(config.git.retries, 1);
        assert!(config.workspace.fallback_to_cwd);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [git]
            timeout_secs = 5
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.git.timeout(), Duration::from_secs(5));
        assert_eq!(config.workspace.hint_vars[0], "WORKSPACE_FOLDER_PATHS"); // default preserved
    }

    #[test]
    fn check_rejects_zero_timeout() {
        let mut config = Config::default();
        assert!(config.check().is_ok());

        config.git.timeout_secs = 0;
        assert!(config.check().unwrap_err().contains("timeout_secs"));
    }

    #[test]
    fn check_rejects_blank_hint_var() {
        let mut config = Config::default();
        config.workspace.hint_vars.push("  ".to_string());
        assert!(config.check().is_err());
    }
}
