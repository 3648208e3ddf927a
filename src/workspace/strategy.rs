//! Workspace resolution strategies
//!
//! The detector walks an ordered list of [`ResolveStrategy`] objects. Each
//! one either resolves the workspace, declines, lets the next one try, or
//! stops the chain with an error.

use crate::error::{GitspaceError, GitspaceResult};
use crate::git::{GitResolver, RepositoryKind};
use crate::workspace::path::{PathValidator, WorkspacePath};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Variable that may hold several `;`-separated folders
pub const WORKSPACE_FOLDER_PATHS: &str = "WORKSPACE_FOLDER_PATHS";

/// How a workspace was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMethod {
    Override,
    Environment,
    GitCommand,
    FallbackCwd,
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Override => write!(f, "override"),
            Self::Environment => write!(f, "environment"),
            Self::GitCommand => write!(f, "git-command"),
            Self::FallbackCwd => write!(f, "fallback-cwd"),
        }
    }
}

/// A resolved workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub path: WorkspacePath,

    pub method: ResolutionMethod,

    /// Repository layout, known only when git was asked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<RepositoryKind>,

    /// Superproject of a submodule (diagnostic only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superproject: Option<PathBuf>,

    /// Set when git could not confirm a repository and the start directory
    /// was used as-is
    pub degraded: bool,

    /// Variable the workspace came from, for environment resolutions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint_source: Option<String>,
}

impl Resolution {
    fn new(path: WorkspacePath, method: ResolutionMethod) -> Self {
        Self {
            path,
            method,
            kind: None,
            superproject: None,
            degraded: false,
            hint_source: None,
        }
    }
}

/// Workspace hint supplied by the invoking host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvHint {
    pub var: String,
    pub value: String,
}

impl EnvHint {
    /// First hint among `vars` that is set in the process environment
    pub fn from_env(vars: &[String]) -> Option<Self> {
        Self::from_lookup(vars, |name| std::env::var(name).ok())
    }

    /// First hint among `vars` for which `lookup` yields a non-blank value
    pub fn from_lookup(vars: &[String], lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        vars.iter().find_map(|var| {
            let raw = lookup(var)?;
            let value = if var == WORKSPACE_FOLDER_PATHS {
                raw.split(';').map(str::trim).find(|s| !s.is_empty())?
            } else {
                raw.trim()
            };
            (!value.is_empty()).then(|| Self {
                var: var.clone(),
                value: value.to_string(),
            })
        })
    }
}

/// Everything one detection looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectRequest {
    /// Directory git resolution starts from
    pub start_dir: PathBuf,

    pub override_path: Option<String>,

    pub hint: Option<EnvHint>,
}

impl DetectRequest {
    /// Request starting at `start_dir` with no override or hint
    pub fn new(start_dir: impl Into<PathBuf>) -> Self {
        Self {
            start_dir: start_dir.into(),
            override_path: None,
            hint: None,
        }
    }

    pub fn with_override(mut self, path: impl Into<String>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_hint(mut self, var: impl Into<String>, value: impl Into<String>) -> Self {
        self.hint = Some(EnvHint {
            var: var.into(),
            value: value.into(),
        });
        self
    }

    /// Cache key: the start directory plus any override or hint
    pub fn cache_key(&self) -> String {
        let mut key = self.start_dir.display().to_string();
        if let Some(ref path) = self.override_path {
            key.push_str(OVERRIDE_TAG);
            key.push_str(path);
        }
        if let Some(ref hint) = self.hint {
            key.push_str(&format!("{HINT_TAG}{}={}", hint.var, hint.value));
        }
        key
    }

    /// Start directory component of a key built by [`cache_key`](Self::cache_key)
    pub fn key_start_dir(key: &str) -> &str {
        [OVERRIDE_TAG, HINT_TAG]
            .iter()
            .filter_map(|tag| key.find(tag))
            .min()
            .map_or(key, |end| &key[..end])
    }
}

const OVERRIDE_TAG: &str = "|override=";
const HINT_TAG: &str = "|hint=";

/// Result of one strategy
#[derive(Debug)]
pub enum StrategyOutcome {
    Resolved(Resolution),

    /// Nothing to try (no override given, no hint set)
    Skipped(&'static str),

    /// Tried and failed; the next strategy may still succeed
    FallThrough(GitspaceError),

    /// Tried and failed in a way that ends the detection
    Abort(GitspaceError),
}

/// One step of the detection chain
#[async_trait]
pub trait ResolveStrategy: Send + Sync {
    fn method(&self) -> ResolutionMethod;

    async fn attempt(&self, request: &DetectRequest) -> StrategyOutcome;
}

/// Operator-supplied path; an invalid override ends the detection
pub struct OverrideStrategy {
    validator: PathValidator,
}

impl OverrideStrategy {
    pub fn new(validator: PathValidator) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl ResolveStrategy for OverrideStrategy {
    fn method(&self) -> ResolutionMethod {
        ResolutionMethod::Override
    }

    async fn attempt(&self, request: &DetectRequest) -> StrategyOutcome {
        let Some(ref raw) = request.override_path else {
            return StrategyOutcome::Skipped("no override given");
        };
        match self.validator.validate(raw) {
            Ok(path) => StrategyOutcome::Resolved(Resolution::new(path, self.method())),
            Err(e) => StrategyOutcome::Abort(e),
        }
    }
}

/// Host-provided hint; an invalid hint is logged and skipped
pub struct EnvironmentStrategy {
    validator: PathValidator,
}

impl EnvironmentStrategy {
    pub fn new(validator: PathValidator) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl ResolveStrategy for EnvironmentStrategy {
    fn method(&self) -> ResolutionMethod {
        ResolutionMethod::Environment
    }

    async fn attempt(&self, request: &DetectRequest) -> StrategyOutcome {
        let Some(ref hint) = request.hint else {
            return StrategyOutcome::Skipped("no hint variable set");
        };
        match self.validator.validate(&hint.value) {
            Ok(path) => {
                let mut resolution = Resolution::new(path, self.method());
                resolution.hint_source = Some(hint.var.clone());
                StrategyOutcome::Resolved(resolution)
            }
            Err(e) => {
                warn!(var = %hint.var, value = %hint.value, error = %e, "Ignoring invalid workspace hint");
                StrategyOutcome::FallThrough(e)
            }
        }
    }
}

/// Ask git for the repository enclosing the start directory
pub struct GitCommandStrategy {
    resolver: GitResolver,
    validator: PathValidator,
}

impl GitCommandStrategy {
    pub fn new(resolver: GitResolver, validator: PathValidator) -> Self {
        Self {
            resolver,
            validator,
        }
    }

    async fn resolve(&self, request: &DetectRequest) -> GitspaceResult<Resolution> {
        let start = self.validator.validate_path(&request.start_dir)?;
        let info = self.resolver.resolve_from(&start).await?;

        let mut resolution = Resolution::new(info.root, self.method());
        resolution.kind = Some(info.kind);
        resolution.superproject = info.superproject;
        Ok(resolution)
    }
}

#[async_trait]
impl ResolveStrategy for GitCommandStrategy {
    fn method(&self) -> ResolutionMethod {
        ResolutionMethod::GitCommand
    }

    async fn attempt(&self, request: &DetectRequest) -> StrategyOutcome {
        match self.resolve(request).await {
            Ok(resolution) => StrategyOutcome::Resolved(resolution),
            Err(e @ GitspaceError::NotARepository(_)) => StrategyOutcome::FallThrough(e),
            Err(e) => StrategyOutcome::Abort(e),
        }
    }
}

/// The start directory itself, flagged as degraded
pub struct FallbackCwdStrategy {
    validator: PathValidator,
}

impl FallbackCwdStrategy {
    pub fn new(validator: PathValidator) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl ResolveStrategy for FallbackCwdStrategy {
    fn method(&self) -> ResolutionMethod {
        ResolutionMethod::FallbackCwd
    }

    async fn attempt(&self, request: &DetectRequest) -> StrategyOutcome {
        match self.validator.validate_path(&request.start_dir) {
            Ok(path) => {
                warn!(
                    path = %path,
                    "Not inside a git repository; using the start directory, git operations may fail"
                );
                let mut resolution = Resolution::new(path, self.method());
                resolution.degraded = true;
                StrategyOutcome::Resolved(resolution)
            }
            Err(e) => {
                debug!(error = %e, "Start directory failed validation");
                StrategyOutcome::Abort(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::runner::fake::ScriptedRunner;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn vars(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn hint_takes_first_folder_of_workspace_paths() {
        let hint = EnvHint::from_lookup(
            &vars(&["WORKSPACE_FOLDER_PATHS", "PROJECT_ROOT"]),
            lookup(&[("WORKSPACE_FOLDER_PATHS", ";/a;/b"), ("PROJECT_ROOT", "/c")]),
        )
        .unwrap();
        assert_eq!(hint.var, "WORKSPACE_FOLDER_PATHS");
        assert_eq!(hint.value, "/a");
    }

    #[test]
    fn hint_skips_blank_variables() {
        let hint = EnvHint::from_lookup(
            &vars(&["WORKSPACE_FOLDER_PATHS", "PROJECT_ROOT"]),
            lookup(&[("WORKSPACE_FOLDER_PATHS", " ; "), ("PROJECT_ROOT", "/c")]),
        )
        .unwrap();
        assert_eq!(hint.var, "PROJECT_ROOT");

        assert!(EnvHint::from_lookup(&vars(&["PROJECT_ROOT"]), lookup(&[])).is_none());
    }

    #[test]
    #[serial]
    fn hint_from_process_environment() {
        std::env::set_var("GITSPACE_TEST_HINT", "/from/env");
        let hint = EnvHint::from_env(&vars(&["GITSPACE_TEST_UNSET", "GITSPACE_TEST_HINT"]));
        std::env::remove_var("GITSPACE_TEST_HINT");

        assert_eq!(
            hint,
            Some(EnvHint {
                var: "GITSPACE_TEST_HINT".to_string(),
                value: "/from/env".to_string(),
            })
        );
    }

    #[test]
    fn cache_key_includes_override_and_hint() {
        let plain = DetectRequest::new("/work");
        assert_eq!(plain.cache_key(), "/work");

        let full = DetectRequest::new("/work")
            .with_override("/other")
            .with_hint("PROJECT_ROOT", "/p");
        assert_eq!(full.cache_key(), "/work|override=/other|hint=PROJECT_ROOT=/p");
    }

    #[test]
    fn method_display_matches_serialized_form() {
        for method in [
            ResolutionMethod::Override,
            ResolutionMethod::Environment,
            ResolutionMethod::GitCommand,
            ResolutionMethod::FallbackCwd,
        ] {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{method}\""));
        }
    }

    #[tokio::test]
    async fn override_skips_when_absent_and_aborts_when_invalid() {
        let strategy = OverrideStrategy::new(PathValidator::new());

        let request = DetectRequest::new("/");
        assert!(matches!(
            strategy.attempt(&request).await,
            StrategyOutcome::Skipped(_)
        ));

        let request = DetectRequest::new("/").with_override("/nonexistent/gitspace/override");
        assert!(matches!(
            strategy.attempt(&request).await,
            StrategyOutcome::Abort(GitspaceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn invalid_hint_falls_through() {
        let strategy = EnvironmentStrategy::new(PathValidator::new());
        let request =
            DetectRequest::new("/").with_hint("PROJECT_ROOT", "/nonexistent/gitspace/hint");

        assert!(matches!(
            strategy.attempt(&request).await,
            StrategyOutcome::FallThrough(GitspaceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn valid_hint_records_its_source() {
        let temp = TempDir::new().unwrap();
        let strategy = EnvironmentStrategy::new(PathValidator::new());
        let request =
            DetectRequest::new("/").with_hint("PROJECT_ROOT", temp.path().to_str().unwrap());

        let StrategyOutcome::Resolved(resolution) = strategy.attempt(&request).await else {
            panic!("expected a resolution");
        };
        assert_eq!(resolution.method, ResolutionMethod::Environment);
        assert_eq!(resolution.hint_source.as_deref(), Some("PROJECT_ROOT"));
        assert!(resolution.kind.is_none());
    }

    #[tokio::test]
    async fn git_strategy_only_falls_through_outside_repositories() {
        let temp = TempDir::new().unwrap();
        let request = DetectRequest::new(temp.path());
        let query = "rev-parse --is-bare-repository --is-inside-work-tree --absolute-git-dir \
                     --git-common-dir --show-toplevel --show-superproject-working-tree";

        let strategy = |runner: ScriptedRunner| {
            GitCommandStrategy::new(
                GitResolver::new(Arc::new(runner), PathValidator::new()),
                PathValidator::new(),
            )
        };

        let not_repo = strategy(ScriptedRunner::new().exit(query, 128, "fatal: not a git repository"));
        assert!(matches!(
            not_repo.attempt(&request).await,
            StrategyOutcome::FallThrough(GitspaceError::NotARepository(_))
        ));

        let no_git = strategy(ScriptedRunner::new().fail(
            query,
            GitspaceError::GitNotFound {
                executable: "git".to_string(),
            },
        ));
        assert!(matches!(
            no_git.attempt(&request).await,
            StrategyOutcome::Abort(GitspaceError::GitNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn fallback_is_degraded() {
        let temp = TempDir::new().unwrap();
        let strategy = FallbackCwdStrategy::new(PathValidator::new());

        let StrategyOutcome::Resolved(resolution) =
            strategy.attempt(&DetectRequest::new(temp.path())).await
        else {
            panic!("expected a resolution");
        };
        assert!(resolution.degraded);
        assert_eq!(resolution.path.as_path(), temp.path().canonicalize().unwrap());
    }
}
