//! Workspace detection
//!
//! [`WorkspaceDetector`] owns the strategy chain and the resolution cache.
//! Hosts build one at startup and keep it for the life of the process; a
//! new process always starts with an empty cache.

use crate::config::Config;
use crate::error::{GitspaceError, GitspaceResult, StrategyAttempt};
use crate::git::{CommandRunner, GitResolver, GitRunner};
use crate::workspace::cache::{CacheStats, ResolutionCache};
use crate::workspace::path::{PathValidator, WorkspacePath};
use crate::workspace::strategy::{
    DetectRequest, EnvHint, EnvironmentStrategy, FallbackCwdStrategy, GitCommandStrategy,
    OverrideStrategy, Resolution, ResolutionMethod, ResolveStrategy, StrategyOutcome,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cached view of a workspace
#[derive(Debug, Clone, Serialize)]
pub struct CachedResolution {
    pub path: WorkspacePath,
    pub method: ResolutionMethod,
    pub age_secs: u64,
    pub resolved_at: DateTime<Utc>,
    pub fresh: bool,
}

/// Cached and live resolution side by side
#[derive(Debug, Clone, Serialize)]
pub struct DetectionInfo {
    pub key: String,
    pub cached: Option<CachedResolution>,
    pub live: Option<Resolution>,

    /// Why the live resolution failed
    pub live_error: Option<String>,

    /// Cached and live answers disagree
    pub drift: bool,
}

/// Resolves and caches the workspace for a starting directory
pub struct WorkspaceDetector {
    strategies: Vec<Box<dyn ResolveStrategy>>,
    cache: ResolutionCache<Resolution>,
    resolver: GitResolver,
    validator: PathValidator,
    override_path: Option<String>,
    hint_vars: Vec<String>,
    last_request: Mutex<Option<DetectRequest>>,
}

impl WorkspaceDetector {
    /// Detector running the configured git executable
    pub fn from_config(config: &Config) -> Self {
        let runner = CommandRunner::new(
            config.git.executable.clone(),
            config.git.timeout(),
            config.git.retries,
        );
        Self::with_runner(config, Arc::new(runner))
    }

    /// Detector running git through `runner`
    pub fn with_runner(config: &Config, runner: Arc<dyn GitRunner>) -> Self {
        let validator = match config.workspace.allowed_root {
            Some(ref root) => PathValidator::with_boundary(root),
            None => PathValidator::new(),
        };
        let resolver = GitResolver::new(runner, validator.clone())
            .with_superproject_detection(config.git.detect_superproject);

        let mut strategies: Vec<Box<dyn ResolveStrategy>> = vec![
            Box::new(OverrideStrategy::new(validator.clone())),
            Box::new(EnvironmentStrategy::new(validator.clone())),
            Box::new(GitCommandStrategy::new(resolver.clone(), validator.clone())),
        ];
        if config.workspace.fallback_to_cwd {
            strategies.push(Box::new(FallbackCwdStrategy::new(validator.clone())));
        }

        Self {
            strategies,
            cache: ResolutionCache::new(config.workspace.cache_ttl()),
            resolver,
            validator,
            override_path: config.workspace.override_path.clone(),
            hint_vars: config.workspace.hint_vars.clone(),
            last_request: Mutex::new(None),
        }
    }

    pub fn resolver(&self) -> &GitResolver {
        &self.resolver
    }

    pub fn validator(&self) -> &PathValidator {
        &self.validator
    }

    /// Build a request from the current directory and environment
    ///
    /// An explicit override wins over the configured one.
    pub fn request(&self, override_path: Option<&str>) -> GitspaceResult<DetectRequest> {
        let start_dir = std::env::current_dir()
            .map_err(|e| GitspaceError::io("reading the current directory", e))?;
        Ok(DetectRequest {
            start_dir,
            override_path: override_path
                .map(str::to_string)
                .or_else(|| self.override_path.clone()),
            hint: EnvHint::from_env(&self.hint_vars),
        })
    }

    /// Workspace for the current directory
    pub async fn detect(&self, override_path: Option<&str>) -> GitspaceResult<WorkspacePath> {
        let request = self.request(override_path)?;
        Ok(self.detect_from(request).await?.path)
    }

    /// Resolution for an explicit request, served from cache when fresh
    pub async fn detect_from(&self, request: DetectRequest) -> GitspaceResult<Resolution> {
        let key = request.cache_key();
        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(request.clone());

        self.cache
            .get_or_compute(&key, self.cache.ttl(), || self.run_chain(&request))
            .await
    }

    /// Run every strategy in order, bypassing the cache
    pub async fn resolve_uncached(&self, request: &DetectRequest) -> GitspaceResult<Resolution> {
        self.run_chain(request).await
    }

    async fn run_chain(&self, request: &DetectRequest) -> GitspaceResult<Resolution> {
        let mut attempts = Vec::new();
        let mut last_error = None;

        for strategy in &self.strategies {
            let method = strategy.method();
            match strategy.attempt(request).await {
                StrategyOutcome::Resolved(resolution) => {
                    info!(
                        method = %method,
                        path = %resolution.path,
                        degraded = resolution.degraded,
                        "Workspace resolved"
                    );
                    return Ok(resolution);
                }
                StrategyOutcome::Skipped(reason) => {
                    debug!(method = %method, reason, "Strategy skipped");
                    attempts.push(StrategyAttempt {
                        method: method.to_string(),
                        outcome: format!("skipped ({reason})"),
                    });
                }
                StrategyOutcome::FallThrough(e) => {
                    debug!(method = %method, error = %e, "Strategy failed, trying next");
                    attempts.push(StrategyAttempt {
                        method: method.to_string(),
                        outcome: e.to_string(),
                    });
                    last_error = Some(e);
                }
                StrategyOutcome::Abort(e) => {
                    warn!(method = %method, error = %e, "Workspace detection failed");
                    attempts.push(StrategyAttempt {
                        method: method.to_string(),
                        outcome: e.to_string(),
                    });
                    return Err(workspace_error(request, attempts, e));
                }
            }
        }

        let source = last_error
            .unwrap_or_else(|| GitspaceError::Internal("no resolution strategy applied".to_string()));
        warn!(error = %source, "Every workspace strategy failed");
        Err(workspace_error(request, attempts, source))
    }

    /// Evict a cache key, every entry started from a directory, or everything
    /// when `key` is `None`
    pub fn invalidate(&self, key: Option<&str>) -> usize {
        let Some(key) = key else {
            return self.cache.invalidate_all();
        };
        // A bare directory evicts every override and hint variant started there
        let dir = trim_trailing_separator(key);
        self.cache.invalidate_where(|cached| {
            cached == key || trim_trailing_separator(DetectRequest::key_start_dir(cached)) == dir
        })
    }

    /// Compare the cached resolution with a fresh one
    ///
    /// Without an override this inspects the most recent request, falling
    /// back to one built from the current directory.
    pub async fn info(&self, override_path: Option<&str>) -> GitspaceResult<DetectionInfo> {
        let last = self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let request = match (override_path, last) {
            (None, Some(last)) => last,
            _ => self.request(override_path)?,
        };
        Ok(self.info_for(&request).await)
    }

    /// Compare the cached resolution for `request` with a fresh one
    pub async fn info_for(&self, request: &DetectRequest) -> DetectionInfo {
        let key = request.cache_key();
        let cached = self.cache.peek(&key).await.map(|snapshot| CachedResolution {
            path: snapshot.value.path,
            method: snapshot.value.method,
            age_secs: snapshot.age.as_secs(),
            resolved_at: snapshot.resolved_at,
            fresh: snapshot.fresh,
        });

        let (live, live_error) = match self.run_chain(request).await {
            Ok(resolution) => (Some(resolution), None),
            Err(e) => (None, Some(e.to_string())),
        };

        let drift = match cached {
            Some(ref cached) => live.as_ref().map(|l| &l.path) != Some(&cached.path),
            None => false,
        };
        if drift {
            warn!(key = %key, "Cached workspace no longer matches a fresh resolution");
        }

        DetectionInfo {
            key,
            cached,
            live,
            live_error,
            drift,
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache.ttl()
    }

    /// Start directory of the most recent detection, if any
    pub fn last_start_dir(&self) -> Option<PathBuf> {
        self.last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|r| r.start_dir.clone())
    }
}

fn workspace_error(
    request: &DetectRequest,
    attempts: Vec<StrategyAttempt>,
    source: GitspaceError,
) -> GitspaceError {
    GitspaceError::Workspace {
        start: request.start_dir.clone(),
        attempts,
        source: Box::new(source),
    }
}

fn trim_trailing_separator(dir: &str) -> &str {
    match dir.trim_end_matches('/') {
        "" if dir.starts_with('/') => "/",
        trimmed => trimmed,
    }
}
