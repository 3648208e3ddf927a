//! Workspace detection: path validation, strategies and caching

pub mod cache;
pub mod detector;
pub mod path;
pub mod strategy;

pub use cache::{CacheSnapshot, CacheStats, ResolutionCache};
pub use detector::{CachedResolution, DetectionInfo, WorkspaceDetector};
pub use path::{PathValidator, WorkspacePath};
pub use strategy::{
    DetectRequest, EnvHint, EnvironmentStrategy, FallbackCwdStrategy, GitCommandStrategy,
    OverrideStrategy, Resolution, ResolutionMethod, ResolveStrategy, StrategyOutcome,
};
