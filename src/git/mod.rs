//! Git process execution, root resolution, inspection and maintenance

pub mod inspect;
pub mod maintenance;
pub mod resolver;
pub mod runner;

pub use inspect::{diff, working_tree_status, StatusEntry, WorkingTreeStatus, WorkspaceDiff};
pub use maintenance::{cleanup_index_lock, LockCleanup};
pub use resolver::{parse_git_version, GitResolver, RepoInfo, RepositoryKind, MIN_GIT_VERSION};
pub use runner::{CommandRunner, CountingRunner, GitOutput, GitRunner};
