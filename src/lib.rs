//! gitspace - workspace and git root detection
//!
//! Resolves which directory a git-driven tool should operate on, through
//! an ordered chain of strategies (explicit override, host-provided hint,
//! git itself, current directory), with every candidate validated and
//! results cached for a short time.

pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod platform;
pub mod server;
pub mod ui;
pub mod workspace;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{GitspaceError, GitspaceResult};
