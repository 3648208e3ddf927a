//! CLI command implementations

pub mod changes;
pub mod cleanup_lock;
pub mod completions;
pub mod config;
pub mod detect;
pub mod diff;
pub mod info;
pub mod repo;
pub mod serve;
pub mod status;

pub use changes::execute as changes;
pub use cleanup_lock::execute as cleanup_lock;
pub use completions::execute as completions;
pub use config::execute as config;
pub use detect::execute as detect;
pub use diff::execute as diff;
pub use info::execute as info;
pub use repo::execute as repo;
pub use serve::execute as serve;
pub use status::execute as status;
