//! Working copies of managed repositories.

mod config;
mod git;
mod types;

pub use config::GitConfig;
pub use git::GitCli;
pub use types::*;
