//! Notification state store
//!
//! Holds the notified flag and the alerting credentials as plain strings.

mod env_file;
mod interface;
mod memory;

pub use env_file::EnvFileStore;
pub use interface::*;
pub use memory::MemoryStore;
