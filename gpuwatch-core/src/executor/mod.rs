//! Remote execution layer
//!
//! Runs commands on cluster nodes and hands back their raw output.

mod interface;
mod mock;
mod ssh;

pub use interface::*;
pub use mock::{MockCall, MockExecutor};
pub use ssh::SshExecutor;
