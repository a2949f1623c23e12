//! Snapshot resolution and point-in-time read contexts.

pub mod context;
pub mod resolver;

pub use context::QueryContext;
pub use resolver::{find_highest_stop_rid, resolve_snapshot, ResolvedSnapshot};
