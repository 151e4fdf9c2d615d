//! Session orchestration: per-tree shadow state, the visit and get-tree
//! flows, and the background encode tasks that serve the peer.

mod config;
mod conversation;
#[allow(clippy::module_inception)]
mod session;
mod stats;
mod visitor;

pub use config::SessionConfig;
pub use session::Session;
pub use stats::SessionStats;
pub use visitor::{TreeVisitor, VisitorRegistry, VisitorResult};

/// Where a tree id stands between the two peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeState {
    /// Never seen by this session
    Unknown,
    /// This side holds a value the peer has not confirmed
    LocalOnly,
    /// Both sides hold the same value
    Synced,
}

/// Where a value sent by ref stands between the two peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefState {
    /// Never sent by ref
    Unknown,
    /// Sent by a conversation that has not handed over its final batch
    Pending,
    /// The peer holds it; later conversations send the ref alone
    Committed,
}
