//! The RPC boundary between two peers.
//!
//! The session never talks to a channel directly. It calls out through an
//! `RpcTransport` and is called into through `RpcHandler`; the transport owns
//! ordering, delivery and deadlines.

use std::time::Duration;

mod error;
mod messages;

pub use error::TransportError;
pub use messages::{from_bytes, to_bytes, GetTreeRequest, VisitRequest, VisitResponse};

use crate::{wire::Batch, SyncError};

pub const VISIT_METHOD: &str = "Visit";
pub const GET_TREE_METHOD: &str = "GetTree";
pub const RESET_METHOD: &str = "Reset";

/// Outbound half: issues requests to the peer and blocks for the reply.
pub trait RpcTransport: Send + Sync {
    fn visit(
        &self,
        request: VisitRequest,
        timeout: Duration,
    ) -> Result<VisitResponse, TransportError>;

    /// Returns one batch of the peer's conversation for the tree.
    fn get_tree(&self, request: GetTreeRequest, timeout: Duration) -> Result<Batch, TransportError>;

    fn reset(&self, timeout: Duration) -> Result<(), TransportError>;
}

/// Inbound half: what a transport dispatches each method to.
pub trait RpcHandler: Send + Sync {
    fn handle_visit(&self, request: VisitRequest) -> Result<VisitResponse, SyncError>;

    fn handle_get_tree(&self, request: GetTreeRequest) -> Result<Batch, SyncError>;

    fn handle_reset(&self) -> Result<(), SyncError>;
}
