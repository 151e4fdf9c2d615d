use thiserror::Error;

use crate::{codec::CodecError, transport::TransportError, wire::ProtocolError, TreeId};

/// Errors surfaced by a synchronization session.
///
/// Every variant is fatal to the call that produced it. Nothing at this layer
/// retries: retrying is a decision for the transport or the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// The wire conversation broke the protocol
    #[error("Protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    /// A value could not be routed to a codec
    #[error("Codec dispatch failed: {0}")]
    Codec(#[from] CodecError),

    /// An outbound RPC failed, whichever verb it was
    #[error("RPC '{method}' failed: {source}")]
    Transport {
        method: &'static str,
        #[source]
        source: TransportError,
    },

    /// The peer failed to encode the tree it was asked for
    #[error("Remote peer failed to encode the requested tree: {message}")]
    RemoteEncode { message: String },

    /// A request named a tree this side has never seen
    #[error("Tree {tree_id} is not known to this session. Call scan() or visit() with the tree first")]
    UnknownTree { tree_id: TreeId },

    /// A tree handed to the session cannot be addressed by id
    #[error("Value of type '{type_name}' has no tree id. Only root trees can be synchronized")]
    MissingTreeId { type_name: &'static str },

    /// No visitor factory is registered under the requested name
    #[error("No visitor registered under the name '{name}'")]
    UnknownVisitor { name: String },

    /// A visitor returned an error while rewriting a tree
    #[error("Visitor '{visitor}' failed: {message}")]
    Visitor { visitor: String, message: String },

    /// The reader of a conversation went away before it was finished
    #[error("Conversation for tree {tree_id} was abandoned by its reader")]
    ConversationAbandoned { tree_id: TreeId },

    /// The background encode task ended without a terminal unit
    #[error("Encode task for tree {tree_id} stopped without sending a terminal unit")]
    EncodeTaskLost { tree_id: TreeId },

    /// A lock guarding session state was poisoned by a panicking thread
    #[error("Lock guarding {what} was poisoned by a panicking thread")]
    Poisoned { what: &'static str },

    /// The encode worker pool could not be built
    #[error("Failed to start the encode worker pool: {message}")]
    WorkerPool { message: String },
}

impl SyncError {
    pub(crate) fn transport(method: &'static str) -> impl FnOnce(TransportError) -> SyncError {
        move |source| SyncError::Transport { method, source }
    }

    pub(crate) fn poisoned<T>(what: &'static str) -> impl FnOnce(T) -> SyncError {
        move |_| SyncError::Poisoned { what }
    }
}
