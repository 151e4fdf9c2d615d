use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while carrying an RPC to the peer and back
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The peer did not answer within the round trip deadline
    #[error("No response within {after:?}. The round trip deadline elapsed")]
    Timeout { after: Duration },

    /// The channel to the peer is closed
    #[error("Channel to the peer is closed")]
    Disconnected,

    /// The peer received the request but its handler failed
    #[error("Peer failed to handle the request: {message}")]
    Remote { message: String },

    /// A request or response could not be read off the channel
    #[error("Malformed message: {reason}")]
    Malformed { reason: String },
}
