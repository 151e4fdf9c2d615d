//! # Treesync Shared
//! Differential replication of immutable trees between two peers.
//!
//! A peer diffs the new version of a tree against the version the other side
//! is known to hold and streams the difference as batches of wire units. The
//! other side rebuilds the new version from those units, reusing every
//! subtree that did not change.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use treesync_serde::{
    BitReader, BitWrite, BitWriter, ConstBitLength, Serde, SerdeErr, SignedInteger,
    SignedVariableInteger, UnsignedInteger, UnsignedVariableInteger,
};

mod codec;
mod error;
mod queue;
mod registry;
mod session;
mod transport;
mod tree;
mod types;
mod wire;

pub use codec::{
    required, CodecError, CodecRegistry, DialectCodecs, DialectPlugin, Draft, ResolvedCodec,
    RpcCodec, SelfCodec, Transmit, TreeCodec,
};
pub use error::SyncError;
pub use queue::{ReceiveQueue, SendQueue};
pub use registry::{IdentityRegistry, Referenceable, WeakRef};
pub use session::{
    RefState, Session, SessionConfig, SessionStats, TreeState, TreeVisitor, VisitorRegistry,
    VisitorResult,
};
pub use transport::{
    from_bytes, to_bytes, GetTreeRequest, RpcHandler, RpcTransport, TransportError,
    VisitRequest, VisitResponse, GET_TREE_METHOD, RESET_METHOD, VISIT_METHOD,
};
pub use tree::{downcast_tree, Tree};
pub use types::{RefId, TreeId};
pub use wire::{
    decode_batch, encode_batch, Batch, ObjectData, ProtocolError, State, Value, APPENDED,
};
