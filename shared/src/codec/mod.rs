//! Codec dispatch: how a value type is encoded to and decoded from units.
//!
//! Leaves and self-describing values implement `Transmit` statically.
//! Nodes reached through `Arc<dyn Tree>` are routed at runtime by the
//! `CodecRegistry`, per value type and per dialect.

mod codec_registry;
mod error;
mod rpc_codec;
mod transmit;

pub use codec_registry::{CodecRegistry, DialectCodecs, DialectPlugin, ResolvedCodec};
pub use error::CodecError;
pub use rpc_codec::{required, Draft, RpcCodec, SelfCodec, TreeCodec};
pub use transmit::Transmit;
