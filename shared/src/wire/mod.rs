//! Wire data units: the state transitions that make up a tree conversation,
//! their inline values, and the bit encoding of batches.

mod batch;
mod error;
mod object_data;
mod value;

pub use batch::{decode_batch, encode_batch, Batch};
pub use error::ProtocolError;
pub use object_data::{ObjectData, State};
pub use value::{Value, APPENDED};
