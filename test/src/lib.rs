pub mod local_transport;
pub mod toy;

pub use helpers::*;
pub use local_transport::{LocalTransport, ScriptedTransport};
pub use visitors::visitors;
