//! The two halves of a tree conversation: `SendQueue` turns a before/after
//! pair into units, `ReceiveQueue` turns units back into the after value.

mod receive_queue;
mod send_queue;

pub use receive_queue::ReceiveQueue;
pub use send_queue::SendQueue;
