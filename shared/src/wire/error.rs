use thiserror::Error;
use treesync_serde::SerdeErr;

use crate::{wire::State, RefId, TreeId};

/// Violations of the tree synchronization protocol.
///
/// These are fatal to the conversation they occur in; the layer never retries
/// them, the caller of `visit`/`scan`/`get_tree` receives them as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A conversation finished its value without the terminal END_OF_OBJECT unit
    #[error("Expected END_OF_OBJECT after tree {tree_id}, found {found:?}. The peer's encoder and this decoder disagree on the tree's shape")]
    MissingEndOfObject { tree_id: TreeId, found: State },

    /// END_OF_OBJECT arrived while a value was still being reconstructed
    #[error("Unexpected END_OF_OBJECT while decoding a value. The conversation ended early")]
    UnexpectedEndOfObject,

    /// A unit in a position that only admits certain states
    #[error("Expected {expected} unit, found {found:?}")]
    UnexpectedState { expected: &'static str, found: State },

    /// The peer answered a pull with no units at all
    #[error("Peer returned an empty batch. A conversation always ends with END_OF_OBJECT")]
    EmptyBatch,

    /// A list CHANGE unit did not carry its positions
    #[error("List CHANGE unit is missing its positions")]
    MissingPositions,

    /// A list position points outside of the before list
    #[error("List position {position} is out of range for a before list of {len} elements")]
    PositionOutOfRange { position: i32, len: usize },

    /// A ref-only ADD referenced an id that was never transmitted
    #[error("Reference {reference} was never transmitted in this session")]
    UnknownRef { reference: RefId },

    /// A cached ref resolved to an object of a different type than the field expects
    #[error("Reference {reference} does not hold a {expected}")]
    RefTypeMismatch {
        reference: RefId,
        expected: &'static str,
    },

    /// A leaf unit arrived without its inline value
    #[error("Expected an inline {expected} value, found none")]
    MissingValue { expected: &'static str },

    /// An inline value of the wrong kind for the field being decoded
    #[error("Expected an inline {expected} value, found {found}")]
    ValueKindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// An inline value arrived where a nested value was expected
    #[error("Unexpected inline value for nested {value_type}")]
    UnexpectedValue { value_type: String },

    /// A staged value was frozen before all of its required fields were received
    #[error("Incomplete {value_type}: required field '{field}' was never received")]
    IncompleteValue {
        value_type: &'static str,
        field: &'static str,
    },

    /// A unit breaks the shape rules for its state
    #[error("Invalid {state:?} unit: {reason}")]
    InvalidUnit { state: State, reason: &'static str },

    /// A batch could not be read off the wire
    #[error("Malformed batch: {0}")]
    Malformed(#[from] SerdeErr),
}
