use thiserror::Error;

/// Errors that can occur while reading serialized bits
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// The reader ran out of bits before the value was complete
    #[error("Unexpected end of buffer after {bits_read} bits")]
    UnexpectedEnd { bits_read: usize },

    /// A discriminant or tag did not map to any known variant
    #[error("Invalid {what} tag: {tag}")]
    InvalidTag { what: &'static str, tag: u64 },

    /// A decoded integer does not fit the requested type
    #[error("Value {value} out of range for {what}")]
    OutOfRange { value: i128, what: &'static str },

    /// A variable-length integer kept signalling continuation past 128 bits
    #[error("Variable-length integer overflowed 128 bits")]
    VariableOverflow,

    /// A string payload was not valid UTF-8
    #[error("Invalid UTF-8 in string payload")]
    InvalidUtf8,
}
