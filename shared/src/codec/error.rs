use thiserror::Error;

/// Errors that can occur while resolving or applying a codec
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// No codec is registered for a value type
    #[error("No codec registered for value type '{value_type}' (dialect: {dialect:?}). Register it with CodecRegistry::register_self() or through a DialectPlugin")]
    UnknownType {
        value_type: String,
        dialect: Option<&'static str>,
    },

    /// A codec was handed a value of a type it does not handle
    #[error("Codec expected a value of type '{expected}' but was given '{found}'")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    /// A codec was registered twice for the same type in the same table
    #[error("A codec for '{value_type}' is already registered (dialect: {dialect:?})")]
    DuplicateCodec {
        value_type: String,
        dialect: Option<&'static str>,
    },

    /// Registry is locked and cannot be modified
    #[error("CodecRegistry is already locked and cannot be modified. CodecRegistry.lock() has been called and no further changes are allowed")]
    RegistryLocked,
}
