use std::{any::Any, sync::Arc};

use crate::{
    codec::{Draft, RpcCodec},
    queue::{ReceiveQueue, SendQueue},
    wire::{ProtocolError, Value},
    SyncError, Tree, TreeId,
};

/// How a value takes part in a tree conversation.
///
/// Leaves travel inline as a `Value`. Everything else is described by the
/// units its fields produce: `send_fields` on the way out, `receive_fields`
/// on the way in.
pub trait Transmit: Clone + Send + Sync + 'static {
    /// Whether `other` is the same occurrence: identity for shared values,
    /// equality for leaves.
    fn same(&self, other: &Self) -> bool;

    /// Concrete type name sent with ADD so the receiver can allocate the
    /// right shell. Leaves have none.
    fn value_type(&self) -> Option<&str> {
        None
    }

    /// Inline payload, `Some` exactly for leaves.
    fn to_value(&self) -> Option<Value> {
        None
    }

    /// The value as the parent context of its own field sends.
    fn as_parent(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        None
    }

    fn send_fields(&self, _queue: &mut SendQueue<'_>) -> Result<(), SyncError> {
        Ok(())
    }

    fn from_value(value: Value) -> Result<Self, SyncError>;

    fn receive_fields(
        before: Option<&Self>,
        value_type: Option<&str>,
        queue: &mut ReceiveQueue<'_>,
    ) -> Result<Self, SyncError>;
}

macro_rules! impl_leaf_transmit {
    ($($leaf:ty => $variant:ident),* $(,)?) => {$(
        impl Transmit for $leaf {
            fn same(&self, other: &Self) -> bool {
                self == other
            }

            fn to_value(&self) -> Option<Value> {
                Some(Value::$variant(self.clone().into()))
            }

            fn from_value(value: Value) -> Result<Self, SyncError> {
                let found = value.kind();
                match value {
                    Value::$variant(inner) => Self::try_from(inner).map_err(|_| {
                        ProtocolError::ValueKindMismatch {
                            expected: stringify!($leaf),
                            found,
                        }
                        .into()
                    }),
                    _ => Err(ProtocolError::ValueKindMismatch {
                        expected: stringify!($leaf),
                        found,
                    }
                    .into()),
                }
            }

            fn receive_fields(
                _before: Option<&Self>,
                _value_type: Option<&str>,
                _queue: &mut ReceiveQueue<'_>,
            ) -> Result<Self, SyncError> {
                Err(ProtocolError::MissingValue {
                    expected: stringify!($leaf),
                }
                .into())
            }
        }
    )*};
}

impl_leaf_transmit! {
    bool => Bool,
    i64 => Int,
    i32 => Int,
    u32 => Int,
    f64 => Float,
    String => Str,
    TreeId => Id,
}

impl<N: RpcCodec> Transmit for Arc<N> {
    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }

    fn value_type(&self) -> Option<&str> {
        Some(N::TYPE_NAME)
    }

    fn as_parent(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        Some(self.clone() as Arc<dyn Any + Send + Sync>)
    }

    fn send_fields(&self, queue: &mut SendQueue<'_>) -> Result<(), SyncError> {
        N::rpc_send(self, queue)
    }

    fn from_value(_value: Value) -> Result<Self, SyncError> {
        Err(ProtocolError::UnexpectedValue {
            value_type: N::TYPE_NAME.to_string(),
        }
        .into())
    }

    fn receive_fields(
        before: Option<&Self>,
        _value_type: Option<&str>,
        queue: &mut ReceiveQueue<'_>,
    ) -> Result<Self, SyncError> {
        let mut draft = match before {
            Some(before) => <N::Draft as Draft<N>>::of(before),
            None => N::Draft::default(),
        };
        N::rpc_receive(&mut draft, queue)?;
        Ok(Arc::new(draft.freeze()?))
    }
}

impl Transmit for Arc<dyn Tree> {
    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }

    fn value_type(&self) -> Option<&str> {
        Some(self.type_name())
    }

    fn as_parent(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        Some(self.clone().into_any())
    }

    fn send_fields(&self, queue: &mut SendQueue<'_>) -> Result<(), SyncError> {
        let tree: &dyn Tree = self.as_ref();
        let dialect = tree.dialect().or(queue.dialect());
        let resolved = queue.codecs().resolve(tree.type_name(), dialect)?;
        queue.in_dialect(resolved.dialect.or(dialect), |queue| {
            resolved.codec.rpc_send(tree, queue)
        })
    }

    fn from_value(_value: Value) -> Result<Self, SyncError> {
        Err(ProtocolError::UnexpectedValue {
            value_type: "tree".to_string(),
        }
        .into())
    }

    fn receive_fields(
        before: Option<&Self>,
        value_type: Option<&str>,
        queue: &mut ReceiveQueue<'_>,
    ) -> Result<Self, SyncError> {
        let value_type = value_type
            .or_else(|| before.map(|before| before.type_name()))
            .ok_or(ProtocolError::MissingValue {
                expected: "value type",
            })?;
        let dialect = before
            .and_then(|before| before.dialect())
            .or(queue.dialect());
        let resolved = queue.codecs().resolve(value_type, dialect)?;
        queue.in_dialect(resolved.dialect.or(dialect), |queue| {
            resolved.codec.rpc_receive(before, value_type, queue)
        })
    }
}
