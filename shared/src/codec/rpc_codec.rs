use std::{marker::PhantomData, sync::Arc};

use crate::{
    codec::CodecError,
    queue::{ReceiveQueue, SendQueue},
    wire::ProtocolError,
    SyncError, Tree,
};

/// A type that describes its own wire shape.
///
/// `rpc_send` emits one send call per field, in a fixed order, using the
/// `get_and_send*` helpers of the queue. `rpc_receive` issues the matching
/// receive calls, in the same order, into a `Draft`.
pub trait RpcCodec: Send + Sync + Sized + 'static {
    /// Name sent as the value type when a value of this type is added
    const TYPE_NAME: &'static str;

    type Draft: Draft<Self>;

    fn rpc_send(&self, queue: &mut SendQueue<'_>) -> Result<(), SyncError>;

    fn rpc_receive(draft: &mut Self::Draft, queue: &mut ReceiveQueue<'_>) -> Result<(), SyncError>;
}

/// Mutable staging area for an immutable value under reconstruction.
///
/// All fields are optional. An added value starts from `Default`, a changed
/// value starts from `Draft::of(before)`; either way the result only becomes
/// the public type through `freeze`.
pub trait Draft<T>: Default {
    fn of(value: &T) -> Self;

    fn freeze(self) -> Result<T, ProtocolError>;
}

/// Unwraps a required draft field at freeze time.
pub fn required<T>(
    field: Option<T>,
    value_type: &'static str,
    name: &'static str,
) -> Result<T, ProtocolError> {
    field.ok_or(ProtocolError::IncompleteValue {
        value_type,
        field: name,
    })
}

/// Dynamic codec for nodes reached through `Arc<dyn Tree>`.
///
/// One codec may serve a whole family of node types: it receives the concrete
/// value type name and downcasts as needed.
pub trait TreeCodec: Send + Sync {
    fn rpc_send(&self, tree: &dyn Tree, queue: &mut SendQueue<'_>) -> Result<(), SyncError>;

    fn rpc_receive(
        &self,
        before: Option<&Arc<dyn Tree>>,
        value_type: &str,
        queue: &mut ReceiveQueue<'_>,
    ) -> Result<Arc<dyn Tree>, SyncError>;
}

/// Serves a self-describing node type through the dynamic codec interface.
pub struct SelfCodec<T> {
    phantom_t: PhantomData<fn() -> T>,
}

impl<T> SelfCodec<T> {
    pub fn new() -> Self {
        Self {
            phantom_t: PhantomData,
        }
    }
}

impl<T> Default for SelfCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RpcCodec + Tree> TreeCodec for SelfCodec<T> {
    fn rpc_send(&self, tree: &dyn Tree, queue: &mut SendQueue<'_>) -> Result<(), SyncError> {
        let node = tree
            .downcast_ref::<T>()
            .ok_or_else(|| CodecError::TypeMismatch {
                expected: T::TYPE_NAME,
                found: tree.type_name().to_string(),
            })?;
        node.rpc_send(queue)
    }

    fn rpc_receive(
        &self,
        before: Option<&Arc<dyn Tree>>,
        _value_type: &str,
        queue: &mut ReceiveQueue<'_>,
    ) -> Result<Arc<dyn Tree>, SyncError> {
        let mut draft = match before {
            Some(before) => {
                let before = before
                    .downcast_ref::<T>()
                    .ok_or_else(|| CodecError::TypeMismatch {
                        expected: T::TYPE_NAME,
                        found: before.type_name().to_string(),
                    })?;
                <T::Draft as Draft<T>>::of(before)
            }
            None => T::Draft::default(),
        };
        T::rpc_receive(&mut draft, queue)?;
        let node: Arc<dyn Tree> = Arc::new(draft.freeze()?);
        Ok(node)
    }
}
