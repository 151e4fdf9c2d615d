use std::{
    any::Any,
    sync::{Arc, Weak},
};

/// A value that can be tracked by identity in an `IdentityRegistry`.
///
/// Identity is the address of the shared allocation, never value equality:
/// two structurally equal values are still two distinct occurrences.
pub trait Referenceable: Clone + Send + Sync + 'static {
    fn identity(&self) -> usize;

    fn downgrade(&self) -> Box<dyn WeakRef>;
}

/// Type-erased weak handle held by a weak registry.
pub trait WeakRef: Send + Sync {
    fn is_alive(&self) -> bool;

    /// Upgrades to a boxed strong handle of the original `Referenceable` type.
    fn upgrade_any(&self) -> Option<Box<dyn Any + Send + Sync>>;
}

impl<T: ?Sized + Send + Sync + 'static> Referenceable for Arc<T> {
    fn identity(&self) -> usize {
        Arc::as_ptr(self).cast::<()>() as usize
    }

    fn downgrade(&self) -> Box<dyn WeakRef> {
        Box::new(Arc::downgrade(self))
    }
}

impl<T: ?Sized + Send + Sync + 'static> WeakRef for Weak<T> {
    fn is_alive(&self) -> bool {
        self.strong_count() > 0
    }

    fn upgrade_any(&self) -> Option<Box<dyn Any + Send + Sync>> {
        self.upgrade()
            .map(|strong| Box::new(strong) as Box<dyn Any + Send + Sync>)
    }
}
