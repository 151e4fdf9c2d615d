use std::{any::Any, fmt::Debug, sync::Arc};

use crate::TreeId;

/// A node of a synchronized tree, opaque beyond its type name.
///
/// Nodes are immutable and shared through `Arc`; a rewrite produces new nodes
/// and reuses the untouched ones, so identity (`Arc::ptr_eq`) is what tells an
/// edited subtree from an unchanged one.
pub trait Tree: Any + Send + Sync + Debug + 'static {
    /// Fully qualified name of the concrete node type, used to pick a codec
    /// and to allocate the right shell on the receiving side.
    fn type_name(&self) -> &'static str;

    /// Id under which a root is tracked by a session. Inner nodes have none.
    fn tree_id(&self) -> Option<TreeId> {
        None
    }

    /// Dialect whose codec table applies to this node and everything below it.
    fn dialect(&self) -> Option<&'static str> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl dyn Tree {
    pub fn downcast_ref<T: Tree>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Tree>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Downcasts a shared node to its concrete type.
pub fn downcast_tree<T: Tree>(tree: Arc<dyn Tree>) -> Option<Arc<T>> {
    tree.into_any().downcast::<T>().ok()
}

/// Implements the `Any` plumbing of `Tree` for a concrete node type.
#[macro_export]
macro_rules! impl_tree_any {
    () => {
        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn into_any(
            self: ::std::sync::Arc<Self>,
        ) -> ::std::sync::Arc<dyn ::std::any::Any + Send + Sync> {
            self
        }
    };
}
