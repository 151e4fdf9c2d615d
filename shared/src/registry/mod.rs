mod identity_registry;
mod referenceable;

pub use identity_registry::IdentityRegistry;
pub use referenceable::{Referenceable, WeakRef};
