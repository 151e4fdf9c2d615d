use std::{collections::HashMap, error::Error, sync::Arc};

use crate::{wire::Value, Tree};

pub type VisitorResult = Result<Arc<dyn Tree>, Box<dyn Error + Send + Sync>>;

/// Rewrites a tree. Returning the input `Arc` unchanged means "no change".
pub trait TreeVisitor: Send {
    fn visit(&mut self, tree: &Arc<dyn Tree>, context: Option<&Value>) -> VisitorResult;
}

type VisitorFactory = Box<dyn Fn() -> Box<dyn TreeVisitor> + Send + Sync>;

/// Visitors the peer may ask for, by name.
#[derive(Default)]
pub struct VisitorRegistry {
    factories: HashMap<String, VisitorFactory>,
}

impl VisitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a visitor constructed with `Default` for every visit.
    pub fn register<V: TreeVisitor + Default + 'static>(&mut self, name: &str) -> &mut Self {
        self.register_with(name, || Box::new(V::default()))
    }

    pub fn register_with(
        &mut self,
        name: &str,
        factory: impl Fn() -> Box<dyn TreeVisitor> + Send + Sync + 'static,
    ) -> &mut Self {
        self.factories.insert(name.to_string(), Box::new(factory));
        self
    }

    pub fn create(&self, name: &str) -> Option<Box<dyn TreeVisitor>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}
