use std::{collections::HashMap, sync::Arc};

use crate::{
    codec::{CodecError, RpcCodec, SelfCodec, TreeCodec},
    Tree,
};

// Dialect Plugin
pub trait DialectPlugin {
    fn build(&self, registry: &mut CodecRegistry);
}

/// Codecs of one dialect, keyed by value type, plus the declared ancestry of
/// its types so a family codec registered for a supertype covers subtypes.
#[derive(Default)]
pub struct DialectCodecs {
    codecs: HashMap<String, Arc<dyn TreeCodec>>,
    // most specific first, excluding the type itself
    ancestry: HashMap<String, Vec<String>>,
}

impl DialectCodecs {
    fn resolve(&self, value_type: &str) -> Option<&Arc<dyn TreeCodec>> {
        if let Some(codec) = self.codecs.get(value_type) {
            return Some(codec);
        }
        self.ancestry
            .get(value_type)?
            .iter()
            .find_map(|ancestor| self.codecs.get(ancestor))
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

/// The codec chosen for a value type, and the dialect whose table it came
/// from when it was not self-describing.
#[derive(Clone)]
pub struct ResolvedCodec {
    pub codec: Arc<dyn TreeCodec>,
    pub dialect: Option<&'static str>,
}

// CodecRegistry
pub struct CodecRegistry {
    self_describing: HashMap<String, Arc<dyn TreeCodec>>,
    dialects: HashMap<&'static str, DialectCodecs>,
    locked: bool,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self {
            self_describing: HashMap::new(),
            dialects: HashMap::new(),
            locked: false,
        }
    }
}

impl CodecRegistry {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn add_plugin<P: DialectPlugin>(&mut self, plugin: P) -> &mut Self {
        self.check_lock();
        plugin.build(self);
        self
    }

    /// Registers a node type that implements its own codec.
    pub fn register_self<T: RpcCodec + Tree>(&mut self) -> &mut Self {
        if let Err(error) = self.try_register_self::<T>() {
            panic!("{}", error);
        }
        self
    }

    pub fn register_codec<C: TreeCodec + 'static>(
        &mut self,
        dialect: &'static str,
        value_type: &str,
        codec: C,
    ) -> &mut Self {
        if let Err(error) = self.try_register_codec(dialect, value_type, Arc::new(codec)) {
            panic!("{}", error);
        }
        self
    }

    /// Registers one codec instance under several value types of a dialect.
    pub fn register_family(
        &mut self,
        dialect: &'static str,
        value_types: &[&str],
        codec: Arc<dyn TreeCodec>,
    ) -> &mut Self {
        for value_type in value_types {
            if let Err(error) = self.try_register_codec(dialect, value_type, codec.clone()) {
                panic!("{}", error);
            }
        }
        self
    }

    /// Declares the supertypes of `value_type` within a dialect, most
    /// specific first.
    pub fn declare_ancestry(
        &mut self,
        dialect: &'static str,
        value_type: &str,
        ancestors: &[&str],
    ) -> &mut Self {
        self.check_lock();
        self.insert_ancestry(dialect, value_type, ancestors);
        self
    }

    // Non-panicking builder methods

    pub fn try_add_plugin<P: DialectPlugin>(
        &mut self,
        plugin: P,
    ) -> Result<&mut Self, CodecError> {
        self.try_check_lock()?;
        plugin.build(self);
        Ok(self)
    }

    pub fn try_register_self<T: RpcCodec + Tree>(&mut self) -> Result<&mut Self, CodecError> {
        self.try_check_lock()?;
        if self.self_describing.contains_key(T::TYPE_NAME) {
            return Err(CodecError::DuplicateCodec {
                value_type: T::TYPE_NAME.to_string(),
                dialect: None,
            });
        }
        self.self_describing
            .insert(T::TYPE_NAME.to_string(), Arc::new(SelfCodec::<T>::new()));
        Ok(self)
    }

    pub fn try_register_codec(
        &mut self,
        dialect: &'static str,
        value_type: &str,
        codec: Arc<dyn TreeCodec>,
    ) -> Result<&mut Self, CodecError> {
        self.try_check_lock()?;
        let table = self.dialects.entry(dialect).or_default();
        if table.codecs.contains_key(value_type) {
            return Err(CodecError::DuplicateCodec {
                value_type: value_type.to_string(),
                dialect: Some(dialect),
            });
        }
        table.codecs.insert(value_type.to_string(), codec);
        Ok(self)
    }

    pub fn try_declare_ancestry(
        &mut self,
        dialect: &'static str,
        value_type: &str,
        ancestors: &[&str],
    ) -> Result<&mut Self, CodecError> {
        self.try_check_lock()?;
        self.insert_ancestry(dialect, value_type, ancestors);
        Ok(self)
    }

    pub fn lock(&mut self) {
        self.check_lock();
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn check_lock(&self) {
        if self.locked {
            panic!("CodecRegistry already locked!");
        }
    }

    pub fn try_check_lock(&self) -> Result<(), CodecError> {
        if self.locked {
            Err(CodecError::RegistryLocked)
        } else {
            Ok(())
        }
    }

    pub fn dialect(&self, name: &str) -> Option<&DialectCodecs> {
        self.dialects.get(name)
    }

    /// Picks the codec for `value_type`.
    ///
    /// Self-describing types win. Otherwise the table of `dialect` is walked
    /// from the exact type through its declared ancestry. With no dialect in
    /// effect every table is tried, in name order.
    pub fn resolve(
        &self,
        value_type: &str,
        dialect: Option<&'static str>,
    ) -> Result<ResolvedCodec, CodecError> {
        if let Some(codec) = self.self_describing.get(value_type) {
            return Ok(ResolvedCodec {
                codec: codec.clone(),
                dialect,
            });
        }

        match dialect {
            Some(dialect) => {
                if let Some(codec) = self
                    .dialects
                    .get(dialect)
                    .and_then(|table| table.resolve(value_type))
                {
                    return Ok(ResolvedCodec {
                        codec: codec.clone(),
                        dialect: Some(dialect),
                    });
                }
            }
            None => {
                let mut names: Vec<&'static str> = self.dialects.keys().copied().collect();
                names.sort_unstable();
                for name in names {
                    if let Some(codec) = self.dialects[name].resolve(value_type) {
                        return Ok(ResolvedCodec {
                            codec: codec.clone(),
                            dialect: Some(name),
                        });
                    }
                }
            }
        }

        Err(CodecError::UnknownType {
            value_type: value_type.to_string(),
            dialect,
        })
    }

    fn insert_ancestry(&mut self, dialect: &'static str, value_type: &str, ancestors: &[&str]) {
        self.dialects
            .entry(dialect)
            .or_default()
            .ancestry
            .insert(
                value_type.to_string(),
                ancestors.iter().map(|ancestor| ancestor.to_string()).collect(),
            );
    }
}
