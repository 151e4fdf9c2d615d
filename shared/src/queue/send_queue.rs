use std::{
    any::Any,
    collections::{HashMap, HashSet},
    hash::Hash,
    mem,
    sync::{Arc, Mutex},
};

use log::trace;

use crate::{
    codec::{CodecRegistry, Transmit},
    registry::{IdentityRegistry, Referenceable},
    wire::{Batch, ObjectData, Value, APPENDED},
    RefId, SyncError,
};

/// Diff/encode engine: walks an after value against its before value and
/// emits the minimal sequence of units describing the difference.
///
/// Units accumulate into a batch that is handed to `drain` every
/// `batch_size` units, and once more on `flush`.
///
/// The before context of nested field sends lives in a single slot that is
/// swapped in around each nested value and restored afterwards; one queue
/// walks one tree on one thread.
pub struct SendQueue<'a> {
    batch: Batch,
    batch_size: usize,
    drain: Box<dyn FnMut(Batch) -> Result<(), SyncError> + 'a>,
    refs: &'a Mutex<IdentityRegistry>,
    codecs: &'a CodecRegistry,
    before: Option<Arc<dyn Any + Send + Sync>>,
    dialect: Option<&'static str>,
    introduced: HashSet<RefId>,
    trace_units: bool,
}

impl<'a> SendQueue<'a> {
    pub fn new(
        batch_size: usize,
        refs: &'a Mutex<IdentityRegistry>,
        codecs: &'a CodecRegistry,
        drain: impl FnMut(Batch) -> Result<(), SyncError> + 'a,
    ) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch: Vec::with_capacity(batch_size),
            batch_size,
            drain: Box::new(drain),
            refs,
            codecs,
            before: None,
            dialect: None,
            introduced: HashSet::new(),
            trace_units: false,
        }
    }

    pub fn trace_units(mut self, enabled: bool) -> Self {
        self.trace_units = enabled;
        self
    }

    pub fn codecs(&self) -> &'a CodecRegistry {
        self.codecs
    }

    pub fn dialect(&self) -> Option<&'static str> {
        self.dialect
    }

    /// Runs `f` with `dialect` as the dialect in effect for nested values.
    pub fn in_dialect<R>(
        &mut self,
        dialect: Option<&'static str>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let saved = mem::replace(&mut self.dialect, dialect);
        let result = f(self);
        self.dialect = saved;
        result
    }

    /// Ref ids first transmitted with their value by this queue.
    pub fn introduced(&self) -> Vec<RefId> {
        let mut introduced: Vec<RefId> = self.introduced.iter().copied().collect();
        introduced.sort_unstable();
        introduced
    }

    pub fn put(&mut self, unit: ObjectData) -> Result<(), SyncError> {
        if self.trace_units {
            trace!("send {:?}", unit);
        }
        self.batch.push(unit);
        if self.batch.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), SyncError> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let batch = mem::replace(&mut self.batch, Vec::with_capacity(self.batch_size));
        (self.drain)(batch)
    }

    pub fn send<T: Transmit>(
        &mut self,
        after: Option<&T>,
        before: Option<&T>,
    ) -> Result<(), SyncError> {
        match (after, before) {
            (None, None) => self.put(ObjectData::no_change()),
            (None, Some(_)) => self.put(ObjectData::delete()),
            (Some(after), Some(before)) if after.same(before) => self.put(ObjectData::no_change()),
            (Some(after), Some(before)) if after.value_type() == before.value_type() => {
                self.send_change(after, before)
            }
            (Some(after), _) => self.send_add(after, None),
        }
    }

    /// Sends a shared value by identity.
    ///
    /// The first transmission carries the value and a fresh ref id; any later
    /// occurrence the peer is known to hold is sent as the ref alone.
    pub fn send_ref<T: Transmit + Referenceable>(
        &mut self,
        after: Option<&T>,
        before: Option<&T>,
    ) -> Result<(), SyncError> {
        let after = match (after, before) {
            (None, None) => return self.put(ObjectData::no_change()),
            (None, Some(_)) => return self.put(ObjectData::delete()),
            (Some(after), Some(before)) if after.same(before) => {
                return self.put(ObjectData::no_change())
            }
            (Some(after), _) => after,
        };

        if let Some(reference) = self.known_ref(after)? {
            return self.put(ObjectData::add(None, None, Some(reference)));
        }

        match before {
            Some(before) if after.value_type() == before.value_type() => {
                self.send_change(after, before)
            }
            _ => {
                let reference = self.introduce(after)?;
                self.send_add(after, Some(reference))
            }
        }
    }

    /// Sends a list, pairing after elements with before elements by `id`.
    pub fn send_list<T, K, F>(
        &mut self,
        after: Option<&[T]>,
        before: Option<&[T]>,
        id: F,
    ) -> Result<(), SyncError>
    where
        T: Transmit,
        K: Eq + Hash,
        F: Fn(&T) -> K,
    {
        let (after, before) = match (after, before) {
            (None, None) => return self.put(ObjectData::no_change()),
            (None, Some(_)) => return self.put(ObjectData::delete()),
            (Some(after), None) => {
                self.put(ObjectData::add(None, None, None))?;
                self.put(ObjectData::change(Some(Value::Positions(vec![
                    APPENDED;
                    after.len()
                ]))))?;
                for element in after {
                    self.send(Some(element), None)?;
                }
                return Ok(());
            }
            (Some(after), Some(before)) => (after, before),
        };

        if after.len() == before.len()
            && after.iter().zip(before).all(|(after, before)| after.same(before))
        {
            return self.put(ObjectData::no_change());
        }

        // first occurrence wins
        let mut index: HashMap<K, usize> = HashMap::with_capacity(before.len());
        for (position, element) in before.iter().enumerate() {
            index.entry(id(element)).or_insert(position);
        }
        let positions: Vec<Option<usize>> = after
            .iter()
            .map(|element| index.get(&id(element)).copied())
            .collect();

        self.put(ObjectData::change(Some(Value::Positions(
            positions
                .iter()
                .map(|position| position.map(|position| position as i32).unwrap_or(APPENDED))
                .collect(),
        ))))?;

        for (element, position) in after.iter().zip(positions) {
            self.send(Some(element), position.map(|position| &before[position]))?;
        }
        Ok(())
    }

    /// Sends the field `get` selects, diffed against the same field of the
    /// before parent.
    pub fn get_and_send<P: Any, T: Transmit>(
        &mut self,
        after: &P,
        get: impl Fn(&P) -> &T,
    ) -> Result<(), SyncError> {
        let parent = self.before.clone();
        let before = parent
            .as_deref()
            .and_then(|parent| parent.downcast_ref::<P>())
            .map(&get);
        self.send(Some(get(after)), before)
    }

    pub fn get_and_send_opt<P: Any, T: Transmit>(
        &mut self,
        after: &P,
        get: impl Fn(&P) -> Option<&T>,
    ) -> Result<(), SyncError> {
        let parent = self.before.clone();
        let before = parent
            .as_deref()
            .and_then(|parent| parent.downcast_ref::<P>())
            .and_then(&get);
        self.send(get(after), before)
    }

    pub fn get_and_send_ref<P: Any, T: Transmit + Referenceable>(
        &mut self,
        after: &P,
        get: impl Fn(&P) -> Option<&T>,
    ) -> Result<(), SyncError> {
        let parent = self.before.clone();
        let before = parent
            .as_deref()
            .and_then(|parent| parent.downcast_ref::<P>())
            .and_then(&get);
        self.send_ref(get(after), before)
    }

    pub fn get_and_send_list<P: Any, T: Transmit, K: Eq + Hash>(
        &mut self,
        after: &P,
        get: impl Fn(&P) -> &Vec<T>,
        id: impl Fn(&T) -> K,
    ) -> Result<(), SyncError> {
        let parent = self.before.clone();
        let before = parent
            .as_deref()
            .and_then(|parent| parent.downcast_ref::<P>())
            .map(|parent| get(parent).as_slice());
        self.send_list(Some(get(after).as_slice()), before, id)
    }

    fn send_add<T: Transmit>(
        &mut self,
        after: &T,
        reference: Option<RefId>,
    ) -> Result<(), SyncError> {
        let value = after.to_value();
        let nested = value.is_none();
        self.put(ObjectData::add(
            after.value_type().map(str::to_string),
            value,
            reference,
        ))?;
        if nested {
            self.send_nested(after, None)
        } else {
            Ok(())
        }
    }

    fn send_change<T: Transmit>(&mut self, after: &T, before: &T) -> Result<(), SyncError> {
        match after.to_value() {
            Some(value) => self.put(ObjectData::change(Some(value))),
            None => {
                self.put(ObjectData::change(None))?;
                self.send_nested(after, Some(before))
            }
        }
    }

    fn send_nested<T: Transmit>(&mut self, after: &T, before: Option<&T>) -> Result<(), SyncError> {
        let parent = before.and_then(Transmit::as_parent);
        let saved = mem::replace(&mut self.before, parent);
        let result = after.send_fields(self);
        self.before = saved;
        result
    }

    /// A ref id the peer already holds, or will have received by the time it
    /// reads this unit.
    fn known_ref<T: Referenceable>(&self, value: &T) -> Result<Option<RefId>, SyncError> {
        let refs = self.refs.lock().map_err(SyncError::poisoned("local refs"))?;
        Ok(refs.get_id(value).filter(|reference| {
            refs.is_committed(*reference) || self.introduced.contains(reference)
        }))
    }

    fn introduce<T: Referenceable>(&mut self, value: &T) -> Result<RefId, SyncError> {
        let reference = self
            .refs
            .lock()
            .map_err(SyncError::poisoned("local refs"))?
            .store(value, None);
        self.introduced.insert(reference);
        Ok(reference)
    }
}
