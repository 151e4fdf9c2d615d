use std::{any::type_name, collections::VecDeque, mem, sync::Mutex};

use log::trace;

use crate::{
    codec::{CodecRegistry, Transmit},
    registry::{IdentityRegistry, Referenceable},
    wire::{Batch, ObjectData, ProtocolError, State, Value, APPENDED},
    RefId, SyncError,
};

/// Reconstruct/decode engine: rebuilds values from the units of one tree
/// conversation.
///
/// Batches are pulled lazily, one at a time: a new batch is only requested
/// once every unit of the previous one has been consumed.
pub struct ReceiveQueue<'a> {
    units: VecDeque<ObjectData>,
    pull: Box<dyn FnMut() -> Result<Batch, SyncError> + 'a>,
    refs: &'a Mutex<IdentityRegistry>,
    codecs: &'a CodecRegistry,
    dialect: Option<&'static str>,
    trace_units: bool,
}

impl<'a> ReceiveQueue<'a> {
    pub fn new(
        refs: &'a Mutex<IdentityRegistry>,
        codecs: &'a CodecRegistry,
        pull: impl FnMut() -> Result<Batch, SyncError> + 'a,
    ) -> Self {
        Self {
            units: VecDeque::new(),
            pull: Box::new(pull),
            refs,
            codecs,
            dialect: None,
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

    /// Units of the current batch not consumed yet.
    pub fn buffered(&self) -> usize {
        self.units.len()
    }

    /// Takes the next unit, pulling a new batch when the current one is spent.
    ///
    /// An `Error` unit ends the conversation with `SyncError::RemoteEncode`.
    pub fn take(&mut self) -> Result<ObjectData, SyncError> {
        if self.units.is_empty() {
            let batch = (self.pull)()?;
            if batch.is_empty() {
                return Err(ProtocolError::EmptyBatch.into());
            }
            self.units.extend(batch);
        }

        let unit = self.units.pop_front().ok_or(ProtocolError::EmptyBatch)?;
        if self.trace_units {
            trace!("receive {:?}", unit);
        }

        if unit.state == State::Error {
            let message = unit
                .value
                .as_ref()
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(SyncError::RemoteEncode { message });
        }
        Ok(unit)
    }

    pub fn receive<T: Transmit>(&mut self, before: Option<&T>) -> Result<Option<T>, SyncError> {
        let unit = self.take()?;
        self.decode(unit, before)
    }

    /// Receives a value sent with `send_ref`.
    ///
    /// A ref-only ADD resolves to the instance registered under that ref. An
    /// ADD carrying the value is decoded, then registered under its ref.
    pub fn receive_ref<T: Transmit + Referenceable>(
        &mut self,
        before: Option<&T>,
    ) -> Result<Option<T>, SyncError> {
        let unit = self.take()?;
        let reference = match (unit.state, unit.reference) {
            (State::Add, Some(reference)) => reference,
            _ => return self.decode(unit, before),
        };

        if unit.value_type.is_none() && unit.value.is_none() {
            return self.cached::<T>(reference).map(Some);
        }

        let value: T = self.decode_value(unit, None)?;
        let mut refs = self.refs.lock().map_err(SyncError::poisoned("remote refs"))?;
        // the same value may already have arrived through another conversation
        if let Some(cached) = refs.get::<T>(reference) {
            return Ok(Some(cached));
        }
        refs.store(&value, Some(reference));
        Ok(Some(value))
    }

    pub fn receive_list<T: Transmit>(
        &mut self,
        before: Option<&[T]>,
    ) -> Result<Option<Vec<T>>, SyncError> {
        let unit = self.take()?;
        let (positions, before) = match unit.state {
            State::NoChange => return Ok(before.map(<[T]>::to_vec)),
            State::Delete => return Ok(None),
            State::Add => {
                let positions = self.take()?;
                if positions.state != State::Change {
                    return Err(ProtocolError::UnexpectedState {
                        expected: "list positions CHANGE",
                        found: positions.state,
                    }
                    .into());
                }
                (Self::positions(positions)?, None)
            }
            State::Change => (Self::positions(unit)?, before),
            State::EndOfObject | State::Error => {
                return Err(ProtocolError::UnexpectedEndOfObject.into())
            }
        };

        let before = before.unwrap_or(&[]);
        let mut after = Vec::with_capacity(positions.len());
        for position in positions {
            let element_before = match position {
                APPENDED => None,
                position if position >= 0 => Some(before.get(position as usize).ok_or(
                    ProtocolError::PositionOutOfRange {
                        position,
                        len: before.len(),
                    },
                )?),
                position => {
                    return Err(ProtocolError::PositionOutOfRange {
                        position,
                        len: before.len(),
                    }
                    .into())
                }
            };
            match self.receive(element_before)? {
                Some(element) => after.push(element),
                None => {
                    return Err(ProtocolError::UnexpectedState {
                        expected: "list element",
                        found: State::Delete,
                    }
                    .into())
                }
            }
        }
        Ok(Some(after))
    }

    // Draft helpers: receive a field in place, using its staged value as before

    pub fn receive_into<T: Transmit>(&mut self, field: &mut Option<T>) -> Result<(), SyncError> {
        *field = self.receive(field.as_ref())?;
        Ok(())
    }

    pub fn receive_ref_into<T: Transmit + Referenceable>(
        &mut self,
        field: &mut Option<T>,
    ) -> Result<(), SyncError> {
        *field = self.receive_ref(field.as_ref())?;
        Ok(())
    }

    pub fn receive_list_into<T: Transmit>(
        &mut self,
        field: &mut Option<Vec<T>>,
    ) -> Result<(), SyncError> {
        *field = self.receive_list(field.as_deref())?;
        Ok(())
    }

    fn decode<T: Transmit>(
        &mut self,
        unit: ObjectData,
        before: Option<&T>,
    ) -> Result<Option<T>, SyncError> {
        match unit.state {
            State::NoChange => Ok(before.cloned()),
            State::Delete => Ok(None),
            State::Add => self.decode_value(unit, None).map(Some),
            State::Change => self.decode_value(unit, before).map(Some),
            State::EndOfObject | State::Error => Err(ProtocolError::UnexpectedEndOfObject.into()),
        }
    }

    fn decode_value<T: Transmit>(
        &mut self,
        unit: ObjectData,
        before: Option<&T>,
    ) -> Result<T, SyncError> {
        match unit.value {
            Some(value) => T::from_value(value),
            None => T::receive_fields(before, unit.value_type.as_deref(), self),
        }
    }

    fn cached<T: Referenceable>(&self, reference: RefId) -> Result<T, SyncError> {
        let refs = self.refs.lock().map_err(SyncError::poisoned("remote refs"))?;
        match refs.get::<T>(reference) {
            Some(value) => Ok(value),
            None if refs.contains_id(reference) => Err(ProtocolError::RefTypeMismatch {
                reference,
                expected: type_name::<T>(),
            }
            .into()),
            None => Err(ProtocolError::UnknownRef { reference }.into()),
        }
    }

    fn positions(unit: ObjectData) -> Result<Vec<i32>, ProtocolError> {
        match unit.value {
            Some(Value::Positions(positions)) => Ok(positions),
            _ => Err(ProtocolError::MissingPositions),
        }
    }
}
