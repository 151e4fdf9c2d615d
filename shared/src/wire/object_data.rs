use treesync_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedInteger};

use crate::{
    wire::{ProtocolError, Value},
    RefId,
};

/// The state transition a single wire unit describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    NoChange,
    Add,
    Delete,
    Change,
    EndOfObject,
    /// The sender failed to encode the rest of the value, carries the reason
    Error,
}

impl State {
    fn tag(&self) -> u8 {
        match self {
            State::NoChange => 0,
            State::Add => 1,
            State::Delete => 2,
            State::Change => 3,
            State::EndOfObject => 4,
            State::Error => 5,
        }
    }
}

impl Serde for State {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedInteger::<3>::new(self.tag()).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let tag: u8 = UnsignedInteger::<3>::de(reader)?.to()?;
        match tag {
            0 => Ok(State::NoChange),
            1 => Ok(State::Add),
            2 => Ok(State::Delete),
            3 => Ok(State::Change),
            4 => Ok(State::EndOfObject),
            5 => Ok(State::Error),
            _ => Err(SerdeErr::InvalidTag {
                what: "state",
                tag: tag as u64,
            }),
        }
    }
}

/// One unit of the edit script exchanged for a tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectData {
    pub state: State,
    /// Concrete type of the value, lets the receiver allocate the right shell
    pub value_type: Option<String>,
    /// Inline payload, present only for leaves
    pub value: Option<Value>,
    /// Dedup id of a value sent by reference
    pub reference: Option<RefId>,
}

impl ObjectData {
    fn bare(state: State) -> Self {
        Self {
            state,
            value_type: None,
            value: None,
            reference: None,
        }
    }

    pub fn no_change() -> Self {
        Self::bare(State::NoChange)
    }

    pub fn delete() -> Self {
        Self::bare(State::Delete)
    }

    pub fn end_of_object() -> Self {
        Self::bare(State::EndOfObject)
    }

    pub fn add(value_type: Option<String>, value: Option<Value>, reference: Option<RefId>) -> Self {
        Self {
            state: State::Add,
            value_type,
            value,
            reference,
        }
    }

    pub fn change(value: Option<Value>) -> Self {
        Self {
            state: State::Change,
            value_type: None,
            value,
            reference: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            state: State::Error,
            value_type: None,
            value: Some(Value::Str(message.into())),
            reference: None,
        }
    }

    /// Whether this unit ends a conversation.
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, State::EndOfObject | State::Error)
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        let invalid = |reason| {
            Err(ProtocolError::InvalidUnit {
                state: self.state,
                reason,
            })
        };

        match self.state {
            State::NoChange | State::Delete | State::EndOfObject => {
                if self.value.is_some() {
                    return invalid("must not carry a value");
                }
                if self.reference.is_some() {
                    return invalid("must not carry a reference");
                }
                if self.value_type.is_some() {
                    return invalid("must not carry a value type");
                }
            }
            State::Change => {
                if self.reference.is_some() {
                    return invalid("must not carry a reference");
                }
            }
            State::Add => {}
            State::Error => {
                if !matches!(self.value, Some(Value::Str(_))) {
                    return invalid("must carry the failure message");
                }
            }
        }
        Ok(())
    }
}

impl Serde for ObjectData {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.state.ser(writer);
        self.value_type.ser(writer);
        self.value.ser(writer);
        self.reference.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let state = State::de(reader)?;
        let value_type = Option::<String>::de(reader)?;
        let value = Option::<Value>::de(reader)?;
        let reference = Option::<RefId>::de(reader)?;
        Ok(Self {
            state,
            value_type,
            value,
            reference,
        })
    }
}
