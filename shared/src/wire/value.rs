use treesync_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedInteger};

use crate::TreeId;

/// Position sent for a list element that has no counterpart in the before list.
pub const APPENDED: i32 = -1;

/// Inline payload of a wire unit. Only leaves travel inline, nested values are
/// described by the units that follow.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Id(TreeId),
    /// Before-list index of each after element, `APPENDED` for new elements
    Positions(Vec<i32>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Id(_) => "id",
            Value::Positions(_) => "positions",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(value) => Some(value),
            _ => None,
        }
    }

    fn tag(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Int(_) => 1,
            Value::Float(_) => 2,
            Value::Str(_) => 3,
            Value::Id(_) => 4,
            Value::Positions(_) => 5,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl Serde for Value {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedInteger::<3>::new(self.tag()).ser(writer);
        match self {
            Value::Bool(value) => value.ser(writer),
            Value::Int(value) => value.ser(writer),
            Value::Float(value) => value.ser(writer),
            Value::Str(value) => value.ser(writer),
            Value::Id(value) => value.ser(writer),
            Value::Positions(value) => value.ser(writer),
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let tag: u8 = UnsignedInteger::<3>::de(reader)?.to()?;
        match tag {
            0 => Ok(Value::Bool(bool::de(reader)?)),
            1 => Ok(Value::Int(i64::de(reader)?)),
            2 => Ok(Value::Float(f64::de(reader)?)),
            3 => Ok(Value::Str(String::de(reader)?)),
            4 => Ok(Value::Id(TreeId::de(reader)?)),
            5 => Ok(Value::Positions(Vec::<i32>::de(reader)?)),
            _ => Err(SerdeErr::InvalidTag {
                what: "value",
                tag: tag as u64,
            }),
        }
    }
}
