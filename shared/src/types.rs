use std::fmt;

use treesync_serde::{BitReader, BitWrite, ConstBitLength, Serde, SerdeErr};
use uuid::Uuid;

/// Small integer assigned to a value that is deduplicated by identity.
pub type RefId = u32;

/// Stable identifier of a tree (usually a source file) shared by both peers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeId(Uuid);

impl TreeId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for TreeId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Debug for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TreeId({})", self.0)
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serde for TreeId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.as_u128().ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self::from_u128(u128::de(reader)?))
    }
}

impl ConstBitLength for TreeId {
    fn const_bit_length() -> u32 {
        <u128 as ConstBitLength>::const_bit_length()
    }
}
