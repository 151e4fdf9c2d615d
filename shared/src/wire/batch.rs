use treesync_serde::{BitReader, BitWriter, Serde};

use crate::wire::{ObjectData, ProtocolError};

/// A bounded group of units sent together to amortize round trips.
pub type Batch = Vec<ObjectData>;

pub fn encode_batch(batch: &[ObjectData]) -> Vec<u8> {
    let mut writer = BitWriter::with_capacity(batch.len() * 4);
    batch.len().ser(&mut writer);
    for unit in batch {
        unit.ser(&mut writer);
    }
    writer.to_bytes()
}

/// Reads a batch written by `encode_batch`, validating every unit.
pub fn decode_batch(bytes: &[u8]) -> Result<Batch, ProtocolError> {
    let mut reader = BitReader::new(bytes);
    let length = usize::de(&mut reader)?;

    let mut batch = Vec::with_capacity(length.min(bytes.len()));
    for _ in 0..length {
        let unit = ObjectData::de(&mut reader)?;
        unit.validate()?;
        batch.push(unit);
    }
    Ok(batch)
}
