use crate::{BitCounter, BitReader, BitWrite, SerdeErr};

/// A type that can be written to and read from a bit stream.
pub trait Serde: Sized + Clone + PartialEq {
    /// Writes the value
    fn ser(&self, writer: &mut dyn BitWrite);

    /// Reads a value previously written by `ser`
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr>;

    /// Number of bits `ser` will write
    fn bit_length(&self) -> u32 {
        let mut counter = BitCounter::new();
        self.ser(&mut counter);
        counter.bits()
    }
}

/// Implemented by values whose encoding always has the same length.
pub trait ConstBitLength {
    fn const_bit_length() -> u32;
}
