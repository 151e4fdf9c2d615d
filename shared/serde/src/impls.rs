use crate::{
    BitReader, BitWrite, ConstBitLength, Serde, SerdeErr, SignedVariableInteger,
    UnsignedVariableInteger,
};

// Unit

impl Serde for () {
    fn ser(&self, _: &mut dyn BitWrite) {}

    fn de(_: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(())
    }
}

// Boolean

impl Serde for bool {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_bit(*self);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        reader.read_bit()
    }
}

impl ConstBitLength for bool {
    fn const_bit_length() -> u32 {
        1
    }
}

// Raw byte

impl Serde for u8 {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_byte(*self);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        reader.read_byte()
    }
}

impl ConstBitLength for u8 {
    fn const_bit_length() -> u32 {
        8
    }
}

// Variable-width integers. Most values on the wire (ids, lengths, positions)
// are small, so 7-bit groups keep them to a byte.

macro_rules! impl_unsigned_variable {
    ($($t:ty),*) => {$(
        impl Serde for $t {
            fn ser(&self, writer: &mut dyn BitWrite) {
                UnsignedVariableInteger::<7>::new(*self).ser(writer);
            }

            fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
                UnsignedVariableInteger::<7>::de(reader)?.to()
            }
        }
    )*};
}

macro_rules! impl_signed_variable {
    ($($t:ty),*) => {$(
        impl Serde for $t {
            fn ser(&self, writer: &mut dyn BitWrite) {
                SignedVariableInteger::<7>::new(*self).ser(writer);
            }

            fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
                SignedVariableInteger::<7>::de(reader)?.to()
            }
        }
    )*};
}

impl_unsigned_variable!(u16, u32, u64);
impl_signed_variable!(i16, i32, i64);

impl Serde for usize {
    fn ser(&self, writer: &mut dyn BitWrite) {
        (*self as u64).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let value = u64::de(reader)?;
        usize::try_from(value).map_err(|_| SerdeErr::OutOfRange {
            value: value as i128,
            what: "usize",
        })
    }
}

// Fixed 128-bit values (uuids), written as raw bytes

impl Serde for u128 {
    fn ser(&self, writer: &mut dyn BitWrite) {
        for byte in self.to_le_bytes() {
            writer.write_byte(byte);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let mut bytes = [0u8; 16];
        for byte in bytes.iter_mut() {
            *byte = reader.read_byte()?;
        }
        Ok(u128::from_le_bytes(bytes))
    }
}

impl ConstBitLength for u128 {
    fn const_bit_length() -> u32 {
        128
    }
}

// Floats travel as their IEEE-754 bit pattern so they round-trip exactly

impl Serde for f64 {
    fn ser(&self, writer: &mut dyn BitWrite) {
        for byte in self.to_bits().to_le_bytes() {
            writer.write_byte(byte);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let mut bytes = [0u8; 8];
        for byte in bytes.iter_mut() {
            *byte = reader.read_byte()?;
        }
        Ok(f64::from_bits(u64::from_le_bytes(bytes)))
    }
}

// Strings

impl Serde for String {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.len().ser(writer);
        for byte in self.as_bytes() {
            writer.write_byte(*byte);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let length = usize::de(reader)?;
        if length > reader.bits_remaining() / 8 {
            return Err(SerdeErr::UnexpectedEnd {
                bits_read: reader.bits_read(),
            });
        }
        let mut bytes = Vec::with_capacity(length);
        for _ in 0..length {
            bytes.push(reader.read_byte()?);
        }
        String::from_utf8(bytes).map_err(|_| SerdeErr::InvalidUtf8)
    }
}

// Containers

impl<T: Serde> Serde for Option<T> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            Some(value) => {
                writer.write_bit(true);
                value.ser(writer);
            }
            None => writer.write_bit(false),
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            Ok(Some(T::de(reader)?))
        } else {
            Ok(None)
        }
    }
}

impl<T: Serde> Serde for Vec<T> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.len().ser(writer);
        for item in self {
            item.ser(writer);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let length = usize::de(reader)?;
        // every element costs at least one bit, anything longer is garbage
        if length > reader.bits_remaining() {
            return Err(SerdeErr::UnexpectedEnd {
                bits_read: reader.bits_read(),
            });
        }
        let mut output = Vec::with_capacity(length);
        for _ in 0..length {
            output.push(T::de(reader)?);
        }
        Ok(output)
    }
}
