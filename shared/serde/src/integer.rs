use crate::{BitReader, BitWrite, ConstBitLength, Serde, SerdeErr};

pub type UnsignedInteger<const BITS: u8> = SerdeInteger<false, false, BITS>;
pub type SignedInteger<const BITS: u8> = SerdeInteger<true, false, BITS>;
pub type UnsignedVariableInteger<const BITS: u8> = SerdeInteger<false, true, BITS>;
pub type SignedVariableInteger<const BITS: u8> = SerdeInteger<true, true, BITS>;

// This outer generic type wraps an inner type that is not generic, to reduce code bloat
// through monomorphization.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SerdeInteger<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> {
    inner: SerdeIntegerInner,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
struct SerdeIntegerInner {
    value: i128,
    signed: bool,
    variable: bool,
    bits: u8,
}

impl SerdeIntegerInner {
    fn check(signed: bool, variable: bool, bits: u8, value: i128) -> Result<(), SerdeErr> {
        if !signed && value < 0 {
            return Err(SerdeErr::OutOfRange {
                value,
                what: "unsigned integer",
            });
        }
        if !variable {
            // magnitude must fit in `bits`, the sign travels separately
            let max_value: u128 = 1_u128 << bits;
            if value.unsigned_abs() >= max_value {
                return Err(SerdeErr::OutOfRange {
                    value,
                    what: "fixed-width integer",
                });
            }
        }
        Ok(())
    }

    fn ser(&self, writer: &mut dyn BitWrite) {
        let mut magnitude = self.value.unsigned_abs();

        if self.signed {
            writer.write_bit(self.value < 0);
        }

        if self.variable {
            loop {
                let proceed = magnitude >= (1_u128 << self.bits);
                writer.write_bit(proceed);
                for _ in 0..self.bits {
                    writer.write_bit(magnitude & 1 != 0);
                    magnitude >>= 1;
                }
                if !proceed {
                    return;
                }
            }
        } else {
            for _ in 0..self.bits {
                writer.write_bit(magnitude & 1 != 0);
                magnitude >>= 1;
            }
        }
    }

    fn de(
        reader: &mut BitReader,
        signed: bool,
        variable: bool,
        bits: u8,
    ) -> Result<Self, SerdeErr> {
        let negative = if signed { reader.read_bit()? } else { false };

        let mut magnitude: u128 = 0;
        let mut shift: u32 = 0;

        if variable {
            loop {
                let proceed = reader.read_bit()?;
                for _ in 0..bits {
                    if reader.read_bit()? {
                        if shift >= 127 {
                            return Err(SerdeErr::VariableOverflow);
                        }
                        magnitude |= 1 << shift;
                    }
                    shift += 1;
                }
                if !proceed {
                    break;
                }
                if shift >= 127 {
                    return Err(SerdeErr::VariableOverflow);
                }
            }
        } else {
            for _ in 0..bits {
                if reader.read_bit()? {
                    magnitude |= 1 << shift;
                }
                shift += 1;
            }
        }

        let value = magnitude as i128;
        Ok(Self {
            value: if negative { -value } else { value },
            signed,
            variable,
            bits,
        })
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8>
    SerdeInteger<SIGNED, VARIABLE, BITS>
{
    /// # Panics
    ///
    /// Panics if the value cannot be represented, use `try_new` for untrusted input.
    pub fn new<T: Into<i128>>(value: T) -> Self {
        match Self::try_new(value) {
            Ok(integer) => integer,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_new<T: Into<i128>>(value: T) -> Result<Self, SerdeErr> {
        let value = value.into();
        SerdeIntegerInner::check(SIGNED, VARIABLE, BITS, value)?;
        Ok(Self {
            inner: SerdeIntegerInner {
                value,
                signed: SIGNED,
                variable: VARIABLE,
                bits: BITS,
            },
        })
    }

    pub fn get(&self) -> i128 {
        self.inner.value
    }

    /// Converts into a narrower integer type, failing when out of range.
    pub fn to<T: TryFrom<i128>>(&self) -> Result<T, SerdeErr> {
        T::try_from(self.inner.value).map_err(|_| SerdeErr::OutOfRange {
            value: self.inner.value,
            what: std::any::type_name::<T>(),
        })
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> Serde
    for SerdeInteger<SIGNED, VARIABLE, BITS>
{
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.inner.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let inner = SerdeIntegerInner::de(reader, SIGNED, VARIABLE, BITS)?;
        Ok(Self { inner })
    }
}

impl<const SIGNED: bool, const BITS: u8> ConstBitLength for SerdeInteger<SIGNED, false, BITS> {
    fn const_bit_length() -> u32 {
        let mut output: u32 = 0;
        if SIGNED {
            output += 1;
        }
        output + BITS as u32
    }
}

// Tests
