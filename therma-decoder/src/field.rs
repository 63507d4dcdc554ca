//! Field decoders
//!
//! A field decoder turns a fixed-length slice of a response (one or two
//! bytes) into a typed value. Decoders are plain data so that tables can be
//! inspected, compared and validated without calling them.

use crate::modes::{IuOperationMode, OperationMode};
use crate::types::Value;
use byteorder::{BigEndian, ByteOrder as _, LittleEndian};
use std::fmt;

/// Byte order for word extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Low byte first
    LittleEndian,
    /// High byte first
    BigEndian,
}

/// Fixed-point word layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixedPoint {
    /// Big-endian signed word with an 8 bit binary fraction (value / 256)
    Binary,
    /// Signed integer part in the first byte; the second byte's decimal
    /// digits are the fraction, e.g. `[0x14, 25]` is 20.25
    LiteralFraction,
}

/// How to turn the bytes of one field into a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldDecoder {
    /// One bit (0 = least significant) of a byte, as a boolean
    Bit(u8),
    /// Unsigned byte divided by `divisor`
    Byte { divisor: u16 },
    /// Signed 16 bit word divided by `divisor`
    Word { divisor: u16, byte_order: ByteOrder },
    /// Signed fixed-point word
    FixedPointWord(FixedPoint),
    /// Byte indexing [`OperationMode`]
    OperationMode,
    /// Byte whose high nibble indexes [`IuOperationMode`]
    IuOperationMode,
    /// Unsigned byte where zero means "off" (no value)
    NonZeroByte,
}

impl FieldDecoder {
    pub const BYTE: FieldDecoder = FieldDecoder::Byte { divisor: 1 };
    pub const BYTE_10: FieldDecoder = FieldDecoder::Byte { divisor: 10 };
    pub const WORD: FieldDecoder = FieldDecoder::Word {
        divisor: 1,
        byte_order: ByteOrder::LittleEndian,
    };
    pub const WORD_10: FieldDecoder = FieldDecoder::Word {
        divisor: 10,
        byte_order: ByteOrder::LittleEndian,
    };
    pub const WORD_BE: FieldDecoder = FieldDecoder::Word {
        divisor: 1,
        byte_order: ByteOrder::BigEndian,
    };
    pub const WORD_FIXED_BE: FieldDecoder = FieldDecoder::FixedPointWord(FixedPoint::Binary);

    /// Number of response bytes this decoder consumes
    pub fn decode_len(&self) -> usize {
        match self {
            FieldDecoder::Bit(_)
            | FieldDecoder::Byte { .. }
            | FieldDecoder::OperationMode
            | FieldDecoder::IuOperationMode
            | FieldDecoder::NonZeroByte => 1,
            FieldDecoder::Word { .. } | FieldDecoder::FixedPointWord(_) => 2,
        }
    }

    /// The bit index, for bit decoders
    pub fn bit_index(&self) -> Option<u8> {
        match self {
            FieldDecoder::Bit(bit) => Some(*bit),
            _ => None,
        }
    }

    /// Decode a field
    ///
    /// Returns `None` when the slice length differs from [`decode_len`](Self::decode_len)
    /// (e.g. a short response) or when the raw value has no meaning (out of
    /// range mode index, zero for [`NonZeroByte`](Self::NonZeroByte)).
    pub fn decode(&self, bytes: &[u8]) -> Option<Value> {
        if bytes.len() != self.decode_len() {
            return None;
        }

        match *self {
            FieldDecoder::Bit(bit) => {
                if bit > 7 {
                    return None;
                }
                Some(Value::Boolean(bytes[0] & (1 << bit) != 0))
            }
            FieldDecoder::Byte { divisor } => scale(bytes[0] as i64, divisor),
            FieldDecoder::Word { divisor, byte_order } => {
                let raw = match byte_order {
                    ByteOrder::LittleEndian => LittleEndian::read_i16(bytes),
                    ByteOrder::BigEndian => BigEndian::read_i16(bytes),
                };
                scale(raw as i64, divisor)
            }
            FieldDecoder::FixedPointWord(FixedPoint::Binary) => {
                Some(Value::Float(BigEndian::read_i16(bytes) as f64 / 256.0))
            }
            FieldDecoder::FixedPointWord(FixedPoint::LiteralFraction) => {
                Some(Value::Float(literal_fraction(bytes[0] as i8, bytes[1])))
            }
            FieldDecoder::OperationMode => {
                OperationMode::from_byte(bytes[0]).map(Value::OperationMode)
            }
            FieldDecoder::IuOperationMode => {
                IuOperationMode::from_byte(bytes[0]).map(Value::IuOperationMode)
            }
            FieldDecoder::NonZeroByte => match bytes[0] {
                0 => None,
                b => Some(Value::Integer(b as i64)),
            },
        }
    }
}

fn scale(raw: i64, divisor: u16) -> Option<Value> {
    match divisor {
        0 => None,
        1 => Some(Value::Integer(raw)),
        d => Some(Value::Float(raw as f64 / d as f64)),
    }
}

fn literal_fraction(integer: i8, fraction: u8) -> f64 {
    let mut scale = 10.0;
    let mut rest = fraction / 10;
    while rest > 0 {
        scale *= 10.0;
        rest /= 10;
    }

    let magnitude = (integer as f64).abs() + fraction as f64 / scale;
    if integer < 0 {
        -magnitude
    } else {
        magnitude
    }
}

impl fmt::Display for FieldDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDecoder::Bit(bit) => write!(f, "bit {}", bit),
            FieldDecoder::Byte { divisor: 1 } => write!(f, "byte"),
            FieldDecoder::Byte { divisor } => write!(f, "byte/{}", divisor),
            FieldDecoder::Word { divisor, byte_order } => {
                let order = match byte_order {
                    ByteOrder::LittleEndian => "le",
                    ByteOrder::BigEndian => "be",
                };
                if *divisor == 1 {
                    write!(f, "word {}", order)
                } else {
                    write!(f, "word {}/{}", order, divisor)
                }
            }
            FieldDecoder::FixedPointWord(FixedPoint::Binary) => write!(f, "fixed be/256"),
            FieldDecoder::FixedPointWord(FixedPoint::LiteralFraction) => {
                write!(f, "fixed literal")
            }
            FieldDecoder::OperationMode => write!(f, "operation mode"),
            FieldDecoder::IuOperationMode => write!(f, "i/u operation mode"),
            FieldDecoder::NonZeroByte => write!(f, "byte (0 = off)"),
        }
    }
}
