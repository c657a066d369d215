//! Core types for the CAN codec compiler
//!
//! This module defines the error types raised while compiling a database,
//! the status errors returned by compiled codecs, and the value types that
//! flow through pack/unpack.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, CompileError>;

/// Top-level errors of a compilation run
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Failed to parse DBC file: {0}")]
    DbcParseError(String),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Fatal database errors found at compile time
///
/// Any of these suppresses output for the offending message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("{message}: multiple multiplexor signals ('{first}' and '{second}'), only one per CAN message is allowed")]
    DuplicateMultiplexor {
        message: String,
        first: String,
        second: String,
    },

    #[error("{message}: signal '{signal}' is multiplexed but the message has no multiplexor")]
    MissingMultiplexor { message: String, signal: String },

    #[error("{message}: multiplexor '{signal}' is itself multiplexed (nested multiplexing is not supported)")]
    NestedMultiplexor { message: String, signal: String },

    #[error("{message}: multiplexor '{signal}' cannot be a floating point signal")]
    FloatMultiplexor { message: String, signal: String },

    #[error("{message}: signal '{signal}' has invalid scaling factor {scaling}")]
    InvalidScaling {
        message: String,
        signal: String,
        scaling: f64,
    },

    #[error("{message}: signal '{signal}' is floating point but has length {bit_length} (must be 32 or 64)")]
    InvalidFloatLength {
        message: String,
        signal: String,
        bit_length: u16,
    },

    #[error("{message}: signal '{signal}' has a bit length of 0")]
    ZeroBitLength { message: String, signal: String },

    #[error("{message}: signal '{signal}' has bit length {bit_length} (maximum is 64)")]
    BitLengthTooLong {
        message: String,
        signal: String,
        bit_length: u16,
    },

    #[error("{message}: signal '{signal}' (start bit {start_bit}, length {bit_length}) does not fit in the frame")]
    SignalOutOfFrame {
        message: String,
        signal: String,
        start_bit: u16,
        bit_length: u16,
    },

    #[error("{message}: signals '{first}' and '{second}' occupy overlapping bits")]
    OverlappingSignals {
        message: String,
        first: String,
        second: String,
    },

    #[error("{message}: duplicate signal name '{signal}'")]
    DuplicateSignalName { message: String, signal: String },

    #[error("{message}: data length code {dlc} exceeds 8 bytes")]
    InvalidDlc { message: String, dlc: u8 },

    #[error("{message}: CAN ID 0x{id:X} does not fit in 29 bits")]
    InvalidMessageId { message: String, id: u32 },

    #[error("Duplicate message definition for CAN ID 0x{0:X}")]
    DuplicateMessageId(u32),
}

/// Status errors returned by compiled codecs at run time
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("Signal '{signal}' value {value} outside range [{minimum}, {maximum}]")]
    RangeViolation {
        signal: String,
        value: f64,
        minimum: f64,
        maximum: f64,
    },

    #[error("{message}: multiplexor value {value} selects no signal group")]
    MultiplexDispatchMiss { message: String, value: u64 },

    #[error("{message}: frame has {actual} bytes but DLC is {expected}")]
    FrameTooShort {
        message: String,
        expected: u8,
        actual: usize,
    },

    #[error("Message not found: CAN ID 0x{0:X}")]
    UnknownMessage(u32),

    #[error("Signal not found: {0}")]
    UnknownSignal(String),

    #[error("Record belongs to CAN ID 0x{actual:X}, expected 0x{expected:X}")]
    RecordMismatch { expected: u32, actual: u32 },
}

/// Natural container type of a signal's raw value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl StorageType {
    /// Narrowest container able to hold a raw value of `bit_length` bits
    pub fn for_signal(bit_length: u16, is_signed: bool, is_floating: bool) -> Self {
        if is_floating {
            return if bit_length == 64 {
                StorageType::F64
            } else {
                StorageType::F32
            };
        }
        match (container_width(bit_length), is_signed) {
            (8, false) => StorageType::U8,
            (16, false) => StorageType::U16,
            (32, false) => StorageType::U32,
            (_, false) => StorageType::U64,
            (8, true) => StorageType::I8,
            (16, true) => StorageType::I16,
            (32, true) => StorageType::I32,
            (_, true) => StorageType::I64,
        }
    }

    /// Width of the container in bits
    pub fn width(&self) -> u32 {
        match self {
            StorageType::U8 | StorageType::I8 => 8,
            StorageType::U16 | StorageType::I16 => 16,
            StorageType::U32 | StorageType::I32 | StorageType::F32 => 32,
            StorageType::U64 | StorageType::I64 | StorageType::F64 => 64,
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            StorageType::I8 | StorageType::I16 | StorageType::I32 | StorageType::I64
        )
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, StorageType::F32 | StorageType::F64)
    }

    /// Zero value of this container
    pub fn zero(&self) -> StorageValue {
        if self.is_floating() {
            StorageValue::Float(0.0)
        } else if self.is_signed() {
            StorageValue::Signed(0)
        } else {
            StorageValue::Unsigned(0)
        }
    }

    /// Narrow a raw value computed in floating point into this container
    ///
    /// Integer containers round to nearest and saturate at their bounds.
    pub fn narrow(&self, raw: f64) -> StorageValue {
        let rounded = raw.round();
        match self {
            StorageType::U8 => StorageValue::Unsigned(rounded as u8 as u64),
            StorageType::U16 => StorageValue::Unsigned(rounded as u16 as u64),
            StorageType::U32 => StorageValue::Unsigned(rounded as u32 as u64),
            StorageType::U64 => StorageValue::Unsigned(rounded as u64),
            StorageType::I8 => StorageValue::Signed(rounded as i8 as i64),
            StorageType::I16 => StorageValue::Signed(rounded as i16 as i64),
            StorageType::I32 => StorageValue::Signed(rounded as i32 as i64),
            StorageType::I64 => StorageValue::Signed(rounded as i64),
            StorageType::F32 => StorageValue::Float(raw as f32 as f64),
            StorageType::F64 => StorageValue::Float(raw),
        }
    }

    /// Reinterpret container bits (already sign-extended) as a signed value
    pub fn reinterpret_signed(&self, bits: u64) -> i64 {
        match self.width() {
            8 => bits as u8 as i8 as i64,
            16 => bits as u16 as i16 as i64,
            32 => bits as u32 as i32 as i64,
            _ => bits as i64,
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageType::U8 => "u8",
            StorageType::U16 => "u16",
            StorageType::U32 => "u32",
            StorageType::U64 => "u64",
            StorageType::I8 => "i8",
            StorageType::I16 => "i16",
            StorageType::I32 => "i32",
            StorageType::I64 => "i64",
            StorageType::F32 => "f32",
            StorageType::F64 => "f64",
        };
        write!(f, "{}", name)
    }
}

/// Container width (8/16/32/64) holding `bit_length` bits
pub fn container_width(bit_length: u16) -> u32 {
    match bit_length {
        0..=8 => 8,
        9..=16 => 16,
        17..=32 => 32,
        _ => 64,
    }
}

/// A raw value held in a message record field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StorageValue {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl StorageValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            StorageValue::Unsigned(v) => *v as f64,
            StorageValue::Signed(v) => *v as f64,
            StorageValue::Float(v) => *v,
        }
    }

    /// Two's-complement bit pattern of an integer value
    ///
    /// Floating values are converted with the codec's IEEE-754 routine by the
    /// caller, never through this method.
    pub fn integer_bits(&self) -> u64 {
        match self {
            StorageValue::Unsigned(v) => *v,
            StorageValue::Signed(v) => *v as u64,
            StorageValue::Float(v) => *v as i64 as u64,
        }
    }
}

impl fmt::Display for StorageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageValue::Unsigned(v) => write!(f, "{}", v),
            StorageValue::Signed(v) => write!(f, "{}", v),
            StorageValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// A decoded signal with its physical value
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSignal {
    /// Signal name
    pub name: String,
    /// Physical value (zero when `error` is set)
    pub value: f64,
    /// Raw value as held in the record
    pub raw: StorageValue,
    /// Engineering unit
    pub unit: Option<String>,
    /// Range violation reported by the decode call, if any
    pub error: Option<CodecError>,
}

impl DecodedSignal {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for DecodedSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {:.3}", self.name, self.value)?;
        if let Some(unit) = &self.unit {
            write!(f, " {}", unit)?;
        }
        write!(f, " (wire: {})", self.raw)?;
        if self.error.is_some() {
            write!(f, " [out of range]")?;
        }
        Ok(())
    }
}

/// All signals decoded from one frame
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    /// CAN message ID
    pub id: u32,
    /// Message name
    pub name: String,
    /// Unconditional signals followed by the active multiplexed group
    pub signals: Vec<DecodedSignal>,
    /// Multiplexor value read from the frame (if message is multiplexed)
    pub multiplexer_value: Option<u64>,
    /// Dispatch failure of the multiplexed group, if any
    pub multiplex_error: Option<CodecError>,
}

impl DecodedMessage {
    /// Look up a decoded signal by name
    pub fn signal(&self, name: &str) -> Option<&DecodedSignal> {
        self.signals.iter().find(|sig| sig.name == name)
    }
}
