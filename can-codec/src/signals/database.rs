//! Bus database model
//!
//! Passive records handed over by the database parser. Messages and signals
//! are read-only after the one-time layout sort performed by the compiler.

use serde::{Deserialize, Serialize};

/// Bit numbering convention of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    /// Little-endian (Intel format): start bit is the LSB, natural byte order
    Intel,
    /// Big-endian (Motorola format): start bit is the MSB, byte-reversed numbering
    Motorola,
}

/// A CAN signal definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Signal name (also the struct field name)
    pub name: String,
    /// Start bit as declared in the database
    pub start_bit: u16,
    /// Length in bits (1-64)
    pub bit_length: u16,
    /// Bit numbering convention
    pub endianness: Endianness,
    /// Two's-complement signed raw value
    pub is_signed: bool,
    /// IEEE-754 raw value (requires 32 or 64 bits)
    pub is_floating: bool,
    /// Scale factor to convert raw value to physical value
    pub scaling: f64,
    /// Offset to add after scaling
    pub offset: f64,
    /// Minimum physical value
    pub minimum: f64,
    /// Maximum physical value (equal to `minimum` disables range checks)
    pub maximum: f64,
    /// Engineering unit (e.g., "km/h", "V")
    pub units: Option<String>,
    /// True if this signal selects the active multiplexed group
    pub is_multiplexor: bool,
    /// Multiplexor value for which this signal is present (None if not multiplexed)
    pub switch_value: Option<u64>,
}

impl Signal {
    /// Create an unsigned, unscaled intel signal without range limits
    pub fn new(name: impl Into<String>, start_bit: u16, bit_length: u16) -> Self {
        Self {
            name: name.into(),
            start_bit,
            bit_length,
            endianness: Endianness::Intel,
            is_signed: false,
            is_floating: false,
            scaling: 1.0,
            offset: 0.0,
            minimum: 0.0,
            maximum: 0.0,
            units: None,
            is_multiplexor: false,
            switch_value: None,
        }
    }

    /// Builder method: set the bit numbering convention
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Builder method: mark as signed
    pub fn signed(mut self) -> Self {
        self.is_signed = true;
        self
    }

    /// Builder method: mark as IEEE-754 floating point
    pub fn floating(mut self) -> Self {
        self.is_floating = true;
        self
    }

    /// Builder method: set scale factor and offset
    pub fn with_scaling(mut self, scaling: f64, offset: f64) -> Self {
        self.scaling = scaling;
        self.offset = offset;
        self
    }

    /// Builder method: set physical range
    pub fn with_range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    /// Builder method: set engineering unit
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// Builder method: mark as the message multiplexor
    pub fn multiplexor(mut self) -> Self {
        self.is_multiplexor = true;
        self
    }

    /// Builder method: mark as multiplexed under `switch_value`
    pub fn multiplexed(mut self, switch_value: u64) -> Self {
        self.switch_value = Some(switch_value);
        self
    }

    /// True if this signal belongs to a multiplexed group
    pub fn is_multiplexed(&self) -> bool {
        self.switch_value.is_some()
    }
}

/// A complete CAN message definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// CAN message ID (11-bit or 29-bit)
    pub id: u32,
    /// Message name
    pub name: String,
    /// Data length code (0-8)
    pub dlc: u8,
    /// All signals in this message
    pub signals: Vec<Signal>,
}

impl Message {
    pub fn new(id: u32, name: impl Into<String>, dlc: u8, signals: Vec<Signal>) -> Self {
        Self {
            id,
            name: name.into(),
            dlc,
            signals,
        }
    }

    /// Identifier used for this message in emitted code and diagnostics
    pub fn qualified_name(&self) -> String {
        format!("can_0x{:03x}_{}", self.id, self.name)
    }

    /// True if any signal in this message is multiplexed
    pub fn is_multiplexed(&self) -> bool {
        self.signals.iter().any(Signal::is_multiplexed)
    }
}

/// The bus database
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    /// Messages in declaration order (sorted by id during compilation)
    pub messages: Vec<Message>,
    /// True if any signal is floating point
    pub uses_float: bool,
}

impl Database {
    /// Create a database, deriving `uses_float` from the signals
    pub fn new(messages: Vec<Message>) -> Self {
        let uses_float = messages
            .iter()
            .flat_map(|msg| msg.signals.iter())
            .any(|sig| sig.is_floating);
        Self {
            messages,
            uses_float,
        }
    }

    /// Get database statistics
    pub fn stats(&self) -> DatabaseStats {
        let num_signals = self.messages.iter().map(|msg| msg.signals.len()).sum();
        let num_multiplexed = self
            .messages
            .iter()
            .filter(|msg| msg.is_multiplexed())
            .count();

        DatabaseStats {
            num_messages: self.messages.len(),
            num_signals,
            num_multiplexed,
        }
    }
}

/// Database statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatabaseStats {
    /// Total number of message definitions
    pub num_messages: usize,
    /// Total number of signal definitions
    pub num_signals: usize,
    /// Number of messages carrying multiplexed signals
    pub num_multiplexed: usize,
}
