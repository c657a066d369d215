//! Compiled codec descriptors
//!
//! These are the outputs of a compilation run: everything a code emitter
//! needs to generate pack/unpack and encode/decode routines, already
//! resolved down to shifts, masks and branch tables. The same descriptors
//! drive the reference runtime in [`crate::message_codec`].

use crate::codec::{FloatFormat, Scaling};
use crate::signals::Endianness;
use crate::types::{ConfigurationError, StorageType};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Bit-level operations for one signal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalCodec {
    /// Signal name (struct field name)
    pub name: String,
    /// Lane the signal is extracted from
    pub endianness: Endianness,
    /// Start bit as declared
    pub start_bit: u16,
    /// Length in bits
    pub bit_length: u16,
    /// LSB shift count inside the lane scalar
    pub canonical_offset: u32,
    /// Mask applied after shifting
    pub mask: u64,
    /// Bits ORed into negative values to fill the container
    pub sign_extend: Option<u64>,
    /// 0 for integer signals, otherwise the IEEE-754 width (32 or 64)
    pub float_width: u32,
    /// IEEE-754 layout for floating signals
    pub float_format: Option<FloatFormat>,
    /// Natural container of the raw value
    pub storage: StorageType,
    /// Physical conversion and range
    #[serde(flatten)]
    pub scaling: Scaling,
    /// Raw and physical values coincide, the native type can be used directly
    pub native: bool,
    /// Engineering unit
    pub units: Option<String>,
    /// Multiplexor value selecting this signal (None = always present)
    pub switch_value: Option<u64>,
}

impl SignalCodec {
    pub fn is_signed(&self) -> bool {
        self.storage.is_signed()
    }
}

/// Which lane accumulators a message needs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LaneUsage {
    pub motorola: bool,
    pub intel: bool,
}

impl LaneUsage {
    /// True if the message has any signals at all
    pub fn any(&self) -> bool {
        self.motorola || self.intel
    }
}

/// Keyed dispatch over multiplexed signal groups
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiplexDescriptor {
    /// Name of the multiplexor signal
    pub multiplexor: String,
    /// Switch value -> signal names, in field order
    pub groups: BTreeMap<u64, Vec<String>>,
    #[serde(skip)]
    pub(crate) multiplexor_index: usize,
    #[serde(skip)]
    pub(crate) group_indices: BTreeMap<u64, Vec<usize>>,
}

impl MultiplexDescriptor {
    /// Signal names for a multiplexor value
    pub fn group(&self, switch_value: u64) -> Option<&[String]> {
        self.groups.get(&switch_value).map(Vec::as_slice)
    }
}

/// Compiled codec of one message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageCodec {
    /// CAN message ID
    pub id: u32,
    /// Message name
    pub name: String,
    /// `can_0x<id>_<name>` identifier for emitted code
    pub qualified_name: String,
    /// Data length code
    pub dlc: u8,
    /// Refuse frames shorter than the DLC at unpack
    pub check_dlc: bool,
    /// Lanes in use
    pub lanes: LaneUsage,
    /// Signal codecs in struct field order
    pub signals: Vec<SignalCodec>,
    /// Multiplexor dispatch (if message is multiplexed)
    pub multiplex: Option<MultiplexDescriptor>,
    #[serde(skip)]
    pub(crate) unconditional: Vec<usize>,
    #[serde(skip)]
    pub(crate) field_index: HashMap<String, usize>,
}

impl MessageCodec {
    /// Struct field names in layout order
    pub fn field_order(&self) -> Vec<&str> {
        self.signals.iter().map(|sig| sig.name.as_str()).collect()
    }

    /// Get a signal codec by name
    pub fn signal(&self, name: &str) -> Option<&SignalCodec> {
        self.field_index.get(name).map(|&idx| &self.signals[idx])
    }

    /// Signals processed regardless of the multiplexor value, in field order
    pub fn unconditional_signals(&self) -> impl Iterator<Item = &SignalCodec> {
        self.unconditional.iter().map(|&idx| &self.signals[idx])
    }

    pub fn is_multiplexed(&self) -> bool {
        self.multiplex.is_some()
    }
}

/// A message left out of a lenient compilation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedMessage {
    pub id: u32,
    pub name: String,
    pub reason: String,
    #[serde(skip)]
    pub error: Option<ConfigurationError>,
}

/// Output of a compilation run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompiledDatabase {
    /// Compiled messages, ascending by CAN ID
    pub messages: Vec<MessageCodec>,
    /// True if the IEEE-754 helpers are needed
    pub uses_float: bool,
    /// Messages skipped because of configuration errors
    pub rejected: Vec<RejectedMessage>,
    #[serde(skip)]
    pub(crate) dispatch: HashMap<u32, usize>,
}

impl CompiledDatabase {
    pub(crate) fn new(messages: Vec<MessageCodec>, rejected: Vec<RejectedMessage>) -> Self {
        let dispatch = messages
            .iter()
            .enumerate()
            .map(|(idx, msg)| (msg.id, idx))
            .collect();
        let uses_float = messages
            .iter()
            .flat_map(|msg| msg.signals.iter())
            .any(|sig| sig.float_format.is_some());

        Self {
            messages,
            uses_float,
            rejected,
            dispatch,
        }
    }

    /// Get the codec for a CAN ID
    pub fn message(&self, id: u32) -> Option<&MessageCodec> {
        self.dispatch.get(&id).map(|&idx| &self.messages[idx])
    }

    /// Get the codec for a message name
    pub fn message_by_name(&self, name: &str) -> Option<&MessageCodec> {
        self.messages.iter().find(|msg| msg.name == name)
    }

    /// All compiled CAN IDs in ascending order
    pub fn ids(&self) -> Vec<u32> {
        self.messages.iter().map(|msg| msg.id).collect()
    }
}
