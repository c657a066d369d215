//! Codec compiler
//!
//! The `Compiler` is the entry point of the library. It takes a bus
//! database, sorts it into its deterministic layout and derives the codec
//! descriptors of every message.

use crate::codec::bits::{self, FRAME_BITS};
use crate::codec::{layout, multiplex, FloatFormat, MultiplexLayout, Scaling};
use crate::config::{CompilerConfig, OverlapPolicy};
use crate::descriptor::{
    CompiledDatabase, LaneUsage, MessageCodec, MultiplexDescriptor, RejectedMessage, SignalCodec,
};
use crate::signals::{Database, Endianness, Message, Signal};
use crate::types::{ConfigurationError, Result, StorageType};
use std::collections::{HashMap, HashSet};

/// Largest 29-bit extended CAN identifier
pub const MAX_CAN_ID: u32 = 0x1FFF_FFFF;

/// Largest classic CAN data length code
pub const MAX_DLC: u8 = 8;

/// The codec compiler
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    /// Create a compiler with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compiler with the given configuration
    pub fn with_config(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile a database into codec descriptors
    ///
    /// Messages are sorted by ID and the signals of every message by bit
    /// length; the database is consumed since this reorder is destructive.
    ///
    /// # Example
    /// ```
    /// use can_codec::{Compiler, Database, Message, Signal};
    ///
    /// let speed = Signal::new("Speed", 0, 16)
    ///     .with_scaling(0.1, 0.0)
    ///     .with_range(0.0, 6553.5);
    /// let db = Database::new(vec![Message::new(0x100, "Vehicle", 8, vec![speed])]);
    ///
    /// let compiled = Compiler::new().compile(db).unwrap();
    /// let codec = compiled.message(0x100).unwrap();
    /// assert_eq!(codec.field_order(), vec!["Speed"]);
    /// ```
    pub fn compile(&self, mut database: Database) -> Result<CompiledDatabase> {
        let stats = database.stats();
        log::info!(
            "Compiling {} messages ({} signals)",
            stats.num_messages,
            stats.num_signals
        );

        let mut rejected = Vec::new();
        if self.config.abort_on_error {
            layout::sort_messages(&mut database.messages)?;
        } else {
            for duplicate in layout::take_duplicate_ids(&mut database.messages) {
                let error = ConfigurationError::DuplicateMessageId(duplicate.id);
                rejected.push(reject(&duplicate, error));
            }
        }

        let mut compiled = Vec::with_capacity(database.messages.len());
        for message in &mut database.messages {
            match self.compile_message(message) {
                Ok(codec) => compiled.push(codec),
                Err(e) if !self.config.abort_on_error => rejected.push(reject(message, e)),
                Err(e) => return Err(e.into()),
            }
        }

        let output = CompiledDatabase::new(compiled, rejected);
        log::info!(
            "Compiled {} messages, {} rejected",
            output.messages.len(),
            output.rejected.len()
        );
        Ok(output)
    }

    /// Compile a single message
    ///
    /// Sorts the message's signals in place before deriving codecs.
    pub fn compile_message(
        &self,
        message: &mut Message,
    ) -> std::result::Result<MessageCodec, ConfigurationError> {
        let qualified = message.qualified_name();
        validate_message(message)?;

        layout::sort_signals(&mut message.signals);
        let mux_layout = multiplex::resolve(message)?;

        let signals = message
            .signals
            .iter()
            .map(|sig| derive_signal(&qualified, sig))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        self.check_overlaps(&qualified, &signals)?;
        warn_beyond_dlc(&qualified, message.dlc, &signals);

        let lanes = LaneUsage {
            motorola: signals.iter().any(|s| s.endianness == Endianness::Motorola),
            intel: signals.iter().any(|s| s.endianness == Endianness::Intel),
        };

        let unconditional = match &mux_layout {
            Some(_) => signals
                .iter()
                .enumerate()
                .filter(|(_, sig)| sig.switch_value.is_none())
                .map(|(idx, _)| idx)
                .collect(),
            None => (0..signals.len()).collect(),
        };

        let multiplex = mux_layout.map(|layout| multiplex_descriptor(&signals, layout));

        let field_index: HashMap<String, usize> = signals
            .iter()
            .enumerate()
            .map(|(idx, sig)| (sig.name.clone(), idx))
            .collect();

        log::debug!(
            "{}: {} signals, lanes motorola={} intel={}, multiplexed={}",
            qualified,
            signals.len(),
            lanes.motorola,
            lanes.intel,
            multiplex.is_some()
        );

        Ok(MessageCodec {
            id: message.id,
            name: message.name.clone(),
            qualified_name: qualified,
            dlc: message.dlc,
            check_dlc: self.config.check_dlc,
            lanes,
            signals,
            multiplex,
            unconditional,
            field_index,
        })
    }

    fn check_overlaps(
        &self,
        message: &str,
        signals: &[SignalCodec],
    ) -> std::result::Result<(), ConfigurationError> {
        if self.config.overlap_policy == OverlapPolicy::Ignore {
            return Ok(());
        }

        for (i, a) in signals.iter().enumerate() {
            for b in &signals[i + 1..] {
                // signals of different multiplexed groups are never present together
                if let (Some(x), Some(y)) = (a.switch_value, b.switch_value) {
                    if x != y {
                        continue;
                    }
                }
                if footprint(a) & footprint(b) == 0 {
                    continue;
                }
                match self.config.overlap_policy {
                    OverlapPolicy::Reject => {
                        return Err(ConfigurationError::OverlappingSignals {
                            message: message.to_string(),
                            first: a.name.clone(),
                            second: b.name.clone(),
                        });
                    }
                    _ => log::warn!(
                        "{}: signals '{}' and '{}' occupy overlapping bits",
                        message,
                        a.name,
                        b.name
                    ),
                }
            }
        }
        Ok(())
    }
}

/// Record a message skipped by a lenient run
fn reject(message: &Message, error: ConfigurationError) -> RejectedMessage {
    log::error!("Skipping {}: {}", message.qualified_name(), error);
    RejectedMessage {
        id: message.id,
        name: message.name.clone(),
        reason: error.to_string(),
        error: Some(error),
    }
}

fn validate_message(message: &Message) -> std::result::Result<(), ConfigurationError> {
    let qualified = message.qualified_name();

    if message.id > MAX_CAN_ID {
        return Err(ConfigurationError::InvalidMessageId {
            message: qualified,
            id: message.id,
        });
    }
    if message.dlc > MAX_DLC {
        return Err(ConfigurationError::InvalidDlc {
            message: qualified,
            dlc: message.dlc,
        });
    }

    let mut seen = HashSet::new();
    for signal in &message.signals {
        if !seen.insert(signal.name.as_str()) {
            return Err(ConfigurationError::DuplicateSignalName {
                message: qualified,
                signal: signal.name.clone(),
            });
        }
    }
    Ok(())
}

/// Derive the bit-level codec of one signal
pub fn derive_signal(
    message: &str,
    signal: &Signal,
) -> std::result::Result<SignalCodec, ConfigurationError> {
    let length = signal.bit_length;

    if length == 0 {
        return Err(ConfigurationError::ZeroBitLength {
            message: message.to_string(),
            signal: signal.name.clone(),
        });
    }
    if u32::from(length) > FRAME_BITS {
        return Err(ConfigurationError::BitLengthTooLong {
            message: message.to_string(),
            signal: signal.name.clone(),
            bit_length: length,
        });
    }

    let float_format = if signal.is_floating {
        let format = FloatFormat::for_bit_length(length).ok_or_else(|| {
            ConfigurationError::InvalidFloatLength {
                message: message.to_string(),
                signal: signal.name.clone(),
                bit_length: length,
            }
        })?;
        Some(format)
    } else {
        None
    };

    let scaling = Scaling::new(signal.scaling, signal.offset, signal.minimum, signal.maximum);
    if !scaling.is_valid() {
        return Err(ConfigurationError::InvalidScaling {
            message: message.to_string(),
            signal: signal.name.clone(),
            scaling: signal.scaling,
        });
    }

    let canonical_offset = bits::canonical_offset(signal.endianness, signal.start_bit, length)
        .ok_or_else(|| ConfigurationError::SignalOutOfFrame {
            message: message.to_string(),
            signal: signal.name.clone(),
            start_bit: signal.start_bit,
            bit_length: length,
        })?;

    let sign_extend = if signal.is_signed && !signal.is_floating {
        bits::sign_extension_fill(length)
    } else {
        None
    };

    Ok(SignalCodec {
        name: signal.name.clone(),
        endianness: signal.endianness,
        start_bit: signal.start_bit,
        bit_length: length,
        canonical_offset,
        mask: bits::mask(length),
        sign_extend,
        float_width: float_format.map_or(0, |format| format.total_bits()),
        float_format,
        storage: StorageType::for_signal(length, signal.is_signed, signal.is_floating),
        native: scaling.is_identity(),
        scaling,
        units: signal.units.clone(),
        switch_value: signal.switch_value,
    })
}

fn footprint(signal: &SignalCodec) -> u64 {
    bits::frame_footprint(signal.endianness, signal.canonical_offset, signal.mask)
}

fn warn_beyond_dlc(message: &str, dlc: u8, signals: &[SignalCodec]) {
    let valid = if dlc >= MAX_DLC {
        u64::MAX
    } else {
        (1u64 << (8 * u32::from(dlc))) - 1
    };
    for signal in signals {
        if footprint(signal) & !valid != 0 {
            log::warn!(
                "{}: signal '{}' extends beyond the {} byte DLC",
                message,
                signal.name,
                dlc
            );
        }
    }
}

fn multiplex_descriptor(signals: &[SignalCodec], layout: MultiplexLayout) -> MultiplexDescriptor {
    let groups = layout
        .groups
        .iter()
        .map(|(&key, members)| {
            let names = members.iter().map(|&idx| signals[idx].name.clone()).collect();
            (key, names)
        })
        .collect();

    MultiplexDescriptor {
        multiplexor: signals[layout.multiplexor].name.clone(),
        groups,
        multiplexor_index: layout.multiplexor,
        group_indices: layout.groups,
    }
}
