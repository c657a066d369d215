//! Message codec runtime
//!
//! Executes compiled descriptors the way generated code does: physical
//! values are encoded into a per-message record of raw fields, the record is
//! packed into a frame through one accumulator per lane, and the reverse
//! path unpacks a frame into a record and decodes physical values from it.

use crate::codec::bits;
use crate::descriptor::{CompiledDatabase, MessageCodec, SignalCodec};
use crate::signals::Endianness;
use crate::types::{CodecError, DecodedMessage, DecodedSignal, StorageValue};
use byteorder::{ByteOrder, LittleEndian};

/// Number of data bytes in a classic CAN frame
pub const FRAME_BYTES: usize = 8;

/// Raw field values of one message, in struct field order
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    id: u32,
    values: Vec<StorageValue>,
}

impl MessageRecord {
    /// CAN ID of the message this record belongs to
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Raw values in field order
    pub fn values(&self) -> &[StorageValue] {
        &self.values
    }
}

/// Per-lane accumulators used while packing
#[derive(Debug, Default)]
struct LaneAccumulator {
    motorola: u64,
    intel: u64,
}

impl LaneAccumulator {
    fn insert(&mut self, signal: &SignalCodec, raw: u64) {
        let lane = match signal.endianness {
            Endianness::Motorola => &mut self.motorola,
            Endianness::Intel => &mut self.intel,
        };
        *lane = bits::insert(*lane, raw, signal.canonical_offset, signal.mask);
    }

    /// Combine both lanes into the frame scalar
    fn frame(&self) -> u64 {
        bits::reverse_byte_order(self.motorola) | self.intel
    }
}

/// Byte-order-corrected views of a received frame
#[derive(Debug)]
struct LaneScalars {
    motorola: u64,
    intel: u64,
}

impl LaneScalars {
    fn new(frame: u64) -> Self {
        Self {
            motorola: bits::reverse_byte_order(frame),
            intel: frame,
        }
    }

    fn extract(&self, signal: &SignalCodec) -> u64 {
        let scalar = match signal.endianness {
            Endianness::Motorola => self.motorola,
            Endianness::Intel => self.intel,
        };
        bits::extract(scalar, signal.canonical_offset, signal.mask)
    }
}

/// Raw bits of a record field
fn field_bits(signal: &SignalCodec, value: StorageValue) -> u64 {
    match signal.float_format {
        Some(format) => format.pack(value.as_f64()),
        None => value.integer_bits(),
    }
}

/// Record value of extracted raw bits
fn field_value(signal: &SignalCodec, raw: u64) -> StorageValue {
    if let Some(format) = signal.float_format {
        StorageValue::Float(format.unpack(raw))
    } else if signal.is_signed() {
        let extended = bits::sign_extend(raw, signal.bit_length);
        StorageValue::Signed(signal.storage.reinterpret_signed(extended))
    } else {
        StorageValue::Unsigned(raw)
    }
}

/// Multiplexor switch value held by a record field
fn switch_value(value: StorageValue) -> u64 {
    match value {
        StorageValue::Unsigned(v) => v,
        StorageValue::Signed(v) => v as u64,
        StorageValue::Float(v) => v as u64,
    }
}

impl MessageCodec {
    /// Create a zero-initialized record for this message
    pub fn new_record(&self) -> MessageRecord {
        MessageRecord {
            id: self.id,
            values: self.signals.iter().map(|sig| sig.storage.zero()).collect(),
        }
    }

    fn check_record(&self, record: &MessageRecord) -> Result<(), CodecError> {
        if record.id != self.id || record.values.len() != self.signals.len() {
            return Err(CodecError::RecordMismatch {
                expected: self.id,
                actual: record.id,
            });
        }
        Ok(())
    }

    fn index_of(&self, name: &str) -> Result<usize, CodecError> {
        self.field_index
            .get(name)
            .copied()
            .ok_or_else(|| CodecError::UnknownSignal(name.to_string()))
    }

    /// Raw value of a field
    pub fn raw(&self, record: &MessageRecord, name: &str) -> Result<StorageValue, CodecError> {
        self.check_record(record)?;
        Ok(record.values[self.index_of(name)?])
    }

    /// Store a raw value directly, bypassing scaling and range checks
    ///
    /// Integer values are truncated to the signal's bit length, as if they
    /// had been received on the bus.
    pub fn set_raw(
        &self,
        record: &mut MessageRecord,
        name: &str,
        raw: StorageValue,
    ) -> Result<(), CodecError> {
        self.check_record(record)?;
        let idx = self.index_of(name)?;
        let signal = &self.signals[idx];
        record.values[idx] = match raw {
            StorageValue::Float(v) => signal.storage.narrow(v),
            _ if signal.float_format.is_some() => signal.storage.narrow(raw.as_f64()),
            _ => field_value(signal, raw.integer_bits() & signal.mask),
        };
        Ok(())
    }

    /// Convert a physical value and store it in the record
    ///
    /// On a range violation the record is left untouched.
    pub fn encode_signal(
        &self,
        record: &mut MessageRecord,
        name: &str,
        physical: f64,
    ) -> Result<(), CodecError> {
        self.check_record(record)?;
        let idx = self.index_of(name)?;
        let signal = &self.signals[idx];
        let raw = signal.scaling.encode(&signal.name, physical)?;
        record.values[idx] = signal.storage.narrow(raw);
        Ok(())
    }

    /// Physical value of a field
    pub fn decode_signal(&self, record: &MessageRecord, name: &str) -> Result<f64, CodecError> {
        self.check_record(record)?;
        let idx = self.index_of(name)?;
        let signal = &self.signals[idx];
        signal.scaling.decode(&signal.name, record.values[idx].as_f64())
    }

    /// Indices of the multiplexed group selected by the record's multiplexor
    fn active_group(&self, record: &MessageRecord) -> Result<Option<&[usize]>, CodecError> {
        let Some(mux) = &self.multiplex else {
            return Ok(None);
        };
        let value = switch_value(record.values[mux.multiplexor_index]);
        match mux.group_indices.get(&value) {
            Some(group) => Ok(Some(group.as_slice())),
            None => Err(CodecError::MultiplexDispatchMiss {
                message: self.qualified_name.clone(),
                value,
            }),
        }
    }

    /// Pack a record into the 64-bit frame scalar
    pub fn pack_scalar(&self, record: &MessageRecord) -> Result<u64, CodecError> {
        self.check_record(record)?;
        let mut lanes = LaneAccumulator::default();

        for &idx in &self.unconditional {
            let signal = &self.signals[idx];
            lanes.insert(signal, field_bits(signal, record.values[idx]));
        }

        if let Some(group) = self.active_group(record)? {
            for &idx in group {
                let signal = &self.signals[idx];
                lanes.insert(signal, field_bits(signal, record.values[idx]));
            }
        }

        Ok(lanes.frame())
    }

    /// Pack a record into frame bytes
    ///
    /// Fails without producing a frame if the multiplexor selects no group.
    pub fn pack(&self, record: &MessageRecord) -> Result<[u8; FRAME_BYTES], CodecError> {
        let scalar = self.pack_scalar(record)?;
        let mut data = [0u8; FRAME_BYTES];
        LittleEndian::write_u64(&mut data, scalar);
        Ok(data)
    }

    /// Unpack frame bytes into a record
    ///
    /// Unconditional signals are written first. If the multiplexor then
    /// selects no group, they stay decoded and a dispatch miss is returned.
    pub fn unpack(&self, frame: &[u8], record: &mut MessageRecord) -> Result<(), CodecError> {
        self.check_record(record)?;
        if self.check_dlc && frame.len() < usize::from(self.dlc) {
            return Err(CodecError::FrameTooShort {
                message: self.qualified_name.clone(),
                expected: self.dlc,
                actual: frame.len(),
            });
        }

        let mut data = [0u8; FRAME_BYTES];
        let len = frame.len().min(FRAME_BYTES);
        data[..len].copy_from_slice(&frame[..len]);
        let lanes = LaneScalars::new(LittleEndian::read_u64(&data));

        for &idx in &self.unconditional {
            let signal = &self.signals[idx];
            record.values[idx] = field_value(signal, lanes.extract(signal));
        }

        if let Some(group) = self.active_group(record)? {
            for &idx in group {
                let signal = &self.signals[idx];
                record.values[idx] = field_value(signal, lanes.extract(signal));
            }
        }
        Ok(())
    }

    /// Encode physical values and pack them into frame bytes
    ///
    /// Fields not listed stay zero.
    pub fn encode(&self, values: &[(&str, f64)]) -> Result<[u8; FRAME_BYTES], CodecError> {
        let mut record = self.new_record();
        for &(name, physical) in values {
            self.encode_signal(&mut record, name, physical)?;
        }
        self.pack(&record)
    }

    fn decoded_signal(&self, record: &MessageRecord, idx: usize) -> DecodedSignal {
        let signal = &self.signals[idx];
        let raw = record.values[idx];
        let (value, error) = match signal.scaling.decode(&signal.name, raw.as_f64()) {
            Ok(value) => (value, None),
            Err(e) => (0.0, Some(e)),
        };
        DecodedSignal {
            name: signal.name.clone(),
            value,
            raw,
            unit: signal.units.clone(),
            error,
        }
    }

    /// Unpack a frame and decode every present signal
    ///
    /// A multiplexor value that selects no group is reported in
    /// `multiplex_error`; the unconditional signals are still returned.
    pub fn decode_frame(&self, frame: &[u8]) -> Result<DecodedMessage, CodecError> {
        let mut record = self.new_record();
        let multiplex_error = match self.unpack(frame, &mut record) {
            Ok(()) => None,
            Err(e @ CodecError::MultiplexDispatchMiss { .. }) => Some(e),
            Err(e) => return Err(e),
        };

        let mut signals: Vec<DecodedSignal> = self
            .unconditional
            .iter()
            .map(|&idx| self.decoded_signal(&record, idx))
            .collect();

        if multiplex_error.is_none() {
            if let Ok(Some(group)) = self.active_group(&record) {
                signals.extend(group.iter().map(|&idx| self.decoded_signal(&record, idx)));
            }
        }

        let multiplexer_value = self
            .multiplex
            .as_ref()
            .map(|mux| switch_value(record.values[mux.multiplexor_index]));

        Ok(DecodedMessage {
            id: self.id,
            name: self.name.clone(),
            signals,
            multiplexer_value,
            multiplex_error,
        })
    }
}

impl CompiledDatabase {
    fn codec(&self, id: u32) -> Result<&MessageCodec, CodecError> {
        self.message(id).ok_or(CodecError::UnknownMessage(id))
    }

    /// Create a zero-initialized record for a CAN ID
    pub fn new_record(&self, id: u32) -> Result<MessageRecord, CodecError> {
        Ok(self.codec(id)?.new_record())
    }

    /// Pack a record of any compiled message
    pub fn pack_message(&self, record: &MessageRecord) -> Result<[u8; FRAME_BYTES], CodecError> {
        self.codec(record.id)?.pack(record)
    }

    /// Unpack a frame received with `id` into `record`
    pub fn unpack_message(
        &self,
        id: u32,
        frame: &[u8],
        record: &mut MessageRecord,
    ) -> Result<(), CodecError> {
        self.codec(id)?.unpack(frame, record)
    }

    /// Decode a frame received with `id`
    pub fn decode_frame(&self, id: u32, frame: &[u8]) -> Result<DecodedMessage, CodecError> {
        self.codec(id)?.decode_frame(frame)
    }
}
