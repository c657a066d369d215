//! Bit position, mask and sign handling
//!
//! A frame's 8 bytes are held in a 64-bit little-endian scalar. Intel signals
//! are addressed directly in that scalar. Motorola signals are addressed in
//! the byte-reversed scalar (the "motorola lane"), where their declared MSB
//! position can be re-based to an ordinary LSB shift count.

use crate::signals::Endianness;
use crate::types::container_width;

/// Number of bits in a classic CAN frame scalar
pub const FRAME_BITS: u32 = 64;

/// Canonical LSB shift count of a signal within its lane scalar
///
/// Returns `None` when the signal does not fit inside the 64-bit frame.
pub fn canonical_offset(endianness: Endianness, start_bit: u16, bit_length: u16) -> Option<u32> {
    if bit_length == 0 || u32::from(bit_length) > FRAME_BITS {
        return None;
    }
    let start = i64::from(start_bit);
    let length = i64::from(bit_length);

    let offset = match endianness {
        Endianness::Intel => start,
        Endianness::Motorola => 8 * (7 - start / 8) + (start % 8) - (length - 1),
    };

    if offset < 0 || offset + length > i64::from(FRAME_BITS) {
        return None;
    }
    u32::try_from(offset).ok()
}

/// Mask covering the low `bit_length` bits
pub fn mask(bit_length: u16) -> u64 {
    if bit_length >= 64 {
        u64::MAX
    } else {
        (1u64 << bit_length) - 1
    }
}

/// Extract a raw value from a lane scalar
pub fn extract(scalar: u64, offset: u32, mask: u64) -> u64 {
    (scalar >> offset) & mask
}

/// Insert a raw value into a lane accumulator
pub fn insert(accumulator: u64, raw: u64, offset: u32, mask: u64) -> u64 {
    accumulator | ((raw & mask) << offset)
}

/// Bits to OR into a negative value so it fills its natural container
///
/// Returns `None` when the signal already fills its container and the
/// container's own sign bit does the work.
pub fn sign_extension_fill(bit_length: u16) -> Option<u64> {
    let width = container_width(bit_length);
    let container = if width == 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    };
    let fill = !mask(bit_length) & container;
    (fill != 0).then_some(fill)
}

/// Sign-extend a masked raw value to its natural container width
pub fn sign_extend(value: u64, bit_length: u16) -> u64 {
    let Some(fill) = sign_extension_fill(bit_length) else {
        return value;
    };
    let sign_bit = 1u64 << (bit_length - 1);
    if value & sign_bit != 0 {
        value | fill
    } else {
        value
    }
}

/// Swap a scalar between frame byte order and the motorola lane
pub fn reverse_byte_order(scalar: u64) -> u64 {
    scalar.swap_bytes()
}

/// Bits occupied in the frame scalar (intel numbering) by a signal
///
/// Used to compare signals from different lanes.
pub fn frame_footprint(endianness: Endianness, offset: u32, mask: u64) -> u64 {
    let lane = mask << offset;
    match endianness {
        Endianness::Intel => lane,
        Endianness::Motorola => reverse_byte_order(lane),
    }
}
