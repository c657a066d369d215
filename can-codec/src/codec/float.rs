//! Portable IEEE-754 pack/unpack
//!
//! Floating point signals are converted with an arithmetic algorithm rather
//! than a bit reinterpretation of the host's float types, so the encoding is
//! defined purely by this routine. The routine is parametrized by total width
//! and exponent width; single (32, 8) and double (64, 11) are the instances
//! used for CAN signals.
//!
//! Special cases:
//! - zero packs to the sign bit alone (signed zero survives)
//! - NaN packs to an all-ones exponent with a non-zero mantissa, sign clear
//! - infinities pack to an all-ones exponent with a zero mantissa
//! - magnitudes too large for the exponent field pack to infinity
//! - magnitudes too small for a normal exponent pack as subnormals

use serde::{de, Deserialize, Deserializer, Serialize};

/// Layout of an IEEE-754 style binary floating point format
///
/// Only layouts accepted by [`FloatFormat::new`] can be constructed, also
/// when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FloatFormat {
    /// Total width including the sign bit
    total_bits: u32,
    /// Width of the biased exponent field
    exponent_bits: u32,
}

impl<'de> Deserialize<'de> for FloatFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Fields {
            total_bits: u32,
            exponent_bits: u32,
        }

        let fields = Fields::deserialize(deserializer)?;
        FloatFormat::new(fields.total_bits, fields.exponent_bits).ok_or_else(|| {
            de::Error::custom(format!(
                "unsupported float format: {} total bits, {} exponent bits",
                fields.total_bits, fields.exponent_bits
            ))
        })
    }
}

impl FloatFormat {
    /// IEEE-754 binary32
    pub const SINGLE: FloatFormat = FloatFormat {
        total_bits: 32,
        exponent_bits: 8,
    };

    /// IEEE-754 binary64
    pub const DOUBLE: FloatFormat = FloatFormat {
        total_bits: 64,
        exponent_bits: 11,
    };

    /// Create a format, rejecting layouts the algorithm cannot represent
    ///
    /// The exponent range must fit the one of an f64, and at least one
    /// mantissa bit is required.
    pub fn new(total_bits: u32, exponent_bits: u32) -> Option<Self> {
        let valid = (2..=11).contains(&exponent_bits)
            && total_bits <= 64
            && total_bits >= exponent_bits + 2;
        valid.then_some(Self {
            total_bits,
            exponent_bits,
        })
    }

    /// Format used by a floating signal of `bit_length` bits
    pub fn for_bit_length(bit_length: u16) -> Option<Self> {
        match bit_length {
            32 => Some(Self::SINGLE),
            64 => Some(Self::DOUBLE),
            _ => None,
        }
    }

    /// Total width including the sign bit
    pub fn total_bits(&self) -> u32 {
        self.total_bits
    }

    /// Width of the biased exponent field
    pub fn exponent_bits(&self) -> u32 {
        self.exponent_bits
    }

    pub fn mantissa_bits(&self) -> u32 {
        self.total_bits - self.exponent_bits - 1
    }

    pub fn bias(&self) -> i64 {
        (1i64 << (self.exponent_bits - 1)) - 1
    }

    fn sign_mask(&self) -> u64 {
        1u64 << (self.total_bits - 1)
    }

    fn exponent_field_max(&self) -> u64 {
        (1u64 << self.exponent_bits) - 1
    }

    fn mantissa_mask(&self) -> u64 {
        (1u64 << self.mantissa_bits()) - 1
    }

    fn exponent_mask(&self) -> u64 {
        self.exponent_field_max() << self.mantissa_bits()
    }

    /// Encode `f` into the low `total_bits` bits of the result
    pub fn pack(&self, f: f64) -> u64 {
        if f == 0.0 {
            return if f.is_sign_negative() {
                self.sign_mask()
            } else {
                0
            };
        }
        if f.is_nan() {
            return self.sign_mask() - 1;
        }
        let sign = if f < 0.0 { self.sign_mask() } else { 0 };
        if f.is_infinite() {
            return sign | self.exponent_mask();
        }

        // normalize into [1, 2) and track the exponent
        let mut fnorm = f.abs();
        let mut shift: i64 = 0;
        while fnorm >= 2.0 {
            fnorm /= 2.0;
            shift += 1;
        }
        while fnorm < 1.0 {
            fnorm *= 2.0;
            shift -= 1;
        }

        let mantissa_bits = self.mantissa_bits();
        let biased_exp = shift + self.bias();

        if biased_exp >= self.exponent_field_max() as i64 {
            return sign | self.exponent_mask();
        }

        if biased_exp <= 0 {
            // subnormal: no implicit leading one, exponent field stays zero
            let scale = scale_by_power_of_two(fnorm, i64::from(mantissa_bits) - 1 + biased_exp);
            let significand = scale.round() as u64;
            return sign | significand;
        }

        let fraction = fnorm - 1.0;
        let significand = (fraction * pow2(mantissa_bits)).round() as u64;

        // rounding up to 2^mantissa_bits carries into the exponent
        sign | (((biased_exp as u64) << mantissa_bits) + significand)
    }

    /// Decode the low `total_bits` bits of `bits`
    pub fn unpack(&self, bits: u64) -> f64 {
        let mantissa_bits = self.mantissa_bits();
        let negative = bits & self.sign_mask() != 0;
        let mantissa = bits & self.mantissa_mask();
        let stored_exp = (bits & self.exponent_mask()) >> mantissa_bits;

        let magnitude = if stored_exp == self.exponent_field_max() {
            if mantissa != 0 {
                return f64::NAN;
            }
            f64::INFINITY
        } else if stored_exp == 0 {
            // zero or subnormal
            let fraction = mantissa as f64 / pow2(mantissa_bits);
            scale_by_power_of_two(fraction, 1 - self.bias())
        } else {
            let fraction = mantissa as f64 / pow2(mantissa_bits) + 1.0;
            scale_by_power_of_two(fraction, stored_exp as i64 - self.bias())
        };

        if negative {
            -magnitude
        } else {
            magnitude
        }
    }
}

fn pow2(bits: u32) -> f64 {
    (1u64 << bits) as f64
}

/// Apply `steps` multiplications (or divisions, when negative) by two
fn scale_by_power_of_two(mut value: f64, mut steps: i64) -> f64 {
    while steps > 0 {
        value *= 2.0;
        steps -= 1;
    }
    while steps < 0 {
        value /= 2.0;
        steps += 1;
    }
    value
}

/// Encode an f32 value as binary32 bits
pub fn pack_f32(f: f32) -> u32 {
    FloatFormat::SINGLE.pack(f64::from(f)) as u32
}

/// Decode binary32 bits
pub fn unpack_f32(bits: u32) -> f32 {
    FloatFormat::SINGLE.unpack(u64::from(bits)) as f32
}

/// Encode an f64 value as binary64 bits
pub fn pack_f64(f: f64) -> u64 {
    FloatFormat::DOUBLE.pack(f)
}

/// Decode binary64 bits
pub fn unpack_f64(bits: u64) -> f64 {
    FloatFormat::DOUBLE.unpack(bits)
}
