//! Physical <-> raw linear conversion with range checks

use crate::types::CodecError;
use serde::{Deserialize, Serialize};

/// Linear transform of one signal: `physical = raw * scaling + offset`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scaling {
    pub scaling: f64,
    pub offset: f64,
    pub minimum: f64,
    pub maximum: f64,
}

impl Scaling {
    pub fn new(scaling: f64, offset: f64, minimum: f64, maximum: f64) -> Self {
        Self {
            scaling,
            offset,
            minimum,
            maximum,
        }
    }

    /// True if the scaling factor can be inverted
    pub fn is_valid(&self) -> bool {
        self.scaling != 0.0 && self.scaling.is_finite() && self.offset.is_finite()
    }

    /// Range checks are disabled when minimum equals maximum
    pub fn is_range_checked(&self) -> bool {
        self.minimum != self.maximum
    }

    /// Raw and physical values coincide
    pub fn is_identity(&self) -> bool {
        self.scaling == 1.0 && self.offset == 0.0
    }

    fn in_range(&self, value: f64) -> bool {
        !self.is_range_checked() || (value >= self.minimum && value <= self.maximum)
    }

    fn violation(&self, signal: &str, value: f64) -> CodecError {
        CodecError::RangeViolation {
            signal: signal.to_string(),
            value,
            minimum: self.minimum,
            maximum: self.maximum,
        }
    }

    /// Convert a physical value to its raw value (before narrowing)
    pub fn encode(&self, signal: &str, physical: f64) -> Result<f64, CodecError> {
        if !self.in_range(physical) {
            return Err(self.violation(signal, physical));
        }
        if self.is_identity() {
            return Ok(physical);
        }
        Ok((physical - self.offset) / self.scaling)
    }

    /// Convert a stored raw value to its physical value
    ///
    /// Out-of-range results are reported as an error; callers that must
    /// still produce a value use zero.
    pub fn decode(&self, signal: &str, stored: f64) -> Result<f64, CodecError> {
        let value = stored * self.scaling + self.offset;
        if !self.in_range(value) {
            return Err(self.violation(signal, value));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_scaling() {
        let speed = Scaling::new(0.1, 0.0, 0.0, 6553.5);
        assert_eq!(speed.encode("Speed", 100.0).unwrap(), 1000.0);
        assert_eq!(speed.decode("Speed", 1000.0).unwrap(), 100.0);
        assert!(matches!(
            speed.encode("Speed", 7000.0),
            Err(CodecError::RangeViolation { .. })
        ));
    }

    #[test]
    fn test_decode_out_of_range() {
        let temp = Scaling::new(1.0, -40.0, -40.0, 215.0);
        let err = temp.decode("Temp", 255.0 + 10.0).unwrap_err();
        assert_eq!(
            err,
            CodecError::RangeViolation {
                signal: "Temp".to_string(),
                value: 225.0,
                minimum: -40.0,
                maximum: 215.0,
            }
        );
        assert_eq!(temp.decode("Temp", 0.0).unwrap(), -40.0);
    }

    #[test]
    fn test_equal_bounds_disable_range_check() {
        let unchecked = Scaling::new(2.0, 1.0, 0.0, 0.0);
        assert!(!unchecked.is_range_checked());
        assert_eq!(unchecked.encode("X", 1.0e9).unwrap(), (1.0e9 - 1.0) / 2.0);
        assert_eq!(unchecked.decode("X", -5.0).unwrap(), -9.0);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let s = Scaling::new(0.5, 0.0, -10.0, 10.0);
        assert!(s.encode("X", -10.0).is_ok());
        assert!(s.encode("X", 10.0).is_ok());
        assert!(s.encode("X", 10.5).is_err());
    }

    #[test]
    fn test_scaling_round_trip() {
        let cases = [(0.5, 3.0), (0.25, -100.0), (4.0, 12.0), (-2.0, 0.0)];
        for &(factor, offset) in &cases {
            let s = Scaling::new(factor, offset, 0.0, 0.0);
            for raw in -50..50 {
                let physical = raw as f64 * factor + offset;
                let encoded = s.encode("X", physical).unwrap();
                assert_eq!(encoded, raw as f64);
                assert_eq!(s.decode("X", encoded).unwrap(), physical);
            }
        }
    }

    #[test]
    fn test_validity() {
        assert!(Scaling::new(0.1, 0.0, 0.0, 0.0).is_valid());
        assert!(!Scaling::new(0.0, 0.0, 0.0, 0.0).is_valid());
        assert!(!Scaling::new(f64::NAN, 0.0, 0.0, 0.0).is_valid());
        assert!(Scaling::new(1.0, 0.0, 0.0, 0.0).is_identity());
    }
}
