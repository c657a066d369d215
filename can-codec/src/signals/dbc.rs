//! DBC file adapter
//!
//! The DBC grammar is handled by the `can-dbc` crate; this module converts
//! its records into the bus database model.

use crate::signals::database::{Database, Endianness, Message, Signal};
use crate::types::{CompileError, Result};

/// Bit 31 of a DBC message ID marks a 29-bit extended identifier
const EXTENDED_ID_FLAG: u32 = 0x8000_0000;

/// Parse DBC file contents into a database
pub fn parse_dbc(bytes: &[u8]) -> Result<Database> {
    let content = decode_text(bytes);

    let dbc = can_dbc::DBC::from_slice(content.as_bytes())
        .map_err(|e| CompileError::DbcParseError(format!("{:?}", e)))?;

    let database = convert_database(&dbc);
    log::info!(
        "Parsed {} messages from DBC ({} signals)",
        database.messages.len(),
        database.stats().num_signals
    );
    Ok(database)
}

/// Decode text as UTF-8, falling back to Latin-1 (Windows-1252 compatible)
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            log::warn!("DBC file is not UTF-8, trying Latin-1 encoding");
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

/// Convert a parsed DBC into our database model
pub fn convert_database(dbc: &can_dbc::DBC) -> Database {
    Database::new(
        dbc.messages()
            .iter()
            .map(|msg| convert_message(dbc, msg))
            .collect(),
    )
}

/// Convert a can-dbc message to our Message
fn convert_message(dbc: &can_dbc::DBC, dbc_msg: &can_dbc::Message) -> Message {
    let raw_id = dbc_msg.message_id().0;
    let dlc = u8::try_from(*dbc_msg.message_size()).unwrap_or(u8::MAX);

    Message {
        id: raw_id & !EXTENDED_ID_FLAG,
        name: dbc_msg.message_name().to_string(),
        dlc,
        signals: dbc_msg
            .signals()
            .iter()
            .map(|sig| {
                let value_type = dbc.extended_value_type_for_signal(
                    can_dbc::MessageId(raw_id),
                    sig.name(),
                );
                convert_signal(sig, value_type)
            })
            .collect(),
    }
}

/// Convert a can-dbc signal to our Signal
///
/// `value_type` is the signal's `SIG_VALTYPE_` declaration, if any.
fn convert_signal(
    dbc_sig: &can_dbc::Signal,
    value_type: Option<&can_dbc::SignalExtendedValueType>,
) -> Signal {
    let endianness = match dbc_sig.byte_order() {
        can_dbc::ByteOrder::LittleEndian => Endianness::Intel,
        can_dbc::ByteOrder::BigEndian => Endianness::Motorola,
    };

    let is_signed = matches!(dbc_sig.value_type(), can_dbc::ValueType::Signed);
    let is_floating = matches!(
        value_type,
        Some(
            can_dbc::SignalExtendedValueType::IEEEfloat32Bit
                | can_dbc::SignalExtendedValueType::IEEEdouble64bit
        )
    );

    let (is_multiplexor, switch_value) = match dbc_sig.multiplexer_indicator() {
        can_dbc::MultiplexIndicator::Multiplexor => (true, None),
        can_dbc::MultiplexIndicator::MultiplexedSignal(value) => (false, Some(*value)),
        _ => (false, None),
    };

    Signal {
        name: dbc_sig.name().to_string(),
        // out-of-range declarations saturate and are rejected at compile time
        start_bit: u16::try_from(*dbc_sig.start_bit()).unwrap_or(u16::MAX),
        bit_length: u16::try_from(*dbc_sig.signal_size()).unwrap_or(u16::MAX),
        endianness,
        is_signed,
        is_floating,
        scaling: *dbc_sig.factor(),
        offset: *dbc_sig.offset(),
        minimum: *dbc_sig.min(),
        maximum: *dbc_sig.max(),
        units: if dbc_sig.unit().is_empty() {
            None
        } else {
            Some(dbc_sig.unit().to_string())
        },
        is_multiplexor,
        switch_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_dbc() {
        let dbc_content = r#"
VERSION ""

NS_ :
    NS_DESC_
    CM_
    BA_DEF_
    BA_
    VAL_

BS_:

BU_: ECU1 ECU2

BO_ 291 EngineData: 8 ECU1
 SG_ EngineSpeed : 0|16@1+ (1,0) [0|8000] "rpm" ECU2
 SG_ EngineTemp : 16|8@1+ (1,-40) [-40|215] "C" ECU2

BO_ 512 BatteryStatus: 8 ECU1
 SG_ BatteryVoltage : 7|16@0- (0.01,0) [0|16] "V" ECU2
"#;

        let db = parse_dbc(dbc_content.as_bytes()).unwrap();
        assert_eq!(db.messages.len(), 2);
        assert!(!db.uses_float);

        let msg1 = &db.messages[0];
        assert_eq!(msg1.id, 291);
        assert_eq!(msg1.name, "EngineData");
        assert_eq!(msg1.dlc, 8);
        assert_eq!(msg1.signals.len(), 2);

        let speed = &msg1.signals[0];
        assert_eq!(speed.name, "EngineSpeed");
        assert_eq!(speed.start_bit, 0);
        assert_eq!(speed.bit_length, 16);
        assert_eq!(speed.endianness, Endianness::Intel);
        assert!(!speed.is_signed);
        assert_eq!(speed.maximum, 8000.0);
        assert_eq!(speed.units, Some("rpm".to_string()));

        let temp = &msg1.signals[1];
        assert_eq!(temp.offset, -40.0);

        let voltage = &db.messages[1].signals[0];
        assert_eq!(voltage.endianness, Endianness::Motorola);
        assert!(voltage.is_signed);
        assert_eq!(voltage.scaling, 0.01);
    }

    #[test]
    fn test_parse_multiplexed_signals() {
        let dbc_content = r#"
VERSION ""

NS_ :

BS_:

BU_: ECU1

BO_ 512 MultiplexedMsg: 8 ECU1
 SG_ Mode M : 0|8@1+ (1,0) [0|3] "" ECU1
 SG_ SignalA m0 : 8|16@1+ (1,0) [0|100] "%" ECU1
 SG_ SignalB m1 : 8|16@1+ (0.1,0) [0|1000] "mV" ECU1
"#;

        let db = parse_dbc(dbc_content.as_bytes()).unwrap();
        let msg = &db.messages[0];
        assert!(msg.is_multiplexed());

        let mode = msg.signals.iter().find(|s| s.name == "Mode").unwrap();
        assert!(mode.is_multiplexor);
        assert_eq!(mode.units, None);

        let sig_b = msg.signals.iter().find(|s| s.name == "SignalB").unwrap();
        assert_eq!(sig_b.switch_value, Some(1));
    }

    #[test]
    fn test_extended_id_flag_is_stripped() {
        let dbc_content = r#"
VERSION ""

NS_ :

BS_:

BU_: ECU1

BO_ 2566844926 ExtendedMsg: 8 ECU1
 SG_ Value : 0|8@1+ (1,0) [0|0] "" ECU1
"#;

        let db = parse_dbc(dbc_content.as_bytes()).unwrap();
        assert_eq!(db.messages[0].id, 2566844926 & 0x1FFF_FFFF);
    }

    #[test]
    fn test_parse_float_value_types() {
        let dbc_content = r#"
VERSION ""

NS_ :

BS_:

BU_: ECU1

BO_ 256 Sensor: 8 ECU1
 SG_ Pressure : 0|32@1+ (1,0) [0|0] "bar" ECU1
 SG_ Status : 32|8@1+ (1,0) [0|0] "" ECU1

BO_ 257 Precise: 8 ECU1
 SG_ Position : 0|64@1- (1,0) [0|0] "m" ECU1

SIG_VALTYPE_ 256 Pressure : 1;
SIG_VALTYPE_ 257 Position : 2;
"#;

        let db = parse_dbc(dbc_content.as_bytes()).unwrap();
        assert!(db.uses_float);

        let sensor = &db.messages[0];
        assert!(sensor.signals[0].is_floating);
        assert_eq!(sensor.signals[0].bit_length, 32);
        assert!(!sensor.signals[1].is_floating);

        let position = &db.messages[1].signals[0];
        assert!(position.is_floating);
        assert_eq!(position.bit_length, 64);
    }

    #[test]
    fn test_invalid_dbc() {
        assert!(matches!(
            parse_dbc(b"this is not a dbc file"),
            Err(CompileError::DbcParseError(_))
        ));
    }

    #[test]
    fn test_latin1_fallback() {
        assert_eq!(decode_text(&[b'd', 0xB0, b'C']), "d\u{b0}C");
    }
}
