//! End-to-end scenarios: build a database, compile it and run frames
//! through the compiled codecs.

use can_codec::{
    parse_dbc, CodecError, CompileError, Compiler, CompilerConfig, ConfigurationError, Database,
    Endianness, Message, Signal, StorageValue,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn vehicle_speed() -> Message {
    let speed = Signal::new("Speed", 0, 16)
        .with_scaling(0.1, 0.0)
        .with_range(0.0, 6553.5)
        .with_units("km/h");
    Message::new(0x100, "Vehicle", 8, vec![speed])
}

/// Mode selects A (0), B and C (1) or D (2); Counter is always present
fn multiplexed_status() -> Message {
    Message::new(
        0x200,
        "Status",
        8,
        vec![
            Signal::new("Mode", 0, 8).multiplexor(),
            Signal::new("A", 8, 8).multiplexed(0),
            Signal::new("B", 8, 8).multiplexed(1),
            Signal::new("C", 16, 8).multiplexed(1),
            Signal::new("D", 8, 8).multiplexed(2),
            Signal::new("Counter", 56, 8),
        ],
    )
}

#[test]
fn test_scaled_signal_round_trip() {
    init_logging();
    let compiled = Compiler::new()
        .compile(Database::new(vec![vehicle_speed()]))
        .unwrap();
    let codec = compiled.message(0x100).unwrap();

    let frame = codec.encode(&[("Speed", 100.0)]).unwrap();
    assert_eq!(frame, [0xE8, 0x03, 0, 0, 0, 0, 0, 0]);

    let decoded = codec.decode_frame(&frame).unwrap();
    let speed = decoded.signal("Speed").unwrap();
    assert_eq!(speed.value, 100.0);
    assert_eq!(speed.raw, StorageValue::Unsigned(1000));
    assert_eq!(speed.to_string(), "Speed = 100.000 km/h (wire: 1000)");
}

#[test]
fn test_out_of_range_encode_leaves_record_untouched() {
    let compiled = Compiler::new()
        .compile(Database::new(vec![vehicle_speed()]))
        .unwrap();
    let codec = compiled.message(0x100).unwrap();

    let mut record = codec.new_record();
    codec.encode_signal(&mut record, "Speed", 50.0).unwrap();

    let err = codec.encode_signal(&mut record, "Speed", 7000.0).unwrap_err();
    assert!(matches!(err, CodecError::RangeViolation { .. }));
    assert_eq!(codec.decode_signal(&record, "Speed").unwrap(), 50.0);
}

#[test]
fn test_out_of_range_decode_yields_zero() {
    let limited = Signal::new("Level", 0, 8).with_range(0.0, 100.0);
    let compiled = Compiler::new()
        .compile(Database::new(vec![Message::new(0x10, "Tank", 1, vec![limited])]))
        .unwrap();

    let decoded = compiled.decode_frame(0x10, &[200]).unwrap();
    let level = decoded.signal("Level").unwrap();
    assert_eq!(level.value, 0.0);
    assert_eq!(level.raw, StorageValue::Unsigned(200));
    assert!(matches!(level.error, Some(CodecError::RangeViolation { .. })));
    assert!(level.to_string().ends_with("[out of range]"));
}

#[test]
fn test_motorola_and_intel_share_a_frame() {
    let message = Message::new(
        0x300,
        "Mixed",
        8,
        vec![
            Signal::new("BigEndian", 7, 16).with_endianness(Endianness::Motorola),
            Signal::new("LittleEndian", 16, 16),
            Signal::new("Temp", 32, 8).signed(),
        ],
    );
    let compiled = Compiler::new()
        .compile(Database::new(vec![message]))
        .unwrap();
    let codec = compiled.message(0x300).unwrap();
    assert!(codec.lanes.motorola && codec.lanes.intel);

    let frame = codec
        .encode(&[
            ("BigEndian", 4660.0),
            ("LittleEndian", 4660.0),
            ("Temp", -5.0),
        ])
        .unwrap();
    assert_eq!(frame, [0x12, 0x34, 0x34, 0x12, 0xFB, 0, 0, 0]);

    let decoded = codec.decode_frame(&frame).unwrap();
    assert_eq!(decoded.signal("BigEndian").unwrap().value, 4660.0);
    assert_eq!(decoded.signal("LittleEndian").unwrap().value, 4660.0);
    assert_eq!(decoded.signal("Temp").unwrap().value, -5.0);
    assert_eq!(decoded.signal("Temp").unwrap().raw, StorageValue::Signed(-5));
}

#[test]
fn test_float_signal_on_the_wire() {
    let message = Message::new(0x400, "Sensor", 8, vec![Signal::new("Pressure", 0, 32).floating()]);
    let compiled = Compiler::new()
        .compile(Database::new(vec![message]))
        .unwrap();
    assert!(compiled.uses_float);
    let codec = compiled.message(0x400).unwrap();

    let frame = codec.encode(&[("Pressure", 1.5)]).unwrap();
    assert_eq!(&frame[..4], &1.5f32.to_le_bytes());

    let decoded = codec.decode_frame(&frame).unwrap();
    assert_eq!(decoded.signal("Pressure").unwrap().value, 1.5);
}

#[test]
fn test_multiplexed_dispatch() {
    let compiled = Compiler::new()
        .compile(Database::new(vec![multiplexed_status()]))
        .unwrap();
    let codec = compiled.message(0x200).unwrap();

    let mux = codec.multiplex.as_ref().unwrap();
    assert_eq!(mux.multiplexor, "Mode");
    assert_eq!(mux.groups.len(), 3);

    let frame = codec
        .encode(&[("Mode", 1.0), ("B", 0x11 as f64), ("C", 0x22 as f64), ("Counter", 5.0)])
        .unwrap();
    assert_eq!(frame, [1, 0x11, 0x22, 0, 0, 0, 0, 5]);

    let decoded = codec.decode_frame(&frame).unwrap();
    assert_eq!(decoded.multiplexer_value, Some(1));
    assert!(decoded.multiplex_error.is_none());
    assert_eq!(decoded.signal("B").unwrap().value, 17.0);
    assert_eq!(decoded.signal("C").unwrap().value, 34.0);
    assert!(decoded.signal("A").is_none());
    assert!(decoded.signal("D").is_none());
}

#[test]
fn test_multiplexed_dispatch_miss_keeps_unconditional_signals() {
    let compiled = Compiler::new()
        .compile(Database::new(vec![multiplexed_status()]))
        .unwrap();
    let codec = compiled.message(0x200).unwrap();

    let decoded = codec
        .decode_frame(&[3, 0x11, 0x22, 0, 0, 0, 0, 5])
        .unwrap();
    assert_eq!(decoded.multiplexer_value, Some(3));
    assert!(matches!(
        decoded.multiplex_error,
        Some(CodecError::MultiplexDispatchMiss { value: 3, .. })
    ));
    assert_eq!(decoded.signal("Counter").unwrap().value, 5.0);
    assert_eq!(decoded.signal("Mode").unwrap().value, 3.0);
    assert!(decoded.signal("B").is_none());

    let mut record = codec.new_record();
    codec.encode_signal(&mut record, "Mode", 3.0).unwrap();
    assert!(matches!(
        codec.pack(&record),
        Err(CodecError::MultiplexDispatchMiss { value: 3, .. })
    ));
}

#[test]
fn test_database_dispatch_by_id() {
    let compiled = Compiler::new()
        .compile(Database::new(vec![multiplexed_status(), vehicle_speed()]))
        .unwrap();
    assert_eq!(compiled.ids(), vec![0x100, 0x200]);

    let mut record = compiled.new_record(0x100).unwrap();
    compiled
        .message(0x100)
        .unwrap()
        .encode_signal(&mut record, "Speed", 1.0)
        .unwrap();
    let frame = compiled.pack_message(&record).unwrap();
    assert_eq!(frame[0], 10);

    let mut unpacked = compiled.new_record(0x100).unwrap();
    compiled.unpack_message(0x100, &frame, &mut unpacked).unwrap();
    assert_eq!(unpacked, record);

    assert_eq!(
        compiled.decode_frame(0x7FF, &frame),
        Err(CodecError::UnknownMessage(0x7FF))
    );
    assert!(matches!(
        compiled.unpack_message(0x200, &frame, &mut unpacked),
        Err(CodecError::RecordMismatch { .. })
    ));
    assert!(matches!(
        compiled.decode_frame(0x100, &frame[..4]),
        Err(CodecError::FrameTooShort { expected: 8, actual: 4, .. })
    ));
}

#[test]
fn test_configuration_error_policies() {
    let broken = Message::new(
        0x50,
        "Broken",
        8,
        vec![Signal::new("Zero", 0, 8).with_scaling(0.0, 0.0)],
    );
    let database = Database::new(vec![vehicle_speed(), broken]);

    let err = Compiler::new().compile(database.clone()).unwrap_err();
    assert!(matches!(
        err,
        CompileError::Configuration(ConfigurationError::InvalidScaling { .. })
    ));

    let lenient = Compiler::with_config(CompilerConfig::new().with_abort_on_error(false));
    let compiled = lenient.compile(database).unwrap();
    assert_eq!(compiled.ids(), vec![0x100]);
    assert_eq!(compiled.rejected.len(), 1);
    assert_eq!(compiled.rejected[0].id, 0x50);
    assert_eq!(compiled.rejected[0].name, "Broken");
}

#[test]
fn test_dbc_to_frames() {
    init_logging();
    let dbc_content = r#"
VERSION ""

NS_ :

BS_:

BU_: ECU1 ECU2

BO_ 291 EngineData: 8 ECU1
 SG_ EngineSpeed : 0|16@1+ (1,0) [0|8000] "rpm" ECU2
 SG_ EngineTemp : 16|8@1+ (1,-40) [-40|215] "C" ECU2
"#;

    let database = parse_dbc(dbc_content.as_bytes()).unwrap();
    let compiled = Compiler::new().compile(database).unwrap();
    let codec = compiled.message_by_name("EngineData").unwrap();
    assert_eq!(codec.qualified_name, "can_0x123_EngineData");

    let frame = codec
        .encode(&[("EngineSpeed", 3000.0), ("EngineTemp", 90.0)])
        .unwrap();
    assert_eq!(frame[..3], [0xB8, 0x0B, 130]);

    let decoded = compiled.decode_frame(291, &frame).unwrap();
    assert_eq!(decoded.signal("EngineSpeed").unwrap().value, 3000.0);
    assert_eq!(decoded.signal("EngineTemp").unwrap().value, 90.0);
}

#[test]
fn test_dbc_float_signal_on_the_wire() {
    let dbc_content = r#"
VERSION ""

NS_ :

BS_:

BU_: ECU1

BO_ 256 Sensor: 8 ECU1
 SG_ Pressure : 0|32@1+ (1,0) [0|0] "bar" ECU1

SIG_VALTYPE_ 256 Pressure : 1;
"#;

    let compiled = Compiler::new()
        .compile(parse_dbc(dbc_content.as_bytes()).unwrap())
        .unwrap();
    assert!(compiled.uses_float);

    let codec = compiled.message(256).unwrap();
    assert_eq!(codec.signal("Pressure").unwrap().float_width, 32);

    let frame = codec.encode(&[("Pressure", 1.5)]).unwrap();
    assert_eq!(frame, [0x00, 0x00, 0xC0, 0x3F, 0, 0, 0, 0]);
    assert_eq!(compiled.decode_frame(256, &frame).unwrap().signals[0].value, 1.5);
}
