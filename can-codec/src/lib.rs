//! CAN Codec Compiler Library
//!
//! Derives, from a bus database, the exact bit-level operations needed to
//! serialize physical signal values into CAN frame bytes and back.
//!
//! # Architecture
//!
//! - The database model (messages and signals) comes from an external parser;
//!   a DBC adapter over `can-dbc` is provided
//! - The compiler sorts the database into a deterministic layout and derives
//!   one codec descriptor per signal: lane, shift, mask, sign extension,
//!   IEEE-754 format, scaling and range
//! - Multiplexed signals are grouped into a keyed dispatch table
//! - Descriptors are serializable for external code emitters, and a reference
//!   runtime executes them directly
//!
//! # Example Usage
//!
//! ```
//! use can_codec::{Compiler, Database, Message, Signal};
//!
//! let speed = Signal::new("Speed", 0, 16)
//!     .with_scaling(0.1, 0.0)
//!     .with_range(0.0, 6553.5)
//!     .with_units("km/h");
//! let db = Database::new(vec![Message::new(0x100, "Vehicle", 8, vec![speed])]);
//!
//! let compiled = Compiler::new().compile(db).unwrap();
//! let codec = compiled.message(0x100).unwrap();
//!
//! let frame = codec.encode(&[("Speed", 100.0)]).unwrap();
//! assert_eq!(frame, [0xE8, 0x03, 0, 0, 0, 0, 0, 0]);
//!
//! let decoded = codec.decode_frame(&frame).unwrap();
//! assert_eq!(decoded.signal("Speed").unwrap().value, 100.0);
//! ```

// Public modules
pub mod codec;
pub mod compiler;
pub mod config;
pub mod descriptor;
pub mod message_codec;
pub mod signals;
pub mod types;

// Re-export main types for convenience
pub use codec::FloatFormat;
pub use compiler::Compiler;
pub use config::{CompilerConfig, OverlapPolicy};
pub use descriptor::{
    CompiledDatabase, LaneUsage, MessageCodec, MultiplexDescriptor, RejectedMessage, SignalCodec,
};
pub use message_codec::MessageRecord;
pub use signals::dbc::parse_dbc;
pub use signals::{Database, DatabaseStats, Endianness, Message, Signal};
pub use types::{
    CodecError, CompileError, ConfigurationError, DecodedMessage, DecodedSignal, Result,
    StorageType, StorageValue,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
