//! STF Trace - Instruction trace model and reader
//!
//! This crate holds everything the checker consumes from the outside world:
//! the trace data structures, a lazy reader over JSON-lines trace files and
//! an opcode classifier.
//!
//! # Overview
//!
//! A trace consists of:
//!
//! * A header with generator/version records, declared feature flags and the
//!   initial instruction encoding mode
//! * A stream of instruction records, each carrying its memory accesses,
//!   operands, events, thread identity and embedded page-table entries
//!
//! # Usage
//!
//! ```no_run
//! use stf_trace::{Decoder, RiscvDecoder, TraceReader};
//!
//! let reader = TraceReader::open("program.stf.jsonl").unwrap();
//! let decoder = RiscvDecoder::new(reader.initial_iem());
//! for record in reader {
//!     let record = record.unwrap();
//!     let decoded = decoder.decode(record.opcode);
//!     println!("{:#x} load={}", record.pc, decoded.is_load());
//! }
//! ```

pub mod decoder;
pub mod error;
pub mod reader;
pub mod trace;

pub use decoder::{DecodedOpcode, Decoder, RiscvDecoder};
pub use error::{GeneratorError, TraceError};
pub use reader::TraceReader;
pub use trace::{
    AccessKind, Event, EventKind, Iem, InstructionRecord, MemoryAccess, Operand, OperandRole,
    PageTableEntry, Register, ThreadIdentity, TraceFeature, TraceFeatures, TraceGenerator,
    TraceHeader, TraceInfo,
};

/// Result type for trace reading operations
pub type Result<T> = std::result::Result<T, TraceError>;
