//! Per-instruction rules
//!
//! Defines the trait implemented by every per-instruction check and the
//! ordered default catalog evaluated by the scanner.

use crate::error_code::ErrorCode;
use stf_trace::{DecodedOpcode, Decoder, InstructionRecord};

pub mod control;
pub mod memory;
pub mod opcode;
pub mod pc;

pub use control::{BranchTargetRule, PrivilegeSwitchRule};
pub use memory::{EmbeddedPteRule, MemoryAccessRule, MissingLoadRule, MissingStoreRule};
pub use opcode::{DecodeFailureRule, InvalidOpcodeRule};
pub use pc::PcAlignmentRule;

/// Width used when an instruction index leads a diagnostic
pub(crate) const INDEX_WIDTH: usize = 12;

/// Everything a rule may look at for one scan step
#[derive(Debug, Clone, Copy)]
pub struct Step<'a> {
    /// Record being scanned
    pub current: &'a InstructionRecord,
    /// Previous record of the same thread, None on the thread's first record
    pub previous: Option<&'a InstructionRecord>,
    /// Classification of the previous record's opcode
    pub decoded_previous: Option<DecodedOpcode>,
    /// Classification of the current record's opcode
    pub decoded_current: DecodedOpcode,
    /// The thread identity changed since the prior step
    pub thread_switch: bool,
}

impl<'a> Step<'a> {
    pub fn new(
        current: &'a InstructionRecord,
        previous: Option<&'a InstructionRecord>,
        thread_switch: bool,
        decoder: &impl Decoder,
    ) -> Self {
        Self {
            current,
            previous,
            decoded_previous: previous.map(|p| decoder.decode(p.opcode)),
            decoded_current: decoder.decode(current.opcode),
            thread_switch,
        }
    }

    /// Previous record together with its classification
    pub fn previous_decoded(&self) -> Option<(&'a InstructionRecord, DecodedOpcode)> {
        self.previous.zip(self.decoded_previous)
    }

    /// Previous record for rules that only apply within one thread's run
    pub fn previous_in_sequence(&self) -> Option<(&'a InstructionRecord, DecodedOpcode)> {
        if self.thread_switch {
            None
        } else {
            self.previous_decoded()
        }
    }
}

/// Counters accumulated over the whole scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanCounters {
    /// Records scanned
    pub instructions: u64,
    /// Embedded page-table entries seen
    pub embedded_ptes: u64,
    /// Memory accesses carrying a physical address
    pub physical_addresses: u64,
    /// Records carrying a physical PC
    pub physical_pcs: u64,
    /// Records whose accesses fit in 4 bytes but were split
    pub inefficient_accesses: u64,
    /// Some record executed in 64-bit encoding mode
    pub has_rv64: bool,
}

/// A violation found by a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub code: ErrorCode,
    pub message: String,
    /// Whether the diagnostic should be emitted; the violation is counted either way
    pub announce: bool,
}

impl Violation {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            announce: true,
        }
    }

    /// A violation that is counted without emitting a diagnostic
    pub fn quiet(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            announce: false,
            ..Self::new(code, message)
        }
    }
}

/// When in a step a rule runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulePhase {
    /// Checks the previous record of the thread; runs before the index ceiling
    Previous,
    /// Checks the current record; runs only for records within the ceiling
    Current,
}

/// A check evaluated once per scanned record
///
/// Rules never touch the ledger. They return violations and may bump the
/// scan counters, which keeps each rule testable in isolation.
pub trait InstructionRule {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn phase(&self) -> RulePhase {
        RulePhase::Current
    }

    /// Evaluate the rule for one step
    fn check(&self, step: &Step<'_>, counters: &mut ScanCounters) -> Vec<Violation>;
}

/// The rule catalog in evaluation order
pub fn default_rules(print_zero_address: bool) -> Vec<Box<dyn InstructionRule>> {
    vec![
        Box::new(DecodeFailureRule),
        Box::new(MissingLoadRule),
        Box::new(MissingStoreRule),
        Box::new(InvalidOpcodeRule),
        Box::new(PcAlignmentRule),
        Box::new(MemoryAccessRule::new(print_zero_address)),
        Box::new(EmbeddedPteRule),
        Box::new(BranchTargetRule),
        Box::new(PrivilegeSwitchRule),
    ]
}
