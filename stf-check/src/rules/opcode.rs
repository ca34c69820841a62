//! Opcode validity rules

use crate::error_code::ErrorCode;
use crate::rules::{InstructionRule, RulePhase, ScanCounters, Step, Violation, INDEX_WIDTH};

/// Flags records the reader marked as invalid
#[derive(Debug, Clone, Copy, Default)]
pub struct InvalidOpcodeRule;

impl InstructionRule for InvalidOpcodeRule {
    fn name(&self) -> &'static str {
        "invalid-opcode"
    }

    fn check(&self, step: &Step<'_>, _counters: &mut ScanCounters) -> Vec<Violation> {
        let inst = step.current;
        if !inst.invalid {
            return Vec::new();
        }
        vec![Violation::new(
            ErrorCode::InvalidInst,
            format!(
                "{} invalid instruction {:#010x} PC {:#018x}",
                inst.index, inst.opcode, inst.pc
            ),
        )]
    }
}

/// Flags non-faulting instructions the decoder cannot classify
///
/// Evaluated on the previous record of the thread: by then its events are
/// known, and a fault explains an undecodable opcode.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeFailureRule;

impl InstructionRule for DecodeFailureRule {
    fn name(&self) -> &'static str {
        "decode-failure"
    }

    fn phase(&self) -> RulePhase {
        RulePhase::Previous
    }

    fn check(&self, step: &Step<'_>, _counters: &mut ScanCounters) -> Vec<Violation> {
        let Some((prev, decoded)) = step.previous_decoded() else {
            return Vec::new();
        };
        if !decoded.decode_failed() || !prev.events.is_empty() {
            return Vec::new();
        }
        vec![Violation::new(
            ErrorCode::DecoderFailure,
            format!(
                "{:<width$} Failed to decode instruction {:#010x}.",
                prev.index,
                prev.opcode,
                width = INDEX_WIDTH
            ),
        )]
    }
}
