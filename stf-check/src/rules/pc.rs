//! PC alignment rule

use crate::error_code::ErrorCode;
use crate::rules::{InstructionRule, ScanCounters, Step, Violation};

/// Flags program counters with the low bit set
///
/// The code depends on the encoding width of the offending record.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcAlignmentRule;

impl InstructionRule for PcAlignmentRule {
    fn name(&self) -> &'static str {
        "pc-alignment"
    }

    fn check(&self, step: &Step<'_>, _counters: &mut ScanCounters) -> Vec<Violation> {
        let inst = step.current;
        if inst.pc & 1 == 0 {
            return Vec::new();
        }
        let code = if inst.is_opcode16() {
            ErrorCode::InvalidPc16
        } else {
            ErrorCode::InvalidPc32
        };
        vec![Violation::new(
            code,
            format!(
                "Invalid pc value found at instruction #{} pc value: {:#018x}",
                inst.index, inst.pc
            ),
        )]
    }
}
