//! Control-flow sequencing rules
//!
//! Both rules compare consecutive records of one thread, so they are skipped
//! whenever the scan just switched threads.

use crate::error_code::ErrorCode;
use crate::rules::{InstructionRule, ScanCounters, Step, Violation, INDEX_WIDTH};

/// Flags unconditional branches that were not marked taken
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchTargetRule;

impl InstructionRule for BranchTargetRule {
    fn name(&self) -> &'static str {
        "branch-target"
    }

    fn check(&self, step: &Step<'_>, _counters: &mut ScanCounters) -> Vec<Violation> {
        let Some((prev, decoded)) = step.previous_in_sequence() else {
            return Vec::new();
        };
        if !decoded.is_branch() || decoded.is_conditional() {
            return Vec::new();
        }
        if !prev.events.is_empty() || prev.is_taken_branch() {
            return Vec::new();
        }
        vec![Violation::new(
            ErrorCode::UncondBranch,
            format!(
                "{:<width$} {:#018x} Unconditional Branch instr does not have PC Target(no event).",
                prev.index,
                prev.pc,
                width = INDEX_WIDTH
            ),
        )]
    }
}

/// Flags a switch to user mode that is not followed by an exception return
#[derive(Debug, Clone, Copy, Default)]
pub struct PrivilegeSwitchRule;

impl InstructionRule for PrivilegeSwitchRule {
    fn name(&self) -> &'static str {
        "privilege-switch"
    }

    fn check(&self, step: &Step<'_>, _counters: &mut ScanCounters) -> Vec<Violation> {
        let Some((prev, _)) = step.previous_in_sequence() else {
            return Vec::new();
        };
        if !prev.is_change_to_user_mode() || step.decoded_current.is_exception_return() {
            return Vec::new();
        }
        let inst = step.current;
        vec![Violation::new(
            ErrorCode::SwitchUser,
            format!(
                "{:<width$} {:#018x} Switch to user mode {:<width$} {:#018x} without sret/mret/instr.",
                prev.index,
                prev.pc,
                inst.index,
                inst.pc,
                width = INDEX_WIDTH
            ),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::*;
    use stf_trace::{Event, EventKind};

    #[test]
    fn test_untaken_jump_is_flagged() {
        let prev = record(0x1000, J);
        let cur = record(0x1004, NOP);
        assert_eq!(
            codes(&run(&BranchTargetRule, &cur, Some(&prev), false)),
            vec![ErrorCode::UncondBranch]
        );
    }

    #[test]
    fn test_taken_jump_passes() {
        let mut prev = record(0x1000, J);
        prev.taken = true;
        let cur = record(0x2000, NOP);
        assert!(run(&BranchTargetRule, &cur, Some(&prev), false).is_empty());
    }

    #[test]
    fn test_conditional_branch_may_fall_through() {
        let prev = record(0x1000, BEQ);
        let cur = record(0x1004, NOP);
        assert!(run(&BranchTargetRule, &cur, Some(&prev), false).is_empty());
    }

    #[test]
    fn test_jump_with_event_passes() {
        let mut prev = record(0x1000, J);
        prev.events.push(Event {
            kind: EventKind::Interrupt,
            data: vec![7],
        });
        let cur = record(0x80, NOP);
        assert!(run(&BranchTargetRule, &cur, Some(&prev), false).is_empty());
    }

    #[test]
    fn test_thread_switch_gates_branch_rule() {
        let prev = record(0x1000, J);
        let cur = record(0x1004, NOP);
        assert!(run(&BranchTargetRule, &cur, Some(&prev), true).is_empty());
    }

    #[test]
    fn test_user_switch_requires_exception_return() {
        let mut prev = record(0x1000, NOP);
        prev.change_to_user_mode = true;

        let cur = record(0x1004, NOP);
        assert_eq!(
            codes(&run(&PrivilegeSwitchRule, &cur, Some(&prev), false)),
            vec![ErrorCode::SwitchUser]
        );

        let xret = record(0x1004, MRET);
        assert!(run(&PrivilegeSwitchRule, &xret, Some(&prev), false).is_empty());
    }

    #[test]
    fn test_switch_is_judged_by_following_record() {
        // An xret that itself carries the user-mode switch is not enough
        let mut xret = record(0x1000, MRET);
        xret.change_to_user_mode = true;
        let user = record(0x4000, NOP);
        assert_eq!(
            codes(&run(&PrivilegeSwitchRule, &user, Some(&xret), false)),
            vec![ErrorCode::SwitchUser]
        );

        let mut switch = record(0x1000, NOP);
        switch.change_to_user_mode = true;
        let next = record(0x1004, MRET);
        assert!(run(&PrivilegeSwitchRule, &next, Some(&switch), false).is_empty());
    }

    #[test]
    fn test_thread_switch_gates_privilege_rule() {
        let mut prev = record(0x1000, NOP);
        prev.change_to_user_mode = true;
        let cur = record(0x1004, NOP);
        assert!(run(&PrivilegeSwitchRule, &cur, Some(&prev), true).is_empty());
        assert!(run(&PrivilegeSwitchRule, &cur, None, false).is_empty());
    }
}
