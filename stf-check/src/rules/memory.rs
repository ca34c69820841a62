//! Memory access rules
//!
//! The missing-access rules look at the previous record of the thread, whose
//! events are final by the time the next record of that thread arrives. The
//! integrity rule and the PTE tally look at the current record.

use crate::error_code::ErrorCode;
use crate::rules::{InstructionRule, RulePhase, ScanCounters, Step, Violation, INDEX_WIDTH};

/// Total access size at or below which split accesses count as inefficient
const PACKABLE_ACCESS_BYTES: u64 = 4;

/// Flags loads that recorded no load access
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingLoadRule;

impl InstructionRule for MissingLoadRule {
    fn name(&self) -> &'static str {
        "missing-load"
    }

    fn phase(&self) -> RulePhase {
        RulePhase::Previous
    }

    fn check(&self, step: &Step<'_>, _counters: &mut ScanCounters) -> Vec<Violation> {
        let Some((prev, decoded)) = step.previous_decoded() else {
            return Vec::new();
        };
        if !decoded.is_load() || prev.memory_reads().next().is_some() || !prev.events.is_empty() {
            return Vec::new();
        }
        // A vector load with VL == 0 legitimately performs no access
        if prev.is_vl_zero() {
            return Vec::new();
        }
        vec![Violation::new(
            ErrorCode::MissMemLoad,
            format!(
                "{:<width$} Load instruction missing memory access record in stf.",
                prev.index,
                width = INDEX_WIDTH
            ),
        )]
    }
}

/// Flags stores that recorded no store access
///
/// Atomics are exempt: a failed store-conditional writes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingStoreRule;

impl InstructionRule for MissingStoreRule {
    fn name(&self) -> &'static str {
        "missing-store"
    }

    fn phase(&self) -> RulePhase {
        RulePhase::Previous
    }

    fn check(&self, step: &Step<'_>, _counters: &mut ScanCounters) -> Vec<Violation> {
        let Some((prev, decoded)) = step.previous_decoded() else {
            return Vec::new();
        };
        if !decoded.is_store()
            || decoded.is_atomic()
            || prev.memory_writes().next().is_some()
            || !prev.events.is_empty()
        {
            return Vec::new();
        }
        if prev.is_vl_zero() {
            return Vec::new();
        }
        vec![Violation::new(
            ErrorCode::MissMemStore,
            format!(
                "{:<width$} Store instruction missing memory access record in stf.",
                prev.index,
                width = INDEX_WIDTH
            ),
        )]
    }
}

/// Checks each access of the current record
///
/// Also tallies physical-address evidence and split accesses for the
/// aggregate checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryAccessRule {
    print_zero_address: bool,
}

impl MemoryAccessRule {
    /// `print_zero_address` controls whether zero-address accesses emit a
    /// diagnostic; they are counted regardless.
    pub fn new(print_zero_address: bool) -> Self {
        Self { print_zero_address }
    }
}

impl InstructionRule for MemoryAccessRule {
    fn name(&self) -> &'static str {
        "memory-access"
    }

    fn check(&self, step: &Step<'_>, counters: &mut ScanCounters) -> Vec<Violation> {
        let inst = step.current;
        let mut violations = Vec::new();
        let mut total_bytes: u64 = 0;

        if inst.phys_pc.is_some() {
            counters.physical_pcs += 1;
        }

        for access in &inst.memory_accesses {
            total_bytes += u64::from(access.size);

            if access.address == 0 {
                let message = format!(
                    "Instruction memory record points to vaddr 0 at instruction #{} pc value: {:#018x}",
                    inst.index, inst.pc
                );
                violations.push(if self.print_zero_address {
                    Violation::new(ErrorCode::MemPointToZero, message)
                } else {
                    Violation::quiet(ErrorCode::MemPointToZero, message)
                });
            }

            if access.attr == 0 {
                violations.push(Violation::new(
                    ErrorCode::MemAttr,
                    format!(
                        "The Instruction accesses memory. But there is no memory access attribute record at instruction index {}",
                        inst.index
                    ),
                ));
            }

            if access.is_phys_addr_valid() {
                counters.physical_addresses += 1;
            }
        }

        if total_bytes <= PACKABLE_ACCESS_BYTES && inst.memory_accesses.len() > 1 {
            counters.inefficient_accesses += 1;
        }

        violations
    }
}

/// Tallies embedded page-table entries; never reports on its own
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedPteRule;

impl InstructionRule for EmbeddedPteRule {
    fn name(&self) -> &'static str {
        "embedded-pte"
    }

    fn check(&self, step: &Step<'_>, counters: &mut ScanCounters) -> Vec<Violation> {
        counters.embedded_ptes += step.current.embedded_ptes.len() as u64;
        Vec::new()
    }
}
