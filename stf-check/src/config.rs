//! Checker configuration

use crate::error_code::ErrorCode;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Options controlling a checker run
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Keep scanning after the first violation
    pub continue_on_error: bool,
    /// Emit a diagnostic for every access to virtual address zero
    pub print_memory_zero_warnings: bool,
    /// Print the embedded PTE and physical address tallies at the end
    pub print_info: bool,
    /// Cross-check the physical-address feature flag
    pub check_phys_addr: bool,
    /// Stop after the instruction with this index (0 scans everything)
    pub end_inst: u64,
    /// Print per-code counts even in fail-fast mode
    pub always_print_error_counts: bool,
    /// Codes that are neither counted nor reported
    pub ignored_errors: BTreeSet<ErrorCode>,
    /// Trace to check
    pub trace_filename: PathBuf,
}

impl CheckConfig {
    /// Default configuration for checking `trace_filename`
    pub fn new(trace_filename: impl Into<PathBuf>) -> Self {
        Self {
            trace_filename: trace_filename.into(),
            ..Self::default()
        }
    }

    /// Instruction index ceiling, if one is configured
    pub fn end_index(&self) -> Option<u64> {
        (self.end_inst > 0).then_some(self.end_inst)
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            continue_on_error: false,
            print_memory_zero_warnings: false,
            print_info: false,
            check_phys_addr: true,
            end_inst: 0,
            always_print_error_counts: false,
            ignored_errors: BTreeSet::new(),
            trace_filename: PathBuf::new(),
        }
    }
}
