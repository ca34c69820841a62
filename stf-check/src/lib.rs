//! STF Check - Consistency checker for instruction traces
//!
//! Scans a trace once, applies a fixed catalog of per-instruction rules and
//! a handful of post-scan checks, and classifies every violation into a
//! stable error taxonomy whose numeric values double as process exit codes.
//!
//! # Architecture
//!
//! * [`tracker`] remembers the previous record of every simulated thread
//! * [`rules`] holds the per-instruction checks, one type per rule
//! * [`aggregate`] compares header feature flags with what the scan saw
//! * [`ledger`] counts violations and applies the fail-fast policy
//! * [`checker`] drives a run and [`verdict`] turns it into an exit status

pub mod aggregate;
pub mod checker;
pub mod config;
pub mod error_code;
pub mod ledger;
pub mod rules;
pub mod tracker;
pub mod verdict;

pub use checker::TraceChecker;
pub use config::CheckConfig;
pub use error_code::{ErrorCode, ReturnStatus};
pub use ledger::{Diagnostic, ErrorLedger};
pub use rules::{InstructionRule, ScanCounters, Violation};
pub use tracker::ThreadContextTracker;
pub use verdict::Verdict;

use anyhow::Context;
use stf_trace::{RiscvDecoder, TraceReader};

/// Result type for high-level checker operations
pub type Result<T> = anyhow::Result<T>;

/// Exit status used when the trace cannot be read at all
pub const FATAL_EXIT_CODE: u8 = 254;

/// Check the trace named by `config`
///
/// Diagnostics are written to stderr as they are found; the returned
/// verdict carries the report and exit status.
pub fn check_trace(config: &CheckConfig) -> Result<Verdict> {
    let path = &config.trace_filename;
    tracing::info!("Checking trace file {}", path.display());

    let reader = TraceReader::open(path)
        .with_context(|| format!("Failed to open trace: {}", path.display()))?;
    let header = reader.header().clone();
    let decoder = RiscvDecoder::new(reader.initial_iem());

    let verdict = TraceChecker::new(config.clone(), decoder, header.iem)
        .with_diagnostic_sink(std::io::stderr())
        .run(&header, reader)
        .with_context(|| format!("Failed to read trace: {}", path.display()))?;

    Ok(verdict)
}
