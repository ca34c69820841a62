//! Verdict assembly
//!
//! Turns the final ledger state into an exit status and the report printed
//! on stdout.

use crate::config::CheckConfig;
use crate::error_code::{ErrorCode, ReturnStatus};
use crate::ledger::{Diagnostic, ErrorLedger};
use crate::rules::ScanCounters;
use std::io::{self, Write};
use stf_trace::TraceHeader;

/// Final outcome of a checker run
#[derive(Debug)]
pub struct Verdict {
    ledger: ErrorLedger,
    counters: ScanCounters,
    halted: bool,
    report: Vec<String>,
}

impl Verdict {
    /// Consume the ledger and build the report
    pub fn assemble(
        mut ledger: ErrorLedger,
        counters: ScanCounters,
        config: &CheckConfig,
        header: &TraceHeader,
        halted: bool,
    ) -> Self {
        let mut report = trace_info_lines(header);

        if !ledger.continue_on_error() {
            let zero = ledger.error_count(ErrorCode::MemPointToZero);
            if zero > 0 {
                let pct = if counters.instructions > 0 {
                    100.0 * zero as f64 / counters.instructions as f64
                } else {
                    0.0
                };
                report.push(format!(
                    "Warning: {} Memory records point to virtual address zero ({:.2}%)",
                    zero, pct
                ));
            }
        }

        if ledger.return_status() == ReturnStatus::Failed(ErrorCode::PaEqZero) {
            report.push("Trace file had PA == 0 warning".to_string());
            ledger.set_return_status(ReturnStatus::Pass);
        }

        let status = ledger.return_status();
        if status.is_pass() {
            report.push("Trace file passed all consistency checks".to_string());
        } else {
            report.push(format!(
                "Trace file failed consistency checks (exit code {})",
                status.exit_code()
            ));
        }

        if ledger.continue_on_error() || config.always_print_error_counts {
            report.extend(ledger.error_count_lines());
        }

        if config.print_info {
            report.push(format!("{} Embedded PTE entries found", counters.embedded_ptes));
            report.push(format!(
                "{} Physical data addresses found",
                counters.physical_addresses
            ));
            report.push(format!(
                "{} Physical instruction addresses found",
                counters.physical_pcs
            ));
        }

        tracing::info!("Verdict: {:?} (exit code {})", status, status.exit_code());

        Self {
            ledger,
            counters,
            halted,
            report,
        }
    }

    pub fn status(&self) -> ReturnStatus {
        self.ledger.return_status()
    }

    pub fn passed(&self) -> bool {
        self.status().is_pass()
    }

    /// Process exit status for this verdict
    pub fn exit_code(&self) -> u8 {
        self.status().exit_code()
    }

    pub fn error_count(&self, code: ErrorCode) -> u64 {
        self.ledger.error_count(code)
    }

    pub fn counters(&self) -> &ScanCounters {
        &self.counters
    }

    /// The run stopped early on a fail-fast violation
    pub fn halted(&self) -> bool {
        self.halted
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.ledger.diagnostics()
    }

    pub fn ledger(&self) -> &ErrorLedger {
        &self.ledger
    }

    /// Report lines in print order
    pub fn report(&self) -> &[String] {
        &self.report
    }

    pub fn write_report(&self, out: &mut dyn Write) -> io::Result<()> {
        for line in &self.report {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }
}

/// Generator, version, comment and feature bits for each valid info record
fn trace_info_lines(header: &TraceHeader) -> Vec<String> {
    let mut lines = Vec::new();
    for info in &header.trace_info {
        let Ok(generator) = info.generator() else {
            continue;
        };
        lines.push(format!("Trace generator: {}", generator));
        lines.push(format!("Trace generator version: {}", info.version));
        lines.push(format!("Comment: {}", info.comment));
        lines.push(format!("Features: {:#x}", header.features.bits()));
    }
    lines
}
