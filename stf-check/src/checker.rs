//! Single-pass trace scanner
//!
//! Owns the per-run state (ledger, thread tracker, counters) and drives the
//! checks in order: header, per-instruction rules, aggregate checks.

use crate::aggregate;
use crate::config::CheckConfig;
use crate::ledger::ErrorLedger;
use crate::rules::{default_rules, InstructionRule, RulePhase, ScanCounters, Step, Violation};
use crate::tracker::ThreadContextTracker;
use crate::verdict::Verdict;
use std::io::Write;
use std::ops::ControlFlow;
use stf_trace::{Decoder, Iem, InstructionRecord, TraceError, TraceHeader};

/// Count a violation and emit its diagnostic
///
/// Breaks when the ledger policy says the run must stop.
fn record_violation(ledger: &mut ErrorLedger, violation: &Violation) -> ControlFlow<()> {
    ledger.count_error(violation.code);
    if violation.announce {
        ledger.report_error(violation.code, &violation.message);
    }
    if ledger.should_halt() {
        ControlFlow::Break(())
    } else {
        ControlFlow::Continue(())
    }
}

fn record_all(ledger: &mut ErrorLedger, violations: &[Violation]) -> ControlFlow<()> {
    for violation in violations {
        record_violation(ledger, violation)?;
    }
    ControlFlow::Continue(())
}

/// Trace checker for one run
pub struct TraceChecker<D> {
    config: CheckConfig,
    decoder: D,
    rules: Vec<Box<dyn InstructionRule>>,
    ledger: ErrorLedger,
    tracker: ThreadContextTracker,
    counters: ScanCounters,
    iem: Iem,
}

impl<D: Decoder> TraceChecker<D> {
    /// Create a checker with the default rule catalog
    pub fn new(config: CheckConfig, decoder: D, initial_iem: Iem) -> Self {
        let mut ledger = ErrorLedger::new(config.ignored_errors.iter().copied());
        ledger.set_continue_on_error(config.continue_on_error);
        let rules = default_rules(config.print_memory_zero_warnings);

        Self {
            config,
            decoder,
            rules,
            ledger,
            tracker: ThreadContextTracker::new(),
            counters: ScanCounters::default(),
            iem: initial_iem,
        }
    }

    /// Write emitted diagnostics to `sink` as they are reported
    pub fn with_diagnostic_sink(mut self, sink: impl Write + 'static) -> Self {
        self.ledger = self.ledger.with_sink(sink);
        self
    }

    /// Check a whole trace and assemble the verdict
    ///
    /// Content violations end up in the verdict. An `Err` means the trace
    /// could not be read at all.
    pub fn run<I>(mut self, header: &TraceHeader, records: I) -> Result<Verdict, TraceError>
    where
        I: IntoIterator<Item = Result<InstructionRecord, TraceError>>,
    {
        tracing::info!(
            "Checking trace (continue_on_error={}, end_inst={})",
            self.config.continue_on_error,
            self.config.end_inst
        );

        let mut flow = record_all(&mut self.ledger, &aggregate::check_header(header));

        if flow.is_continue() {
            flow = self.scan(records)?;
            tracing::info!(
                "Scanned {} instructions across {} thread(s)",
                self.counters.instructions,
                self.tracker.thread_count()
            );
        }

        if flow.is_continue() {
            let violations =
                aggregate::check_all(header, &self.counters, self.config.check_phys_addr);
            flow = record_all(&mut self.ledger, &violations);
        }

        let halted = flow.is_break();
        if halted {
            tracing::debug!("Stopped at first violation: {:?}", self.ledger.return_status());
        }

        Ok(Verdict::assemble(
            self.ledger,
            self.counters,
            &self.config,
            header,
            halted,
        ))
    }

    fn scan<I>(&mut self, records: I) -> Result<ControlFlow<()>, TraceError>
    where
        I: IntoIterator<Item = Result<InstructionRecord, TraceError>>,
    {
        let end_index = self.config.end_index();

        for record in records {
            let record = record?;
            self.counters.instructions += 1;

            let identity = record.thread_identity();
            let thread_switch = self.tracker.is_thread_switch(&identity);

            let previous = self.tracker.previous(&identity);
            let step = Step::new(&record, previous, thread_switch, &self.decoder);
            for rule in self.rules.iter().filter(|r| r.phase() == RulePhase::Previous) {
                let violations = rule.check(&step, &mut self.counters);
                if record_all(&mut self.ledger, &violations).is_break() {
                    tracing::debug!("Rule {} stopped the scan at {}", rule.name(), record.index);
                    return Ok(ControlFlow::Break(()));
                }
            }

            if end_index.is_some_and(|end| record.index > end) {
                tracing::debug!("Reached end instruction at index {}", record.index);
                break;
            }

            if let Some(iem) = record.iem {
                self.iem = iem;
                self.decoder.set_iem(iem);
            }
            if self.iem == Iem::Rv64 {
                self.counters.has_rv64 = true;
            }

            // Only the current record follows the new mode
            let step = Step {
                decoded_current: self.decoder.decode(record.opcode),
                ..step
            };
            for rule in self.rules.iter().filter(|r| r.phase() == RulePhase::Current) {
                let violations = rule.check(&step, &mut self.counters);
                if record_all(&mut self.ledger, &violations).is_break() {
                    tracing::debug!("Rule {} stopped the scan at {}", rule.name(), record.index);
                    return Ok(ControlFlow::Break(()));
                }
            }

            self.tracker.record(identity, record);
        }

        Ok(ControlFlow::Continue(()))
    }
}
