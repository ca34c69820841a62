//! Error ledger
//!
//! Counts violations per [`ErrorCode`], applies the suppression set and the
//! continue/fail-fast policy, and keeps the evolving [`ReturnStatus`].

use crate::error_code::{ErrorCode, ReturnStatus};
use std::collections::BTreeSet;
use std::fmt;
use std::io::{self, Write};

/// Diagnostic text built for one violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub text: String,
    /// Suppressed diagnostics are built but never emitted
    pub suppressed: bool,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stf_check: ERROR {} ({}): {}",
            self.code.value(),
            self.code.name(),
            self.text
        )
    }
}

/// Per-run violation bookkeeping
pub struct ErrorLedger {
    counts: [u64; ErrorCode::COUNT],
    ignored: BTreeSet<ErrorCode>,
    continue_on_error: bool,
    status: ReturnStatus,
    emitted: Vec<Diagnostic>,
    sink: Option<Box<dyn Write>>,
}

impl ErrorLedger {
    /// Create a fail-fast ledger that suppresses the given codes
    pub fn new(ignored: impl IntoIterator<Item = ErrorCode>) -> Self {
        Self {
            counts: [0; ErrorCode::COUNT],
            ignored: ignored.into_iter().collect(),
            continue_on_error: false,
            status: ReturnStatus::Pass,
            emitted: Vec::new(),
            sink: None,
        }
    }

    /// Also write every emitted diagnostic line to `sink`
    pub fn with_sink(mut self, sink: impl Write + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn set_continue_on_error(&mut self, continue_on_error: bool) {
        self.continue_on_error = continue_on_error;
    }

    pub fn continue_on_error(&self) -> bool {
        self.continue_on_error
    }

    pub fn is_suppressed(&self, code: ErrorCode) -> bool {
        self.ignored.contains(&code)
    }

    /// Record one occurrence of `code`
    ///
    /// Returns false when the code is suppressed, in which case nothing
    /// changes.
    pub fn count_error(&mut self, code: ErrorCode) -> bool {
        if self.is_suppressed(code) {
            return false;
        }

        self.counts[code.slot()] += 1;

        self.status = match self.status {
            ReturnStatus::Pass => ReturnStatus::Failed(code),
            ReturnStatus::Failed(first) if first != code && self.continue_on_error => {
                ReturnStatus::MultipleErrors
            }
            status => status,
        };
        true
    }

    /// Build the diagnostic for `code`
    ///
    /// The text is always built and returned; it is only emitted when the
    /// code is not suppressed.
    pub fn report_error(&mut self, code: ErrorCode, message: impl fmt::Display) -> Diagnostic {
        let diagnostic = Diagnostic {
            code,
            text: message.to_string(),
            suppressed: self.is_suppressed(code),
        };

        if !diagnostic.suppressed {
            if let Some(sink) = self.sink.as_mut() {
                if let Err(e) = writeln!(sink, "{}", diagnostic) {
                    tracing::warn!("Failed to write diagnostic: {}", e);
                }
            }
            self.emitted.push(diagnostic.clone());
        }

        diagnostic
    }

    /// Fail-fast runs stop once any violation has been recorded
    pub fn should_halt(&self) -> bool {
        !self.continue_on_error && !self.status.is_pass()
    }

    pub fn error_count(&self, code: ErrorCode) -> u64 {
        self.counts[code.slot()]
    }

    /// Non-zero counters in code order
    pub fn error_counts(&self) -> impl Iterator<Item = (ErrorCode, u64)> + '_ {
        ErrorCode::ALL
            .iter()
            .map(|&code| (code, self.counts[code.slot()]))
            .filter(|&(_, count)| count > 0)
    }

    /// One formatted line per non-zero counter
    pub fn error_count_lines(&self) -> impl Iterator<Item = String> + '_ {
        self.error_counts()
            .map(|(code, count)| format!("{:<18} ({:>2}): {}", code.name(), code.value(), count))
    }

    /// Print one line per non-zero counter
    pub fn print_error_counts(&self, out: &mut dyn Write) -> io::Result<()> {
        for line in self.error_count_lines() {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }

    pub fn return_status(&self) -> ReturnStatus {
        self.status
    }

    pub fn set_return_status(&mut self, status: ReturnStatus) {
        self.status = status;
    }

    /// Diagnostics emitted so far, in order
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.emitted
    }
}

impl Default for ErrorLedger {
    fn default() -> Self {
        Self::new(std::iter::empty())
    }
}

impl fmt::Debug for ErrorLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorLedger")
            .field("counts", &self.error_counts().collect::<Vec<_>>())
            .field("ignored", &self.ignored)
            .field("continue_on_error", &self.continue_on_error)
            .field("status", &self.status)
            .finish()
    }
}
