//! Per-thread "previous instruction" tracking

use std::collections::HashMap;
use stf_trace::{InstructionRecord, ThreadIdentity};

/// Most recent record seen for each simulated thread
///
/// Holds one record per [`ThreadIdentity`]; storing a new record for an
/// identity drops the old one.
#[derive(Debug, Default)]
pub struct ThreadContextTracker {
    previous: HashMap<ThreadIdentity, InstructionRecord>,
    last_identity: Option<ThreadIdentity>,
}

impl ThreadContextTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Previous record of `identity`, or None on its first record
    pub fn previous(&self, identity: &ThreadIdentity) -> Option<&InstructionRecord> {
        self.previous.get(identity)
    }

    /// Whether a step for `identity` differs from the prior step's thread
    ///
    /// The first step of a trace is never a switch.
    pub fn is_thread_switch(&self, identity: &ThreadIdentity) -> bool {
        self.last_identity
            .map(|last| last != *identity)
            .unwrap_or(false)
    }

    /// Store `instruction` as the latest record of `identity`
    ///
    /// Must run after every rule of the step has read the previous value.
    pub fn record(&mut self, identity: ThreadIdentity, instruction: InstructionRecord) {
        self.last_identity = Some(identity);
        self.previous.insert(identity, instruction);
    }

    /// Number of distinct threads seen
    pub fn thread_count(&self) -> usize {
        self.previous.len()
    }
}
