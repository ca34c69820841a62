//! Sequential trace reader
//!
//! Traces are stored as JSON lines: the first non-blank line is the
//! [`TraceHeader`], every following non-blank line is one
//! [`InstructionRecord`]. Records are parsed on demand, so the reader can be
//! pulled one instruction at a time over arbitrarily long traces.

use crate::error::TraceError;
use crate::trace::{Iem, InstructionRecord, TraceHeader};
use crate::Result;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Lazy reader over a JSON-lines trace
#[derive(Debug)]
pub struct TraceReader<R> {
    header: TraceHeader,
    lines: std::io::Lines<R>,
    line_no: usize,
    next_index: u64,
}

impl TraceReader<BufReader<File>> {
    /// Open a trace file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Opening trace {}", path.display());
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: BufRead> TraceReader<R> {
    /// Create a reader and consume the header line
    pub fn new(input: R) -> Result<Self> {
        let mut lines = input.lines();
        let mut line_no = 0;

        let header_line = loop {
            match lines.next() {
                Some(line) => {
                    line_no += 1;
                    let line = line?;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Err(TraceError::MissingHeader),
            }
        };

        let header: TraceHeader =
            serde_json::from_str(&header_line).map_err(TraceError::MalformedHeader)?;

        tracing::debug!(
            "Trace header: {} info record(s), features {:#x}, initial mode {:?}",
            header.trace_info.len(),
            header.features.bits(),
            header.iem
        );

        Ok(Self {
            header,
            lines,
            line_no,
            next_index: 1,
        })
    }

    /// Header metadata read before the first instruction
    pub fn header(&self) -> &TraceHeader {
        &self.header
    }

    /// Encoding mode the trace starts in
    pub fn initial_iem(&self) -> Iem {
        self.header.iem
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<InstructionRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            let result = serde_json::from_str::<InstructionRecord>(&line)
                .map(|mut record| {
                    record.index = self.next_index;
                    self.next_index += 1;
                    record
                })
                .map_err(|source| TraceError::MalformedRecord {
                    line: self.line_no,
                    source,
                });
            return Some(result);
        }
    }
}
