//! The contractual output log.
//!
//! Protocol events (`b`, `d`, and decision lines) are queued in memory
//! and written to the output file in batches by the flush worker; the
//! final flush during teardown makes the file complete before exit.
//! This log is deliberately separate from `tracing` diagnostics: its
//! line format is part of the protocol contract.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use concord_consensus::ProtocolLog;
use concord_types::{MsgSeq, ProcessId, Proposal};

use crate::error::NodeError;

pub struct EventLog {
    queue: Mutex<Vec<String>>,
    writer: Mutex<BufWriter<File>>,
}

impl EventLog {
    /// Create (truncating) the output file. Failure here is fatal for
    /// the process.
    pub fn create(path: &Path) -> Result<Self, NodeError> {
        let file = File::create(path).map_err(|source| NodeError::OutputFile {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self {
            queue: Mutex::new(Vec::new()),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    fn record(&self, line: String) {
        self.queue.lock().unwrap().push(line);
    }

    /// Swap out the queued lines and write them in one buffered batch.
    pub fn flush(&self) -> Result<(), NodeError> {
        let lines = std::mem::take(&mut *self.queue.lock().unwrap());
        let mut writer = self.writer.lock().unwrap();
        for line in lines {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Queued lines not yet written; used by tests and diagnostics.
    pub fn queued(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

impl ProtocolLog for EventLog {
    fn log_broadcast(&self, seq: MsgSeq) {
        self.record(format!("b {seq}"));
    }

    fn log_delivery(&self, origin: ProcessId, seq: MsgSeq) {
        self.record(format!("d {origin} {seq}"));
    }

    fn log_decision(&self, values: &BTreeSet<Proposal>) {
        let rendered: Vec<String> = values.iter().map(u32::to_string).collect();
        self.record(rendered.join(" "));
    }
}
