//! Append-only game log
//!
//! One JSON line per published snapshot. Every run ends with exactly one
//! record marked `is_last`, written whatever the termination reason.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::{PursuitError, Result};
use crate::core::types::{NodeId, Tick};
use crate::engine::game_loop::TerminationReason;
use crate::engine::publish::SnapshotObserver;
use crate::engine::snapshot::TickSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub run_id: Uuid,
    pub time: Tick,
    pub payoff: f64,
    /// Active agents keyed by name
    pub agent_positions: BTreeMap<String, NodeId>,
    pub is_last: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<TerminationReason>,
}

impl LogRecord {
    pub fn from_snapshot(run_id: Uuid, snapshot: &TickSnapshot) -> Self {
        Self {
            run_id,
            time: snapshot.tick,
            payoff: snapshot.payoff,
            agent_positions: snapshot
                .agents
                .iter()
                .map(|a| (a.name.clone(), a.position))
                .collect(),
            is_last: snapshot.is_terminal(),
            reason: snapshot.terminal,
        }
    }
}

/// JSON-lines logger over any writer
#[derive(Debug)]
pub struct GameLog<W: Write + Send> {
    run_id: Uuid,
    writer: W,
    records: usize,
    closed: bool,
}

impl GameLog<BufWriter<File>> {
    /// Log to a new file, truncating any existing one
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send> GameLog<W> {
    pub fn new(writer: W) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            writer,
            records: 0,
            closed: false,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn records_written(&self) -> usize {
        self.records
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn append(&mut self, record: &LogRecord) -> Result<()> {
        if self.closed {
            return Err(PursuitError::Observer(format!(
                "log {} already has its final record",
                self.run_id
            )));
        }
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.records += 1;
        if record.is_last {
            self.writer.flush()?;
            self.closed = true;
        }
        Ok(())
    }
}

impl<W: Write + Send> SnapshotObserver for GameLog<W> {
    fn on_snapshot(&mut self, snapshot: &Arc<TickSnapshot>) -> Result<()> {
        let record = LogRecord::from_snapshot(self.run_id, snapshot);
        self.append(&record)
    }
}

/// In-memory log; clones share the same records
#[derive(Debug, Clone)]
pub struct MemoryLog {
    run_id: Uuid,
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn records(&self) -> Vec<LogRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn last(&self) -> Option<LogRecord> {
        self.records().pop()
    }
}

impl SnapshotObserver for MemoryLog {
    fn on_snapshot(&mut self, snapshot: &Arc<TickSnapshot>) -> Result<()> {
        let record = LogRecord::from_snapshot(self.run_id, snapshot);
        self.records
            .lock()
            .map_err(|_| PursuitError::Observer("memory log lock poisoned".into()))?
            .push(record);
        Ok(())
    }
}
