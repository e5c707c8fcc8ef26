// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 The HieroScribe contributors

//! Bounded, newest-first log of past analyses
//!
//! The log lives under a single fixed storage key (one JSON file holding the
//! whole array). Records are immutable once appended; the only removal is
//! eviction from the tail when the log exceeds [`MAX_CAPACITY`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{HieroError, Result};

/// Maximum number of records retained in the log
pub const MAX_CAPACITY: usize = 20;

/// Default name of the history file (the single storage key)
pub const DEFAULT_HISTORY_FILE: &str = "hieroscribe_history.json";

/// Kind of a persisted analysis record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Translation,
    Render,
}

/// A completed analysis, as persisted in the history log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub prompt: String,
    pub result_url: String,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields of a record; `id` and `created_at` are assigned at
/// insertion time
#[derive(Debug, Clone)]
pub struct AnalysisRecordInput {
    pub kind: RecordKind,
    pub prompt: String,
    pub result_url: String,
}

/// Storage interface for the analysis history
///
/// Kept minimal (append + list) so a networked database can replace the
/// file-backed store without touching the orchestrator.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a record, evicting the oldest entry when the log is full.
    /// Returns the full record as persisted.
    async fn append(&self, input: AnalysisRecordInput) -> Result<AnalysisRecord>;

    /// All records, newest first. Missing or unreadable data yields an empty
    /// list, never an error.
    async fn list(&self) -> Result<Vec<AnalysisRecord>>;
}

/// File-backed history store: one JSON file, value = array of records,
/// newest first, length <= [`MAX_CAPACITY`]
pub struct JsonFileHistory {
    path: PathBuf,
    // Serializes the read-modify-write append section across tasks
    write_lock: Mutex<()>,
}

impl JsonFileHistory {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current log, treating missing or corrupt data as empty
    fn read_log(&self) -> Vec<AnalysisRecord> {
        if !self.path.exists() {
            return Vec::new();
        }

        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to read history file {:?}: {}", self.path, e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!("Corrupt history at {:?}, treating as empty: {}", self.path, e);
                Vec::new()
            }
        }
    }

    /// Replace the log atomically: write to a temp file in the same
    /// directory, then rename over the target. A failure at any step leaves
    /// the previous file contents intact.
    fn write_log(&self, records: &[AnalysisRecord]) -> Result<()> {
        let json = serde_json::to_string(records)
            .map_err(|e| HieroError::Persistence(format!("serialize history: {}", e)))?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| HieroError::Persistence(format!("create temp file in {:?}: {}", dir, e)))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| HieroError::Persistence(format!("write history: {}", e)))?;
        tmp.persist(&self.path)
            .map_err(|e| HieroError::Persistence(format!("replace {:?}: {}", self.path, e)))?;

        Ok(())
    }
}

#[async_trait]
impl HistoryStore for JsonFileHistory {
    async fn append(&self, input: AnalysisRecordInput) -> Result<AnalysisRecord> {
        let _guard = self.write_lock.lock().await;

        let record = AnalysisRecord {
            id: uuid::Uuid::new_v4().to_string(),
            kind: input.kind,
            prompt: input.prompt,
            result_url: input.result_url,
            created_at: Utc::now(),
        };

        let mut records = self.read_log();
        records.insert(0, record.clone());
        records.truncate(MAX_CAPACITY);

        self.write_log(&records)?;
        debug!("Appended history record {} ({} total)", record.id, records.len());

        Ok(record)
    }

    async fn list(&self) -> Result<Vec<AnalysisRecord>> {
        Ok(self.read_log())
    }
}
