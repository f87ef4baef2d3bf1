//! Activity log sink.
//!
//! Write-only and fire-and-forget: the verification core never depends on a
//! log write succeeding. Failures are traced and swallowed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

/// Most recent records kept by the in-memory sink
const MEMORY_LOG_CAPACITY: usize = 50;

/// One completed verification session, as recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub timestamp: DateTime<Utc>,
    pub session_id: Uuid,
    pub identity_label: Option<String>,
    pub success: bool,
    pub confidence: f32,
    pub access_allowed: Option<bool>,
    pub reason: String,
}

/// Sink for completed-session records
#[async_trait]
pub trait ActivityLog: Send + Sync {
    /// Record one session. Must not fail the caller.
    async fn record(&self, record: ActivityRecord);
}

/// Bounded in-memory ring of recent records
#[derive(Default)]
pub struct MemoryActivityLog {
    records: Mutex<Vec<ActivityRecord>>,
}

impl MemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recent(&self) -> Vec<ActivityRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActivityLog for MemoryActivityLog {
    async fn record(&self, record: ActivityRecord) {
        let mut records = self.records.lock().unwrap();
        records.push(record);
        let len = records.len();
        if len > MEMORY_LOG_CAPACITY {
            records.drain(..len - MEMORY_LOG_CAPACITY);
        }
    }
}

/// Append-only JSONL file sink
pub struct JsonlActivityLog {
    path: PathBuf,
}

impl JsonlActivityLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ActivityLog for JsonlActivityLog {
    async fn record(&self, record: ActivityRecord) {
        let path = self.path.clone();
        let result = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            let line = serde_json::to_string(&record)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            writeln!(file, "{}", line)
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Activity log write failed: {}", e),
            Err(e) => warn!("Activity log task aborted: {}", e),
        }
    }
}
