#![forbid(unsafe_code)]

//! Telemetry ring buffer.
//!
//! Every dispatched command leaves one [`TelemetryRecord`]. The buffer keeps
//! the most recent `capacity` records and can export them as JSON lines for
//! a debug panel or a bug report.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use web_time::{SystemTime, UNIX_EPOCH};

/// Who owns the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Application command.
    App,
    /// Engine built-in.
    Engine,
}

/// One dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    /// Command id.
    pub command_id: String,
    /// Payload as dispatched.
    pub payload: Value,
    /// Owner.
    pub source: Source,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: u64,
    /// Whether the command ran without error.
    pub success: bool,
}

impl TelemetryRecord {
    /// A record stamped with the current time.
    pub fn now(command_id: impl Into<String>, payload: Value, source: Source, success: bool) -> Self {
        Self {
            command_id: command_id.into(),
            payload,
            source,
            timestamp_ms: now_ms(),
            success,
        }
    }
}

/// Wall-clock milliseconds since the Unix epoch, 0 if the clock is before it.
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Bounded record buffer.
#[derive(Debug, Clone)]
pub struct Telemetry {
    records: VecDeque<TelemetryRecord>,
    capacity: usize,
    total: u64,
}

impl Telemetry {
    /// Create a buffer holding at most `capacity` records.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
        }
    }

    /// Append a record, evicting the oldest when full.
    pub fn record(&mut self, record: TelemetryRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
        self.total += 1;
    }

    /// Retained records, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &TelemetryRecord> {
        self.records.iter()
    }

    /// Most recent record.
    #[must_use]
    pub fn last(&self) -> Option<&TelemetryRecord> {
        self.records.back()
    }

    /// Number of retained records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Maximum number of retained records.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records ever appended, including evicted ones.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Drop every retained record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Retained records as JSON lines, oldest first.
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new(50)
    }
}
