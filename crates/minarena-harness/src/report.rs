//! Campaign reports and JSONL structured logging.
//!
//! Provides:
//! - [`CampaignReport`]: machine-readable summary of one workload run.
//! - [`LogEntry`] / [`LogEmitter`]: JSONL log records written to a file
//!   or stdout, one JSON object per line.
//! - [`validate_log_line`]: parses a single JSONL line back into a
//!   [`LogEntry`], for consumers checking emitted logs.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Summary of one randomized allocate/free campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignReport {
    /// Seed the campaign was generated from; replaying it reproduces the
    /// exact operation sequence.
    pub seed: u64,
    /// Mixed allocate/free steps executed before the final drain.
    pub operations: usize,
    /// Arena size the allocator was constructed over.
    pub arena_size: usize,
    /// Configured fragment capacity.
    pub max_fragments: usize,
    /// Usable bytes past the node table.
    pub usable_bytes: usize,
    /// Successful allocations (including the drain phase's counterpart
    /// frees, `allocations == deallocations` holds on success).
    pub allocations: usize,
    /// Successful deallocations.
    pub deallocations: usize,
    /// Allocation attempts denied with `OutOfMemory`.
    pub oom_events: usize,
    /// Frees deferred because the pool could not represent the fragment.
    pub fragment_stalls: usize,
    /// High-water mark of live bytes (aligned sizes).
    pub peak_live_bytes: usize,
    /// High-water mark of live allocation count.
    pub peak_live_count: usize,
    /// High-water mark of concurrent free fragments.
    pub peak_fragments: usize,
    /// True when the allocator returned to its exact initial state after
    /// the final drain.
    pub final_state_ok: bool,
}

impl CampaignReport {
    /// Pretty-printed JSON rendering.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Severity level for log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Info,
    Warn,
    Error,
}

/// Canonical structured log entry.
///
/// Required fields: `trace_id`, `level`, `event`. Optional fields carry
/// per-operation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub displacement: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

/// Writes JSONL lines to a file, stdout, or any other writer.
pub struct LogEmitter<'w> {
    out: Box<dyn Write + 'w>,
}

impl<'w> LogEmitter<'w> {
    /// Emitter over an arbitrary writer.
    #[must_use]
    pub fn from_writer(out: Box<dyn Write + 'w>) -> Self {
        Self { out }
    }

    /// Writes one entry as a single JSON line.
    pub fn emit(&mut self, entry: &LogEntry) -> io::Result<()> {
        let line = serde_json::to_string(entry).map_err(io::Error::other)?;
        writeln!(self.out, "{line}")
    }
}

impl LogEmitter<'static> {
    /// Emitter writing to `path`.
    pub fn to_file(path: &Path) -> io::Result<Self> {
        Ok(Self {
            out: Box::new(File::create(path)?),
        })
    }

    /// Emitter writing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self {
            out: Box::new(io::stdout()),
        }
    }
}

/// Parses one JSONL line back into a [`LogEntry`].
pub fn validate_log_line(line: &str) -> serde_json::Result<LogEntry> {
    serde_json::from_str(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> CampaignReport {
        CampaignReport {
            seed: 7,
            operations: 128,
            arena_size: 65536,
            max_fragments: 64,
            usable_bytes: 63456,
            allocations: 70,
            deallocations: 70,
            oom_events: 2,
            fragment_stalls: 0,
            peak_live_bytes: 4096,
            peak_live_count: 40,
            peak_fragments: 9,
            final_state_ok: true,
        }
    }

    #[test]
    fn report_json_round_trip() {
        let report = sample_report();
        let json = report.to_json().expect("serializable");
        let back: CampaignReport = serde_json::from_str(&json).expect("parseable");
        assert_eq!(back, report);
    }

    #[test]
    fn emitter_writes_one_json_object_per_line() {
        let mut buffer = Vec::new();
        {
            let mut emitter = LogEmitter::from_writer(Box::new(&mut buffer));
            for step in 0..3 {
                emitter
                    .emit(&LogEntry {
                        trace_id: format!("harness::campaign::{step:016x}"),
                        level: LogLevel::Trace,
                        event: "step".into(),
                        step: Some(step),
                        displacement: None,
                        size: None,
                        outcome: Some("success".into()),
                    })
                    .expect("writable");
            }
        }
        let text = String::from_utf8(buffer).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        for (step, line) in lines.iter().enumerate() {
            let entry = validate_log_line(line).expect("valid JSONL");
            assert_eq!(entry.step, Some(step));
            assert_eq!(entry.level, LogLevel::Trace);
        }
    }

    #[test]
    fn optional_fields_are_omitted_when_absent() {
        let entry = LogEntry {
            trace_id: "t".into(),
            level: LogLevel::Warn,
            event: "oom".into(),
            step: None,
            displacement: None,
            size: Some(64),
            outcome: None,
        };
        let line = serde_json::to_string(&entry).expect("serializable");
        assert!(!line.contains("displacement"));
        assert!(!line.contains("outcome"));
        assert!(line.contains("\"size\":64"));
        assert!(line.contains("\"level\":\"warn\""));
    }
}
