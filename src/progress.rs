//! Run progress reporting.
//!
//! Emitted on **stderr** so stdout stays parseable for scripts. Three
//! modes: human-readable lines, one JSON object per line, or nothing.

use std::io::Write;

/// A single progress event.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// Listing issues from the tracker.
    Fetching { group_id: String },
    /// Staging table replaced with `records` rows.
    Staged { records: u64 },
    /// A page finished: embedded and (if non-empty) uploaded.
    Page {
        page: u64,
        offset: u64,
        records: u64,
        uploaded: u64,
        dropped: u64,
    },
}

/// Receives progress events from the pipeline.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "page 3  offset 2,000  1,000 records  998 uploaded  2 dropped".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Fetching { group_id } => {
                format!("fetch group {}  listing issues...\n", group_id)
            }
            ProgressEvent::Staged { records } => {
                format!("stage  {} records written\n", format_number(*records))
            }
            ProgressEvent::Page {
                page,
                offset,
                records,
                uploaded,
                dropped,
            } => format!(
                "page {}  offset {}  {} records  {} uploaded  {} dropped\n",
                page,
                format_number(*offset),
                format_number(*records),
                format_number(*uploaded),
                format_number(*dropped)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Fetching { group_id } => serde_json::json!({
                "event": "progress",
                "phase": "fetching",
                "group_id": group_id
            }),
            ProgressEvent::Staged { records } => serde_json::json!({
                "event": "progress",
                "phase": "staged",
                "records": records
            }),
            ProgressEvent::Page {
                page,
                offset,
                records,
                uploaded,
                dropped,
            } => serde_json::json!({
                "event": "progress",
                "phase": "page",
                "page": page,
                "offset": offset,
                "records": records,
                "uploaded": uploaded,
                "dropped": dropped
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
