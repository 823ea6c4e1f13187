//! Structured logging for flowsentry.
//!
//! Provides a [`Logger`] that writes events to stdout and optionally to a log
//! file. Output can be formatted as human-readable plain text or as
//! newline-delimited JSON (NDJSON), making it easy to ingest into log
//! shippers and SIEM platforms.
//!
//! The [`AlertSink`] trait decouples detection from presentation: the rule
//! engine produces [`Alert`] values and hands them to whatever sink was
//! injected, which for the CLI is a thin wrapper over the logger.

use chrono::Local;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::sync::{Arc, Mutex};

use crate::engine::types::Alert;

// ── Event types ──────────────────────────────────────────────────────────────

/// All distinct event kinds that flowsentry can emit.
///
/// Each variant carries exactly the fields needed to describe that event.
/// The `#[serde(tag = "event")]` attribute ensures JSON output includes an
/// `"event"` key so consumers can filter by type without inspecting structure.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event<'a> {
    /// Informational startup / status message.
    Info { message: &'a str },

    /// A recoverable anomaly; processing continued.
    Warn { message: &'a str },

    /// Diagnostic detail emitted only when --debug is set.
    Debug { message: &'a str },

    /// Flow table built: how many frames went in and flows came out.
    FlowSummary {
        packets: u64,
        skipped: u64,
        flows:   usize,
    },

    /// A detection result from the rule engine.
    Alert {
        #[serde(flatten)]
        alert: &'a Alert,
    },

    /// A valid capture produced zero flows. Distinct from a failure.
    NoActivity,

    /// One live window finished: what it saw and what was suppressed as
    /// already reported.
    WindowSummary {
        window:     u64,
        flows:      usize,
        new_alerts: usize,
        suppressed: usize,
    },

    /// Session summary emitted on graceful shutdown.
    SessionSummary {
        duration_secs:  u64,
        windows:        u64,
        packets_total:  u64,
        flows_total:    u64,
        alerts_emitted: u64,
    },
}

// ── Logger ───────────────────────────────────────────────────────────────────

/// Shared, thread-safe structured logger.
///
/// Constructed once in `main` and passed as an `Arc<Logger>` to every module
/// that needs to emit events. The internal `Mutex` serialises writes so that
/// output lines are never interleaved across threads.
pub struct Logger {
    /// Whether to format events as NDJSON instead of plain text.
    json: bool,
    /// Optional buffered file writer. `None` when `--log-file` was not given.
    file: Option<Mutex<BufWriter<std::fs::File>>>,
}

/// Type alias used throughout the codebase for convenience.
pub type SharedLogger = Arc<Logger>;

impl Logger {
    /// Creates a new logger.
    ///
    /// # Arguments
    /// * `json`     - Emit NDJSON instead of plain text when `true`.
    /// * `log_path` - If `Some`, open (or create) this file for appended writes.
    ///
    /// # Errors
    /// Returns an `io::Error` if the log file cannot be opened or created.
    pub fn new(json: bool, log_path: Option<&str>) -> io::Result<Self> {
        let file = match log_path {
            Some(path) => {
                let f = OpenOptions::new().create(true).append(true).open(path)?;
                Some(Mutex::new(BufWriter::new(f)))
            }
            None => None,
        };

        Ok(Self { json, file })
    }

    /// Logs a single [`Event`], writing to stdout and optionally to the log file.
    ///
    /// Plain-text output is prefixed with a timestamp and the event tag.
    /// NDJSON output is a single JSON object per line with a `"timestamp"` field
    /// injected alongside the event fields.
    pub fn log(&self, event: &Event) {
        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string();

        let line = if self.json {
            // Serialise the event to a JSON Value so we can inject the timestamp.
            let mut val = serde_json::to_value(event).unwrap_or_default();
            if let Some(obj) = val.as_object_mut() {
                obj.insert(
                    "timestamp".to_string(),
                    serde_json::Value::String(timestamp.clone()),
                );
            }
            serde_json::to_string(&val).unwrap_or_default()
        } else {
            // Plain-text: "[TIMESTAMP] [TAG] human-readable description"
            format!("[{}] {}", timestamp, self.plain_text(event))
        };

        // Always write to stdout.
        println!("{}", line);

        // If a log file was configured, also write there.
        if let Some(mutex) = &self.file {
            if let Ok(mut writer) = mutex.lock() {
                let _ = writeln!(writer, "{}", line);
                let _ = writer.flush();
            }
        }
    }

    /// Formats an [`Event`] as a human-readable plain-text string (no timestamp).
    fn plain_text(&self, event: &Event) -> String {
        match event {
            Event::Info { message } => format!("[INFO] {}", message),

            Event::Warn { message } => format!("[WARN] {}", message),

            Event::Debug { message } => format!("[DEBUG] {}", message),

            Event::FlowSummary { packets, skipped, flows } => format!(
                "[FLOWS] processed {} packets ({} skipped), generated {} flows",
                packets, skipped, flows
            ),

            Event::Alert { alert } => {
                let mut line = format!("[{}] {} src={}", alert.severity, alert.kind, alert.src_ip);
                if let Some(dst) = &alert.dst_ip {
                    line.push_str(&format!(" dst={}", dst));
                }
                if let Some(port) = alert.dst_port {
                    line.push_str(&format!(" port={}", port));
                }
                line.push_str(&format!(" {}", alert.details));
                line
            }

            Event::NoActivity => "[INFO] no activity observed".to_string(),

            Event::WindowSummary { window, flows, new_alerts, suppressed } => format!(
                "[WINDOW {}] flows={} new_alerts={} suppressed={}",
                window, flows, new_alerts, suppressed
            ),

            Event::SessionSummary {
                duration_secs,
                windows,
                packets_total,
                flows_total,
                alerts_emitted,
            } => format!(
                "[SUMMARY] duration={}s windows={} packets={} flows={} alerts={}",
                duration_secs, windows, packets_total, flows_total, alerts_emitted
            ),
        }
    }
}

// ── Alert sink ───────────────────────────────────────────────────────────────

/// Receives detection results for presentation. Implementations must not
/// influence detection semantics.
pub trait AlertSink {
    fn report(&self, alert: &Alert);
}

/// The default sink: renders each alert through the structured logger.
pub struct ConsoleSink {
    logger: SharedLogger,
}

impl ConsoleSink {
    pub fn new(logger: SharedLogger) -> Self {
        Self { logger }
    }
}

impl AlertSink for ConsoleSink {
    fn report(&self, alert: &Alert) {
        self.logger.log(&Event::Alert { alert });
    }
}
