use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;

use crate::engine::config::DURATION_FLOOR;

/// Set to `true` by the ctrlc handler; loops exit at their next checkpoint.
pub type ShutdownFlag = Arc<AtomicBool>;

/// Identifies a unidirectional flow by its exact 5-tuple.
///
/// Direction matters: packets A→B and B→A aggregate into two distinct flows.
/// Ports are kept as strings because capture tools occasionally report
/// non-numeric or missing port fields; validation happens in the rules that
/// care. The key derives `Ord` so the flow table iterates deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlowKey {
    pub src_ip:   String,
    pub dst_ip:   String,
    pub src_port: String,
    pub dst_port: String,
    pub protocol: String,
}

/// Accumulated statistics for all packets sharing one [`FlowKey`].
///
/// Created on the first packet of its key and only ever grown by further
/// packets with the identical key; never removed during a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    pub src_ip:       String,
    pub dst_ip:       String,
    pub src_port:     String,
    pub dst_port:     String,
    pub protocol:     String,
    /// Earliest observed capture timestamp, seconds.
    pub start_time:   f64,
    /// Latest observed capture timestamp, seconds. Never moves backward.
    pub end_time:     f64,
    pub packet_count: u64,
    pub byte_count:   u64,
}

impl Flow {
    /// Observed lifetime of the flow, floored so single-packet flows never
    /// produce a zero divisor in rate computations.
    pub fn duration(&self) -> f64 {
        (self.end_time - self.start_time).max(DURATION_FLOOR)
    }
}

/// The flow table. A `BTreeMap` keeps iteration order deterministic, which
/// the feature extractor relies on for reproducible output.
pub type FlowTable = BTreeMap<FlowKey, Flow>;

// ── Packet source ─────────────────────────────────────────────────────────────

/// One successfully decoded packet, reduced to the fields the engine needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketRecord {
    pub src_ip:    String,
    pub dst_ip:    String,
    pub protocol:  String,
    pub src_port:  String,
    pub dst_port:  String,
    /// Capture timestamp in seconds.
    pub timestamp: f64,
    /// Original wire length in bytes.
    pub length:    u64,
}

/// Why a frame was excluded from flow aggregation.
///
/// None of these are errors: frames without an IP or TCP/UDP layer are a
/// normal part of any capture, and truncated frames are merely noted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No IPv4 layer (ARP, IPv6, raw L2 traffic).
    NoIpLayer,
    /// IP but no TCP/UDP transport (ICMP, tunneled protocols).
    NoTransport,
    /// The frame could not be sliced at all.
    Malformed,
}

/// Per-frame decode result. Replaces exception-driven skipping with an
/// explicit outcome the builder can count.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    Decoded(PacketRecord),
    Skipped(SkipReason),
}

// ── Alerts ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    PortScan,
    Flood,
    BruteForce,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::PortScan   => write!(f, "PORT_SCAN"),
            AlertKind::Flood      => write!(f, "FLOOD"),
            AlertKind::BruteForce => write!(f, "BRUTE_FORCE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info     => write!(f, "INFO"),
            Severity::Warning  => write!(f, "WARNING"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Kind-specific diagnostic fields carried inside an [`Alert`].
///
/// One variant per rule, so consumers that only care about the alert header
/// can ignore the payload while structured consumers get typed fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AlertDetails {
    PortScan {
        unique_ports_attempted: usize,
        threshold:              usize,
    },
    Flood {
        packets_per_sec: f64,
        total_packets:   u64,
        duration_sec:    f64,
        unique_targets:  usize,
        threshold:       f64,
    },
    BruteForce {
        attempts:     u64,
        duration_sec: f64,
        threshold:    u64,
    },
}

impl fmt::Display for AlertDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertDetails::PortScan { unique_ports_attempted, threshold } => write!(
                f,
                "unique_ports_attempted={} threshold={}",
                unique_ports_attempted, threshold
            ),
            AlertDetails::Flood {
                packets_per_sec,
                total_packets,
                duration_sec,
                unique_targets,
                threshold,
            } => write!(
                f,
                "packets_per_sec={} total_packets={} duration_sec={} unique_targets={} threshold={}",
                packets_per_sec, total_packets, duration_sec, unique_targets, threshold
            ),
            AlertDetails::BruteForce { attempts, duration_sec, threshold } => write!(
                f,
                "attempts={} duration_sec={} threshold={}",
                attempts, duration_sec, threshold
            ),
        }
    }
}

/// A single detection result. Immutable value object, produced fresh on
/// every rule evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub kind:     AlertKind,
    pub severity: Severity,
    pub src_ip:   String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_ip:   Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_port: Option<u16>,
    pub details:  AlertDetails,
}

impl Alert {
    /// Dedup key used by the live controller: one alert per identity per run.
    pub fn identity(&self) -> AlertIdentity {
        AlertIdentity {
            kind:     self.kind,
            src_ip:   self.src_ip.clone(),
            dst_ip:   self.dst_ip.clone(),
            dst_port: self.dst_port,
        }
    }
}

/// The `(kind, src_ip, dst_ip, dst_port)` identity of an alert.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertIdentity {
    pub kind:     AlertKind,
    pub src_ip:   String,
    pub dst_ip:   Option<String>,
    pub dst_port: Option<u16>,
}

// ── Session statistics ────────────────────────────────────────────────────────

/// Running totals for the shutdown summary. Atomics so the ctrlc handler and
/// any future parallel rule evaluation can share them without locking.
#[derive(Debug, Default)]
pub struct SessionStats {
    pub packets_total:     AtomicU64,
    pub flows_total:       AtomicU64,
    pub alerts_emitted:    AtomicU64,
    pub windows_completed: AtomicU64,
}

impl SessionStats {
    pub fn new() -> SharedStats {
        Arc::new(SessionStats::default())
    }
}

pub type SharedStats = Arc<SessionStats>;
