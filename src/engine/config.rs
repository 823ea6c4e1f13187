use std::collections::HashSet;
use std::time::Duration;

/// Floor applied to flow and aggregate durations before any rate division.
///
/// A single-packet flow has `start_time == end_time`; without the floor the
/// packets-per-second computation would divide by zero.
pub const DURATION_FLOOR: f64 = 0.001;

/// Separate, tighter floor used only by the feature extractor's rate columns.
pub const FEATURE_DURATION_FLOOR: f64 = 1e-6;

/// Pause between live capture windows so a near-instant window does not spin
/// the controller in a tight loop.
pub const WINDOW_DELAY: Duration = Duration::from_millis(500);

/// Poll timeout on live captures so the shutdown flag is checked promptly
/// even when the interface is silent.
pub const CAPTURE_POLL_MS: i32 = 200;

/// Destination ports watched by the brute-force rule: SSH, FTP, RDP.
pub const DEFAULT_MONITORED_PORTS: [u16; 3] = [22, 21, 3389];

/// Runtime-tunable detection thresholds, populated from CLI flags.
#[derive(Debug, Clone)]
pub struct Thresholds {
    /// Distinct destination ports on one (src, dst) pair before a port scan fires.
    pub port_scan: usize,
    /// Aggregate packets-per-second at which a source counts as flooding.
    pub pps: f64,
    /// Sources with fewer total packets than this are never flood candidates.
    pub flood_min_packets: u64,
    /// Sources observed for less than this many seconds are never flood
    /// candidates. Keeps short bursts (a fast scanner probe) from being
    /// misread as a sustained flood.
    pub flood_min_duration: f64,
    /// Packets to one (src, dst, port) triple before brute force fires.
    pub bruteforce_attempts: u64,
    /// Attempts spread over longer than this many seconds are not brute
    /// forcing; the ceiling is intentional, unlike the flood floor.
    pub bruteforce_max_duration: f64,
    /// Destination ports the brute-force rule watches.
    pub monitored_ports: HashSet<u16>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            port_scan:               10,
            pps:                     500.0,
            flood_min_packets:       500,
            flood_min_duration:      1.0,
            bruteforce_attempts:     10,
            bruteforce_max_duration: 60.0,
            monitored_ports:         DEFAULT_MONITORED_PORTS.iter().copied().collect(),
        }
    }
}
