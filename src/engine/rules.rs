//! Threshold rules evaluated over a fully built flow table.
//!
//! Each detector is a pure read-only scan; the three run independently and
//! their outputs are concatenated without cross-rule deduplication, so one
//! flow may contribute to several alert kinds at once. Accumulators are
//! rebuilt from scratch on every pass and keyed through `BTreeMap`s so that
//! re-running a rule on an unchanged table yields identical alerts.

use std::collections::{BTreeMap, BTreeSet};

use crate::engine::config::{Thresholds, DURATION_FLOOR};
use crate::engine::types::{Alert, AlertDetails, AlertKind, FlowTable, Severity};

/// Parses a destination port string, accepting only the valid range (0, 65535].
fn valid_port(port: &str) -> Option<u16> {
    port.parse::<u16>().ok().filter(|p| *p > 0)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Runs all three detectors over one flow table.
pub fn evaluate(flows: &FlowTable, thresholds: &Thresholds) -> Vec<Alert> {
    let mut alerts = detect_port_scan(flows, thresholds);
    alerts.extend(detect_flood(flows, thresholds));
    alerts.extend(detect_bruteforce(flows, thresholds));
    alerts
}

/// Flags sources probing many distinct ports on a single host.
///
/// Direction-aware: ports are collected per `(src_ip, dst_ip)` pair, so a
/// busy server answering many clients never trips the rule. Ports outside
/// the valid numeric range are left out of the set but do not exclude the
/// flow from the other rules.
pub fn detect_port_scan(flows: &FlowTable, thresholds: &Thresholds) -> Vec<Alert> {
    let mut ports_by_pair: BTreeMap<(String, String), BTreeSet<u16>> = BTreeMap::new();

    for flow in flows.values() {
        let Some(port) = valid_port(&flow.dst_port) else {
            continue;
        };
        ports_by_pair
            .entry((flow.src_ip.clone(), flow.dst_ip.clone()))
            .or_default()
            .insert(port);
    }

    let mut alerts = Vec::new();
    for ((src_ip, dst_ip), ports) in ports_by_pair {
        if ports.len() >= thresholds.port_scan {
            alerts.push(Alert {
                kind:     AlertKind::PortScan,
                severity: Severity::Critical,
                src_ip,
                dst_ip:   Some(dst_ip),
                dst_port: None,
                details:  AlertDetails::PortScan {
                    unique_ports_attempted: ports.len(),
                    threshold:              thresholds.port_scan,
                },
            });
        }
    }
    alerts
}

/// Per-source traffic totals accumulated for flood detection.
#[derive(Debug)]
struct SourceTraffic {
    packets:    u64,
    first_seen: f64,
    last_seen:  f64,
    dst_ips:    BTreeSet<String>,
}

/// Flags sources pushing a sustained high packet rate.
///
/// Traffic is aggregated per source IP across all of its flows. Two gates
/// run before the rate computation: a packet-count floor and a duration
/// floor. The duration floor is what keeps a short burst (one fast scanner
/// probe) from dividing a modest packet count by a tiny interval and
/// masquerading as a flood.
pub fn detect_flood(flows: &FlowTable, thresholds: &Thresholds) -> Vec<Alert> {
    let mut traffic_by_src: BTreeMap<String, SourceTraffic> = BTreeMap::new();

    for flow in flows.values() {
        let data = traffic_by_src
            .entry(flow.src_ip.clone())
            .or_insert(SourceTraffic {
                packets:    0,
                first_seen: flow.start_time,
                last_seen:  flow.end_time,
                dst_ips:    BTreeSet::new(),
            });
        data.packets += flow.packet_count;
        data.first_seen = data.first_seen.min(flow.start_time);
        data.last_seen = data.last_seen.max(flow.end_time);
        data.dst_ips.insert(flow.dst_ip.clone());
    }

    let mut alerts = Vec::new();
    for (src_ip, data) in traffic_by_src {
        if data.packets < thresholds.flood_min_packets {
            continue;
        }
        let duration = (data.last_seen - data.first_seen).max(DURATION_FLOOR);
        if duration < thresholds.flood_min_duration {
            continue;
        }

        let pps = data.packets as f64 / duration;
        if pps >= thresholds.pps {
            alerts.push(Alert {
                kind:     AlertKind::Flood,
                severity: Severity::Critical,
                src_ip,
                dst_ip:   None,
                dst_port: None,
                details:  AlertDetails::Flood {
                    packets_per_sec: round2(pps),
                    total_packets:   data.packets,
                    duration_sec:    round2(duration),
                    unique_targets:  data.dst_ips.len(),
                    threshold:       thresholds.pps,
                },
            });
        }
    }
    alerts
}

/// Per-(src, dst, port) attempt totals for brute-force detection.
#[derive(Debug)]
struct AttemptWindow {
    packets: u64,
    start:   f64,
    end:     f64,
}

/// Flags rapid repeated connections to monitored login services.
///
/// Only flows to the monitored port set are considered. The duration bound
/// is a ceiling, not a floor: attempts spread over a long period are normal
/// usage, while many attempts packed into a short span are not.
pub fn detect_bruteforce(flows: &FlowTable, thresholds: &Thresholds) -> Vec<Alert> {
    let mut attempts: BTreeMap<(String, String, u16), AttemptWindow> = BTreeMap::new();

    for flow in flows.values() {
        let Some(dst_port) = valid_port(&flow.dst_port) else {
            continue;
        };
        if !thresholds.monitored_ports.contains(&dst_port) {
            continue;
        }

        let data = attempts
            .entry((flow.src_ip.clone(), flow.dst_ip.clone(), dst_port))
            .or_insert(AttemptWindow {
                packets: 0,
                start:   flow.start_time,
                end:     flow.end_time,
            });
        data.packets += flow.packet_count;
        data.start = data.start.min(flow.start_time);
        data.end = data.end.max(flow.end_time);
    }

    let mut alerts = Vec::new();
    for ((src_ip, dst_ip, port), data) in attempts {
        let duration = (data.end - data.start).max(DURATION_FLOOR);
        if data.packets >= thresholds.bruteforce_attempts
            && duration <= thresholds.bruteforce_max_duration
        {
            alerts.push(Alert {
                kind:     AlertKind::BruteForce,
                severity: Severity::Critical,
                src_ip,
                dst_ip:   Some(dst_ip),
                dst_port: Some(port),
                details:  AlertDetails::BruteForce {
                    attempts:     data.packets,
                    duration_sec: round2(duration),
                    threshold:    thresholds.bruteforce_attempts,
                },
            });
        }
    }
    alerts
}
