//! Flow aggregation and rule evaluation engine.
//!
//! The offline pipeline reads a capture file, folds its packets into a flow
//! table, and scans that table with three threshold rules. The live
//! controller in [`live`] repeats the same pipeline over fixed-duration
//! capture windows.

pub mod capture;
pub mod config;
pub mod features;
pub mod flow;
pub mod live;
pub mod packets;
pub mod rules;
pub mod types;

use std::path::Path;
use std::sync::atomic::Ordering;

use crate::engine::config::Thresholds;
use crate::engine::flow::build_flows;
use crate::engine::packets::PcapSource;
use crate::engine::types::{Alert, SharedStats};
use crate::error::Result;
use crate::logger::{Event, SharedLogger};

/// Outcome of one offline detection pass.
#[derive(Debug)]
pub struct DetectionReport {
    pub alerts: Vec<Alert>,
    /// Flows in the table the rules scanned. Zero means "no activity
    /// observed", which is an outcome, not an error.
    pub flows: usize,
}

/// Runs the full offline pipeline against one capture file.
///
/// Builds the flow table, optionally dumps the leading flows when `debug`
/// is set, and evaluates all three rules with the given thresholds.
pub fn run_detection(
    pcap_path: &Path,
    thresholds: &Thresholds,
    debug: bool,
    logger: &SharedLogger,
    stats: &SharedStats,
) -> Result<DetectionReport> {
    let source = PcapSource::open(pcap_path)?;
    let (flows, summary) = build_flows(source, logger);

    stats
        .packets_total
        .fetch_add(summary.packets_seen, Ordering::Relaxed);
    stats
        .flows_total
        .fetch_add(flows.len() as u64, Ordering::Relaxed);

    if debug {
        for flow in flows.values().take(10) {
            logger.log(&Event::Debug {
                message: &format!(
                    "{}:{} -> {}:{} pkts={} dur={:.4}",
                    flow.src_ip,
                    flow.src_port,
                    flow.dst_ip,
                    flow.dst_port,
                    flow.packet_count,
                    flow.duration()
                ),
            });
        }
    }

    if flows.is_empty() {
        logger.log(&Event::NoActivity);
        return Ok(DetectionReport { alerts: Vec::new(), flows: 0 });
    }

    let alerts = rules::evaluate(&flows, thresholds);
    Ok(DetectionReport { flows: flows.len(), alerts })
}
