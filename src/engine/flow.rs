//! Flow table builder: folds a packet stream into per-5-tuple flow records.

use crate::engine::types::{DecodeOutcome, Flow, FlowKey, FlowTable, SkipReason};
use crate::logger::{Event, SharedLogger};

/// Counters describing one build pass, reported alongside the table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    /// Frames read from the source, decoded or not.
    pub packets_seen: u64,
    /// Frames that became part of a flow.
    pub decoded: u64,
    pub skipped_no_ip: u64,
    pub skipped_no_transport: u64,
    pub skipped_malformed: u64,
}

impl BuildSummary {
    pub fn skipped(&self) -> u64 {
        self.skipped_no_ip + self.skipped_no_transport + self.skipped_malformed
    }
}

/// Aggregates decoded packets into flows keyed by their exact 5-tuple.
///
/// Skipped frames are counted, never fatal. On repeated keys the flow grows:
/// counts accumulate, `end_time` only advances (out-of-order timestamps
/// cannot move it backward) and `start_time` only retreats.
pub fn build_flows<I>(outcomes: I, logger: &SharedLogger) -> (FlowTable, BuildSummary)
where
    I: IntoIterator<Item = DecodeOutcome>,
{
    let mut flows = FlowTable::new();
    let mut summary = BuildSummary::default();

    for outcome in outcomes {
        summary.packets_seen += 1;

        let rec = match outcome {
            DecodeOutcome::Decoded(rec) => rec,
            DecodeOutcome::Skipped(SkipReason::NoIpLayer) => {
                summary.skipped_no_ip += 1;
                continue;
            }
            DecodeOutcome::Skipped(SkipReason::NoTransport) => {
                summary.skipped_no_transport += 1;
                continue;
            }
            DecodeOutcome::Skipped(SkipReason::Malformed) => {
                summary.skipped_malformed += 1;
                logger.log(&Event::Warn {
                    message: "skipping malformed packet",
                });
                continue;
            }
        };
        summary.decoded += 1;

        let key = FlowKey {
            src_ip:   rec.src_ip.clone(),
            dst_ip:   rec.dst_ip.clone(),
            src_port: rec.src_port.clone(),
            dst_port: rec.dst_port.clone(),
            protocol: rec.protocol.clone(),
        };

        match flows.get_mut(&key) {
            None => {
                flows.insert(key, Flow {
                    src_ip:       rec.src_ip,
                    dst_ip:       rec.dst_ip,
                    src_port:     rec.src_port,
                    dst_port:     rec.dst_port,
                    protocol:     rec.protocol,
                    start_time:   rec.timestamp,
                    end_time:     rec.timestamp,
                    packet_count: 1,
                    byte_count:   rec.length,
                });
            }
            Some(flow) => {
                flow.packet_count += 1;
                flow.byte_count += rec.length;
                flow.end_time = flow.end_time.max(rec.timestamp);
                flow.start_time = flow.start_time.min(rec.timestamp);
            }
        }
    }

    logger.log(&Event::FlowSummary {
        packets: summary.packets_seen,
        skipped: summary.skipped(),
        flows:   flows.len(),
    });

    (flows, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::PacketRecord;
    use crate::logger::Logger;
    use std::sync::Arc;

    fn test_logger() -> SharedLogger {
        Arc::new(Logger::new(false, None).unwrap())
    }

    fn pkt(src: &str, dst: &str, sport: &str, dport: &str, ts: f64, len: u64) -> DecodeOutcome {
        DecodeOutcome::Decoded(PacketRecord {
            src_ip:    src.into(),
            dst_ip:    dst.into(),
            protocol:  "TCP".into(),
            src_port:  sport.into(),
            dst_port:  dport.into(),
            timestamp: ts,
            length:    len,
        })
    }

    #[test]
    fn one_flow_per_distinct_key_with_accumulated_counts() {
        let input = vec![
            pkt("1.1.1.1", "2.2.2.2", "1000", "80", 1.0, 60),
            pkt("1.1.1.1", "2.2.2.2", "1000", "80", 2.0, 40),
            pkt("2.2.2.2", "1.1.1.1", "80", "1000", 1.5, 52),
        ];
        let (flows, summary) = build_flows(input, &test_logger());

        // Direction-aware keys: the reply is a separate flow.
        assert_eq!(flows.len(), 2);
        assert_eq!(summary.packets_seen, 3);
        assert_eq!(summary.decoded, 3);
        assert_eq!(summary.skipped(), 0);

        let forward = flows
            .values()
            .find(|f| f.src_ip == "1.1.1.1")
            .unwrap();
        assert_eq!(forward.packet_count, 2);
        assert_eq!(forward.byte_count, 100);
        assert_eq!(forward.start_time, 1.0);
        assert_eq!(forward.end_time, 2.0);
    }

    #[test]
    fn out_of_order_timestamps_never_move_end_time_backward() {
        let input = vec![
            pkt("1.1.1.1", "2.2.2.2", "1000", "80", 5.0, 60),
            pkt("1.1.1.1", "2.2.2.2", "1000", "80", 3.0, 60),
        ];
        let (flows, _) = build_flows(input, &test_logger());
        let flow = flows.values().next().unwrap();
        assert_eq!(flow.end_time, 5.0);
        // The earlier packet may still pull start_time back.
        assert_eq!(flow.start_time, 3.0);
        assert_eq!(flow.packet_count, 2);
    }

    #[test]
    fn skips_are_counted_and_excluded() {
        let input = vec![
            DecodeOutcome::Skipped(SkipReason::NoIpLayer),
            DecodeOutcome::Skipped(SkipReason::NoTransport),
            DecodeOutcome::Skipped(SkipReason::Malformed),
            pkt("1.1.1.1", "2.2.2.2", "1000", "80", 1.0, 60),
        ];
        let (flows, summary) = build_flows(input, &test_logger());
        assert_eq!(flows.len(), 1);
        assert_eq!(summary.packets_seen, 4);
        assert_eq!(summary.skipped(), 3);
        assert_eq!(summary.skipped_malformed, 1);
    }

    #[test]
    fn empty_input_yields_empty_table() {
        let (flows, summary) = build_flows(Vec::new(), &test_logger());
        assert!(flows.is_empty());
        assert_eq!(summary.packets_seen, 0);
    }
}
