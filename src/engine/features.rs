//! Fixed-width numeric feature vectors for downstream statistical analysis.
//!
//! Nothing in the rule engine consumes these; they exist so a future scoring
//! model can train on the same flow aggregation the rules see.

use crate::engine::config::FEATURE_DURATION_FLOOR;
use crate::engine::types::FlowTable;

/// `[duration, packets, bytes, pps, bps, protocol_id, src_port, dst_port]`
pub type FeatureVector = [f64; 8];

/// Maps a transport protocol name to a stable numeric identifier.
pub fn protocol_to_id(protocol: &str) -> u32 {
    match protocol.to_ascii_uppercase().as_str() {
        "TCP"  => 1,
        "UDP"  => 2,
        "ICMP" => 3,
        _      => 0,
    }
}

/// Converts a port string to a number, yielding 0 for anything non-numeric.
pub fn safe_port(port: &str) -> u32 {
    port.parse::<u16>().map(u32::from).unwrap_or(0)
}

/// Converts every flow into a feature vector, in flow-table iteration order.
///
/// The duration floor here is tighter than the flow's own floor; it exists
/// only to guard the two rate divisions.
pub fn extract_features(flows: &FlowTable) -> Vec<FeatureVector> {
    flows
        .values()
        .map(|flow| {
            let duration = (flow.end_time - flow.start_time).max(FEATURE_DURATION_FLOOR);
            [
                duration,
                flow.packet_count as f64,
                flow.byte_count as f64,
                flow.packet_count as f64 / duration,
                flow.byte_count as f64 / duration,
                protocol_to_id(&flow.protocol) as f64,
                safe_port(&flow.src_port) as f64,
                safe_port(&flow.dst_port) as f64,
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{Flow, FlowKey, FlowTable};

    fn table_with(protocol: &str, sport: &str, dport: &str) -> FlowTable {
        let mut flows = FlowTable::new();
        flows.insert(
            FlowKey {
                src_ip:   "1.1.1.1".into(),
                dst_ip:   "2.2.2.2".into(),
                src_port: sport.into(),
                dst_port: dport.into(),
                protocol: protocol.into(),
            },
            Flow {
                src_ip:       "1.1.1.1".into(),
                dst_ip:       "2.2.2.2".into(),
                src_port:     sport.into(),
                dst_port:     dport.into(),
                protocol:     protocol.into(),
                start_time:   10.0,
                end_time:     12.0,
                packet_count: 100,
                byte_count:   50_000,
            },
        );
        flows
    }

    #[test]
    fn vector_layout_matches_flow_statistics() {
        let vectors = extract_features(&table_with("TCP", "40000", "80"));
        assert_eq!(vectors.len(), 1);
        let v = vectors[0];
        assert_eq!(v[0], 2.0);       // duration
        assert_eq!(v[1], 100.0);     // packets
        assert_eq!(v[2], 50_000.0);  // bytes
        assert_eq!(v[3], 50.0);      // pps
        assert_eq!(v[4], 25_000.0);  // bps
        assert_eq!(v[5], 1.0);       // TCP
        assert_eq!(v[6], 40_000.0);
        assert_eq!(v[7], 80.0);
    }

    #[test]
    fn protocol_ids_are_stable() {
        assert_eq!(protocol_to_id("TCP"), 1);
        assert_eq!(protocol_to_id("udp"), 2);
        assert_eq!(protocol_to_id("Icmp"), 3);
        assert_eq!(protocol_to_id("SCTP"), 0);
        assert_eq!(protocol_to_id(""), 0);
    }

    #[test]
    fn non_numeric_ports_become_zero() {
        let vectors = extract_features(&table_with("UDP", "domain", "53"));
        assert_eq!(vectors[0][6], 0.0);
        assert_eq!(vectors[0][7], 53.0);
    }

    #[test]
    fn zero_duration_flow_uses_rate_floor() {
        let mut flows = table_with("TCP", "1", "2");
        for flow in flows.values_mut() {
            flow.end_time = flow.start_time;
        }
        let v = extract_features(&flows)[0];
        assert_eq!(v[0], 1e-6);
        assert!(v[3].is_finite() && v[3] > 0.0);
    }
}
