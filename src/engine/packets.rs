//! Packet source: reads a PCAP file and yields decoded packet records.
//!
//! Decoding is deliberately shallow. The engine only needs the IPv4
//! endpoints, the TCP/UDP ports, the capture timestamp, and the wire length;
//! everything else in the frame is ignored. Frames that lack those layers
//! are yielded as explicit skips so the flow builder can count them instead
//! of catching errors.

use etherparse::{InternetSlice, SlicedPacket, TransportSlice};
use pcap::{Capture, Offline};
use std::path::Path;

use crate::engine::types::{DecodeOutcome, PacketRecord, SkipReason};
use crate::error::{IdsError, Result};

/// Lazy iterator over the decode outcomes of one capture file.
pub struct PcapSource {
    cap: Capture<Offline>,
}

impl PcapSource {
    /// Opens a capture file for replay.
    ///
    /// A missing path is an input error (exit code 2 at the CLI); a file
    /// libpcap cannot parse is an analysis error.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IdsError::Input(format!(
                "PCAP file not found: {}",
                path.display()
            )));
        }
        let cap = Capture::from_file(path).map_err(|e| {
            IdsError::Analysis(format!("cannot open PCAP file '{}': {}", path.display(), e))
        })?;
        Ok(PcapSource { cap })
    }
}

impl Iterator for PcapSource {
    type Item = DecodeOutcome;

    fn next(&mut self) -> Option<DecodeOutcome> {
        match self.cap.next_packet() {
            Ok(pkt) => {
                let timestamp =
                    pkt.header.ts.tv_sec as f64 + pkt.header.ts.tv_usec as f64 * 1e-6;
                // Original wire length, not the (possibly truncated) capture length.
                let length = pkt.header.len as u64;
                Some(decode_frame(pkt.data, timestamp, length))
            }
            // EOF or a truncated trailer both end iteration.
            Err(_) => None,
        }
    }
}

/// Slices one Ethernet frame down to a [`PacketRecord`].
pub fn decode_frame(data: &[u8], timestamp: f64, length: u64) -> DecodeOutcome {
    let sliced = match SlicedPacket::from_ethernet(data) {
        Ok(s) => s,
        Err(_) => return DecodeOutcome::Skipped(SkipReason::Malformed),
    };

    let (src_ip, dst_ip) = match sliced.ip {
        Some(InternetSlice::Ipv4(h, _)) => (
            h.source_addr().to_string(),
            h.destination_addr().to_string(),
        ),
        _ => return DecodeOutcome::Skipped(SkipReason::NoIpLayer),
    };

    let (protocol, src_port, dst_port) = match sliced.transport {
        Some(TransportSlice::Tcp(tcp)) => {
            ("TCP", tcp.source_port(), tcp.destination_port())
        }
        Some(TransportSlice::Udp(udp)) => {
            ("UDP", udp.source_port(), udp.destination_port())
        }
        // ICMP and friends carry no ports; they are not flow material here.
        _ => return DecodeOutcome::Skipped(SkipReason::NoTransport),
    };

    DecodeOutcome::Decoded(PacketRecord {
        src_ip,
        dst_ip,
        protocol: protocol.to_string(),
        src_port: src_port.to_string(),
        dst_port: dst_port.to_string(),
        timestamp,
        length,
    })
}
