//! End-to-end offline pipeline tests: synthesize a PCAP file, run detection,
//! and check the alerts that come out.

use etherparse::PacketBuilder;
use pcap::{Capture, Linktype, Packet, PacketHeader};
use std::path::PathBuf;
use std::sync::Arc;

use flowsentry::engine::config::Thresholds;
use flowsentry::engine::run_detection;
use flowsentry::engine::types::{AlertDetails, AlertKind, SessionStats, Severity};
use flowsentry::error::IdsError;
use flowsentry::logger::Logger;

/// Removes its capture file when the test finishes, pass or fail.
struct TempPcap {
    path: PathBuf,
}

impl TempPcap {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "flowsentry-test-{}-{}.pcap",
            std::process::id(),
            name
        ));
        TempPcap { path }
    }
}

impl Drop for TempPcap {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

struct Frame {
    data: Vec<u8>,
    /// Capture timestamp in microseconds.
    ts_us: i64,
}

fn tcp_frame(src: [u8; 4], dst: [u8; 4], sport: u16, dport: u16, ts_us: i64) -> Frame {
    let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
        .ipv4(src, dst, 64)
        .tcp(sport, dport, 0, 1024);
    let mut data = Vec::with_capacity(builder.size(0));
    builder.write(&mut data, &[]).unwrap();
    Frame { data, ts_us }
}

fn write_pcap(path: &std::path::Path, frames: &[Frame]) {
    let dead = Capture::dead(Linktype::ETHERNET).unwrap();
    let mut savefile = dead.savefile(path).unwrap();
    for frame in frames {
        let header = PacketHeader {
            ts: libc::timeval {
                tv_sec:  frame.ts_us / 1_000_000,
                tv_usec: frame.ts_us % 1_000_000,
            },
            caplen: frame.data.len() as u32,
            len:    frame.data.len() as u32,
        };
        savefile.write(&Packet::new(&header, &frame.data));
    }
    savefile.flush().unwrap();
}

fn run(path: &std::path::Path) -> flowsentry::engine::DetectionReport {
    let logger = Arc::new(Logger::new(false, None).unwrap());
    let stats = SessionStats::new();
    run_detection(path, &Thresholds::default(), false, &logger, &stats).unwrap()
}

#[test]
fn detects_scan_flood_and_bruteforce_from_one_capture() {
    let pcap = TempPcap::new("mixed");
    let mut frames = Vec::new();

    // Port scan: 1.1.1.1 probes ten distinct ports on 2.2.2.2.
    for p in 1..=10u16 {
        frames.push(tcp_frame([1, 1, 1, 1], [2, 2, 2, 2], 40000, p, p as i64 * 1000));
    }

    // Flood: 1000 packets from 9.9.9.9 spanning exactly 1.0 s.
    for i in 0..999i64 {
        frames.push(tcp_frame([9, 9, 9, 9], [8, 8, 8, 8], 50000, 80, 100_000_000 + i * 1000));
    }
    frames.push(tcp_frame([9, 9, 9, 9], [8, 8, 8, 8], 50000, 80, 101_000_000));

    // Brute force: ten connections to 4.4.4.4:22 within 30 s.
    for i in 0..10i64 {
        frames.push(tcp_frame(
            [3, 3, 3, 3],
            [4, 4, 4, 4],
            50000 + i as u16,
            22,
            200_000_000 + i * 3_000_000,
        ));
    }

    write_pcap(&pcap.path, &frames);
    let report = run(&pcap.path);

    assert_eq!(report.flows, 10 + 1 + 10);
    assert_eq!(report.alerts.len(), 3);
    assert!(report.alerts.iter().all(|a| a.severity == Severity::Critical));

    let scan = report
        .alerts
        .iter()
        .find(|a| a.kind == AlertKind::PortScan)
        .expect("missing port scan alert");
    assert_eq!(scan.src_ip, "1.1.1.1");
    assert_eq!(scan.dst_ip.as_deref(), Some("2.2.2.2"));
    assert_eq!(
        scan.details,
        AlertDetails::PortScan { unique_ports_attempted: 10, threshold: 10 }
    );

    let flood = report
        .alerts
        .iter()
        .find(|a| a.kind == AlertKind::Flood)
        .expect("missing flood alert");
    assert_eq!(flood.src_ip, "9.9.9.9");
    assert_eq!(
        flood.details,
        AlertDetails::Flood {
            packets_per_sec: 1000.0,
            total_packets:   1000,
            duration_sec:    1.0,
            unique_targets:  1,
            threshold:       500.0,
        }
    );

    let brute = report
        .alerts
        .iter()
        .find(|a| a.kind == AlertKind::BruteForce)
        .expect("missing brute force alert");
    assert_eq!(brute.src_ip, "3.3.3.3");
    assert_eq!(brute.dst_ip.as_deref(), Some("4.4.4.4"));
    assert_eq!(brute.dst_port, Some(22));
    assert_eq!(
        brute.details,
        AlertDetails::BruteForce { attempts: 10, duration_sec: 27.0, threshold: 10 }
    );
}

#[test]
fn nine_ports_do_not_trip_the_scan_rule() {
    let pcap = TempPcap::new("nine-ports");
    let frames: Vec<Frame> = (1..=9u16)
        .map(|p| tcp_frame([1, 1, 1, 1], [2, 2, 2, 2], 40000, p, p as i64 * 1000))
        .collect();
    write_pcap(&pcap.path, &frames);

    let report = run(&pcap.path);
    assert_eq!(report.flows, 9);
    assert!(report.alerts.is_empty());
}

#[test]
fn capture_with_no_flows_is_no_activity_not_an_error() {
    let pcap = TempPcap::new("arp-only");
    // An ARP frame: no IP layer, so it never reaches the flow table.
    let mut arp = vec![0u8; 14];
    arp[12] = 0x08;
    arp[13] = 0x06;
    arp.extend_from_slice(&[0u8; 28]);
    write_pcap(&pcap.path, &[Frame { data: arp, ts_us: 0 }]);

    let report = run(&pcap.path);
    assert_eq!(report.flows, 0);
    assert!(report.alerts.is_empty());
}

#[test]
fn missing_pcap_is_an_input_error() {
    let logger = Arc::new(Logger::new(false, None).unwrap());
    let stats = SessionStats::new();
    let err = run_detection(
        std::path::Path::new("/nonexistent/trace.pcap"),
        &Thresholds::default(),
        false,
        &logger,
        &stats,
    )
    .unwrap_err();
    assert!(matches!(err, IdsError::Input(_)));
    assert_eq!(err.exit_code(), 2);
}
