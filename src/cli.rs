use clap::{Args, Parser, Subcommand};

use flowsentry::engine::config::Thresholds;

/// flowsentry — rule-based network intrusion detection over PCAP flows.
///
/// Aggregates captured packets into 5-tuple flows and scans the flow table
/// for port scans, traffic floods, and brute-force login attempts, either
/// against a saved capture file or live in fixed-duration windows.
#[derive(Parser, Debug, Clone)]
#[command(
    name    = "flowsentry",
    version = "0.2.0",
    about   = "Rule-based network intrusion detection over PCAP flows",
    long_about = None,
)]
pub struct Cli {
    /// Emit log entries as newline-delimited JSON (NDJSON).
    ///
    /// Each event is a self-contained JSON object on its own line, suitable
    /// for ingestion by log shippers (Logstash, Fluentd, Vector) or SIEM
    /// platforms (Splunk, Elastic, Loki).
    #[arg(short = 'j', long = "json", global = true)]
    pub json: bool,

    /// Write log output to this file in addition to stdout.
    ///
    /// The file is created if it does not exist and appended to if it does.
    /// JSON mode (--json) affects the format written to this file as well.
    #[arg(short = 'o', long = "log-file", global = true, value_name = "PATH")]
    pub log_file: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Capture network traffic and save it to a PCAP file.
    Capture {
        /// Network interface to capture on.
        #[arg(short = 'i', long = "interface", value_name = "IFACE")]
        interface: String,

        /// Output PCAP file.
        #[arg(long = "output", value_name = "FILE", default_value = "capture.pcap")]
        output: String,

        /// Capture duration in seconds (0 = until stopped with Ctrl+C).
        #[arg(long = "duration", value_name = "SECS", default_value_t = 0)]
        duration: u64,
    },

    /// Analyze a PCAP file for possible intrusions.
    Detect {
        /// PCAP file to analyze.
        #[arg(value_name = "PCAP")]
        pcap: String,

        /// Enable debug output (dumps the leading flows).
        #[arg(long = "debug")]
        debug: bool,

        #[command(flatten)]
        thresholds: ThresholdArgs,
    },

    /// Run live window-based intrusion detection until interrupted.
    Live {
        /// Network interface to capture on.
        #[arg(short = 'i', long = "interface", value_name = "IFACE")]
        interface: String,

        /// Capture window size in seconds.
        #[arg(short = 'w', long = "window", value_name = "SECS", default_value_t = 5)]
        window: u64,

        /// Enable debug output.
        #[arg(long = "debug")]
        debug: bool,

        #[command(flatten)]
        thresholds: ThresholdArgs,
    },

    /// Train an anomaly detection model (not implemented yet).
    Train {
        /// PCAP file containing normal traffic.
        #[arg(value_name = "PCAP")]
        pcap: String,
    },
}

/// Detection threshold overrides shared by `detect` and `live`.
#[derive(Args, Debug, Clone)]
pub struct ThresholdArgs {
    /// Distinct destination ports on one (src, dst) pair before a PORT_SCAN alert fires.
    #[arg(long = "port-scan-threshold", value_name = "N", default_value_t = 10)]
    pub port_scan_threshold: usize,

    /// Aggregate packets-per-second above which a source triggers a FLOOD alert.
    #[arg(long = "pps-threshold", value_name = "RATE", default_value_t = 500.0)]
    pub pps_threshold: f64,

    /// Minimum total packets from a source before it is a flood candidate.
    #[arg(long = "flood-min-packets", value_name = "N", default_value_t = 500)]
    pub flood_min_packets: u64,

    /// Minimum observation duration (seconds) before a source is a flood candidate.
    #[arg(long = "flood-min-duration", value_name = "SECS", default_value_t = 1.0)]
    pub flood_min_duration: f64,

    /// Packets to one (src, dst, port) triple before a BRUTE_FORCE alert fires.
    #[arg(long = "attempt-threshold", value_name = "N", default_value_t = 10)]
    pub attempt_threshold: u64,

    /// Attempts spread over more than this many seconds are not brute-forcing.
    #[arg(long = "max-attempt-duration", value_name = "SECS", default_value_t = 60.0)]
    pub max_attempt_duration: f64,
}

impl ThresholdArgs {
    pub fn to_thresholds(&self) -> Thresholds {
        Thresholds {
            port_scan:               self.port_scan_threshold,
            pps:                     self.pps_threshold,
            flood_min_packets:       self.flood_min_packets,
            flood_min_duration:      self.flood_min_duration,
            bruteforce_attempts:     self.attempt_threshold,
            bruteforce_max_duration: self.max_attempt_duration,
            ..Thresholds::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_parses_with_defaults() {
        let cli = Cli::parse_from(["flowsentry", "detect", "traffic.pcap"]);
        match cli.command {
            Command::Detect { pcap, debug, thresholds } => {
                assert_eq!(pcap, "traffic.pcap");
                assert!(!debug);
                let t = thresholds.to_thresholds();
                assert_eq!(t.port_scan, 10);
                assert_eq!(t.pps, 500.0);
                assert_eq!(t.bruteforce_attempts, 10);
                assert!(t.monitored_ports.contains(&22));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn live_accepts_threshold_overrides() {
        let cli = Cli::parse_from([
            "flowsentry",
            "live",
            "--interface",
            "eth0",
            "--window",
            "10",
            "--port-scan-threshold",
            "25",
        ]);
        match cli.command {
            Command::Live { interface, window, thresholds, .. } => {
                assert_eq!(interface, "eth0");
                assert_eq!(window, 10);
                assert_eq!(thresholds.to_thresholds().port_scan, 25);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
