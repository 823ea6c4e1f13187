//! flowsentry: rule-based network intrusion detection over PCAP flows.
//!
//! The library half of the crate holds the detection engine so that the
//! pipeline can be driven from tests as well as the CLI binary.

pub mod engine;
pub mod error;
pub mod logger;
