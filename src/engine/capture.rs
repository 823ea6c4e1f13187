//! Live packet capture to a PCAP artifact.

use pcap::Capture;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use crate::engine::config::CAPTURE_POLL_MS;
use crate::engine::types::ShutdownFlag;
use crate::error::{IdsError, Result};
use crate::logger::{Event, SharedLogger};

/// Captures traffic on `interface` into `output` for `duration` seconds.
///
/// `duration = 0` captures until the shutdown flag is set. The capture wakes
/// every [`CAPTURE_POLL_MS`] so the flag is honoured on silent interfaces.
/// Returns the number of packets written.
///
/// Fails immediately on an empty interface name, and with a capture error
/// when the device cannot be opened (bad name, missing privileges) or dies
/// mid-run.
pub fn capture_traffic(
    interface: &str,
    output: &Path,
    duration: u64,
    shutdown: &ShutdownFlag,
    logger: &SharedLogger,
) -> Result<u64> {
    if interface.trim().is_empty() {
        return Err(IdsError::Input("interface name must not be empty".into()));
    }

    let mut cap = Capture::from_device(interface)
        .map_err(|e| IdsError::Capture(format!("cannot open interface '{}': {}", interface, e)))?
        .promisc(true)
        .timeout(CAPTURE_POLL_MS)
        .open()
        .map_err(|e| {
            IdsError::Capture(format!(
                "cannot start capture on '{}' (check interface name and privileges): {}",
                interface, e
            ))
        })?;

    let mut savefile = cap
        .savefile(output)
        .map_err(|e| {
            IdsError::Capture(format!("cannot write capture file '{}': {}", output.display(), e))
        })?;

    logger.log(&Event::Info {
        message: &format!("capturing on '{}' to {}", interface, output.display()),
    });

    let deadline = if duration > 0 {
        Some(Instant::now() + Duration::from_secs(duration))
    } else {
        None
    };

    let mut written: u64 = 0;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                break;
            }
        }
        match cap.next_packet() {
            Ok(pkt) => {
                savefile.write(&pkt);
                written += 1;
            }
            // Woke up to check the deadline and shutdown flag.
            Err(pcap::Error::TimeoutExpired) => continue,
            Err(e) => {
                return Err(IdsError::Capture(format!(
                    "capture on '{}' stopped unexpectedly: {}",
                    interface, e
                )));
            }
        }
    }

    savefile
        .flush()
        .map_err(|e| IdsError::Capture(format!("cannot flush capture file: {}", e)))?;

    logger.log(&Event::Info {
        message: &format!("capture finished, {} packets written", written),
    });

    Ok(written)
}
