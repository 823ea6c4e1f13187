//! Live window controller: capture, analyze, report, repeat.
//!
//! Each window captures into a uniquely named temporary artifact, runs the
//! offline pipeline over it, and forwards only previously unseen alerts to
//! the sink. The artifact is removed on every exit path by an RAII guard,
//! and the dedup set lives for the whole run so an ongoing condition is
//! reported exactly once.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use std::{env, fs, process};

use crate::engine::capture::capture_traffic;
use crate::engine::config::{Thresholds, WINDOW_DELAY};
use crate::engine::run_detection;
use crate::engine::types::{Alert, AlertIdentity, SharedStats, ShutdownFlag};
use crate::error::{IdsError, Result};
use crate::logger::{AlertSink, Event, SharedLogger};

/// Controller phases. Progression is strictly forward within a window and
/// loops back to `Capturing` until shutdown moves it to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
    Idle,
    Capturing,
    Analyzing,
    Reporting,
    Stopped,
}

/// Run-lifetime alert deduplication keyed by [`AlertIdentity`].
#[derive(Debug, Default)]
pub struct AlertDeduper {
    seen: HashSet<AlertIdentity>,
}

impl AlertDeduper {
    pub fn new() -> Self {
        AlertDeduper::default()
    }

    /// Records the alert's identity and reports whether it was new.
    /// Identities stay in the set for the rest of the run, so a recurring
    /// condition is never reported twice.
    pub fn first_sighting(&mut self, alert: &Alert) -> bool {
        self.seen.insert(alert.identity())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Scoped ownership of one window's capture artifact. Dropping the guard
/// removes the file, whether analysis succeeded, found nothing, or failed.
struct WindowArtifact {
    path: PathBuf,
}

impl WindowArtifact {
    fn allocate(window: u64) -> Self {
        let path = env::temp_dir().join(format!(
            "flowsentry-{}-{}.pcap",
            process::id(),
            window
        ));
        WindowArtifact { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WindowArtifact {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Settings for one live run.
pub struct LiveConfig {
    pub interface:  String,
    /// Capture window length in seconds.
    pub window:     u64,
    pub thresholds: Thresholds,
    pub debug:      bool,
}

/// Runs windowed live detection until the shutdown flag is set.
///
/// Cancellation is cooperative: the flag is checked during capture and
/// during the inter-window delay, never mid-analysis (a bounded flow table
/// analyzes quickly). A capture failure in one window is reported and the
/// next window starts fresh; only invalid input parameters abort the run.
pub fn run_live(
    cfg: &LiveConfig,
    sink: &dyn AlertSink,
    logger: &SharedLogger,
    stats: &SharedStats,
    shutdown: &ShutdownFlag,
) -> Result<()> {
    if cfg.interface.trim().is_empty() {
        return Err(IdsError::Input("interface name must not be empty".into()));
    }
    if cfg.window == 0 {
        return Err(IdsError::Input("window duration must be at least 1 second".into()));
    }

    let mut state = LiveState::Idle;
    let mut deduper = AlertDeduper::new();
    let mut window: u64 = 0;

    while !shutdown.load(Ordering::Relaxed) {
        window += 1;
        let artifact = WindowArtifact::allocate(window);

        transition(&mut state, LiveState::Capturing, cfg.debug, logger);
        match capture_traffic(&cfg.interface, artifact.path(), cfg.window, shutdown, logger) {
            Ok(_) => {}
            // Parameter problems never heal on retry.
            Err(e @ IdsError::Input(_)) => return Err(e),
            Err(e) => {
                logger.log(&Event::Warn {
                    message: &format!("window {} capture failed: {}", window, e),
                });
                pause_between_windows(shutdown);
                continue;
            }
        }

        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        transition(&mut state, LiveState::Analyzing, cfg.debug, logger);
        match run_detection(artifact.path(), &cfg.thresholds, cfg.debug, logger, stats) {
            Ok(report) => {
                transition(&mut state, LiveState::Reporting, cfg.debug, logger);
                let mut new_alerts = 0usize;
                let mut suppressed = 0usize;
                for alert in &report.alerts {
                    if deduper.first_sighting(alert) {
                        sink.report(alert);
                        stats.alerts_emitted.fetch_add(1, Ordering::Relaxed);
                        new_alerts += 1;
                    } else {
                        suppressed += 1;
                    }
                }
                logger.log(&Event::WindowSummary {
                    window,
                    flows: report.flows,
                    new_alerts,
                    suppressed,
                });
            }
            Err(e) => {
                logger.log(&Event::Warn {
                    message: &format!("window {} analysis failed: {}", window, e),
                });
            }
        }

        // The artifact is write-then-read-then-delete within one window.
        drop(artifact);
        stats.windows_completed.fetch_add(1, Ordering::Relaxed);

        pause_between_windows(shutdown);
    }

    transition(&mut state, LiveState::Stopped, cfg.debug, logger);
    logger.log(&Event::Info {
        message: "live monitoring stopped",
    });
    Ok(())
}

/// Advances the controller state, tracing the transition when debugging.
fn transition(state: &mut LiveState, next: LiveState, debug: bool, logger: &SharedLogger) {
    if debug && *state != next {
        logger.log(&Event::Debug {
            message: &format!("live controller: {:?} -> {:?}", state, next),
        });
    }
    *state = next;
}

/// Throttles re-capture so near-instant windows do not spin. Sleeps in short
/// increments so a shutdown during the pause is noticed promptly.
fn pause_between_windows(shutdown: &ShutdownFlag) {
    let step = Duration::from_millis(100);
    let start = Instant::now();
    while start.elapsed() < WINDOW_DELAY {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        std::thread::sleep(step);
    }
}
