mod cli;

use clap::Parser;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use cli::{Cli, Command};
use flowsentry::engine::capture::capture_traffic;
use flowsentry::engine::live::{run_live, LiveConfig};
use flowsentry::engine::run_detection;
use flowsentry::engine::types::{SessionStats, SharedStats, ShutdownFlag};
use flowsentry::logger::{AlertSink, ConsoleSink, Event, Logger, SharedLogger};

fn main() {
    let cli = Cli::parse();

    // Initialize shutdown flag for graceful termination
    let shutdown: ShutdownFlag = Arc::new(AtomicBool::new(false));
    let session_start = Instant::now();

    // Initialize logger with optional JSON output and file logging
    let logger = Arc::new(
        Logger::new(cli.json, cli.log_file.as_deref()).expect("Failed to open log file"),
    );

    let stats = SessionStats::new();

    register_shutdown_handler(Arc::clone(&shutdown));

    let result = match cli.command {
        Command::Capture { interface, output, duration } => {
            capture_traffic(&interface, Path::new(&output), duration, &shutdown, &logger)
                .map(|_| ())
        }

        Command::Detect { pcap, debug, thresholds } => {
            let sink = ConsoleSink::new(Arc::clone(&logger));
            run_detection(
                Path::new(&pcap),
                &thresholds.to_thresholds(),
                debug,
                &logger,
                &stats,
            )
            .map(|report| {
                if report.alerts.is_empty() {
                    logger.log(&Event::Info { message: "no threats detected" });
                } else {
                    for alert in &report.alerts {
                        sink.report(alert);
                        stats.alerts_emitted.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        }

        Command::Live { interface, window, debug, thresholds } => {
            logger.log(&Event::Info {
                message: &format!(
                    "starting live detection on '{}' with {}s windows (Ctrl+C to stop)",
                    interface, window
                ),
            });
            let sink = ConsoleSink::new(Arc::clone(&logger));
            let cfg = LiveConfig {
                interface,
                window,
                thresholds: thresholds.to_thresholds(),
                debug,
            };
            let outcome = run_live(&cfg, &sink, &logger, &stats, &shutdown);
            print_summary(&logger, &stats, session_start);
            outcome
        }

        Command::Train { pcap: _ } => {
            logger.log(&Event::Info {
                message: "training is not implemented yet; this version is rule-based only",
            });
            Ok(())
        }
    };

    if let Err(e) = result {
        logger.log(&Event::Warn { message: &e.to_string() });
        std::process::exit(e.exit_code());
    }
}

/// Registers a signal handler for graceful shutdown on Ctrl+C
fn register_shutdown_handler(shutdown: ShutdownFlag) {
    if let Err(e) = ctrlc::set_handler(move || {
        println!("\n[!] Ctrl+C received, shutting down...");
        shutdown.store(true, Ordering::SeqCst);
    }) {
        eprintln!("failed to register Ctrl+C handler: {}", e);
        std::process::exit(1);
    }
}

/// Prints session summary statistics after a live run.
fn print_summary(logger: &SharedLogger, stats: &SharedStats, session_start: Instant) {
    logger.log(&Event::SessionSummary {
        duration_secs:  session_start.elapsed().as_secs(),
        windows:        stats.windows_completed.load(Ordering::Relaxed),
        packets_total:  stats.packets_total.load(Ordering::Relaxed),
        flows_total:    stats.flows_total.load(Ordering::Relaxed),
        alerts_emitted: stats.alerts_emitted.load(Ordering::Relaxed),
    });
}
