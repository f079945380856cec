//! Antifraud Sensor CLI
//!
//! Operator tooling around the library: collect a fingerprint from a
//! recorded device profile, replay recorded interaction logs through a
//! tracker, or score a live JSONL event stream from stdin.

#[cfg(not(target_arch = "wasm32"))]
use anyhow::{Context, Result};
#[cfg(not(target_arch = "wasm32"))]
use antifraud_sensor::{
    config::Config,
    core::{BehaviorTracker, BehavioralReport, Clock, ManualClock},
    env::{self, EnvironmentProbe, EnvironmentProfile, RecordedEnvironment},
    FingerprintCollector, InteractionEvent, LocalEventBus, VERSION,
};
#[cfg(not(target_arch = "wasm32"))]
use clap::{Parser, Subcommand};
#[cfg(not(target_arch = "wasm32"))]
use std::io::BufRead;
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};
#[cfg(not(target_arch = "wasm32"))]
use std::rc::Rc;
#[cfg(not(target_arch = "wasm32"))]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(not(target_arch = "wasm32"))]
use std::sync::Arc;
#[cfg(not(target_arch = "wasm32"))]
use std::thread;
#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};
#[cfg(not(target_arch = "wasm32"))]
use tracing::{debug, warn};
#[cfg(not(target_arch = "wasm32"))]
use tracing_subscriber::EnvFilter;

#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser)]
#[command(name = "antifraud-sensor")]
#[command(version = VERSION)]
#[command(about = "Device fingerprinting and behavioral bot scoring", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the per-user config path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(not(target_arch = "wasm32"))]
#[derive(Subcommand)]
enum Commands {
    /// Collect a device fingerprint and print it as JSON
    Fingerprint {
        /// Recorded environment profile (JSON); without one the host
        /// environment is detected
        #[arg(long)]
        profile: Option<PathBuf>,

        /// Print only the digest
        #[arg(long)]
        digest_only: bool,
    },

    /// Replay a JSONL interaction log through a tracker and print the report
    Replay {
        /// One InteractionEvent JSON object per line
        path: PathBuf,

        /// Pages to mark as visited before replaying
        #[arg(long = "page")]
        pages: Vec<String>,
    },

    /// Score a live JSONL event stream read from stdin
    Monitor {
        /// Seconds between periodic reports
        #[arg(long, default_value = "10")]
        interval: u64,
    },

    /// Show configuration
    Config,
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Fingerprint {
            profile,
            digest_only,
        } => cmd_fingerprint(&config, profile.as_deref(), digest_only),
        Commands::Replay { path, pages } => cmd_replay(&config, &path, &pages),
        Commands::Monitor { interval } => cmd_monitor(&config, interval),
        Commands::Config => cmd_config(&config, cli.config.as_deref()),
    });

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// The sensor is a library in browser builds; there is no CLI there.
#[cfg(target_arch = "wasm32")]
fn main() {}

/// Log to stderr so JSON on stdout stays parseable.
#[cfg(not(target_arch = "wasm32"))]
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("antifraud_sensor=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(not(target_arch = "wasm32"))]
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    config.context("could not load configuration")
}

#[cfg(not(target_arch = "wasm32"))]
fn cmd_fingerprint(config: &Config, profile: Option<&Path>, digest_only: bool) -> Result<()> {
    let environment: Box<dyn EnvironmentProbe> = match profile {
        Some(path) => {
            let profile = EnvironmentProfile::from_file(path)
                .with_context(|| format!("could not read profile {}", path.display()))?;
            Box::new(RecordedEnvironment::new(profile))
        }
        None => env::detect(),
    };
    let collector = FingerprintCollector::new(environment, config.collector.clone());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let fingerprint = runtime.block_on(collector.collect())?;

    if digest_only {
        println!("{}", fingerprint.raw_digest);
    } else {
        println!("{}", serde_json::to_string_pretty(&fingerprint)?);
    }
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn cmd_replay(config: &Config, path: &Path, pages: &[String]) -> Result<()> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("could not open {}", path.display()))?;
    let events = parse_events(std::io::BufReader::new(file))?;

    let start = events
        .first()
        .map(InteractionEvent::timestamp)
        .unwrap_or_else(chrono::Utc::now);
    let clock = Rc::new(ManualClock::new(start));
    let bus = Rc::new(LocalEventBus::new());
    let tracker = BehaviorTracker::with_clock(bus.clone(), config, clock.clone());

    for page in pages {
        tracker.on_page_visited(page);
    }
    for event in &events {
        // Session time follows the recording, not the wall clock
        if event.timestamp() > clock.now() {
            clock.set(event.timestamp());
        }
        bus.dispatch(event);
    }

    print_report(&tracker.snapshot())?;
    tracker.stop();
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn parse_events(reader: impl BufRead) -> Result<Vec<InteractionEvent>> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: InteractionEvent = serde_json::from_str(&line)
            .with_context(|| format!("line {}: not an interaction event", index + 1))?;
        events.push(event);
    }
    Ok(events)
}

#[cfg(not(target_arch = "wasm32"))]
fn cmd_monitor(config: &Config, interval: u64) -> Result<()> {
    eprintln!("Antifraud Sensor v{VERSION}");
    eprintln!("Reading JSONL events from stdin. Press Ctrl+C to stop.");

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    // Stdin blocks, so it gets its own thread; the tracker stays on this one
    let (sender, receiver) = crossbeam_channel::bounded::<InteractionEvent>(1024);
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for (index, line) in stdin.lock().lines().enumerate() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<InteractionEvent>(&line) {
                Ok(event) => {
                    if sender.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(line = index + 1, error = %e, "skipping malformed event"),
            }
        }
        debug!("stdin closed");
    });

    let bus = Rc::new(LocalEventBus::new());
    let tracker = BehaviorTracker::new(bus.clone(), config);
    let period = Duration::from_secs(interval.max(1));
    let mut last_report = Instant::now();

    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => bus.dispatch(&event),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }

        if last_report.elapsed() >= period {
            print_report(&tracker.snapshot())?;
            last_report = Instant::now();
        }
    }

    tracker.stop();
    print_report(&tracker.snapshot())?;
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn cmd_config(config: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(Config::config_path);

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", path);
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn print_report(report: &BehavioralReport) -> Result<()> {
    println!("{}", serde_json::to_string(report)?);
    Ok(())
}

/// Set up Ctrl+C handler.
#[cfg(not(target_arch = "wasm32"))]
fn ctrlc_handler(running: Arc<AtomicBool>) {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn test_parse_events_skips_blank_lines() {
        let log = "{\"type\":\"focus\",\"timestamp\":\"2024-01-01T00:00:00Z\"}\n\n\
                   {\"type\":\"keydown\",\"timestamp\":\"2024-01-01T00:00:01Z\",\"key\":\"a\"}\n";
        let events = parse_events(log.as_bytes()).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_parse_events_reports_line() {
        let log = "{\"type\":\"focus\",\"timestamp\":\"2024-01-01T00:00:00Z\"}\nnot json\n";
        let err = parse_events(log.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
