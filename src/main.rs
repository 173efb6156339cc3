//! EEG Stress Agent CLI
//!
//! Streams headset payloads through the stress pipeline and prints verdicts.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use crossbeam_channel::select;
use eeg_stress_agent::{
    collector::{write_recording, Collector, SyntheticSource},
    config::{Config, SourceKind},
    core::frame::parse_hex_payload,
    transparency::{create_shared_log_with_persistence, TransparencyStats},
    ChannelEmitter, ClassificationEvent, LinearClassifier, StressMonitor, VERSION,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Verdicts buffered between the pipeline and the CLI loop.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Parser)]
#[command(name = "eeg-stress")]
#[command(version = VERSION)]
#[command(about = "Real-time EEG stress monitor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start streaming and classifying
    Start {
        /// Payload source (synthetic or replay)
        #[arg(long)]
        source: Option<SourceKind>,

        /// Recording to replay (implies --source replay)
        #[arg(long)]
        replay_file: Option<PathBuf>,

        /// Generate a stressed synthetic signal
        #[arg(long)]
        stress: bool,

        /// Inference period in milliseconds
        #[arg(long)]
        tick_ms: Option<u64>,
    },

    /// Pause inference on a running agent
    Pause,

    /// Resume inference on a running agent
    Resume,

    /// Show configuration and cumulative statistics
    Status,

    /// Show configuration
    Config,

    /// Decode one hex-encoded payload and print its channels
    Decode {
        /// Payload bytes as hex (whitespace allowed)
        hex: String,
    },

    /// Write a synthetic recording usable with --replay-file
    Record {
        /// Output file
        #[arg(long, short)]
        output: PathBuf,

        /// Number of frames to write
        #[arg(long, default_value = "1000")]
        frames: usize,

        /// Record the stressed signal
        #[arg(long)]
        stress: bool,
    },

    /// Export verdicts from recorded sessions
    Export {
        /// Output directory for the export
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Export format (json or jsonl)
        #[arg(long, default_value = "json", value_parser = ["json", "jsonl"])]
        format: String,
    },
}

/// Session file written when `start` exits.
#[derive(Debug, Serialize, Deserialize)]
struct SessionExport {
    session_id: Uuid,
    host: String,
    agent_version: String,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    stats: TransparencyStats,
    events: Vec<ClassificationEvent>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            source,
            replay_file,
            stress,
            tick_ms,
        } => cmd_start(source, replay_file, stress, tick_ms),
        Commands::Pause => cmd_set_paused(true),
        Commands::Resume => cmd_set_paused(false),
        Commands::Status => cmd_status(),
        Commands::Config => cmd_config(),
        Commands::Decode { hex } => cmd_decode(&hex),
        Commands::Record {
            output,
            frames,
            stress,
        } => cmd_record(&output, frames, stress),
        Commands::Export { output, format } => cmd_export(output, &format),
    }
}

fn cmd_start(
    source: Option<SourceKind>,
    replay_file: Option<PathBuf>,
    stress: bool,
    tick_ms: Option<u64>,
) -> Result<()> {
    println!("EEG Stress Agent v{VERSION}");
    println!();

    let mut config = Config::load().context("Could not load configuration")?;
    if let Some(path) = replay_file {
        config.source.kind = SourceKind::Replay;
        config.source.replay_file = Some(path);
    }
    if let Some(kind) = source {
        config.source.kind = kind;
    }
    if stress {
        config.source.stress = true;
    }
    if let Some(ms) = tick_ms {
        config.pipeline.tick_period = Duration::from_millis(ms);
    }
    config.pipeline.validate()?;

    if let Err(e) = config.ensure_directories() {
        warn!("Could not create directories: {e}");
    }

    println!("Starting monitor...");
    println!("  Source: {:?}", config.source.kind);
    if let Some(ref path) = config.source.replay_file {
        println!("  Replay file: {}", path.display());
    }
    println!("  Tick period: {:?}", config.pipeline.tick_period);
    println!(
        "  Windows: {} frames, {} probabilities, {} predictions",
        config.pipeline.window_capacity,
        config.pipeline.probability_window_size,
        config.pipeline.prediction_window_size
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let transparency_log =
        create_shared_log_with_persistence(config.data_path.join("transparency.json"));

    let classifier = LinearClassifier::new(config.classifier.clone())
        .context("Invalid classifier configuration")?;
    let (emitter, events) = ChannelEmitter::new(EVENT_CHANNEL_CAPACITY);
    let emitter = Arc::new(emitter);
    let mut monitor = StressMonitor::with_log(
        config.pipeline.clone(),
        Box::new(classifier),
        emitter.clone(),
        Arc::clone(&transparency_log),
    )?;
    let mut collector = Collector::from_config(&config.source)?;

    // The scheduler runs on this runtime; the CLI loop stays synchronous.
    let runtime = tokio::runtime::Runtime::new().context("Could not start tokio runtime")?;
    let _guard = runtime.enter();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")?;

    let session_id = Uuid::new_v4();
    let started_at = Utc::now();
    println!("Session ID: {session_id}");

    // `eeg-stress pause/resume` flips the flag in the config file.
    let mut paused = config.paused;
    let mut last_config_check = Instant::now();
    if paused {
        println!("Inference is currently paused.");
        println!("Run `eeg-stress resume` to start.");
        println!();
    } else {
        collector.start()?;
        monitor.start()?;
    }

    let payloads = collector.receiver().clone();
    let mut recorded: Vec<ClassificationEvent> = Vec::new();

    while running.load(Ordering::SeqCst) {
        if last_config_check.elapsed() >= Duration::from_secs(1) {
            if let Ok(cfg) = Config::load() {
                if cfg.paused != paused {
                    paused = cfg.paused;
                    if paused {
                        println!();
                        println!("Pausing inference...");
                        monitor.stop();
                        collector.stop();
                        while payloads.try_recv().is_ok() {}
                    } else {
                        println!();
                        println!("Resuming inference...");
                        collector.start()?;
                        monitor.start()?;
                    }
                }
            }
            last_config_check = Instant::now();
        }

        if paused {
            thread::sleep(Duration::from_millis(100));
            continue;
        }

        select! {
            recv(payloads) -> msg => {
                if let Ok(payload) = msg {
                    // Failures are counted and logged by the pipeline
                    let _ = monitor.ingest(&payload);
                }
            }
            recv(events) -> msg => {
                if let Ok(event) = msg {
                    print_event(&event);
                    recorded.push(event);
                }
            }
            default(Duration::from_millis(100)) => {
                if !collector.is_running() && payloads.is_empty() {
                    info!("Payload source finished");
                    break;
                }
            }
        }
    }

    println!();
    println!("Stopping monitor...");
    monitor.stop();
    collector.stop();
    recorded.extend(events.try_iter());

    if emitter.dropped() > 0 {
        warn!("{} verdicts dropped by a full event channel", emitter.dropped());
    }
    if collector.dropped() > 0 {
        warn!("{} payloads dropped by a full payload channel", collector.dropped());
    }

    let export = SessionExport {
        session_id,
        host: hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string()),
        agent_version: VERSION.to_string(),
        started_at,
        ended_at: Utc::now(),
        stats: transparency_log.stats(),
        events: recorded,
    };
    match write_session(&config.export_path, &export) {
        Ok(path) => println!(
            "Exported {} verdicts to {}",
            export.events.len(),
            path.display()
        ),
        Err(e) => eprintln!("Error exporting session: {e:#}"),
    }

    if let Err(e) = transparency_log.save() {
        eprintln!("Error saving statistics: {e}");
    }

    println!();
    println!("{}", transparency_log.summary());
    Ok(())
}

fn print_event(event: &ClassificationEvent) {
    println!(
        "[{}] {:<7} p={:.3} confidence={:.2} consecutive={}",
        event.emitted_at.format("%H:%M:%S%.3f"),
        event.label,
        event.probability,
        event.confidence,
        event.consecutive
    );
}

fn write_session(dir: &Path, export: &SessionExport) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Could not create {}", dir.display()))?;
    let path = dir.join(format!(
        "session_{}.json",
        export.started_at.format("%Y%m%d_%H%M%S")
    ));
    let json = serde_json::to_string_pretty(export)?;
    std::fs::write(&path, json).with_context(|| format!("Could not write {}", path.display()))?;
    Ok(path)
}

fn cmd_set_paused(paused: bool) -> Result<()> {
    let mut config = Config::load()?;
    config.paused = paused;
    config.save().context("Error saving config")?;

    if paused {
        println!("Inference paused. Use 'eeg-stress resume' to continue.");
    } else {
        println!("Inference resumed.");
    }
    Ok(())
}

fn cmd_status() -> Result<()> {
    let config = Config::load()?;

    println!("EEG Stress Agent Status");
    println!("=======================");
    println!();
    println!("Configuration:");
    println!("  Source: {:?}", config.source.kind);
    println!("  Tick period: {:?}", config.pipeline.tick_period);
    println!(
        "  Stability threshold: {}",
        config.pipeline.stability_threshold
    );
    println!("  Paused: {}", config.paused);
    println!();

    let stats_path = config.data_path.join("transparency.json");
    if !stats_path.exists() {
        println!("No previous session data found.");
        return Ok(());
    }

    let content = std::fs::read_to_string(&stats_path)?;
    let stats: serde_json::Value = serde_json::from_str(&content)?;
    println!("Cumulative Statistics:");
    for (key, label) in [
        ("payloads_received", "Payloads received"),
        ("decode_failures", "Payloads dropped"),
        ("ticks", "Inference ticks"),
        ("classifier_failures", "Classifier failures"),
        ("events_emitted", "Verdicts emitted"),
        ("ticks_suppressed", "Verdicts held back"),
    ] {
        if let Some(value) = stats.get(key) {
            println!("  {label}: {value}");
        }
    }
    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = Config::load()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {}", Config::config_path().display());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_decode(hex: &str) -> Result<()> {
    let payload = parse_hex_payload(hex)?;
    let frame = eeg_stress_agent::decode_frame(&payload)?;

    for (channel, value) in frame.channels().iter().enumerate() {
        println!("ch{channel:02}: {value:>9}");
    }
    if payload.len() > eeg_stress_agent::core::FRAME_PAYLOAD_LEN {
        println!(
            "({} trailing bytes ignored)",
            payload.len() - eeg_stress_agent::core::FRAME_PAYLOAD_LEN
        );
    }
    Ok(())
}

fn cmd_record(output: &Path, frames: usize, stress: bool) -> Result<()> {
    let mut source = SyntheticSource::new(stress);
    let written = write_recording(output, (0..frames).map(|_| source.next_frame()))
        .with_context(|| format!("Could not write {}", output.display()))?;

    println!(
        "Wrote {written} {} frames to {}",
        if stress { "stressed" } else { "relaxed" },
        output.display()
    );
    Ok(())
}

fn cmd_export(output: Option<PathBuf>, format: &str) -> Result<()> {
    let config = Config::load()?;
    let export_dir = output.unwrap_or_else(|| config.export_path.clone());

    let mut session_files: Vec<PathBuf> = std::fs::read_dir(&config.export_path)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with("session_") && n.ends_with(".json"))
                })
                .collect()
        })
        .unwrap_or_default();
    session_files.sort();

    if session_files.is_empty() {
        println!("No session data found in {}", config.export_path.display());
        println!("Run 'eeg-stress start' to begin a session.");
        return Ok(());
    }

    println!("Found {} session file(s)", session_files.len());

    let mut all_events: Vec<ClassificationEvent> = Vec::new();
    for file in &session_files {
        let content = std::fs::read_to_string(file)?;
        match serde_json::from_str::<SessionExport>(&content) {
            Ok(session) => all_events.extend(session.events),
            Err(e) => warn!("Skipping {}: {e}", file.display()),
        }
    }

    println!("Total verdicts: {}", all_events.len());

    std::fs::create_dir_all(&export_dir)?;
    let output_path = export_dir.join(format!(
        "export_{}.{format}",
        Utc::now().format("%Y%m%d_%H%M%S")
    ));

    let body = match format {
        "jsonl" => {
            let lines = all_events
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()?;
            lines.join("\n")
        }
        "json" => serde_json::to_string_pretty(&all_events)?,
        other => bail!("Unknown export format '{other}'"),
    };
    std::fs::write(&output_path, body)
        .with_context(|| format!("Could not write {}", output_path.display()))?;

    println!("Exported to {}", output_path.display());
    Ok(())
}
