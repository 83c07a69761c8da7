//! rawnav - console navigator and player for raw PCM audio files
//!
//! Reads commands from stdin, forwards them to the playback engine and
//! prints status messages as the engine publishes them. Logs go to stderr
//! (or the configured log file) so they never interleave with the console.

use std::fs::OpenOptions;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use rawnav_ap::audio::{CpalDevice, CpalOpener};
use rawnav_ap::browser::Browser;
use rawnav_ap::config::PlayerConfig;
use rawnav_ap::console::{Command, Console, Flow};
use rawnav_ap::playback::{PlaybackEngine, PlaybackEvent, ShutdownOutcome};
use rawnav_common::config::{resolve_start_dir, LoggingConfig, TomlConfig, START_DIR_ENV};
use rawnav_common::human_time::format_clock;
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for rawnav
#[derive(Parser, Debug)]
#[command(name = "rawnav")]
#[command(about = "Console navigator and player for raw PCM audio files")]
#[command(version)]
struct Args {
    /// Directory to start browsing in
    start_dir: Option<PathBuf>,

    /// Configuration file (default: platform config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "rawnav_ap=trace"
    #[arg(long, env = "RAWNAV_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output device name (default: system default device)
    #[arg(short, long)]
    device: Option<String>,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&toml_config.logging, args.log_level.as_deref())?;

    info!(
        "Starting rawnav {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if args.list_devices {
        for name in CpalDevice::list_devices().context("Failed to enumerate output devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    let mut config = PlayerConfig::from_toml(&toml_config).context("Invalid configuration")?;
    if let Some(device) = args.device {
        config.device.name = Some(device);
    }

    let start_dir = resolve_start_dir(args.start_dir.as_deref(), START_DIR_ENV, &toml_config);
    let browser = Browser::new(&start_dir)
        .with_context(|| format!("Cannot open start directory {}", start_dir.display()))?;
    info!("Start directory: {}", browser.cwd().display());

    let opener = Arc::new(CpalOpener::new(config.device.clone()));
    let engine =
        PlaybackEngine::start(&config, opener).context("Failed to start playback engine")?;
    let mut events = engine.control().subscribe();
    let mut console = Console::new(Arc::clone(engine.control()), browser);
    let mut lines = spawn_stdin_reader().context("Failed to start input reader")?;

    println!("rawnav: {} (h for help)", console.browser().cwd().display());

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else {
                    info!("Input closed");
                    break;
                };
                match Command::parse(&line) {
                    Ok(None) => {}
                    Ok(Some(command)) => {
                        // Commands may wait briefly for the worker
                        let flow = tokio::task::block_in_place(|| {
                            console.execute(command, &mut io::stdout())
                        })?;
                        if flow == Flow::Quit {
                            break;
                        }
                    }
                    Err(message) => println!("{}", message),
                }
            }
            event = events.recv() => match event {
                Ok(PlaybackEvent::Status(message)) => println!("{}", message),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Console missed {} playback events", missed);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = &mut shutdown => break,
        }
    }

    let timeout = config.playback.shutdown_timeout;
    let outcome = tokio::task::spawn_blocking(move || engine.shutdown())
        .await
        .context("Shutdown task failed")?;

    match outcome {
        ShutdownOutcome::Joined => println!(" END"),
        ShutdownOutcome::Detached { elapsed_secs } => println!(
            "\nWARNING: audio thread did not finish in {}s, interrupted at {}; leaving it",
            timeout.as_secs(),
            format_clock(elapsed_secs)
        ),
    }

    info!("rawnav exited");
    Ok(())
}

/// Install the tracing subscriber
///
/// Filter priority: `--log-level`, then `RUST_LOG`, then `[logging] level`.
fn init_tracing(logging: &LoggingConfig, cli_level: Option<&str>) -> Result<()> {
    let filter = match cli_level {
        Some(level) => EnvFilter::try_new(level),
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&logging.level)),
    }
    .context("Invalid log filter")?;

    let registry = tracing_subscriber::registry().with(filter);
    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            registry
                .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                .init();
        }
        None => registry.with(fmt::layer().with_writer(io::stderr)).init(),
    }
    Ok(())
}

/// Forward stdin lines from a blocking reader thread
fn spawn_stdin_reader() -> io::Result<mpsc::UnboundedReceiver<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("rawnav-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to read input: {}", e);
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
