//! # RTC Session Binary
//!
//! Connects to one Ethernet RTC card, uploads its program and correction
//! files, and reports identity, errors or list status.
//!
//! # Usage
//!
//! ```bash
//! # Print card identity
//! rtc_session --config config/rtc.toml info
//!
//! # Print and clear the error register
//! rtc_session --config config/rtc.toml errors --clear
//!
//! # Poll list status every 200ms for 10s, JSON output
//! rtc_session --config config/rtc.toml --json watch --interval-ms 200 --duration-s 10
//! ```

#![deny(warnings)]

use clap::{Parser, Subcommand};
use rtc_common::card::consts::DEFAULT_CONFIG_PATH;
use rtc_common::card::error::RtcError;
use rtc_common::card::types::{ListBuffer, ListState};
use rtc_common::config::{ConfigLoader, LogLevel, SessionConfig};
use rtc_session::{ConnectionSession, GatewayRegistry, SessionHandle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// RTC Session - exclusive control of one Ethernet RTC card
#[derive(Parser, Debug)]
#[command(name = "rtc_session")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Exclusive session and list scheduling for Ethernet RTC cards")]
#[command(long_about = None)]
struct Args {
    /// Path to the session configuration file (rtc.toml)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Device gateway to use
    #[arg(short, long, default_value = "simulation")]
    gateway: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs and reports in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print firmware version, serial number, address and acquisition flag
    Info,

    /// Print the decoded error register
    Errors {
        /// Clear all error bits afterwards
        #[arg(long)]
        clear: bool,
    },

    /// Poll list status and liveness until Ctrl-C or the deadline
    Watch {
        /// Polling interval in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,

        /// Stop after this many seconds
        #[arg(long)]
        duration_s: Option<u64>,
    },
}

/// One line of `watch` output.
#[derive(Debug, Serialize)]
struct PollReport<'a> {
    lists: Vec<(ListBuffer, ListState)>,
    errors: &'a str,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("RTC session failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            setup_tracing(&args, LogLevel::Info);
            return Err(e);
        }
    };
    setup_tracing(&args, config.shared.log_level);

    info!(
        "RTC session v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    let registry = GatewayRegistry::with_builtin();
    let gateway = registry.create_gateway(&args.gateway).map_err(|e| {
        let mut available = registry.list_gateways();
        available.sort_unstable();
        format!("{}; available: {}", e, available.join(", "))
    })?;
    info!("Using gateway '{}'", gateway.name());

    let mut session = ConnectionSession::new(gateway);
    let handle = connect_with_retry(&mut session, &config)?;

    let result = match session.apply_control_settings(&handle, &config.control) {
        Ok(()) => match args.command {
            Command::Info => print_info(&mut session, &handle, args.json),
            Command::Errors { clear } => print_errors(&mut session, clear),
            Command::Watch {
                interval_ms,
                duration_s,
            } => watch(
                &mut session,
                &handle,
                Duration::from_millis(interval_ms),
                duration_s.map(Duration::from_secs),
                args.json,
            ),
        },
        Err(e) => Err(e.into()),
    };

    let released = session.disconnect(&handle);
    result?;
    released?;

    info!("RTC session shutdown complete");
    Ok(())
}

/// Load and validate rtc.toml.
fn load_config(path: &Path) -> Result<SessionConfig, Box<dyn std::error::Error>> {
    let config = SessionConfig::load(path)
        .map_err(|e| format!("Failed to load config {}: {}", path.display(), e))?;
    config.validate()?;
    Ok(config)
}

/// Connect, retrying per `[retry]`. Initialization failures are never retried.
fn connect_with_retry(
    session: &mut ConnectionSession,
    config: &SessionConfig,
) -> Result<SessionHandle, RtcError> {
    let attempts = config.retry.effective_attempts();
    let mut attempt = 1;
    loop {
        match session.connect(
            &config.card.address,
            &config.card.program_file,
            &config.card.correction_file,
        ) {
            Ok(handle) => return Ok(handle),
            Err(e @ RtcError::FatalInit(_)) => return Err(e),
            Err(e) if attempt < attempts => {
                warn!("Connect attempt {}/{} failed: {}", attempt, attempts, e);
                session.clear_errors();
                thread::sleep(config.retry.interval());
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn print_info(
    session: &mut ConnectionSession,
    handle: &SessionHandle,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let info = session.get_card_info(handle)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Firmware version: {}", info.firmware_version);
        println!("Serial number:    {}", info.serial_number);
        println!("IP address:       {}", info.ip_address);
        println!("Acquired:         {}", info.is_acquired);
    }
    Ok(())
}

fn print_errors(
    session: &mut ConnectionSession,
    clear: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mask = session.error_mask();
    if mask.is_empty() {
        println!("No errors (0x00000000)");
    } else {
        println!("0x{:08X}: {}", mask.bits(), mask.message());
    }
    if clear {
        session.clear_errors();
        info!("Error register cleared");
    }
    Ok(())
}

fn watch(
    session: &mut ConnectionSession,
    handle: &SessionHandle,
    interval: Duration,
    duration: Option<Duration>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(false, Ordering::SeqCst);
    })?;

    let deadline = duration.map(|d| Instant::now() + d);

    while running.load(Ordering::SeqCst) {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }

        session.check_connection(handle)?;
        let status = session.lists(handle)?.poll_statuses();
        let errors = session.get_error_text();

        if json {
            let report = PollReport {
                lists: status.pairs(),
                errors: &errors,
            };
            println!("{}", serde_json::to_string(&report)?);
        } else {
            let lists: Vec<String> = status
                .pairs()
                .iter()
                .map(|(buffer, state)| format!("{buffer}:{state}"))
                .collect();
            println!("lists=[{}] errors=[{}]", lists.join(" "), errors);
        }

        thread::sleep(interval);
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and configured level.
fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.verbose {
        "debug"
    } else {
        level.as_directive()
    };

    let filter = EnvFilter::from_default_env().add_directive(
        directive
            .parse()
            .unwrap_or_else(|_| tracing::Level::INFO.into()),
    );

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
