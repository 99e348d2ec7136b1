//! # Turntable Calibrator
//!
//! Writes DirectInput calibration files for connected Xbox 360 DJ Hero turntables.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load optional configuration
//!    - Set up logging with tracing subscriber
//!
//! 2. **Detection**
//!    - Enumerate HID interfaces, keep Xbox 360 controllers (`IG_` in the path)
//!    - Classify each one by subtype, or by vendor/product ID as a fallback
//!
//! 3. **Output**
//!    - Write `360table_calibration_apply.reg` and `360table_calibration_reset.reg`
//!    - Wait for Enter so the console window stays open when double-clicked
//!
//! Expected output:
//! ```text
//! INFO Found Xbox 360 HID device: \\?\HID#VID_1430&PID_1715&IG_00#...
//! INFO Vendor ID: 0x1430
//! INFO Product ID: 0x1715
//! INFO Couldn't determine subtype! Falling back to vendor/product IDs.
//! INFO Matched with wired turntable vendor/product IDs.
//! INFO Device is a wired turntable.
//! INFO Writing calibration files...
//! ```

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use turntable_calibrator::calibrator::{self, RunSummary};
use turntable_calibrator::config::{Config, LoggingConfig};
use turntable_calibrator::source::snapshot::DeviceSnapshot;

fn main() -> ExitCode {
    let (config, loaded) = match Config::discover() {
        Ok((config, path)) => (config, Ok(path)),
        Err(e) => (Config::default(), Err(e)),
    };

    let _log_guard = init_logging(&config.logging);
    info!("Turntable Calibrator v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = loaded
        .context("failed to load configuration")
        .and_then(|path| {
            if let Some(path) = path {
                info!("Using configuration from {}", path.display());
            }
            calibrate(&config)
        });

    let code = match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            println!("An unhandled error has occurred:");
            println!("{:?}", e);
            ExitCode::FAILURE
        }
    };

    if config.console.wait_for_enter {
        wait_for_enter();
    }

    code
}

/// Picks the device source and runs detection and file generation.
fn calibrate(config: &Config) -> Result<RunSummary> {
    if let Some(snapshot_path) = &config.source.snapshot {
        info!("Reading devices from snapshot {}", snapshot_path.display());
        let snapshot = DeviceSnapshot::load(snapshot_path)?;
        return Ok(calibrator::run(config, &snapshot, &snapshot)?);
    }

    calibrate_live(config)
}

#[cfg(windows)]
fn calibrate_live(config: &Config) -> Result<RunSummary> {
    use turntable_calibrator::source::windows::{ConfigManagerProperties, SetupApiEnumerator};

    let enumerator = SetupApiEnumerator::open().context("failed to enumerate HID devices")?;
    Ok(calibrator::run(config, &enumerator, &ConfigManagerProperties)?)
}

#[cfg(not(windows))]
fn calibrate_live(_config: &Config) -> Result<RunSummary> {
    anyhow::bail!(
        "live device enumeration is only available on Windows; set [source] snapshot in {}",
        turntable_calibrator::config::DEFAULT_CONFIG_FILE
    )
}

/// Initializes console logging, plus file logging when configured.
///
/// `RUST_LOG` overrides the configured level. The returned guard flushes the
/// log file when dropped.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let mut file_error = None;
    let (file_layer, guard) = match logging.file.as_deref().map(open_log_file) {
        Some(Ok(appender)) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        Some(Err(e)) => {
            file_error = Some(e);
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    if let Some(e) = file_error {
        error!("Log file disabled: {:#}", e);
    }

    guard
}

fn open_log_file(path: &Path) -> Result<RollingFileAppender> {
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("{} does not name a file", path.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy().into_owned())
        .build(directory)
        .with_context(|| format!("cannot open log file {}", path.display()))
}

/// Blocks until a line is read from stdin (or stdin closes).
fn wait_for_enter() {
    print!("Press Enter to exit...");
    let _ = io::stdout().flush();
    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);
}
