// # cf-ddns - Cloudflare DDNS Updater
//
// This binary is the thin integration layer around cf-ddns-core:
// 1. Parsing command-line flags
// 2. Locating, loading and validating the TOML configuration
// 3. Initializing logging and the runtime
// 4. Wiring the HTTPS IP detector and the Cloudflare client into the engine
// 5. Running once, or on an interval until SIGINT/SIGTERM
//
// All reconciliation logic lives in cf-ddns-core.
//
// ## Example
//
// ```bash
// cf-ddns --config /etc/cf-ddns/cf-ddns.conf --verbose
// CF_DDNS_API_TOKEN=your_token cf-ddns --once --dry-run
// ```

use anyhow::{Context, Result};
use cf_ddns_cloudflare::CloudflareProvider;
use cf_ddns_core::{DdnsConfig, DdnsEngine, EngineOptions};
use cf_ddns_ip::HttpIpDetector;
use clap::Parser;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Default configuration file name
const DEFAULT_CONFIG_NAME: &str = "cf-ddns.conf";

/// System-wide configuration directory
#[cfg(target_os = "linux")]
const SYSTEM_CONFIG_DIR: &str = "/etc/cf-ddns";

/// Exit codes for different termination scenarios
///
/// - 0: Completed run or clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Completed run or clean shutdown
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Parser, Debug)]
#[command(name = "cf-ddns")]
#[command(about = "Keeps Cloudflare A/AAAA records pointed at this host's public address", long_about = None)]
#[command(disable_version_flag = true)]
struct Args {
    /// Configuration file (absolute path, or a name searched in the usual locations)
    #[arg(short, long, default_value = DEFAULT_CONFIG_NAME)]
    config: String,

    /// Enable debug logging and DNS resolution diagnostics
    #[arg(short, long)]
    verbose: bool,

    /// Append log output to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Run a single update and exit, ignoring the configured interval
    #[arg(long)]
    once: bool,

    /// Compare and log intended changes without writing any record
    #[arg(long)]
    dry_run: bool,

    /// Print version information and exit
    #[arg(short = 'V', long)]
    version: bool,
}

fn version_string() -> String {
    format!("Cloudflare DDNS Updater v{}", env!("CARGO_PKG_VERSION"))
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.version {
        println!("{}", version_string());
        return DdnsExitCode::Success.into();
    }

    let config = match load_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = init_tracing(&args, &config) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting {}", version_string());

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run(&args, config).await {
            Ok(code) => code,
            Err(e) => {
                error!("Fatal error: {:#}", e);
                DdnsExitCode::RuntimeError
            }
        }
    });

    code.into()
}

/// Locate, load and validate the configuration, applying flag and
/// environment overrides
fn load_config(args: &Args) -> Result<DdnsConfig> {
    let path = locate_config(&args.config, &search_dirs())
        .with_context(|| format!("configuration file '{}' not found", args.config))?;

    let mut config = DdnsConfig::load(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    config.apply_env_overrides();

    if args.verbose {
        config.verbose = true;
    }
    if args.dry_run {
        config.dry_run = true;
    }

    config.validate()?;
    Ok(config)
}

/// Directories searched for a relative configuration name, in order
fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    #[cfg(target_os = "linux")]
    dirs.push(PathBuf::from(SYSTEM_CONFIG_DIR));

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    dirs
}

/// Resolve a configuration name to an existing file
///
/// Absolute paths are returned as-is when they exist. Otherwise each
/// directory is tried with the name itself and, when it lacks a `.conf`
/// suffix, with `.conf` appended.
fn locate_config(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    let path = Path::new(name);
    if path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }

    let mut candidates = vec![name.to_string()];
    if !name.ends_with(".conf") {
        candidates.push(format!("{name}.conf"));
    }

    dirs.iter()
        .flat_map(|dir| candidates.iter().map(move |c| dir.join(c)))
        .find(|candidate| candidate.is_file())
}

/// Install the global fmt subscriber
///
/// `--log` wins over `log_file` from the configuration.
fn init_tracing(args: &Args, config: &DdnsConfig) -> Result<()> {
    let level = if config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let log_path = args
        .log
        .clone()
        .or_else(|| config.log_file.as_ref().map(PathBuf::from));

    match log_path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;

            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set tracing subscriber")?;
        }
        None => {
            let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set tracing subscriber")?;
        }
    }

    Ok(())
}

/// Build the engine and drive it once or on the configured interval
async fn run(args: &Args, config: DdnsConfig) -> Result<DdnsExitCode> {
    let provider = CloudflareProvider::from_config(&config.cloudflare)?;
    let detector = HttpIpDetector::new()?;

    let (engine, events) = DdnsEngine::new(
        Box::new(detector),
        Box::new(provider),
        EngineOptions::from_config(&config),
    );
    // Decisions are already logged through tracing
    drop(events);

    if config.dry_run {
        info!("Dry-run mode: no record will be created or updated");
    }

    match config.run_interval() {
        Some(interval) if !args.once => {
            run_continuous(&engine, &config, interval).await?;
            Ok(DdnsExitCode::Success)
        }
        _ => Ok(run_single(&engine, &config).await),
    }
}

async fn run_single(engine: &DdnsEngine, config: &DdnsConfig) -> DdnsExitCode {
    match engine.run_once(config).await {
        Ok(report) => {
            if !report.is_clean() {
                warn!("Run completed with {} failure(s)", report.failures());
            }
            DdnsExitCode::Success
        }
        Err(e) => {
            error!("Run refused: {}", e);
            DdnsExitCode::ConfigError
        }
    }
}

/// Run, sleep, repeat until a shutdown signal arrives
///
/// A signal during a run abandons that run. A signal during the sleep ends
/// the loop before the next run is scheduled.
async fn run_continuous(engine: &DdnsEngine, config: &DdnsConfig, interval: Duration) -> Result<()> {
    info!("Updating every {}s", interval.as_secs());

    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                info!("Received {} during update, abandoning run", signal?);
                break;
            }
            result = engine.run_once(config) => match result {
                Ok(report) if report.is_clean() => {
                    debug!("Run completed, {} change(s)", report.changes());
                }
                Ok(report) => {
                    warn!("Run completed with {} failure(s)", report.failures());
                }
                Err(e) => error!("Run failed: {}", e),
            }
        }

        debug!("Next update in {}s", interval.as_secs());

        tokio::select! {
            signal = &mut shutdown => {
                info!("Received {}, shutting down", signal?);
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("Stopped");
    Ok(())
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to setup SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("failed to setup SIGINT handler")?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

/// Wait for Ctrl-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to wait for CTRL-C")?;
    Ok("SIGINT")
}
