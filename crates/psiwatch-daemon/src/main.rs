use anyhow::Result;
use clap::{Parser, Subcommand};
use psiwatch_core::{
    exit_code, kernel, Clock, Domain, LocalClock, PollWaiter, PressureSnapshot, TerminationSignals,
    ThreadPause, VERSION,
};
use psiwatch_daemon::{Config, PressureMonitor};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// psiwatch - Pressure Stall Information trigger monitor
///
/// Registers CPU, IO and memory distress triggers with the kernel and prints
/// a line each time one fires. Exit codes: 1 kernel unsupported, 2 open failed,
/// 3 write failed, 4 wait failed, 5 pressure file gone, 6 unrecognized event,
/// 7 invalid configuration, 8 other I/O failure.
#[derive(Parser, Debug)]
#[command(name = "psiwatch")]
#[command(version = VERSION)]
#[command(about = "psiwatch - PSI trigger monitor", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/psiwatch/config.toml")]
    config: PathBuf,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register triggers and report distress events until interrupted
    Watch,

    /// Print current pressure averages once
    Status {
        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Output path for config file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Watch);

    // Termination signals are blocked before the log writer thread exists so
    // that thread inherits the mask and the signalfd sees every request.
    let signals = match command {
        Commands::Watch => match TerminationSignals::install() {
            Ok(signals) => Some(signals),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(e.exit_code());
            }
        },
        _ => None,
    };

    let config_found = cli.config.exists();
    let config = match load_config(&cli.config, config_found) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(exit_code::INVALID_CONFIG);
        }
    };

    let _guard = match init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {:#}", e);
            return ExitCode::from(exit_code::IO);
        }
    };

    info!("psiwatch v{} starting...", VERSION);
    if config_found {
        info!("Configuration loaded from {:?}", cli.config);
    } else {
        warn!("Configuration file not found: {:?}, using defaults", cli.config);
    }

    match command {
        Commands::Watch => match signals {
            Some(signals) => run_watch(&config, signals),
            None => ExitCode::from(exit_code::PRESSURE_POLL),
        },
        Commands::Status { json } => run_status(&config, json),
        Commands::GenerateConfig { output } => match generate_config(&output) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{:#}", e);
                ExitCode::from(exit_code::IO)
            }
        },
    }
}

/// Register triggers and block on them until SIGINT/SIGTERM
fn run_watch(config: &Config, signals: TerminationSignals) -> ExitCode {
    info!("Polling events starting at {}", LocalClock.timestamp());

    let mut monitor = PressureMonitor::new(config, std::io::stdout().lock(), LocalClock);

    let result = monitor.start().and_then(|_| {
        let mut waiter = PollWaiter::new(signals);
        monitor.run(&mut waiter, &mut ThreadPause)
    });

    match result {
        Ok(summary) => {
            info!(
                "Monitor stopped after {} wakes, {} events",
                summary.wakes,
                summary.events.iter().map(|(_, n)| n).sum::<u64>()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// One-shot read of all pressure files
fn run_status(config: &Config, json: bool) -> ExitCode {
    if let Err(e) = kernel::verify_interface(&config.pressure.root) {
        error!("{}", e);
        return ExitCode::from(e.exit_code());
    }

    let mut snapshots = BTreeMap::new();
    for domain in Domain::ALL {
        match PressureSnapshot::read(&config.path(domain)) {
            Ok(snapshot) => {
                snapshots.insert(domain, snapshot);
            }
            Err(e) => {
                error!("Failed to read {} pressure: {}", domain, e);
                return ExitCode::from(e.exit_code());
            }
        }
    }

    if json {
        match serde_json::to_string_pretty(&snapshots) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                error!("Failed to encode status: {}", e);
                return ExitCode::from(exit_code::IO);
            }
        }
        return ExitCode::SUCCESS;
    }

    for (domain, snapshot) in &snapshots {
        println!(
            "{:<7} {:<8} some avg10={:.2} avg60={:.2} avg300={:.2} total={}",
            domain,
            snapshot.level(),
            snapshot.some.avg10,
            snapshot.some.avg60,
            snapshot.some.avg300,
            snapshot.some.total
        );
        if let Some(full) = snapshot.full {
            println!(
                "{:<16} full avg10={:.2} avg60={:.2} avg300={:.2} total={}",
                "", full.avg10, full.avg60, full.avg300, full.total
            );
        }
    }

    ExitCode::SUCCESS
}

/// Generate default configuration file
fn generate_config(output: &Path) -> Result<()> {
    info!("Generating default configuration file: {:?}", output);

    Config::default()
        .save_to_file(output)
        .map_err(|e| anyhow::anyhow!("Failed to save configuration file: {}", e))?;

    info!("Configuration file generated successfully");
    Ok(())
}

/// Load configuration from file or use defaults, then validate it
fn load_config(path: &Path, found: bool) -> Result<Config> {
    let config = if found {
        Config::load_from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load configuration file: {}", e))?
    } else {
        Config::default()
    };

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

    Ok(config)
}

/// Initialize logging with stderr and optional daily file output
///
/// Stdout is reserved for event records.
fn init_logging(config: &Config) -> Result<Option<WorkerGuard>> {
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false);

    if !config.logging.file_enabled {
        tracing_subscriber::registry()
            .with(stderr_layer)
            .with(filter)
            .init();
        return Ok(None);
    }

    std::fs::create_dir_all(&config.logging.log_dir)?;

    let file_appender =
        tracing_appender::rolling::daily(&config.logging.log_dir, &config.logging.file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .with(filter)
        .init();

    Ok(Some(guard))
}
