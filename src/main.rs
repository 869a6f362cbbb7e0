//! Guardian RPi - Raspberry Pi Control Agent Binary
//!
//! Serves the authenticated HTTP API, or runs a single snapshot or GPIO
//! session from the shell.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use guardian_rpi::{
    logging, run_session, start_web_server, AgentConfig, AppState, DefaultGpioBackend,
    GpioAction, GpioConfig, GuardianData, MetricsCollector, PinSet, SystemExecutor,
    DEFAULT_WEB_PORT,
};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "guardian_rpi")]
#[command(about = "Guardian RPi - Raspberry Pi control agent")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Authenticated HTTP agent exposing Raspberry Pi telemetry, service control and GPIO power switching")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Web server bind address
    #[arg(long, env = "GUARDIAN_API_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Web server port
    #[arg(
        short,
        long,
        env = "GUARDIAN_API_PORT",
        default_value_t = DEFAULT_WEB_PORT,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    port: u16,

    /// Bearer token required by authenticated routes
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// GPIO lock marker path
    #[arg(long, env = "LOCK_FILE_PATH", default_value = "./gpio.lock")]
    lock_file: PathBuf,

    /// Directory for the GPIO control log
    #[arg(long, env = "LOGS_PATH", default_value = "./logs")]
    logs_dir: PathBuf,

    /// Root directory that /files lookups are confined to (default: working directory)
    #[arg(long, env = "GUARDIAN_FILES_ROOT")]
    files_root: Option<PathBuf>,

    /// Timeout for telemetry and action commands, in seconds
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    command_timeout_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP agent (default)
    Serve,

    /// Collect the Grid Guardian data set once and print it
    Snapshot {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Run one GPIO session: on, off, reboot or test
    Gpio {
        action: GpioAction,

        /// Physical header pin numbers (1-40)
        #[arg(required = true, num_args = 1..)]
        pins: Vec<u32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(log_level(&cli), &cli.logs_dir).context("failed to initialise logging")?;

    match &cli.command {
        Some(Commands::Serve) | None => serve_command(&cli).await,
        Some(Commands::Snapshot { format }) => snapshot_command(&cli, *format).await,
        Some(Commands::Gpio { action, pins }) => gpio_command(&cli, *action, pins).await,
    }
}

fn log_level(cli: &Cli) -> Level {
    if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}

fn print_banner() {
    println!("Guardian RPi - Raspberry Pi Control Agent");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
}

fn gpio_config(cli: &Cli) -> GpioConfig {
    GpioConfig {
        lock_path: cli.lock_file.clone(),
        logs_dir: cli.logs_dir.clone(),
        ..GpioConfig::default()
    }
}

fn agent_config(cli: &Cli) -> anyhow::Result<AgentConfig> {
    let token = cli
        .token
        .as_deref()
        .context("an API token is required (--token or API_TOKEN)")?;

    let mut config = AgentConfig::new(token)
        .context("invalid API token")?
        .with_host(cli.host)
        .with_port(cli.port)
        .context("invalid port")?
        .with_lock_path(&cli.lock_file)
        .with_logs_dir(&cli.logs_dir)
        .with_command_timeout(Duration::from_secs(cli.command_timeout_secs));
    if let Some(root) = &cli.files_root {
        config = config.with_files_root(root);
    }
    Ok(config)
}

async fn serve_command(cli: &Cli) -> anyhow::Result<()> {
    let config = agent_config(cli)?;

    info!("Agent configuration:");
    info!("  - Bind address: {}", config.bind_address());
    info!("  - Files root: {}", config.files_root.display());
    info!("  - GPIO lock: {}", config.gpio.lock_path.display());
    info!("  - Logs: {}", config.logs_dir().display());

    #[cfg(feature = "gpio")]
    info!("GPIO backend: rppal");

    #[cfg(not(feature = "gpio"))]
    info!("GPIO backend: simulated (feature not compiled)");

    let state = AppState::new(
        config,
        Arc::new(SystemExecutor),
        Arc::new(DefaultGpioBackend::default()),
    )
    .context("failed to prepare agent state")?;

    print_banner();
    start_web_server(state).await?;
    Ok(())
}

async fn snapshot_command(cli: &Cli, format: OutputFormat) -> anyhow::Result<()> {
    let collector = MetricsCollector::new(
        Arc::new(SystemExecutor),
        Duration::from_secs(cli.command_timeout_secs),
    );
    let data = collector.guardian_data().await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&data)?),
        OutputFormat::Pretty => print_pretty_snapshot(&data),
    }
    Ok(())
}

async fn gpio_command(cli: &Cli, action: GpioAction, pins: &[u32]) -> anyhow::Result<()> {
    let pins = PinSet::new(pins.iter().copied())?;
    let config = gpio_config(cli);
    let session_pins = pins.clone();

    let ok = tokio::task::spawn_blocking(move || {
        run_session(&config, &DefaultGpioBackend::default(), session_pins, action)
    })
    .await
    .context("GPIO session aborted")??;

    if !ok {
        bail!("GPIO {} failed on pins {:?}", action, pins.pins());
    }
    println!("GPIO {} ok on pins {:?}", action, pins.pins());
    Ok(())
}

fn print_pretty_snapshot(data: &GuardianData) {
    println!(
        "Guardian Snapshot ({})",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("==========================================");
    println!();

    println!("System:");
    println!("  OS: {}", data.os);
    println!("  Kernel: {}", data.kernel);
    println!("  Model: {}", data.model);
    println!("  Uptime: {}", data.uptime);
    println!();

    println!("Storage (/):");
    println!("  Total: {}", data.total_memory);
    println!("  Used: {}", data.used_memory);
    println!("  Free: {}", data.free_memory);
    println!();

    println!("Hardware:");
    println!("  CPU usage: {}%", data.cpu_usage);
    println!("  Temperature: {}°C", data.temp);
    println!("  RAM: {}", data.ram);
    println!("  Cores: {}", data.cpu_cores);
    println!("  Frequency (MHz): {}", data.cpu_freq.replace('\n', ", "));
    println!();

    println!("Interpreters:");
    println!("  {}", data.python3_version);
    println!("  {}", data.python2_version);
}
