//! Process-wide tracing setup.
//!
//! Console output goes through a compact `fmt` layer governed by `RUST_LOG`
//! (falling back to the level chosen on the command line). GPIO controller
//! events are additionally appended to `<logs dir>/gpio_control.log` so the
//! history of hardware actions survives restarts.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tracing::{debug, Level, Subscriber};
use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    fmt,
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::error::Result;

/// File name of the GPIO audit log inside the logs directory.
pub const GPIO_LOG_FILE: &str = "gpio_control.log";

/// Tracing target prefix of the GPIO controller.
pub const GPIO_TARGET: &str = "guardian_rpi::gpio";

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Install the global subscriber. Calling it again is a no-op.
pub fn init(level: Level, logs_dir: &Path) -> Result<()> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let console = fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(env_filter);

    if tracing_subscriber::registry()
        .with(console)
        .with(gpio_file_layer(logs_dir)?)
        .try_init()
        .is_err()
    {
        debug!("a global tracing subscriber is already installed");
    }

    let _ = INSTALLED.set(());
    Ok(())
}

/// Layer appending GPIO controller events to `<logs_dir>/gpio_control.log`.
///
/// Creates the directory and the file if needed. Events from other targets
/// are dropped.
pub fn gpio_file_layer<S>(logs_dir: &Path) -> Result<impl Layer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    std::fs::create_dir_all(logs_dir)?;
    let gpio_log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(logs_dir.join(GPIO_LOG_FILE))?;

    Ok(fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(gpio_log))
        .with_filter(Targets::new().with_target(GPIO_TARGET, Level::INFO)))
}
