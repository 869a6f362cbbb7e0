//! # Guardian RPi - Raspberry Pi Control Agent
//!
//! A small HTTP agent that exposes a Raspberry Pi's telemetry and a handful of
//! control actions (service control, host reboot, GPIO power switching) to a
//! remote Grid Guardian server.
//!
//! ## Features
//!
//! - **Bearer-token gate**: every route except `/health` and `/version`
//!   requires `Authorization: Bearer <token>`, compared in constant time
//! - **Whitelisted commands**: telemetry comes from a fixed command catalog run
//!   without a shell, with a timeout
//! - **Exclusive GPIO sessions**: a host-wide lock marker and guaranteed pin
//!   cleanup on every exit path (real pins with the `gpio` feature)
//! - **Library + Binary**: use as a crate or run the `guardian_rpi` binary
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use guardian_rpi::{start_web_server, AgentConfig, AppState, DefaultGpioBackend, SystemExecutor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AgentConfig::new("change-me")?;
//!     let state = AppState::new(
//!         config,
//!         Arc::new(SystemExecutor),
//!         Arc::new(DefaultGpioBackend::default()),
//!     )?;
//!     start_web_server(state).await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

pub mod auth;
pub mod config;
pub mod error;
pub mod exec;
pub mod gpio;
pub mod logging;
pub mod metrics;
pub mod validate;
pub mod web;

// Re-export public API
pub use auth::{authenticate, AuthOutcome, Credential};
pub use config::AgentConfig;
pub use error::{AgentError, ApiError, Result};
pub use exec::{CommandExecutor, CommandResult, FailureReason, SystemExecutor, FAILURE_SENTINEL};
pub use gpio::{
    run_session, DefaultGpioBackend, GpioAction, GpioBackend, GpioConfig, GpioController,
    GpioError, GpioTiming, PinLevel, PinSet, SimulatedBackend,
};
pub use metrics::{GuardianData, MetricsCollector};
pub use validate::{PathConfinement, PathError};
pub use web::{create_app, start_web_server, AppState};

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 5000;

/// The default deadline for external commands
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// The deadline for `apt-get` runs
pub const DEFAULT_INSTALL_TIMEOUT: Duration = Duration::from_secs(600);
