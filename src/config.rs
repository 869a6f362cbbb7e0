//! Agent configuration.
//!
//! Built once at startup (from the command line and environment in the
//! binary) and shared read-only with every request handler.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::Credential;
use crate::error::{AgentError, Result};
use crate::gpio::{GpioConfig, GpioTiming};
use crate::validate::PathConfinement;

/// Immutable runtime configuration of the agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Address to bind the HTTP server to
    pub host: IpAddr,
    /// Port to bind the HTTP server to
    pub port: u16,
    /// Bearer secret required on authenticated routes
    pub credential: Arc<Credential>,
    /// Root that `/files/*` lookups are confined to
    pub files_root: PathBuf,
    /// Lock marker, log directory and delays of the GPIO controller
    pub gpio: GpioConfig,
    /// Deadline for getter and action commands
    pub command_timeout: Duration,
    /// Deadline for package installation
    pub install_timeout: Duration,
    /// Pause between a successful reboot command and the reply
    pub reboot_grace: Duration,
}

impl AgentConfig {
    /// Create a configuration with defaults for everything except the secret.
    ///
    /// The files root defaults to the current working directory.
    pub fn new(token: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: crate::DEFAULT_WEB_PORT,
            credential: Arc::new(Credential::new(token)?),
            files_root: std::env::current_dir()?,
            gpio: GpioConfig::default(),
            command_timeout: crate::DEFAULT_COMMAND_TIMEOUT,
            install_timeout: crate::DEFAULT_INSTALL_TIMEOUT,
            reboot_grace: Duration::from_millis(500),
        })
    }

    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Set the port. Port 0 is rejected.
    pub fn with_port(mut self, port: u16) -> Result<Self> {
        if port == 0 {
            return Err(AgentError::config_error("port must be between 1 and 65535"));
        }
        self.port = port;
        Ok(self)
    }

    pub fn with_files_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.files_root = root.into();
        self
    }

    pub fn with_lock_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.gpio.lock_path = path.into();
        self
    }

    pub fn with_logs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.gpio.logs_dir = dir.into();
        self
    }

    pub fn with_gpio_timing(mut self, timing: GpioTiming) -> Self {
        self.gpio.timing = timing;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_reboot_grace(mut self, grace: Duration) -> Self {
        self.reboot_grace = grace;
        self
    }

    pub fn logs_dir(&self) -> &Path {
        &self.gpio.logs_dir
    }

    /// Get the full bind address.
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Canonicalize the files root. Fails if it does not exist.
    pub fn confinement(&self) -> Result<PathConfinement> {
        PathConfinement::new(&self.files_root).map_err(|e| {
            AgentError::config_error(format!(
                "files root {} is not usable: {}",
                self.files_root.display(),
                e
            ))
        })
    }
}
