//! HTTP handlers for API endpoints.

pub mod binaries;
pub mod files;
pub mod getters;
pub mod gpio;
pub mod health;
pub mod power;
pub mod services;

use std::sync::Arc;

use crate::config::AgentConfig;
use crate::error::Result;
use crate::exec::CommandExecutor;
use crate::gpio::GpioBackend;
use crate::metrics::MetricsCollector;
use crate::validate::PathConfinement;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AgentConfig>,
    pub executor: Arc<dyn CommandExecutor>,
    pub collector: MetricsCollector,
    pub gpio_backend: Arc<dyn GpioBackend>,
    pub confinement: Arc<PathConfinement>,
}

impl AppState {
    /// Build the state. Fails if the files root cannot be canonicalized.
    pub fn new(
        config: AgentConfig,
        executor: Arc<dyn CommandExecutor>,
        gpio_backend: Arc<dyn GpioBackend>,
    ) -> Result<Self> {
        let confinement = Arc::new(config.confinement()?);
        let collector = MetricsCollector::new(Arc::clone(&executor), config.command_timeout);
        Ok(Self {
            config: Arc::new(config),
            executor,
            collector,
            gpio_backend,
            confinement,
        })
    }
}
