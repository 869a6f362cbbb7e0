//! The GPIO session: lock, configure, operate, release.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

use super::driver::{GpioBackend, PinDriver};
use super::lock::GpioLock;
use super::{GpioAction, GpioError, PinLevel, PinSet};

/// Fixed delays used by the pin operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioTiming {
    /// Pause after each individual pin write.
    pub pin_delay: Duration,
    /// Time between the off and on phases of a reboot.
    pub reboot_settle: Duration,
    /// Time between the off and on phases of a test.
    pub test_settle: Duration,
}

impl Default for GpioTiming {
    fn default() -> Self {
        Self {
            pin_delay: Duration::from_secs(1),
            reboot_settle: Duration::from_secs(3),
            test_settle: Duration::from_secs(15),
        }
    }
}

impl GpioTiming {
    /// No delays at all. Useful with the simulated backend.
    pub fn immediate() -> Self {
        Self {
            pin_delay: Duration::ZERO,
            reboot_settle: Duration::ZERO,
            test_settle: Duration::ZERO,
        }
    }
}

/// Where the controller keeps its lock marker and logs.
#[derive(Debug, Clone)]
pub struct GpioConfig {
    pub lock_path: PathBuf,
    pub logs_dir: PathBuf,
    pub timing: GpioTiming,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            lock_path: PathBuf::from("./gpio.lock"),
            logs_dir: PathBuf::from("./logs"),
            timing: GpioTiming::default(),
        }
    }
}

/// An exclusive session over a set of output pins.
///
/// Dropping the controller resets the pins and then removes the lock marker.
/// This happens on every exit path, including unwinding.
pub struct GpioController {
    pins: PinSet,
    driver: Box<dyn PinDriver>,
    timing: GpioTiming,
    // Declared last: the marker is removed only after the driver has been reset.
    _lock: GpioLock,
}

impl GpioController {
    /// Enter a session on `pins`.
    ///
    /// Fails fast with [`GpioError::Busy`] when another session holds the
    /// lock. Pin configuration failures are logged but do not abort the
    /// session; writes to unconfigured pins fail later.
    pub fn acquire(
        config: &GpioConfig,
        backend: &dyn GpioBackend,
        pins: PinSet,
    ) -> Result<Self, GpioError> {
        ensure_logs_dir(config)?;
        let lock = GpioLock::acquire(&config.lock_path)?;
        let driver = backend.open()?;

        let mut controller = Self {
            pins,
            driver,
            timing: config.timing,
            _lock: lock,
        };
        controller.configure_pins();
        Ok(controller)
    }

    pub fn pins(&self) -> &PinSet {
        &self.pins
    }

    fn configure_pins(&mut self) {
        for (pin, line) in self.pins.lines() {
            if let Err(e) = self.driver.configure_output(line) {
                error!(pin, line, "failed to configure GPIO pins: {}", e);
                return;
            }
        }
        info!(pins = ?self.pins.pins(), "pins configured as outputs");
    }

    /// Drive every pin to `level`, one at a time, pausing after each write.
    ///
    /// Returns `false` at the first write that fails or panics.
    pub fn set_state(&mut self, level: PinLevel) -> bool {
        for (pin, line) in self.pins.lines() {
            let driver = &mut self.driver;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| driver.write(line, level)));
            match outcome {
                Ok(Ok(())) => info!(pin, line, "pin => {}", level),
                Ok(Err(e)) => {
                    error!(pin, line, "failed to change pin state to {}: {}", level, e);
                    return false;
                }
                Err(_) => {
                    error!(pin, line, "pin write to {} panicked", level);
                    return false;
                }
            }
            thread::sleep(self.timing.pin_delay);
        }
        true
    }

    /// Power-cycle the pins: off, settle, on. Both phases must succeed.
    ///
    /// The on phase runs even when the off phase failed, so the pins are not
    /// left switched off.
    pub fn reboot(&mut self) -> bool {
        info!(pins = ?self.pins.pins(), "rebooting pins");
        let off = self.set_state(PinLevel::Low);
        if !off {
            warn!("off phase of reboot failed");
        }
        thread::sleep(self.timing.reboot_settle);
        let on = self.set_state(PinLevel::High);
        if off && on {
            info!("reboot complete");
        }
        off && on
    }

    /// Test the session's single pin: off, long settle, on.
    ///
    /// Only the on phase decides the result.
    pub fn test(&mut self) -> Result<bool, GpioError> {
        let pin = self
            .pins
            .single()
            .ok_or(GpioError::TestRequiresSinglePin(self.pins.len()))?;

        info!(pin, "testing pin");
        if !self.set_state(PinLevel::Low) {
            warn!(pin, "off phase of test failed, continuing");
        }
        thread::sleep(self.timing.test_settle);
        Ok(self.set_state(PinLevel::High))
    }

    /// Run one action on this session.
    pub fn run(&mut self, action: GpioAction) -> Result<bool, GpioError> {
        match action {
            GpioAction::On => Ok(self.set_state(PinLevel::High)),
            GpioAction::Off => Ok(self.set_state(PinLevel::Low)),
            GpioAction::Reboot => Ok(self.reboot()),
            GpioAction::Test => self.test(),
        }
    }
}

impl Drop for GpioController {
    fn drop(&mut self) {
        let driver = &mut self.driver;
        if panic::catch_unwind(AssertUnwindSafe(|| driver.reset())).is_err() {
            error!("GPIO reset panicked during cleanup");
        }
        info!(pins = ?self.pins.pins(), "GPIO session closed");
    }
}

fn ensure_logs_dir(config: &GpioConfig) -> Result<(), GpioError> {
    if !config.logs_dir.exists() {
        std::fs::create_dir_all(&config.logs_dir)?;
        info!(dir = %config.logs_dir.display(), "created logs directory");
    }
    Ok(())
}

/// Validate, acquire, run `action`, and release, in one blocking call.
///
/// Request errors (such as `test` on several pins) are reported before the
/// lock is touched.
pub fn run_session(
    config: &GpioConfig,
    backend: &dyn GpioBackend,
    pins: PinSet,
    action: GpioAction,
) -> Result<bool, GpioError> {
    if action == GpioAction::Test && pins.single().is_none() {
        return Err(GpioError::TestRequiresSinglePin(pins.len()));
    }

    info!(%action, pins = ?pins.pins(), backend = backend.name(), "starting GPIO session");
    let mut controller = GpioController::acquire(config, backend, pins)?;
    controller.run(action)
}
