//! Hardware backends for the GPIO controller.
//!
//! The controller only talks to [`PinDriver`]. Real pins are driven through
//! `rppal` when the `gpio` feature is enabled; otherwise, and in tests, the
//! [`SimulatedBackend`] keeps pin levels in memory.

use super::{GpioError, PinLevel};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Access to a set of output pins for the lifetime of one session.
///
/// Pins are addressed by BCM line number.
pub trait PinDriver: Send {
    /// Configure `pin` as an output.
    fn configure_output(&mut self, pin: u8) -> Result<(), GpioError>;

    /// Drive a configured pin to `level`.
    fn write(&mut self, pin: u8, level: PinLevel) -> Result<(), GpioError>;

    /// Release every configured pin back to its neutral state.
    fn reset(&mut self);
}

/// Opens a [`PinDriver`] at the start of each session.
pub trait GpioBackend: Send + Sync {
    fn open(&self) -> Result<Box<dyn PinDriver>, GpioError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// In-memory backend for systems without GPIO hardware.
///
/// All drivers opened from one backend share the same pin table, so the
/// state left behind by a session can be inspected afterwards.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    pins: Arc<Mutex<BTreeMap<u8, PinLevel>>>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently configured pins and their levels.
    pub fn levels(&self) -> BTreeMap<u8, PinLevel> {
        self.pins
            .lock()
            .map(|pins| pins.clone())
            .unwrap_or_default()
    }
}

impl GpioBackend for SimulatedBackend {
    fn open(&self) -> Result<Box<dyn PinDriver>, GpioError> {
        Ok(Box::new(SimulatedDriver {
            pins: Arc::clone(&self.pins),
        }))
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

struct SimulatedDriver {
    pins: Arc<Mutex<BTreeMap<u8, PinLevel>>>,
}

impl SimulatedDriver {
    fn table(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<u8, PinLevel>>, GpioError> {
        self.pins
            .lock()
            .map_err(|_| GpioError::hardware_error("simulated pin table poisoned"))
    }
}

impl PinDriver for SimulatedDriver {
    fn configure_output(&mut self, pin: u8) -> Result<(), GpioError> {
        self.table()?.insert(pin, PinLevel::Low);
        Ok(())
    }

    fn write(&mut self, pin: u8, level: PinLevel) -> Result<(), GpioError> {
        let mut pins = self.table()?;
        let slot = pins
            .get_mut(&pin)
            .ok_or_else(|| GpioError::hardware_error(format!("pin {} is not configured", pin)))?;
        *slot = level;
        info!(pin, %level, "simulated pin write");
        Ok(())
    }

    fn reset(&mut self) {
        if let Ok(mut pins) = self.pins.lock() {
            pins.clear();
        }
    }
}

#[cfg(feature = "gpio")]
mod raspberry_pi {
    use super::*;
    use rppal::gpio::{Gpio, OutputPin};
    use std::collections::HashMap;

    /// Raspberry Pi backend using rppal (BCM numbering).
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RppalBackend;

    impl GpioBackend for RppalBackend {
        fn open(&self) -> Result<Box<dyn PinDriver>, GpioError> {
            let gpio = Gpio::new().map_err(|e| {
                GpioError::hardware_error(format!("Failed to initialize GPIO: {}", e))
            })?;
            Ok(Box::new(RppalDriver {
                gpio,
                outputs: HashMap::new(),
            }))
        }

        fn name(&self) -> &'static str {
            "rppal"
        }
    }

    struct RppalDriver {
        gpio: Gpio,
        outputs: HashMap<u8, OutputPin>,
    }

    impl PinDriver for RppalDriver {
        fn configure_output(&mut self, pin: u8) -> Result<(), GpioError> {
            let gpio_pin = self.gpio.get(pin).map_err(|e| {
                GpioError::hardware_error(format!("Failed to access pin {}: {}", pin, e))
            })?;
            let mut output = gpio_pin.into_output();
            // Restores the pin's original mode when the OutputPin is dropped.
            output.set_reset_on_drop(true);
            self.outputs.insert(pin, output);
            Ok(())
        }

        fn write(&mut self, pin: u8, level: PinLevel) -> Result<(), GpioError> {
            let output = self.outputs.get_mut(&pin).ok_or_else(|| {
                GpioError::hardware_error(format!("pin {} is not configured", pin))
            })?;
            match level {
                PinLevel::High => output.set_high(),
                PinLevel::Low => output.set_low(),
            }
            Ok(())
        }

        fn reset(&mut self) {
            self.outputs.clear();
        }
    }
}

#[cfg(feature = "gpio")]
pub use raspberry_pi::RppalBackend;

// Re-export the appropriate GPIO backend
#[cfg(feature = "gpio")]
pub use raspberry_pi::RppalBackend as DefaultGpioBackend;

#[cfg(not(feature = "gpio"))]
pub use self::SimulatedBackend as DefaultGpioBackend;
