//! Exclusive GPIO control for Raspberry Pi.
//!
//! A [`GpioController`] is a session: building one takes a host-wide lock
//! marker and configures the requested pins as outputs, and dropping it resets
//! the pins and removes the marker. Only one session can exist on the host at
//! a time; a second attempt fails immediately with [`GpioError::Busy`].
//!
//! Callers name pins by their physical header number; the controller maps
//! them to BCM lines before touching the driver.
//!
//! Hardware access is behind [`GpioBackend`]/[`PinDriver`]. With the `gpio`
//! feature the default backend drives real pins through `rppal`; without it a
//! simulated backend records pin levels in memory.

pub mod controller;
pub mod driver;
pub mod lock;

pub use controller::{run_session, GpioConfig, GpioController, GpioTiming};
pub use driver::{DefaultGpioBackend, GpioBackend, PinDriver, SimulatedBackend};
pub use lock::GpioLock;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Number of pins on the Raspberry Pi header.
pub const HEADER_PINS: u8 = 40;

/// Physical header pin to BCM line. `None` marks power and ground pins.
const HEADER_TO_BCM: [Option<u8>; HEADER_PINS as usize + 1] = [
    None,     // no pin 0
    None,     // 1: 3V3
    None,     // 2: 5V
    Some(2),  // 3
    None,     // 4: 5V
    Some(3),  // 5
    None,     // 6: GND
    Some(4),  // 7
    Some(14), // 8
    None,     // 9: GND
    Some(15), // 10
    Some(17), // 11
    Some(18), // 12
    Some(27), // 13
    None,     // 14: GND
    Some(22), // 15
    Some(23), // 16
    None,     // 17: 3V3
    Some(24), // 18
    Some(10), // 19
    None,     // 20: GND
    Some(9),  // 21
    Some(25), // 22
    Some(11), // 23
    Some(8),  // 24
    None,     // 25: GND
    Some(7),  // 26
    Some(0),  // 27
    Some(1),  // 28
    Some(5),  // 29
    None,     // 30: GND
    Some(6),  // 31
    Some(12), // 32
    Some(13), // 33
    None,     // 34: GND
    Some(19), // 35
    Some(16), // 36
    Some(26), // 37
    Some(20), // 38
    None,     // 39: GND
    Some(21), // 40
];

/// BCM line wired to physical header pin `header`, if it is a GPIO pin.
pub fn bcm_line(header: u8) -> Option<u8> {
    HEADER_TO_BCM.get(usize::from(header)).copied().flatten()
}

/// Errors raised by the GPIO controller.
#[derive(Debug, thiserror::Error)]
pub enum GpioError {
    /// Another session holds the lock marker.
    #[error("GPIO hardware is busy (lock held at {})", lock_path.display())]
    Busy { lock_path: PathBuf },

    #[error("at least one pin is required")]
    EmptyPinSet,

    #[error("pin {0} is not on the 40-pin header (valid range 1-40)")]
    PinOutOfRange(u32),

    #[error("header pin {0} is a power or ground pin")]
    NotGpioPin(u8),

    #[error("pin {0} was requested more than once")]
    DuplicatePin(u8),

    #[error("test requires exactly one pin, got {0}")]
    TestRequiresSinglePin(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The hardware backend refused an operation.
    #[error("hardware error: {0}")]
    Hardware(String),
}

impl GpioError {
    pub fn hardware_error(msg: impl Into<String>) -> Self {
        Self::Hardware(msg.into())
    }

    /// Whether the error was caused by the caller's request rather than the host.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            Self::EmptyPinSet
                | Self::PinOutOfRange(_)
                | Self::NotGpioPin(_)
                | Self::DuplicatePin(_)
                | Self::TestRequiresSinglePin(_)
        )
    }
}

/// Logical output level of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinLevel {
    Low,
    High,
}

impl fmt::Display for PinLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => f.write_str("OFF"),
            Self::High => f.write_str("ON"),
        }
    }
}

/// Operations a session can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpioAction {
    On,
    Off,
    Reboot,
    Test,
}

impl GpioAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Reboot => "reboot",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for GpioAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GpioAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            "reboot" => Ok(Self::Reboot),
            "test" => Ok(Self::Test),
            other => Err(format!(
                "unknown GPIO action '{}' (expected on, off, reboot or test)",
                other
            )),
        }
    }
}

/// Ordered, non-empty set of distinct pins owned by one session.
///
/// Pins are physical header numbers (1-40), as printed on the board. Only
/// GPIO-capable pins are accepted; [`PinSet::lines`] gives their BCM lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PinSet(Vec<u8>);

impl PinSet {
    pub fn new(pins: impl IntoIterator<Item = u32>) -> Result<Self, GpioError> {
        let mut validated: Vec<u8> = Vec::new();
        for pin in pins {
            let pin = u8::try_from(pin)
                .ok()
                .filter(|p| (1..=HEADER_PINS).contains(p))
                .ok_or(GpioError::PinOutOfRange(pin))?;
            if bcm_line(pin).is_none() {
                return Err(GpioError::NotGpioPin(pin));
            }
            if validated.contains(&pin) {
                return Err(GpioError::DuplicatePin(pin));
            }
            validated.push(pin);
        }
        if validated.is_empty() {
            return Err(GpioError::EmptyPinSet);
        }
        Ok(Self(validated))
    }

    /// Header pin numbers, in request order.
    pub fn pins(&self) -> &[u8] {
        &self.0
    }

    /// `(header pin, BCM line)` pairs, in request order.
    pub fn lines(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.0
            .iter()
            .filter_map(|&pin| bcm_line(pin).map(|line| (pin, line)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The only pin, when the set holds exactly one.
    pub fn single(&self) -> Option<u8> {
        match self.0.as_slice() {
            [pin] => Some(*pin),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_set_validation() {
        let set = PinSet::new([11, 13]).unwrap();
        assert_eq!(set.pins(), &[11u8, 13]);
        assert_eq!(set.single(), None);
        assert_eq!(PinSet::new([40]).unwrap().single(), Some(40));

        assert!(matches!(
            PinSet::new(Vec::<u32>::new()),
            Err(GpioError::EmptyPinSet)
        ));
        assert!(matches!(PinSet::new([0]), Err(GpioError::PinOutOfRange(0))));
        assert!(matches!(
            PinSet::new([41]),
            Err(GpioError::PinOutOfRange(41))
        ));
        assert!(matches!(
            PinSet::new([300]),
            Err(GpioError::PinOutOfRange(300))
        ));
        assert!(matches!(
            PinSet::new([29, 31, 29]),
            Err(GpioError::DuplicatePin(29))
        ));
    }

    #[test]
    fn test_power_and_ground_pins_rejected() {
        for pin in [1u32, 2, 4, 6, 9, 14, 17, 20, 25, 30, 34, 39] {
            assert!(
                matches!(PinSet::new([pin]), Err(GpioError::NotGpioPin(p)) if u32::from(p) == pin),
                "header pin {pin}"
            );
        }
        assert!(GpioError::NotGpioPin(6).is_invalid_request());
    }

    #[test]
    fn test_header_pins_map_to_bcm_lines() {
        assert_eq!(bcm_line(11), Some(17));
        assert_eq!(bcm_line(13), Some(27));
        assert_eq!(bcm_line(40), Some(21));
        assert_eq!(bcm_line(27), Some(0));
        assert_eq!(bcm_line(6), None);
        assert_eq!(bcm_line(0), None);
        assert_eq!(bcm_line(41), None);

        let usable: Vec<u8> = (1..=HEADER_PINS).filter_map(bcm_line).collect();
        assert_eq!(usable.len(), 28);
        let mut sorted = usable.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..=27).collect::<Vec<u8>>());

        let set = PinSet::new([11, 29]).unwrap();
        assert_eq!(set.lines().collect::<Vec<_>>(), vec![(11, 17), (29, 5)]);
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!("reboot".parse::<GpioAction>().unwrap(), GpioAction::Reboot);
        assert!("blink".parse::<GpioAction>().is_err());
        assert!("ON".parse::<GpioAction>().is_err());
        assert_eq!(GpioAction::Test.to_string(), "test");
    }

    #[test]
    fn test_pin_set_serializes_as_list() {
        let set = PinSet::new([11, 13]).unwrap();
        assert_eq!(serde_json::to_string(&set).unwrap(), "[11,13]");
    }

    #[test]
    fn test_request_errors_are_classified() {
        assert!(GpioError::TestRequiresSinglePin(2).is_invalid_request());
        assert!(!GpioError::Busy {
            lock_path: PathBuf::from("/tmp/gpio.lock")
        }
        .is_invalid_request());
    }
}
