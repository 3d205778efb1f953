//! Startup configuration for the line follower.
//!
//! Everything here is supplied once at boot: task periods, the smoothing
//! constant, the speed ceiling, what the dispatcher does while disabled, and
//! the numeric pin map. Defaults match the reference robot wiring.
//!
//! Deserializes from any serde format; missing fields fall back to defaults.
//!
//! ```rust
//! use lfr_core::utils::config::RobotConfig;
//! let cfg = RobotConfig::default();
//! assert!(cfg.validate().is_ok());
//! assert_eq!(cfg.timing.classify_period_ms, 5);
//! ```

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

/// Errors reported by [`RobotConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// A task period of zero milliseconds.
    ZeroPeriod(&'static str),
    /// Smoothing constant outside `[0.0, 1.0)`.
    Smoothing(f32),
    /// `max_speed` of zero would never move the wheels.
    ZeroMaxSpeed,
    /// The same pin number is assigned twice.
    DuplicatePin(u8),
}

impl core::fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        match self {
            ConfigError::ZeroPeriod(task) => write!(f, "{task} period must be non-zero"),
            ConfigError::Smoothing(a) => write!(f, "smoothing {a} is outside [0, 1)"),
            ConfigError::ZeroMaxSpeed => write!(f, "max_speed must be non-zero"),
            ConfigError::DuplicatePin(pin) => write!(f, "pin {pin} is assigned more than once"),
        }
    }
}

/// What the dispatcher publishes while the enable flag is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisablePolicy {
    /// Publish nothing; the wheels keep their last command.
    #[default]
    Hold,
    /// Publish a zero command to both wheels every disabled cycle.
    Stop,
}

/// Task periods in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub classify_period_ms: u64,
    pub dispatch_period_ms: u64,
    pub motor_period_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            classify_period_ms: 5,
            dispatch_period_ms: 10,
            motor_period_ms: 50,
        }
    }
}

impl Timing {
    pub fn classify_period(&self) -> Duration {
        Duration::from_millis(self.classify_period_ms)
    }

    pub fn dispatch_period(&self) -> Duration {
        Duration::from_millis(self.dispatch_period_ms)
    }

    pub fn motor_period(&self) -> Duration {
        Duration::from_millis(self.motor_period_ms)
    }
}

/// Direction (phase) and magnitude (enable/PWM) pins of one motor driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelPins {
    pub phase: u8,
    pub enable: u8,
}

/// Numeric pin assignments, index 0 of `sensors` is physical sensor 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinMap {
    pub sensors: [u8; 8],
    pub left: WheelPins,
    pub right: WheelPins,
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            sensors: [2, 4, 7, 8, 10, 11, 12, 13],
            left: WheelPins {
                phase: 5,
                enable: 3,
            },
            right: WheelPins {
                phase: 6,
                enable: 9,
            },
        }
    }
}

impl PinMap {
    fn all(&self) -> impl Iterator<Item = u8> + '_ {
        self.sensors.iter().copied().chain([
            self.left.phase,
            self.left.enable,
            self.right.phase,
            self.right.enable,
        ])
    }
}

/// Complete startup configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub timing: Timing,
    /// Filter pole `A` in `speed = speed*A + |cmd|*(1-A)`.
    pub smoothing: f32,
    /// Full-scale wheel command.
    pub max_speed: u8,
    pub on_disable: DisablePolicy,
    pub pins: PinMap,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            timing: Timing::default(),
            smoothing: 0.99,
            max_speed: 255,
            on_disable: DisablePolicy::Hold,
            pins: PinMap::default(),
        }
    }
}

impl RobotConfig {
    /// Check the configuration for values the control loops cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("classify", self.timing.classify_period_ms),
            ("dispatch", self.timing.dispatch_period_ms),
            ("motor", self.timing.motor_period_ms),
        ];
        if let Some((task, _)) = periods.iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::ZeroPeriod(*task));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(ConfigError::Smoothing(self.smoothing));
        }
        if self.max_speed == 0 {
            return Err(ConfigError::ZeroMaxSpeed);
        }

        let mut seen = [false; 256];
        for pin in self.pins.all() {
            if seen[pin as usize] {
                return Err(ConfigError::DuplicatePin(pin));
            }
            seen[pin as usize] = true;
        }
        Ok(())
    }
}
