//! Module Exports
//!
//! This file exports the three control tasks of the line follower and the
//! values they pass between each other.
//!
//! - `sensors`: reflectance array reading and drive-state classification
//! - `dispatcher`: drive state to wheel command mapping, gated by enable
//! - `motor`: per-wheel smoothing and direction-aware PWM output

pub mod dispatcher;
pub mod motor;
pub mod sensors;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use serde::{Deserialize, Serialize};

use crate::utils::sync::SharedCell;

pub use dispatcher::{DriveDispatcher, WheelCommands};
pub use motor::{
    Direction, DriveOutput, DriverError, MotorDriver, MotorSpeedController, PhaseEnableDriver,
};
pub use sensors::{classify, LineSensorArray, SensorClassifier, SensorReading};

/// Latest published drive state.
pub type DriveStateCell = SharedCell<CriticalSectionRawMutex, DriveState>;
/// Enable flag written by the wireless receiver.
pub type EnableCell = SharedCell<CriticalSectionRawMutex, bool>;
/// Latest command for one wheel.
pub type CommandCell = SharedCell<CriticalSectionRawMutex, MotorCommand>;

/// Discrete steering decision derived from the sensor pattern.
///
/// Serialized in snake_case. `code()` gives the compact 0..=4 encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveState {
    /// Line centered under sensors 4 and 5.
    #[default]
    Straight,
    /// Line fully under the driver-side half: spin counter-clockwise.
    RotateCcw,
    /// Line drifting right of center.
    TurnLeft,
    /// Line drifting left of center.
    TurnRight,
    /// Line fully under the passenger-side half: spin clockwise.
    RotateCw,
}

/// A drive-state code outside `0..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownDriveState(pub u8);

impl DriveState {
    pub const ALL: [DriveState; 5] = [
        DriveState::Straight,
        DriveState::RotateCcw,
        DriveState::TurnLeft,
        DriveState::TurnRight,
        DriveState::RotateCw,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Fractions of full speed for the (left, right) wheels.
    pub fn wheel_fractions(self) -> (f32, f32) {
        match self {
            DriveState::Straight => (0.5, 0.5),
            DriveState::RotateCcw => (0.5, -0.5),
            DriveState::TurnLeft => (0.25, 0.5),
            DriveState::TurnRight => (0.5, 0.25),
            DriveState::RotateCw => (-0.5, 0.5),
        }
    }
}

impl TryFrom<u8> for DriveState {
    type Error = UnknownDriveState;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        DriveState::ALL
            .get(code as usize)
            .copied()
            .ok_or(UnknownDriveState(code))
    }
}

/// Signed duty-cycle command for one wheel, always within `[-255, 255]`.
///
/// The sign selects rotation direction, the magnitude the duty cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct MotorCommand(i16);

impl MotorCommand {
    pub const MAX: i16 = 255;
    pub const STOP: MotorCommand = MotorCommand(0);

    /// Build a command, clamping out-of-range values.
    pub fn new(value: i32) -> Self {
        MotorCommand(value.clamp(-(Self::MAX as i32), Self::MAX as i32) as i16)
    }

    /// `fraction * max_speed`, truncated toward zero.
    pub fn from_fraction(
        fraction: f32,
        max_speed: u8,
    ) -> Self {
        Self::new((fraction * max_speed as f32) as i32)
    }

    pub fn value(self) -> i16 {
        self.0
    }

    pub fn magnitude(self) -> u8 {
        self.0.unsigned_abs() as u8
    }
}

impl From<i16> for MotorCommand {
    fn from(value: i16) -> Self {
        MotorCommand::new(value as i32)
    }
}
