//! Utility re-exports and helper macros for the line follower.
//!
//! This module re-exports the control tasks, the shared-cell primitive, and
//! configuration:
//!
//! - `config`: timing, smoothing, disable policy and pin map
//! - `controllers`: sensor classifier, drive dispatcher and motor speed control
//! - `math`: the single-pole smoothing filter
//! - `sync`: shared cells, shutdown signal and the periodic task loop
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod config;
pub mod controllers;
pub mod math;
pub mod sync;

pub use config::RobotConfig;
pub use controllers::{
    DriveDispatcher, DriveState, MotorCommand, MotorSpeedController, SensorClassifier,
};
pub use embassy_time::*;
pub use sync::{SharedCell, Shutdown};

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}
