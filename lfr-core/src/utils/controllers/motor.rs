//! Per-wheel motor speed control.
//!
//! A `MotorSpeedController` owns one wheel. Every period it takes the latest
//! signed command from its command cell, smooths the magnitude through a
//! single-pole filter standing in for motor inertia, and hands a
//! [`DriveOutput`] to its [`MotorDriver`].
//!
//! `PhaseEnableDriver` is the driver for phase/enable H-bridge carriers such
//! as the DRV8838: one digital phase pin selects direction, one PWM pin sets
//! the duty cycle.
//!
//! | Direction | Phase | PWM duty (0..=255)  |
//! |-----------|-------|---------------------|
//! | Reverse   | LOW   | magnitude           |
//! | Brake     | HIGH  | magnitude (1)       |
//! | Forward   | HIGH  | 255 - magnitude     |
//!
//! The inverted duty for `Forward` comes from the carrier's wiring and lives
//! only in this adapter.

use embassy_time::Duration;
use embedded_hal::{digital::OutputPin, pwm::SetDutyCycle};

use super::{CommandCell, MotorCommand};
use crate::utils::{
    config::RobotConfig,
    math::filter::LowPassFilter,
    sync::{self, Shutdown},
};

/// Magnitude written while braking on a zero command.
pub const BRAKE_MAGNITUDE: u8 = 1;

/// Full-scale duty on the 0..=255 scale.
const FULL_DUTY: u8 = u8::MAX;

/// Direction level requested from the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Positive command.
    Forward,
    /// Negative command.
    Reverse,
    /// Zero command.
    Brake,
}

/// What one control cycle asks the hardware to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveOutput {
    pub direction: Direction,
    /// Duty magnitude, 0..=255, before any wiring-specific inversion.
    pub magnitude: u8,
}

/// Hardware seam between the control algorithm and a motor carrier.
pub trait MotorDriver {
    type Error: core::fmt::Debug;

    fn set_direction(
        &mut self,
        direction: Direction,
    ) -> Result<(), Self::Error>;

    fn set_magnitude(
        &mut self,
        magnitude: u8,
    ) -> Result<(), Self::Error>;

    /// Write direction first, then magnitude.
    fn apply(
        &mut self,
        output: DriveOutput,
    ) -> Result<(), Self::Error> {
        self.set_direction(output.direction)?;
        self.set_magnitude(output.magnitude)
    }
}

/// Errors from either pin of a phase/enable carrier.
#[derive(Debug)]
pub enum DriverError<P, W> {
    Phase(P),
    Pwm(W),
}

/// Phase/enable H-bridge carrier on a digital pin and a PWM channel.
pub struct PhaseEnableDriver<P, W> {
    phase: P,
    enable: W,
    max_duty: u16,
    direction: Direction,
}

impl<P, W> PhaseEnableDriver<P, W>
where
    P: OutputPin,
    W: SetDutyCycle,
{
    /// Bind the driver to its phase (direction) and enable (PWM) pins.
    ///
    /// Reads the channel's full-scale duty once; nothing is written until the
    /// first `apply`.
    pub fn bind(
        phase: P,
        enable: W,
    ) -> Self {
        let max_duty = enable.max_duty_cycle();
        Self {
            phase,
            enable,
            max_duty,
            direction: Direction::Brake,
        }
    }

    /// Scale a 0..=255 duty to the channel's range.
    fn scale(
        &self,
        duty: u8,
    ) -> u16 {
        (duty as u32 * self.max_duty as u32 / FULL_DUTY as u32) as u16
    }

    pub fn release(self) -> (P, W) {
        (self.phase, self.enable)
    }
}

impl<P, W> MotorDriver for PhaseEnableDriver<P, W>
where
    P: OutputPin,
    W: SetDutyCycle,
{
    type Error = DriverError<P::Error, W::Error>;

    fn set_direction(
        &mut self,
        direction: Direction,
    ) -> Result<(), Self::Error> {
        let level = match direction {
            Direction::Reverse => self.phase.set_low(),
            Direction::Forward | Direction::Brake => self.phase.set_high(),
        };
        level.map_err(DriverError::Phase)?;
        self.direction = direction;
        Ok(())
    }

    fn set_magnitude(
        &mut self,
        magnitude: u8,
    ) -> Result<(), Self::Error> {
        let duty = match self.direction {
            Direction::Forward => FULL_DUTY - magnitude,
            Direction::Reverse | Direction::Brake => magnitude,
        };
        self.enable
            .set_duty_cycle(self.scale(duty))
            .map_err(DriverError::Pwm)
    }
}

/// Periodic task driving one wheel from its command cell.
pub struct MotorSpeedController<'a, D> {
    name: &'static str,
    driver: D,
    command: &'a CommandCell,
    speed: LowPassFilter,
    period: Duration,
}

impl<'a, D: MotorDriver> MotorSpeedController<'a, D> {
    /// Build a controller at rest (smoothed speed 0).
    pub fn new(
        name: &'static str,
        driver: D,
        command: &'a CommandCell,
        config: &RobotConfig,
    ) -> Self {
        Self {
            name,
            driver,
            command,
            speed: LowPassFilter::new(config.smoothing, 0.0),
            period: config.timing.motor_period(),
        }
    }

    /// Advance the filter by one cycle and decide the output for `cmd`.
    pub fn step(
        &mut self,
        cmd: MotorCommand,
    ) -> DriveOutput {
        let speed = self.speed.update(cmd.magnitude() as f32);
        let magnitude = libm::roundf(speed).clamp(0.0, FULL_DUTY as f32) as u8;

        match cmd.value() {
            v if v < 0 => DriveOutput {
                direction: Direction::Reverse,
                magnitude,
            },
            0 => DriveOutput {
                direction: Direction::Brake,
                magnitude: BRAKE_MAGNITUDE,
            },
            _ => DriveOutput {
                direction: Direction::Forward,
                magnitude,
            },
        }
    }

    /// One control cycle against the latest published command.
    pub fn tick(&mut self) -> Result<DriveOutput, D::Error> {
        let (cmd, version) = self.command.get_versioned();
        let output = self.step(cmd);
        tracing::trace!(
            wheel = self.name,
            cmd = cmd.value(),
            version,
            speed = self.speed.value(),
            magnitude = output.magnitude,
            "motor cycle"
        );
        self.driver.apply(output)?;
        Ok(output)
    }

    /// Smoothed speed estimate.
    pub fn speed(&self) -> f32 {
        self.speed.value()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Drive the wheel every period until `shutdown` is signalled.
    pub async fn run(
        &mut self,
        shutdown: &Shutdown,
    ) {
        tracing::info!(
            wheel = self.name,
            period_ms = self.period.as_millis(),
            "motor controller started"
        );
        let period = self.period;
        let cycles = sync::periodic(period, shutdown, || {
            if let Err(e) = self.tick() {
                tracing::error!(wheel = self.name, "motor output failed: {:?}", e);
            }
        })
        .await;
        tracing::info!(wheel = self.name, cycles, "motor controller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Driver that records the last output it was given.
    #[derive(Default)]
    struct Recorder {
        last: Option<DriveOutput>,
        writes: usize,
    }

    impl MotorDriver for Recorder {
        type Error = core::convert::Infallible;

        fn set_direction(
            &mut self,
            direction: Direction,
        ) -> Result<(), Self::Error> {
            let magnitude = self.last.map_or(0, |o| o.magnitude);
            self.last = Some(DriveOutput {
                direction,
                magnitude,
            });
            Ok(())
        }

        fn set_magnitude(
            &mut self,
            magnitude: u8,
        ) -> Result<(), Self::Error> {
            if let Some(out) = self.last.as_mut() {
                out.magnitude = magnitude;
            }
            self.writes += 1;
            Ok(())
        }
    }

    fn controller(cell: &CommandCell) -> MotorSpeedController<'_, Recorder> {
        MotorSpeedController::new("test", Recorder::default(), cell, &RobotConfig::default())
    }

    #[test]
    fn test_zero_command_brakes_with_magnitude_one() {
        let cell = CommandCell::new(MotorCommand::new(255));
        let mut ctrl = controller(&cell);
        for _ in 0..300 {
            ctrl.tick().unwrap();
        }
        assert!(ctrl.speed() > 100.0);

        cell.put(MotorCommand::STOP);
        let out = ctrl.tick().unwrap();
        assert_eq!(
            out,
            DriveOutput {
                direction: Direction::Brake,
                magnitude: BRAKE_MAGNITUDE,
            }
        );
        assert_eq!(ctrl.driver().last, Some(out));
    }

    #[test]
    fn test_sign_selects_direction() {
        let cell = CommandCell::new(MotorCommand::STOP);
        let mut ctrl = controller(&cell);
        assert_eq!(ctrl.step(MotorCommand::new(127)).direction, Direction::Forward);
        assert_eq!(ctrl.step(MotorCommand::new(-127)).direction, Direction::Reverse);
        assert_eq!(ctrl.step(MotorCommand::STOP).direction, Direction::Brake);
    }

    #[test]
    fn test_first_step_is_one_percent_of_command() {
        let cell = CommandCell::new(MotorCommand::STOP);
        let mut ctrl = controller(&cell);
        // 255 * 0.01 = 2.55, rounds to 3.
        assert_eq!(ctrl.step(MotorCommand::new(255)).magnitude, 3);
    }

    #[test]
    fn test_constant_command_converges_to_magnitude() {
        let cell = CommandCell::new(MotorCommand::new(-127));
        let mut ctrl = controller(&cell);
        let mut prev = ctrl.speed();
        for _ in 0..2000 {
            ctrl.tick().unwrap();
            assert!(ctrl.speed() + 1e-4 >= prev);
            assert!(ctrl.speed() <= 127.0 + 1e-3);
            prev = ctrl.speed();
        }
        assert!((ctrl.speed() - 127.0).abs() < 0.01);
        assert_eq!(
            ctrl.tick().unwrap(),
            DriveOutput {
                direction: Direction::Reverse,
                magnitude: 127,
            }
        );
    }

    #[test]
    fn test_tick_reads_latest_command() {
        let cell = CommandCell::new(MotorCommand::STOP);
        let mut ctrl = controller(&cell);
        cell.put(MotorCommand::new(63));
        cell.put(MotorCommand::new(-63));
        assert_eq!(ctrl.tick().unwrap().direction, Direction::Reverse);
        assert_eq!(ctrl.driver().writes, 1);
    }
}
