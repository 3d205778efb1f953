//! Drive-state dispatcher.
//!
//! Each cycle the dispatcher reads the enable flag and the latest drive state,
//! turns the state into a (left, right) pair of wheel commands, and publishes
//! the pair to the per-wheel command cells. It keeps no state of its own
//! between cycles.
//!
//! While disabled, the default [`DisablePolicy::Hold`] publishes nothing, so
//! the wheels keep running at their last command. [`DisablePolicy::Stop`]
//! instead publishes a zero command to both wheels every disabled cycle.

use embassy_time::Duration;

use super::{CommandCell, DriveState, DriveStateCell, EnableCell, MotorCommand};
use crate::utils::{
    config::{DisablePolicy, RobotConfig},
    sync::{self, Shutdown},
};

/// Commands for both wheels, published together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelCommands {
    pub left: MotorCommand,
    pub right: MotorCommand,
}

impl WheelCommands {
    pub const STOP: WheelCommands = WheelCommands {
        left: MotorCommand::STOP,
        right: MotorCommand::STOP,
    };

    /// Scale the state's wheel fractions by `max_speed`.
    pub fn for_state(
        state: DriveState,
        max_speed: u8,
    ) -> Self {
        let (left, right) = state.wheel_fractions();
        WheelCommands {
            left: MotorCommand::from_fraction(left, max_speed),
            right: MotorCommand::from_fraction(right, max_speed),
        }
    }
}

/// Periodic task mapping the published drive state to wheel commands.
pub struct DriveDispatcher<'a> {
    enable: &'a EnableCell,
    state: &'a DriveStateCell,
    left: &'a CommandCell,
    right: &'a CommandCell,
    max_speed: u8,
    on_disable: DisablePolicy,
    period: Duration,
}

impl<'a> DriveDispatcher<'a> {
    pub fn new(
        enable: &'a EnableCell,
        state: &'a DriveStateCell,
        left: &'a CommandCell,
        right: &'a CommandCell,
        config: &RobotConfig,
    ) -> Self {
        Self {
            enable,
            state,
            left,
            right,
            max_speed: config.max_speed,
            on_disable: config.on_disable,
            period: config.timing.dispatch_period(),
        }
    }

    /// Decide this cycle's commands without publishing them.
    ///
    /// `None` means no command is issued this cycle.
    pub fn plan(&self) -> Option<WheelCommands> {
        if !self.enable.get() {
            return match self.on_disable {
                DisablePolicy::Hold => None,
                DisablePolicy::Stop => Some(WheelCommands::STOP),
            };
        }
        Some(WheelCommands::for_state(self.state.get(), self.max_speed))
    }

    /// One dispatch cycle: plan, then publish to both wheels.
    pub fn tick(&mut self) -> Option<WheelCommands> {
        let commands = self.plan()?;
        if commands.left != self.left.get() || commands.right != self.right.get() {
            tracing::debug!(
                left = commands.left.value(),
                right = commands.right.value(),
                "wheel commands changed"
            );
        }
        self.left.put(commands.left);
        self.right.put(commands.right);
        Some(commands)
    }

    /// Dispatch every period until `shutdown` is signalled.
    pub async fn run(
        &mut self,
        shutdown: &Shutdown,
    ) {
        tracing::info!(
            period_ms = self.period.as_millis(),
            on_disable = ?self.on_disable,
            "drive dispatcher started"
        );
        let period = self.period;
        let cycles = sync::periodic(period, shutdown, || {
            if self.tick().is_none() {
                tracing::trace!("disabled, no commands issued");
            }
        })
        .await;
        tracing::info!(cycles, "drive dispatcher stopped");
    }
}
