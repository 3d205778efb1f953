//! Reflectance sensor array and drive-state classification.
//!
//! The array has 8 digital sensors in a row across the chassis. Sensor 1
//! (index 0) sits on the passenger side, sensor 8 (index 7) on the driver side.
//! A high input means the sensor is over the line.
//!
//! Classification compares the whole 8-bit pattern against a fixed table. Any
//! pattern outside the table yields `None`, and the classifier then leaves the
//! previously published state in place.

use embassy_time::Duration;
use embedded_hal::digital::InputPin;

use super::{DriveState, DriveStateCell};
use crate::utils::sync::{self, Shutdown};

/// One snapshot of the 8 sensors. Bit `i` is sensor index `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorReading(u8);

impl SensorReading {
    pub const fn from_bits(bits: u8) -> Self {
        SensorReading(bits)
    }

    pub fn from_array(sensors: [bool; 8]) -> Self {
        let bits = sensors
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, &on)| acc | ((on as u8) << i));
        SensorReading(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn is_set(
        self,
        index: usize,
    ) -> bool {
        index < 8 && self.0 & (1 << index) != 0
    }
}

/// Pattern table in priority order. Every bit must match exactly.
const RULES: [(u8, DriveState); 7] = [
    (0b0001_1000, DriveState::Straight),
    (0b1111_0000, DriveState::RotateCcw),
    (0b0110_0000, DriveState::TurnLeft),
    (0b0011_0000, DriveState::TurnLeft),
    (0b0000_1100, DriveState::TurnRight),
    (0b0000_0110, DriveState::TurnRight),
    (0b0000_1111, DriveState::RotateCw),
];

/// Map a sensor pattern to a drive state, or `None` to hold the current one.
pub fn classify(reading: SensorReading) -> Option<DriveState> {
    RULES
        .iter()
        .find(|(mask, _)| *mask == reading.bits())
        .map(|&(_, state)| state)
}

/// Eight digital inputs bound once at startup.
pub struct LineSensorArray<P> {
    pins: [P; 8],
}

impl<P: InputPin> LineSensorArray<P> {
    /// Bind the array to its pins, `pins[0]` being physical sensor 1.
    pub fn new(pins: [P; 8]) -> Self {
        Self { pins }
    }

    /// Sample every sensor once.
    pub fn read(&mut self) -> Result<SensorReading, P::Error> {
        let mut bits = 0u8;
        for (i, pin) in self.pins.iter_mut().enumerate() {
            if pin.is_high()? {
                bits |= 1 << i;
            }
        }
        Ok(SensorReading(bits))
    }

    pub fn release(self) -> [P; 8] {
        self.pins
    }
}

/// Periodic task that classifies the array and publishes the drive state.
pub struct SensorClassifier<'a, P> {
    sensors: LineSensorArray<P>,
    state: &'a DriveStateCell,
    period: Duration,
}

impl<'a, P: InputPin> SensorClassifier<'a, P> {
    pub fn new(
        sensors: LineSensorArray<P>,
        state: &'a DriveStateCell,
        period: Duration,
    ) -> Self {
        Self {
            sensors,
            state,
            period,
        }
    }

    /// One classification cycle.
    ///
    /// Publishes and returns the new state on a match. A pattern outside the
    /// table, or a failed pin read, publishes nothing and returns `None`.
    pub fn tick(&mut self) -> Option<DriveState> {
        let reading = match self.sensors.read() {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!("sensor read failed, holding drive state: {:?}", e);
                return None;
            }
        };

        match classify(reading) {
            Some(state) => {
                if state != self.state.get() {
                    tracing::debug!(bits = reading.bits(), ?state, "drive state changed");
                }
                self.state.put(state);
                Some(state)
            }
            None => {
                tracing::trace!(bits = reading.bits(), "no pattern match, holding");
                None
            }
        }
    }

    /// Classify every period until `shutdown` is signalled.
    pub async fn run(
        &mut self,
        shutdown: &Shutdown,
    ) {
        tracing::info!(period_ms = self.period.as_millis(), "sensor classifier started");
        let period = self.period;
        let cycles = sync::periodic(period, shutdown, || {
            self.tick();
        })
        .await;
        tracing::info!(cycles, "sensor classifier stopped");
    }
}
