//! Cross-task synchronization for the control loops.
//!
//! - `cell`: the `SharedCell` latest-value primitive
//! - `Shutdown`: cooperative stop signal handed to every task loop
//! - `periodic`: fixed-period loop shared by all tasks

pub mod cell;

pub use cell::SharedCell;

use embassy_futures::select::{select, Either};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use embassy_time::{Duration, Ticker};

/// Cooperative shutdown signal. Production firmware never raises it.
pub type Shutdown = Signal<CriticalSectionRawMutex, ()>;

/// Run `cycle` once per `period` until `shutdown` is signalled.
///
/// Each iteration runs one full cycle before suspending, so a task is never
/// interrupted mid-computation. A shutdown raised before the call still lets
/// exactly one cycle run. A pending shutdown wins over an overdue tick.
/// Returns the number of cycles executed.
pub async fn periodic<F>(
    period: Duration,
    shutdown: &Shutdown,
    mut cycle: F,
) -> u32
where
    F: FnMut(),
{
    let mut ticker = Ticker::every(period);
    let mut cycles: u32 = 0;
    loop {
        cycle();
        cycles = cycles.wrapping_add(1);
        match select(shutdown.wait(), ticker.next()).await {
            Either::First(()) => break cycles,
            Either::Second(()) => continue,
        }
    }
}
