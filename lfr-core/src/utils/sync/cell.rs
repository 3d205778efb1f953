//! Single-slot, overwrite-on-write shared cell.
//!
//! A `SharedCell` carries the latest value from exactly one writer task to any
//! number of reader tasks. Readers never wait for a new value; they copy out
//! whatever was written last. The slot lives inside an
//! `embassy_sync::blocking_mutex::Mutex`, so a value wider than the platform's
//! atomic word is never observed half written.

use core::cell::Cell;

use embassy_sync::blocking_mutex::{raw::RawMutex, Mutex};

#[derive(Clone, Copy)]
struct Slot<T> {
    value: T,
    version: u32,
}

/// Latest-value container shared between a writer and its readers.
pub struct SharedCell<M: RawMutex, T: Copy> {
    slot: Mutex<M, Cell<Slot<T>>>,
}

impl<M: RawMutex, T: Copy> SharedCell<M, T> {
    /// Create a cell holding `initial` at version 0.
    pub const fn new(initial: T) -> Self {
        Self {
            slot: Mutex::new(Cell::new(Slot {
                value: initial,
                version: 0,
            })),
        }
    }

    /// Replace the stored value. Visible to every subsequent `get`.
    pub fn put(
        &self,
        value: T,
    ) {
        self.slot.lock(|slot| {
            let version = slot.get().version.wrapping_add(1);
            slot.set(Slot { value, version });
        });
    }

    /// Copy out the most recently written value.
    pub fn get(&self) -> T {
        self.slot.lock(|slot| slot.get().value)
    }

    /// Number of `put` calls so far (wrapping).
    pub fn version(&self) -> u32 {
        self.slot.lock(|slot| slot.get().version)
    }

    /// Copy out the value together with the version it was written at.
    pub fn get_versioned(&self) -> (T, u32) {
        self.slot.lock(|slot| {
            let Slot { value, version } = slot.get();
            (value, version)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[test]
    fn get_returns_initial_value_before_any_put() {
        let cell: SharedCell<NoopRawMutex, u8> = SharedCell::new(7);
        assert_eq!(cell.get(), 7);
        assert_eq!(cell.version(), 0);
    }

    #[test]
    fn put_overwrites_and_bumps_version() {
        let cell: SharedCell<NoopRawMutex, (i16, i16)> = SharedCell::new((0, 0));
        cell.put((127, -127));
        cell.put((63, 127));
        assert_eq!(cell.get_versioned(), ((63, 127), 2));
    }

    #[test]
    fn reads_do_not_consume_the_value() {
        let cell: SharedCell<NoopRawMutex, bool> = SharedCell::new(false);
        cell.put(true);
        assert!(cell.get());
        assert!(cell.get());
        assert_eq!(cell.version(), 1);
    }
}
