//! Control core for an 8-sensor line-following robot on no-std embedded platforms.
//!
//! For a runnable host simulation, see the `lfr-app/mock-mcu` crate.
#![no_std]

pub mod utils;
