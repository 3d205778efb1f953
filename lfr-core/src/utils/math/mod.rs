//! Math utilities for the line follower.
//!
//! This module provides the single-pole smoothing filter used to model motor
//! acceleration limits.

pub mod filter;
