// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Wavenet Labs Inc.

//! Hardware timer abstraction

use wn_common::time::Ticks;

/// Platform interface to the single hardware countdown timer
///
/// Implemented once per target. The hardware timer fires exactly once per
/// `start` call; the scheduler re-arms it as needed. `now` reads the
/// free-running 1 kHz tick counter, which wraps.
pub trait TimerHal {
    /// Read the free-running tick counter
    fn now(&self) -> Ticks;

    /// Arm the countdown timer to fire after `ticks` ticks
    ///
    /// A `start` while armed replaces the previous deadline.
    fn start(&mut self, ticks: u32);

    /// Disarm the countdown timer
    fn stop(&mut self);
}
