// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Wavenet Labs Inc.

//! Time utilities for the Wavenet mesh SDK
//!
//! The system tick counter is a free-running 32-bit millisecond counter
//! that wraps roughly every 49.7 days. All elapsed-time arithmetic in the
//! SDK therefore uses wrapping subtraction; comparing raw tick values
//! directly is never correct across the wrap point.

/// System tick counter value (1 kHz, wraps at `u32::MAX`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Ticks(u32);

impl Ticks {
    /// Create from raw tick count
    #[must_use]
    pub const fn new(ticks: u32) -> Self {
        Self(ticks)
    }

    /// Get the raw tick count
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Ticks elapsed between this (earlier) timestamp and `now`
    ///
    /// Correct across a single counter wrap.
    #[must_use]
    pub const fn elapsed(&self, now: Self) -> u32 {
        now.0.wrapping_sub(self.0)
    }

    /// Check whether `duration` ticks have elapsed since this timestamp
    #[must_use]
    pub const fn has_elapsed(&self, now: Self, duration: u32) -> bool {
        self.elapsed(now) >= duration
    }

    /// Advance by a number of ticks, wrapping
    #[must_use]
    pub const fn wrapping_add(&self, ticks: u32) -> Self {
        Self(self.0.wrapping_add(ticks))
    }
}

impl From<u32> for Ticks {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Ticks> for u32 {
    fn from(value: Ticks) -> Self {
        value.0
    }
}

/// Source of the current system tick count
pub trait TickSource {
    /// Read the free-running tick counter
    fn now(&self) -> Ticks;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_simple() {
        let start = Ticks::new(1_000);
        assert_eq!(start.elapsed(Ticks::new(1_500)), 500);
        assert!(start.has_elapsed(Ticks::new(2_000), 1_000));
        assert!(!start.has_elapsed(Ticks::new(1_999), 1_000));
    }

    #[test]
    fn elapsed_across_wrap() {
        let start = Ticks::new(0xFFFF_FF00);
        let now = Ticks::new(0x0000_0100);
        assert_eq!(start.elapsed(now), 0x200);
        assert!(!start.has_elapsed(now, 0x201));
        assert!(start.has_elapsed(now, 0x200));
    }

    #[test]
    fn wrapping_add_wraps() {
        assert_eq!(Ticks::new(u32::MAX).wrapping_add(1), Ticks::new(0));
    }
}
