// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Wavenet Labs Inc.

//! Wavenet Mesh SDK Software Timers
//!
//! This crate multiplexes a set of logical one-shot callback timers onto a
//! single hardware countdown timer. Pending timers are kept sorted by
//! remaining time; only the soonest deadline is ever programmed into
//! hardware. All tick arithmetic is wraparound-safe on the 32-bit
//! millisecond counter.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod hal;
mod scheduler;

pub use hal::TimerHal;
pub use scheduler::{TimerCallback, TimerId, TimerScheduler, MAX_PENDING_TIMERS};
