// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Wavenet Labs Inc.

//! Protocol timing configuration

use wn_common::constants::TICKS_PER_SECOND;

/// Security Scheme 0 timing parameters
///
/// The defaults are the interoperable protocol values; overriding them is
/// only useful for accelerated testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sec0Config {
    /// How long an issued or received nonce stays usable, in ticks
    pub nonce_timeout: u32,
    /// How long a transmit session waits for the peer's nonce report, in ticks
    pub nonce_request_timeout: u32,
    /// How long to keep the radio awake after sending a nonce report, in ms
    pub nonce_report_wake: u32,
    /// How long a receive reassembly session stays valid, in ticks
    pub rx_session_ttl: u32,
}

impl Default for Sec0Config {
    fn default() -> Self {
        Self {
            nonce_timeout: 10 * TICKS_PER_SECOND,
            nonce_request_timeout: 10 * TICKS_PER_SECOND,
            nonce_report_wake: 500,
            rx_session_ttl: 10 * TICKS_PER_SECOND,
        }
    }
}
