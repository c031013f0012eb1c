// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Wavenet Labs Inc.

//! System-wide constants for the Wavenet mesh SDK
//!
//! This module defines compile-time constants used throughout the SDK.
//! All sizes and limits are carefully chosen for embedded constraints.

// =============================================================================
// Cryptographic Constants
// =============================================================================

/// Network key size in bytes (AES-128)
pub const NETWORK_KEY_SIZE: usize = 16;

/// AES block size in bytes
pub const AES_BLOCK_SIZE: usize = 16;

/// Session nonce size in bytes
pub const NONCE_SIZE: usize = 8;

/// Authentication tag size carried on encapsulated frames
pub const MAC_SIZE: usize = 8;

// =============================================================================
// Timing Constants
// =============================================================================

/// System tick rate (one tick per millisecond)
pub const TICK_HZ: u32 = 1_000;

/// Ticks per second, for timeout arithmetic
pub const TICKS_PER_SECOND: u32 = TICK_HZ;

// =============================================================================
// Logging Constants
// =============================================================================

/// Maximum log message length
pub const MAX_LOG_MESSAGE_LEN: usize = 96;

/// Log buffer size (number of entries)
pub const LOG_BUFFER_SIZE: usize = 16;
