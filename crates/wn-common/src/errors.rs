// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Wavenet Labs Inc.

//! Error types for the Wavenet mesh SDK
//!
//! This module defines the unified error type used throughout the SDK.
//! All errors are no_std compatible and carry no heap-allocated context.

use core::fmt;

/// Result type alias for Wavenet mesh SDK operations
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the Wavenet mesh SDK
///
/// This enum represents all possible errors that can occur in the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Cryptographic Errors (0x01xx)
    // =========================================================================
    /// Invalid cryptographic key format or size
    InvalidKey,
    /// Random number generator failure
    RngFailure,

    // =========================================================================
    // Key Storage Errors (0x02xx)
    // =========================================================================
    /// Storage read operation failed
    StorageReadFailed,
    /// Storage write operation failed
    StorageWriteFailed,
    /// No network key is provisioned for the requested key class
    NetworkKeyMissing,

    // =========================================================================
    // Session Errors (0x03xx)
    // =========================================================================
    /// A transmit session is already in progress
    Busy,
    /// No usable peer nonce is registered
    NonceNotFound,

    // =========================================================================
    // Transport Errors (0x04xx)
    // =========================================================================
    /// Radio/MAC layer rejected the frame
    TransportRejected,

    // =========================================================================
    // General Errors (0xFFxx)
    // =========================================================================
    /// Buffer is too small for operation
    BufferTooSmall,
    /// Invalid parameter provided
    InvalidParameter,
}

impl Error {
    /// Get the error code for this error
    ///
    /// Error codes are organized by category:
    /// - 0x01xx: Cryptographic errors
    /// - 0x02xx: Key storage errors
    /// - 0x03xx: Session errors
    /// - 0x04xx: Transport errors
    /// - 0xFFxx: General errors
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            // Crypto errors (0x01xx)
            Self::InvalidKey => 0x0101,
            Self::RngFailure => 0x0102,

            // Key storage errors (0x02xx)
            Self::StorageReadFailed => 0x0201,
            Self::StorageWriteFailed => 0x0202,
            Self::NetworkKeyMissing => 0x0203,

            // Session errors (0x03xx)
            Self::Busy => 0x0301,
            Self::NonceNotFound => 0x0302,

            // Transport errors (0x04xx)
            Self::TransportRejected => 0x0401,

            // General errors (0xFFxx)
            Self::BufferTooSmall => 0xFF01,
            Self::InvalidParameter => 0xFF02,
        }
    }

    /// Check if this is a security-critical error
    #[must_use]
    pub const fn is_security_error(&self) -> bool {
        matches!(self, Self::InvalidKey | Self::NetworkKeyMissing)
    }

    /// Get a short description of the error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidKey => "invalid cryptographic key",
            Self::RngFailure => "RNG failure",
            Self::StorageReadFailed => "storage read failed",
            Self::StorageWriteFailed => "storage write failed",
            Self::NetworkKeyMissing => "network key missing",
            Self::Busy => "busy",
            Self::NonceNotFound => "nonce not found",
            Self::TransportRejected => "transport rejected frame",
            Self::BufferTooSmall => "buffer too small",
            Self::InvalidParameter => "invalid parameter",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[0x{:04X}] {}", self.code(), self.description());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_category_prefixes() {
        assert_eq!(Error::InvalidKey.code() >> 8, 0x01);
        assert_eq!(Error::NetworkKeyMissing.code() >> 8, 0x02);
        assert_eq!(Error::Busy.code() >> 8, 0x03);
        assert_eq!(Error::TransportRejected.code() >> 8, 0x04);
        assert_eq!(Error::BufferTooSmall.code() >> 8, 0xFF);
    }

    #[test]
    fn security_classification() {
        assert!(Error::InvalidKey.is_security_error());
        assert!(Error::NetworkKeyMissing.is_security_error());
        assert!(!Error::Busy.is_security_error());
        assert!(!Error::BufferTooSmall.is_security_error());
    }
}
