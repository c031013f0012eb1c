// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Wavenet Labs Inc.

//! Core types for the Wavenet mesh SDK

use core::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::NETWORK_KEY_SIZE;
use crate::errors::{Error, Result};

/// Mesh node identifier
///
/// Node 0 is never assigned; it is reserved by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeId(u8);

impl NodeId {
    /// Create a node identifier
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Get the raw identifier value
    #[must_use]
    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    /// Check whether this is the reserved unassigned identifier
    #[must_use]
    pub const fn is_unassigned(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for NodeId {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "node {}", self.0);
    }
}

/// Network encryption key (AES-128)
///
/// Zeroized on drop. The all-zero key is treated as absent: a node that has
/// never been securely included must not encrypt anything.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct NetworkKey([u8; NETWORK_KEY_SIZE]);

impl NetworkKey {
    /// Key size in bytes
    pub const SIZE: usize = NETWORK_KEY_SIZE;

    /// Create from raw key bytes
    #[must_use]
    pub const fn new(bytes: [u8; NETWORK_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a byte slice
    ///
    /// # Errors
    /// Returns `Error::InvalidKey` if the slice is not exactly 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != NETWORK_KEY_SIZE {
            return Err(Error::InvalidKey);
        }
        let mut key = [0u8; NETWORK_KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Get the raw key bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; NETWORK_KEY_SIZE] {
        &self.0
    }

    /// Check whether this is the all-zero (absent) key
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl fmt::Debug for NetworkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material
        write!(f, "NetworkKey(..)")
    }
}

/// Key class selector for the secure key store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyClass {
    /// Security Scheme 0 network key
    Scheme0 = 0x80,
}

impl KeyClass {
    /// Wire/storage identifier of this key class
    #[must_use]
    pub const fn id(&self) -> u8 {
        *self as u8
    }
}

/// Outcome of a transmit session, reported to the completion callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// Frame(s) delivered and acknowledged
    Ok,
    /// Transmission failed or timed out
    Fail,
}

/// Radio transmit option bits, passed through to the transport unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxOptions(u8);

impl TxOptions {
    /// Create from raw option bits
    #[must_use]
    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    /// Get the raw option bits
    #[must_use]
    pub const fn bits(&self) -> u8 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_key_from_slice_validates_length() {
        assert!(NetworkKey::from_slice(&[0xAA; 16]).is_ok());
        assert_eq!(
            NetworkKey::from_slice(&[0xAA; 15]).unwrap_err(),
            Error::InvalidKey
        );
    }

    #[test]
    fn zero_key_is_absent() {
        assert!(NetworkKey::new([0; 16]).is_zero());
        assert!(!NetworkKey::new([1; 16]).is_zero());
    }

    #[test]
    fn key_class_ids() {
        assert_eq!(KeyClass::Scheme0.id(), 0x80);
    }
}
