// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Wavenet Labs Inc.

//! Platform interfaces consumed by the Security Scheme 0 engine
//!
//! These traits form the seam between the protocol engine and the target
//! platform: the radio transport, the secure key store, the hardware RNG
//! and the power manager. Each is implemented once per platform and mocked
//! in tests.

use wn_common::errors::Result;
use wn_common::types::{KeyClass, NetworkKey, NodeId, TxOptions, TxStatus};

/// Addressing and radio options for one outgoing frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxRoute {
    /// Sending node
    pub source: NodeId,
    /// Receiving node
    pub destination: NodeId,
    /// Radio option bits, passed through unchanged
    pub options: TxOptions,
}

/// Frame transmission interface (MAC layer)
pub trait Transport {
    /// Queue a frame for transmission
    ///
    /// `Ok` means the frame was accepted for transmission, not that it was
    /// delivered. The radio outcome is reported later, exactly once per
    /// accepted frame, through [`Sec0::on_transmit_complete`].
    ///
    /// # Errors
    /// Returns an error if the MAC layer cannot accept the frame.
    ///
    /// [`Sec0::on_transmit_complete`]: crate::Sec0::on_transmit_complete
    fn send(&mut self, frame: &[u8], route: &TxRoute) -> Result<()>;
}

/// Persistent key storage interface
pub trait KeyStore {
    /// Read the key provisioned for `class`, if any
    fn read_key(&self, class: KeyClass) -> Option<NetworkKey>;

    /// Persist a key for `class`
    ///
    /// # Errors
    /// Returns an error if the backing storage rejects the write.
    fn write_key(&mut self, class: KeyClass, key: &NetworkKey) -> Result<()>;

    /// Erase the key provisioned for `class`
    ///
    /// # Errors
    /// Returns an error if the backing storage rejects the erase.
    fn clear_key(&mut self, class: KeyClass) -> Result<()>;
}

/// Hardware random number source
pub trait RandomSource {
    /// Fill `dest` with random bytes
    ///
    /// # Errors
    /// Returns an error if the entropy source is unavailable.
    fn fill_random(&mut self, dest: &mut [u8]) -> Result<()>;
}

/// What a power lock keeps powered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerLockType {
    /// Keep the radio powered and listening
    Radio,
}

/// Handle to a registered power lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmHandle(u32);

impl PmHandle {
    /// Create from a platform-assigned raw value
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw handle value
    #[must_use]
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

/// Power management interface
///
/// Locks keep the device out of deep sleep for a bounded duration so it can
/// finish an exchange; an expired or cancelled lock lets it sleep again.
pub trait PowerManager {
    /// Register a power lock of the given type
    fn register(&mut self, lock: PowerLockType) -> PmHandle;

    /// Hold the lock for `duration_ms` milliseconds from now
    ///
    /// Re-arming an already held lock replaces its deadline.
    fn stay_awake(&mut self, handle: PmHandle, duration_ms: u32);

    /// Release the lock immediately
    fn cancel(&mut self, handle: PmHandle);
}

/// Completion callback for an encrypted transmit session
///
/// Consumed when invoked, so a session outcome can only ever be reported
/// once.
#[derive(Debug)]
pub struct TransmitCallback {
    func: fn(usize, TxStatus),
    context: usize,
}

impl TransmitCallback {
    /// Create a callback from a function pointer and a caller context word
    #[must_use]
    pub const fn new(func: fn(usize, TxStatus), context: usize) -> Self {
        Self { func, context }
    }

    /// Report the session outcome
    pub fn invoke(self, status: TxStatus) {
        (self.func)(self.context, status);
    }
}
