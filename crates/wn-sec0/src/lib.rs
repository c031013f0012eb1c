// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Wavenet Labs Inc.

//! Wavenet Mesh SDK Security Scheme 0
//!
//! Encrypted, authenticated session layer for singlecast frames. Every
//! encrypted frame consumes a single-use nonce obtained from the receiver
//! through a nonce get / nonce report handshake; payloads larger than one
//! frame are split into two sequenced fragments, each consuming its own
//! nonce. Frames are encrypted with AES-OFB and authenticated with an AES
//! CBC-MAC, both keyed from the shared network key.
//!
//! The engine is generic over the platform seam ([`Transport`],
//! [`KeyStore`], [`RandomSource`], [`PowerManager`]) and drives its
//! timeouts through a [`TimerScheduler`] passed into each operation that
//! arms or cancels timers.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod crypto;
pub mod frame;
mod nonce;
mod rx;
mod tx;
pub mod traits;

use heapless::Vec;

use wn_common::constants::{AES_BLOCK_SIZE, MAC_SIZE, NONCE_SIZE};
use wn_common::errors::{Error, Result};
use wn_common::log::LogBuffer;
use wn_common::time::Ticks;
use wn_common::types::{KeyClass, NetworkKey, NodeId, TxOptions, TxStatus};
use wn_common::{log_debug, log_info, log_warn};
use wn_timer::{TimerHal, TimerId, TimerScheduler};

use crate::crypto::FrameKeys;
use crate::frame::{
    CMD_MESSAGE_ENCAP, CMD_MESSAGE_ENCAP_NONCE_GET, MAX_FRAGMENT_PLAINTEXT,
    PROPERTIES_SECOND_FRAME, PROPERTIES_SEQUENCED, PROPERTIES_SEQUENCE_MASK,
};
use crate::nonce::{NonceTable, NONCE_TABLE_SIZE};
use crate::rx::{RxPool, RxState};
use crate::tx::{SentFrame, TxSession, TxState};

pub use crate::config::Sec0Config;
pub use crate::traits::{
    KeyStore, PmHandle, PowerLockType, PowerManager, RandomSource, TransmitCallback, Transport,
    TxRoute,
};
pub use crate::tx::MAX_TX_PAYLOAD;

/// Largest decrypted message this layer delivers
pub const MAX_ENCRYPTED_MSG_SIZE: usize = 128;

/// Decrypted plaintext per frame: properties byte plus payload
const PLAINTEXT_MAX: usize = MAX_ENCRYPTED_MSG_SIZE + 1;

/// Authenticated data: 4 header bytes plus ciphertext
const AUTH_DATA_MAX: usize = MAX_ENCRYPTED_MSG_SIZE + 5;

const MODULE: &str = "sec0";

/// Logical timer for the transmit session
const TX_SESSION_TIMER: TimerId = TimerId::new(0);

/// Logical timers for nonce validity, one per table slot
const NONCE_TIMER_BASE: u16 = 1;

fn nonce_timer(slot: usize) -> TimerId {
    TimerId::new(NONCE_TIMER_BASE + slot as u16)
}

/// Coarse activity state of the security layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sec0State {
    /// Nothing outstanding
    Idle,
    /// At least one issued nonce is awaiting use
    NonceActive,
    /// An encrypted transmit session is in progress
    TxSessionActive,
    /// A receive reassembly session is in progress
    RxSessionActive,
}

/// Security Scheme 0 session engine
pub struct Sec0<T, K, R, P> {
    transport: T,
    keystore: K,
    rng: R,
    power: P,
    config: Sec0Config,
    keys: FrameKeys,
    key_present: bool,
    nonces: NonceTable,
    rx: RxPool,
    tx: TxSession,
    sequence: u8,
    tx_lock: Option<PmHandle>,
    rx_lock: Option<PmHandle>,
    log: LogBuffer,
}

impl<T, K, R, P> Sec0<T, K, R, P>
where
    T: Transport,
    K: KeyStore,
    R: RandomSource,
    P: PowerManager,
{
    /// Create an engine with default protocol timing
    pub fn new(transport: T, keystore: K, rng: R, power: P) -> Self {
        Self::with_config(transport, keystore, rng, power, Sec0Config::default())
    }

    /// Create an engine with explicit timing parameters
    pub fn with_config(transport: T, keystore: K, rng: R, power: P, config: Sec0Config) -> Self {
        Self {
            transport,
            keystore,
            rng,
            power,
            config,
            keys: FrameKeys::zeroed(),
            key_present: false,
            nonces: NonceTable::new(),
            rx: RxPool::new(config.rx_session_ttl),
            tx: TxSession::idle(),
            sequence: 0,
            tx_lock: None,
            rx_lock: None,
            log: LogBuffer::new(),
        }
    }

    /// Load the network key and reset all session state
    ///
    /// Clears every nonce, receive session and any transmit session
    /// (without invoking its callback), stops all timers owned by the
    /// layer and releases both power locks.
    ///
    /// # Errors
    /// Returns `Error::NetworkKeyMissing` if no valid (non-zero) network
    /// key is provisioned; the layer then refuses to encrypt or decrypt
    /// until a key is loaded.
    pub fn init<H: TimerHal>(&mut self, timers: &mut TimerScheduler<H, Self>) -> Result<()> {
        let key_loaded = self.unpersist_netkey();

        self.rx.reset();
        self.tx.reset();
        timers.stop(TX_SESSION_TIMER);
        for slot in 0..NONCE_TABLE_SIZE {
            timers.stop(nonce_timer(slot));
        }
        self.nonces.reset();
        self.sequence = 0;

        if let Some(lock) = self.tx_lock {
            self.power.cancel(lock);
        }
        if let Some(lock) = self.rx_lock {
            self.power.cancel(lock);
        }

        if key_loaded {
            log_info!(self.log, timers.now().as_u32(), MODULE, "initialized");
            Ok(())
        } else {
            Err(Error::NetworkKeyMissing)
        }
    }

    /// Register the transmit and receive power locks with the platform
    ///
    /// Idempotent; call once during bring-up, before any exchange.
    pub fn register_power_locks(&mut self) {
        if self.tx_lock.is_none() {
            self.tx_lock = Some(self.power.register(PowerLockType::Radio));
        }
        if self.rx_lock.is_none() {
            self.rx_lock = Some(self.power.register(PowerLockType::Radio));
        }
    }

    /// Persist a network key to the key store
    ///
    /// Does not change the working keys; call [`Sec0::unpersist_netkey`]
    /// (or [`Sec0::init`]) to load it.
    ///
    /// # Errors
    /// Propagates key store write failures.
    pub fn persist_netkey(&mut self, key: &NetworkKey) -> Result<()> {
        self.keystore.write_key(KeyClass::Scheme0, key)
    }

    /// Read the network key back from the key store and derive the
    /// working keys
    ///
    /// Returns whether a valid (non-zero) key was loaded. Without one the
    /// working keys are zeroed and the layer refuses to operate.
    pub fn unpersist_netkey(&mut self) -> bool {
        match self.keystore.read_key(KeyClass::Scheme0) {
            Some(key) if !key.is_zero() => {
                self.keys = FrameKeys::derive(&key);
                self.key_present = true;
            }
            _ => {
                self.keys = FrameKeys::zeroed();
                self.key_present = false;
            }
        }
        self.key_present
    }

    /// Erase the network key from the key store and drop the working keys
    ///
    /// # Errors
    /// Propagates key store erase failures; the working keys are dropped
    /// regardless.
    pub fn clear_netkey(&mut self) -> Result<()> {
        self.keys = FrameKeys::zeroed();
        self.key_present = false;
        self.keystore.clear_key(KeyClass::Scheme0)
    }

    /// Generate and transmit a fresh nonce in response to a nonce get
    ///
    /// `source` is the peer that asked for the nonce; `destination` is the
    /// local node that issues it. The nonce is registered for the
    /// (local, peer) pair with its validity timer armed, and the radio is
    /// kept awake briefly so the peer's encrypted frame can be received.
    ///
    /// # Errors
    /// Fails if no network key is loaded, the RNG fails, or the transport
    /// rejects the report (in which case nothing is registered).
    pub fn send_nonce<H: TimerHal>(
        &mut self,
        timers: &mut TimerScheduler<H, Self>,
        source: NodeId,
        destination: NodeId,
        options: TxOptions,
    ) -> Result<()> {
        if !self.key_present {
            return Err(Error::NetworkKeyMissing);
        }

        let mut nonce = [0u8; NONCE_SIZE];
        loop {
            self.rng.fill_random(&mut nonce)?;
            // The first byte is the wire identifier; it must be unique
            // among outstanding nonces for this pair
            if self
                .nonces
                .find(destination, source, Some(nonce[0]))
                .is_none()
            {
                break;
            }
        }

        let report = frame::nonce_report(&nonce);
        let route = TxRoute {
            source: destination,
            destination: source,
            options,
        };
        self.transport.send(&report, &route)?;

        match self.nonces.register(destination, source, nonce) {
            Some(slot) => timers.set(
                nonce_timer(slot),
                self.config.nonce_timeout,
                Self::on_nonce_timeout,
                slot as u32,
            ),
            None => log_warn!(
                self.log,
                timers.now().as_u32(),
                MODULE,
                "nonce table full, report sent unregistered"
            ),
        }

        if let Some(lock) = self.rx_lock {
            self.power.stay_awake(lock, self.config.nonce_report_wake);
        }
        Ok(())
    }

    /// Start an encrypted transmit session
    ///
    /// Buffers the payload, requests a nonce from `destination` and
    /// returns; encryption and transmission proceed as nonce reports
    /// arrive. `callback` is invoked exactly once with the session
    /// outcome, possibly before this returns if the transport rejects the
    /// nonce get outright.
    ///
    /// # Errors
    /// Returns `Error::Busy` while a session is in progress (the new
    /// request is not queued), `Error::BufferTooSmall` for payloads over
    /// [`MAX_TX_PAYLOAD`], and `Error::NetworkKeyMissing` without a key.
    pub fn send_data<H: TimerHal>(
        &mut self,
        timers: &mut TimerScheduler<H, Self>,
        source: NodeId,
        destination: NodeId,
        payload: &[u8],
        options: TxOptions,
        callback: TransmitCallback,
    ) -> Result<()> {
        if !self.key_present {
            return Err(Error::NetworkKeyMissing);
        }
        if self.tx.is_active() {
            return Err(Error::Busy);
        }
        if payload.is_empty() {
            return Err(Error::InvalidParameter);
        }

        self.tx.payload.clear();
        self.tx
            .payload
            .extend_from_slice(payload)
            .map_err(|()| Error::BufferTooSmall)?;
        self.tx.source = source;
        self.tx.destination = destination;
        self.tx.options = options;
        self.tx.offset = 0;
        self.tx.sequence = self.next_sequence();
        self.tx.callback = Some(callback);

        self.start_nonce_get(timers);
        Ok(())
    }

    /// Feed a peer's nonce report into the transmit session
    ///
    /// Ignored unless a session towards `source` is waiting for it. The
    /// nonce is registered with its validity timer and, when the session
    /// state allows, the next encrypted fragment goes out immediately.
    pub fn register_nonce<H: TimerHal>(
        &mut self,
        timers: &mut TimerScheduler<H, Self>,
        source: NodeId,
        destination: NodeId,
        nonce: &[u8; NONCE_SIZE],
    ) {
        if !self.tx.is_active() || self.tx.destination != source || self.tx.source != destination {
            log_debug!(
                self.log,
                timers.now().as_u32(),
                MODULE,
                "unsolicited nonce report from {}",
                source
            );
            return;
        }

        match self.nonces.register(source, destination, *nonce) {
            Some(slot) => timers.set(
                nonce_timer(slot),
                self.config.nonce_timeout,
                Self::on_nonce_timeout,
                slot as u32,
            ),
            None => {
                log_warn!(
                    self.log,
                    timers.now().as_u32(),
                    MODULE,
                    "nonce table full, dropping report"
                );
                return;
            }
        }

        match self.tx.state {
            TxState::NonceGet | TxState::NonceGetSent => self.send_encap(timers, false),
            TxState::EncMsgSent => self.send_encap(timers, true),
            TxState::EncMsg if self.tx.remaining() > 0 => self.send_encap(timers, true),
            _ => {}
        }
    }

    /// Report the radio outcome of the oldest frame accepted by the
    /// transport
    ///
    /// Must be called exactly once per accepted frame, in acceptance
    /// order. Each completion is credited to the frame it belongs to, so
    /// a result arriving after the next fragment already went out (a
    /// duplicated nonce report can release it early) never completes the
    /// session on the wrong frame's behalf. A failed fragment fails the
    /// session; only the final fragment's own success completes it.
    pub fn on_transmit_complete<H: TimerHal>(
        &mut self,
        timers: &mut TimerScheduler<H, Self>,
        status: TxStatus,
    ) {
        if !self.tx.is_active() || self.tx.unacked.is_empty() {
            return;
        }
        let kind = self.tx.unacked.remove(0);
        let ok = status == TxStatus::Ok;
        match kind {
            SentFrame::NonceGet => {
                // Moot once a nonce report has already advanced the session
                if self.tx.state == TxState::NonceGet {
                    if ok {
                        self.tx.state = TxState::NonceGetSent;
                    } else {
                        self.fail_tx(timers);
                    }
                }
            }
            SentFrame::FirstFragment => {
                if !ok {
                    self.fail_tx(timers);
                } else if self.tx.state == TxState::EncMsg {
                    self.tx.state = TxState::EncMsgSent;
                }
            }
            SentFrame::FinalFragment => {
                if ok {
                    self.complete_tx(timers);
                } else {
                    self.fail_tx(timers);
                }
            }
        }
    }

    /// Decrypt and authenticate a received encapsulated frame
    ///
    /// Returns the number of plaintext bytes written to `out`, or 0 for
    /// anything that cannot be delivered: malformed or unauthenticated
    /// frames, unknown nonces, expired or out-of-sequence sessions, and
    /// first fragments awaiting their second half. Callers cannot
    /// distinguish why a frame was dropped.
    ///
    /// The nonce consumed by the frame (and any other outstanding nonce
    /// for the pair) is invalidated whether or not authentication
    /// succeeds, so a nonce is only ever usable once.
    pub fn decrypt_message<H: TimerHal>(
        &mut self,
        timers: &mut TimerScheduler<H, Self>,
        source: NodeId,
        destination: NodeId,
        encrypted: &[u8],
        out: &mut [u8],
    ) -> usize {
        let now = timers.now();
        if !self.key_present {
            return 0;
        }
        let Some(encap) = frame::EncapFrame::parse(encrypted) else {
            return 0;
        };
        let ciphertext = encap.ciphertext();
        if ciphertext.len() - 1 > MAX_ENCRYPTED_MSG_SIZE {
            log_warn!(self.log, now.as_u32(), MODULE, "oversized encap frame");
            return 0;
        }

        // The nonce we issued, selected by the id echoed in the frame
        let Some(receiver_nonce) =
            self.nonces
                .find(destination, source, Some(encap.receiver_nonce_id()))
        else {
            log_debug!(
                self.log,
                now.as_u32(),
                MODULE,
                "no nonce for encap frame from {}",
                source
            );
            return 0;
        };
        let mut iv = [0u8; AES_BLOCK_SIZE];
        iv[..NONCE_SIZE].copy_from_slice(encap.sender_nonce());
        iv[NONCE_SIZE..].copy_from_slice(&receiver_nonce);
        // Single use: consume every outstanding nonce for this pair
        self.clear_nonces(timers, destination, source);

        let slot = match self.rx.find(source, destination, now) {
            Some(slot) => slot,
            None => match self.rx.allocate(source, destination, now) {
                Some(slot) => slot,
                None => {
                    log_warn!(self.log, now.as_u32(), MODULE, "rx sessions exhausted");
                    return 0;
                }
            },
        };
        {
            let session = self.rx.get(slot);
            if session.state == RxState::FirstFrame
                && session.buf.len() + ciphertext.len() - 1 > MAX_ENCRYPTED_MSG_SIZE
            {
                return 0;
            }
        }

        let Ok(auth) =
            frame::auth_data::<AUTH_DATA_MAX>(encap.command(), source, destination, ciphertext)
        else {
            return 0;
        };
        let mac = crypto::cbc_mac(self.keys.auth(), &iv, &auth);
        if !crypto::ct_eq(&mac[..MAC_SIZE], encap.mac()) {
            log_warn!(
                self.log,
                now.as_u32(),
                MODULE,
                "encap frame from {} failed authentication",
                source
            );
            return 0;
        }

        let mut plain: Vec<u8, PLAINTEXT_MAX> = Vec::new();
        let _ = plain.extend_from_slice(ciphertext);
        crypto::ofb_apply(self.keys.enc(), &iv, &mut plain);
        let properties = plain[0];
        let body = &plain[1..];

        if properties & PROPERTIES_SEQUENCED == 0 {
            // Complete message in one frame
            if body.len() > out.len() {
                return 0;
            }
            out[..body.len()].copy_from_slice(body);
            self.rx.free(slot);
            if let Some(lock) = self.rx_lock {
                self.power.cancel(lock);
            }
            return body.len();
        }

        if properties & PROPERTIES_SECOND_FRAME == 0 {
            // First fragment: buffer it and wait for the rest
            let session = self.rx.get(slot);
            session.sequence = properties & PROPERTIES_SEQUENCE_MASK;
            session.buf.clear();
            let _ = session.buf.extend_from_slice(body);
            session.state = RxState::FirstFrame;
            return 0;
        }

        // Second fragment: must continue the buffered first one
        let session = self.rx.get(slot);
        let in_sequence = session.state == RxState::FirstFrame
            && session.sequence == properties & PROPERTIES_SEQUENCE_MASK;
        if !in_sequence {
            log_debug!(
                self.log,
                now.as_u32(),
                MODULE,
                "out of sequence fragment from {}",
                source
            );
            return 0;
        }

        let session = self.rx.get(slot);
        let first_len = session.buf.len();
        let total = first_len + body.len();
        if total > out.len() {
            return 0;
        }
        out[..first_len].copy_from_slice(&session.buf);
        out[first_len..total].copy_from_slice(body);
        self.rx.free(slot);
        if let Some(lock) = self.rx_lock {
            self.power.cancel(lock);
        }
        total
    }

    /// Coarse activity state, for sleep gating
    ///
    /// Expired receive sessions are reclaimed as a side effect.
    pub fn state(&mut self, now: Ticks) -> Sec0State {
        if !self.key_present {
            return Sec0State::Idle;
        }
        if self.rx.any_active(now) {
            return Sec0State::RxSessionActive;
        }
        if self.tx.is_active() {
            return Sec0State::TxSessionActive;
        }
        if self.nonces.any_active() {
            return Sec0State::NonceActive;
        }
        Sec0State::Idle
    }

    /// Whether any exchange is outstanding
    pub fn busy(&mut self, now: Ticks) -> bool {
        self.state(now) != Sec0State::Idle
    }

    /// Abort the transmit session, if any
    ///
    /// The completion callback is invoked with `TxStatus::Fail`.
    pub fn abort_all_tx_sessions<H: TimerHal>(&mut self, timers: &mut TimerScheduler<H, Self>) {
        if self.tx.is_active() {
            self.fail_tx(timers);
        }
    }

    /// Send the network key verify frame that concludes secure inclusion
    ///
    /// # Errors
    /// Propagates transport rejection.
    pub fn send_key_verify(
        &mut self,
        source: NodeId,
        destination: NodeId,
        options: TxOptions,
    ) -> Result<()> {
        let route = TxRoute {
            source,
            destination,
            options,
        };
        self.transport.send(&frame::key_verify(), &route)
    }

    /// Diagnostic log of protocol anomalies
    pub fn log(&self) -> &LogBuffer {
        &self.log
    }

    /// Mutable access to the diagnostic log (level control, draining)
    pub fn log_mut(&mut self) -> &mut LogBuffer {
        &mut self.log
    }

    /// Timing parameters in effect
    pub fn config(&self) -> &Sec0Config {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Transmit session internals
    // -------------------------------------------------------------------------

    fn next_sequence(&mut self) -> u8 {
        self.sequence = self.sequence.wrapping_add(1);
        self.sequence
    }

    fn start_nonce_get<H: TimerHal>(&mut self, timers: &mut TimerScheduler<H, Self>) {
        self.tx.state = TxState::NonceGet;
        timers.set(
            TX_SESSION_TIMER,
            self.config.nonce_request_timeout,
            Self::on_tx_timeout,
            0,
        );

        let route = TxRoute {
            source: self.tx.source,
            destination: self.tx.destination,
            options: self.tx.options,
        };
        if self.transport.send(&frame::nonce_get(), &route).is_ok() {
            let _ = self.tx.unacked.push(SentFrame::NonceGet);
            if let Some(lock) = self.tx_lock {
                self.power
                    .stay_awake(lock, self.config.nonce_request_timeout);
            }
        } else {
            log_warn!(
                self.log,
                timers.now().as_u32(),
                MODULE,
                "transport rejected nonce get"
            );
            self.fail_tx(timers);
        }
    }

    /// Encrypt and send the next fragment; `second` selects the final
    /// fragment of a segmented payload
    fn send_encap<H: TimerHal>(&mut self, timers: &mut TimerScheduler<H, Self>, second: bool) {
        timers.stop(TX_SESSION_TIMER);
        self.tx.state = if second {
            TxState::EncMsg2
        } else {
            TxState::EncMsg
        };

        if self.encrypt_fragment(timers, second).is_err() {
            self.fail_tx(timers);
            return;
        }
        // Sending invalidates any nonce we had issued to this peer
        self.clear_nonces(timers, self.tx.source, self.tx.destination);

        let route = TxRoute {
            source: self.tx.source,
            destination: self.tx.destination,
            options: self.tx.options,
        };
        if self.transport.send(&self.tx.frame, &route).is_err() {
            self.fail_tx(timers);
            return;
        }
        let kind = if second || self.tx.remaining() == 0 {
            SentFrame::FinalFragment
        } else {
            SentFrame::FirstFragment
        };
        let _ = self.tx.unacked.push(kind);

        if !second && self.tx.remaining() > 0 {
            // The fragment carried a nonce request for the second half
            timers.set(
                TX_SESSION_TIMER,
                self.config.nonce_request_timeout,
                Self::on_tx_timeout,
                0,
            );
            if let Some(lock) = self.tx_lock {
                self.power
                    .stay_awake(lock, self.config.nonce_request_timeout);
            }
        }
    }

    /// Build the encrypted frame for the payload bytes at the current
    /// offset into `self.tx.frame`
    fn encrypt_fragment<H: TimerHal>(
        &mut self,
        timers: &mut TimerScheduler<H, Self>,
        second: bool,
    ) -> Result<()> {
        let remaining = self.tx.remaining();
        let (chunk, more) = if remaining > MAX_FRAGMENT_PLAINTEXT {
            (MAX_FRAGMENT_PLAINTEXT, true)
        } else {
            (remaining, false)
        };

        // Fresh sender nonce; its first byte must not collide with a
        // nonce we have issued to this peer
        let mut iv = [0u8; AES_BLOCK_SIZE];
        loop {
            self.rng.fill_random(&mut iv[..NONCE_SIZE])?;
            if self
                .nonces
                .find(self.tx.source, self.tx.destination, Some(iv[0]))
                .is_none()
            {
                break;
            }
        }

        let peer_nonce = self
            .nonces
            .find(self.tx.destination, self.tx.source, None)
            .ok_or(Error::NonceNotFound)?;
        iv[NONCE_SIZE..].copy_from_slice(&peer_nonce);
        let receiver_nonce_id = peer_nonce[0];
        self.clear_nonces(timers, self.tx.destination, self.tx.source);

        let properties = if second {
            PROPERTIES_SEQUENCED
                | PROPERTIES_SECOND_FRAME
                | (self.tx.sequence & PROPERTIES_SEQUENCE_MASK)
        } else if more {
            PROPERTIES_SEQUENCED | (self.tx.sequence & PROPERTIES_SEQUENCE_MASK)
        } else {
            0
        };

        let mut ciphertext: Vec<u8, { MAX_FRAGMENT_PLAINTEXT + 1 }> = Vec::new();
        let _ = ciphertext.push(properties);
        let _ = ciphertext
            .extend_from_slice(&self.tx.payload[self.tx.offset..self.tx.offset + chunk]);
        crypto::ofb_apply(self.keys.enc(), &iv, &mut ciphertext);

        let command = if more {
            CMD_MESSAGE_ENCAP_NONCE_GET
        } else {
            CMD_MESSAGE_ENCAP
        };

        let auth: Vec<u8, AUTH_DATA_MAX> =
            frame::auth_data(command, self.tx.source, self.tx.destination, &ciphertext)?;
        let mac16 = crypto::cbc_mac(self.keys.auth(), &iv, &auth);
        let mut mac = [0u8; MAC_SIZE];
        mac.copy_from_slice(&mac16[..MAC_SIZE]);

        let mut sender_nonce = [0u8; NONCE_SIZE];
        sender_nonce.copy_from_slice(&iv[..NONCE_SIZE]);
        frame::write_encap(
            &mut self.tx.frame,
            command,
            &sender_nonce,
            &ciphertext,
            receiver_nonce_id,
            &mac,
        )?;

        self.tx.offset += chunk;
        Ok(())
    }

    /// Fail the transmit session from a running context (timer still armed)
    fn fail_tx<H: TimerHal>(&mut self, timers: &mut TimerScheduler<H, Self>) {
        timers.stop(TX_SESSION_TIMER);
        self.finish_tx(TxStatus::Fail);
    }

    fn complete_tx<H: TimerHal>(&mut self, timers: &mut TimerScheduler<H, Self>) {
        timers.stop(TX_SESSION_TIMER);
        self.finish_tx(TxStatus::Ok);
    }

    /// Tear the session down and report its outcome exactly once
    fn finish_tx(&mut self, status: TxStatus) {
        if let Some(lock) = self.tx_lock {
            self.power.cancel(lock);
        }
        let callback = self.tx.callback.take();
        self.tx.reset();
        if let Some(callback) = callback {
            callback.invoke(status);
        }
    }

    /// Nonce-request timer fired; the scheduler already removed it
    fn on_tx_timeout(&mut self, _token: u32) {
        self.finish_tx(TxStatus::Fail);
    }

    /// Nonce validity timer fired for a table slot
    fn on_nonce_timeout(&mut self, token: u32) {
        self.nonces.expire(token as usize);
    }

    fn clear_nonces<H: TimerHal>(
        &mut self,
        timers: &mut TimerScheduler<H, Self>,
        source: NodeId,
        destination: NodeId,
    ) {
        let mut freed: Vec<usize, NONCE_TABLE_SIZE> = Vec::new();
        self.nonces.clear_pair(source, destination, &mut freed);
        for slot in freed {
            timers.stop(nonce_timer(slot));
        }
    }
}
