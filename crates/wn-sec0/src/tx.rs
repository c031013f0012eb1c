// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Wavenet Labs Inc.

//! Transmit session state
//!
//! At most one encrypted transmit session exists at a time. The session
//! walks a fixed handshake: request a nonce, encrypt and send a fragment
//! when the report arrives, and repeat once more if the payload needed a
//! second fragment.

use heapless::Vec;

use wn_common::types::{NodeId, TxOptions};

use crate::frame::{MAX_FRAGMENT_PLAINTEXT, MAX_TX_FRAME};
use crate::traits::TransmitCallback;

/// Largest payload `send_data` accepts (two fragments)
pub const MAX_TX_PAYLOAD: usize = 2 * MAX_FRAGMENT_PLAINTEXT;

/// Which outgoing frame a pending radio completion belongs to
///
/// The transport reports completions in the order it accepted frames, so
/// the session keeps a queue of owed completions; a completion arriving
/// after the next fragment already went out still belongs to the earlier
/// frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SentFrame {
    /// The 2-byte nonce get
    NonceGet,
    /// First fragment of a segmented payload
    FirstFragment,
    /// Final fragment (second of two, or a single-fragment payload)
    FinalFragment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TxState {
    /// No session
    Idle,
    /// Nonce get handed to the transport
    NonceGet,
    /// Nonce get confirmed on air, waiting for the nonce report
    NonceGetSent,
    /// First encrypted fragment handed to the transport
    EncMsg,
    /// First fragment confirmed, waiting for the next nonce report
    EncMsgSent,
    /// Second encrypted fragment handed to the transport
    EncMsg2,
}

pub(crate) struct TxSession {
    pub state: TxState,
    pub source: NodeId,
    pub destination: NodeId,
    pub options: TxOptions,
    pub payload: Vec<u8, MAX_TX_PAYLOAD>,
    pub offset: usize,
    pub sequence: u8,
    pub frame: Vec<u8, MAX_TX_FRAME>,
    /// Completions owed by the transport, oldest first
    pub unacked: Vec<SentFrame, 3>,
    pub callback: Option<TransmitCallback>,
}

impl TxSession {
    pub fn idle() -> Self {
        Self {
            state: TxState::Idle,
            source: NodeId::new(0),
            destination: NodeId::new(0),
            options: TxOptions::new(0),
            payload: Vec::new(),
            offset: 0,
            sequence: 0,
            frame: Vec::new(),
            unacked: Vec::new(),
            callback: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state != TxState::Idle
    }

    /// Payload bytes not yet covered by a sent fragment
    pub fn remaining(&self) -> usize {
        self.payload.len() - self.offset
    }

    /// Return to idle; the caller takes the callback first
    pub fn reset(&mut self) {
        *self = Self::idle();
    }
}
