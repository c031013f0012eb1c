// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Wavenet Labs Inc.

//! Receive-side reassembly sessions
//!
//! A session holds the first fragment of a segmented message until the
//! second arrives. Sessions expire after a TTL measured with wrapping tick
//! arithmetic; an expired session is reclaimed lazily the next time the
//! pool is scanned.

use heapless::Vec;

use wn_common::time::Ticks;
use wn_common::types::NodeId;

use crate::MAX_ENCRYPTED_MSG_SIZE;

/// Concurrent reassembly sessions
pub(crate) const MAX_RX_SESSIONS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RxState {
    /// Allocated for an incoming frame, nothing buffered yet
    New,
    /// First fragment buffered, waiting for the second
    FirstFrame,
    /// Free slot
    Done,
}

pub(crate) struct RxSession {
    pub source: NodeId,
    pub destination: NodeId,
    pub state: RxState,
    pub sequence: u8,
    pub started: Ticks,
    pub buf: Vec<u8, MAX_ENCRYPTED_MSG_SIZE>,
}

impl RxSession {
    fn idle() -> Self {
        Self {
            source: NodeId::new(0),
            destination: NodeId::new(0),
            state: RxState::Done,
            sequence: 0,
            started: Ticks::new(0),
            buf: Vec::new(),
        }
    }
}

pub(crate) struct RxPool {
    sessions: [RxSession; MAX_RX_SESSIONS],
    ttl: u32,
}

impl RxPool {
    pub fn new(ttl: u32) -> Self {
        Self {
            sessions: core::array::from_fn(|_| RxSession::idle()),
            ttl,
        }
    }

    pub fn reset(&mut self) {
        for session in &mut self.sessions {
            session.state = RxState::Done;
            session.buf.clear();
        }
    }

    fn expire_stale(&mut self, now: Ticks) {
        for session in &mut self.sessions {
            if session.state != RxState::Done && session.started.has_elapsed(now, self.ttl) {
                session.state = RxState::Done;
                session.buf.clear();
            }
        }
    }

    /// Find the live session for a node pair
    pub fn find(&mut self, source: NodeId, destination: NodeId, now: Ticks) -> Option<usize> {
        self.expire_stale(now);
        self.sessions.iter().position(|s| {
            s.state != RxState::Done && s.source == source && s.destination == destination
        })
    }

    /// Claim a free slot for a node pair
    pub fn allocate(&mut self, source: NodeId, destination: NodeId, now: Ticks) -> Option<usize> {
        self.expire_stale(now);
        let slot = self
            .sessions
            .iter()
            .position(|s| s.state == RxState::Done)?;
        self.sessions[slot] = RxSession {
            source,
            destination,
            state: RxState::New,
            sequence: 0,
            started: now,
            buf: Vec::new(),
        };
        Some(slot)
    }

    pub fn get(&mut self, slot: usize) -> &mut RxSession {
        &mut self.sessions[slot]
    }

    pub fn free(&mut self, slot: usize) {
        self.sessions[slot].state = RxState::Done;
        self.sessions[slot].buf.clear();
    }

    pub fn any_active(&mut self, now: Ticks) -> bool {
        self.expire_stale(now);
        self.sessions.iter().any(|s| s.state != RxState::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: NodeId = NodeId::new(1);
    const DST: NodeId = NodeId::new(2);
    const TTL: u32 = 10_000;

    #[test]
    fn session_survives_within_ttl() {
        let mut pool = RxPool::new(TTL);
        let slot = pool.allocate(SRC, DST, Ticks::new(0)).unwrap();
        pool.get(slot).state = RxState::FirstFrame;

        assert_eq!(pool.find(SRC, DST, Ticks::new(TTL - 1)), Some(slot));
    }

    #[test]
    fn session_expires_after_ttl() {
        let mut pool = RxPool::new(TTL);
        let slot = pool.allocate(SRC, DST, Ticks::new(0)).unwrap();
        pool.get(slot).state = RxState::FirstFrame;

        assert_eq!(pool.find(SRC, DST, Ticks::new(TTL)), None);
        assert!(!pool.any_active(Ticks::new(TTL)));
    }

    #[test]
    fn ttl_is_wraparound_safe() {
        let mut pool = RxPool::new(TTL);
        let start = Ticks::new(0xFFFF_FAFF);
        let slot = pool.allocate(SRC, DST, start).unwrap();
        pool.get(slot).state = RxState::FirstFrame;

        // Counter wrapped, only 0x100 ticks actually elapsed
        assert_eq!(pool.find(SRC, DST, Ticks::new(0xFFFF_FBFF)), Some(slot));
        // Wrapped far past the TTL
        assert_eq!(pool.find(SRC, DST, Ticks::new(0x3000)), None);
    }

    #[test]
    fn pool_exhaustion_and_free() {
        let mut pool = RxPool::new(TTL);
        let now = Ticks::new(0);
        let s0 = pool.allocate(NodeId::new(1), DST, now).unwrap();
        pool.get(s0).state = RxState::FirstFrame;
        let s1 = pool.allocate(NodeId::new(2), DST, now).unwrap();
        pool.get(s1).state = RxState::FirstFrame;

        assert_eq!(pool.allocate(NodeId::new(3), DST, now), None);
        pool.free(s0);
        assert!(pool.allocate(NodeId::new(3), DST, now).is_some());
    }
}
