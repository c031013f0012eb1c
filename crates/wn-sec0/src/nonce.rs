// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Wavenet Labs Inc.

//! Single-use nonce table
//!
//! Every outstanding nonce is scoped to an ordered (source, destination)
//! node pair and identified on the wire by its first byte. A nonce leaves
//! the table when it is consumed, when its pair is cleared, or when its
//! validity timer expires.

use heapless::Vec;

use wn_common::constants::NONCE_SIZE;
use wn_common::types::NodeId;

/// Table capacity: enough for several interleaved exchanges
pub(crate) const NONCE_TABLE_SIZE: usize = 15;

#[derive(Clone, Copy)]
struct Entry {
    active: bool,
    source: NodeId,
    destination: NodeId,
    value: [u8; NONCE_SIZE],
}

impl Entry {
    const fn empty() -> Self {
        Self {
            active: false,
            source: NodeId::new(0),
            destination: NodeId::new(0),
            value: [0; NONCE_SIZE],
        }
    }
}

pub(crate) struct NonceTable {
    entries: [Entry; NONCE_TABLE_SIZE],
}

impl NonceTable {
    pub const fn new() -> Self {
        Self {
            entries: [Entry::empty(); NONCE_TABLE_SIZE],
        }
    }

    pub fn reset(&mut self) {
        self.entries = [Entry::empty(); NONCE_TABLE_SIZE];
    }

    /// Store a nonce for the pair, returning the slot index used
    ///
    /// Returns `None` when the table is full.
    pub fn register(
        &mut self,
        source: NodeId,
        destination: NodeId,
        value: [u8; NONCE_SIZE],
    ) -> Option<usize> {
        let slot = self.entries.iter().position(|e| !e.active)?;
        self.entries[slot] = Entry {
            active: true,
            source,
            destination,
            value,
        };
        Some(slot)
    }

    /// Look up an active nonce for the pair
    ///
    /// `id` filters by the nonce's first byte (its wire identifier);
    /// `None` matches any nonce for the pair.
    pub fn find(
        &self,
        source: NodeId,
        destination: NodeId,
        id: Option<u8>,
    ) -> Option<[u8; NONCE_SIZE]> {
        self.entries
            .iter()
            .find(|e| {
                e.active
                    && e.source == source
                    && e.destination == destination
                    && id.map_or(true, |first| e.value[0] == first)
            })
            .map(|e| e.value)
    }

    /// Deactivate every nonce for the pair, collecting freed slot indices
    /// so the caller can stop their validity timers
    pub fn clear_pair(
        &mut self,
        source: NodeId,
        destination: NodeId,
        freed: &mut Vec<usize, NONCE_TABLE_SIZE>,
    ) {
        for (slot, entry) in self.entries.iter_mut().enumerate() {
            if entry.active && entry.source == source && entry.destination == destination {
                *entry = Entry::empty();
                let _ = freed.push(slot);
            }
        }
    }

    /// Deactivate a slot whose validity timer fired
    pub fn expire(&mut self, slot: usize) {
        if slot < NONCE_TABLE_SIZE {
            self.entries[slot] = Entry::empty();
        }
    }

    pub fn any_active(&self) -> bool {
        self.entries.iter().any(|e| e.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: NodeId = NodeId::new(1);
    const B: NodeId = NodeId::new(2);
    const C: NodeId = NodeId::new(3);

    #[test]
    fn register_and_find_by_id() {
        let mut table = NonceTable::new();
        table.register(A, B, [0x10; NONCE_SIZE]).unwrap();
        table.register(A, B, [0x20; NONCE_SIZE]).unwrap();

        assert_eq!(table.find(A, B, Some(0x20)), Some([0x20; NONCE_SIZE]));
        assert_eq!(table.find(A, B, Some(0x30)), None);
        assert!(table.find(A, B, None).is_some());
        // Scoped to the ordered pair
        assert_eq!(table.find(B, A, None), None);
        assert_eq!(table.find(A, C, None), None);
    }

    #[test]
    fn clear_pair_collects_slots() {
        let mut table = NonceTable::new();
        let s0 = table.register(A, B, [0x10; NONCE_SIZE]).unwrap();
        table.register(A, C, [0x20; NONCE_SIZE]).unwrap();
        let s2 = table.register(A, B, [0x30; NONCE_SIZE]).unwrap();

        let mut freed: Vec<usize, NONCE_TABLE_SIZE> = Vec::new();
        table.clear_pair(A, B, &mut freed);
        assert_eq!(freed.as_slice(), &[s0, s2]);
        assert_eq!(table.find(A, B, None), None);
        assert!(table.find(A, C, None).is_some());
    }

    #[test]
    fn expire_frees_slot() {
        let mut table = NonceTable::new();
        let slot = table.register(A, B, [0x10; NONCE_SIZE]).unwrap();
        assert!(table.any_active());
        table.expire(slot);
        assert!(!table.any_active());
        assert_eq!(table.find(A, B, None), None);
    }

    #[test]
    fn full_table_rejects() {
        let mut table = NonceTable::new();
        for i in 0..NONCE_TABLE_SIZE {
            assert!(table.register(A, B, [i as u8; NONCE_SIZE]).is_some());
        }
        assert_eq!(table.register(A, B, [0xFF; NONCE_SIZE]), None);
        table.expire(7);
        assert_eq!(table.register(A, B, [0xFF; NONCE_SIZE]), Some(7));
    }
}
