// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Wavenet Labs Inc.

//! Sorted-list timer scheduler
//!
//! Pending timers live in a fixed-capacity list ordered soonest-first.
//! Each entry stores its remaining tick count relative to the scheduler's
//! last reconciliation point; every mutation first folds the ticks elapsed
//! since then into all pending entries, so remaining counts stay correct
//! across counter wraparound.

use heapless::Vec;
use wn_common::time::Ticks;

use crate::hal::TimerHal;

/// Maximum number of concurrently pending logical timers
pub const MAX_PENDING_TIMERS: usize = 16;

/// Callback invoked in interrupt context when a timer fires
///
/// Receives the shared context and the token the timer was armed with.
pub type TimerCallback<C> = fn(&mut C, u32);

/// Stable identifier of a logical timer
///
/// Callers assign ids; re-arming an id that is already pending replaces
/// the existing deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u16);

impl TimerId {
    /// Create a timer identifier
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }
}

struct Entry<C> {
    id: TimerId,
    remaining: u32,
    callback: TimerCallback<C>,
    token: u32,
}

/// Multiplexes logical one-shot timers onto one hardware timer
///
/// `C` is the context type handed to callbacks, typically the subsystem
/// that owns the timers. The scheduler itself is not passed to callbacks;
/// a fired timer is already removed, and anything a callback needs to
/// re-arm happens on the next explicit `set`.
pub struct TimerScheduler<H: TimerHal, C> {
    hal: H,
    pending: Vec<Entry<C>, MAX_PENDING_TIMERS>,
    last_ticks: Ticks,
}

impl<H: TimerHal, C> TimerScheduler<H, C> {
    /// Create a scheduler over the given hardware timer
    pub fn new(hal: H) -> Self {
        let last_ticks = hal.now();
        Self {
            hal,
            pending: Vec::new(),
            last_ticks,
        }
    }

    /// Discard all pending timers and resynchronize with the tick counter
    pub fn init(&mut self) {
        self.pending.clear();
        self.last_ticks = self.hal.now();
        self.hal.stop();
    }

    /// Current tick counter value
    pub fn now(&self) -> Ticks {
        self.hal.now()
    }

    /// Access the hardware timer
    pub fn hal(&self) -> &H {
        &self.hal
    }

    /// Mutable access to the hardware timer
    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    /// Arm (or re-arm) timer `id` to fire after `ticks` ticks
    ///
    /// If `id` is already pending its previous deadline is discarded
    /// first, so repeated `set` calls never duplicate a timer. Ties fire
    /// in the order they were armed. If the pending list is full the
    /// request is dropped; capacity must be sized so this cannot happen.
    pub fn set(&mut self, id: TimerId, ticks: u32, callback: TimerCallback<C>, token: u32) {
        self.remove(id);
        self.reconcile();

        let entry = Entry {
            id,
            remaining: ticks,
            callback,
            token,
        };
        let pos = self
            .pending
            .iter()
            .position(|e| e.remaining > ticks)
            .unwrap_or(self.pending.len());
        if self.pending.insert(pos, entry).is_err() {
            return;
        }

        self.reprogram();
    }

    /// Cancel timer `id` if pending
    pub fn stop(&mut self, id: TimerId) {
        if self.remove(id) {
            self.reconcile();
            self.reprogram();
        }
    }

    /// Check whether timer `id` is not pending
    ///
    /// True both for timers that have fired and timers never armed.
    #[must_use]
    pub fn expired(&self, id: TimerId) -> bool {
        !self.pending.iter().any(|e| e.id == id)
    }

    /// Remaining ticks of a pending timer, as of the last reconciliation
    #[must_use]
    pub fn remaining(&self, id: TimerId) -> Option<u32> {
        self.pending
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.remaining)
    }

    /// Number of pending timers
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Service a hardware timer interrupt
    ///
    /// Pops the earliest pending timer and invokes its callback, then
    /// drains any further timers that are also due before re-arming the
    /// hardware with the next deadline.
    pub fn on_hardware_fire(&mut self, ctx: &mut C) {
        if self.pending.is_empty() {
            // Spurious interrupt
            self.hal.stop();
            return;
        }

        let entry = self.pending.remove(0);
        (entry.callback)(ctx, entry.token);

        self.reconcile();
        while self
            .pending
            .first()
            .map_or(false, |head| head.remaining == 0)
        {
            let entry = self.pending.remove(0);
            (entry.callback)(ctx, entry.token);
        }

        self.reprogram();
    }

    fn remove(&mut self, id: TimerId) -> bool {
        if let Some(pos) = self.pending.iter().position(|e| e.id == id) {
            self.pending.remove(pos);
            true
        } else {
            false
        }
    }

    /// Fold the ticks elapsed since the last reconciliation into every
    /// pending entry. Wrapping subtraction keeps this correct across the
    /// counter wrap.
    fn reconcile(&mut self) {
        let now = self.hal.now();
        let elapsed = self.last_ticks.elapsed(now);
        self.last_ticks = now;
        for entry in &mut self.pending {
            entry.remaining = entry.remaining.saturating_sub(elapsed);
        }
    }

    /// Program the hardware with the earliest deadline, or disarm it.
    /// An already-due entry is given one tick so it fires from interrupt
    /// context rather than synchronously.
    fn reprogram(&mut self) {
        match self.pending.first() {
            Some(head) => self.hal.start(head.remaining.max(1)),
            None => self.hal.stop(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestClock {
        now: u32,
        armed: Option<u32>,
        running: bool,
    }

    impl TestClock {
        const fn at(now: u32) -> Self {
            Self {
                now,
                armed: None,
                running: false,
            }
        }
    }

    impl TimerHal for TestClock {
        fn now(&self) -> Ticks {
            Ticks::new(self.now)
        }

        fn start(&mut self, ticks: u32) {
            self.armed = Some(ticks);
            self.running = true;
        }

        fn stop(&mut self) {
            self.running = false;
        }
    }

    #[derive(Default)]
    struct Fired {
        order: Vec<u32, 8>,
    }

    fn record(ctx: &mut Fired, token: u32) {
        let _ = ctx.order.push(token);
    }

    fn advance(sched: &mut TimerScheduler<TestClock, Fired>, ticks: u32) {
        sched.hal_mut().now = sched.hal_mut().now.wrapping_add(ticks);
    }

    #[test]
    fn fires_in_deadline_order() {
        let mut sched = TimerScheduler::new(TestClock::at(0));
        let mut ctx = Fired::default();

        sched.set(TimerId::new(1), 30, record, 30);
        sched.set(TimerId::new(2), 10, record, 10);
        sched.set(TimerId::new(3), 20, record, 20);
        assert_eq!(sched.hal().armed, Some(10));

        advance(&mut sched, 10);
        sched.on_hardware_fire(&mut ctx);
        assert_eq!(sched.hal().armed, Some(10));

        advance(&mut sched, 10);
        sched.on_hardware_fire(&mut ctx);
        advance(&mut sched, 10);
        sched.on_hardware_fire(&mut ctx);

        assert_eq!(ctx.order.as_slice(), &[10, 20, 30]);
        assert!(!sched.hal().running);
    }

    #[test]
    fn equal_deadlines_fire_in_arming_order() {
        let mut sched = TimerScheduler::new(TestClock::at(0));
        let mut ctx = Fired::default();

        sched.set(TimerId::new(1), 10, record, 1);
        sched.set(TimerId::new(2), 10, record, 2);
        sched.set(TimerId::new(3), 10, record, 3);

        advance(&mut sched, 10);
        // One interrupt drains all simultaneously-due timers
        sched.on_hardware_fire(&mut ctx);

        assert_eq!(ctx.order.as_slice(), &[1, 2, 3]);
        assert_eq!(sched.pending_count(), 0);
    }

    #[test]
    fn survives_tick_counter_wrap() {
        let mut sched = TimerScheduler::new(TestClock::at(0xFFFF_FF00));
        let mut ctx = Fired::default();

        sched.set(TimerId::new(1), 0x200, record, 1);
        sched.set(TimerId::new(2), 0x400, record, 2);

        // Counter wraps: 0xFFFFFF00 + 0x200 = 0x100
        advance(&mut sched, 0x200);
        sched.on_hardware_fire(&mut ctx);

        assert_eq!(ctx.order.as_slice(), &[1]);
        assert_eq!(sched.remaining(TimerId::new(2)), Some(0x200));
    }

    #[test]
    fn rearm_replaces_pending_deadline() {
        let mut sched = TimerScheduler::new(TestClock::at(0));
        let mut ctx = Fired::default();

        sched.set(TimerId::new(7), 100, record, 7);
        sched.set(TimerId::new(7), 50, record, 7);
        assert_eq!(sched.pending_count(), 1);
        assert_eq!(sched.remaining(TimerId::new(7)), Some(50));

        advance(&mut sched, 50);
        sched.on_hardware_fire(&mut ctx);
        assert_eq!(ctx.order.as_slice(), &[7]);
        assert!(sched.expired(TimerId::new(7)));
    }

    #[test]
    fn stop_cancels_pending_timer() {
        let mut sched = TimerScheduler::new(TestClock::at(0));

        sched.set(TimerId::new(1), 100, record, 1);
        assert!(!sched.expired(TimerId::new(1)));

        sched.stop(TimerId::new(1));
        assert!(sched.expired(TimerId::new(1)));
        assert!(!sched.hal().running);

        // Stopping a timer that is not pending is a no-op
        sched.stop(TimerId::new(1));
    }

    #[test]
    fn never_armed_counts_as_expired() {
        let sched: TimerScheduler<TestClock, Fired> = TimerScheduler::new(TestClock::at(0));
        assert!(sched.expired(TimerId::new(42)));
    }

    #[test]
    fn set_reconciles_other_entries() {
        let mut sched: TimerScheduler<TestClock, Fired> = TimerScheduler::new(TestClock::at(0));

        sched.set(TimerId::new(1), 100, record, 1);
        advance(&mut sched, 40);
        sched.set(TimerId::new(2), 30, record, 2);

        assert_eq!(sched.remaining(TimerId::new(1)), Some(60));
        assert_eq!(sched.remaining(TimerId::new(2)), Some(30));
        assert_eq!(sched.hal().armed, Some(30));
    }

    #[test]
    fn overflowing_capacity_drops_new_timer() {
        let mut sched: TimerScheduler<TestClock, Fired> = TimerScheduler::new(TestClock::at(0));

        for i in 0..MAX_PENDING_TIMERS {
            sched.set(TimerId::new(i as u16), 100 + i as u32, record, i as u32);
        }
        assert_eq!(sched.pending_count(), MAX_PENDING_TIMERS);

        sched.set(TimerId::new(999), 5, record, 999);
        assert!(sched.expired(TimerId::new(999)));
        assert_eq!(sched.pending_count(), MAX_PENDING_TIMERS);
    }

    #[test]
    fn spurious_interrupt_disarms_hardware() {
        let mut sched = TimerScheduler::new(TestClock::at(0));
        let mut ctx = Fired::default();

        sched.hal_mut().running = true;
        sched.on_hardware_fire(&mut ctx);
        assert!(ctx.order.is_empty());
        assert!(!sched.hal().running);
    }
}
