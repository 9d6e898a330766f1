//! Client-local timers
//!
//! Timers never reach the daemon. The event loop sleeps on its inbound queue
//! until the earliest deadline, then fires every expired timer in deadline
//! order (ties in scheduling order) before reading the next frame.

use std::collections::BTreeMap;
use std::time::Instant;

use flicd_core::{Registry, RegistryFull};

use crate::callbacks::TimerCallback;

/// Position of a timer in the deadline order
type Slot = (Instant, u64);

struct Timer {
    slot: Slot,
    callback: TimerCallback,
}

/// Pending timers keyed by id and by deadline
#[derive(Default)]
pub(crate) struct TimerQueue {
    timers: Registry<Timer>,
    deadlines: BTreeMap<Slot, u32>,
    seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `callback` at `deadline`, returning the timer id
    pub fn schedule(
        &mut self,
        deadline: Instant,
        callback: TimerCallback,
    ) -> Result<u32, RegistryFull> {
        let slot = (deadline, self.seq);
        let id = self.timers.insert_with(|_| Timer { slot, callback })?;
        self.seq += 1;
        self.deadlines.insert(slot, id);
        Ok(id)
    }

    /// Drop a timer before it fires; false if it already fired or never existed
    pub fn cancel(&mut self, id: u32) -> bool {
        match self.timers.remove(id) {
            Some(timer) => {
                self.deadlines.remove(&timer.slot);
                true
            }
            None => false,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Take the earliest timer due at `now`, freeing its id
    pub fn pop_expired(&mut self, now: Instant) -> Option<(u32, TimerCallback)> {
        let (&slot, &id) = self.deadlines.iter().next()?;
        if slot.0 > now {
            return None;
        }
        self.deadlines.remove(&slot);
        self.timers.remove(id).map(|timer| (id, timer.callback))
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn clear(&mut self) {
        self.timers.drain();
        self.deadlines.clear();
    }
}
