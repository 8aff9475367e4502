use std::collections::VecDeque;

use super::types::{GameEvent, Retention};

#[derive(Debug, Clone)]
pub struct PendingEvent {
    pub timestamp_ms: u64,
    pub event: GameEvent,
}

impl PendingEvent {
    pub fn is_expired(&self, current_time_ms: u64) -> bool {
        match self.event.retention() {
            Retention::Expiring { ttl_ms } => {
                current_time_ms.saturating_sub(self.timestamp_ms) > ttl_ms
            }
            Retention::Transient | Retention::Persistent => false,
        }
    }
}

/// Bounded queue of outward events awaiting a front end.
#[derive(Debug)]
pub struct EventQueue {
    pending: VecDeque<PendingEvent>,
    max_pending: usize,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventQueue {
    pub fn new(max_pending: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(max_pending),
            max_pending: max_pending.max(1),
        }
    }

    pub fn push(&mut self, timestamp_ms: u64, event: GameEvent) {
        if self.pending.len() >= self.max_pending {
            self.evict(timestamp_ms);
        }

        self.pending.push_back(PendingEvent {
            timestamp_ms,
            event,
        });
    }

    /// Takes every queued event that has not expired, oldest first.
    pub fn drain(&mut self, current_time_ms: u64) -> Vec<GameEvent> {
        self.pending
            .drain(..)
            .filter(|e| !e.is_expired(current_time_ms))
            .map(|e| e.event)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Frees one slot: expired events first, then the oldest transient one,
    /// then the oldest non-persistent one, then the oldest of all.
    fn evict(&mut self, current_time_ms: u64) {
        self.pending.retain(|e| !e.is_expired(current_time_ms));
        if self.pending.len() < self.max_pending {
            return;
        }

        let victim = self
            .pending
            .iter()
            .position(|e| e.event.retention() == Retention::Transient)
            .or_else(|| {
                self.pending
                    .iter()
                    .position(|e| !e.event.retention().is_persistent())
            })
            .unwrap_or(0);
        self.pending.remove(victim);
    }
}
