//! Process-wide table of foreign invalidations.

use std::sync::atomic::{AtomicI64, Ordering};

use uuid::Uuid;

use crate::slot::SLOT_COUNT;
use crate::time::now_millis;

/// Slot-indexed "last invalidated" timestamps plus this process's instance id.
///
/// Only foreign updates advance a slot; local writes stamp their own cache
/// object instead. Each slot is an independent atomic, so invalidations never
/// block readers of other slots.
pub struct InvalidationClock {
    instance_id: Uuid,
    last_invalidated: Box<[AtomicI64]>,
}

impl InvalidationClock {
    /// Create a clock with a random instance id.
    pub fn new() -> Self {
        Self::with_instance_id(Uuid::new_v4())
    }

    pub fn with_instance_id(instance_id: Uuid) -> Self {
        let last_invalidated = (0..SLOT_COUNT).map(|_| AtomicI64::new(0)).collect();
        Self {
            instance_id,
            last_invalidated,
        }
    }

    #[inline]
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Record a foreign update of `slot` at the current time.
    pub fn invalidate(&self, slot: u16) {
        self.invalidate_at(slot, now_millis());
    }

    /// Record a foreign update of `slot` at `timestamp`. Never moves a slot
    /// backwards.
    pub fn invalidate_at(&self, slot: u16, timestamp: i64) {
        if let Some(cell) = self.last_invalidated.get(slot as usize) {
            cell.fetch_max(timestamp, Ordering::AcqRel);
            tracing::trace!(slot, timestamp, "slot invalidated");
        } else {
            tracing::warn!(slot, "ignoring invalidation for out-of-range slot");
        }
    }

    /// Millisecond timestamp of the last foreign update of `slot`, `0` if none.
    #[inline]
    pub fn last_invalidated(&self, slot: u16) -> i64 {
        self.last_invalidated
            .get(slot as usize)
            .map(|cell| cell.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// Whether a value refreshed at `timestamp` is still trustworthy.
    #[inline]
    pub fn is_fresh(&self, slot: u16, timestamp: i64) -> bool {
        timestamp != 0 && timestamp > self.last_invalidated(slot)
    }
}

impl Default for InvalidationClock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InvalidationClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationClock")
            .field("instance_id", &self.instance_id)
            .field("slots", &self.last_invalidated.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_zeroed() {
        let clock = InvalidationClock::new();
        assert_eq!(clock.last_invalidated(0), 0);
        assert_eq!(clock.last_invalidated((SLOT_COUNT - 1) as u16), 0);
        assert!(!clock.is_fresh(0, 0));
        assert!(clock.is_fresh(0, 1));
    }

    #[test]
    fn test_invalidate_marks_older_values_stale() {
        let clock = InvalidationClock::new();
        let refreshed = now_millis() - 1;
        assert!(clock.is_fresh(42, refreshed));

        clock.invalidate(42);
        assert!(!clock.is_fresh(42, refreshed));
        // Other slots untouched
        assert!(clock.is_fresh(43, refreshed));
    }

    #[test]
    fn test_never_moves_backwards() {
        let clock = InvalidationClock::new();
        clock.invalidate_at(7, 1_000);
        clock.invalidate_at(7, 500);
        assert_eq!(clock.last_invalidated(7), 1_000);
    }

    #[test]
    fn test_out_of_range_slot_is_ignored() {
        let clock = InvalidationClock::new();
        clock.invalidate(u16::MAX);
        assert_eq!(clock.last_invalidated(u16::MAX), 0);
    }
}
