use std::sync::atomic::{AtomicU64, Ordering};

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from process memory, including confirmed-absent keys.
    pub local_hits: u64,
    /// Reads answered by the shared cache.
    pub shared_hits: u64,
    /// Reads answered by the document store.
    pub store_hits: u64,
    /// Reads that found no value in any tier.
    pub misses: u64,
    /// Remote values that failed to decode and were treated as absent.
    pub decode_failures: u64,
    /// Writes fully propagated to their remote tiers.
    pub propagated: u64,
    /// Writes that failed at some propagation stage.
    pub propagation_failures: u64,
    /// Foreign sync messages applied to the invalidation clock.
    pub invalidations: u64,
    /// Sync messages from this instance, ignored.
    pub self_echoes: u64,
}

impl CacheStats {
    /// Calculate hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.local_hits + self.shared_hits + self.store_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    local_hits: AtomicU64,
    shared_hits: AtomicU64,
    store_hits: AtomicU64,
    misses: AtomicU64,
    decode_failures: AtomicU64,
    propagated: AtomicU64,
    propagation_failures: AtomicU64,
    invalidations: AtomicU64,
    self_echoes: AtomicU64,
}

macro_rules! recorders {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            #[inline]
            pub(crate) fn $name(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl StatsRecorder {
    recorders! {
        local_hit => local_hits,
        shared_hit => shared_hits,
        store_hit => store_hits,
        miss => misses,
        decode_failure => decode_failures,
        propagated => propagated,
        propagation_failure => propagation_failures,
        invalidation => invalidations,
        self_echo => self_echoes,
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            local_hits: self.local_hits.load(Ordering::Relaxed),
            shared_hits: self.shared_hits.load(Ordering::Relaxed),
            store_hits: self.store_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            propagated: self.propagated.load(Ordering::Relaxed),
            propagation_failures: self.propagation_failures.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            self_echoes: self.self_echoes.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let recorder = StatsRecorder::default();
        assert_eq!(recorder.snapshot().hit_rate(), 0.0);

        recorder.local_hit();
        recorder.shared_hit();
        recorder.store_hit();
        recorder.miss();
        let stats = recorder.snapshot();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 75.0);
    }
}
