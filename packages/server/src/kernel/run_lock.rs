//! Per-(provider, period) run exclusivity.
//!
//! The watermark read-then-advance in the extraction pipeline is not
//! transactionally isolated, so two concurrent runs sharing a key would
//! race on the stored timestamp. The registry guarantees a single run
//! per key within this process; scheduling exclusivity covers the
//! multi-process case.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use metering::BillingPeriod;
use uuid::Uuid;

type RunKey = (Uuid, i32, u32);

/// In-process registry of extraction runs currently executing.
#[derive(Default)]
pub struct RunLockRegistry {
    held: Mutex<HashSet<RunKey>>,
}

impl RunLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the key for one run. Returns `None` while another run
    /// holds it; the returned guard releases the key on drop.
    pub fn try_acquire(
        self: &Arc<Self>,
        provider_id: Uuid,
        period: BillingPeriod,
    ) -> Option<RunLockGuard> {
        let key = (provider_id, period.year, period.month);
        let mut held = self.held.lock().unwrap();
        if !held.insert(key) {
            return None;
        }
        Some(RunLockGuard {
            registry: Arc::clone(self),
            key,
        })
    }
}

/// Releases its run key when dropped.
pub struct RunLockGuard {
    registry: Arc<RunLockRegistry>,
    key: RunKey,
}

impl Drop for RunLockGuard {
    fn drop(&mut self) {
        self.registry.held.lock().unwrap().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_drop() {
        let registry = Arc::new(RunLockRegistry::new());
        let provider_id = Uuid::new_v4();
        let period = BillingPeriod { year: 2024, month: 3 };

        let guard = registry.try_acquire(provider_id, period);
        assert!(guard.is_some());
        assert!(registry.try_acquire(provider_id, period).is_none());

        drop(guard);
        assert!(registry.try_acquire(provider_id, period).is_some());
    }

    #[test]
    fn test_distinct_keys_do_not_contend() {
        let registry = Arc::new(RunLockRegistry::new());
        let provider_id = Uuid::new_v4();
        let march = BillingPeriod { year: 2024, month: 3 };
        let april = BillingPeriod { year: 2024, month: 4 };

        let _first = registry.try_acquire(provider_id, march).unwrap();
        assert!(registry.try_acquire(provider_id, april).is_some());
        assert!(registry.try_acquire(Uuid::new_v4(), march).is_some());
    }
}
