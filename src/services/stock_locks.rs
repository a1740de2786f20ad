use crate::errors::ServiceError;
use dashmap::DashMap;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::warn;
use uuid::Uuid;

/// `(product_id, warehouse_id)`
pub type StockKey = (Uuid, Uuid);

/// Idle entries are swept once the registry grows past this size.
const PRUNE_THRESHOLD: usize = 4_096;

/// In-process single-writer registry for stock keys.
///
/// Keys are always taken in ascending order, so two operations touching the
/// same pair of keys from opposite directions cannot deadlock.
pub struct StockLocks {
    locks: DashMap<StockKey, Arc<Mutex<()>>>,
    timeout: Duration,
}

/// Holds every acquired key until dropped.
#[must_use = "the keys are released as soon as the guard is dropped"]
pub struct StockGuard {
    keys: Vec<StockKey>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl StockGuard {
    pub fn keys(&self) -> &[StockKey] {
        &self.keys
    }
}

impl StockLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            timeout,
        }
    }

    /// Acquires all `keys` (deduplicated, ascending) or fails with a retryable
    /// `ServiceUnavailable` once the timeout elapses.
    pub async fn acquire(&self, keys: &[StockKey]) -> Result<StockGuard, ServiceError> {
        let mut ordered = keys.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        if self.locks.len() > PRUNE_THRESHOLD {
            self.prune_idle();
        }

        let deadline = Instant::now() + self.timeout;
        let mut guards = Vec::with_capacity(ordered.len());
        for key in &ordered {
            let mutex = self
                .locks
                .entry(*key)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone();

            match tokio::time::timeout_at(deadline, mutex.lock_owned()).await {
                Ok(guard) => guards.push(guard),
                Err(_) => {
                    counter!("inventory.stock_lock.timeouts", 1);
                    warn!(product_id = %key.0, warehouse_id = %key.1, "timed out waiting for stock lock");
                    return Err(ServiceError::ServiceUnavailable(
                        "stock record is busy, retry the request".to_string(),
                    ));
                }
            }
        }

        Ok(StockGuard {
            keys: ordered,
            _guards: guards,
        })
    }

    /// Drops registry entries nobody holds or waits on.
    pub fn prune_idle(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
