//! Content-addressed object cache
//!
//! Each hash owns one slot. The first task to ask for a hash fetches it; every
//! concurrent request for the same hash waits on that slot instead of issuing
//! a second remote call. Values never change once stored, so eviction only
//! costs a refetch.

use crate::error::FsError;
use crate::types::ObjectId;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Single-flight map from object id to an immutable value
pub struct SingleFlight<V> {
    inner: Mutex<Slots<V>>,
    capacity: Option<usize>,
}

struct Slots<V> {
    slots: HashMap<ObjectId, Arc<OnceCell<Arc<V>>>>,
    /// Insertion order, oldest first
    order: VecDeque<ObjectId>,
}

impl<V> SingleFlight<V> {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(Slots {
                slots: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity,
        }
    }

    /// Get or create the slot for an id
    fn slot(&self, id: &ObjectId) -> Arc<OnceCell<Arc<V>>> {
        let mut inner = self.inner.lock();
        if let Some(slot) = inner.slots.get(id) {
            return slot.clone();
        }

        let slot = Arc::new(OnceCell::new());
        inner.slots.insert(id.clone(), slot.clone());
        inner.order.push_back(id.clone());

        if let Some(capacity) = self.capacity {
            while inner.slots.len() > capacity.max(1) {
                match inner.order.pop_front() {
                    Some(oldest) => {
                        inner.slots.remove(&oldest);
                    }
                    None => break,
                }
            }
        }

        slot
    }

    /// Return the cached value, running `fetch` only if no value exists yet
    ///
    /// A failed fetch leaves the slot empty so a later call can retry.
    pub async fn get_or_fetch<F, Fut>(&self, id: &ObjectId, fetch: F) -> Result<Arc<V>, FsError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, FsError>>,
    {
        let slot = self.slot(id);
        let value = slot
            .get_or_try_init(|| async move { fetch().await.map(Arc::new) })
            .await?;
        Ok(value.clone())
    }

    /// Store a value whose content is already known
    pub fn insert(&self, id: &ObjectId, value: V) {
        let slot = self.slot(id);
        // An existing value for the same hash is interchangeable with this one.
        let _ = slot.set(Arc::new(value));
    }

    /// Cached value, without fetching
    pub fn get(&self, id: &ObjectId) -> Option<Arc<V>> {
        let inner = self.inner.lock();
        inner.slots.get(id).and_then(|slot| slot.get().cloned())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
