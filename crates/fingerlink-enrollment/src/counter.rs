use fingerlink_core::constants::ENROLLED_COUNT_KEY;
use fingerlink_storage::{DurableStore, StorageResult};
use tracing::{debug, info};

/// Number of templates enrolled on this device, kept in a [`DurableStore`].
///
/// Every change is written through before it becomes visible: if the write
/// fails, [`get`](Self::get) still returns the previous value.
#[derive(Debug)]
pub struct EnrolledCounter<D: DurableStore> {
    store: D,
    count: u64,
}

impl<D: DurableStore> EnrolledCounter<D> {
    /// Load the persisted count, starting from 0 if none was stored.
    pub async fn load(store: D) -> StorageResult<Self> {
        let count = store.get_uint(ENROLLED_COUNT_KEY).await?.unwrap_or(0);
        debug!(count, "Loaded enrolled count");
        Ok(Self { store, count })
    }

    pub fn get(&self) -> u64 {
        self.count
    }

    /// Add one and persist; returns the new count.
    pub async fn increment(&mut self) -> StorageResult<u64> {
        let next = self.count.saturating_add(1);
        self.store.put_uint(ENROLLED_COUNT_KEY, next).await?;
        self.count = next;
        debug!(count = next, "Enrolled count incremented");
        Ok(next)
    }

    /// Persist a count of 0.
    pub async fn reset(&mut self) -> StorageResult<()> {
        self.store.put_uint(ENROLLED_COUNT_KEY, 0).await?;
        info!(previous = self.count, "Enrolled count reset");
        self.count = 0;
        Ok(())
    }

    pub fn store(&self) -> &D {
        &self.store
    }
}
