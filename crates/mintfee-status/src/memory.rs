use std::time::Duration;

use async_trait::async_trait;
use mintfee_common::cache::ExpirableCache;

use crate::{Error, JobStatus, StatusStore};

const CAPACITY: u64 = 100_000;

/// Process local status store, entries are bounded in number and expire individually.
#[derive(Clone)]
pub struct MemoryStatusStore {
    statuses: ExpirableCache<String, JobStatus>,
}

impl Default for MemoryStatusStore {
    fn default() -> Self {
        Self::new(CAPACITY)
    }
}

impl MemoryStatusStore {
    pub fn new(capacity: u64) -> Self {
        Self {
            statuses: ExpirableCache::new(capacity),
        }
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn get(&self, id: &str) -> Result<Option<JobStatus>, Error> {
        Ok(self.statuses.get(&id.to_string()))
    }

    async fn set(&self, id: &str, status: JobStatus, expiry: Duration) -> Result<(), Error> {
        self.statuses.insert(id.to_string(), status, expiry);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time;

    use crate::memory::MemoryStatusStore;
    use crate::{JobStatus, StatusStore};

    #[tokio::test]
    async fn status_is_stored() {
        let store = MemoryStatusStore::default();

        store.set("job", JobStatus::InProgress, Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.get("job").await.unwrap(), Some(JobStatus::InProgress));
        assert_eq!(store.get("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn status_expires() {
        let store = MemoryStatusStore::default();

        store.set("job", JobStatus::Queued, Duration::from_millis(10)).await.unwrap();
        time::sleep(Duration::from_millis(20)).await;

        assert_eq!(store.get("job").await.unwrap(), None);
    }
}
