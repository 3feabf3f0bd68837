use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::instrument;

use crate::{Error, JobStatus, StatusStore};

/// Default lifetime of a stored status.
const KEY_EXPIRATION: Duration = Duration::from_secs(1800);

#[derive(Clone)]
pub struct StatusService {
    store: Arc<dyn StatusStore>,
    key_expiration: Duration,
}

impl StatusService {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self {
            store,
            key_expiration: KEY_EXPIRATION,
        }
    }

    pub fn with_key_expiration(mut self, expiration: Duration) -> Self {
        self.key_expiration = expiration;
        self
    }

    /// Missing and unreadable statuses are [`JobStatus::Unknown`].
    #[instrument(name = "get_job_status", skip(self))]
    pub async fn get(&self, id: &str) -> Result<JobStatus, Error> {
        Ok(self.store.get(id).await?.unwrap_or_default())
    }

    #[instrument(name = "set_job_status", skip(self))]
    pub async fn set(&self, id: &str, status: JobStatus) -> Result<(), Error> {
        self.store.set(id, status, self.key_expiration).await
    }

    /// Body returned to a client polling the job. A successful job has an empty body.
    pub async fn response_for(&self, id: &str) -> Result<String, Error> {
        Ok(Self::response(self.get(id).await?))
    }

    pub fn response(status: JobStatus) -> String {
        match status {
            JobStatus::Success => String::new(),
            status => json!({ "status": status.to_string() }).to_string(),
        }
    }
}
