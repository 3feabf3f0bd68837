use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use serde::{Deserialize, Serialize};

use crate::{Error, JobStatus, StatusStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfiguration {
    pub endpoint: String,
}

/// Statuses are stored under `s:<id>` as their integer code.
#[derive(Clone)]
pub struct RedisStatusStore {
    redis: Pool,
}

impl RedisStatusStore {
    pub fn new(configuration: &RedisConfiguration) -> Result<Self, Error> {
        let redis = Config::from_url(&configuration.endpoint)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::Configuration(e.to_string()))?;

        Ok(Self { redis })
    }

    fn key(id: &str) -> String {
        format!("s:{}", id)
    }

    async fn get_redis_connection(&self) -> Result<Connection, Error> {
        let result = self.redis.get().await?;

        Ok(result)
    }
}

#[async_trait]
impl StatusStore for RedisStatusStore {
    async fn get(&self, id: &str) -> Result<Option<JobStatus>, Error> {
        let mut connection = self.get_redis_connection().await?;
        let value: Option<String> = connection.get(Self::key(id)).await?;

        Ok(value.map(|x| JobStatus::from_value(&x)))
    }

    async fn set(&self, id: &str, status: JobStatus, expiry: Duration) -> Result<(), Error> {
        let mut connection = self.get_redis_connection().await?;
        let _: () = connection.set_ex(Self::key(id), status.code(), expiry.as_secs().max(1)).await?;

        Ok(())
    }
}
