use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::RedisError;
use deadpool_redis::PoolError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod memory;
pub mod redis;
mod service;

pub use service::StatusService;

use crate::memory::MemoryStatusStore;
use crate::redis::{RedisConfiguration, RedisStatusStore};

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Redis(#[from] RedisError),

    #[error(transparent)]
    Connection(#[from] PoolError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error {0}")]
    Configuration(String),
}

/// Progress of an asynchronous job. Stored as its integer code.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum JobStatus {
    #[default]
    Unknown = 0,
    Queued = 1,
    InProgress = 2,
    Success = 3,
    Failure = 4,
}

impl JobStatus {
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Any value that is not a known status code reads as [`JobStatus::Unknown`].
    pub fn from_value(value: &str) -> Self {
        match value.trim().parse::<u8>() {
            Ok(1) => Self::Queued,
            Ok(2) => Self::InProgress,
            Ok(3) => Self::Success,
            Ok(4) => Self::Failure,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "Unknown",
            Self::Queued => "Queued",
            Self::InProgress => "InProgress",
            Self::Success => "Success",
            Self::Failure => "Failure",
        };

        f.write_str(name)
    }
}

/// Key/value storage of job statuses where every entry expires.
#[async_trait]
pub trait StatusStore: 'static + Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<JobStatus>, Error>;

    async fn set(&self, id: &str, status: JobStatus, expiry: Duration) -> Result<(), Error>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum Configuration {
    Redis(RedisConfiguration),
    Memory,
}

impl Configuration {
    pub fn build(&self) -> Result<Arc<dyn StatusStore>, Error> {
        Ok(match self {
            Self::Redis(x) => Arc::new(RedisStatusStore::new(x)?),
            Self::Memory => Arc::new(MemoryStatusStore::default()),
        })
    }
}
