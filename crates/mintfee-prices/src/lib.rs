use std::fmt;

use async_trait::async_trait;
use deadpool_redis::redis::RedisError;
use deadpool_redis::PoolError;
use futures::stream::BoxStream;
use mintfee_common::service::tracing::instrument;
use mintfee_common::{enum_dispatch, log_if_error, measure_duration, metric};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod cache;
pub mod memory;
pub mod mongo;
pub mod redis;
pub mod schema;
pub mod sink;

#[cfg(any(test, feature = "testing"))]
pub mod mock;

pub use cache::PriceCache;
pub use schema::{GasPrice, NativeTokenPrice, PriceSchema, RawPrice};
pub use sink::{ErrorSink, TracingErrorSink};

use crate::memory::{MemoryConfiguration, MemoryPriceSource};
use crate::mongo::{MongoConfiguration, MongoPriceSource};
use crate::redis::{RedisConfiguration, RedisPriceSource};

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} price not found")]
    PriceNotFound(PriceKind),

    #[error("invalid {0} price: {1}")]
    InvalidPrice(PriceKind, String),

    #[error("failed to update {0} price: {1}")]
    PriceUpdate(PriceKind, String),

    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),

    #[error(transparent)]
    Redis(#[from] RedisError),

    #[error(transparent)]
    Connection(#[from] PoolError),

    #[error("configuration error {0}")]
    Configuration(String),
}

/// The two quantities tracked by the cache. Each one lives in its own store record
/// and is updated through its own feed channel.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PriceKind {
    Gas,
    NativeToken,
}

impl PriceKind {
    pub const ALL: [PriceKind; 2] = [PriceKind::Gas, PriceKind::NativeToken];

    /// Document name in the store and topic name on the feed.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gas => "gas",
            Self::NativeToken => "nativeToken",
        }
    }
}

impl fmt::Display for PriceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Durable storage holding the last known value of each price.
#[async_trait]
pub trait PriceStore: 'static + Send + Sync {
    /// Returns `None` when the record does not exist. Errors are reserved to transport failures.
    async fn find_price(&self, kind: PriceKind) -> Result<Option<RawPrice>, Error>;
}

/// Stream of raw price payloads for one [`PriceKind`]. Dropping it unsubscribes.
pub type PriceSubscription = BoxStream<'static, RawPrice>;

/// Live delivery of price updates.
#[async_trait]
pub trait PriceFeed: 'static + Send + Sync {
    async fn subscribe(&self, kind: PriceKind) -> Result<PriceSubscription, Error>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum Configuration {
    Mongo(MongoConfiguration),
    Redis(RedisConfiguration),
    Memory(MemoryConfiguration),
}

/// Concrete price source selected by the [`Configuration`]. Every source acts both as a
/// [`PriceStore`] and as a [`PriceFeed`].
#[derive(Clone)]
pub enum PriceSource {
    Mongo(MongoPriceSource),
    Redis(RedisPriceSource),
    Memory(MemoryPriceSource),
}

impl PriceSource {
    pub async fn connect(configuration: &Configuration) -> Result<Self, Error> {
        Ok(match configuration {
            Configuration::Mongo(x) => Self::Mongo(MongoPriceSource::connect(x).await?),
            Configuration::Redis(x) => Self::Redis(RedisPriceSource::new(x)?),
            Configuration::Memory(x) => Self::Memory(MemoryPriceSource::seeded(x).await),
        })
    }
}

#[async_trait]
impl PriceStore for PriceSource {
    #[instrument(name = "find_price", skip(self))]
    async fn find_price(&self, kind: PriceKind) -> Result<Option<RawPrice>, Error> {
        let (result, duration) = measure_duration!(log_if_error!(enum_dispatch!(self {
            Self::Mongo(x) |
            Self::Redis(x) |
            Self::Memory(x) => x.find_price(kind).await
        })));

        metric!(counter[price_store_request] = 1, kind = kind.name());
        metric!(histogram[price_store_request_duration_milliseconds] = duration.as_millis(), kind = kind.name());
        metric!(on error result => counter [ price_store_request_error ] = 1, kind = kind.name());

        result
    }
}

#[async_trait]
impl PriceFeed for PriceSource {
    #[instrument(name = "subscribe_price", skip(self))]
    async fn subscribe(&self, kind: PriceKind) -> Result<PriceSubscription, Error> {
        log_if_error!(enum_dispatch!(self {
            Self::Mongo(x) |
            Self::Redis(x) |
            Self::Memory(x) => x.subscribe(kind).await
        }))
    }
}
