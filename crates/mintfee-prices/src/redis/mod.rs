use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::{AsyncCommands, Client as RedisClient, Msg};
use deadpool_redis::{Config, Connection, Pool, Runtime};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::time;
use tracing::{error, info, warn};

use crate::{Configuration, Error, PriceFeed, PriceKind, PriceSource, PriceStore, PriceSubscription, RawPrice};

/// Prefix of the keys holding the last known prices.
const PRICE_KEY_PREFIX: &str = "price:";

/// Delay between two attempts to reopen a lost pub/sub connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfiguration {
    pub endpoint: String,
}

impl From<RedisConfiguration> for Configuration {
    fn from(value: RedisConfiguration) -> Self {
        Self::Redis(value)
    }
}

/// Reads prices under `price:<kind>` and follows updates published on the `<kind>` channel.
#[derive(Clone)]
pub struct RedisPriceSource {
    redis: Pool,
    client: RedisClient,
}

impl From<RedisPriceSource> for PriceSource {
    fn from(value: RedisPriceSource) -> Self {
        Self::Redis(value)
    }
}

impl RedisPriceSource {
    pub fn new(configuration: &RedisConfiguration) -> Result<Self, Error> {
        let redis = Config::from_url(&configuration.endpoint)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::Configuration(e.to_string()))?;

        Ok(Self {
            redis,
            client: RedisClient::open(configuration.endpoint.as_str())?,
        })
    }

    pub fn key(kind: PriceKind) -> String {
        format!("{}{}", PRICE_KEY_PREFIX, kind.name())
    }

    async fn get_redis_connection(&self) -> Result<Connection, Error> {
        let result = self.redis.get().await?;

        Ok(result)
    }

    async fn open_channel(client: &RedisClient, channel: &str) -> Result<BoxStream<'static, Msg>, Error> {
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;

        Ok(pubsub.into_on_message().boxed())
    }

    fn raw_price(message: &Msg) -> RawPrice {
        RawPrice::Text(String::from_utf8_lossy(message.get_payload_bytes()).into_owned())
    }
}

#[async_trait]
impl PriceStore for RedisPriceSource {
    async fn find_price(&self, kind: PriceKind) -> Result<Option<RawPrice>, Error> {
        let mut connection = self.get_redis_connection().await?;
        let value: Option<String> = connection.get(Self::key(kind)).await?;

        Ok(value.map(RawPrice::Text))
    }
}

#[async_trait]
impl PriceFeed for RedisPriceSource {
    /// The first connection must succeed. Once established, a lost connection is reopened
    /// and the channel subscribed again until the subscription is dropped.
    async fn subscribe(&self, kind: PriceKind) -> Result<PriceSubscription, Error> {
        let messages = Self::open_channel(&self.client, kind.name()).await?;

        let subscription = stream::unfold((self.client.clone(), Some(messages)), move |(client, mut messages)| async move {
            loop {
                if let Some(channel) = messages.as_mut() {
                    if let Some(message) = channel.next().await {
                        return Some((Self::raw_price(&message), (client, messages)));
                    }

                    warn!("{} channel connection lost, reconnecting", kind);
                    messages = None;
                }

                time::sleep(RECONNECT_DELAY).await;
                match Self::open_channel(&client, kind.name()).await {
                    Ok(channel) => {
                        info!("{} channel subscribed again", kind);
                        messages = Some(channel);
                    },
                    Err(e) => error!("could not subscribe to {} channel: {}", kind, e),
                }
            }
        });

        Ok(subscription.boxed())
    }
}
