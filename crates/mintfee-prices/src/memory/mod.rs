use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mintfee_common::service::messaging::Messages;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{Configuration, Error, PriceFeed, PriceKind, PriceSource, PriceStore, PriceSubscription, RawPrice};

/// Prices the in-memory source starts with.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct MemoryConfiguration {
    #[serde(default)]
    pub gas: Option<Value>,

    #[serde(default)]
    pub native_token: Option<Value>,
}

impl From<MemoryConfiguration> for Configuration {
    fn from(value: MemoryConfiguration) -> Self {
        Self::Memory(value)
    }
}

/// Process local store and feed. Stored records and published updates are independent,
/// publishing does not touch the stored record and conversely.
#[derive(Clone, Default)]
pub struct MemoryPriceSource {
    prices: Arc<RwLock<HashMap<PriceKind, RawPrice>>>,
    messages: Messages<RawPrice>,
}

impl From<MemoryPriceSource> for PriceSource {
    fn from(value: MemoryPriceSource) -> Self {
        Self::Memory(value)
    }
}

impl MemoryPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seeded(configuration: &MemoryConfiguration) -> Self {
        let source = Self::new();
        if let Some(gas) = &configuration.gas {
            source.put_price(PriceKind::Gas, gas.clone()).await;
        }
        if let Some(native_token) = &configuration.native_token {
            source.put_price(PriceKind::NativeToken, native_token.clone()).await;
        }

        source
    }

    pub async fn put_price(&self, kind: PriceKind, price: impl Into<RawPrice>) {
        self.prices.write().await.insert(kind, price.into());
    }

    pub async fn remove_price(&self, kind: PriceKind) {
        self.prices.write().await.remove(&kind);
    }

    /// Delivers an update to the current subscribers of `kind` and returns how many received it.
    pub async fn publish(&self, kind: PriceKind, price: impl Into<RawPrice>) -> usize {
        self.messages.publish(kind.name(), price.into()).await
    }

    pub async fn subscribers(&self, kind: PriceKind) -> usize {
        self.messages.subscribers(kind.name()).await
    }
}

#[async_trait]
impl PriceStore for MemoryPriceSource {
    async fn find_price(&self, kind: PriceKind) -> Result<Option<RawPrice>, Error> {
        Ok(self.prices.read().await.get(&kind).cloned())
    }
}

#[async_trait]
impl PriceFeed for MemoryPriceSource {
    async fn subscribe(&self, kind: PriceKind) -> Result<PriceSubscription, Error> {
        Ok(self.messages.subscribe(kind.name()).await.into_stream())
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn stored_price_is_found() {
        let source = MemoryPriceSource::new();
        source.put_price(PriceKind::Gas, "{}").await;

        assert_eq!(source.find_price(PriceKind::Gas).await.unwrap(), Some(RawPrice::from("{}")));
        assert_eq!(source.find_price(PriceKind::NativeToken).await.unwrap(), None);

        source.remove_price(PriceKind::Gas).await;
        assert_eq!(source.find_price(PriceKind::Gas).await.unwrap(), None);
    }

    #[tokio::test]
    async fn subscription_only_receives_its_kind() {
        // Given
        let source = MemoryPriceSource::new();
        let mut gas = source.subscribe(PriceKind::Gas).await.unwrap();

        // When
        source.publish(PriceKind::NativeToken, "token").await;
        source.publish(PriceKind::Gas, "gas").await;

        // Then
        assert_eq!(gas.next().await, Some(RawPrice::from("gas")));
    }

    #[tokio::test]
    async fn dropping_subscription_unsubscribes() {
        let source = MemoryPriceSource::new();
        let subscription = source.subscribe(PriceKind::Gas).await.unwrap();
        assert_eq!(source.subscribers(PriceKind::Gas).await, 1);

        drop(subscription);

        assert_eq!(source.publish(PriceKind::Gas, "gas").await, 0);
    }
}
