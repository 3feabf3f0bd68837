use async_trait::async_trait;
use futures::StreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::change_stream::event::ResumeToken;
use mongodb::options::FullDocumentType;
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{Configuration, Error, PriceFeed, PriceKind, PriceSource, PriceStore, PriceSubscription, RawPrice};

fn default_collection() -> String {
    "prices".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfiguration {
    pub endpoint: String,
    pub database: String,

    #[serde(default = "default_collection")]
    pub collection: String,
}

impl From<MongoConfiguration> for Configuration {
    fn from(value: MongoConfiguration) -> Self {
        Self::Mongo(value)
    }
}

/// Prices stored as one document per kind, identified by their `name` field. Updates are
/// followed through a change stream which requires the server to run as a replica set.
#[derive(Clone)]
pub struct MongoPriceSource {
    prices: Collection<Document>,
    resume_after: Option<ResumeToken>,
}

impl From<MongoPriceSource> for PriceSource {
    fn from(value: MongoPriceSource) -> Self {
        Self::Mongo(value)
    }
}

impl MongoPriceSource {
    pub async fn connect(configuration: &MongoConfiguration) -> Result<Self, Error> {
        let client = Client::with_uri_str(&configuration.endpoint).await?;

        Ok(Self::from_client(&client, configuration))
    }

    pub fn from_client(client: &Client, configuration: &MongoConfiguration) -> Self {
        Self {
            prices: client.database(&configuration.database).collection(&configuration.collection),
            resume_after: None,
        }
    }

    /// Subscriptions opened from now on replay the changes following `token`.
    pub fn with_resume_token(mut self, token: ResumeToken) -> Self {
        self.resume_after = Some(token);
        self
    }

    fn raw_price(document: Document) -> RawPrice {
        RawPrice::Json(Bson::Document(document).into_relaxed_extjson())
    }
}

#[async_trait]
impl PriceStore for MongoPriceSource {
    async fn find_price(&self, kind: PriceKind) -> Result<Option<RawPrice>, Error> {
        let document = self
            .prices
            .find_one(doc! { "name": kind.name() })
            .projection(doc! { "_id": 0 })
            .await?;

        Ok(document.map(Self::raw_price))
    }
}

#[async_trait]
impl PriceFeed for MongoPriceSource {
    async fn subscribe(&self, kind: PriceKind) -> Result<PriceSubscription, Error> {
        let pipeline = vec![doc! {
            "$match": {
                "operationType": "update",
                "fullDocument.name": kind.name(),
            }
        }];

        let mut watch = self
            .prices
            .watch()
            .pipeline(pipeline)
            .full_document(FullDocumentType::UpdateLookup);

        if let Some(token) = self.resume_after.clone() {
            watch = watch.resume_after(token);
        }

        let changes = watch.await?;

        Ok(Box::pin(changes.filter_map(move |event| async move {
            match event {
                Ok(event) => event.full_document.map(|mut document| {
                    document.remove("_id");
                    Self::raw_price(document)
                }),
                Err(e) => {
                    error!("{} change stream error: {}", kind, e);
                    None
                },
            }
        })))
    }
}
