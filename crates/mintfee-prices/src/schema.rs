use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::PriceKind;

/// Largest integer a double holds without losing precision.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Price payload as delivered by a store or a feed, before validation. Feeds usually hand
/// over text while stores hand over already decoded documents.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPrice {
    Text(String),
    Json(Value),
}

impl RawPrice {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match self {
            Self::Text(text) => serde_json::from_str(text),
            Self::Json(value) => T::deserialize(value),
        }
    }
}

impl From<String> for RawPrice {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for RawPrice {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Value> for RawPrice {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Validated form of a price. Parsing is all-or-nothing: a payload that misses a field or
/// carries an out of range value is rejected as a whole.
pub trait PriceSchema: Sized + Clone + PartialEq + Send + Sync + 'static {
    const KIND: PriceKind;

    fn parse(raw: &RawPrice) -> Result<Self, String>;
}

/// Gas price observed on chain, both fees are expressed in wei.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GasPrice {
    #[serde(with = "quantity")]
    pub base_fee_per_gas: u128,

    #[serde(with = "quantity")]
    pub max_priority_fee_per_gas: u128,

    #[serde(rename = "timestamp", alias = "observedAt", with = "timestamp")]
    pub observed_at: DateTime<Utc>,
}

impl PriceSchema for GasPrice {
    const KIND: PriceKind = PriceKind::Gas;

    fn parse(raw: &RawPrice) -> Result<Self, String> {
        raw.decode().map_err(|e| e.to_string())
    }
}

/// Price of one native token expressed in USD.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NativeTokenPrice {
    #[serde(with = "decimal")]
    pub price: BigDecimal,

    #[serde(rename = "timestamp", alias = "observedAt", with = "timestamp")]
    pub observed_at: DateTime<Utc>,
}

impl PriceSchema for NativeTokenPrice {
    const KIND: PriceKind = PriceKind::NativeToken;

    fn parse(raw: &RawPrice) -> Result<Self, String> {
        let value: Self = raw.decode().map_err(|e| e.to_string())?;
        if value.price <= BigDecimal::zero() {
            return Err(format!("price must be strictly positive, got {}", value.price));
        }

        Ok(value)
    }
}

/// Wei quantities accepted as JSON integers, decimal strings or `0x` prefixed hex strings.
/// Integral floating numbers are tolerated as document stores often persist numbers as doubles.
pub mod quantity {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::MAX_EXACT_FLOAT;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Quantity {
        Integer(u64),
        Float(f64),
        Text(String),
    }

    pub fn parse(value: &str) -> Result<u128, String> {
        let result = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
            Some(hex) => u128::from_str_radix(hex, 16),
            None => value.parse::<u128>(),
        };

        result.map_err(|e| format!("invalid quantity {}: {}", value, e))
    }

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        match u64::try_from(*value) {
            Ok(value) => serializer.serialize_u64(value),
            Err(_) => serializer.serialize_str(&value.to_string()),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        match Quantity::deserialize(deserializer)? {
            Quantity::Integer(value) => Ok(value.into()),
            Quantity::Float(value) if value >= 0.0 && value.fract() == 0.0 && value <= MAX_EXACT_FLOAT => Ok(value as u128),
            Quantity::Float(value) => Err(D::Error::custom(format!("invalid quantity {}", value))),
            Quantity::Text(value) => parse(&value).map_err(D::Error::custom),
        }
    }
}

/// Milliseconds since the Unix epoch, as integers or integral doubles.
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::MAX_EXACT_FLOAT;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Milliseconds {
        Integer(i64),
        Float(f64),
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.timestamp_millis())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let milliseconds = match Milliseconds::deserialize(deserializer)? {
            Milliseconds::Integer(value) => value,
            Milliseconds::Float(value) if value.fract() == 0.0 && value.abs() <= MAX_EXACT_FLOAT => value as i64,
            Milliseconds::Float(value) => return Err(D::Error::custom(format!("invalid timestamp {}", value))),
        };

        DateTime::from_timestamp_millis(milliseconds).ok_or_else(|| D::Error::custom(format!("timestamp {} out of range", milliseconds)))
    }
}

/// Decimal values accepted as JSON numbers or strings. Numbers go through their shortest
/// decimal representation so that `0.8` reads as exactly `0.8`.
pub mod decimal {
    use super::*;
    use serde::de::Error;
    use serde::{Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Decimal {
        Number(serde_json::Number),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigDecimal, D::Error> {
        let text = match Decimal::deserialize(deserializer)? {
            Decimal::Number(value) => value.to_string(),
            Decimal::Text(value) => value,
        };

        BigDecimal::from_str(text.trim()).map_err(|e| D::Error::custom(format!("invalid decimal {}: {}", text, e)))
    }
}
