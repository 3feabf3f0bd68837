use std::sync::Arc;

use bigdecimal::num_bigint::BigUint;
use bigdecimal::BigDecimal;
use mintfee_common::service::tracing::instrument;
use mintfee_prices::{ErrorSink, GasPrice, NativeTokenPrice, PriceCache, PriceFeed, PriceStore};
use serde::Serialize;
use serde_with::{serde_as, DisplayFromStr};

use crate::math::{to_decimal, truncate, wei_to_gwei, WEI_PER_GWEI};
use crate::{Error, FeeConfiguration, GasUnitTable, Operation, PriorityFeePolicy};

/// Fee figures of one operation computed against a single price snapshot.
#[serde_as]
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FeeQuote {
    pub operation: Operation,
    pub batch_size: Option<u32>,
    pub gas_units: u64,

    /// In wei.
    #[serde_as(as = "DisplayFromStr")]
    pub gas_fee: BigUint,

    /// In gwei.
    #[serde_as(as = "DisplayFromStr")]
    pub platform_fee: BigUint,

    /// In gwei.
    #[serde_as(as = "DisplayFromStr")]
    pub reserved_amount: BigUint,
}

/// Derives the fees of an operation from the prices held by its [`PriceCache`]. Prices are
/// read on every call, the calculator keeps no other state.
pub struct FeeCalculator {
    configuration: FeeConfiguration,
    cache: PriceCache,
}

impl FeeCalculator {
    /// Validates the configuration then bootstraps the prices. No calculator is returned
    /// unless both prices are available and valid.
    #[instrument(name = "initialize_fee_calculator", skip_all)]
    pub async fn init(
        configuration: FeeConfiguration,
        store: &dyn PriceStore,
        feed: &dyn PriceFeed,
        sink: Arc<dyn ErrorSink>,
    ) -> Result<Self, Error> {
        configuration.validate()?;

        let cache = PriceCache::initialize(store, feed, sink).await?;

        Ok(Self { configuration, cache })
    }

    pub fn configuration(&self) -> &FeeConfiguration {
        &self.configuration
    }

    pub fn gas_unit_table(&self) -> &GasUnitTable {
        &self.configuration.gas_units
    }

    pub fn prices(&self) -> &PriceCache {
        &self.cache
    }

    pub fn gas_units(&self, operation: Operation, batch_size: Option<u32>) -> u64 {
        self.configuration.gas_units.gas_units(operation, batch_size)
    }

    /// Fee paid for each gas unit, in wei.
    pub fn fee_per_gas(&self) -> BigUint {
        self.fee_per_gas_at(&self.cache.current_gas_price())
    }

    /// Gas fee of `gas_units`, in wei.
    pub fn gas_fee(&self, gas_units: u64) -> BigUint {
        BigUint::from(gas_units) * self.fee_per_gas()
    }

    /// Platform fee converted in native token, in gwei.
    pub fn platform_fee(&self) -> BigUint {
        self.platform_fee_at(&self.cache.current_native_token_price())
    }

    /// Amount to reserve before submitting an operation consuming `gas_units`, in gwei.
    pub fn reserved_amount(&self, gas_units: u64) -> BigUint {
        let gas_price = self.cache.current_gas_price();
        let native_token_price = self.cache.current_native_token_price();

        self.reserved_amount_at(gas_units, &gas_price, &native_token_price)
    }

    pub fn quote(&self, operation: Operation, batch_size: Option<u32>) -> FeeQuote {
        let gas_price = self.cache.current_gas_price();
        let native_token_price = self.cache.current_native_token_price();
        let gas_units = self.gas_units(operation, batch_size);

        FeeQuote {
            operation,
            batch_size,
            gas_units,
            gas_fee: BigUint::from(gas_units) * self.fee_per_gas_at(&gas_price),
            platform_fee: self.platform_fee_at(&native_token_price),
            reserved_amount: self.reserved_amount_at(gas_units, &gas_price, &native_token_price),
        }
    }

    /// Stops following price updates. The last known prices remain readable.
    pub async fn close(&self) {
        self.cache.close().await
    }

    fn fee_per_gas_at(&self, gas_price: &GasPrice) -> BigUint {
        let base_fee = BigUint::from(gas_price.base_fee_per_gas);

        match self.configuration.priority_fee {
            PriorityFeePolicy::Exclude => base_fee,
            PriorityFeePolicy::Include => base_fee + BigUint::from(gas_price.max_priority_fee_per_gas),
        }
    }

    fn platform_fee_at(&self, native_token_price: &NativeTokenPrice) -> BigUint {
        let platform_fee = &self.configuration.platform_fee_usd * BigDecimal::from(WEI_PER_GWEI);

        truncate(&(platform_fee / &native_token_price.price))
    }

    fn reserved_amount_at(&self, gas_units: u64, gas_price: &GasPrice, native_token_price: &NativeTokenPrice) -> BigUint {
        let gas_fee = BigUint::from(gas_units) * wei_to_gwei(&self.fee_per_gas_at(gas_price));
        let margin = truncate(&(to_decimal(&gas_fee) * &self.configuration.gas_fee_margin));

        gas_fee + margin + self.platform_fee_at(native_token_price)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;
    use std::time::Duration;

    use bigdecimal::num_bigint::BigUint;
    use bigdecimal::BigDecimal;
    use mintfee_prices::memory::MemoryPriceSource;
    use mintfee_prices::mock::RecordingErrorSink;
    use mintfee_prices::{PriceKind, RawPrice};
    use serde_json::json;
    use tokio::time;

    use crate::{Error, FeeCalculator, FeeConfiguration, Operation, PriorityFeePolicy};

    fn gas(base_fee_per_gas: u128, max_priority_fee_per_gas: u128) -> RawPrice {
        RawPrice::from(json!({
            "baseFeePerGas": base_fee_per_gas.to_string(),
            "maxPriorityFeePerGas": max_priority_fee_per_gas.to_string(),
            "timestamp": 1_700_000_000_000u64
        }))
    }

    fn native_token(price: &str) -> RawPrice {
        RawPrice::from(json!({ "price": price, "timestamp": 1_700_000_000_000u64 }))
    }

    fn configuration(platform_fee_usd: &str, gas_fee_margin: &str) -> FeeConfiguration {
        FeeConfiguration::new(BigDecimal::from_str(platform_fee_usd).unwrap(), BigDecimal::from_str(gas_fee_margin).unwrap())
    }

    async fn reference_source() -> MemoryPriceSource {
        let source = MemoryPriceSource::new();
        source.put_price(PriceKind::Gas, gas(1 << 32, 1 << 31)).await;
        source.put_price(PriceKind::NativeToken, native_token("0.8")).await;

        source
    }

    async fn calculator(configuration: FeeConfiguration, source: &MemoryPriceSource) -> FeeCalculator {
        FeeCalculator::init(configuration, source, source, Arc::new(RecordingErrorSink::new()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn reference_scenario_with_base_fee_only() {
        // Given
        let source = reference_source().await;
        let calculator = calculator(configuration("0.02", "0"), &source).await;

        // When
        let gas_units = calculator.gas_units(Operation::CreateToken, None);

        // Then
        assert_eq!(gas_units, 144_884);
        assert_eq!(calculator.platform_fee(), BigUint::from(25_000_000u64));
        assert_eq!(calculator.gas_fee(gas_units), BigUint::from(144_884u64) * BigUint::from(1u64 << 32));
        assert_eq!(calculator.reserved_amount(gas_units), BigUint::from(25_579_536u64));
    }

    #[tokio::test]
    async fn reference_scenario_with_priority_fee() {
        let source = reference_source().await;
        let calculator = calculator(configuration("0.02", "0").with_priority_fee(PriorityFeePolicy::Include), &source).await;

        let quote = calculator.quote(Operation::CreateToken, None);

        assert_eq!(quote.gas_units, 144_884);
        assert_eq!(quote.gas_fee, BigUint::from(144_884u64) * BigUint::from(6_442_450_944u64));
        assert_eq!(quote.platform_fee, BigUint::from(25_000_000u64));
        assert_eq!(quote.reserved_amount, BigUint::from(25_869_304u64));
    }

    #[tokio::test]
    async fn margin_is_added_to_gas_fee() {
        let source = reference_source().await;
        let calculator = calculator(configuration("0.02", "0.5"), &source).await;

        // 144_884 * 4 = 579_536 gwei, half of it is 289_768
        assert_eq!(calculator.reserved_amount(144_884), BigUint::from(579_536u64 + 289_768 + 25_000_000));
        // 3 * 4 = 12 gwei, half of it is 6
        assert_eq!(calculator.reserved_amount(3), BigUint::from(12u64 + 6 + 25_000_000));
    }

    #[tokio::test]
    async fn fractional_margin_is_truncated() {
        let source = reference_source().await;
        let calculator = calculator(configuration("0.02", "0.3"), &source).await;

        // 1 * 4 = 4 gwei, 30% of it is 1.2
        assert_eq!(calculator.reserved_amount(1), BigUint::from(4u64 + 1 + 25_000_000));
    }

    #[tokio::test]
    async fn platform_fee_is_floored() {
        let source = reference_source().await;
        source.put_price(PriceKind::NativeToken, native_token("3")).await;
        let calculator = calculator(configuration("1", "0"), &source).await;

        assert_eq!(calculator.platform_fee(), BigUint::from(333_333_333u64));
    }

    #[tokio::test]
    async fn reserved_amount_is_monotonic_in_gas_units() {
        let source = reference_source().await;
        let calculator = calculator(configuration("0.02", "0.37"), &source).await;

        let mut previous = calculator.reserved_amount(0);
        for gas_units in (0..2_000_000u64).step_by(9_973) {
            let current = calculator.reserved_amount(gas_units);
            assert!(current >= previous);
            previous = current;
        }
    }

    #[tokio::test]
    async fn init_accepts_margin_bounds() {
        let source = reference_source().await;

        for margin in ["0", "1"] {
            let result = FeeCalculator::init(configuration("0.02", margin), &source, &source, Arc::new(RecordingErrorSink::new())).await;
            assert!(result.is_ok());
        }
    }

    #[tokio::test]
    async fn init_rejects_margin_out_of_bounds_before_reading_prices() {
        // No price is stored, configuration errors must come first
        let source = MemoryPriceSource::new();

        for margin in ["-0.0001", "1.0001"] {
            let result = FeeCalculator::init(configuration("0.02", margin), &source, &source, Arc::new(RecordingErrorSink::new())).await;
            assert!(matches!(result, Err(Error::InvalidGasFeeMargin(_))));
        }

        let result = FeeCalculator::init(configuration("0", "0"), &source, &source, Arc::new(RecordingErrorSink::new())).await;
        assert!(matches!(result, Err(Error::InvalidPlatformFee(_))));
    }

    #[tokio::test]
    async fn init_fails_without_gas_price() {
        let source = MemoryPriceSource::new();
        source.put_price(PriceKind::NativeToken, native_token("0.8")).await;

        let result = FeeCalculator::init(configuration("0.02", "0"), &source, &source, Arc::new(RecordingErrorSink::new())).await;

        assert!(matches!(result, Err(Error::Price(mintfee_prices::Error::PriceNotFound(PriceKind::Gas)))));
        assert_eq!(source.subscribers(PriceKind::Gas).await, 0);
    }

    #[tokio::test]
    async fn init_fails_on_invalid_stored_price() {
        let source = reference_source().await;
        source.put_price(PriceKind::Gas, RawPrice::from(json!({ "baseFeePerGas": 1 }))).await;

        let result = FeeCalculator::init(configuration("0.02", "0"), &source, &source, Arc::new(RecordingErrorSink::new())).await;

        assert!(matches!(result, Err(Error::Price(mintfee_prices::Error::InvalidPrice(PriceKind::Gas, _)))));
    }

    #[tokio::test]
    async fn fees_follow_price_updates() {
        // Given
        let source = reference_source().await;
        let sink = RecordingErrorSink::new();
        let calculator = FeeCalculator::init(configuration("0.02", "0"), &source, &source, Arc::new(sink.clone()))
            .await
            .unwrap();
        let mut updates = calculator.prices().watch_gas_price();

        // When
        source.publish(PriceKind::Gas, RawPrice::from(json!({ "baseFeePerGas": 1u64 << 32 }))).await;
        source.publish(PriceKind::Gas, gas(10_000_000_000, 0)).await;

        // Then
        time::timeout(Duration::from_secs(1), updates.changed()).await.unwrap().unwrap();
        assert_eq!(sink.count(), 1);
        assert_eq!(calculator.reserved_amount(1), BigUint::from(10u64 + 25_000_000));
    }

    #[tokio::test]
    async fn close_keeps_last_prices() {
        let source = reference_source().await;
        let calculator = calculator(configuration("0.02", "0"), &source).await;

        calculator.close().await;
        calculator.close().await;
        source.publish(PriceKind::Gas, gas(1, 1)).await;

        assert_eq!(calculator.reserved_amount(144_884), BigUint::from(25_579_536u64));
    }

    #[test]
    fn quote_serializes_amounts_as_strings() {
        let quote = crate::FeeQuote {
            operation: Operation::Mint,
            batch_size: None,
            gas_units: 40_146,
            gas_fee: BigUint::from(1u64),
            platform_fee: BigUint::from(2u64),
            reserved_amount: BigUint::from(3u64),
        };

        let value = serde_json::to_value(&quote).unwrap();

        assert_eq!(
            value,
            json!({
                "operation": "mint",
                "batch_size": null,
                "gas_units": 40_146,
                "gas_fee": "1",
                "platform_fee": "2",
                "reserved_amount": "3"
            })
        );
    }
}
