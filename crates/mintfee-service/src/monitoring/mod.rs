use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::num_bigint::BigInt;
use bigdecimal::BigDecimal;
use mintfee_common::service::{Error, Service};
use mintfee_common::{metric, service_check, service_info};
use mintfee_estimator::{FeeQuote, Operation};
use num_traits::ToPrimitive;
use tokio::time;
use tracing::debug;

use crate::core::context::Context;

/// Decimal places between wei and gwei.
const GWEI_SCALE: i64 = 9;

/// Computes the fee of every operation at a fixed interval and exposes them as gauges.
pub struct FeeMonitoring {
    context: Context,
}

#[async_trait]
impl Service for FeeMonitoring {
    type Context = Context;

    const NAME: &'static str = "FeeMonitoring";

    async fn new(context: Context) -> Self {
        Self { context }
    }

    async fn run(self) -> Result<(), Error> {
        let interval = Duration::from_secs(self.context.configuration.monitoring.interval.max(1));
        service_info!("computing fees every {} seconds", interval.as_secs());

        let mut ticker = time::interval(interval);
        loop {
            ticker.tick().await;

            self.report_prices();
            for quote in self.quotes() {
                self.report_quote(&quote);
            }
        }
    }
}

impl FeeMonitoring {
    fn quotes(&self) -> Vec<FeeQuote> {
        let batch_size = self.context.configuration.monitoring.batch_size;

        Operation::ALL
            .into_iter()
            .map(|operation| {
                let batch_size = batch_size.filter(|_| operation.is_batch());
                self.context.calculator.quote(operation, batch_size)
            })
            .collect()
    }

    fn report_prices(&self) {
        let prices = self.context.calculator.prices();
        let gas_price = prices.current_gas_price();
        let native_token_price = prices.current_native_token_price();

        metric!(gauge[base_fee_per_gas_gwei] = wei_to_gwei(gas_price.base_fee_per_gas));
        metric!(gauge[native_token_price] = native_token_price.price.to_f64().unwrap_or_default());
    }

    fn report_quote(&self, quote: &FeeQuote) {
        debug!(
            "{} costs {} gas units, reserving {} gwei",
            quote.operation, quote.gas_units, quote.reserved_amount
        );

        metric!(gauge[gas_units] = quote.gas_units, operation = quote.operation.identifier());

        let reserved_amount = service_check!(u64::try_from(&quote.reserved_amount) => return);
        metric!(gauge[reserved_amount_gwei] = reserved_amount, operation = quote.operation.identifier());
    }
}

fn wei_to_gwei(wei: u128) -> f64 {
    BigDecimal::new(BigInt::from(wei), GWEI_SCALE).to_f64().unwrap_or_default()
}
