use bigdecimal::{BigDecimal, One, Zero};
use mintfee_prices::schema::decimal;
use serde::{Deserialize, Serialize};

use crate::{Error, GasUnitTable};

/// Fee per gas used when pricing an operation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PriorityFeePolicy {
    /// Base fee only.
    #[default]
    Exclude,

    /// Base fee plus the priority fee.
    Include,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FeeConfiguration {
    /// Fee charged by the platform for each operation, in USD.
    #[serde(with = "decimal")]
    pub platform_fee_usd: BigDecimal,

    /// Share of the gas fee reserved on top of it, between 0 and 1.
    #[serde(with = "decimal")]
    pub gas_fee_margin: BigDecimal,

    #[serde(default)]
    pub priority_fee: PriorityFeePolicy,

    #[serde(default)]
    pub gas_units: GasUnitTable,
}

impl FeeConfiguration {
    pub fn new(platform_fee_usd: BigDecimal, gas_fee_margin: BigDecimal) -> Self {
        Self {
            platform_fee_usd,
            gas_fee_margin,
            priority_fee: PriorityFeePolicy::default(),
            gas_units: GasUnitTable::default(),
        }
    }

    pub fn with_priority_fee(mut self, policy: PriorityFeePolicy) -> Self {
        self.priority_fee = policy;
        self
    }

    pub fn with_gas_units(mut self, table: GasUnitTable) -> Self {
        self.gas_units = table;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.gas_fee_margin < BigDecimal::zero() || self.gas_fee_margin > BigDecimal::one() {
            return Err(Error::InvalidGasFeeMargin(self.gas_fee_margin.clone()));
        }

        if self.platform_fee_usd <= BigDecimal::zero() {
            return Err(Error::InvalidPlatformFee(self.platform_fee_usd.clone()));
        }

        Ok(())
    }
}
