use bigdecimal::BigDecimal;
use thiserror::Error;

mod calculator;
mod configuration;
pub mod math;
mod operation;
mod table;

pub use calculator::{FeeCalculator, FeeQuote};
pub use configuration::{FeeConfiguration, PriorityFeePolicy};
pub use operation::Operation;
pub use table::{BatchGasUnits, GasUnitTable, OperationGasUnits};

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid gas fee margin {0}, expected a value between 0 and 1")]
    InvalidGasFeeMargin(BigDecimal),

    #[error("invalid platform fee {0}, expected a strictly positive value")]
    InvalidPlatformFee(BigDecimal),

    #[error("unknown operation {0}")]
    UnknownOperation(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Price(#[from] mintfee_prices::Error),
}
