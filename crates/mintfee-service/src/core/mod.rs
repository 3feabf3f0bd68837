use thiserror::Error;

pub mod context;

mod tracing;
pub use tracing::Fmt;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error {0}")]
    Configuration(String),

    #[error(transparent)]
    Price(#[from] mintfee_prices::Error),

    #[error(transparent)]
    Fee(#[from] mintfee_estimator::Error),
}

impl From<Error> for mintfee_common::service::Error {
    fn from(value: Error) -> Self {
        Self::from(value)
    }
}
