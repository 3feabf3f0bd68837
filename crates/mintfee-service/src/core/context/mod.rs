use std::sync::Arc;

use mintfee_estimator::FeeCalculator;

use crate::core::context::configuration::Configuration;

pub mod configuration;
pub mod environment;

/// Shared by every service of the binary.
#[derive(Clone)]
pub struct Context {
    pub configuration: Configuration,
    pub calculator: Arc<FeeCalculator>,
}

impl Context {
    pub fn new(configuration: Configuration, calculator: FeeCalculator) -> Context {
        Context {
            configuration,
            calculator: Arc::new(calculator),
        }
    }
}
