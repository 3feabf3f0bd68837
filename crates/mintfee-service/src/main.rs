use std::sync::Arc;

use mintfee_common::service::monitoring::Metric;
use mintfee_common::service::{Error, TokioServiceManager};
use mintfee_estimator::FeeCalculator;
use mintfee_prices::{PriceSource, TracingErrorSink};
use tokio::signal;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Registry;

use crate::core::context::configuration::Configuration;
use crate::core::context::Context;
use crate::core::Fmt;
use crate::monitoring::FeeMonitoring;

mod core;
mod monitoring;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let configuration = Configuration::load()?;

    let metric_layer = configuration.prometheus.as_ref().map(Metric::layer).transpose()?;
    let fmt_layer = Fmt::layer(&configuration.verbosity);

    let subscriber = Registry::default().with(fmt_layer).with(metric_layer);

    // Also forwards the `log` records of the service macros.
    subscriber.try_init().map_err(Error::from)?;

    let source = PriceSource::connect(&configuration.prices).await.map_err(core::Error::from)?;
    let calculator = FeeCalculator::init(configuration.fees.clone(), &source, &source, Arc::new(TracingErrorSink))
        .await
        .map_err(core::Error::from)?;

    let context = Context::new(configuration, calculator);

    let mut services = TokioServiceManager::new(context.clone());
    info!("starting services...");
    services.spawn::<FeeMonitoring>();

    info!("all services started");
    let result = tokio::select! {
        result = services.wait() => result,
        _ = signal::ctrl_c() => {
            info!("shutting down...");
            Ok(())
        },
    };

    services.shutdown().await;
    context.calculator.close().await;

    result
}
