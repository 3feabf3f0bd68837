use std::time::Duration;

use log::{error, info};
use tokio::task::JoinSet;
use tokio::time;

use crate::service::{Error, Service};

/// Delay before a failed service is started again.
const RESTART_DELAY: Duration = Duration::from_secs(5);

/// Service manager used to spawn [`Service`] and manage their lifecycle.
/// All services run on the current Tokio runtime and the tasks they spawn
/// share that same runtime.
pub struct TokioServiceManager<C> {
    context: C,
    restart_delay: Duration,

    services: JoinSet<()>,
}

impl<C> TokioServiceManager<C>
where
    C: 'static + Clone + Send,
{
    /// Create a new manager on the given context. The context will be cloned and passed
    /// to each service
    pub fn new(context: C) -> Self {
        Self {
            context,
            restart_delay: RESTART_DELAY,
            services: JoinSet::new(),
        }
    }

    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    /// Spawn a new service on the manager, giving it the bound context. Service will be restarted in
    /// case they throw an error.
    pub fn spawn<T: Service<Context = C>>(&mut self) {
        let ctx = self.context.clone();
        let delay = self.restart_delay;

        self.services.spawn(async move {
            loop {
                let service = T::new(ctx.clone()).await;

                info!(target: T::NAME , "starting service");
                if let Err(err) = service.run().await {
                    error!(target: T::NAME , "service terminated with error {} - restarting in {}ms", err, delay.as_millis());
                    time::sleep(delay).await;
                }
            }
        });
    }

    /// Convenience method to spawn a service only if a condition is met.
    pub fn spawn_conditional<T: Service<Context = C>>(&mut self, condition: bool) {
        if condition {
            self.spawn::<T>()
        }
    }

    /// Pause the current task and let the services run
    pub async fn wait(&mut self) -> Result<(), Error> {
        if self.services.join_next().await.is_some() {
            return Err(Error::new("service manager error"));
        }

        Ok(())
    }

    /// Stops every service. Their current iteration is cancelled at its next await point.
    pub async fn shutdown(&mut self) {
        self.services.shutdown().await
    }
}
