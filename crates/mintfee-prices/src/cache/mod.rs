use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use mintfee_common::metric;
use mintfee_common::service::tracing::instrument;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{Error, ErrorSink, GasPrice, NativeTokenPrice, PriceFeed, PriceKind, PriceSchema, PriceStore, PriceSubscription, RawPrice};

/// Holds the latest gas price and native token price. The cache is bootstrapped from a
/// [`PriceStore`] and then kept up to date by listening to a [`PriceFeed`]. Reads are
/// served from memory and never wait on the store or the feed.
///
/// Malformed updates are reported to the [`ErrorSink`] and dropped, the previous value
/// stays in place.
pub struct PriceCache {
    slots: Arc<Slots>,
    shutdown: watch::Sender<bool>,
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

struct Slots {
    closed: AtomicBool,
    sink: Arc<dyn ErrorSink>,

    gas: watch::Sender<GasPrice>,
    native_token: watch::Sender<NativeTokenPrice>,
}

impl PriceCache {
    /// Fetches both prices from the store, then subscribes to their updates. Fails when a
    /// price is missing or invalid, the gas price being checked first.
    #[instrument(name = "initialize_price_cache", skip_all)]
    pub async fn initialize(store: &dyn PriceStore, feed: &dyn PriceFeed, sink: Arc<dyn ErrorSink>) -> Result<Self, Error> {
        let (gas, native_token) = tokio::try_join!(store.find_price(PriceKind::Gas), store.find_price(PriceKind::NativeToken))?;

        let gas: GasPrice = Self::bootstrap(gas)?;
        let native_token: NativeTokenPrice = Self::bootstrap(native_token)?;

        let slots = Arc::new(Slots {
            closed: AtomicBool::new(false),
            sink,
            gas: watch::Sender::new(gas),
            native_token: watch::Sender::new(native_token),
        });

        let (shutdown, _) = watch::channel(false);
        let mut listeners = Vec::with_capacity(PriceKind::ALL.len());
        for kind in PriceKind::ALL {
            let subscription = feed.subscribe(kind).await?;
            listeners.push(tokio::spawn(Self::listen(slots.clone(), kind, subscription, shutdown.subscribe())));
        }

        info!("price cache initialized");

        Ok(Self {
            slots,
            shutdown,
            listeners: Mutex::new(listeners),
        })
    }

    fn bootstrap<T: PriceSchema>(raw: Option<RawPrice>) -> Result<T, Error> {
        let raw = raw.ok_or(Error::PriceNotFound(T::KIND))?;

        T::parse(&raw).map_err(|cause| Error::InvalidPrice(T::KIND, cause))
    }

    async fn listen(slots: Arc<Slots>, kind: PriceKind, mut subscription: PriceSubscription, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => break,
                update = subscription.next() => match update {
                    Some(raw) => {
                        slots.on_update(kind, &raw);
                    },
                    None => {
                        warn!("{} price feed terminated", kind);
                        break;
                    },
                },
            }
        }
    }

    pub fn current_gas_price(&self) -> GasPrice {
        *self.slots.gas.borrow()
    }

    pub fn current_native_token_price(&self) -> NativeTokenPrice {
        self.slots.native_token.borrow().clone()
    }

    /// Receiver notified each time the gas price changes.
    pub fn watch_gas_price(&self) -> watch::Receiver<GasPrice> {
        self.slots.gas.subscribe()
    }

    /// Receiver notified each time the native token price changes.
    pub fn watch_native_token_price(&self) -> watch::Receiver<NativeTokenPrice> {
        self.slots.native_token.subscribe()
    }

    /// Applies an update as if it was received from the feed. Returns true when the cached
    /// value changed.
    pub fn on_update(&self, kind: PriceKind, raw: &RawPrice) -> bool {
        self.slots.on_update(kind, raw)
    }

    pub fn is_closed(&self) -> bool {
        self.slots.closed.load(Ordering::Acquire)
    }

    /// Stops listening to the feed. Once it returns no update is applied anymore. Calling
    /// it again has no effect.
    pub async fn close(&self) {
        if self.slots.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        // Waits for the updates being written.
        self.slots.gas.send_if_modified(|_| false);
        self.slots.native_token.send_if_modified(|_| false);

        self.shutdown.send_replace(true);

        let listeners = std::mem::take(&mut *self.listeners.lock().await);
        for listener in listeners {
            let _ = listener.await;
        }

        info!("price cache closed");
    }
}

impl Drop for PriceCache {
    fn drop(&mut self) {
        for listener in self.listeners.get_mut().drain(..) {
            listener.abort();
        }
    }
}

impl Slots {
    fn on_update(&self, kind: PriceKind, raw: &RawPrice) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }

        match kind {
            PriceKind::Gas => self.apply(&self.gas, raw),
            PriceKind::NativeToken => self.apply(&self.native_token, raw),
        }
    }

    fn apply<T: PriceSchema>(&self, slot: &watch::Sender<T>, raw: &RawPrice) -> bool {
        let value = match T::parse(raw) {
            Ok(value) => value,
            Err(cause) => {
                self.sink.report(&Error::PriceUpdate(T::KIND, cause));
                return false;
            },
        };

        let modified = slot.send_if_modified(|current| {
            if self.closed.load(Ordering::Acquire) || *current == value {
                return false;
            }

            *current = value;
            true
        });

        if modified {
            debug!("{} price updated", T::KIND);
            metric!(counter[price_update] = 1, kind = T::KIND.name());
        }

        modified
    }
}
