use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::stream::{self, BoxStream};
use log::{debug, warn};
use tokio::sync::{mpsc, RwLock};

/// Capacity of each subscriber channel. Messages published to a full channel are dropped
/// for that subscriber only.
const SUBSCRIBER_CAPACITY: usize = 1024;

/// In-process publish/subscribe layer keyed by topic name. Allow concurrent entity to
/// pass data between each other in a safe and sound manner. Internally it uses
/// a Arc<RWLock<_>> in order to be passed to multiple tasks and accessed
/// concurrently. Each subscriber owns a dedicated bounded channel, so a slow
/// subscriber never delays the others.
#[derive(Clone)]
pub struct Messages<T>(Arc<MessagesInner<T>>)
where
    T: Clone,
    T: Send + Sync;

impl<T> Default for Messages<T>
where
    T: Clone,
    T: Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Messages<T>
where
    T: Clone,
    T: Send + Sync,
{
    /// Creates a new messaging layer. Publishers and subscribers must share the same layer
    /// to be able to pass message around. Multiple layer can be created to segregate communication
    pub fn new() -> Self {
        Self(Arc::new(MessagesInner {
            next_id: AtomicU64::new(0),
            topics: RwLock::default(),
        }))
    }

    /// Publish a message on the given topic and returns the number of subscribers it was
    /// delivered to. Closed subscribers are unregistered on the way.
    pub async fn publish(&self, topic: &str, message: T) -> usize {
        let mut delivered = 0;
        let mut closed = vec![];

        {
            let topics = self.0.topics.read().await;
            let Some(subscribers) = topics.get(topic) else { return 0 };

            for (id, subscriber) in subscribers {
                if subscriber.is_closed() {
                    closed.push(*id);
                    continue;
                }

                match subscriber.try_send(message.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => warn!("subscriber {} on topic {} is full, dropping message", id, topic),
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }

        if !closed.is_empty() {
            self.unregister(topic, &closed).await;
        }

        delivered
    }

    /// Returns a new [`MessageReceiver`] that receives every message published on `topic`
    /// from now on. Dropping the receiver unsubscribes it.
    pub async fn subscribe(&self, topic: &str) -> MessageReceiver<T> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);

        let mut topics = self.0.topics.write().await;
        topics.entry(topic.to_string()).or_default().insert(id, tx);
        debug!("subscriber {} registered on topic {}", id, topic);

        MessageReceiver(rx)
    }

    /// Number of live subscribers on the given topic.
    pub async fn subscribers(&self, topic: &str) -> usize {
        let topics = self.0.topics.read().await;
        topics
            .get(topic)
            .map(|x| x.values().filter(|s| !s.is_closed()).count())
            .unwrap_or_default()
    }

    async fn unregister(&self, topic: &str, ids: &[u64]) {
        let mut topics = self.0.topics.write().await;
        if let Some(subscribers) = topics.get_mut(topic) {
            for id in ids {
                subscribers.remove(id);
            }

            if subscribers.is_empty() {
                topics.remove(topic);
            }
        }
    }
}

/// Internal representation of the messaging layer. Uses a map of topic to subscriber channels.
struct MessagesInner<T>
where
    T: Clone,
    T: Send + Sync,
{
    next_id: AtomicU64,
    topics: RwLock<HashMap<String, HashMap<u64, mpsc::Sender<T>>>>,
}

/// Allow entity to receive messages. Internally it uses a multi-producer/single-consumer channel
#[derive(Debug)]
pub struct MessageReceiver<T>(mpsc::Receiver<T>)
where
    T: Clone,
    T: Send + Sync;

impl<T> MessageReceiver<T>
where
    T: 'static + Clone,
    T: Send + Sync,
{
    /// Wait to receive a message on the channel
    pub async fn receive(&mut self) -> Option<T> {
        self.0.recv().await
    }

    /// Returns the messages already buffered without waiting for new ones.
    pub fn receive_pending(&mut self) -> Vec<T> {
        let mut messages = Vec::with_capacity(self.0.len());
        while let Ok(message) = self.0.try_recv() {
            messages.push(message)
        }

        messages
    }

    pub fn into_stream(self) -> BoxStream<'static, T> {
        Box::pin(stream::unfold(self, |mut receiver| async move {
            let message = receiver.receive().await?;
            Some((message, receiver))
        }))
    }
}
