//! Publish/subscribe abstraction for push-channel observers.
//!
//! The bus is the **transport** between the job registry and whoever watches
//! job progress (SSE clients, dashboards, tests). It makes few promises:
//!
//! - **Broadcast**: every live subscription receives every published message
//! - **Ordered per subscription**: messages arrive in publish order
//! - **Non-blocking publish**: a slow observer never stalls the publisher
//! - **Best effort**: subscriptions that went away are dropped silently
//!
//! The registry is the source of truth; an observer that missed messages
//! re-syncs from the next event's full snapshot.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::error::TryRecvError;

/// A subscription to a bus.
///
/// Owned by exactly one consumer. Dropping it unsubscribes on the next publish.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: UnboundedReceiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: UnboundedReceiver<M>) -> Self {
        Self { receiver }
    }

    /// Wait for the next message; `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<M> {
        self.receiver.recv().await
    }

    /// Take the next message if one is already buffered.
    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn into_inner(self) -> UnboundedReceiver<M> {
        self.receiver
    }
}

/// Publish/subscribe bus.
///
/// Implementations must be safe to share across threads; `publish` may be
/// called from synchronous code (e.g. registry listeners) and must not block.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + core::fmt::Display + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
