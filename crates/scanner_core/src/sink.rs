use std::{
    pin::Pin,
    sync::{Mutex, MutexGuard},
    task::{Context, Poll},
};

use futures::Stream;
use shared::domain::DecodedItem;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

type Subscribers = Option<Vec<mpsc::UnboundedSender<DecodedItem>>>;

/// Single-producer fan-out of decoded items.
///
/// Every subscriber gets its own unbounded queue, so a slow consumer never
/// loses items and publishing never waits. `None` marks the sink closed.
pub(crate) struct ItemSink {
    subscribers: Mutex<Subscribers>,
}

impl ItemSink {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Mutex::new(Some(Vec::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Items published before this call are not replayed. Subscribing to a
    /// closed sink yields a stream that has already ended.
    pub(crate) fn subscribe(&self) -> ScanStream {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(subscribers) = self.lock().as_mut() {
            subscribers.push(tx);
        }
        ScanStream {
            inner: UnboundedReceiverStream::new(rx),
        }
    }

    /// Returns `false` once the sink is closed.
    pub(crate) fn publish(&self, item: DecodedItem) -> bool {
        let mut guard = self.lock();
        let Some(subscribers) = guard.as_mut() else {
            return false;
        };
        subscribers.retain(|subscriber| subscriber.send(item.clone()).is_ok());
        true
    }

    /// Ends every subscriber's stream. Returns `false` if it was already closed.
    pub(crate) fn close(&self) -> bool {
        self.lock().take().is_some()
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.lock().is_none()
    }
}

/// Ordered stream of decoded items for one consumer. Ends when the view is
/// disposed.
pub struct ScanStream {
    inner: UnboundedReceiverStream<DecodedItem>,
}

impl Stream for ScanStream {
    type Item = DecodedItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
