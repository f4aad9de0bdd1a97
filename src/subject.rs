//! Observable value with replay of the latest state
//!
//! A [`Subject`] stores the current value and broadcasts every change.
//! Subscribers first receive the value current at subscription time, then
//! every later publication in order. Publishing and subscribing are
//! serialized, so a subscriber never misses or duplicates the value that was
//! current when it subscribed.

use async_stream::stream;
use futures::Stream;
use std::pin::Pin;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Boxed stream returned by [`Subject::subscribe`]
pub type Ticks<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Capacity of the change buffer per subscriber
const CHANNEL_CAPACITY: usize = 64;

/// Single-writer observable value
#[derive(Debug)]
pub struct Subject<T> {
    value: Mutex<T>,
    tx: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> Subject<T> {
    /// Create a subject holding `initial`
    pub fn new(initial: T) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            value: Mutex::new(initial),
            tx,
        }
    }

    /// Current value
    pub fn value(&self) -> T {
        self.value
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the value and notify subscribers
    pub fn publish(&self, value: T) {
        let mut current = self
            .value
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = value.clone();

        // Broadcast state change (ignore error if no listeners)
        let _ = self.tx.send(value);
    }

    /// Stream of the current value followed by every change.
    ///
    /// A subscriber that falls more than the channel capacity behind loses
    /// the oldest changes and resumes with the ones still buffered.
    pub fn subscribe(&self) -> Ticks<T> {
        let (initial, mut rx) = {
            let current = self
                .value
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            (current.clone(), self.tx.subscribe())
        };

        Box::pin(stream! {
            // Yield initial state first
            yield initial;

            // Then yield all future state changes
            loop {
                match rx.recv().await {
                    Ok(value) => {
                        yield value;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber lagged, dropping oldest changes");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_subscribe_yields_current_value_first() {
        let subject = Subject::new(1);
        subject.publish(2);

        let mut ticks = subject.subscribe();
        assert_eq!(ticks.next().await, Some(2));
    }

    #[tokio::test]
    async fn test_subscribe_yields_every_change_in_order() {
        let subject = Subject::new(false);
        let mut ticks = subject.subscribe();

        subject.publish(true);
        subject.publish(false);

        assert_eq!(ticks.next().await, Some(false));
        assert_eq!(ticks.next().await, Some(true));
        assert_eq!(ticks.next().await, Some(false));
    }

    #[tokio::test]
    async fn test_stream_ends_when_subject_dropped() {
        let subject = Subject::new(0u8);
        let mut ticks = subject.subscribe();
        drop(subject);

        assert_eq!(ticks.next().await, Some(0));
        assert_eq!(ticks.next().await, None);
    }

    #[test]
    fn test_value_tracks_publish() {
        let subject = Subject::new("a".to_string());
        subject.publish("b".to_string());
        assert_eq!(subject.value(), "b");
    }
}
