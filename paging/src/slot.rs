//! One-slot, latest-wins hand-off between the producer and the consumer.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

struct Inner<T> {
    value: Option<T>,
    closed: bool,
}

pub(crate) struct LatestSlot<T> {
    inner: Mutex<Inner<T>>,
    notify: Notify,
}

impl<T> LatestSlot<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                value: None,
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `value`, replacing any unconsumed one. Never blocks on the
    /// consumer. Returns `true` if an older value was dropped.
    pub(crate) fn publish(&self, value: T) -> bool {
        let superseded = {
            let mut inner = self.lock();
            if inner.closed {
                return false;
            }
            inner.value.replace(value).is_some()
        };
        self.notify.notify_one();
        superseded
    }

    /// No further values will be published. A pending value is still
    /// delivered.
    pub(crate) fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_one();
    }

    /// Wait for the next value; `None` once closed and drained.
    pub(crate) async fn take(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            {
                let mut inner = self.lock();
                if let Some(value) = inner.value.take() {
                    return Some(value);
                }
                if inner.closed {
                    return None;
                }
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn newer_value_supersedes_unconsumed() {
        let slot = LatestSlot::new();
        assert!(!slot.publish(1));
        assert!(slot.publish(2));
        assert!(slot.publish(3));
        assert_eq!(slot.take().await, Some(3));
    }

    #[tokio::test]
    async fn close_drains_then_ends() {
        let slot = LatestSlot::new();
        slot.publish("last");
        slot.close();
        assert!(!slot.publish("ignored"));
        assert_eq!(slot.take().await, Some("last"));
        assert_eq!(slot.take().await, None);
    }

    #[tokio::test]
    async fn take_wakes_on_publish() {
        let slot = Arc::new(LatestSlot::new());
        let waiter = {
            let slot = Arc::clone(&slot);
            tokio::spawn(async move { slot.take().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        slot.publish(7);

        let got = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter woke")
            .expect("join");
        assert_eq!(got, Some(7));
    }
}
