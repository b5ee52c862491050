// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Latest-value state cells shared between components and their observers.
//!
//! Every component publishes its current state (device profile, cache
//! metrics, GPU snapshot, thermal state, rendering quality) through an
//! [`Observable`]. A subscriber that joins late immediately sees the most
//! recent value and then every later update.

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Publisher side of a "current value + future updates" channel.
#[derive(Debug)]
pub struct Observable<T> {
    tx: watch::Sender<T>,
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Clone of the latest published value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Replace the current value and wake every subscriber.
    ///
    /// Works even when nobody is subscribed yet.
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Replace the value only when it differs, returning whether it changed.
    pub fn set_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    /// Mutate the value in place and notify subscribers.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        self.tx.send_modify(f);
    }

    /// Receiver positioned at the latest value.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Stream yielding the latest value first, then each update.
    pub fn stream(&self) -> WatchStream<T> {
        WatchStream::new(self.tx.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T> Default for Observable<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_get_returns_initial_value() {
        let cell = Observable::new(7u32);
        assert_eq!(cell.get(), 7);
    }

    #[test]
    fn test_set_without_subscribers() {
        let cell = Observable::new(1u32);
        cell.set(2);
        assert_eq!(cell.get(), 2);
    }

    #[test]
    fn test_set_if_changed() {
        let cell = Observable::new("a".to_string());
        assert!(!cell.set_if_changed("a".to_string()));
        assert!(cell.set_if_changed("b".to_string()));
        assert_eq!(cell.get(), "b");
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_latest_then_updates() {
        let cell = Observable::new(0u32);
        cell.set(5);

        let mut stream = cell.stream();
        assert_eq!(stream.next().await, Some(5));

        cell.set(6);
        assert_eq!(stream.next().await, Some(6));
    }

    #[tokio::test]
    async fn test_subscribe_receiver_changed() {
        let cell = Observable::new(0u32);
        let mut rx = cell.subscribe();
        assert_eq!(*rx.borrow(), 0);

        cell.update(|v| *v += 3);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 3);
        assert_eq!(cell.subscriber_count(), 1);
    }
}
