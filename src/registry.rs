//! Connection bookkeeping shared by all connection tasks.
//!
//! The registry hands out connection ids and counts live connections and
//! disconnects. Every counter is atomic so tasks can register and leave
//! concurrently.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

/// Thread-safe connection registry.
#[derive(Debug)]
pub struct Registry {
    /// Next connection id to hand out
    next_id: AtomicU32,
    /// Connections registered and not yet disconnected
    active: AtomicUsize,
    /// Total disconnect notifications received
    disconnects: AtomicUsize,
    /// Woken on every disconnect
    disconnected: Notify,
}

impl Registry {
    /// Create a registry whose first connection id is 1.
    pub fn new() -> Arc<Self> {
        Self::with_first_id(1)
    }

    pub fn with_first_id(first_id: u32) -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU32::new(first_id),
            active: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            disconnected: Notify::new(),
        })
    }

    /// Reserve the next connection id.
    pub fn next_connection_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Register a new connection.
    ///
    /// The returned guard reports the disconnect when dropped, so it must
    /// live exactly as long as the connection.
    pub fn register(self: &Arc<Self>) -> DisconnectGuard {
        let connection_id = self.next_connection_id();
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(connection_id, active, "Connection registered");
        DisconnectGuard {
            registry: Arc::clone(self),
            connection_id,
        }
    }

    /// Record that a connection ended.
    pub fn client_disconnected(&self) {
        // never below zero
        let _ = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)));
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.disconnected.notify_waiters();
    }

    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` disconnects have been recorded.
    pub async fn wait_for_disconnects(&self, count: usize) {
        loop {
            let notified = self.disconnected.notified();
            if self.disconnect_count() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Wait until no connection is registered.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.disconnected.notified();
            if self.active_connections() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Notifies the registry exactly once, when dropped.
#[derive(Debug)]
pub struct DisconnectGuard {
    registry: Arc<Registry>,
    connection_id: u32,
}

impl DisconnectGuard {
    pub fn connection_id(&self) -> u32 {
        self.connection_id
    }
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        debug!(connection_id = self.connection_id, "Connection deregistered");
        self.registry.client_disconnected();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let registry = Registry::new();
        let a = registry.register();
        let b = registry.register();
        assert_eq!(a.connection_id(), 1);
        assert_eq!(b.connection_id(), 2);
        assert_eq!(registry.active_connections(), 2);
    }

    #[test]
    fn test_guard_notifies_once() {
        let registry = Registry::with_first_id(100);
        let guard = registry.register();
        assert_eq!(guard.connection_id(), 100);
        assert_eq!(registry.disconnect_count(), 0);

        drop(guard);
        assert_eq!(registry.disconnect_count(), 1);
        assert_eq!(registry.active_connections(), 0);
    }

    #[test]
    fn test_concurrent_guards() {
        let registry = Registry::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let guard = registry.register();
                        drop(guard);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(registry.disconnect_count(), 800);
        assert_eq!(registry.active_connections(), 0);
        assert_eq!(registry.next_connection_id(), 801);
    }

    #[tokio::test]
    async fn test_wait_for_disconnects() {
        let registry = Registry::new();
        let guard = registry.register();

        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.wait_for_disconnects(1).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        drop(guard);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_idle() {
        let registry = Registry::new();
        registry.wait_idle().await;

        let a = registry.register();
        let b = registry.register();
        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.wait_idle().await })
        };

        drop(a);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        drop(b);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
