//! One-shot signal: set, then consume

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tracing::debug;

/// Latched notification flag with a single consumer
///
/// `set` latches the flag and wakes waiters. `consume` suspends until the
/// flag is latched and clears it on the way out. Setting an already latched
/// signal is a no-op, so one set pairs with exactly one consume.
#[derive(Debug)]
pub struct Signal {
    name: &'static str,
    flag: AtomicBool,
    notify: Notify,
}

impl Signal {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            flag: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Latch the flag and wake every waiter
    pub fn set(&self) {
        debug!(signal = self.name, "Signal::set: called");
        self.flag.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Suspend until the flag is latched, then clear it
    pub async fn consume(&self) {
        loop {
            // Register before checking so a set between the check and the
            // await still wakes us.
            let notified = self.notify.notified();
            if self.flag.swap(false, Ordering::AcqRel) {
                debug!(signal = self.name, "Signal::consume: consumed");
                return;
            }
            debug!(signal = self.name, "Signal::consume: suspending");
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
    async fn test_consume_returns_after_set() {
        let signal = Arc::new(Signal::new("test"));
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.consume().await })
        };

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        signal.set();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("consume should return after set")
            .unwrap();
        assert!(!signal.is_set());
    }

    #[tokio::test]
    async fn test_set_before_consume_is_latched() {
        let signal = Signal::new("latched");
        signal.set();
        assert!(signal.is_set());

        tokio::time::timeout(Duration::from_millis(100), signal.consume())
            .await
            .expect("latched signal should not block");
        assert!(!signal.is_set());
    }

    #[tokio::test]
    async fn test_second_consume_blocks_until_next_set() {
        let signal = Signal::new("once");
        signal.set();
        signal.consume().await;

        let blocked = tokio::time::timeout(Duration::from_millis(50), signal.consume()).await;
        assert!(blocked.is_err(), "second consume must wait for another set");
    }

    #[tokio::test]
    async fn test_double_set_pairs_with_single_consume() {
        let signal = Signal::new("double");
        signal.set();
        signal.set();
        signal.consume().await;

        let blocked = tokio::time::timeout(Duration::from_millis(50), signal.consume()).await;
        assert!(blocked.is_err());
    }
}
