//! Wall-clock abstraction shared by the authenticator and the flusher.
//!
//! Production code injects [`SystemClock`]. Tests inject a manually advanced
//! clock (see `authn-test-utils`) so timeout arithmetic and flusher wakeups
//! are deterministic.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;

/// A stream of flush wakeups.
///
/// Holds at most one pending tick: producers `try_send` into a capacity-1
/// channel and drop the tick when the consumer has not caught up. A received
/// tick therefore means "a flush may now be due", never "N intervals
/// elapsed".
pub struct Ticker {
    rx: mpsc::Receiver<()>,
}

impl Ticker {
    /// Wrap a capacity-1 channel receiver.
    #[must_use]
    pub fn new(rx: mpsc::Receiver<()>) -> Self {
        Self { rx }
    }

    /// Wait for the next tick. Returns `None` when the producer is gone.
    pub async fn tick(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}

/// Time source for the authenticator and the inactivity flusher.
pub trait Clock: Send + Sync + 'static {
    /// Current wall time.
    fn now(&self) -> DateTime<Utc>;

    /// Produce a tick stream firing roughly every `period`.
    fn ticker(&self, period: Duration) -> Ticker;
}

/// Production clock: wall time plus a `tokio::time::interval` pump.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn ticker(&self, period: Duration) -> Ticker {
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // an interval yields immediately on first poll; swallow that one
            interval.tick().await;
            loop {
                interval.tick().await;
                match tx.try_send(()) {
                    Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
                    Err(mpsc::error::TrySendError::Closed(())) => return,
                }
            }
        });
        Ticker::new(rx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_now_is_current() {
        let before = Utc::now();
        let now = SystemClock.now();
        let after = Utc::now();
        assert!(before <= now && now <= after);
    }

    #[tokio::test]
    async fn test_system_clock_ticker_fires() {
        let mut ticker = SystemClock.ticker(Duration::from_millis(5));
        let tick = tokio::time::timeout(Duration::from_secs(5), ticker.tick()).await;
        assert_eq!(tick.expect("ticker did not fire"), Some(()));
    }

    #[tokio::test]
    async fn test_ticker_ends_when_producer_drops() {
        let (tx, rx) = mpsc::channel(1);
        let mut ticker = Ticker::new(rx);
        drop(tx);
        assert_eq!(ticker.tick().await, None);
    }

    #[tokio::test]
    async fn test_pending_tick_is_capped_at_one() {
        let (tx, rx) = mpsc::channel(1);
        let mut ticker = Ticker::new(rx);
        // second send overflows the single slot and is dropped
        tx.try_send(()).unwrap();
        assert!(tx.try_send(()).is_err());
        assert_eq!(ticker.tick().await, Some(()));
        assert!(tx.try_send(()).is_ok());
    }
}
