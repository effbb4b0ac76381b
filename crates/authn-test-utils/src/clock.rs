//! Manually advanced clock for deterministic timeout tests.

use authn::clock::{Clock, Ticker};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

/// A clock that only moves when told to.
///
/// Tickers it hands out share two deliberate properties with the production
/// contract:
///
/// 1. one [`advance`](FakeClock::advance) fires at most one tick per ticker,
///    no matter how much time it covers, and
/// 2. a fired tick is dropped when the previous one has not been consumed
///    yet.
///
/// Code under test must therefore treat a tick as "a flush may now be due",
/// never as a count of elapsed intervals.
pub struct FakeClock {
    inner: Mutex<Inner>,
}

struct Inner {
    now: DateTime<Utc>,
    tickers: Vec<FakeTicker>,
}

struct FakeTicker {
    period: ChronoDuration,
    next_fire: DateTime<Utc>,
    tx: mpsc::Sender<()>,
}

impl FakeClock {
    /// Clock starting at the Unix epoch (t = 0).
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(DateTime::UNIX_EPOCH)
    }

    /// Clock starting at an arbitrary instant.
    #[must_use]
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                now,
                tickers: Vec::new(),
            }),
        }
    }

    /// Advance the clock, firing each due ticker at most once.
    pub fn advance(&self, duration: Duration) {
        let mut inner = self.inner.lock().expect("fake clock poisoned");
        let step = ChronoDuration::from_std(duration).expect("advance out of range");
        inner.now = inner.now + step;
        let now = inner.now;
        for ticker in &mut inner.tickers {
            if now >= ticker.next_fire {
                // capacity-1 channel: an unconsumed tick swallows this one
                let _ = ticker.tx.try_send(());
                ticker.next_fire = now + ticker.period;
            }
        }
        inner.tickers.retain(|ticker| !ticker.tx.is_closed());
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        self.inner.lock().expect("fake clock poisoned").now
    }

    fn ticker(&self, period: Duration) -> Ticker {
        let (tx, rx) = mpsc::channel(1);
        let mut inner = self.inner.lock().expect("fake clock poisoned");
        let period = ChronoDuration::from_std(period).expect("period out of range");
        let next_fire = inner.now + period;
        inner.tickers.push(FakeTicker {
            period,
            next_fire,
            tx,
        });
        Ticker::new(rx)
    }
}
