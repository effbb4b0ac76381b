//! Inactivity-timeout tracking for access tokens.
//!
//! Every successful validation records a "last seen" observation in an
//! in-memory pending map; a background flusher drains the map on a ticker
//! and persists the resulting deadlines, so a hot token does not write to
//! storage on every request. A token whose stored deadline would pass before
//! the flusher can reliably get to it triggers an out-of-band emergency
//! flush.
//!
//! The owning client's configuration is resolved on every validation, so a
//! raised, lowered or disabled client timeout takes effect at read time and
//! is persisted by the next flush.
//!
//! # Shutdown
//!
//! [`InactivityValidator::run`] exits within one wakeup of its cancellation
//! token firing. Observations still pending at shutdown are lost; the
//! token's next use re-records them.

use super::TokenValidator;
use crate::clock::Clock;
use crate::config::ValidatorConfig;
use crate::errors::{AuthnError, StoreError};
use crate::models::{AccessTokenRecord, UserRecord};
use crate::stores::{AccessTokenStore, ClientLister};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[cfg(any(test, feature = "test-utils"))]
use tokio::sync::mpsc::UnboundedSender;

/// Ticks of headroom granted to the ordinary flush cadence before an
/// observation is considered too urgent to wait: one tick possibly already
/// in flight plus the three ticks that fit into the shortest permitted
/// timeout.
const EMERGENCY_HORIZON_TICKS: i64 = 4;

/// One observation of a token, queued for persistence.
#[derive(Debug, Clone)]
struct TokenActivity {
    token_name: String,
    client_name: String,
    creation_timestamp: DateTime<Utc>,
    seen_at: DateTime<Utc>,
    /// Effective timeout at observation time; 0 records a disablement.
    timeout_seconds: i32,
}

/// Tracks token activity and answers "has this token gone inactive?".
///
/// `validate` is cheap and reentrant: it resolves the effective timeout from
/// the owning client, checks the deadline, and queues an observation. The
/// persistence work happens in [`InactivityValidator::run`], which the host
/// spawns as a single background task.
pub struct InactivityValidator {
    tokens: Arc<dyn AccessTokenStore>,
    clients: Arc<dyn ClientLister>,
    config: ValidatorConfig,
    clock: Arc<dyn Clock>,

    /// Latest observation per token since the last flush. Locked only for
    /// single inserts and the drain, never across I/O.
    pending: Mutex<HashMap<String, TokenActivity>>,

    /// One-slot flush request; repeated signals collapse into one wakeup.
    emergency: Notify,

    #[cfg(any(test, feature = "test-utils"))]
    flush_signal: Mutex<Option<UnboundedSender<()>>>,
    #[cfg(any(test, feature = "test-utils"))]
    observe_signal: Mutex<Option<UnboundedSender<()>>>,
}

impl InactivityValidator {
    pub fn new(
        tokens: Arc<dyn AccessTokenStore>,
        clients: Arc<dyn ClientLister>,
        config: ValidatorConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tokens,
            clients,
            config,
            clock,
            pending: Mutex::new(HashMap::new()),
            emergency: Notify::new(),
            #[cfg(any(test, feature = "test-utils"))]
            flush_signal: Mutex::new(None),
            #[cfg(any(test, feature = "test-utils"))]
            observe_signal: Mutex::new(None),
        }
    }

    /// Run the flusher until `cancel` fires.
    ///
    /// Wakes on the ordinary ticker and on emergency signals; every wakeup
    /// drains the pending map. Ticks may be dropped while a flush is in
    /// flight, so a wakeup means "a flush may now be due", never a count of
    /// elapsed intervals.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            target: "authn.inactivity",
            flush_interval_seconds = self.config.flush_interval_seconds(),
            "Starting inactivity flusher"
        );

        let mut ticker = self.clock.ticker(self.config.flush_interval());

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = self.emergency.notified() => self.flush().await,
                tick = ticker.tick() => {
                    if tick.is_none() {
                        warn!(target: "authn.inactivity", "Tick source closed, stopping flusher");
                        break;
                    }
                    self.flush().await;
                }
            }
        }

        info!(target: "authn.inactivity", "Inactivity flusher stopped");
    }

    /// Resolve the timeout that applies to `token` right now from its owning
    /// client's configuration, bounded below by the system minimum.
    async fn effective_timeout(&self, token: &AccessTokenRecord) -> Result<i32, AuthnError> {
        let client = self.clients.get(&token.client_name).await?;
        Ok(match client.access_token_inactivity_timeout_seconds {
            None => self.config.default_timeout_seconds,
            Some(0) => 0,
            Some(seconds) => seconds.max(self.config.minimum_timeout_seconds),
        })
    }

    /// Wall time past which `token` is inactive, as currently known.
    ///
    /// The persisted deadline is authoritative. An observation still pending
    /// for this token, or a persisted value of zero under a client whose
    /// timeout is positive, bumps it forward to the effective timeout.
    fn deadline(&self, token: &AccessTokenRecord, timeout_seconds: i32) -> DateTime<Utc> {
        let observed = {
            let pending = self.pending.lock().expect("pending map poisoned");
            pending.contains_key(&token.name)
        };
        let persisted = token.inactivity_timeout_seconds;
        let seconds = if observed || persisted == 0 {
            persisted.max(timeout_seconds)
        } else {
            persisted
        };
        token.creation_timestamp + ChronoDuration::seconds(i64::from(seconds))
    }

    /// Queue an observation for the flusher, coalescing to the latest per
    /// token, and request an emergency flush when the deadline the store
    /// currently believes cannot wait for the ticker.
    fn record(&self, token: &AccessTokenRecord, seen_at: DateTime<Utc>, timeout_seconds: i32) {
        let activity = TokenActivity {
            token_name: token.name.clone(),
            client_name: token.client_name.clone(),
            creation_timestamp: token.creation_timestamp,
            seen_at,
            timeout_seconds,
        };

        {
            let mut pending = self.pending.lock().expect("pending map poisoned");
            match pending.entry(activity.token_name.clone()) {
                Entry::Occupied(mut entry) => {
                    if activity.seen_at >= entry.get().seen_at {
                        entry.insert(activity);
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(activity);
                }
            }
        }

        #[cfg(any(test, feature = "test-utils"))]
        self.signal(&self.observe_signal);

        let horizon = seen_at
            + ChronoDuration::seconds(
                self.config.flush_interval_seconds() * EMERGENCY_HORIZON_TICKS,
            );
        if token.inactivity_deadline() < horizon {
            debug!(
                target: "authn.inactivity",
                token = %token.name,
                client = %token.client_name,
                "Stored deadline falls inside the flush horizon, forcing flush"
            );
            self.emergency.notify_one();
        }
    }

    /// Drain the pending map and persist every observation.
    ///
    /// A failure on one token is logged and its entry dropped; the token's
    /// next successful validation re-enqueues it. The flusher itself never
    /// terminates over a single token.
    async fn flush(&self) {
        let drained: Vec<TokenActivity> = {
            let mut pending = self.pending.lock().expect("pending map poisoned");
            pending.drain().map(|(_, activity)| activity).collect()
        };

        let total = drained.len();
        let mut flushed = 0usize;
        for activity in drained {
            match self.persist(&activity).await {
                Ok(()) => flushed += 1,
                Err(err) => {
                    warn!(
                        target: "authn.inactivity",
                        token = %activity.token_name,
                        client = %activity.client_name,
                        error = %err,
                        "Dropping activity update after persist failure"
                    );
                }
            }
        }
        if total > 0 {
            debug!(target: "authn.inactivity", flushed, total, "Flush complete");
        }

        #[cfg(any(test, feature = "test-utils"))]
        self.signal(&self.flush_signal);
    }

    /// Write one observation's deadline through to the store.
    async fn persist(&self, activity: &TokenActivity) -> Result<(), StoreError> {
        let new_timeout = if activity.timeout_seconds == 0 {
            // the owning client disabled the timeout; clear the deadline
            0
        } else {
            let active_for = (activity.seen_at - activity.creation_timestamp).num_seconds();
            let deadline = active_for.saturating_add(i64::from(activity.timeout_seconds));
            #[allow(clippy::cast_possible_truncation)]
            {
                deadline.clamp(0, i64::from(i32::MAX)) as i32
            }
        };

        // Re-read before writing: another instance, or an earlier flush, may
        // already have advanced the deadline past ours.
        let mut record = self.tokens.get(&activity.token_name).await?;
        if new_timeout == 0 && record.inactivity_timeout_seconds == 0 {
            return Ok(());
        }
        if new_timeout != 0 && record.inactivity_timeout_seconds >= new_timeout {
            return Ok(());
        }
        record.inactivity_timeout_seconds = new_timeout;
        self.tokens.update(record).await
    }

    #[cfg(any(test, feature = "test-utils"))]
    fn signal(&self, slot: &Mutex<Option<UnboundedSender<()>>>) {
        if let Some(tx) = slot.lock().expect("signal slot poisoned").as_ref() {
            let _ = tx.send(());
        }
    }

    /// Register a channel signalled after every completed flush, so a test
    /// can block until the flusher has drained instead of sleeping.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn set_flush_signal(&self, tx: UnboundedSender<()>) {
        *self.flush_signal.lock().expect("signal slot poisoned") = Some(tx);
    }

    /// Register a channel signalled after every recorded observation.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn set_observe_signal(&self, tx: UnboundedSender<()>) {
        *self.observe_signal.lock().expect("signal slot poisoned") = Some(tx);
    }

    /// Drain and persist immediately, without going through the flusher
    /// task. Test-only.
    #[cfg(any(test, feature = "test-utils"))]
    pub async fn flush_now(&self) {
        self.flush().await;
    }
}

#[async_trait]
impl TokenValidator for InactivityValidator {
    async fn validate(
        &self,
        token: &AccessTokenRecord,
        _user: &UserRecord,
    ) -> Result<(), AuthnError> {
        let timeout_seconds = self.effective_timeout(token).await?;
        let now = self.clock.now();

        if timeout_seconds == 0 {
            // Timeout disabled for this client. If the record still carries a
            // deadline, queue a disablement so a flush clears it; once it
            // reads zero there is nothing left to persist.
            if token.inactivity_timeout_seconds != 0 {
                self.record(token, now, 0);
            }
            return Ok(());
        }

        if now > self.deadline(token, timeout_seconds) {
            debug!(
                target: "authn.inactivity",
                token = %token.name,
                client = %token.client_name,
                "Token inactivity window has closed"
            );
            return Err(AuthnError::Timedout);
        }

        self.record(token, now, timeout_seconds);
        Ok(())
    }
}
