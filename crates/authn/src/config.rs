//! Inactivity-validator configuration.
//!
//! Configuration is loaded from environment variables with defaults declared
//! below; `from_vars` takes a plain map so tests never touch the process
//! environment.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default system-wide inactivity timeout in seconds, applied to clients
/// with no explicit setting. 0 leaves such clients without a timeout.
pub const DEFAULT_TIMEOUT_SECONDS: i32 = 0;

/// Default lower bound enforced on every configured client timeout.
pub const DEFAULT_MINIMUM_TIMEOUT_SECONDS: i32 = 300;

/// Environment variable for the system default timeout.
pub const ENV_DEFAULT_TIMEOUT: &str = "AUTHN_DEFAULT_INACTIVITY_TIMEOUT_SECONDS";

/// Environment variable for the enforced minimum timeout.
pub const ENV_MINIMUM_TIMEOUT: &str = "AUTHN_MINIMUM_INACTIVITY_TIMEOUT_SECONDS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

/// Timeout bounds for the inactivity validator.
#[derive(Debug, Clone, Copy)]
pub struct ValidatorConfig {
    /// Applied when a client carries no explicit timeout; 0 means none.
    pub default_timeout_seconds: i32,

    /// Lower bound enforced on all client timeouts; always positive.
    pub minimum_timeout_seconds: i32,
}

impl ValidatorConfig {
    /// Build a validated configuration.
    ///
    /// # Errors
    ///
    /// Rejects a negative default timeout and a non-positive minimum; the
    /// flush cadence is derived from the minimum and must stay meaningful.
    pub fn new(
        default_timeout_seconds: i32,
        minimum_timeout_seconds: i32,
    ) -> Result<Self, ConfigError> {
        if default_timeout_seconds < 0 {
            return Err(ConfigError::InvalidValue {
                var: ENV_DEFAULT_TIMEOUT,
                reason: format!("must be >= 0, got {default_timeout_seconds}"),
            });
        }
        if minimum_timeout_seconds <= 0 {
            return Err(ConfigError::InvalidValue {
                var: ENV_MINIMUM_TIMEOUT,
                reason: format!("must be > 0, got {minimum_timeout_seconds}"),
            });
        }
        Ok(Self {
            default_timeout_seconds,
            minimum_timeout_seconds,
        })
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for unparsable or out-of-range values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a map (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for unparsable or out-of-range values.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let default_timeout_seconds =
            parse_seconds(vars, ENV_DEFAULT_TIMEOUT, DEFAULT_TIMEOUT_SECONDS)?;
        let minimum_timeout_seconds =
            parse_seconds(vars, ENV_MINIMUM_TIMEOUT, DEFAULT_MINIMUM_TIMEOUT_SECONDS)?;
        Self::new(default_timeout_seconds, minimum_timeout_seconds)
    }

    /// Seconds between ordinary flushes.
    ///
    /// `max(1, minimum / 3)`: every token lives through at least three flush
    /// opportunities before its own deadline.
    #[must_use]
    pub fn flush_interval_seconds(&self) -> i64 {
        i64::from((self.minimum_timeout_seconds / 3).max(1))
    }

    /// [`Self::flush_interval_seconds`] as a [`Duration`].
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        #[allow(clippy::cast_sign_loss)]
        Duration::from_secs(self.flush_interval_seconds() as u64)
    }
}

fn parse_seconds(
    vars: &HashMap<String, String>,
    var: &'static str,
    default: i32,
) -> Result<i32, ConfigError> {
    match vars.get(var) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            var,
            reason: format!("expected an integer number of seconds, got {raw:?}"),
        }),
    }
}
