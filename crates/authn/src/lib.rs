//! Bearer-token authentication for the cluster control plane.
//!
//! Presented with an opaque bearer string, [`TokenAuthenticator`] decides
//! whether the string names a live access-token record whose owning user
//! still exists, and returns the user's identity on success. Every failure
//! mode except two is collapsed into a single opaque lookup error so callers
//! probing bearer strings cannot distinguish "no such token" from a failing
//! backend; the deliberate exceptions are inactivity timeouts and user-UID
//! mismatches, which name real states of the world rather than secrets.
//!
//! Inactivity tracking is handled by
//! [`validators::InactivityValidator`], which records per-token activity in
//! memory and batch-persists "last seen" deadlines from a background flusher
//! task. See its module documentation for the flush and emergency-flush
//! semantics.

#![warn(clippy::pedantic)]

/// Module for the authentication pipeline
pub mod authenticator;

/// Module for the wall-clock abstraction
pub mod clock;

/// Module for validator configuration
pub mod config;

/// Module for error types and the error-opacity shell
pub mod errors;

/// Module for record and identity types
pub mod models;

/// Module for the storage seams consumed by the pipeline
pub mod stores;

/// Module for bearer-string to storage-name decoding
pub mod token_format;

/// Module for token validators (UID consistency, inactivity timeout)
pub mod validators;

pub use authenticator::TokenAuthenticator;
pub use config::ValidatorConfig;
pub use errors::{AuthnError, StoreError};
pub use models::Identity;
