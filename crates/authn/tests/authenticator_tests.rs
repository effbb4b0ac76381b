//! End-to-end tests for the authentication pipeline: bearer formats, error
//! opacity, UID mismatch, group resolution and cancellation.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use authn::clock::Clock;
use authn::stores::NoopGroupMapper;
use authn::token_format::{hashed_name, TokenFormatDecoder};
use authn::{AuthnError, TokenAuthenticator};
use authn_test_utils::clock::FakeClock;
use authn_test_utils::fixtures::{token_pair, token_record, user_record};
use authn_test_utils::stores::{
    FailingGroupMapper, FakeTokenStore, FakeUserStore, StaticGroupMapper,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct Pipeline {
    clock: Arc<FakeClock>,
    tokens: Arc<FakeTokenStore>,
    users: Arc<FakeUserStore>,
}

impl Pipeline {
    fn new() -> Self {
        Self {
            clock: Arc::new(FakeClock::new()),
            tokens: Arc::new(FakeTokenStore::new()),
            users: Arc::new(FakeUserStore::new()),
        }
    }

    fn authenticator(&self) -> TokenAuthenticator {
        TokenAuthenticator::new(
            self.tokens.clone(),
            self.users.clone(),
            Arc::new(NoopGroupMapper),
            self.clock.clone(),
        )
    }
}

fn ctx() -> CancellationToken {
    CancellationToken::new()
}

#[tokio::test]
async fn test_uid_mismatch_is_loud() {
    let p = Pipeline::new();
    let pair = token_pair("tok");
    p.tokens.insert(
        token_record(&pair.storage_name, p.clock.now())
            .for_user("foo", "bar1")
            .build(),
    );
    p.users.insert(user_record("foo", "bar2"));

    let err = p
        .authenticator()
        .authenticate_token(&ctx(), &pair.bearer)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "user.UID (bar2) does not match token.userUID (bar1)"
    );
}

#[tokio::test]
async fn test_token_formats() {
    let p = Pipeline::new();

    let pair = token_pair("token");
    p.tokens.insert(
        token_record(&pair.storage_name, p.clock.now())
            .for_user("tokenUser", "tokenUserID")
            .build(),
    );
    // a legacy record, keyed by its cleartext
    p.tokens.insert(
        token_record("token2", p.clock.now())
            .for_user("token2User", "token2UserID")
            .build(),
    );
    p.users.insert(user_record("tokenUser", "tokenUserID"));
    p.users.insert(user_record("token2User", "token2UserID"));

    let authenticator = p.authenticator();
    let hash = pair.storage_name.strip_prefix("sha256~").unwrap();
    let hash2 = hashed_name("token2");
    let hash2 = hash2.strip_prefix("sha256~").unwrap();

    let cases: Vec<(&str, String, Option<&str>)> = vec![
        ("unknown", "unknown".to_string(), None),
        ("unprefixed token", "token".to_string(), None),
        ("prefixed token", "sha256~token".to_string(), Some("tokenUser")),
        ("unprefixed hash token", hash.to_string(), None),
        ("prefixed hash token", format!("sha256~{hash}"), None),
        ("unprefixed token2", "token2".to_string(), None),
        ("prefixed token2", "sha256~token2".to_string(), None),
        ("unprefixed hash token2", hash2.to_string(), None),
        ("prefixed hash token2", format!("sha256~{hash2}"), None),
    ];

    for (name, bearer, expected_user) in cases {
        let result = authenticator.authenticate_token(&ctx(), &bearer).await;
        match expected_user {
            Some(user) => {
                let identity = result.unwrap_or_else(|e| panic!("case {name}: {e}"));
                assert_eq!(identity.name, user, "case {name}");
            }
            None => {
                let err = result.err().unwrap_or_else(|| panic!("case {name} passed"));
                assert!(
                    matches!(err, AuthnError::Lookup),
                    "case {name}: expected opaque lookup error, got {err}"
                );
            }
        }
    }
}

#[tokio::test]
async fn test_not_found_and_backend_error_are_indistinguishable() {
    let p = Pipeline::new();
    p.users.insert(user_record("foo", "bar"));
    let authenticator = p.authenticator();

    let missing = authenticator
        .authenticate_token(&ctx(), "sha256~token")
        .await
        .unwrap_err();

    p.tokens.fail_gets_with("get error");
    let failing = authenticator
        .authenticate_token(&ctx(), "sha256~token")
        .await
        .unwrap_err();

    assert!(matches!(missing, AuthnError::Lookup));
    assert!(matches!(failing, AuthnError::Lookup));
    assert_eq!(missing.to_string(), failing.to_string());
}

#[tokio::test]
async fn test_expired_token_suppressed_to_lookup() {
    let p = Pipeline::new();
    let pair = token_pair("tok");
    p.tokens.insert(
        token_record(&pair.storage_name, p.clock.now())
            .expires_in(600)
            .build(),
    );
    p.users.insert(user_record("foo", "bar"));
    let authenticator = p.authenticator();

    p.clock.advance(Duration::from_secs(600));
    let err = authenticator
        .authenticate_token(&ctx(), &pair.bearer)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthnError::Lookup));
}

#[tokio::test]
async fn test_token_live_just_before_expiry() {
    let p = Pipeline::new();
    let pair = token_pair("tok");
    p.tokens.insert(
        token_record(&pair.storage_name, p.clock.now())
            .expires_in(600)
            .build(),
    );
    p.users.insert(user_record("foo", "bar"));
    let authenticator = p.authenticator();

    p.clock.advance(Duration::from_secs(599));
    assert!(authenticator
        .authenticate_token(&ctx(), &pair.bearer)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_missing_user_suppressed_to_lookup() {
    let p = Pipeline::new();
    let pair = token_pair("tok");
    p.tokens.insert(token_record(&pair.storage_name, p.clock.now()).build());

    let err = p
        .authenticator()
        .authenticate_token(&ctx(), &pair.bearer)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthnError::Lookup));
}

#[tokio::test]
async fn test_group_mapper_failure_suppressed_to_lookup() {
    let p = Pipeline::new();
    let pair = token_pair("tok");
    p.tokens.insert(token_record(&pair.storage_name, p.clock.now()).build());
    p.users.insert(user_record("foo", "bar"));

    let authenticator = TokenAuthenticator::new(
        p.tokens.clone(),
        p.users.clone(),
        Arc::new(FailingGroupMapper),
        p.clock.clone(),
    );
    let err = authenticator
        .authenticate_token(&ctx(), &pair.bearer)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthnError::Lookup));
}

#[tokio::test]
async fn test_cancelled_context_suppressed_to_lookup() {
    let p = Pipeline::new();
    let pair = token_pair("tok");
    p.tokens.insert(token_record(&pair.storage_name, p.clock.now()).build());
    p.users.insert(user_record("foo", "bar"));

    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let err = p
        .authenticator()
        .authenticate_token(&cancelled, &pair.bearer)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthnError::Lookup));
}

#[tokio::test]
async fn test_identity_carries_groups_scopes_and_audiences() {
    let p = Pipeline::new();
    let pair = token_pair("tok");
    p.tokens.insert(
        token_record(&pair.storage_name, p.clock.now())
            .for_user("alice", "uid-1")
            .with_scopes(&["user:full"])
            .with_audiences(&["control-plane"])
            .build(),
    );
    p.users.insert(user_record("alice", "uid-1"));

    let authenticator = TokenAuthenticator::new(
        p.tokens.clone(),
        p.users.clone(),
        Arc::new(StaticGroupMapper::new(vec![
            "system:authenticated".to_string()
        ])),
        p.clock.clone(),
    );
    let identity = authenticator
        .authenticate_token(&ctx(), &pair.bearer)
        .await
        .unwrap();

    assert_eq!(identity.name, "alice");
    assert_eq!(identity.uid, "uid-1");
    assert_eq!(identity.groups, vec!["system:authenticated".to_string()]);
    assert_eq!(identity.extra["scopes"], vec!["user:full".to_string()]);
    assert_eq!(identity.extra["audiences"], vec!["control-plane".to_string()]);
}

#[tokio::test]
async fn test_legacy_lookup_is_opt_in() {
    let p = Pipeline::new();
    let pair = token_pair("token");
    p.tokens.insert(
        token_record(&pair.storage_name, p.clock.now())
            .for_user("tokenUser", "tokenUserID")
            .build(),
    );
    p.tokens.insert(
        token_record("token2", p.clock.now())
            .for_user("token2User", "token2UserID")
            .build(),
    );
    p.users.insert(user_record("tokenUser", "tokenUserID"));
    p.users.insert(user_record("token2User", "token2UserID"));

    let authenticator = p
        .authenticator()
        .with_decoder(TokenFormatDecoder::new().with_legacy_lookup(true));

    // legacy records become reachable by their cleartext
    let identity = authenticator
        .authenticate_token(&ctx(), "token2")
        .await
        .unwrap();
    assert_eq!(identity.name, "token2User");

    // prefixed records stay unreachable except through the hash path
    let err = authenticator
        .authenticate_token(&ctx(), &pair.storage_name)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthnError::Lookup));
    assert!(authenticator
        .authenticate_token(&ctx(), &pair.bearer)
        .await
        .is_ok());
}
