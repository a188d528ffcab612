//! Account directory behavior: cache-aside reads, the one-account
//! invariant, and delete ordering.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use homeport_core::UserId;
use homeport_payments::AccountDirectory;
use homeport_payments::cache::{Cache, MemoryCache, account_key};
use homeport_payments::error::PaymentError;
use homeport_payments::provider::{AccountDetails, TosAcceptance};

use common::{BrokenCache, FakeProvider, MemoryProfileStore, account, profile, user};

fn directory(
    cache: Arc<dyn Cache>,
    profiles: Arc<MemoryProfileStore>,
    provider: Arc<FakeProvider>,
) -> AccountDirectory {
    AccountDirectory::new(cache, profiles, provider)
}

fn details() -> AccountDetails {
    AccountDetails {
        account_type: Some("custom".to_owned()),
        country: Some("AU".to_owned()),
        email: None,
        tos_acceptance: Some(TosAcceptance {
            date: 1_700_000_000,
            ip: "203.0.113.7".to_owned(),
        }),
    }
}

#[tokio::test]
async fn get_rejects_empty_user_id() {
    let provider = Arc::new(FakeProvider::default());
    let dir = directory(
        Arc::new(MemoryCache::new(16)),
        Arc::new(MemoryProfileStore::default()),
        provider.clone(),
    );

    let err = dir.get(&UserId::new("")).await.unwrap_err();
    assert!(matches!(err, PaymentError::InvalidInput("userId")));
    assert_eq!(provider.total_calls(), 0);
}

#[tokio::test]
async fn get_fails_without_profile() {
    let dir = directory(
        Arc::new(MemoryCache::new(16)),
        Arc::new(MemoryProfileStore::default()),
        Arc::new(FakeProvider::default()),
    );

    let err = dir.get(&UserId::new("u-1")).await.unwrap_err();
    assert!(matches!(err, PaymentError::NotFound { entity: "profile", .. }));
}

#[tokio::test]
async fn get_fails_no_account_when_profile_has_none() {
    let profiles = Arc::new(
        MemoryProfileStore::default().with_profile(profile(1, "u-1", None, None)),
    );
    let dir = directory(
        Arc::new(MemoryCache::new(16)),
        profiles,
        Arc::new(FakeProvider::default()),
    );

    let err = dir.get(&UserId::new("u-1")).await.unwrap_err();
    assert!(matches!(err, PaymentError::NoAccount(_)));
}

#[tokio::test]
async fn get_populates_cache_and_serves_second_read_from_it() {
    let cache = Arc::new(MemoryCache::new(16));
    let profiles = Arc::new(
        MemoryProfileStore::default().with_profile(profile(1, "u-1", Some("acct_1"), None)),
    );
    let provider = Arc::new(FakeProvider::default().with_account(account("acct_1")));
    let dir = directory(cache.clone(), profiles, provider.clone());

    let user_id = UserId::new("u-1");
    let first = dir.get(&user_id).await.expect("first read");
    assert_eq!(first.id.as_str(), "acct_1");
    assert_eq!(provider.retrieve_account_calls.load(Ordering::SeqCst), 1);

    // The snapshot lands under the namespaced key.
    let stored = cache.get(&account_key(&user_id)).await.unwrap();
    assert!(stored.is_some_and(|s| s.contains("acct_1")));

    // Second read is a cache hit: same value, no further provider call.
    let second = dir.get(&user_id).await.expect("second read");
    assert_eq!(second, first);
    assert_eq!(provider.retrieve_account_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn get_fails_not_found_when_provider_has_no_account() {
    let profiles = Arc::new(
        MemoryProfileStore::default().with_profile(profile(1, "u-1", Some("acct_gone"), None)),
    );
    let dir = directory(
        Arc::new(MemoryCache::new(16)),
        profiles,
        Arc::new(FakeProvider::default()),
    );

    let err = dir.get(&UserId::new("u-1")).await.unwrap_err();
    assert!(matches!(
        err,
        PaymentError::NotFound { entity: "payment account", .. }
    ));
}

#[tokio::test]
async fn get_survives_cache_write_failures() {
    let cache = Arc::new(BrokenCache::default());
    let profiles = Arc::new(
        MemoryProfileStore::default().with_profile(profile(1, "u-1", Some("acct_1"), None)),
    );
    let provider = Arc::new(FakeProvider::default().with_account(account("acct_1")));
    let dir = directory(cache.clone(), profiles, provider);

    // The failed cache write is swallowed; the read still succeeds.
    let result = dir.get(&UserId::new("u-1")).await.expect("read succeeds");
    assert_eq!(result.id.as_str(), "acct_1");
    assert_eq!(cache.set_attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn create_fails_conflict_without_provider_call() {
    let profiles = Arc::new(
        MemoryProfileStore::default().with_profile(profile(1, "u-1", Some("acct_1"), None)),
    );
    let provider = Arc::new(FakeProvider::default());
    let dir = directory(Arc::new(MemoryCache::new(16)), profiles, provider.clone());

    let err = dir.create(&UserId::new("u-1"), &details()).await.unwrap_err();
    assert!(matches!(err, PaymentError::Conflict { .. }));
    assert_eq!(provider.total_calls(), 0);
}

#[tokio::test]
async fn create_persists_account_id_and_caches_snapshot() {
    let cache = Arc::new(MemoryCache::new(16));
    let profiles = Arc::new(MemoryProfileStore::default().with_profile(profile(1, "u-1", None, None)));
    let provider = Arc::new(FakeProvider::default());
    let dir = directory(cache.clone(), profiles.clone(), provider.clone());

    let user_id = UserId::new("u-1");
    let created = dir.create(&user_id, &details()).await.expect("create");

    let stored = profiles.profile_of("u-1").unwrap();
    assert_eq!(stored.account_id.as_ref(), Some(&created.id));

    let cached = cache.get(&account_key(&user_id)).await.unwrap();
    assert!(cached.is_some_and(|s| s.contains(created.id.as_str())));

    // A subsequent get is served from the cache.
    provider.retrieve_account_calls.store(0, Ordering::SeqCst);
    let got = dir.get(&user_id).await.expect("get after create");
    assert_eq!(got.id, created.id);
    assert_eq!(provider.retrieve_account_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn create_fails_without_profile() {
    let dir = directory(
        Arc::new(MemoryCache::new(16)),
        Arc::new(MemoryProfileStore::default()),
        Arc::new(FakeProvider::default()),
    );

    let err = dir
        .create(&UserId::new("u-missing"), &details())
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::NotFound { entity: "profile", .. }));
}

#[tokio::test]
async fn delete_clears_profile_and_cache() {
    let cache = Arc::new(MemoryCache::new(16));
    let profiles = Arc::new(
        MemoryProfileStore::default()
            .with_user(user("u-1", "host@example.com", "Ada", "Lovelace"))
            .with_profile(profile(1, "u-1", Some("acct_1"), None)),
    );
    let provider = Arc::new(FakeProvider::default().with_account(account("acct_1")));
    let dir = directory(cache.clone(), profiles.clone(), provider);

    let user_id = UserId::new("u-1");
    // Warm the cache first.
    dir.get(&user_id).await.expect("warm read");
    assert!(cache.get(&account_key(&user_id)).await.unwrap().is_some());

    let confirmation = dir.delete(&user_id).await.expect("delete");
    assert!(confirmation.deleted);
    assert_eq!(confirmation.id.map(|id| id.to_string()), Some("acct_1".to_owned()));

    assert!(profiles.profile_of("u-1").unwrap().account_id.is_none());
    assert!(cache.get(&account_key(&user_id)).await.unwrap().is_none());

    // With the reference gone the next read reports no account.
    let err = dir.get(&user_id).await.unwrap_err();
    assert!(matches!(err, PaymentError::NoAccount(_)));
}

#[tokio::test]
async fn delete_without_account_is_a_noop() {
    let profiles = Arc::new(MemoryProfileStore::default().with_profile(profile(1, "u-1", None, None)));
    let provider = Arc::new(FakeProvider::default());
    let dir = directory(Arc::new(MemoryCache::new(16)), profiles, provider.clone());

    let confirmation = dir.delete(&UserId::new("u-1")).await.expect("noop delete");
    assert!(!confirmation.deleted);
    assert!(confirmation.id.is_none());
    assert_eq!(provider.total_calls(), 0);
}
