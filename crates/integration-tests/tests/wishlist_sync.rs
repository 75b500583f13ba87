//! Wishlist sync against the account API over HTTP.
//!
//! Each test starts its own in-process mock API on an ephemeral port.

use std::sync::Arc;

use bazaar_core::ProductId;
use bazaar_integration_tests::{MockAccountApi, product};
use bazaar_storefront::api::{ApiClient, ApiError};
use bazaar_storefront::storage::{MemoryStorage, keys};
use bazaar_storefront::wishlist::{WishlistError, WishlistMode, WishlistStore};

async fn api() -> MockAccountApi {
    MockAccountApi::start([
        product("tee", 2499),
        product("mug", 1200),
        product("cap", 1800),
        product("a/b", 500),
    ])
    .await
}

fn ids(store: &WishlistStore<ApiClient>) -> Vec<String> {
    store.items().iter().map(|p| p.id.to_string()).collect()
}

#[tokio::test]
async fn test_account_add_and_remove_reach_server() {
    let api = api().await;
    let session = api.register_user("shopper@example.com");
    let client = ApiClient::new(&api.config()).expect("client");
    let store = WishlistStore::new(client, Arc::new(MemoryStorage::new()), Some(session.clone()));

    store.add(product("tee", 2499)).await.expect("add tee");
    store.add(product("mug", 1200)).await.expect("add mug");
    assert_eq!(api.wishlist(&session), vec!["tee", "mug"]);

    store.remove(&ProductId::new("tee")).await.expect("remove tee");
    assert_eq!(api.wishlist(&session), vec!["mug"]);
    assert_eq!(ids(&store), vec!["mug"]);
}

#[tokio::test]
async fn test_refresh_loads_server_listing() {
    let api = api().await;
    let session = api.register_user("shopper@example.com");
    api.seed(&session, &["cap", "tee"]);

    let client = ApiClient::new(&api.config()).expect("client");
    let store = WishlistStore::new(client, Arc::new(MemoryStorage::new()), Some(session));

    assert_eq!(store.refresh().await.expect("refresh"), 2);
    assert_eq!(ids(&store), vec!["cap", "tee"]);
    let cap = &store.items()[0];
    assert_eq!(cap.title, "Product cap");
}

#[tokio::test]
async fn test_server_error_reverts_optimistic_add() {
    let api = api().await;
    let session = api.register_user("shopper@example.com");
    api.fail_product("cap");

    let client = ApiClient::new(&api.config()).expect("client");
    let store = WishlistStore::new(client, Arc::new(MemoryStorage::new()), Some(session.clone()));

    let err = store.add(product("cap", 1800)).await.expect_err("add should fail");
    assert!(matches!(
        err,
        WishlistError::Sync {
            source: ApiError::Api { status: 500, .. },
            ..
        }
    ));
    assert!(!store.contains(&ProductId::new("cap")));
    assert!(api.wishlist(&session).is_empty());
}

#[tokio::test]
async fn test_already_synced_states_are_not_errors() {
    let api = api().await;
    let session = api.register_user("shopper@example.com");
    api.seed(&session, &["tee"]);

    let client = ApiClient::new(&api.config()).expect("client");

    // 409 on a duplicate add
    client
        .add_to_wishlist(&session, &ProductId::new("tee"))
        .await
        .expect("duplicate add is accepted");
    // 404 on removing an absent product
    client
        .remove_from_wishlist(&session, &ProductId::new("mug"))
        .await
        .expect("absent remove is accepted");

    assert_eq!(api.wishlist(&session), vec!["tee"]);
}

#[tokio::test]
async fn test_product_ids_are_path_encoded() {
    let api = api().await;
    let session = api.register_user("shopper@example.com");
    let client = ApiClient::new(&api.config()).expect("client");
    let store = WishlistStore::new(client, Arc::new(MemoryStorage::new()), Some(session.clone()));

    store.add(product("a/b", 500)).await.expect("add");
    store.remove(&ProductId::new("a/b")).await.expect("remove");

    assert!(api.wishlist(&session).is_empty());
    assert!(api.requests().contains(&"DELETE /api/wishlist/a/b".to_string()));
}

#[tokio::test]
async fn test_unknown_session_is_unauthorized() {
    let api = api().await;
    let stranger = api.register_user("stranger@example.com");
    // A second server never saw this token
    let other = MockAccountApi::start([product("tee", 2499)]).await;

    let client = ApiClient::new(&other.config()).expect("client");
    let store = WishlistStore::new(client, Arc::new(MemoryStorage::new()), Some(stranger));

    assert!(matches!(
        store.refresh().await,
        Err(WishlistError::Fetch(ApiError::Unauthorized))
    ));
}

#[tokio::test]
async fn test_login_merges_guest_wishlist_into_account() {
    let api = api().await;
    let session = api.register_user("shopper@example.com");
    api.seed(&session, &["cap", "tee"]);

    let storage = Arc::new(MemoryStorage::new());
    let client = ApiClient::new(&api.config()).expect("client");
    let store = WishlistStore::new(client, storage.clone(), None);

    store.add(product("tee", 2499)).await.expect("guest add tee");
    store.add(product("mug", 1200)).await.expect("guest add mug");
    assert!(api.requests().is_empty(), "guest mode must not call the API");

    let report = store.login(session.clone()).await.expect("login");

    // "tee" was already saved (409) and still counts as merged
    assert_eq!(report.merged.len(), 2);
    assert!(report.failed.is_empty());
    assert!(report.refreshed);
    assert_eq!(store.mode(), WishlistMode::Account);
    assert_eq!(api.wishlist(&session), vec!["cap", "tee", "mug"]);
    assert_eq!(ids(&store), vec!["cap", "tee", "mug"]);
    assert!(!storage.contains(keys::GUEST_WISHLIST));
}

#[tokio::test]
async fn test_login_keeps_going_when_one_merge_fails() {
    let api = api().await;
    let session = api.register_user("shopper@example.com");
    api.fail_product("mug");

    let client = ApiClient::new(&api.config()).expect("client");
    let store = WishlistStore::new(client, Arc::new(MemoryStorage::new()), None);
    store.add(product("mug", 1200)).await.expect("guest add mug");
    store.add(product("cap", 1800)).await.expect("guest add cap");

    let report = store.login(session.clone()).await.expect("login");

    assert_eq!(report.failed, vec![ProductId::new("mug")]);
    assert_eq!(report.merged, vec![ProductId::new("cap")]);
    assert_eq!(api.wishlist(&session), vec!["cap"]);
    assert_eq!(ids(&store), vec!["cap"]);
}

#[tokio::test]
async fn test_logout_after_login_returns_to_empty_guest() {
    let api = api().await;
    let session = api.register_user("shopper@example.com");
    api.seed(&session, &["tee"]);

    let storage = Arc::new(MemoryStorage::new());
    let client = ApiClient::new(&api.config()).expect("client");
    let store = WishlistStore::new(client, storage.clone(), None);
    store.login(session.clone()).await.expect("login");
    assert_eq!(ids(&store), vec!["tee"]);

    store.logout();
    assert_eq!(store.mode(), WishlistMode::Guest);
    assert!(store.is_empty());

    // Guest changes no longer touch the account
    store.add(product("cap", 1800)).await.expect("guest add");
    assert_eq!(api.wishlist(&session), vec!["tee"]);
    assert!(storage.contains(keys::GUEST_WISHLIST));
}
