//! Cart, guest wishlist and session surviving a restart on disk.

use std::sync::Arc;

use rust_decimal::Decimal;
use secrecy::SecretString;

use bazaar_core::{Email, ProductId, UserId, VariantKey};
use bazaar_integration_tests::{MockAccountApi, product};
use bazaar_storefront::api::ApiClient;
use bazaar_storefront::cart::{AddItem, CartStore, DiscountTable, LoyaltyRules};
use bazaar_storefront::models::{CurrentUser, Session};
use bazaar_storefront::storage::{FileStorage, LocalStorage, SharedStorage, keys};
use bazaar_storefront::wishlist::{WishlistMode, WishlistStore};

fn open(dir: &tempfile::TempDir) -> SharedStorage {
    Arc::new(FileStorage::open(dir.path()).expect("open storage"))
}

fn load_cart(storage: SharedStorage) -> CartStore {
    CartStore::load(storage, DiscountTable::default(), LoyaltyRules::default())
}

#[test]
fn test_cart_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let medium = VariantKey::new(Some("M"), None);

    {
        let mut cart = load_cart(open(&dir));
        cart.add_item(
            &product("tee", 2000),
            AddItem {
                quantity: 2,
                variant: medium.clone(),
                open_cart: false,
            },
        )
        .expect("add tee");
        cart.add_item(&product("mug", 1250), AddItem::default())
            .expect("add mug");
        cart.apply_discount("SAVE20").expect("discount");
        cart.toggle_redeem_coins();
    }

    let cart = load_cart(open(&dir));
    assert_eq!(cart.lines().len(), 2);
    assert_eq!(
        cart.line(&ProductId::new("tee"), &medium)
            .expect("tee line")
            .quantity,
        2
    );

    let totals = cart.totals();
    assert_eq!(totals.subtotal, Decimal::new(5250, 2));
    assert_eq!(totals.discount_amount, Decimal::new(1050, 2));
    assert_eq!(cart.discount_code(), Some("SAVE20"));
    assert!(cart.is_redeeming_coins());
    // 52.50 - 10.50 - 100 clamps to zero
    assert_eq!(totals.total, Decimal::ZERO);
    assert!(dir.path().join("cart.adjustments.json").exists());
}

#[test]
fn test_corrupt_cart_file_starts_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = open(&dir);
    storage
        .set(keys::CART, "{ definitely not a cart")
        .expect("write garbage");

    let cart = load_cart(storage);
    assert!(cart.is_empty());
}

#[tokio::test]
async fn test_guest_wishlist_survives_restart() {
    let api = MockAccountApi::start([product("tee", 2499)]).await;
    let dir = tempfile::tempdir().expect("tempdir");

    {
        let client = ApiClient::new(&api.config()).expect("client");
        let store = WishlistStore::new(client, open(&dir), None);
        store.add(product("tee", 2499)).await.expect("add");
        store.add(product("cap", 1800)).await.expect("add");
        store.remove(&ProductId::new("tee")).await.expect("remove");
    }

    let client = ApiClient::new(&api.config()).expect("client");
    let store = WishlistStore::new(client, open(&dir), None);
    assert_eq!(store.mode(), WishlistMode::Guest);
    let ids: Vec<String> = store.items().iter().map(|p| p.id.to_string()).collect();
    assert_eq!(ids, vec!["cap"]);
    assert!(api.requests().is_empty());
}

#[test]
fn test_session_round_trips_through_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let session = Session::new(
        CurrentUser {
            id: UserId::generate(),
            email: Email::parse("shopper@example.com").expect("email"),
        },
        SecretString::from("secret-token".to_string()),
    );
    session.save(open(&dir).as_ref()).expect("save session");

    let restored = Session::load(open(&dir).as_ref()).expect("session on disk");
    assert_eq!(restored.user, session.user);
    assert_eq!(restored.bearer_token(), "secret-token");

    Session::forget(open(&dir).as_ref()).expect("forget");
    assert!(Session::load(open(&dir).as_ref()).is_none());
}
