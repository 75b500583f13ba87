//! Stores and services shared by every command.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::broadcast;

use bazaar_core::Price;
use bazaar_storefront::api::ApiClient;
use bazaar_storefront::cart::{CartEvent, CartStore, DiscountTable};
use bazaar_storefront::config::StorefrontConfig;
use bazaar_storefront::error::{StorefrontError, set_sentry_user};
use bazaar_storefront::models::Session;
use bazaar_storefront::notice::{Notice, NoticeLevel};
use bazaar_storefront::storage::{FileStorage, SharedStorage};
use bazaar_storefront::wishlist::{WishlistEvent, WishlistMode, WishlistStore};

pub struct Context {
    pub config: StorefrontConfig,
    pub storage: SharedStorage,
    pub cart: CartStore,
    pub wishlist: WishlistStore<ApiClient>,
    cart_events: broadcast::Receiver<CartEvent>,
    wishlist_events: broadcast::Receiver<WishlistEvent>,
}

impl Context {
    /// Open file storage and restore the cart, session and wishlist.
    pub fn open(config: StorefrontConfig) -> Result<Self, StorefrontError> {
        let storage: SharedStorage = Arc::new(FileStorage::open(config.data_dir.clone())?);
        let api = ApiClient::new(&config.api)?;

        let session = Session::load(storage.as_ref());
        if let Some(session) = &session {
            set_sentry_user(&session.user.id, Some(session.user.email.as_str()));
        }

        let cart = CartStore::load(
            Arc::clone(&storage),
            DiscountTable::default(),
            config.loyalty,
        );
        let wishlist = WishlistStore::new(api, Arc::clone(&storage), session);

        tracing::debug!(
            data_dir = %config.data_dir.display(),
            mode = ?wishlist.mode(),
            "Storefront state loaded"
        );

        Ok(Self {
            cart_events: cart.subscribe(),
            wishlist_events: wishlist.subscribe(),
            config,
            storage,
            cart,
            wishlist,
        })
    }

    /// Format an amount in the store currency.
    pub fn price(&self, amount: Decimal) -> String {
        Price::new(amount, self.config.currency).display()
    }

    /// Load the account wishlist when signed in. Guest wishlists are local.
    pub async fn sync_wishlist(&self) -> Result<(), StorefrontError> {
        if self.wishlist.mode() == WishlistMode::Account {
            self.wishlist.refresh().await?;
        }
        Ok(())
    }

    /// Print everything the stores told the user during this command.
    pub fn print_notices(&mut self) {
        while let Ok(event) = self.cart_events.try_recv() {
            match event {
                CartEvent::Notice(notice) => print_notice(&notice),
                CartEvent::OpenRequested => {
                    let totals = self.cart.totals();
                    tracing::info!(
                        "Cart: {} item(s), total {}",
                        totals.item_count,
                        self.price(totals.total)
                    );
                }
                CartEvent::Updated => {}
            }
        }
        while let Ok(event) = self.wishlist_events.try_recv() {
            if let WishlistEvent::Notice(notice) = event {
                print_notice(&notice);
            }
        }
    }
}

fn print_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Success => tracing::info!("✓ {}", notice.message),
        NoticeLevel::Info => tracing::info!("{}", notice.message),
        NoticeLevel::Error => tracing::info!("✗ {}", notice.message),
    }
}
