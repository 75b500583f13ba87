//! Wishlist store.
//!
//! # Modes
//!
//! - **Guest** - items live in local storage under [`keys::GUEST_WISHLIST`];
//!   every change is written through, no network calls
//! - **Account** - items mirror the remote account wishlist; changes are
//!   applied optimistically and confirmed in the background through a
//!   [`WishlistRemote`], reverting on failure
//!
//! [`WishlistStore::login`] performs the one-shot guest → account merge;
//! [`WishlistStore::logout`] starts a fresh, empty guest wishlist.
//!
//! # Ordering
//!
//! Mutations are serialized per product via [`KeyedLock`]: a second toggle
//! of the same product waits for the first to settle and then decides
//! against the settled state. Mutations also hold a store-wide gate in
//! shared mode; [`WishlistStore::refresh`] and [`WishlistStore::login`]
//! take it exclusively, so a listing is never fetched while a change is
//! still awaiting confirmation and no change starts mid-merge. Every
//! login/logout bumps a mode epoch, and optimistic applies/reverts only
//! touch state from the epoch they started in, so a late failure from a
//! previous session cannot resurrect items.

pub mod keyed_lock;
pub mod optimistic;

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{RwLock, broadcast};
use tracing::instrument;

use bazaar_core::{Product, ProductId, VariantKey};

use crate::api::ApiError;
use crate::cart::{AddItem, CartError, CartStore};
use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::models::Session;
use crate::notice::Notice;
use crate::storage::{self, SharedStorage, keys};

pub use keyed_lock::KeyedLock;

/// Capacity of the wishlist event channel.
const EVENT_CAPACITY: usize = 64;

/// Remote account wishlist.
///
/// Implemented by [`crate::api::ApiClient`]; tests substitute in-memory fakes.
pub trait WishlistRemote: Send + Sync {
    /// List the account wishlist.
    fn fetch(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<Vec<Product>, ApiError>> + Send;

    /// Add a product. Adding a present product must succeed.
    fn add(
        &self,
        session: &Session,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Remove a product. Removing an absent product must succeed.
    fn remove(
        &self,
        session: &Session,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Errors returned by wishlist operations.
#[derive(Debug, Error)]
pub enum WishlistError {
    /// Background confirmation failed; the local change was reverted.
    #[error("could not sync wishlist change for {product_id}: {source}")]
    Sync {
        product_id: ProductId,
        #[source]
        source: ApiError,
    },

    /// Fetching the account wishlist failed.
    #[error("could not load account wishlist: {0}")]
    Fetch(#[source] ApiError),

    /// `login` called while already in account mode.
    #[error("wishlist is already bound to an account")]
    AlreadyAuthenticated,

    /// Account-only operation called in guest mode.
    #[error("wishlist is in guest mode")]
    NotAuthenticated,

    /// Product is not in the wishlist.
    #[error("product {0} is not in the wishlist")]
    NotFound(ProductId),

    /// Cart rejected the moved item.
    #[error(transparent)]
    Cart(#[from] CartError),
}

/// Which backing the wishlist currently uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WishlistMode {
    Guest,
    Account,
}

/// Events published to wishlist subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WishlistEvent {
    /// Items or mode changed; re-read the store.
    Updated,
    /// Message for the user.
    Notice(Notice),
}

/// Outcome of the guest → account merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Guest items the remote accepted.
    pub merged: Vec<ProductId>,
    /// Guest items the remote rejected (not retried).
    pub failed: Vec<ProductId>,
    /// Whether the account wishlist was fetched afterwards.
    pub refreshed: bool,
}

enum Backing {
    Guest,
    Account(Session),
}

struct State {
    backing: Backing,
    items: Vec<Product>,
    epoch: u64,
}

/// What an account-mode mutation must confirm, and how to undo it.
#[derive(Clone)]
struct Ticket<U> {
    session: Session,
    epoch: u64,
    undo: U,
}

/// The wishlist store. Cheaply cloneable; clones share state.
pub struct WishlistStore<R> {
    inner: Arc<Inner<R>>,
}

struct Inner<R> {
    remote: R,
    storage: SharedStorage,
    state: Mutex<State>,
    /// Shared by mutations, exclusive for refresh and login.
    gate: RwLock<()>,
    locks: KeyedLock<ProductId>,
    events: broadcast::Sender<WishlistEvent>,
}

impl<R> Clone for WishlistStore<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> std::fmt::Debug for WishlistStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock_state();
        f.debug_struct("WishlistStore")
            .field("mode", &state.mode())
            .field("items", &state.items.len())
            .field("epoch", &state.epoch)
            .finish_non_exhaustive()
    }
}

impl State {
    const fn mode(&self) -> WishlistMode {
        match self.backing {
            Backing::Guest => WishlistMode::Guest,
            Backing::Account(_) => WishlistMode::Account,
        }
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.items.iter().position(|p| &p.id == product_id)
    }
}

impl<R> Inner<R> {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: WishlistEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn persist_guest(&self, items: &[Product]) {
        if let Err(e) = storage::save_json(self.storage.as_ref(), keys::GUEST_WISHLIST, items) {
            tracing::warn!(error = %e, "Failed to persist guest wishlist");
        }
    }

    /// Undo an optimistic change if the mode epoch is unchanged.
    fn revert(&self, epoch: u64, product_id: &ProductId, undo: impl FnOnce(&mut Vec<Product>)) {
        {
            let mut state = self.lock_state();
            if state.epoch != epoch {
                tracing::debug!(%product_id, "Skipping revert from a previous session");
                return;
            }
            undo(&mut state.items);
        }

        tracing::warn!(%product_id, "Reverted wishlist change after sync failure");
        add_breadcrumb(
            "wishlist",
            "Reverted optimistic change",
            Some(&[("product_id", product_id.as_str())]),
        );
        self.publish(WishlistEvent::Updated);
        self.publish(WishlistEvent::Notice(Notice::error(
            "We couldn't update your wishlist. Please try again.",
        )));
    }
}

impl<R> WishlistStore<R>
where
    R: WishlistRemote,
{
    /// Create a store. With a session the store starts in account mode with
    /// an empty view (call [`refresh`](Self::refresh) to load it); without
    /// one it hydrates the guest wishlist from storage.
    #[must_use]
    pub fn new(remote: R, storage: SharedStorage, session: Option<Session>) -> Self {
        let (backing, items) = match session {
            Some(session) => (Backing::Account(session), Vec::new()),
            None => {
                let items: Vec<Product> =
                    storage::load_or_default(storage.as_ref(), keys::GUEST_WISHLIST);
                (Backing::Guest, dedupe(items))
            }
        };

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                remote,
                storage,
                state: Mutex::new(State {
                    backing,
                    items,
                    epoch: 0,
                }),
                gate: RwLock::new(()),
                locks: KeyedLock::new(),
                events,
            }),
        }
    }

    /// Subscribe to wishlist events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WishlistEvent> {
        self.inner.events.subscribe()
    }

    #[must_use]
    pub fn mode(&self) -> WishlistMode {
        self.inner.lock_state().mode()
    }

    /// Snapshot of the items in display order.
    #[must_use]
    pub fn items(&self) -> Vec<Product> {
        self.inner.lock_state().items.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock_state().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock_state().items.is_empty()
    }

    /// Membership against the latest (possibly optimistic) state.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.inner.lock_state().position(product_id).is_some()
    }

    /// Add a product.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Sync` if the account wishlist rejected the
    /// change; the item has been removed again by then.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add(&self, product: Product) -> Result<(), WishlistError> {
        let _gate = self.inner.gate.read().await;
        let _key = self.inner.locks.lock(product.id.clone()).await;
        self.add_locked(product).await
    }

    /// Remove a product.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Sync` if the account wishlist rejected the
    /// change; the item has been restored by then.
    #[instrument(skip(self))]
    pub async fn remove(&self, product_id: &ProductId) -> Result<(), WishlistError> {
        let _gate = self.inner.gate.read().await;
        let _key = self.inner.locks.lock(product_id.clone()).await;
        self.remove_locked(product_id).await
    }

    /// Add the product if absent, remove it if present. Returns whether the
    /// product is in the wishlist afterwards.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Sync` if the change was reverted.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn toggle(&self, product: Product) -> Result<bool, WishlistError> {
        let _gate = self.inner.gate.read().await;
        let _key = self.inner.locks.lock(product.id.clone()).await;
        if self.contains(&product.id) {
            let product_id = product.id;
            self.remove_locked(&product_id).await?;
            Ok(false)
        } else {
            self.add_locked(product).await?;
            Ok(true)
        }
    }

    /// Move a wishlist item into the cart without opening the cart view,
    /// then drop it from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::NotFound` if the product is not in the
    /// wishlist, or `WishlistError::Sync` if the removal was reverted (the
    /// cart keeps the item in that case).
    #[instrument(skip(self, cart))]
    pub async fn move_to_cart(
        &self,
        product_id: &ProductId,
        variant: VariantKey,
        cart: &mut CartStore,
    ) -> Result<(), WishlistError> {
        let _gate = self.inner.gate.read().await;
        let _key = self.inner.locks.lock(product_id.clone()).await;
        let product = {
            let state = self.inner.lock_state();
            state
                .position(product_id)
                .and_then(|index| state.items.get(index).cloned())
        }
        .ok_or_else(|| WishlistError::NotFound(product_id.clone()))?;

        cart.add_item(&product, AddItem::quiet(variant))?;
        self.remove_locked(product_id).await
    }

    /// Bind the wishlist to an account, merging guest items into it.
    ///
    /// Each guest item is submitted individually; failures are logged and
    /// reported but not rolled back. The guest snapshot is then cleared and
    /// the account wishlist fetched as the new source of truth. Waits for
    /// in-flight mutations first and holds off new ones until done.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::AlreadyAuthenticated` if already in account
    /// mode. A failed fetch is reported through `MergeReport::refreshed`.
    #[instrument(skip_all, fields(user_id = %session.user.id))]
    pub async fn login(&self, session: Session) -> Result<MergeReport, WishlistError> {
        let _gate = self.inner.gate.write().await;
        let guest_items = {
            let mut state = self.inner.lock_state();
            if matches!(state.backing, Backing::Account(_)) {
                return Err(WishlistError::AlreadyAuthenticated);
            }
            state.backing = Backing::Account(session.clone());
            state.epoch += 1;
            state.items.clone()
        };

        set_sentry_user(&session.user.id, Some(session.user.email.as_str()));

        let mut report = MergeReport::default();
        for product in &guest_items {
            match self.inner.remote.add(&session, &product.id).await {
                Ok(()) => report.merged.push(product.id.clone()),
                Err(e) => {
                    tracing::warn!(product_id = %product.id, error = %e, "Failed to merge guest wishlist item");
                    report.failed.push(product.id.clone());
                }
            }
        }

        if let Err(e) = self.inner.storage.remove(keys::GUEST_WISHLIST) {
            tracing::warn!(error = %e, "Failed to clear guest wishlist");
        }

        match self.refresh_exclusive().await {
            Ok(_) => report.refreshed = true,
            Err(e) => {
                tracing::warn!(error = %e, "Account wishlist unavailable after login");
                self.inner.publish(WishlistEvent::Notice(Notice::error(
                    "We couldn't load your saved wishlist.",
                )));
            }
        }

        if !report.failed.is_empty() {
            self.inner.publish(WishlistEvent::Notice(Notice::error(format!(
                "{} wishlist item(s) could not be saved to your account.",
                report.failed.len()
            ))));
        }

        tracing::info!(
            merged = report.merged.len(),
            failed = report.failed.len(),
            refreshed = report.refreshed,
            "Guest wishlist merged into account"
        );
        self.inner.publish(WishlistEvent::Updated);
        Ok(report)
    }

    /// Drop the account binding and start an empty guest wishlist.
    pub fn logout(&self) {
        {
            let mut state = self.inner.lock_state();
            state.backing = Backing::Guest;
            state.epoch += 1;
            state.items.clear();
        }
        if let Err(e) = self.inner.storage.remove(keys::GUEST_WISHLIST) {
            tracing::warn!(error = %e, "Failed to reset guest wishlist");
        }
        clear_sentry_user();
        tracing::info!("Wishlist switched to guest mode");
        self.inner.publish(WishlistEvent::Updated);
    }

    /// Replace the local view with the account wishlist. Returns the number
    /// of items loaded.
    ///
    /// Pending mutations are confirmed or reverted before the listing is
    /// fetched; mutations issued meanwhile wait for the refresh.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::NotAuthenticated` in guest mode, or
    /// `WishlistError::Fetch` if the remote call fails (the view is kept).
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<usize, WishlistError> {
        let _gate = self.inner.gate.write().await;
        self.refresh_exclusive().await
    }

    /// [`refresh`](Self::refresh) body; the caller holds the gate exclusively.
    async fn refresh_exclusive(&self) -> Result<usize, WishlistError> {
        let (session, epoch) = {
            let state = self.inner.lock_state();
            match &state.backing {
                Backing::Account(session) => (session.clone(), state.epoch),
                Backing::Guest => return Err(WishlistError::NotAuthenticated),
            }
        };

        let products = self
            .inner
            .remote
            .fetch(&session)
            .await
            .map_err(WishlistError::Fetch)?;
        let products = dedupe(products);
        let count = products.len();

        {
            let mut state = self.inner.lock_state();
            if state.epoch != epoch {
                return Ok(state.items.len());
            }
            state.items = products;
        }

        tracing::debug!(items = count, "Account wishlist loaded");
        self.inner.publish(WishlistEvent::Updated);
        Ok(count)
    }

    async fn add_locked(&self, product: Product) -> Result<(), WishlistError> {
        let product_id = product.id.clone();
        let inner = &self.inner;

        let result = optimistic::run(
            || {
                let mut state = inner.lock_state();
                if state.position(&product.id).is_some() {
                    return None;
                }
                state.items.push(product);
                let ticket = match &state.backing {
                    Backing::Guest => {
                        inner.persist_guest(&state.items);
                        None
                    }
                    Backing::Account(session) => Some(Ticket {
                        session: session.clone(),
                        epoch: state.epoch,
                        undo: (),
                    }),
                };
                drop(state);

                inner.publish(WishlistEvent::Updated);
                inner.publish(WishlistEvent::Notice(Notice::success("Added to wishlist")));
                ticket
            },
            |ticket| {
                let product_id = product_id.clone();
                async move { inner.remote.add(&ticket.session, &product_id).await }
            },
            |ticket, _| {
                inner.revert(ticket.epoch, &product_id, |items| {
                    items.retain(|p| p.id != product_id);
                });
            },
        )
        .await;

        result.map(|_| ()).map_err(|source| WishlistError::Sync {
            product_id: product_id.clone(),
            source,
        })
    }

    async fn remove_locked(&self, product_id: &ProductId) -> Result<(), WishlistError> {
        let inner = &self.inner;

        let result = optimistic::run(
            || {
                let mut state = inner.lock_state();
                let index = state.position(product_id)?;
                let removed = state.items.remove(index);
                let ticket = match &state.backing {
                    Backing::Guest => {
                        inner.persist_guest(&state.items);
                        None
                    }
                    Backing::Account(session) => Some(Ticket {
                        session: session.clone(),
                        epoch: state.epoch,
                        undo: (index, removed),
                    }),
                };
                drop(state);

                inner.publish(WishlistEvent::Updated);
                inner.publish(WishlistEvent::Notice(Notice::info("Removed from wishlist")));
                ticket
            },
            |ticket| async move { inner.remote.remove(&ticket.session, product_id).await },
            |ticket, _| {
                let (index, product) = ticket.undo;
                inner.revert(ticket.epoch, product_id, |items| {
                    if !items.iter().any(|p| p.id == product.id) {
                        items.insert(index.min(items.len()), product);
                    }
                });
            },
        )
        .await;

        result.map(|_| ()).map_err(|source| WishlistError::Sync {
            product_id: product_id.clone(),
            source,
        })
    }
}

/// Keep the first occurrence of each product ID.
fn dedupe(products: Vec<Product>) -> Vec<Product> {
    let mut out: Vec<Product> = Vec::with_capacity(products.len());
    for product in products {
        if !out.iter().any(|p| p.id == product.id) {
            out.push(product);
        }
    }
    out
}
