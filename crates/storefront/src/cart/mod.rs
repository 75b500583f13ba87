//! Cart store.
//!
//! The cart is a synchronous, locally persisted state machine:
//!
//! - Lines are identified by `(product_id, variant)`; adding an existing
//!   identity increments its quantity instead of duplicating the line
//! - Unit prices are snapshotted at add time and never re-fetched
//! - One discount code at a time, validated against a fixed [`DiscountTable`]
//! - Coin redemption is a flat toggle (see [`pricing::LoyaltyRules`])
//! - Totals are derived on every read via [`pricing::compute`]
//!
//! Every mutation writes the line snapshot to [`keys::CART`] and the applied
//! code and coin flag to [`keys::CART_ADJUSTMENTS`], then publishes a
//! [`CartEvent`] to subscribers.

pub mod discount;
pub mod pricing;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use bazaar_core::{Product, ProductId, VariantKey};

use crate::error::add_breadcrumb;
use crate::notice::Notice;
use crate::storage::{self, SharedStorage, keys};

pub use discount::{DiscountCode, DiscountTable};
pub use pricing::{CartTotals, LoyaltyRules};

/// Capacity of the cart event channel.
const EVENT_CAPACITY: usize = 64;

/// User input rejected by the cart. State is unchanged when returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Quantity below the minimum of one.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// Discount code not in the table.
    #[error("discount code '{0}' is not valid")]
    InvalidDiscountCode(String),

    /// Line total would exceed the largest representable amount.
    #[error("line total for {0} is too large")]
    AmountTooLarge(ProductId),
}

/// One cart entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant: VariantKey,
    pub quantity: u32,
    /// Price captured when the line was first added.
    pub unit_price: Decimal,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl CartLine {
    fn matches(&self, product_id: &ProductId, variant: &VariantKey) -> bool {
        &self.product_id == product_id && &self.variant == variant
    }

    /// `unit_price × quantity`, saturating at [`Decimal::MAX`].
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        checked_line_total(self.unit_price, self.quantity).unwrap_or(Decimal::MAX)
    }
}

fn checked_line_total(unit_price: Decimal, quantity: u32) -> Option<Decimal> {
    unit_price.checked_mul(Decimal::from(quantity))
}

/// Persisted discount code and coin flag, kept apart from the line array.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoredAdjustments {
    #[serde(skip_serializing_if = "Option::is_none")]
    discount_code: Option<String>,
    redeeming_coins: bool,
}

/// Options for [`CartStore::add_item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddItem {
    pub quantity: u32,
    pub variant: VariantKey,
    /// Ask the UI to open the cart view after adding.
    pub open_cart: bool,
}

impl Default for AddItem {
    fn default() -> Self {
        Self {
            quantity: 1,
            variant: VariantKey::default(),
            open_cart: true,
        }
    }
}

impl AddItem {
    /// Options for adds that happen without direct user intent (quick view,
    /// move from wishlist): one unit, cart view left closed.
    #[must_use]
    pub fn quiet(variant: VariantKey) -> Self {
        Self {
            quantity: 1,
            variant,
            open_cart: false,
        }
    }
}

/// Events published to cart subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// Lines or adjustments changed; re-read the store.
    Updated,
    /// The UI should open the cart view.
    OpenRequested,
    /// Message for the user.
    Notice(Notice),
}

/// The cart state machine.
pub struct CartStore {
    storage: SharedStorage,
    discounts: DiscountTable,
    loyalty: LoyaltyRules,
    lines: Vec<CartLine>,
    discount: Option<DiscountCode>,
    redeeming_coins: bool,
    events: broadcast::Sender<CartEvent>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("lines", &self.lines)
            .field("discount", &self.discount)
            .field("redeeming_coins", &self.redeeming_coins)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Hydrate a cart from storage. Missing or malformed snapshots yield an
    /// empty cart.
    #[must_use]
    pub fn load(storage: SharedStorage, discounts: DiscountTable, loyalty: LoyaltyRules) -> Self {
        let lines: Vec<CartLine> = storage::load_or_default(storage.as_ref(), keys::CART);
        let lines = sanitize(lines);

        let adjustments: StoredAdjustments =
            storage::load_or_default(storage.as_ref(), keys::CART_ADJUSTMENTS);
        let discount = adjustments.discount_code.and_then(|code| {
            let entry = discounts.lookup(&code).cloned();
            if entry.is_none() {
                tracing::warn!(code = %code, "Dropping persisted discount code no longer accepted");
            }
            entry
        });
        tracing::debug!(
            lines = lines.len(),
            discount = discount.as_ref().map(|d| d.code.as_str()),
            redeeming_coins = adjustments.redeeming_coins,
            "Cart hydrated"
        );

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            storage,
            discounts,
            loyalty,
            lines,
            discount,
            redeeming_coins: adjustments.redeeming_coins,
            events,
        }
    }

    /// Subscribe to cart events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events.subscribe()
    }

    /// Lines in display order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Find the line for an identity.
    #[must_use]
    pub fn line(&self, product_id: &ProductId, variant: &VariantKey) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.matches(product_id, variant))
    }

    /// Currently applied discount code.
    #[must_use]
    pub fn discount_code(&self) -> Option<&str> {
        self.discount.as_ref().map(|d| d.code.as_str())
    }

    #[must_use]
    pub const fn is_redeeming_coins(&self) -> bool {
        self.redeeming_coins
    }

    /// Derived totals.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        pricing::compute(
            &self.lines,
            self.discount.as_ref().map(|d| d.rate),
            self.redeeming_coins,
            &self.loyalty,
        )
    }

    /// Add `product` to the cart, merging with an existing line of the same
    /// variant. Returns the line's resulting quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `options.quantity` is zero,
    /// or `CartError::AmountTooLarge` if the line total would overflow.
    pub fn add_item(&mut self, product: &Product, options: AddItem) -> Result<u32, CartError> {
        if options.quantity == 0 {
            return Err(self.reject(CartError::InvalidQuantity));
        }

        let existing = self
            .lines
            .iter()
            .position(|l| l.matches(&product.id, &options.variant));
        let (unit_price, quantity) = match existing.and_then(|index| self.lines.get(index)) {
            Some(line) => (line.unit_price, line.quantity.saturating_add(options.quantity)),
            None => (product.price, options.quantity),
        };
        if checked_line_total(unit_price, quantity).is_none() {
            return Err(self.reject(CartError::AmountTooLarge(product.id.clone())));
        }

        if let Some(line) = existing.and_then(|index| self.lines.get_mut(index)) {
            line.quantity = quantity;
        } else {
            self.lines.push(CartLine {
                product_id: product.id.clone(),
                variant: options.variant.clone(),
                quantity: options.quantity,
                unit_price: product.price,
                title: product.title.clone(),
                handle: product.handle.clone(),
                image_url: product.image_url.clone(),
            });
        }

        tracing::info!(
            product_id = %product.id,
            variant = %options.variant,
            quantity,
            "Added to cart"
        );
        add_breadcrumb(
            "cart",
            "Added item",
            Some(&[("product_id", product.id.as_str())]),
        );

        self.commit();
        if options.open_cart {
            self.publish(CartEvent::OpenRequested);
        }
        Ok(quantity)
    }

    /// Remove the line for an identity. Returns whether a line was removed.
    pub fn remove_item(&mut self, product_id: &ProductId, variant: &VariantKey) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| !l.matches(product_id, variant));
        if self.lines.len() == before {
            return false;
        }

        tracing::info!(%product_id, %variant, "Removed from cart");
        self.commit();
        true
    }

    /// Set a line's quantity, clamped to at least one. Returns whether a
    /// line was found.
    pub fn update_quantity(
        &mut self,
        product_id: &ProductId,
        new_quantity: u32,
        variant: &VariantKey,
    ) -> bool {
        let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.matches(product_id, variant))
        else {
            return false;
        };

        line.quantity = new_quantity.max(1);
        tracing::debug!(%product_id, quantity = line.quantity, "Updated cart quantity");
        self.commit();
        true
    }

    /// Apply a discount code, replacing any code already applied. Returns
    /// the discount amount at the current subtotal.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidDiscountCode` for unknown codes; the
    /// previously applied code (if any) stays in effect.
    pub fn apply_discount(&mut self, code: &str) -> Result<Decimal, CartError> {
        let Some(entry) = self.discounts.lookup(code).cloned() else {
            tracing::debug!(code, "Rejected discount code");
            return Err(self.reject(CartError::InvalidDiscountCode(code.trim().to_string())));
        };

        let amount = pricing::code_discount(pricing::subtotal(&self.lines), entry.rate);
        tracing::info!(code = %entry.code, %amount, "Applied discount code");
        self.publish(CartEvent::Notice(Notice::success(format!(
            "Discount {} applied",
            entry.code
        ))));
        self.discount = Some(entry);
        self.commit();
        Ok(amount)
    }

    /// Clear the applied discount, if any.
    pub fn remove_discount(&mut self) {
        self.discount = None;
        self.commit();
    }

    /// Flip coin redemption. Returns the new state.
    pub fn toggle_redeem_coins(&mut self) -> bool {
        self.redeeming_coins = !self.redeeming_coins;
        tracing::debug!(redeeming = self.redeeming_coins, "Toggled coin redemption");
        self.commit();
        self.redeeming_coins
    }

    /// Empty the cart and drop all adjustments.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.discount = None;
        self.redeeming_coins = false;
        self.commit();
    }

    fn commit(&self) {
        let adjustments = StoredAdjustments {
            discount_code: self.discount.as_ref().map(|d| d.code.clone()),
            redeeming_coins: self.redeeming_coins,
        };
        let saved = storage::save_json(self.storage.as_ref(), keys::CART, &self.lines).and_then(
            |()| storage::save_json(self.storage.as_ref(), keys::CART_ADJUSTMENTS, &adjustments),
        );
        if let Err(e) = saved {
            tracing::warn!(error = %e, "Failed to persist cart");
        }
        self.publish(CartEvent::Updated);
    }

    /// Surface a rejection to subscribers and hand it back.
    fn reject(&self, err: CartError) -> CartError {
        self.publish(CartEvent::Notice(Notice::error(err.to_string())));
        err
    }

    fn publish(&self, event: CartEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Drop lines that violate invariants (zero quantity, unrepresentable line
/// total) and merge duplicate identities that a hand-edited snapshot might
/// contain.
fn sanitize(lines: Vec<CartLine>) -> Vec<CartLine> {
    let mut out: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 {
            continue;
        }
        if let Some(existing) = out
            .iter_mut()
            .find(|l| l.matches(&line.product_id, &line.variant))
        {
            let quantity = existing.quantity.saturating_add(line.quantity);
            if checked_line_total(existing.unit_price, quantity).is_some() {
                existing.quantity = quantity;
            } else {
                tracing::warn!(product_id = %line.product_id, "Dropping duplicate cart line whose total overflows");
            }
        } else if checked_line_total(line.unit_price, line.quantity).is_some() {
            out.push(line);
        } else {
            tracing::warn!(product_id = %line.product_id, "Dropping persisted cart line whose total overflows");
        }
    }
    out
}
