//! Mocked checkout.
//!
//! Validates contact details, snapshots the cart, waits out a simulated
//! payment delay and clears the cart. No order is stored anywhere; the
//! returned [`OrderConfirmation`] is the only record.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use bazaar_core::{Email, OrderId};

use crate::cart::{CartLine, CartStore, CartTotals};
use crate::config::CheckoutConfig;
use crate::error::add_breadcrumb;

/// Errors that can occur when placing an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// Nothing to order.
    #[error("your cart is empty")]
    EmptyCart,

    /// A contact or address field is missing or malformed.
    #[error("invalid shipping details: {0}")]
    InvalidDetails(String),
}

/// How the order is paid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Card,
    Upi,
    CashOnDelivery,
}

impl PaymentMethod {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Card => "Card",
            Self::Upi => "UPI",
            Self::CashOnDelivery => "Cash on delivery",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "card" => Ok(Self::Card),
            "upi" => Ok(Self::Upi),
            "cod" | "cash_on_delivery" => Ok(Self::CashOnDelivery),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

/// Contact and delivery details entered at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShippingDetails {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
}

impl ShippingDetails {
    /// Check every field, returning the parsed contact email.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidDetails` naming the first bad field.
    pub fn validate(&self) -> Result<Email, CheckoutError> {
        let required = [
            ("full name", &self.full_name),
            ("address", &self.address),
            ("city", &self.city),
            ("postal code", &self.postal_code),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(CheckoutError::InvalidDetails(format!("{field} is required")));
        }

        let email = Email::parse(&self.email)
            .map_err(|e| CheckoutError::InvalidDetails(format!("email: {e}")))?;

        let digits = self.phone.chars().filter(char::is_ascii_digit).count();
        let phone_ok = self
            .phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
        if !phone_ok || !(7..=15).contains(&digits) {
            return Err(CheckoutError::InvalidDetails(
                "phone number must have 7 to 15 digits".to_string(),
            ));
        }

        Ok(email)
    }
}

/// Receipt for a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub order_id: OrderId,
    pub placed_at: DateTime<Utc>,
    pub email: Email,
    pub lines: Vec<CartLine>,
    pub discount_code: Option<String>,
    pub totals: CartTotals,
    pub payment_method: PaymentMethod,
}

impl OrderConfirmation {
    /// Loyalty coins credited for this order.
    #[must_use]
    pub const fn earned_coins(&self) -> u64 {
        self.totals.earned_coins
    }
}

/// Places mocked orders.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckoutService {
    config: CheckoutConfig,
}

impl CheckoutService {
    #[must_use]
    pub const fn new(config: CheckoutConfig) -> Self {
        Self { config }
    }

    /// Place an order for the current cart and empty it.
    ///
    /// The cart is left untouched when validation fails.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` for an empty cart, or
    /// `CheckoutError::InvalidDetails` if `details` do not validate.
    #[instrument(skip_all, fields(payment = ?payment_method))]
    pub async fn place_order(
        &self,
        cart: &mut CartStore,
        details: &ShippingDetails,
        payment_method: PaymentMethod,
    ) -> Result<OrderConfirmation, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let email = details.validate()?;

        let confirmation = OrderConfirmation {
            order_id: OrderId::generate(),
            placed_at: Utc::now(),
            email,
            lines: cart.lines().to_vec(),
            discount_code: cart.discount_code().map(str::to_owned),
            totals: cart.totals(),
            payment_method,
        };

        tokio::time::sleep(self.config.processing_delay).await;
        cart.clear();

        tracing::info!(
            order_id = %confirmation.order_id,
            total = %confirmation.totals.total,
            earned_coins = confirmation.earned_coins(),
            "Order placed"
        );
        let order_id = confirmation.order_id.to_string();
        add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));
        Ok(confirmation)
    }
}
