//! Services layered over the stores.
//!
//! - [`auth`] - mocked one-time-code login producing a [`Session`]
//! - [`checkout`] - mocked order placement over a [`CartStore`]
//!
//! [`Session`]: crate::models::Session
//! [`CartStore`]: crate::cart::CartStore

pub mod auth;
pub mod checkout;

pub use auth::{AuthError, IssuedCode, OtpAuthService};
pub use checkout::{CheckoutError, CheckoutService, OrderConfirmation, PaymentMethod, ShippingDetails};
