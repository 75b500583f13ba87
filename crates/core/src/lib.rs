//! Bazaar Core - Shared types library.
//!
//! This crate provides common types used across all Bazaar components:
//! - `storefront` - Cart, wishlist, checkout and session state
//! - `cli` - Command-line driver over the storefront stores
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, products and variants

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
