//! Bazaar storefront library.
//!
//! Client-side state for a storefront: the cart with its pricing rules, the
//! guest/account wishlist with optimistic remote sync, and the local
//! storage both persist to. Auth and checkout are mocked services on top.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod error;
pub mod models;
pub mod notice;
pub mod services;
pub mod storage;
pub mod wishlist;
