//! Domain models shared by the storefront stores and services.

pub mod session;

pub use session::{CurrentUser, Session};
