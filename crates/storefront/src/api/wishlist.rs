//! Account wishlist endpoints.
//!
//! - `GET    {base}/wishlist` returns `[{ "product": {...} }]`
//! - `POST   {base}/wishlist` with `{ "productId": "..." }`
//! - `DELETE {base}/wishlist/{productId}`
//!
//! Add and remove are idempotent from the caller's side: a `409 Conflict`
//! on add and a `404 Not Found` on remove both mean the server already
//! holds the desired state.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::{Product, ProductId};

use super::{ApiClient, ApiError, error_for_status};
use crate::models::Session;
use crate::wishlist::WishlistRemote;

/// One entry of the account wishlist listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub product: Product,
}

/// Body of the add request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddWishlistItem {
    pub product_id: ProductId,
}

impl ApiClient {
    /// Fetch the account wishlist.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the body cannot be parsed.
    #[instrument(skip(self, session), fields(user_id = %session.user.id))]
    pub async fn fetch_wishlist(&self, session: &Session) -> Result<Vec<Product>, ApiError> {
        let url = self.endpoint(&["wishlist"])?;
        let response = self
            .http()
            .get(url)
            .bearer_auth(session.bearer_token())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let body = response.text().await?;
        let entries: Vec<WishlistEntry> = serde_json::from_str(&body)?;
        tracing::debug!(items = entries.len(), "Fetched account wishlist");
        Ok(entries.into_iter().map(|entry| entry.product).collect())
    }

    /// Add a product to the account wishlist.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails. An already-present product
    /// is not an error.
    #[instrument(skip(self, session), fields(user_id = %session.user.id))]
    pub async fn add_to_wishlist(
        &self,
        session: &Session,
        product_id: &ProductId,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["wishlist"])?;
        let response = self
            .http()
            .post(url)
            .bearer_auth(session.bearer_token())
            .json(&AddWishlistItem {
                product_id: product_id.clone(),
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::CONFLICT {
            return Ok(());
        }
        Err(error_for_status(response).await)
    }

    /// Remove a product from the account wishlist.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails. An already-absent product
    /// is not an error.
    #[instrument(skip(self, session), fields(user_id = %session.user.id))]
    pub async fn remove_from_wishlist(
        &self,
        session: &Session,
        product_id: &ProductId,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["wishlist", product_id.as_str()])?;
        let response = self
            .http()
            .delete(url)
            .bearer_auth(session.bearer_token())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(error_for_status(response).await)
    }
}

impl WishlistRemote for ApiClient {
    async fn fetch(&self, session: &Session) -> Result<Vec<Product>, ApiError> {
        self.fetch_wishlist(session).await
    }

    async fn add(&self, session: &Session, product_id: &ProductId) -> Result<(), ApiError> {
        self.add_to_wishlist(session, product_id).await
    }

    async fn remove(&self, session: &Session, product_id: &ProductId) -> Result<(), ApiError> {
        self.remove_from_wishlist(session, product_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_listing_wire_format() {
        let body = r#"[
            {"product": {"id": "tee", "title": "Tee", "price": "19.99"}},
            {"product": {"id": "mug", "title": "Mug", "price": "8", "imageUrl": "https://cdn/mug.png"}}
        ]"#;
        let entries: Vec<WishlistEntry> = serde_json::from_str(body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].product.price, Decimal::new(1999, 2));
        assert_eq!(
            entries[1].product.image_url.as_deref(),
            Some("https://cdn/mug.png")
        );
    }

    #[test]
    fn test_add_body_uses_product_id_key() {
        let body = serde_json::to_value(AddWishlistItem {
            product_id: ProductId::new("tee"),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "productId": "tee" }));
    }
}
