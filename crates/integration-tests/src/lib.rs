//! Integration test harness for Bazaar.
//!
//! [`MockAccountApi`] serves the account wishlist endpoints from memory on
//! an ephemeral port, so the real [`ApiClient`] can be exercised over HTTP
//! without any external service.
//!
//! ```rust,ignore
//! let api = MockAccountApi::start(catalog).await;
//! let token = api.register_user();
//! let client = ApiClient::new(&api.config())?;
//! ```
//!
//! [`ApiClient`]: bazaar_storefront::api::ApiClient

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{delete, get};
use axum::{Json, Router};
use rust_decimal::Decimal;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use bazaar_core::{Email, Product, ProductId, UserId};
use bazaar_storefront::api::{AddWishlistItem, WishlistEntry};
use bazaar_storefront::config::ApiConfig;
use bazaar_storefront::models::{CurrentUser, Session};

#[derive(Default)]
struct ApiState {
    catalog: HashMap<ProductId, Product>,
    wishlists: Mutex<HashMap<String, Vec<ProductId>>>,
    failing: Mutex<HashSet<ProductId>>,
    requests: Mutex<Vec<String>>,
}

impl ApiState {
    fn record(&self, request: String) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }

    fn is_failing(&self, product_id: &ProductId) -> bool {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(product_id)
    }

    fn wishlists(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<ProductId>>> {
        self.wishlists.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-process account API.
pub struct MockAccountApi {
    addr: SocketAddr,
    state: Arc<ApiState>,
    server: JoinHandle<()>,
}

impl MockAccountApi {
    /// Bind an ephemeral port and serve `catalog`.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start(catalog: impl IntoIterator<Item = Product>) -> Self {
        let state = Arc::new(ApiState {
            catalog: catalog.into_iter().map(|p| (p.id.clone(), p)).collect(),
            ..ApiState::default()
        });

        let app = Router::new()
            .route("/api/wishlist", get(list_wishlist).post(add_to_wishlist))
            .route("/api/wishlist/{product_id}", delete(remove_from_wishlist))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock API listener");
        let addr = listener.local_addr().expect("Mock API has no local address");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL clients should use.
    ///
    /// # Panics
    ///
    /// Never in practice; the address always forms a valid URL.
    #[must_use]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/api", self.addr)).expect("Mock API URL is valid")
    }

    #[must_use]
    pub fn config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Create an account with an empty wishlist and return its session.
    ///
    /// # Panics
    ///
    /// Panics if `email` is not a valid address.
    #[must_use]
    pub fn register_user(&self, email: &str) -> Session {
        let token = format!("token-{}", UserId::generate());
        self.state.wishlists().insert(token.clone(), Vec::new());
        Session::new(
            CurrentUser {
                id: UserId::generate(),
                email: Email::parse(email).expect("test email is valid"),
            },
            SecretString::from(token),
        )
    }

    /// Replace a user's server-side wishlist.
    pub fn seed(&self, session: &Session, ids: &[&str]) {
        self.state.wishlists().insert(
            session.bearer_token().to_string(),
            ids.iter().map(|id| ProductId::new(*id)).collect(),
        );
    }

    /// Server-side wishlist for `session`, in insertion order.
    #[must_use]
    pub fn wishlist(&self, session: &Session) -> Vec<String> {
        self.state
            .wishlists()
            .get(session.bearer_token())
            .map(|ids| ids.iter().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    /// Make every add/remove of `product_id` fail with a 500.
    pub fn fail_product(&self, product_id: &str) {
        self.state
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(ProductId::new(product_id));
    }

    /// Requests served so far, as `"METHOD path"`.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for MockAccountApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Catalog product with a fixed price.
#[must_use]
pub fn product(id: &str, price_cents: i64) -> Product {
    Product::new(ProductId::new(id), format!("Product {id}"), Decimal::new(price_cents, 2))
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_owned)
}

/// Resolve the caller's token to a registered account.
fn authorize(state: &ApiState, headers: &HeaderMap) -> Result<String, StatusCode> {
    let token = bearer(headers).ok_or(StatusCode::UNAUTHORIZED)?;
    if state.wishlists().contains_key(&token) {
        Ok(token)
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

async fn list_wishlist(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<WishlistEntry>>, StatusCode> {
    state.record("GET /api/wishlist".to_string());
    let token = authorize(&state, &headers)?;

    let ids = state.wishlists().get(&token).cloned().unwrap_or_default();
    let entries = ids
        .iter()
        .filter_map(|id| state.catalog.get(id).cloned())
        .map(|product| WishlistEntry { product })
        .collect();
    Ok(Json(entries))
}

async fn add_to_wishlist(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(body): Json<AddWishlistItem>,
) -> StatusCode {
    state.record(format!("POST /api/wishlist {}", body.product_id));
    let token = match authorize(&state, &headers) {
        Ok(token) => token,
        Err(status) => return status,
    };
    if state.is_failing(&body.product_id) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    if !state.catalog.contains_key(&body.product_id) {
        return StatusCode::NOT_FOUND;
    }

    let mut wishlists = state.wishlists();
    let ids = wishlists.entry(token).or_default();
    if ids.contains(&body.product_id) {
        return StatusCode::CONFLICT;
    }
    ids.push(body.product_id);
    StatusCode::CREATED
}

async fn remove_from_wishlist(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> StatusCode {
    state.record(format!("DELETE /api/wishlist/{product_id}"));
    let token = match authorize(&state, &headers) {
        Ok(token) => token,
        Err(status) => return status,
    };
    let product_id = ProductId::new(product_id);
    if state.is_failing(&product_id) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }

    let mut wishlists = state.wishlists();
    let ids = wishlists.entry(token).or_default();
    let before = ids.len();
    ids.retain(|id| id != &product_id);
    if ids.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}
