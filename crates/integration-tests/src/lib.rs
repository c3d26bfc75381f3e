//! Integration tests for Threadline.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p threadline-integration-tests
//! ```
//!
//! Every test starts its own [`TestBackend`]: an `axum` server on an
//! ephemeral local port that speaks the backend's envelope format. The
//! code under test talks to it through the real `reqwest` transport.
//!
//! # Test Categories
//!
//! - `token_refresh` - Single-flight refresh over real HTTP
//! - `storefront_flow` - Login, catalog, cart, wishlist, checkout
//! - `admin_products` - Back-office product management

#![allow(clippy::missing_panics_doc)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use threadline_admin::AdminProducts;
use threadline_client::{
    ApiClient, ClientConfig, CredentialStore, REQUEST_ID_HEADER, SessionEvents,
};
use threadline_storefront::Storefront;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

/// Password the fake backend accepts for every account.
pub const PASSWORD: &str = "correct-horse";

/// Email that logs in as an administrator.
pub const ADMIN_EMAIL: &str = "admin@threadline.test";

/// One request as the backend saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub bearer: Option<String>,
    pub request_id: Option<String>,
}

/// Mutable state of the fake backend.
pub struct BackendState {
    valid_token: Mutex<Option<String>>,
    refresh_token: Mutex<Option<String>>,
    admin: Mutex<bool>,
    refresh_calls: AtomicUsize,
    refresh_gate: watch::Sender<bool>,
    refresh_rejects: Mutex<bool>,
    products: Mutex<Vec<Value>>,
    cart: Mutex<Vec<Value>>,
    wishlist: Mutex<Vec<String>>,
    orders: Mutex<Vec<Value>>,
    seen: Mutex<Vec<SeenRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            valid_token: Mutex::new(None),
            refresh_token: Mutex::new(None),
            admin: Mutex::new(false),
            refresh_calls: AtomicUsize::new(0),
            refresh_gate: watch::Sender::new(true),
            refresh_rejects: Mutex::new(false),
            products: Mutex::new(seed_products()),
            cart: Mutex::new(Vec::new()),
            wishlist: Mutex::new(Vec::new()),
            orders: Mutex::new(Vec::new()),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl BackendState {
    /// Issue a session directly, as if the user had logged in earlier.
    pub fn issue_session(&self, access: &str, refresh: &str) {
        *lock(&self.valid_token) = Some(access.to_string());
        *lock(&self.refresh_token) = Some(refresh.to_string());
    }

    /// Make the current access token stop working.
    pub fn expire_access_token(&self) {
        *lock(&self.valid_token) = Some("expired-on-server".to_string());
    }

    /// Grant or revoke admin rights for the session.
    pub fn set_admin(&self, admin: bool) {
        *lock(&self.admin) = admin;
    }

    /// Park refresh calls until [`Self::release_refresh`].
    pub fn hold_refresh(&self) {
        self.refresh_gate.send_replace(false);
    }

    pub fn release_refresh(&self) {
        self.refresh_gate.send_replace(true);
    }

    /// Answer every refresh call with 401.
    pub fn reject_refresh(&self) {
        *lock(&self.refresh_rejects) = true;
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Requests to `path`, oldest first.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<SeenRequest> {
        lock(&self.seen)
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn product(&self, id: &str) -> Option<Value> {
        lock(&self.products).iter().find(|p| p["_id"] == id).cloned()
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let valid = lock(&self.valid_token).clone();
        match (bearer(headers), valid) {
            (Some(sent), Some(valid)) if sent == valid => Ok(()),
            _ => Err(fail(StatusCode::UNAUTHORIZED, "jwt expired")),
        }
    }

    fn authorize_admin(&self, headers: &HeaderMap) -> Result<(), Response> {
        self.authorize(headers)?;
        if *lock(&self.admin) {
            Ok(())
        } else {
            Err(fail(StatusCode::FORBIDDEN, "Admin access required"))
        }
    }
}

fn seed_products() -> Vec<Value> {
    vec![
        json!({
            "_id": "p1", "name": "Linen Shirt", "description": "Breathable summer shirt",
            "category": "shirts", "price": 2000, "discountedPrice": 1500, "stock": 5,
            "status": "active", "sizes": ["S", "M", "L"], "colors": ["white", "blue"],
            "createdAt": "2024-01-10T00:00:00Z"
        }),
        json!({
            "_id": "p2", "name": "Cotton Tee", "description": "Everyday crew neck",
            "category": "t-shirts", "price": 800, "stock": 10, "status": "active",
            "sizes": ["S", "M"], "colors": ["black"], "createdAt": "2024-02-01T00:00:00Z"
        }),
        json!({
            "_id": "p3", "name": "Silk Saree", "description": "Handwoven silk",
            "category": "sarees", "price": 9000, "discountedPrice": 4500, "stock": 2,
            "status": "active", "sizes": ["Free"], "colors": ["red"],
            "createdAt": "2024-03-05T00:00:00Z"
        }),
        json!({
            "_id": "p4", "name": "Denim Jacket", "description": "Classic cotton denim",
            "category": "jackets", "price": 3500, "discountedPrice": 3150, "stock": 0,
            "status": "active", "sizes": ["M", "L"], "colors": ["blue"],
            "createdAt": "2024-01-20T00:00:00Z"
        }),
        json!({
            "_id": "p5", "name": "Archived Scarf", "category": "accessories", "price": 500,
            "stock": 3, "status": "inactive", "createdAt": "2024-04-01T00:00:00Z"
        }),
    ]
}

// =============================================================================
// Envelope helpers
// =============================================================================

fn ok(status: StatusCode, data: Value) -> Response {
    (
        status,
        Json(json!({"statuscode": status.as_u16(), "responseBody": {"data": data}})),
    )
        .into_response()
}

fn fail(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"statuscode": status.as_u16(), "responseBody": {"message": message}})),
    )
        .into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

type Shared = State<Arc<BackendState>>;

// =============================================================================
// Handlers
// =============================================================================

async fn record(State(state): Shared, request: Request, next: Next) -> Response {
    let headers = request.headers();
    let seen = SeenRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        bearer: bearer(headers),
        request_id: headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    lock(&state.seen).push(seen);
    next.run(request).await
}

async fn login(State(state): Shared, Json(body): Json<Value>) -> Response {
    if body["password"] != PASSWORD {
        return fail(StatusCode::UNAUTHORIZED, "Invalid email or password");
    }
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let admin = email == ADMIN_EMAIL;
    state.issue_session("token-1", "refresh-1");
    state.set_admin(admin);

    ok(
        StatusCode::OK,
        json!({
            "token": "token-1",
            "refreshToken": "refresh-1",
            "user": {"_id": "u1", "name": "Test Shopper", "email": email, "isAdmin": admin}
        }),
    )
}

async fn refresh(State(state): Shared, Json(body): Json<Value>) -> Response {
    let call = state.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;

    let mut gate = state.refresh_gate.subscribe();
    let _ = gate.wait_for(|open| *open).await;

    let expected = lock(&state.refresh_token).clone();
    if *lock(&state.refresh_rejects) || expected.is_none() || body["refreshToken"] != json!(expected)
    {
        return fail(StatusCode::UNAUTHORIZED, "Invalid refresh token");
    }

    let token = format!("token-{}", call + 1);
    let refresh_token = format!("refresh-{}", call + 1);
    state.issue_session(&token, &refresh_token);
    ok(
        StatusCode::OK,
        json!({"token": token, "refreshToken": refresh_token}),
    )
}

async fn logout(State(state): Shared, headers: HeaderMap) -> Response {
    if let Err(response) = state.authorize(&headers) {
        return response;
    }
    *lock(&state.valid_token) = None;
    *lock(&state.refresh_token) = None;
    ok(StatusCode::OK, Value::Null)
}

async fn profile(State(state): Shared, headers: HeaderMap) -> Response {
    if let Err(response) = state.authorize(&headers) {
        return response;
    }
    let admin = *lock(&state.admin);
    ok(
        StatusCode::OK,
        json!({"_id": "u1", "name": "Test Shopper", "email": "shopper@threadline.test", "isAdmin": admin}),
    )
}

async fn list_products(State(state): Shared) -> Response {
    ok(StatusCode::OK, Value::Array(lock(&state.products).clone()))
}

async fn get_product(State(state): Shared, Path(id): Path<String>) -> Response {
    match state.product(&id) {
        Some(product) => ok(StatusCode::OK, product),
        None => fail(StatusCode::NOT_FOUND, "Product not found"),
    }
}

fn cart_payload(state: &BackendState) -> Value {
    json!({"items": lock(&state.cart).clone()})
}

fn same_line(a: &Value, b: &Value) -> bool {
    a["productId"] == b["productId"] && a["size"] == b["size"] && a["color"] == b["color"]
}

/// Apply a cart mutation; `delta` adds to the quantity instead of setting it.
fn mutate_cart(state: &BackendState, body: &Value, delta: bool) -> Response {
    let Some(quantity) = body["quantity"].as_i64() else {
        return fail(StatusCode::BAD_REQUEST, "quantity is required");
    };
    let stock = state
        .product(body["productId"].as_str().unwrap_or_default())
        .and_then(|p| p["stock"].as_i64());
    let Some(stock) = stock else {
        return fail(StatusCode::NOT_FOUND, "Product not found");
    };

    let mut cart = lock(&state.cart);
    let current = cart
        .iter()
        .find(|line| same_line(line, body))
        .and_then(|line| line["quantity"].as_i64())
        .unwrap_or(0);
    let next = if delta { current + quantity } else { quantity };
    if next > stock {
        return fail(StatusCode::BAD_REQUEST, "Insufficient stock");
    }

    cart.retain(|line| !same_line(line, body));
    if next > 0 {
        let mut line = body.clone();
        line["quantity"] = json!(next);
        cart.push(line);
    }
    drop(cart);
    ok(StatusCode::OK, cart_payload(state))
}

async fn get_cart(State(state): Shared, headers: HeaderMap) -> Response {
    if let Err(response) = state.authorize(&headers) {
        return response;
    }
    ok(StatusCode::OK, cart_payload(&state))
}

async fn add_to_cart(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(response) = state.authorize(&headers) {
        return response;
    }
    mutate_cart(&state, &body, true)
}

async fn update_cart(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(response) = state.authorize(&headers) {
        return response;
    }
    mutate_cart(&state, &body, false)
}

async fn get_wishlist(State(state): Shared, headers: HeaderMap) -> Response {
    if let Err(response) = state.authorize(&headers) {
        return response;
    }
    ok(StatusCode::OK, json!(lock(&state.wishlist).clone()))
}

async fn add_to_wishlist(
    State(state): Shared,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = state.authorize(&headers) {
        return response;
    }
    let Some(id) = body["productId"].as_str() else {
        return fail(StatusCode::BAD_REQUEST, "productId is required");
    };
    let mut wishlist = lock(&state.wishlist);
    if !wishlist.iter().any(|w| w == id) {
        wishlist.push(id.to_string());
    }
    ok(StatusCode::OK, json!(wishlist.clone()))
}

async fn remove_from_wishlist(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = state.authorize(&headers) {
        return response;
    }
    let mut wishlist = lock(&state.wishlist);
    wishlist.retain(|w| *w != id);
    ok(StatusCode::OK, json!(wishlist.clone()))
}

async fn list_orders(State(state): Shared, headers: HeaderMap) -> Response {
    if let Err(response) = state.authorize(&headers) {
        return response;
    }
    ok(StatusCode::OK, Value::Array(lock(&state.orders).clone()))
}

#[allow(clippy::cast_precision_loss)]
async fn place_order(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(response) = state.authorize(&headers) {
        return response;
    }
    let items = body["items"].as_array().cloned().unwrap_or_default();
    if items.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "No items");
    }

    let total: f64 = items
        .iter()
        .filter_map(|item| {
            let product = state.product(item["productId"].as_str()?)?;
            let unit = product["discountedPrice"]
                .as_f64()
                .or_else(|| product["price"].as_f64())?;
            Some(unit * item["quantity"].as_i64()? as f64)
        })
        .sum();

    let mut orders = lock(&state.orders);
    let order = json!({
        "_id": format!("o{}", orders.len() + 1),
        "items": items,
        "total": total,
        "status": "pending",
        "paymentMethod": body["paymentMethod"],
        "createdAt": "2024-06-01T12:00:00Z"
    });
    orders.push(order.clone());
    lock(&state.cart).clear();
    ok(StatusCode::CREATED, order)
}

async fn admin_list(State(state): Shared, headers: HeaderMap) -> Response {
    if let Err(response) = state.authorize_admin(&headers) {
        return response;
    }
    ok(StatusCode::OK, Value::Array(lock(&state.products).clone()))
}

async fn admin_create(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(response) = state.authorize_admin(&headers) {
        return response;
    }
    let mut products = lock(&state.products);
    let n = products.len() + 1;
    let mut product = body;
    product["_id"] = json!(format!("p{n}"));
    product["createdAt"] = json!(format!("2024-05-{:02}T00:00:00Z", n.min(28)));
    products.push(product.clone());
    ok(StatusCode::CREATED, product)
}

async fn admin_get(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(response) = state.authorize_admin(&headers) {
        return response;
    }
    get_product(State(state), Path(id)).await
}

async fn admin_update(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = state.authorize_admin(&headers) {
        return response;
    }
    let mut products = lock(&state.products);
    let Some(product) = products.iter_mut().find(|p| p["_id"] == id.as_str()) else {
        return fail(StatusCode::NOT_FOUND, "Product not found");
    };
    let created_at = product["createdAt"].clone();
    *product = body;
    product["_id"] = json!(id);
    product["createdAt"] = created_at;
    ok(StatusCode::OK, product.clone())
}

async fn admin_delete(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(response) = state.authorize_admin(&headers) {
        return response;
    }
    let mut products = lock(&state.products);
    let before = products.len();
    products.retain(|p| p["_id"] != id.as_str());
    if products.len() == before {
        return fail(StatusCode::NOT_FOUND, "Product not found");
    }
    ok(StatusCode::OK, Value::Null)
}

async fn admin_status(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = state.authorize_admin(&headers) {
        return response;
    }
    let mut products = lock(&state.products);
    let Some(product) = products.iter_mut().find(|p| p["_id"] == id.as_str()) else {
        return fail(StatusCode::NOT_FOUND, "Product not found");
    };
    product["status"] = body["status"].clone();
    ok(StatusCode::OK, product.clone())
}

fn router(state: Arc<BackendState>) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh-token", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/users/profile", get(profile))
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
        .route("/cart", get(get_cart).post(add_to_cart).put(update_cart))
        .route("/wishlist", get(get_wishlist).post(add_to_wishlist))
        .route("/wishlist/{id}", delete(remove_from_wishlist))
        .route("/orders", get(list_orders).post(place_order))
        .route("/admin/products", get(admin_list).post(admin_create))
        .route(
            "/admin/products/{id}",
            get(admin_get).put(admin_update).delete(admin_delete),
        )
        .route("/admin/products/{id}/status", patch(admin_status))
        .layer(axum::middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

// =============================================================================
// Test backend
// =============================================================================

/// A fake backend served on an ephemeral local port.
pub struct TestBackend {
    pub base_url: Url,
    pub state: Arc<BackendState>,
    server: JoinHandle<()>,
}

impl TestBackend {
    /// Bind to `127.0.0.1:0` and start serving.
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test backend");
        let addr = listener.local_addr().expect("Failed to read local address");

        let app = router(Arc::clone(&state));
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Test backend stopped");
        });

        let base_url = Url::parse(&format!("http://{addr}/")).expect("Failed to build base URL");
        Self {
            base_url,
            state,
            server,
        }
    }

    /// Client configuration pointing at this backend.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.base_url.clone());
        config.refresh.timeout = Duration::from_secs(2);
        config.refresh.expiry_notice_delay = Duration::ZERO;
        config
    }

    /// An API client using the real `reqwest` transport.
    #[must_use]
    pub fn client(&self, store: Arc<dyn CredentialStore>, events: SessionEvents) -> ApiClient {
        ApiClient::from_config(&self.config(), store, events).expect("Failed to build API client")
    }

    #[must_use]
    pub fn storefront(&self, store: Arc<dyn CredentialStore>, events: SessionEvents) -> Storefront {
        Storefront::from_config(&self.config(), store, events).expect("Failed to build storefront")
    }

    #[must_use]
    pub fn admin(&self, store: Arc<dyn CredentialStore>) -> AdminProducts {
        AdminProducts::new(self.client(store, SessionEvents::default()))
    }
}

impl Drop for TestBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}
