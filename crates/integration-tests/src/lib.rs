//! Integration tests for Grocery Aid.
//!
//! Provides [`FakeBackend`], an in-process implementation of the `/api/v1`
//! REST API served by axum on a random local port. It keeps everything in
//! memory and answers the way the real backend does, including its error
//! statuses:
//!
//! - 404 for unknown store visits and products
//! - 415 for a PATCH without `application/json-patch+json`
//! - 422 with a list-valued `detail` for a malformed patch document or a
//!   quantity below one
//! - 409 for a patch that does not apply to the cart
//! - 400 for unknown products or stores
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p grocery-aid-integration-tests
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let backend = FakeBackend::start().await?;
//! let store = backend.add_store("Corner shop");
//! backend.add_product(&store, "4006381333931", "Pencil", Price::from_cents(125));
//!
//! let client = backend.client()?;
//! let visit = client.create_store_visit(&store.self_url).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use uuid::Uuid;

use grocery_aid_client::{API_PREFIX, ApiClient, ApiConfig, ConfigError};
use grocery_aid_core::{
    Cart, CartPatch, CartProduct, Ean, GroupedCart, NewStoreVisit, PatchOp, Price, Product, Store,
    StoreId, StoreVisit, StoreVisitId,
};

/// Content type the backend requires for PATCH bodies.
pub const JSON_PATCH_CONTENT_TYPE: &str = "application/json-patch+json";

/// Price limit of one group in the grouped cart.
pub const BIN_LIMIT: Decimal = Decimal::TEN;

// =============================================================================
// Backend state
// =============================================================================

#[derive(Debug)]
struct StoreRecord {
    id: StoreId,
    name: String,
}

#[derive(Debug)]
struct ProductRecord {
    name: String,
    price: Price,
}

#[derive(Debug, Clone)]
struct LineRecord {
    ean: String,
    quantity: Option<u32>,
}

#[derive(Debug, Clone)]
struct VisitRecord {
    store: StoreId,
    items: Vec<LineRecord>,
}

#[derive(Debug, Default)]
struct Catalogue {
    stores: Vec<StoreRecord>,
    products: HashMap<(StoreId, String), ProductRecord>,
    visits: HashMap<StoreVisitId, VisitRecord>,
    product_requests: usize,
    patch_content_types: Vec<Option<String>>,
}

/// A product as resolved for a cart line.
struct Resolved<'a> {
    /// Catalogue EAN (the lookup code for variable-price items).
    ean: String,
    name: &'a str,
    price: Price,
    variable: bool,
}

impl Catalogue {
    fn has_store(&self, id: StoreId) -> bool {
        self.stores.iter().any(|store| store.id == id)
    }

    /// Find the product sold as `ean` in `store`.
    ///
    /// Variable-price codes resolve to the catalogue entry of their lookup
    /// code, priced at the embedded price.
    fn resolve(&self, store: StoreId, ean: &str) -> Option<Resolved<'_>> {
        if let Ok(code) = Ean::parse(ean)
            && let Some(price) = code.embedded_price()
        {
            let lookup = code.lookup_code().into_inner();
            let record = self.products.get(&(store, lookup.clone()))?;
            return Some(Resolved {
                ean: lookup,
                name: &record.name,
                price: Price::new(price),
                variable: true,
            });
        }

        let record = self.products.get(&(store, ean.to_string()))?;
        Some(Resolved {
            ean: ean.to_string(),
            name: &record.name,
            price: record.price,
            variable: false,
        })
    }
}

#[derive(Clone)]
struct AppState {
    origin: Arc<str>,
    catalogue: Arc<Mutex<Catalogue>>,
}

impl AppState {
    fn lock(&self) -> MutexGuard<'_, Catalogue> {
        self.catalogue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store_url(&self, id: StoreId) -> String {
        format!("{}{API_PREFIX}/stores/{id}", self.origin)
    }

    fn visit_url(&self, id: StoreVisitId) -> String {
        format!("{}{API_PREFIX}/storevisits/{id}", self.origin)
    }

    fn product(&self, store: StoreId, resolved: &Resolved<'_>) -> Product {
        let store_url = self.store_url(store);
        Product {
            self_url: format!("{store_url}/products/{}", resolved.ean),
            store: store_url,
            ean: resolved.ean.clone(),
            name: resolved.name.to_string(),
            price: resolved.price,
        }
    }

    fn cart_lines(&self, catalogue: &Catalogue, visit: &VisitRecord) -> Vec<CartProduct> {
        visit
            .items
            .iter()
            .filter_map(|line| {
                let resolved = catalogue.resolve(visit.store, &line.ean)?;
                let quantity = if resolved.variable {
                    None
                } else {
                    Some(line.quantity.unwrap_or(1))
                };
                Some(CartProduct {
                    product: self.product(visit.store, &resolved),
                    quantity,
                    total_price: resolved.price.times(quantity.unwrap_or(1)),
                })
            })
            .collect()
    }

    fn store_visit(
        &self,
        catalogue: &Catalogue,
        id: StoreVisitId,
        visit: &VisitRecord,
    ) -> StoreVisit {
        StoreVisit {
            self_url: self.visit_url(id),
            id,
            store: self.store_url(visit.store),
            cart: cart(self.cart_lines(catalogue, visit)),
        }
    }
}

fn cart(items: Vec<CartProduct>) -> Cart {
    let total_price = items.iter().map(|item| item.total_price).sum();
    Cart { items, total_price }
}

// =============================================================================
// Errors
// =============================================================================

/// Error response in the backend's `{"detail": ...}` shape.
#[derive(Debug)]
struct Problem {
    status: StatusCode,
    detail: Value,
}

impl Problem {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: Value::String(detail.into()),
        }
    }

    fn store_visit_not_found(id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("Store visit {id:?} not found"))
    }

    /// 422 for a quantity below one, in the shape of a request validation
    /// failure.
    fn invalid_quantity(index: usize) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: json!([{
                "loc": ["cart", "items", index, "quantity"],
                "msg": "ensure this value is greater than 0",
                "type": "value_error.number.not_gt",
            }]),
        }
    }

    fn patch_conflict(reason: &str) -> Self {
        Self::new(
            StatusCode::CONFLICT,
            format!("Failed to process JSON Patch: {reason}"),
        )
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

fn parse_visit_id(id: &str) -> Result<StoreVisitId, Problem> {
    id.parse()
        .map_err(|_| Problem::store_visit_not_found(id))
}

// =============================================================================
// Handlers
// =============================================================================

fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/stores", get(list_stores))
        .route("/stores/{store}/products/{ean}", get(get_product))
        .route("/storevisits", post(create_store_visit))
        .route(
            "/storevisits/{id}",
            get(get_store_visit).patch(patch_store_visit),
        )
        .route("/storevisits/{id}/bins", get(get_grouped_cart));

    Router::new().nest(API_PREFIX, api).with_state(state)
}

async fn list_stores(State(state): State<AppState>) -> Json<Vec<Store>> {
    let catalogue = state.lock();
    let stores = catalogue
        .stores
        .iter()
        .map(|store| Store {
            self_url: state.store_url(store.id),
            id: store.id,
            name: store.name.clone(),
        })
        .collect();
    Json(stores)
}

async fn get_product(
    State(state): State<AppState>,
    Path((store, ean)): Path<(String, String)>,
) -> Result<Json<Product>, Problem> {
    let mut catalogue = state.lock();
    catalogue.product_requests += 1;

    let not_found = || Problem::new(StatusCode::NOT_FOUND, format!("Product {ean:?} not found"));
    let store: StoreId = store.parse().map_err(|_| not_found())?;
    let resolved = catalogue.resolve(store, &ean).ok_or_else(not_found)?;

    Ok(Json(state.product(store, &resolved)))
}

async fn create_store_visit(
    State(state): State<AppState>,
    Json(body): Json<NewStoreVisit>,
) -> Result<(StatusCode, Json<StoreVisit>), Problem> {
    let reference = body.store.trim_end_matches('/');
    let key = reference.rsplit('/').next().unwrap_or(reference);

    let mut catalogue = state.lock();
    let store = key
        .parse::<StoreId>()
        .ok()
        .filter(|id| catalogue.has_store(*id))
        .ok_or_else(|| {
            Problem::new(
                StatusCode::BAD_REQUEST,
                format!("Cannot create store visit with unknown store: {key:?}"),
            )
        })?;

    let id = StoreVisitId::new(Uuid::new_v4());
    let visit = VisitRecord {
        store,
        items: Vec::new(),
    };
    let body = state.store_visit(&catalogue, id, &visit);
    catalogue.visits.insert(id, visit);
    tracing::debug!(store_visit = %id, "Fake backend created store visit");

    Ok((StatusCode::CREATED, Json(body)))
}

async fn get_store_visit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoreVisit>, Problem> {
    let visit_id = parse_visit_id(&id)?;
    let catalogue = state.lock();
    let visit = catalogue
        .visits
        .get(&visit_id)
        .ok_or_else(|| Problem::store_visit_not_found(&id))?;
    Ok(Json(state.store_visit(&catalogue, visit_id, visit)))
}

async fn patch_store_visit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<StoreVisit>, Problem> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let mut catalogue = state.lock();
    catalogue.patch_content_types.push(content_type.clone());

    if content_type.as_deref() != Some(JSON_PATCH_CONTENT_TYPE) {
        return Err(Problem::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!("Expected content type {JSON_PATCH_CONTENT_TYPE:?}, got: {content_type:?}"),
        ));
    }

    let patch: CartPatch = serde_json::from_slice(&body).map_err(|err| Problem {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        detail: json!([{ "loc": "body", "msg": err.to_string(), "type": "value_error.invalidjsonpatch" }]),
    })?;

    let visit_id = parse_visit_id(&id)?;
    let mut visit = catalogue
        .visits
        .get(&visit_id)
        .cloned()
        .ok_or_else(|| Problem::store_visit_not_found(&id))?;

    apply_patch(&mut visit.items, patch)?;

    let unknown: Vec<&str> = visit
        .items
        .iter()
        .filter(|line| catalogue.resolve(visit.store, &line.ean).is_none())
        .map(|line| line.ean.as_str())
        .collect();
    if !unknown.is_empty() {
        return Err(Problem::new(
            StatusCode::BAD_REQUEST,
            format!("Unknown products: {}", unknown.join(", ")),
        ));
    }

    let body = state.store_visit(&catalogue, visit_id, &visit);
    catalogue.visits.insert(visit_id, visit);
    Ok(Json(body))
}

async fn get_grouped_cart(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GroupedCart>, Problem> {
    let visit_id = parse_visit_id(&id)?;
    let catalogue = state.lock();
    let visit = catalogue
        .visits
        .get(&visit_id)
        .ok_or_else(|| Problem::store_visit_not_found(&id))?;

    let bins = bin_pack(state.cart_lines(&catalogue, visit), BIN_LIMIT);
    Ok(Json(GroupedCart {
        store_visit: Some(state.visit_url(visit_id)),
        binned_cart: bins.into_iter().map(cart).collect(),
    }))
}

/// Apply `patch` to the lines of a cart, all operations or none.
fn apply_patch(items: &mut Vec<LineRecord>, patch: CartPatch) -> Result<(), Problem> {
    let mut patched = items.clone();

    for op in patch {
        match op {
            PatchOp::AddItem(item) => {
                let quantity = item.quantity.count();
                if quantity == Some(0) {
                    return Err(Problem::invalid_quantity(patched.len()));
                }
                patched.push(LineRecord {
                    ean: item.product,
                    quantity,
                });
            }
            PatchOp::ReplaceQuantity { index, quantity } => {
                let line = patched
                    .get_mut(index)
                    .ok_or_else(|| Problem::patch_conflict(&format!("member {index} not found")))?;
                if quantity == 0 {
                    return Err(Problem::invalid_quantity(index));
                }
                line.quantity = Some(quantity);
            }
            PatchOp::RemoveItem { index } => {
                if index >= patched.len() {
                    return Err(Problem::patch_conflict(&format!(
                        "can't remove a non-existent object '{index}'"
                    )));
                }
                patched.remove(index);
            }
        }
    }

    *items = patched;
    Ok(())
}

// =============================================================================
// Grouped cart
// =============================================================================

fn with_quantity(line: &CartProduct, quantity: u32) -> CartProduct {
    CartProduct {
        quantity: Some(quantity),
        total_price: line.product.price.times(quantity),
        ..line.clone()
    }
}

/// Take as much of `line` as fits in `limit`.
///
/// Returns the part to put in the current group, the part left over and the
/// limit remaining after the first part.
fn split_line(
    line: &CartProduct,
    limit: Decimal,
) -> (Option<CartProduct>, Option<CartProduct>, Decimal) {
    let price = line.product.price.amount();
    if price > limit {
        return (None, Some(line.clone()), limit);
    }
    let Some(quantity) = line.quantity else {
        return (Some(line.clone()), None, limit - price);
    };

    let fits = if price > Decimal::ZERO {
        (limit / price).floor().to_u32().unwrap_or(u32::MAX).min(quantity)
    } else {
        quantity
    };
    let remaining = limit - price * Decimal::from(fits);

    match fits {
        0 => (None, Some(line.clone()), limit),
        n if n == quantity => (Some(line.clone()), None, remaining),
        n => (
            Some(with_quantity(line, n)),
            Some(with_quantity(line, quantity - n)),
            remaining,
        ),
    }
}

/// Split cart lines into groups whose totals stay within `limit`.
///
/// Lines are placed most expensive first. Lines whose unit price alone
/// exceeds `limit` go into a final group of their own, as do lines that
/// cannot be placed in an empty group.
fn bin_pack(mut lines: Vec<CartProduct>, limit: Decimal) -> Vec<Vec<CartProduct>> {
    lines.sort_by(|a, b| b.product.price.cmp(&a.product.price));
    let oversized = lines
        .iter()
        .take_while(|line| line.product.price.amount() > limit)
        .count();
    let mut last_bin: Vec<CartProduct> = lines.drain(..oversized).collect();

    let mut bins = Vec::new();
    let mut next_bin = Vec::new();
    let mut remaining = limit;

    while !lines.is_empty() {
        let placed = lines.iter().enumerate().find_map(|(index, line)| {
            let (to_bin, rest, left) = split_line(line, remaining);
            to_bin.map(|to_bin| (index, to_bin, rest, left))
        });

        match placed {
            Some((index, to_bin, rest, left)) => {
                next_bin.push(to_bin);
                remaining = left;
                match rest {
                    Some(rest) => {
                        if let Some(slot) = lines.get_mut(index) {
                            *slot = rest;
                        }
                    }
                    None => {
                        lines.remove(index);
                    }
                }
            }
            None if next_bin.is_empty() => {
                last_bin.append(&mut lines);
            }
            None => {
                bins.push(std::mem::take(&mut next_bin));
                remaining = limit;
            }
        }
    }

    if !next_bin.is_empty() {
        bins.push(next_bin);
    }
    if !last_bin.is_empty() {
        bins.push(last_bin);
    }
    bins
}

// =============================================================================
// FakeBackend
// =============================================================================

/// In-memory Grocery Aid backend listening on `127.0.0.1`.
///
/// The server task stops when the value is dropped.
pub struct FakeBackend {
    state: AppState,
    addr: SocketAddr,
    server: JoinHandle<()>,
}

impl FakeBackend {
    /// Bind a random local port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = AppState {
            origin: Arc::from(format!("http://{addr}")),
            catalogue: Arc::new(Mutex::new(Catalogue::default())),
        };

        let app = router(state.clone());
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Fake backend stopped: {e}");
            }
        });

        Ok(Self {
            state,
            addr,
            server,
        })
    }

    /// Origin of the backend, e.g. `http://127.0.0.1:41234`.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.state.origin
    }

    /// Socket address the backend listens on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Client configuration pointing at this backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the origin is not a valid URL.
    pub fn config(&self) -> Result<ApiConfig, ConfigError> {
        ApiConfig::for_origin(self.origin())
    }

    /// API client pointing at this backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn client(&self) -> Result<ApiClient, Box<dyn std::error::Error>> {
        Ok(ApiClient::new(&self.config()?)?)
    }

    /// Add a store.
    pub fn add_store(&self, name: &str) -> Store {
        let id = StoreId::new(Uuid::new_v4());
        self.state.lock().stores.push(StoreRecord {
            id,
            name: name.to_string(),
        });
        Store {
            self_url: self.state.store_url(id),
            id,
            name: name.to_string(),
        }
    }

    /// Add a product to the catalogue of `store`.
    ///
    /// Variable-price items are listed under their lookup code (zero price
    /// part); `price` is then ignored when the item is scanned.
    pub fn add_product(&self, store: &Store, ean: &str, name: &str, price: Price) {
        self.state.lock().products.insert(
            (store.id, ean.to_string()),
            ProductRecord {
                name: name.to_string(),
                price,
            },
        );
    }

    /// Number of product requests served so far.
    #[must_use]
    pub fn product_requests(&self) -> usize {
        self.state.lock().product_requests
    }

    /// `Content-Type` header of every PATCH request received, in order.
    #[must_use]
    pub fn patch_content_types(&self) -> Vec<Option<String>> {
        self.state.lock().patch_content_types.clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}
