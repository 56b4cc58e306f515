//! Integration tests for the shopping session layer.
//!
//! Drives `VisitState`, `ProductPicker` and `QuantityInput` the way a front
//! end does, against the in-process fake backend.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::{Duration, Instant};

use grocery_aid_client::{
    ApiClient, LookupState, ProductPicker, QuantityInput, Resource, SessionError,
    UserFacingError, VisitState,
};
use grocery_aid_core::{
    Price, Store, add_single_product, change_cart_product_quantity, remove_product,
};
use grocery_aid_integration_tests::FakeBackend;

const PENCIL: &str = "4006381333931";
const NOTEBOOK: &str = "5901234123457";
const UNKNOWN: &str = "9780201379624";

async fn setup() -> (FakeBackend, Store, ApiClient) {
    let backend = FakeBackend::start().await.unwrap();
    let store = backend.add_store("Corner shop");
    backend.add_product(&store, PENCIL, "Pencil", Price::from_cents(125));
    backend.add_product(&store, NOTEBOOK, "Notebook", Price::from_cents(350));
    let client = backend.client().unwrap();
    (backend, store, client)
}

/// Scan `code` the way the shop loop does: validate, look up, add.
async fn scan(
    picker: &mut ProductPicker,
    state: &mut VisitState,
    api: &ApiClient,
    code: &str,
) -> Result<(), UserFacingError> {
    picker.edit(code);
    if picker.validation_error().is_some() {
        return Err(UserFacingError::InvalidEan);
    }

    let store = state.current().unwrap().store.clone();
    if let Some(ean) = picker.begin_lookup() {
        let result = api
            .get_product(&store, ean.as_str())
            .await
            .map_err(|err| UserFacingError::lookup(Resource::Product, &err).to_string());
        picker.lookup_finished(&ean, result);
    }
    if let LookupState::Failed(_) = picker.lookup() {
        return Err(UserFacingError::NotFound(Resource::Product));
    }

    let ean = picker.begin_submit().unwrap();
    let result = state
        .apply_patch(api, &add_single_product(ean.as_str()))
        .await
        .map(|_| ())
        .map_err(|err| UserFacingError::mutation(&err));
    picker.submit_finished(result.clone().map_err(|err| err.to_string()));
    result
}

// ============================================================================
// VisitState
// ============================================================================

#[tokio::test]
async fn test_visit_state_lifecycle() {
    let (_backend, store, api) = setup().await;
    let mut state = VisitState::new();

    let id = state.create(&api, &store.self_url).await.unwrap().id;
    assert_eq!(state.current_id(), Some(id));

    let visit = state
        .apply_patch(&api, &add_single_product(PENCIL))
        .await
        .unwrap();
    assert_eq!(visit.cart.len(), 1);

    let visit = state
        .apply_patch(&api, &change_cart_product_quantity(0, 3))
        .await
        .unwrap();
    assert_eq!(visit.cart.items[0].quantity, Some(3));

    let refreshed = state.refresh(&api).await.unwrap();
    assert_eq!(refreshed.cart.items[0].quantity, Some(3));

    state.clear();
    assert!(state.current().is_none());
}

#[tokio::test]
async fn test_load_existing_visit() {
    let (_backend, store, api) = setup().await;
    let created = api.create_store_visit(&store.self_url).await.unwrap();

    let mut state = VisitState::new();
    state.load(&api, &created.id.to_string()).await.unwrap();
    assert_eq!(state.current(), Some(&created));
}

#[tokio::test]
async fn test_failed_load_keeps_previous_visit() {
    let (_backend, store, api) = setup().await;
    let mut state = VisitState::new();
    let id = state.create(&api, &store.self_url).await.unwrap().id;

    let err = state
        .load(&api, "6f1e2d3c-4b5a-4978-8695-a4b3c2d1e0f9")
        .await
        .unwrap_err();
    assert_eq!(
        UserFacingError::lookup(Resource::StoreVisit, &err).to_string(),
        "Store visit not found"
    );
    assert_eq!(state.current_id(), Some(id));
}

#[tokio::test]
async fn test_patch_without_visit() {
    let (_backend, _store, api) = setup().await;
    let mut state = VisitState::new();

    let err = state
        .apply_patch(&api, &add_single_product(PENCIL))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NoActiveVisit));
}

#[tokio::test]
async fn test_failed_patch_keeps_snapshot() {
    let (_backend, store, api) = setup().await;
    let mut state = VisitState::new();
    state.create(&api, &store.self_url).await.unwrap();
    state
        .apply_patch(&api, &add_single_product(PENCIL))
        .await
        .unwrap();
    let before = state.current().cloned();

    let err = state
        .apply_patch(&api, &remove_product(5))
        .await
        .unwrap_err();
    assert!(matches!(
        UserFacingError::mutation(&err),
        UserFacingError::Mutation(message) if message.starts_with("Failed to process JSON Patch")
    ));
    assert_eq!(state.current().cloned(), before);
}

#[tokio::test]
async fn test_late_response_for_cleared_visit_is_dropped() {
    let (_backend, store, api) = setup().await;
    let mut state = VisitState::new();
    let visit = state.create(&api, &store.self_url).await.unwrap().clone();

    // A request started for the visit completes after the user left it
    let patch = add_single_product(PENCIL);
    let pending = api.update_store_visit(&visit, &patch);
    state.clear();
    let late = pending.await.unwrap();

    assert!(!state.update(late));
    assert!(state.current().is_none());
}

#[tokio::test]
async fn test_late_response_for_other_visit_is_dropped() {
    let (_backend, store, api) = setup().await;
    let mut state = VisitState::new();
    let first = state.create(&api, &store.self_url).await.unwrap().clone();
    let second_id = state.create(&api, &store.self_url).await.unwrap().id;

    let late = api
        .update_store_visit(&first, &add_single_product(PENCIL))
        .await
        .unwrap();
    assert!(!state.update(late));
    assert_eq!(state.current_id(), Some(second_id));
    assert!(state.current().unwrap().cart.is_empty());
}

#[tokio::test]
async fn test_grouped_cart_of_current_visit() {
    let (_backend, store, api) = setup().await;
    let mut state = VisitState::new();
    state.create(&api, &store.self_url).await.unwrap();
    state
        .apply_patch(&api, &add_single_product(NOTEBOOK))
        .await
        .unwrap();

    let grouped = state.grouped_cart(&api).await.unwrap();
    assert_eq!(grouped.binned_cart.len(), 1);
    assert_eq!(grouped.binned_cart[0].total_price, Price::from_cents(350));
}

// ============================================================================
// ProductPicker
// ============================================================================

#[tokio::test]
async fn test_scan_adds_product_and_clears_field() {
    let (_backend, store, api) = setup().await;
    let mut state = VisitState::new();
    state.create(&api, &store.self_url).await.unwrap();
    let mut picker = ProductPicker::new();

    scan(&mut picker, &mut state, &api, PENCIL).await.unwrap();
    scan(&mut picker, &mut state, &api, &format!("{NOTEBOOK}\n"))
        .await
        .unwrap();

    assert_eq!(picker.raw(), "");
    let cart = &state.current().unwrap().cart;
    assert_eq!(cart.len(), 2);
    assert_eq!(cart.position_of(NOTEBOOK), Some(1));
}

#[tokio::test]
async fn test_scan_invalid_code() {
    let (_backend, store, api) = setup().await;
    let mut state = VisitState::new();
    state.create(&api, &store.self_url).await.unwrap();
    let mut picker = ProductPicker::new();

    let err = scan(&mut picker, &mut state, &api, "4006381333932")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid EAN");
    assert!(err.keeps_input());
    assert_eq!(picker.raw(), "4006381333932");
    assert!(state.current().unwrap().cart.is_empty());
}

#[tokio::test]
async fn test_scan_unknown_product() {
    let (backend, store, api) = setup().await;
    let mut state = VisitState::new();
    state.create(&api, &store.self_url).await.unwrap();
    let mut picker = ProductPicker::new();

    let err = scan(&mut picker, &mut state, &api, UNKNOWN)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Product not found");
    assert_eq!(
        picker.lookup(),
        &LookupState::Failed("Product not found".to_string())
    );
    // Nothing was sent
    assert!(backend.patch_content_types().is_empty());
}

#[tokio::test]
async fn test_submit_failure_keeps_input() {
    let (_backend, store, api) = setup().await;
    let mut state = VisitState::new();
    state.create(&api, &store.self_url).await.unwrap();
    let mut picker = ProductPicker::new();

    // Skip the lookup so the server is the one rejecting the code
    picker.edit(UNKNOWN);
    let ean = picker.begin_submit().unwrap();
    let err = state
        .apply_patch(&api, &add_single_product(ean.as_str()))
        .await
        .unwrap_err();
    let err = UserFacingError::mutation(&err);
    picker.submit_finished(Err(err.to_string()));

    assert_eq!(picker.raw(), UNKNOWN);
    assert_eq!(
        picker.validation_error(),
        Some(format!("Unknown products: {UNKNOWN}").as_str())
    );
    assert!(picker.can_submit());
}

// ============================================================================
// QuantityInput
// ============================================================================

#[tokio::test]
async fn test_debounced_quantity_reaches_server() {
    let (backend, store, api) = setup().await;
    let mut state = VisitState::new();
    state.create(&api, &store.self_url).await.unwrap();
    let visit = state
        .apply_patch(&api, &add_single_product(PENCIL))
        .await
        .unwrap();
    let mut input =
        QuantityInput::with_delay(visit.cart.items[0].quantity, Duration::from_millis(20));

    let start = Instant::now();
    input.edit(2, start);
    input.edit(3, start + Duration::from_millis(5));
    input.edit(4, start + Duration::from_millis(10));
    assert_eq!(input.poll(start + Duration::from_millis(15)), None);

    let deadline = input.next_deadline().unwrap();
    let quantity = input.poll(deadline).unwrap();
    assert_eq!(quantity, 4);

    let visit = state
        .apply_patch(&api, &change_cart_product_quantity(0, quantity))
        .await
        .unwrap();
    input.commit(visit.cart.items[0].quantity);

    assert_eq!(input.displayed(), Some(4));
    assert_eq!(visit.cart.total_price, Price::from_cents(500));
    // One add and one quantity change
    assert_eq!(backend.patch_content_types().len(), 2);
}
