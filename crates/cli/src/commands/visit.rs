//! One-shot store visit commands.
//!
//! Each command loads the store visit, applies at most one change and prints
//! the server's version of the result.
//!
//! # Usage
//!
//! ```bash
//! grocery-aid visit new 4bd8ae3b-5ef2-4f0e-8a8e-8c3e6a2d5f10
//! grocery-aid visit add <visit> 4006381333931 -q 3
//! grocery-aid visit quantity <visit> 0 5
//! grocery-aid visit remove <visit> 0
//! ```

use std::io::Write;

use tracing::info;

use grocery_aid_client::{ApiClient, VisitState};
use grocery_aid_core::{CartPatch, Ean, add_product, change_cart_product_quantity, remove_product};

use super::{write_grouped_cart, write_visit};

/// Start a store visit in `store`.
///
/// # Errors
///
/// Returns an error if the API request fails or the output cannot be written.
pub async fn create(
    out: &mut impl Write,
    api: &ApiClient,
    store: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut state = VisitState::new();
    let visit = state.create(api, store).await?;
    writeln!(out, "{}", visit.id)?;
    Ok(())
}

/// Print a store visit and its cart.
///
/// # Errors
///
/// Returns an error if the store visit cannot be fetched or the output cannot
/// be written.
pub async fn show(
    out: &mut impl Write,
    api: &ApiClient,
    visit: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let visit = api.get_store_visit(visit).await?;
    write_visit(out, &visit)?;
    Ok(())
}

/// Add `quantity` of the product `ean` to the cart.
///
/// # Errors
///
/// Returns an error if `ean` is invalid, the server rejects the change, or
/// the output cannot be written.
pub async fn add(
    out: &mut impl Write,
    api: &ApiClient,
    visit: &str,
    ean: &str,
    quantity: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let ean = Ean::parse(ean.trim())?;
    apply(out, api, visit, &add_product(ean.as_str(), quantity)).await
}

/// Set the quantity of cart line `index`.
///
/// # Errors
///
/// Returns an error if the server rejects the change or the output cannot be
/// written.
pub async fn quantity(
    out: &mut impl Write,
    api: &ApiClient,
    visit: &str,
    index: usize,
    quantity: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    apply(out, api, visit, &change_cart_product_quantity(index, quantity)).await
}

/// Remove cart line `index`.
///
/// # Errors
///
/// Returns an error if the server rejects the change or the output cannot be
/// written.
pub async fn remove(
    out: &mut impl Write,
    api: &ApiClient,
    visit: &str,
    index: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    apply(out, api, visit, &remove_product(index)).await
}

/// Print the cart of a store visit split into groups.
///
/// # Errors
///
/// Returns an error if the store visit cannot be fetched or the output cannot
/// be written.
pub async fn bins(
    out: &mut impl Write,
    api: &ApiClient,
    visit: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut state = VisitState::new();
    state.load(api, visit).await?;
    let grouped = state.grouped_cart(api).await?;
    write_grouped_cart(out, &grouped)?;
    Ok(())
}

async fn apply(
    out: &mut impl Write,
    api: &ApiClient,
    visit: &str,
    patch: &CartPatch,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut state = VisitState::new();
    state.load(api, visit).await?;
    let updated = state.apply_patch(api, patch).await?;
    info!(store_visit = %updated.id, items = updated.cart.len(), "Cart updated");
    write_visit(out, updated)?;
    Ok(())
}
