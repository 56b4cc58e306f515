//! Command implementations.
//!
//! Commands write their results to the given output so they can be checked
//! in tests; logs go to stderr through `tracing`.

pub mod ean;
pub mod shop;
pub mod stores;
pub mod visit;

use std::io::{self, Write};

use grocery_aid_core::{Cart, GroupedCart, StoreVisit};

/// Write a cart as numbered lines followed by the total.
fn write_cart(out: &mut impl Write, cart: &Cart) -> io::Result<()> {
    if cart.is_empty() {
        writeln!(out, "  (empty)")?;
    }
    for (index, item) in cart.items.iter().enumerate() {
        let quantity = item
            .quantity
            .map_or_else(|| "-".to_string(), |quantity| quantity.to_string());
        writeln!(
            out,
            "  [{index}] {ean}  {name:<30} {quantity:>4} x {price:>8} = {total:>8}",
            ean = item.product.ean,
            name = item.product.name,
            price = item.product.price,
            total = item.total_price,
        )?;
    }
    writeln!(out, "  Total: {}", cart.total_price)
}

/// Write a store visit header and its cart.
fn write_visit(out: &mut impl Write, visit: &StoreVisit) -> io::Result<()> {
    writeln!(out, "Store visit {}", visit.id)?;
    writeln!(out, "  Store: {}", visit.store)?;
    write_cart(out, &visit.cart)
}

/// Write each group of a grouped cart.
fn write_grouped_cart(out: &mut impl Write, grouped: &GroupedCart) -> io::Result<()> {
    if grouped.binned_cart.is_empty() {
        writeln!(out, "No groups")?;
    }
    for (number, bin) in grouped.binned_cart.iter().enumerate() {
        writeln!(out, "Group {}", number + 1)?;
        write_cart(out, bin)?;
    }
    Ok(())
}
