//! Grocery Aid Core - Shared types library.
//!
//! This crate provides the pure building blocks used by every Grocery Aid
//! component:
//! - `client` - REST API client and shopping session state
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no async. Everything here is safe to call from any context.
//!
//! # Modules
//!
//! - [`types`] - EAN-13 validation, type-safe IDs and prices
//! - [`patch`] - Cart patch builder (JSON Patch operations on a store visit)
//! - [`models`] - REST resource records (stores, products, carts, store visits)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod patch;
pub mod types;

pub use models::*;
pub use patch::{
    CartPatch, DEFAULT_QUANTITY, ItemQuantity, NewCartItem, PatchOp, add_product,
    add_single_product, change_cart_product_quantity, remove_product,
};
pub use types::*;
