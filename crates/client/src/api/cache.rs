//! Cache types for API responses.

use grocery_aid_core::{Product, Store};

/// Cache key for stores and products.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Stores,
    Product { url: String },
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Stores(Vec<Store>),
    Product(Box<Product>),
}
