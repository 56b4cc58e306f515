//! REST resource records.
//!
//! These mirror the JSON resources served under `/api/v1`. The server owns
//! them; the client only keeps read-only snapshots and replaces them with the
//! server's response after every change.
//!
//! Resources link to each other with absolute URLs (`self`, `store`).

use serde::{Deserialize, Serialize};

use crate::types::{Price, StoreId, StoreVisitId};

/// A grocery store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    /// URL of the store resource.
    #[serde(rename = "self")]
    pub self_url: String,
    pub id: StoreId,
    pub name: String,
}

/// A product as sold in one store.
///
/// The same EAN may have a different name or price in another store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// URL of the product resource.
    #[serde(rename = "self")]
    pub self_url: String,
    /// URL of the store the product is sold in.
    pub store: String,
    /// Catalogue EAN code. For variable-price items this is the lookup code,
    /// not the scanned one.
    pub ean: String,
    pub name: String,
    /// Price per unit. For variable-price items, the price in the scanned code.
    pub price: Price,
}

/// A cart line: a product and how many of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartProduct {
    pub product: Product,
    /// Number of units; `None` for variable-price items.
    #[serde(default)]
    pub quantity: Option<u32>,
    pub total_price: Price,
}

/// The lines of a cart and their total.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartProduct>,
    pub total_price: Price,
}

impl Cart {
    /// Returns `true` if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Index of the first line holding the product with catalogue EAN `ean`.
    #[must_use]
    pub fn position_of(&self, ean: &str) -> Option<usize> {
        self.items.iter().position(|item| item.product.ean == ean)
    }
}

/// A cart split into groups, each staying under the server's price limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedCart {
    /// URL of the store visit the cart belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_visit: Option<String>,
    pub binned_cart: Vec<Cart>,
}

/// One shopping session: a store and an evolving cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreVisit {
    /// URL of the store visit resource. Patches are sent here.
    #[serde(rename = "self")]
    pub self_url: String,
    pub id: StoreVisitId,
    /// URL of the store.
    pub store: String,
    pub cart: Cart,
}

impl StoreVisit {
    /// URL of the grouped cart of this store visit.
    #[must_use]
    pub fn bins_url(&self) -> String {
        format!("{}/bins", self.self_url.trim_end_matches('/'))
    }
}

/// Request body creating a store visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStoreVisit {
    /// Store id or store URL.
    pub store: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    const STORE_URL: &str = "http://localhost/api/v1/stores/4bd8ae3b-5ef2-4f0e-8a8e-8c3e6a2d5f10";

    fn store_visit_json() -> serde_json::Value {
        json!({
            "self": "http://localhost/api/v1/storevisits/0f0c7a5e-3c1b-4f61-9a59-2f8d3f0e8b21",
            "id": "0f0c7a5e-3c1b-4f61-9a59-2f8d3f0e8b21",
            "store": STORE_URL,
            "cart": {
                "items": [
                    {
                        "product": {
                            "self": format!("{STORE_URL}/products/4006381333931"),
                            "store": STORE_URL,
                            "ean": "4006381333931",
                            "name": "Pencil",
                            "price": 1.25,
                        },
                        "quantity": 2,
                        "total_price": 2.5,
                    },
                    {
                        "product": {
                            "self": format!("{STORE_URL}/products/2123456000009"),
                            "store": STORE_URL,
                            "ean": "2123456000009",
                            "name": "Cheese",
                            "price": 12.34,
                        },
                        "quantity": null,
                        "total_price": 12.34,
                    },
                ],
                "total_price": 14.84,
            },
        })
    }

    #[test]
    fn test_store_visit_from_json() {
        let visit: StoreVisit = serde_json::from_value(store_visit_json()).unwrap();
        assert_eq!(visit.cart.len(), 2);
        assert_eq!(visit.cart.items[0].quantity, Some(2));
        assert_eq!(visit.cart.items[1].quantity, None);
        assert_eq!(visit.cart.total_price, Price::from_cents(1484));
        assert_eq!(visit.cart.position_of("2123456000009"), Some(1));
        assert_eq!(visit.cart.position_of("4006381333932"), None);
    }

    #[test]
    fn test_missing_quantity_is_none() {
        let item: CartProduct = serde_json::from_value(json!({
            "product": {
                "self": format!("{STORE_URL}/products/2123456000009"),
                "store": STORE_URL,
                "ean": "2123456000009",
                "name": "Cheese",
                "price": 3.5,
            },
            "total_price": 3.5,
        }))
        .unwrap();
        assert_eq!(item.quantity, None);
    }

    #[test]
    fn test_bins_url() {
        let visit: StoreVisit = serde_json::from_value(store_visit_json()).unwrap();
        assert_eq!(
            visit.bins_url(),
            "http://localhost/api/v1/storevisits/0f0c7a5e-3c1b-4f61-9a59-2f8d3f0e8b21/bins"
        );
    }

    #[test]
    fn test_grouped_cart_without_store_visit() {
        let grouped: GroupedCart =
            serde_json::from_value(json!({ "binned_cart": [{ "items": [], "total_price": 0 }] }))
                .unwrap();
        assert_eq!(grouped.store_visit, None);
        assert!(grouped.binned_cart[0].is_empty());
    }

    #[test]
    fn test_store_self_renamed() {
        let store = Store {
            self_url: STORE_URL.to_string(),
            id: "4bd8ae3b-5ef2-4f0e-8a8e-8c3e6a2d5f10".parse().unwrap(),
            name: "Kamppi".to_string(),
        };
        let value = serde_json::to_value(&store).unwrap();
        assert_eq!(value["self"], json!(STORE_URL));
        assert!(value.get("self_url").is_none());
    }
}
