//! Cart patch builder.
//!
//! A store visit's cart is changed by sending a JSON Patch (RFC 6902) to the
//! store visit resource. Each user intent (add a product, change a quantity,
//! remove a line) becomes a [`CartPatch`]: an ordered list of [`PatchOp`]s
//! the server applies atomically.
//!
//! The builders only describe the change. They do no I/O, read no cart state
//! beyond the line index they are given, and never fail.
//!
//! # Wire format
//!
//! ```json
//! [{ "op": "add", "path": "/cart/items/-", "value": { "product": "4006381333931", "quantity": 2 } }]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::is_variable_price_ean;

/// Quantity used when adding a product without an explicit quantity.
pub const DEFAULT_QUANTITY: u32 = 1;

/// JSON Pointer to the cart lines of a store visit.
const CART_ITEMS_PATH: &str = "/cart/items";

/// Quantity attached to a newly added cart line.
///
/// Variable-price products carry their price in the barcode, so the client
/// never sends a quantity for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<u32>", into = "Option<u32>")]
pub enum ItemQuantity {
    /// An explicit number of units.
    Count(u32),
    /// No quantity; the server derives it from the barcode.
    #[default]
    Absent,
}

impl ItemQuantity {
    /// Returns `true` if no quantity is sent.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The explicit quantity, if any.
    #[must_use]
    pub const fn count(&self) -> Option<u32> {
        match self {
            Self::Count(n) => Some(*n),
            Self::Absent => None,
        }
    }
}

impl From<Option<u32>> for ItemQuantity {
    fn from(quantity: Option<u32>) -> Self {
        quantity.map_or(Self::Absent, Self::Count)
    }
}

impl From<ItemQuantity> for Option<u32> {
    fn from(quantity: ItemQuantity) -> Self {
        quantity.count()
    }
}

/// Value of an `add` operation: the product (by EAN) and its quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCartItem {
    /// EAN code of the product. The store is implied by the store visit.
    pub product: String,
    /// Number of units, omitted on the wire when absent.
    #[serde(default, skip_serializing_if = "ItemQuantity::is_absent")]
    pub quantity: ItemQuantity,
}

/// A single edit of a store visit's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireOp", into = "WireOp")]
pub enum PatchOp {
    /// Append a line to the end of the cart.
    AddItem(NewCartItem),
    /// Set the quantity of the line at `index`.
    ReplaceQuantity {
        /// Zero-based line index as last observed from the server.
        index: usize,
        /// New quantity.
        quantity: u32,
    },
    /// Remove the line at `index`.
    RemoveItem {
        /// Zero-based line index as last observed from the server.
        index: usize,
    },
}

impl PatchOp {
    /// The RFC 6902 operation name.
    #[must_use]
    pub const fn op(&self) -> &'static str {
        self.kind().as_str()
    }

    /// The JSON Pointer this operation targets.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::AddItem(_) => format!("{CART_ITEMS_PATH}/-"),
            Self::ReplaceQuantity { index, .. } => format!("{CART_ITEMS_PATH}/{index}/quantity"),
            Self::RemoveItem { index } => format!("{CART_ITEMS_PATH}/{index}"),
        }
    }

    /// The operation's value, if it carries one.
    #[must_use]
    pub fn value(&self) -> Option<Value> {
        match self {
            Self::AddItem(item) => serde_json::to_value(item).ok(),
            Self::ReplaceQuantity { quantity, .. } => Some(Value::from(*quantity)),
            Self::RemoveItem { .. } => None,
        }
    }

    const fn kind(&self) -> OpKind {
        match self {
            Self::AddItem(_) => OpKind::Add,
            Self::ReplaceQuantity { .. } => OpKind::Replace,
            Self::RemoveItem { .. } => OpKind::Remove,
        }
    }
}

/// An ordered list of cart edits sent in one PATCH request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartPatch(Vec<PatchOp>);

impl CartPatch {
    /// A patch consisting of a single operation.
    #[must_use]
    pub fn single(op: PatchOp) -> Self {
        Self(vec![op])
    }

    /// The operations in application order.
    #[must_use]
    pub fn ops(&self) -> &[PatchOp] {
        &self.0
    }

    /// Number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the patch has no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append the operations of `next` after this patch's operations.
    #[must_use]
    pub fn then(mut self, next: Self) -> Self {
        self.0.extend(next.0);
        self
    }

    /// Consumes the patch and returns its operations.
    #[must_use]
    pub fn into_ops(self) -> Vec<PatchOp> {
        self.0
    }
}

impl From<Vec<PatchOp>> for CartPatch {
    fn from(ops: Vec<PatchOp>) -> Self {
        Self(ops)
    }
}

impl IntoIterator for CartPatch {
    type Item = PatchOp;
    type IntoIter = std::vec::IntoIter<PatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a CartPatch {
    type Item = &'a PatchOp;
    type IntoIter = std::slice::Iter<'a, PatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Add `quantity` units of the product with EAN `ean` to the end of the cart.
///
/// The quantity is left out for variable-price codes. `ean` is not validated;
/// callers check it with [`is_valid_ean`](crate::is_valid_ean) first.
///
/// ```
/// use grocery_aid_core::{ItemQuantity, PatchOp, add_product};
///
/// let patch = add_product("2000000000000", 5);
/// let [PatchOp::AddItem(item)] = patch.ops() else { panic!() };
/// assert_eq!(item.quantity, ItemQuantity::Absent);
/// ```
#[must_use]
pub fn add_product(ean: &str, quantity: u32) -> CartPatch {
    let quantity = if is_variable_price_ean(ean) {
        ItemQuantity::Absent
    } else {
        ItemQuantity::Count(quantity)
    };

    CartPatch::single(PatchOp::AddItem(NewCartItem {
        product: ean.to_owned(),
        quantity,
    }))
}

/// Add a single unit of the product with EAN `ean`.
#[must_use]
pub fn add_single_product(ean: &str) -> CartPatch {
    add_product(ean, DEFAULT_QUANTITY)
}

/// Set the quantity of the cart line at `index`.
///
/// The index refers to the cart as last fetched. Nothing guards against a
/// concurrent edit reordering the cart; the last write wins.
#[must_use]
pub fn change_cart_product_quantity(index: usize, quantity: u32) -> CartPatch {
    CartPatch::single(PatchOp::ReplaceQuantity { index, quantity })
}

/// Remove the cart line at `index`.
#[must_use]
pub fn remove_product(index: usize) -> CartPatch {
    CartPatch::single(PatchOp::RemoveItem { index })
}

// =============================================================================
// Wire representation
// =============================================================================

/// Errors reading a patch operation from its wire form.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// The path is not one of the cart item paths this operation supports.
    #[error("unsupported path {path:?} for {op} operation")]
    UnsupportedPath {
        /// Operation name.
        op: &'static str,
        /// Offending JSON Pointer.
        path: String,
    },
    /// The operation requires a value and none was given.
    #[error("{0} operation requires a value")]
    MissingValue(&'static str),
    /// The value has the wrong shape.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OpKind {
    Add,
    Replace,
    Remove,
}

impl OpKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Replace => "replace",
            Self::Remove => "remove",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireOp {
    op: OpKind,
    path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
}

impl From<PatchOp> for WireOp {
    fn from(op: PatchOp) -> Self {
        Self {
            op: op.kind(),
            path: op.path(),
            value: op.value(),
        }
    }
}

impl TryFrom<WireOp> for PatchOp {
    type Error = PatchError;

    fn try_from(wire: WireOp) -> Result<Self, Self::Error> {
        let op = wire.op.as_str();
        let unsupported = || PatchError::UnsupportedPath {
            op,
            path: wire.path.clone(),
        };

        let segments: Vec<&str> = wire
            .path
            .strip_prefix(CART_ITEMS_PATH)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(unsupported)?
            .split('/')
            .collect();

        match (wire.op, segments.as_slice()) {
            (OpKind::Add, ["-"]) => {
                let value = wire.value.clone().ok_or(PatchError::MissingValue(op))?;
                let item = serde_json::from_value(value)
                    .map_err(|e| PatchError::InvalidValue(e.to_string()))?;
                Ok(Self::AddItem(item))
            }
            (OpKind::Replace, [index, "quantity"]) => {
                let index = index.parse().map_err(|_| unsupported())?;
                let value = wire.value.clone().ok_or(PatchError::MissingValue(op))?;
                let quantity = serde_json::from_value(value)
                    .map_err(|e| PatchError::InvalidValue(e.to_string()))?;
                Ok(Self::ReplaceQuantity { index, quantity })
            }
            (OpKind::Remove, [index]) => {
                let index = index.parse().map_err(|_| unsupported())?;
                Ok(Self::RemoveItem { index })
            }
            _ => Err(unsupported()),
        }
    }
}
