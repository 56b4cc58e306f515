//! Shopping session state.
//!
//! Everything a front end needs between user events, without any rendering:
//!
//! - [`VisitState`] - the single owner of the current store visit snapshot
//! - [`ProductPicker`] - state machine of the EAN input field
//! - [`QuantityInput`] - debounced quantity editing of one cart line
//!
//! The types here hold no I/O handles. Actions that talk to the server take
//! an [`ApiClient`](crate::ApiClient) argument.

mod picker;
mod quantity;
mod visit;

pub use picker::{INVALID_EAN_MESSAGE, LookupState, ProductPicker};
pub use quantity::{MAX_QUANTITY, MIN_QUANTITY, QUANTITY_DEBOUNCE, QuantityInput};
pub use visit::VisitState;

use thiserror::Error;

use crate::api::ApiError;

/// Errors from session actions.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A cart action was attempted before a store visit was created or loaded.
    #[error("No store visit in progress")]
    NoActiveVisit,

    /// The API request failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}
