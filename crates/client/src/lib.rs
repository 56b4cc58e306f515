//! Grocery Aid client library.
//!
//! Talks to the Grocery Aid REST API and keeps the state of a shopping
//! session between user events.
//!
//! # Modules
//!
//! - [`api`] - Typed REST client (`reqwest`, `moka` cache)
//! - [`config`] - Configuration from environment variables
//! - [`session`] - Store visit owner, EAN input field, debounced quantities
//! - [`error`] - Failures mapped to what the user sees

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod session;

pub use api::{ApiClient, ApiError};
pub use config::{API_PREFIX, ApiConfig, ConfigError, GroceryAidConfig};
pub use error::{Resource, UserFacingError};
pub use session::{
    INVALID_EAN_MESSAGE, LookupState, ProductPicker, QuantityInput, SessionError, VisitState,
};
