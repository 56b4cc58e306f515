//! Core types for Grocery Aid.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod ean;
pub mod id;
pub mod price;

pub use ean::{
    EAN_LENGTH, EAN_PREFIX_LENGTH, Ean, EanError, calculate_check_digit, is_valid_ean,
    is_variable_price_ean,
};
pub use id::*;
pub use price::Price;
