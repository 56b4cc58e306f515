//! User-facing errors.
//!
//! Maps failures from the API and session layer onto what a front end shows:
//!
//! - [`UserFacingError::InvalidEan`] - field message, the input stays
//! - [`UserFacingError::NotFound`] - the lookup failed, the session continues
//! - [`UserFacingError::Mutation`] - a cart change failed, the input stays for
//!   a retry
//! - [`UserFacingError::Other`] - everything else, with the underlying message

use std::fmt;

use thiserror::Error;

use crate::api::ApiError;
use crate::session::{INVALID_EAN_MESSAGE, SessionError};

/// Kind of resource a lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Store,
    Product,
    StoreVisit,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Store => "Store",
            Self::Product => "Product",
            Self::StoreVisit => "Store visit",
        })
    }
}

/// A failure as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserFacingError {
    /// The typed or scanned code is not an EAN-13.
    #[error("{}", INVALID_EAN_MESSAGE)]
    InvalidEan,

    /// The looked-up resource does not exist.
    #[error("{0} not found")]
    NotFound(Resource),

    /// A change to the cart was not applied.
    #[error("{0}")]
    Mutation(String),

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl UserFacingError {
    /// Classify a failed lookup of `resource`.
    ///
    /// A 404 becomes [`Self::NotFound`]; anything else keeps the API message.
    #[must_use]
    pub fn lookup(resource: Resource, err: &ApiError) -> Self {
        if err.is_not_found() {
            Self::NotFound(resource)
        } else {
            Self::Other(err.message())
        }
    }

    /// Classify a failed cart change.
    #[must_use]
    pub fn mutation(err: &SessionError) -> Self {
        match err {
            SessionError::NoActiveVisit => Self::Other(err.to_string()),
            SessionError::Api(api) => Self::Mutation(api.message()),
        }
    }

    /// Classify a failure that is neither a lookup nor a cart change.
    #[must_use]
    pub fn other(err: &impl std::error::Error) -> Self {
        Self::Other(err.to_string())
    }

    /// Returns `true` if the user's input should be kept for a retry.
    #[must_use]
    pub const fn keeps_input(&self) -> bool {
        matches!(self, Self::InvalidEan | Self::Mutation(_))
    }
}

impl From<SessionError> for UserFacingError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Api(api) if api.is_not_found() => Self::NotFound(Resource::StoreVisit),
            other => Self::Other(other.to_string()),
        }
    }
}
