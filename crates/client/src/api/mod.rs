//! Grocery Aid REST API client.
//!
//! # Architecture
//!
//! - `reqwest` for HTTP, JSON bodies decoded with `serde`
//! - The server is the source of truth: store visits are never cached, every
//!   change is a PATCH whose response replaces the local snapshot
//! - Stores and products are cached in memory via `moka` (5 minute TTL by
//!   default)
//!
//! # Example
//!
//! ```rust,ignore
//! use grocery_aid_client::{ApiClient, ApiConfig};
//! use grocery_aid_core::add_single_product;
//!
//! let client = ApiClient::new(&ApiConfig::for_origin("http://localhost:8000")?)?;
//!
//! let stores = client.get_stores().await?;
//! let visit = client.create_store_visit(&stores[0].self_url).await?;
//! let visit = client
//!     .update_store_visit(&visit, &add_single_product("4006381333931"))
//!     .await?;
//! ```

mod cache;
mod client;

pub use client::ApiClient;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to the REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-success status.
    ///
    /// `detail` is the server's explanation, or a generic description of the
    /// status when the body had none.
    #[error("{detail}")]
    Http {
        /// Response status.
        status: StatusCode,
        /// Error detail from the response body.
        detail: String,
    },

    /// The request never got a response (connection refused, timeout, ...).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the expected resource.
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A resource reference could not be turned into a request URL.
    #[error("Invalid URL {url:?}: {source}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Parse failure.
        source: url::ParseError,
    },
}

impl ApiError {
    /// Message to show to the user.
    ///
    /// The server's `detail` for HTTP errors, the underlying error's
    /// description otherwise.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Http { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status of the response, if there was one.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(err) => err.status(),
            Self::Decode(_) | Self::InvalidUrl { .. } => None,
        }
    }

    /// Returns `true` if the server reported the resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Returns `true` for failures on the server side (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|status| status.is_server_error())
    }

    /// Build an HTTP error from a response status and body.
    pub(crate) fn from_response(status: StatusCode, body: &str) -> Self {
        let detail = parse_detail(body)
            .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));
        Self::Http { status, detail }
    }
}

/// Error body returned by the API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// A single validation failure in a list-valued `detail`.
#[derive(Debug, Deserialize)]
struct ValidationDetail {
    msg: String,
}

/// Extract the `detail` of an error body.
///
/// `detail` is usually a string. Request validation failures carry a list of
/// objects instead; their `msg` fields are joined.
fn parse_detail(body: &str) -> Option<String> {
    let body: ErrorBody = serde_json::from_str(body).ok()?;

    match body.detail {
        serde_json::Value::String(detail) => Some(detail),
        serde_json::Value::Array(items) => {
            let messages: Vec<String> = items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<ValidationDetail>(item).ok())
                .map(|item| item.msg)
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
