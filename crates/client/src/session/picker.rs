//! Product picker: the EAN input field.
//!
//! The field moves through these states:
//!
//! ```text
//!   edit ──► invalid (validation_error) ──edit──► ...
//!     │
//!     └──► valid ──begin_lookup──► lookup pending ──lookup_finished──► found / failed
//!            │
//!            └──begin_submit──► submitting ──submit_finished(Ok)──► empty
//!                                    │
//!                                    └──submit_finished(Err)──► valid, error shown, input kept
//! ```
//!
//! Async completions are matched against the code they were started for, so
//! a lookup that finishes after the user typed something else is ignored.

use grocery_aid_core::{Ean, Product};

/// Field message for input that is not a valid EAN-13 code.
pub const INVALID_EAN_MESSAGE: &str = "Invalid EAN";

/// Progress of the product lookup for the current input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LookupState {
    /// No lookup started for the current input.
    #[default]
    Idle,
    /// Waiting for the server.
    Pending,
    /// The product exists in the store.
    Found(Box<Product>),
    /// The lookup failed; the message is shown to the user.
    Failed(String),
}

/// State of the EAN input field.
#[derive(Debug, Clone, Default)]
pub struct ProductPicker {
    raw: String,
    parsed: Option<Ean>,
    validation_error: Option<String>,
    lookup: LookupState,
    submitting: bool,
}

impl ProductPicker {
    /// An empty field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Text as typed or scanned.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The validated code, if the input is one.
    #[must_use]
    pub const fn parsed(&self) -> Option<&Ean> {
        self.parsed.as_ref()
    }

    /// Message to show next to the field.
    #[must_use]
    pub fn validation_error(&self) -> Option<&str> {
        self.validation_error.as_deref()
    }

    /// Lookup progress for the current input.
    #[must_use]
    pub const fn lookup(&self) -> &LookupState {
        &self.lookup
    }

    /// Returns `true` while an add request is in flight.
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Returns `true` if the input can be submitted now.
    #[must_use]
    pub const fn can_submit(&self) -> bool {
        self.parsed.is_some() && !self.submitting
    }

    /// Replace the input and validate it.
    ///
    /// Empty input carries no error but cannot be submitted. Any lookup
    /// result for the previous input is discarded.
    pub fn edit(&mut self, raw: impl Into<String>) {
        self.raw = raw.into();
        let input = self.raw.trim();

        self.parsed = Ean::parse(input).ok();
        self.validation_error = if input.is_empty() || self.parsed.is_some() {
            None
        } else {
            Some(INVALID_EAN_MESSAGE.to_string())
        };
        self.lookup = LookupState::Idle;
    }

    /// Mark a lookup as started and return the code to look up.
    ///
    /// Returns `None` if the input is not a valid code or a lookup for it
    /// already ran.
    pub fn begin_lookup(&mut self) -> Option<Ean> {
        if self.lookup != LookupState::Idle {
            return None;
        }
        let ean = self.parsed.clone()?;
        self.lookup = LookupState::Pending;
        Some(ean)
    }

    /// Record the result of the lookup started for `ean`.
    ///
    /// Ignored if the input changed in the meantime. Returns whether the
    /// result was applied.
    pub fn lookup_finished(&mut self, ean: &Ean, result: Result<Product, String>) -> bool {
        if self.parsed.as_ref() != Some(ean) || self.lookup != LookupState::Pending {
            return false;
        }
        self.lookup = match result {
            Ok(product) => LookupState::Found(Box::new(product)),
            Err(message) => LookupState::Failed(message),
        };
        true
    }

    /// Start submitting and return the code to add.
    ///
    /// Returns `None` if the input is invalid or a submit is already running.
    pub fn begin_submit(&mut self) -> Option<Ean> {
        if !self.can_submit() {
            return None;
        }
        self.submitting = true;
        self.validation_error = None;
        self.parsed.clone()
    }

    /// Record the outcome of the submit.
    ///
    /// Success clears the field for the next code. Failure keeps the input so
    /// the user can retry, and shows `message`.
    pub fn submit_finished(&mut self, result: Result<(), String>) {
        if !self.submitting {
            return;
        }
        match result {
            Ok(()) => *self = Self::default(),
            Err(message) => {
                self.submitting = false;
                self.validation_error = Some(message);
            }
        }
    }
}
