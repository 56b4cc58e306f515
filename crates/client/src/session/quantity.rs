//! Debounced quantity input for one cart line.
//!
//! Rapid edits (holding an arrow key, typing "12") are coalesced: each edit
//! restarts the window and only the last value is emitted once the window
//! passes without further edits. The edited value stays on screen until the
//! server reports a new quantity through [`QuantityInput::commit`].
//!
//! The type is a plain state machine over [`Instant`]s; the caller owns the
//! timer and calls [`QuantityInput::poll`] when [`QuantityInput::next_deadline`]
//! is reached.

use std::time::{Duration, Instant};

/// Smallest quantity the input accepts.
pub const MIN_QUANTITY: u32 = 1;

/// Largest quantity the input accepts.
pub const MAX_QUANTITY: u32 = 999;

/// Quiet period after the last edit before the value is emitted.
pub const QUANTITY_DEBOUNCE: Duration = Duration::from_millis(200);

/// Quantity field of a cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantityInput {
    committed: Option<u32>,
    uncommitted: Option<u32>,
    deadline: Option<Instant>,
    delay: Duration,
}

impl QuantityInput {
    /// Input showing the server's `quantity` (absent for variable-price
    /// items).
    #[must_use]
    pub const fn new(quantity: Option<u32>) -> Self {
        Self::with_delay(quantity, QUANTITY_DEBOUNCE)
    }

    /// Input with a custom debounce window.
    #[must_use]
    pub const fn with_delay(quantity: Option<u32>, delay: Duration) -> Self {
        Self {
            committed: quantity,
            uncommitted: None,
            deadline: None,
            delay,
        }
    }

    /// Value to show: the local edit if there is one, else the server value.
    #[must_use]
    pub fn displayed(&self) -> Option<u32> {
        self.uncommitted.or(self.committed)
    }

    /// Last value reported by the server.
    #[must_use]
    pub const fn committed(&self) -> Option<u32> {
        self.committed
    }

    /// When the pending edit will be emitted, if any.
    #[must_use]
    pub const fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Record an edit made at `now` and restart the window.
    ///
    /// The value is clamped to `MIN_QUANTITY..=MAX_QUANTITY`; the clamped
    /// value is returned.
    pub fn edit(&mut self, value: u32, now: Instant) -> u32 {
        let value = value.clamp(MIN_QUANTITY, MAX_QUANTITY);
        self.uncommitted = Some(value);
        self.deadline = Some(now + self.delay);
        value
    }

    /// Emit the pending edit if its window has passed at `now`.
    ///
    /// Returns the quantity to send to the server. An edit that ends where
    /// the server value already is produces nothing.
    pub fn poll(&mut self, now: Instant) -> Option<u32> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.uncommitted.filter(|value| Some(*value) != self.committed)
            }
            _ => None,
        }
    }

    /// Adopt a quantity reported by the server.
    ///
    /// Drops the local edit and cancels any pending emission.
    pub fn commit(&mut self, quantity: Option<u32>) {
        self.committed = quantity;
        self.uncommitted = None;
        self.deadline = None;
    }
}
