//! Current store visit, owned by the session shell.
//!
//! Views read the snapshot through [`VisitState::current`]. It only changes
//! through the actions below, and every change replaces the whole snapshot
//! with what the server returned.

use tracing::{debug, info, instrument};

use grocery_aid_core::{CartPatch, GroupedCart, StoreVisit, StoreVisitId};

use super::SessionError;
use crate::api::{ApiClient, ApiError};

/// The store visit in progress, if any.
#[derive(Debug, Clone, Default)]
pub struct VisitState {
    current: Option<StoreVisit>,
}

impl VisitState {
    /// State with no store visit.
    #[must_use]
    pub const fn new() -> Self {
        Self { current: None }
    }

    /// The current store visit snapshot.
    #[must_use]
    pub const fn current(&self) -> Option<&StoreVisit> {
        self.current.as_ref()
    }

    /// Id of the current store visit.
    #[must_use]
    pub fn current_id(&self) -> Option<StoreVisitId> {
        self.current.as_ref().map(|visit| visit.id)
    }

    /// Start a new store visit in `store` and make it current.
    ///
    /// On failure the previous state is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, api))]
    pub async fn create(
        &mut self,
        api: &ApiClient,
        store: &str,
    ) -> Result<&StoreVisit, ApiError> {
        let visit = api.create_store_visit(store).await?;
        info!(store_visit = %visit.id, "Store visit started");
        Ok(self.current.insert(visit))
    }

    /// Load an existing store visit (id or URL) and make it current.
    ///
    /// On failure the previous state is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the store visit is not found or the API request
    /// fails.
    #[instrument(skip(self, api))]
    pub async fn load(
        &mut self,
        api: &ApiClient,
        store_visit: &str,
    ) -> Result<&StoreVisit, ApiError> {
        let visit = api.get_store_visit(store_visit).await?;
        debug!(store_visit = %visit.id, items = visit.cart.len(), "Store visit loaded");
        Ok(self.current.insert(visit))
    }

    /// Send `patch` for the current store visit and adopt the server's result.
    ///
    /// On failure the snapshot is left untouched so the caller can retry.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoActiveVisit`] without a current store visit,
    /// or the API error if the server rejects the patch.
    #[instrument(skip(self, api, patch), fields(ops = patch.len()))]
    pub async fn apply_patch(
        &mut self,
        api: &ApiClient,
        patch: &CartPatch,
    ) -> Result<&StoreVisit, SessionError> {
        let visit = self.current.as_ref().ok_or(SessionError::NoActiveVisit)?;
        let updated = api.update_store_visit(visit, patch).await?;
        debug!(store_visit = %updated.id, items = updated.cart.len(), "Cart updated");
        Ok(self.current.insert(updated))
    }

    /// Re-fetch the current store visit from the server.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoActiveVisit`] without a current store visit,
    /// or the API error if the request fails.
    pub async fn refresh(&mut self, api: &ApiClient) -> Result<&StoreVisit, SessionError> {
        let url = self
            .current
            .as_ref()
            .ok_or(SessionError::NoActiveVisit)?
            .self_url
            .clone();
        Ok(self.load(api, &url).await?)
    }

    /// Fetch the grouped cart of the current store visit.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoActiveVisit`] without a current store visit,
    /// or the API error if the request fails.
    pub async fn grouped_cart(&self, api: &ApiClient) -> Result<GroupedCart, SessionError> {
        let visit = self.current.as_ref().ok_or(SessionError::NoActiveVisit)?;
        Ok(api.get_grouped_store_visit_cart(visit).await?)
    }

    /// Adopt a store visit snapshot obtained elsewhere.
    ///
    /// The snapshot is applied only if it belongs to the current store visit;
    /// a response that arrives after the user moved on is dropped. Returns
    /// whether the snapshot was applied.
    pub fn update(&mut self, visit: StoreVisit) -> bool {
        match &mut self.current {
            Some(current) if current.id == visit.id => {
                *current = visit;
                true
            }
            _ => {
                debug!(store_visit = %visit.id, "Dropping snapshot of a store visit no longer shown");
                false
            }
        }
    }

    /// Forget the current store visit.
    pub fn clear(&mut self) {
        if let Some(visit) = self.current.take() {
            debug!(store_visit = %visit.id, "Store visit cleared");
        }
    }
}
