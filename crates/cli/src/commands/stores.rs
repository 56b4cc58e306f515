//! Store listing.

use std::io::Write;

use grocery_aid_client::ApiClient;

/// Print every store with its id.
///
/// # Errors
///
/// Returns an error if the API request fails or the output cannot be written.
pub async fn list(out: &mut impl Write, api: &ApiClient) -> Result<(), Box<dyn std::error::Error>> {
    let stores = api.get_stores().await?;
    tracing::debug!(count = stores.len(), "Fetched stores");

    if stores.is_empty() {
        writeln!(out, "No stores")?;
    }
    for store in &stores {
        writeln!(out, "{}  {}", store.id, store.name)?;
    }
    Ok(())
}
