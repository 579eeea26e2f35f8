//! Alias repointing outside a migration chain.

use super::Backend;
use crate::error::BackendError;
use tracing::info;

/// Point `alias` at `index` alone.
///
/// The alias is added to `index` first and then removed from every other
/// index it pointed at, so readers never see it empty. Returns the indices
/// it was removed from.
pub fn move_alias<B: Backend + ?Sized>(
    backend: &B,
    alias: &str,
    index: &str,
) -> Result<Vec<String>, BackendError> {
    let previous = backend.get_alias(alias)?;

    backend.add_alias(alias, &[index])?;

    let stale: Vec<&str> = previous
        .iter()
        .map(String::as_str)
        .filter(|member| *member != index)
        .collect();
    if !stale.is_empty() {
        backend.remove_alias(alias, &stale)?;
    }

    info!(alias, index, removed_from = ?stale, "alias moved");
    Ok(stale.into_iter().map(str::to_string).collect())
}
