//! Cursor-based iteration over large result sets.
//!
//! Search clusters hand out results in pages tied to a scroll id. Adapters
//! implement [`ScrollClient`] and delegate [`Backend::for_each`] to
//! [`scroll_each`], which flattens the pages into one ordered stream of
//! documents.
//!
//! [`Backend::for_each`]: super::Backend::for_each

use super::Visitor;
use crate::config::ScrollConfig;
use crate::document::Document;
use crate::error::BackendError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// One page of scroll results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollPage {
    /// Cursor for the next page. `None` once the backend has released it.
    pub scroll_id: Option<String>,
    /// Documents in this page. Empty means the cursor is exhausted.
    pub hits: Vec<Document>,
}

/// Page-level access to a scroll cursor.
pub trait ScrollClient {
    /// Start a scroll and return the first page.
    fn open_scroll(
        &self,
        query: &Value,
        indices: &[&str],
        types: &[&str],
        config: &ScrollConfig,
    ) -> Result<ScrollPage, BackendError>;

    /// Fetch the page following `scroll_id`.
    fn next_page(&self, scroll_id: &str, config: &ScrollConfig)
        -> Result<ScrollPage, BackendError>;

    /// Release the cursor early.
    fn close_scroll(&self, _scroll_id: &str) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Visit every document of a scroll, page by page, in order.
///
/// Stops at the first empty page or the first visitor error. The cursor is
/// always closed afterwards; a failure to close is logged and not returned.
pub fn scroll_each<C: ScrollClient + ?Sized>(
    client: &C,
    config: &ScrollConfig,
    query: &Value,
    indices: &[&str],
    types: &[&str],
    visit: &mut Visitor<'_>,
) -> Result<(), BackendError> {
    let mut page = client.open_scroll(query, indices, types, config)?;
    let mut pages = 0u64;

    let result = loop {
        if page.hits.is_empty() {
            break Ok(());
        }
        pages += 1;

        if let Err(e) = page.hits.drain(..).try_for_each(&mut *visit) {
            break Err(e);
        }

        let Some(scroll_id) = page.scroll_id.as_deref() else {
            break Ok(());
        };
        match client.next_page(scroll_id, config) {
            Ok(next) => page = next,
            Err(e) => break Err(e),
        }
    };

    if let Some(scroll_id) = page.scroll_id.as_deref() {
        if let Err(e) = client.close_scroll(scroll_id) {
            warn!(scroll_id, error = %e, "failed to close scroll");
        }
    }

    debug!(pages, ok = result.is_ok(), "scroll finished");
    result
}
