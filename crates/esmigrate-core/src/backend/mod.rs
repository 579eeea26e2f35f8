//! The search backend capability consumed by the migration engine.
//!
//! The engine never talks to a concrete client. Everything it needs from a
//! search cluster is expressed by [`Backend`], so the executor and the
//! migration-set orchestrator run the same way against a live cluster adapter
//! or against [`MemoryBackend`].

pub mod alias;
pub mod memory;
pub mod scroll;

pub use alias::move_alias;
pub use memory::{BackendCall, BackendOp, IndexSnapshot, MemoryBackend, MemorySnapshot};
pub use scroll::{scroll_each, ScrollClient, ScrollPage};

use crate::document::Document;
use crate::error::BackendError;
use serde_json::Value;

/// Callback invoked once per document during [`Backend::for_each`].
///
/// Returning an error stops the iteration; the error is handed back to the
/// caller of `for_each`.
pub type Visitor<'a> = dyn FnMut(Document) -> Result<(), BackendError> + 'a;

/// Operations a search backend must provide.
pub trait Backend {
    /// True iff every named index exists.
    fn indices_exist(&self, names: &[&str]) -> Result<bool, BackendError>;

    /// Create an index with opaque settings. Fails if the index already exists.
    fn create_index(&self, name: &str, settings: &Value) -> Result<(), BackendError>;

    /// Upsert one document into `document.index`, overwriting on id collision.
    fn index(&self, document: Document) -> Result<(), BackendError>;

    /// Visit every document matching `query` in `indices`, in arrival order.
    ///
    /// An empty `types` list means no type filter. Paging is internal to the
    /// backend. The first visitor error aborts the iteration and is returned.
    fn for_each(
        &self,
        query: &Value,
        indices: &[&str],
        types: &[&str],
        visit: &mut Visitor<'_>,
    ) -> Result<(), BackendError>;

    /// Point `alias` at each of `indices`. Idempotent.
    fn add_alias(&self, alias: &str, indices: &[&str]) -> Result<(), BackendError>;

    /// Remove `alias` from each of `indices`. Idempotent.
    fn remove_alias(&self, alias: &str, indices: &[&str]) -> Result<(), BackendError>;

    /// Indices `alias` currently points at, sorted. Empty for an unknown alias.
    fn get_alias(&self, alias: &str) -> Result<Vec<String>, BackendError>;

    /// Make recently written documents visible to reads.
    fn refresh_index(&self, name: &str) -> Result<(), BackendError>;

    /// True iff the single named index exists.
    fn index_exists(&self, name: &str) -> Result<bool, BackendError> {
        self.indices_exist(&[name])
    }
}

impl<B: Backend + ?Sized> Backend for &B {
    fn indices_exist(&self, names: &[&str]) -> Result<bool, BackendError> {
        (**self).indices_exist(names)
    }

    fn create_index(&self, name: &str, settings: &Value) -> Result<(), BackendError> {
        (**self).create_index(name, settings)
    }

    fn index(&self, document: Document) -> Result<(), BackendError> {
        (**self).index(document)
    }

    fn for_each(
        &self,
        query: &Value,
        indices: &[&str],
        types: &[&str],
        visit: &mut Visitor<'_>,
    ) -> Result<(), BackendError> {
        (**self).for_each(query, indices, types, visit)
    }

    fn add_alias(&self, alias: &str, indices: &[&str]) -> Result<(), BackendError> {
        (**self).add_alias(alias, indices)
    }

    fn remove_alias(&self, alias: &str, indices: &[&str]) -> Result<(), BackendError> {
        (**self).remove_alias(alias, indices)
    }

    fn get_alias(&self, alias: &str) -> Result<Vec<String>, BackendError> {
        (**self).get_alias(alias)
    }

    fn refresh_index(&self, name: &str) -> Result<(), BackendError> {
        (**self).refresh_index(name)
    }
}
