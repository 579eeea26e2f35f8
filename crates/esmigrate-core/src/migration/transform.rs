//! Per-type document transforms.
//!
//! A transform maps one source document to any number of destination
//! documents: returning the input unchanged keeps it, returning nothing drops
//! it, returning several splits or duplicates it. Transforms must be pure;
//! the same transform runs once per document and again on any retry.

use crate::document::Document;
use std::collections::HashMap;
use std::sync::Arc;

/// A shareable document transform.
pub type Transformer = Arc<dyn Fn(Document) -> Vec<Document> + Send + Sync>;

/// Transform that discards every document.
pub fn drop_all(_document: Document) -> Vec<Document> {
    Vec::new()
}

/// Transform that passes the document through unchanged.
pub fn identity(document: Document) -> Vec<Document> {
    vec![document]
}

/// Transforms keyed by document type.
///
/// Types without an entry pass through unchanged.
#[derive(Clone, Default)]
pub struct TypeTransformers {
    by_type: HashMap<String, Transformer>,
}

impl TypeTransformers {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the transform for a document type, replacing any previous one.
    pub fn insert<F>(&mut self, doc_type: impl Into<String>, transform: F)
    where
        F: Fn(Document) -> Vec<Document> + Send + Sync + 'static,
    {
        self.by_type.insert(doc_type.into(), Arc::new(transform));
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with<F>(mut self, doc_type: impl Into<String>, transform: F) -> Self
    where
        F: Fn(Document) -> Vec<Document> + Send + Sync + 'static,
    {
        self.insert(doc_type, transform);
        self
    }

    /// The transform registered for a type.
    pub fn get(&self, doc_type: &str) -> Option<&Transformer> {
        self.by_type.get(doc_type)
    }

    /// Apply the transform for the document's type, or pass it through.
    pub fn apply(&self, document: Document) -> Vec<Document> {
        match self.by_type.get(&document.doc_type) {
            Some(transform) => transform(document),
            None => vec![document],
        }
    }

    /// Registered types, sorted.
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.by_type.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    /// Whether no type has a transform.
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl std::fmt::Debug for TypeTransformers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.types()).finish()
    }
}
