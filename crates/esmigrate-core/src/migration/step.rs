//! A single migration step.

use super::transform::TypeTransformers;
use crate::document::Document;
use serde_json::Value;

/// One step in a migration chain: copy `from_index` into a newly created
/// `to_index`, transforming documents by type on the way.
///
/// A step without a source only creates the destination index.
#[derive(Debug, Clone)]
pub struct Migration {
    /// Source index. `None` creates `to_index` fresh.
    pub from_index: Option<String>,
    /// Destination index. Must be non-empty and unique within a chain.
    pub to_index: String,
    /// Opaque settings passed verbatim to index creation.
    pub settings: Value,
    /// Transform stages applied in order. A plain step has exactly one.
    pub(super) stages: Vec<TypeTransformers>,
}

impl Migration {
    /// Create a step that copies `from_index` into `to_index`.
    ///
    /// An empty `from_index` is the same as [`Migration::initial`].
    pub fn new(from_index: impl Into<String>, to_index: impl Into<String>) -> Self {
        let from_index = from_index.into();
        Self {
            from_index: (!from_index.is_empty()).then_some(from_index),
            to_index: to_index.into(),
            settings: Value::Null,
            stages: vec![TypeTransformers::new()],
        }
    }

    /// Create a step that only creates `to_index`.
    pub fn initial(to_index: impl Into<String>) -> Self {
        Self::new(String::new(), to_index)
    }

    /// Set the destination settings.
    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = settings;
        self
    }

    /// Register a transform for one document type.
    pub fn with_transformer<F>(mut self, doc_type: impl Into<String>, transform: F) -> Self
    where
        F: Fn(Document) -> Vec<Document> + Send + Sync + 'static,
    {
        match self.stages.last_mut() {
            Some(stage) => stage.insert(doc_type, transform),
            None => self
                .stages
                .push(TypeTransformers::new().with(doc_type, transform)),
        }
        self
    }

    /// Replace this step's transforms.
    pub fn with_type_transformers(mut self, transformers: TypeTransformers) -> Self {
        self.stages = vec![transformers];
        self
    }

    /// Source index name, if this step copies documents.
    pub fn source(&self) -> Option<&str> {
        self.from_index.as_deref()
    }

    /// Whether this step only creates its destination.
    pub fn is_initial(&self) -> bool {
        self.from_index.is_none()
    }

    /// Transform stages, in application order.
    pub fn stages(&self) -> &[TypeTransformers] {
        &self.stages
    }

    /// Map one source document to its destination documents.
    ///
    /// Each stage looks up a transform by the *current* type of every
    /// document produced by the previous stage.
    pub fn transform(&self, document: Document) -> Vec<Document> {
        self.stages.iter().fold(vec![document], |documents, stage| {
            documents
                .into_iter()
                .flat_map(|document| stage.apply(document))
                .collect()
        })
    }
}
