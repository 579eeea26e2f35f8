//! One-off index copies outside a migration chain.
//!
//! [`copy_index`] creates a destination and streams a source into it through
//! optional per-type transforms. [`migrate_alias`] does the same for the index
//! behind an alias and then moves the alias to the copy.

use super::error::MigrationError;
use super::executor::{MigrationExecutor, MigrationResult};
use super::step::Migration;
use super::transform::TypeTransformers;
use crate::backend::{move_alias, Backend};
use crate::config::MigrationConfig;
use crate::document::Document;
use serde_json::Value;
use tracing::{info, instrument};

/// A copy of one index into a new one.
#[derive(Debug, Clone)]
pub struct IndexCopy {
    /// Index read from.
    pub from_index: String,
    /// Index created and written to.
    pub to_index: String,
    /// Settings for the new index.
    pub settings: Value,
    /// Transforms applied on the way. Unregistered types are copied as is.
    pub transformers: TypeTransformers,
}

impl IndexCopy {
    /// Copy `from_index` into `to_index` unchanged, with no settings.
    pub fn new(from_index: impl Into<String>, to_index: impl Into<String>) -> Self {
        Self {
            from_index: from_index.into(),
            to_index: to_index.into(),
            settings: Value::Null,
            transformers: TypeTransformers::new(),
        }
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
        self.transformers.insert(doc_type, transform);
        self
    }

    /// Replace the transforms.
    pub fn with_type_transformers(mut self, transformers: TypeTransformers) -> Self {
        self.transformers = transformers;
        self
    }

    /// Both names are non-empty and distinct.
    pub fn validate(&self) -> Result<(), MigrationError> {
        let invalid = |reason: &str| MigrationError::InvalidCopy {
            reason: reason.to_string(),
        };
        if self.from_index.is_empty() {
            return Err(invalid("source index name is empty"));
        }
        if self.to_index.is_empty() {
            return Err(invalid("destination index name is empty"));
        }
        if self.from_index == self.to_index {
            return Err(invalid("source and destination are the same index"));
        }
        Ok(())
    }

    /// The equivalent single-step migration.
    pub fn to_migration(&self) -> Migration {
        Migration::new(self.from_index.clone(), self.to_index.clone())
            .with_settings(self.settings.clone())
            .with_type_transformers(self.transformers.clone())
    }
}

/// Create `copy.to_index` and copy every document of `copy.from_index` into it.
///
/// Same preconditions and failure behavior as a migration step: the source
/// must exist, the destination must not, and the first failed write aborts
/// the copy.
#[instrument(skip(backend, copy, config), fields(from = %copy.from_index, to = %copy.to_index))]
pub fn copy_index<B: Backend + ?Sized>(
    backend: &B,
    copy: &IndexCopy,
    config: MigrationConfig,
) -> Result<MigrationResult, MigrationError> {
    copy.validate()?;
    MigrationExecutor::with_config(backend, config).migrate(&copy.to_migration())
}

/// Copy the single index behind `alias` into `to_index`, then point the alias
/// at the copy.
///
/// The alias must point at exactly one index. The alias is left alone if the
/// copy fails.
#[instrument(skip(backend, settings, transformers, config))]
pub fn migrate_alias<B: Backend + ?Sized>(
    backend: &B,
    alias: &str,
    to_index: &str,
    settings: Value,
    transformers: TypeTransformers,
    config: MigrationConfig,
) -> Result<MigrationResult, MigrationError> {
    let mut members = backend.get_alias(alias)?;
    let from_index = match members.len() {
        0 => {
            return Err(MigrationError::AliasNotFound {
                alias: alias.to_string(),
            })
        }
        1 => members.remove(0),
        _ => {
            return Err(MigrationError::AmbiguousAlias {
                alias: alias.to_string(),
                indices: members,
            })
        }
    };

    let copy = IndexCopy::new(from_index, to_index)
        .with_settings(settings)
        .with_type_transformers(transformers);
    let result = copy_index(backend, &copy, config)?;

    move_alias(backend, alias, to_index)?;
    info!(alias, from_index = %copy.from_index, to_index, "alias migrated");
    Ok(result)
}
