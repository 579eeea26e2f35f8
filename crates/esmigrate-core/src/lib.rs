//! esmigrate core - staged migrations for aliased search indices.
//!
//! Given a chain of migration steps, works out which steps still need to run
//! against the current cluster, folds them into one composite migration,
//! streams every document from the source index through the transforms into
//! a new index and moves the public alias.
//!
//! The cluster itself is reached only through the [`Backend`] trait.

pub mod backend;
pub mod config;
pub mod document;
pub mod error;
pub mod migration;

pub use backend::{move_alias, Backend, MemoryBackend, MemorySnapshot, ScrollClient, ScrollPage};
pub use config::{match_all, MigrationConfig, ScrollConfig};
pub use document::{BulkCommand, Document, Fields};
pub use error::BackendError;
pub use migration::{
    copy_index, drop_all, identity, migrate, migrate_alias, ChainState, IndexCopy, Migration,
    MigrationError, MigrationExecutor, MigrationPlan, MigrationResult, MigrationSet, RunOutcome,
    TypeTransformers,
};
