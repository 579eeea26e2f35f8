//! Migration engine for aliased indices.
//!
//! This module provides staged, zero-downtime index migrations:
//! - Per-type document transforms with identity fallback
//! - Folding chained steps into one composite migration
//! - Streaming copy from source to destination index
//! - Resume-point detection from index existence alone
//! - Alias cutover once the copy succeeds
//! - One-off index copies and alias migrations outside a chain
//!
//! # Chain states
//!
//! | State | Backend looks like | `run` does |
//! |-------|--------------------|------------|
//! | **NotStarted** | No source/destination pair is half done | Runs the whole chain as one composite |
//! | **PartiallyComplete(i)** | Step `i`'s source exists, its destination does not | Runs steps `i..` as one composite |
//! | **FullyComplete** | The last destination exists | Nothing |
//!
//! # Example
//!
//! ```
//! use esmigrate_core::backend::MemoryBackend;
//! use esmigrate_core::migration::{Migration, MigrationSet};
//! use esmigrate_core::Document;
//! use serde_json::json;
//!
//! let backend = MemoryBackend::new();
//! let set = MigrationSet::new(vec![
//!     Migration::initial("people-00"),
//!     Migration::new("people-00", "people-01")
//!         .with_settings(json!({"mappings": {}}))
//!         .with_transformer("person", |mut doc: Document| {
//!             doc.set_field("migrated", true);
//!             vec![doc]
//!         }),
//! ])
//! .with_alias("people");
//!
//! set.run(&backend).unwrap();
//! assert_eq!(backend.alias_targets("people"), vec!["people-01"]);
//! ```

pub mod composite;
pub mod copy;
pub mod error;
pub mod executor;
pub mod set;
pub mod step;
pub mod transform;

// Re-export main types

// Error types
pub use error::MigrationError;

// Step and transform types
pub use step::Migration;
pub use transform::{drop_all, identity, Transformer, TypeTransformers};

// Standalone copies
pub use copy::{copy_index, migrate_alias, IndexCopy};

// Executor types
pub use executor::{migrate, MigrationExecutor, MigrationResult};

// Set types
pub use set::{ChainState, MigrationPlan, MigrationSet, RunOutcome};
