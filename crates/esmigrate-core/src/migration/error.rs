//! Migration-specific error types.

use crate::error::BackendError;
use thiserror::Error;

/// Migration-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    /// The source index of a copying migration does not exist.
    #[error("source index {index} does not exist, cannot migrate")]
    SourceMissing {
        /// The missing source index.
        index: String,
    },

    /// The destination index already exists.
    #[error("destination index {index} already exists, cannot migrate")]
    DestinationExists {
        /// The existing destination index.
        index: String,
    },

    /// A migration set or composite was built from no migrations.
    #[error("migration chain is empty")]
    EmptyChain,

    /// A migration set violates the chain invariants.
    #[error("invalid migration chain at step {step}: {reason}")]
    InvalidChain {
        /// Position of the offending step.
        step: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// A standalone copy names no source, no destination, or the same index twice.
    #[error("invalid copy: {reason}")]
    InvalidCopy {
        /// What is wrong with the request.
        reason: String,
    },

    /// The alias to migrate points at no index.
    #[error("alias {alias} does not point at any index")]
    AliasNotFound {
        /// The alias.
        alias: String,
    },

    /// The alias to migrate points at more than one index.
    #[error("alias {alias} points at several indices: {}", .indices.join(", "))]
    AmbiguousAlias {
        /// The alias.
        alias: String,
        /// Its current members.
        indices: Vec<String>,
    },

    /// Backend call failed. Passed through unchanged.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl MigrationError {
    /// Whether the error was raised before anything was written to the backend.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            MigrationError::SourceMissing { .. }
                | MigrationError::DestinationExists { .. }
                | MigrationError::EmptyChain
                | MigrationError::InvalidChain { .. }
                | MigrationError::InvalidCopy { .. }
                | MigrationError::AliasNotFound { .. }
                | MigrationError::AmbiguousAlias { .. }
        )
    }
}
