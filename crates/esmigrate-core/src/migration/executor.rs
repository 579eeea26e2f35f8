//! Migration executor - applies one migration against a backend.
//!
//! Checks the preconditions, creates the destination index and streams every
//! source document through the migration's transforms into it.

use super::error::MigrationError;
use super::step::Migration;
use crate::backend::Backend;
use crate::config::MigrationConfig;
use crate::document::{BulkCommand, Document};
use tracing::{debug, info, instrument};

/// Result of a migration execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationResult {
    /// Source index, if documents were copied.
    pub from_index: Option<String>,
    /// Index that was created.
    pub to_index: String,
    /// Source documents visited.
    pub documents_read: u64,
    /// Destination documents written.
    pub documents_written: u64,
}

impl MigrationResult {
    /// Whether the migration only created an empty index.
    pub fn created_only(&self) -> bool {
        self.from_index.is_none()
    }
}

/// Migration executor.
///
/// The copy is not transactional: if a write fails part way through, the
/// destination index is left partially populated and the error is returned.
/// A retry must remove the destination first, otherwise it stops at the
/// "destination already exists" precondition.
pub struct MigrationExecutor<B> {
    backend: B,
    config: MigrationConfig,
}

impl<B: Backend> MigrationExecutor<B> {
    /// Create an executor with the default configuration.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, MigrationConfig::default())
    }

    /// Create an executor with an explicit configuration.
    pub fn with_config(backend: B, config: MigrationConfig) -> Self {
        Self { backend, config }
    }

    /// The executor configuration.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// The backend migrations run against.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run one migration end to end.
    ///
    /// Nothing is written unless the source exists (when there is one) and the
    /// destination does not.
    #[instrument(skip(self, migration), fields(from = ?migration.from_index, to = %migration.to_index))]
    pub fn migrate(&self, migration: &Migration) -> Result<MigrationResult, MigrationError> {
        self.check_preconditions(migration)?;

        self.backend
            .create_index(&migration.to_index, &migration.settings)?;
        info!(index = %migration.to_index, "created destination index");

        let mut result = MigrationResult {
            from_index: migration.from_index.clone(),
            to_index: migration.to_index.clone(),
            documents_read: 0,
            documents_written: 0,
        };

        let Some(from_index) = migration.source() else {
            return Ok(result);
        };

        self.copy(migration, from_index, &mut result)?;

        info!(
            from_index,
            to_index = %migration.to_index,
            documents_read = result.documents_read,
            documents_written = result.documents_written,
            "copy complete"
        );
        Ok(result)
    }

    fn check_preconditions(&self, migration: &Migration) -> Result<(), MigrationError> {
        if let Some(from_index) = migration.source() {
            if !self.backend.index_exists(from_index)? {
                debug!(from_index, "source index missing");
                return Err(MigrationError::SourceMissing {
                    index: from_index.to_string(),
                });
            }
        }

        if self.backend.index_exists(&migration.to_index)? {
            debug!(to_index = %migration.to_index, "destination index already exists");
            return Err(MigrationError::DestinationExists {
                index: migration.to_index.clone(),
            });
        }

        Ok(())
    }

    fn copy(
        &self,
        migration: &Migration,
        from_index: &str,
        result: &mut MigrationResult,
    ) -> Result<(), MigrationError> {
        let interval = self.config.progress_interval;

        self.backend.for_each(
            &self.config.query,
            &[from_index],
            &[],
            &mut |source: Document| {
                result.documents_read += 1;

                for mut document in migration.transform(source) {
                    document.index = migration.to_index.clone();
                    document.bulk_command = Some(BulkCommand::Index);
                    self.backend.index(document)?;
                    result.documents_written += 1;
                }

                if interval > 0 && result.documents_read % interval == 0 {
                    info!(
                        documents_read = result.documents_read,
                        documents_written = result.documents_written,
                        "copy progress"
                    );
                }
                Ok(())
            },
        )?;

        Ok(())
    }
}

/// Run one migration against `backend` with the default configuration.
pub fn migrate<B: Backend>(backend: B, migration: &Migration) -> Result<MigrationResult, MigrationError> {
    MigrationExecutor::new(backend).migrate(migration)
}
