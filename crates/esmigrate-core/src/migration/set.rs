//! Migration sets - chains of migrations behind a stable alias.
//!
//! Nothing about a chain's progress is stored. Every run checks which indices
//! exist, works out where the chain stands, runs the remaining steps as one
//! composite migration and then moves the alias.

use super::error::MigrationError;
use super::executor::{MigrationExecutor, MigrationResult};
use super::step::Migration;
use crate::backend::Backend;
use crate::config::MigrationConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Where a chain stands, derived from which indices exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChainState {
    /// No step has a source that exists with a missing destination.
    NotStarted,
    /// The chain resumes at `step`.
    PartiallyComplete {
        /// The step the composite migration starts from.
        step: usize,
    },
    /// The last step's destination exists.
    FullyComplete,
}

impl std::fmt::Display for ChainState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainState::NotStarted => write!(f, "not_started"),
            ChainState::PartiallyComplete { step } => write!(f, "partially_complete({})", step),
            ChainState::FullyComplete => write!(f, "fully_complete"),
        }
    }
}

/// Outcome of probing a chain against a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// First step the composite migration covers.
    pub first_to_run: usize,
    /// Derived chain state.
    pub state: ChainState,
}

impl MigrationPlan {
    /// Whether there is nothing left to run.
    pub fn is_complete(&self) -> bool {
        self.state == ChainState::FullyComplete
    }
}

/// Outcome of [`MigrationSet::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// The plan the run acted on.
    pub plan: MigrationPlan,
    /// Result of the composite migration. `None` when the chain was already complete.
    pub result: Option<MigrationResult>,
}

/// An ordered chain of migrations and the alias that tracks its head.
#[derive(Debug, Clone, Default)]
pub struct MigrationSet {
    /// Alias moved to the newest index after a run. `None` disables alias management.
    pub index_alias: Option<String>,
    /// The chain, oldest step first.
    pub migrations: Vec<Migration>,
}

impl MigrationSet {
    /// Create a set without alias management.
    pub fn new(migrations: Vec<Migration>) -> Self {
        Self {
            index_alias: None,
            migrations,
        }
    }

    /// Set the alias. An empty name disables alias management.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        self.index_alias = (!alias.is_empty()).then_some(alias);
        self
    }

    /// Append a step.
    pub fn with_migration(mut self, migration: Migration) -> Self {
        self.migrations.push(migration);
        self
    }

    /// Check the chain invariants.
    ///
    /// Every destination is non-empty and distinct, and every source after the
    /// first step names an earlier step's destination.
    pub fn validate(&self) -> Result<(), MigrationError> {
        if self.migrations.is_empty() {
            return Err(MigrationError::EmptyChain);
        }

        let mut destinations: HashSet<&str> = HashSet::new();
        for (step, migration) in self.migrations.iter().enumerate() {
            let invalid = |reason: String| MigrationError::InvalidChain { step, reason };

            if migration.to_index.is_empty() {
                return Err(invalid("destination index name is empty".to_string()));
            }
            match migration.source() {
                Some("") => {
                    return Err(invalid("source index name is empty".to_string()));
                }
                Some(from) if from == migration.to_index => {
                    return Err(invalid(format!("step copies {} into itself", from)));
                }
                Some(from) if step > 0 && !destinations.contains(from) => {
                    return Err(invalid(format!(
                        "source {} is not produced by an earlier step",
                        from
                    )));
                }
                _ => {}
            }
            if !destinations.insert(migration.to_index.as_str()) {
                return Err(invalid(format!(
                    "destination {} appears more than once",
                    migration.to_index
                )));
            }
        }

        Ok(())
    }

    /// Work out where the chain stands without changing anything.
    ///
    /// The resume point is the *last* step whose source exists and whose
    /// destination does not; every step is checked. With no such step the chain
    /// starts from the beginning.
    pub fn plan<B: Backend + ?Sized>(&self, backend: &B) -> Result<MigrationPlan, MigrationError> {
        let last = self.migrations.last().ok_or(MigrationError::EmptyChain)?;

        let mut resume_at = None;
        for (step, migration) in self.migrations.iter().enumerate() {
            let Some(from) = migration.source() else {
                continue;
            };
            if backend.index_exists(from)? && !backend.index_exists(&migration.to_index)? {
                resume_at = Some(step);
            }
        }
        let first_to_run = resume_at.unwrap_or(0);

        let state = if backend.index_exists(&last.to_index)? {
            ChainState::FullyComplete
        } else if let Some(step) = resume_at {
            ChainState::PartiallyComplete { step }
        } else {
            ChainState::NotStarted
        };

        Ok(MigrationPlan {
            first_to_run,
            state,
        })
    }

    /// Bring the backend up to the end of the chain with the default configuration.
    pub fn run<B: Backend + ?Sized>(&self, backend: &B) -> Result<RunOutcome, MigrationError> {
        self.run_with_config(backend, MigrationConfig::default())
    }

    /// Bring the backend up to the end of the chain.
    ///
    /// Runs the remaining steps as one composite migration, then points the
    /// alias (if any) at the new index and removes it from the composite's
    /// source. Alias edits happen once, without retry; if one fails after a
    /// successful copy the error is returned and the copy is kept. A later run
    /// then sees the final index and does nothing, so the alias is not
    /// repaired automatically.
    #[instrument(skip(self, backend, config), fields(alias = ?self.index_alias, steps = self.migrations.len()))]
    pub fn run_with_config<B: Backend + ?Sized>(
        &self,
        backend: &B,
        config: MigrationConfig,
    ) -> Result<RunOutcome, MigrationError> {
        self.validate()?;

        let plan = self.plan(backend)?;
        if plan.is_complete() {
            debug!("final index exists, nothing to migrate");
            return Ok(RunOutcome { plan, result: None });
        }

        let composite = Migration::composite(&self.migrations[plan.first_to_run..])?;
        info!(
            state = %plan.state,
            first_to_run = plan.first_to_run,
            from_index = ?composite.from_index,
            to_index = %composite.to_index,
            "running composite migration"
        );

        let result = MigrationExecutor::with_config(backend, config).migrate(&composite)?;

        if let Some(alias) = self.index_alias.as_deref() {
            backend.add_alias(alias, &[composite.to_index.as_str()])?;
            info!(alias, index = %composite.to_index, "alias added");

            if let Some(from) = composite.source() {
                backend.remove_alias(alias, &[from])?;
                info!(alias, index = from, "alias removed");
            }
        }

        Ok(RunOutcome {
            plan,
            result: Some(result),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use serde_json::Value;

    fn chain() -> MigrationSet {
        MigrationSet::new(vec![
            Migration::initial("zero"),
            Migration::new("zero", "one"),
            Migration::new("one", "two"),
        ])
        .with_alias("test")
    }

    #[test]
    fn test_empty_alias_disables_alias_management() {
        assert_eq!(MigrationSet::default().with_alias("").index_alias, None);
        assert_eq!(chain().index_alias.as_deref(), Some("test"));
    }

    #[test]
    fn test_validate_accepts_chain() {
        assert!(chain().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_chain() {
        assert_eq!(MigrationSet::default().validate(), Err(MigrationError::EmptyChain));
    }

    #[test]
    fn test_validate_rejects_duplicate_destination() {
        let set = chain().with_migration(Migration::new("two", "one"));
        assert!(matches!(
            set.validate(),
            Err(MigrationError::InvalidChain { step: 3, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unlinked_source() {
        let set = MigrationSet::new(vec![Migration::initial("zero"), Migration::new("other", "one")]);
        assert!(matches!(
            set.validate(),
            Err(MigrationError::InvalidChain { step: 1, .. })
        ));
    }

    #[test]
    fn test_validate_allows_external_first_source() {
        let set = MigrationSet::new(vec![Migration::new("legacy", "zero"), Migration::new("zero", "one")]);
        assert!(set.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_names() {
        let mut set = chain();
        set.migrations[1].to_index = String::new();
        assert!(matches!(
            set.validate(),
            Err(MigrationError::InvalidChain { step: 1, .. })
        ));

        let mut set = chain();
        set.migrations[2].from_index = Some(String::new());
        assert!(matches!(
            set.validate(),
            Err(MigrationError::InvalidChain { step: 2, .. })
        ));
    }

    #[test]
    fn test_plan_states() {
        let backend = MemoryBackend::new();
        let set = chain();

        let plan = set.plan(&backend).unwrap();
        assert_eq!(plan, MigrationPlan { first_to_run: 0, state: ChainState::NotStarted });

        backend.seed_index("zero", Value::Null, []);
        let plan = set.plan(&backend).unwrap();
        assert_eq!(
            plan,
            MigrationPlan {
                first_to_run: 1,
                state: ChainState::PartiallyComplete { step: 1 }
            }
        );

        backend.seed_index("two", Value::Null, []);
        assert!(set.plan(&backend).unwrap().is_complete());
    }

    #[test]
    fn test_plan_does_not_mutate() {
        let backend = MemoryBackend::new();
        backend.seed_index("zero", Value::Null, []);
        chain().plan(&backend).unwrap();

        assert!(backend
            .calls()
            .iter()
            .all(|c| c.op() == crate::backend::BackendOp::IndicesExist));
    }

    #[test]
    fn test_chain_state_display_and_serde() {
        let state = ChainState::PartiallyComplete { step: 2 };
        assert_eq!(state.to_string(), "partially_complete(2)");
        assert_eq!(
            serde_json::to_value(state).unwrap(),
            serde_json::json!({"state": "partially_complete", "step": 2})
        );
    }
}
