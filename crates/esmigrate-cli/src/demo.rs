//! The bundled "people" chain.
//!
//! Step 0 creates `people-00` with a single `name` field. Step 1 copies every
//! person into `people-01`, splitting `name` into `given_name` and
//! `family_name`. Running the chain one step at a time shows the alias
//! moving from the first index to the second.

use esmigrate_core::{
    match_all, Backend, BackendError, Document, Migration, MigrationConfig, MigrationError,
    MigrationSet, RunOutcome,
};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::info;

/// Index created by the first step.
pub const PEOPLE_INDEX: &str = "people-00";

/// Index created by the second step.
pub const SPLIT_NAMES_INDEX: &str = "people-01";

/// Document type of every person.
pub const PERSON: &str = "person";

/// Errors from running the demonstration.
#[derive(Debug, Error)]
pub enum DemoError {
    /// Requested more steps than the chain has, or none at all.
    #[error("steps must be between 1 and {max}, got {requested}")]
    InvalidSteps { requested: usize, max: usize },

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Documents visible after running a prefix of the chain.
#[derive(Debug, Clone)]
pub struct StageReport {
    /// Number of steps in the prefix.
    pub steps: usize,
    /// What the run did.
    pub outcome: RunOutcome,
    /// Index the documents were read from (the alias when one is set).
    pub read_from: String,
    /// Documents read back after the run.
    pub documents: Vec<Document>,
}

fn person_mapping(properties: Value) -> Value {
    let mut mappings = Map::new();
    mappings.insert(PERSON.to_string(), json!({ "properties": properties }));
    json!({ "mappings": mappings })
}

/// The full two-step chain.
pub fn people_chain() -> Vec<Migration> {
    vec![
        Migration::initial(PEOPLE_INDEX).with_settings(person_mapping(json!({
            "name": { "type": "string" }
        }))),
        Migration::new(PEOPLE_INDEX, SPLIT_NAMES_INDEX)
            .with_settings(person_mapping(json!({
                "given_name": { "type": "string" },
                "family_name": { "type": "string" }
            })))
            .with_transformer(PERSON, split_name),
    ]
}

/// The first `steps` steps of the chain behind `alias`.
pub fn people_set(alias: &str, steps: usize) -> Result<MigrationSet, DemoError> {
    let chain = people_chain();
    if steps == 0 || steps > chain.len() {
        return Err(DemoError::InvalidSteps {
            requested: steps,
            max: chain.len(),
        });
    }
    Ok(MigrationSet::new(chain.into_iter().take(steps).collect()).with_alias(alias))
}

/// Replace `name` with `given_name` and `family_name`.
///
/// The first word is the given name and the rest the family name. A
/// single-word name has no family name. Documents without a string `name`
/// pass through unchanged.
pub fn split_name(mut document: Document) -> Vec<Document> {
    let Some(name) = document.field_str("name").map(str::to_string) else {
        return vec![document];
    };

    document.fields.remove("name");
    let mut parts = name.trim().splitn(2, char::is_whitespace);
    if let Some(given) = parts.next().filter(|s| !s.is_empty()) {
        document.set_field("given_name", given);
    }
    if let Some(family) = parts.next().map(str::trim).filter(|s| !s.is_empty()) {
        document.set_field("family_name", family);
    }
    vec![document]
}

/// The people written into the first index.
pub fn people() -> Vec<Document> {
    vec![
        Document::new(PEOPLE_INDEX, PERSON)
            .with_id("bob")
            .with_field("name", "Bob Boberson"),
        Document::new(PEOPLE_INDEX, PERSON)
            .with_id("fred")
            .with_field("name", "Fred Frederson"),
    ]
}

/// Write [`people`] into the first index and make them searchable.
pub fn seed_people<B: Backend + ?Sized>(backend: &B) -> Result<(), BackendError> {
    for person in people() {
        backend.index(person)?;
    }
    backend.refresh_index(PEOPLE_INDEX)
}

/// Refresh `index` and read back every document in it.
pub fn read_all<B: Backend + ?Sized>(backend: &B, index: &str) -> Result<Vec<Document>, BackendError> {
    backend.refresh_index(index)?;
    let mut documents = Vec::new();
    backend.for_each(&match_all(), &[index], &[], &mut |document: Document| {
        documents.push(document);
        Ok(())
    })?;
    Ok(documents)
}

/// Run the chain one step longer each time, up to `steps`.
///
/// People are written after the first step, so the second step has
/// something to copy.
pub fn run_demo<B: Backend + ?Sized>(
    backend: &B,
    alias: &str,
    steps: usize,
    config: &MigrationConfig,
) -> Result<Vec<StageReport>, DemoError> {
    // Fail before touching the backend.
    people_set(alias, steps)?;

    let mut reports = Vec::with_capacity(steps);
    for prefix in 1..=steps {
        let set = people_set(alias, prefix)?;
        let outcome = set.run_with_config(backend, config.clone())?;
        info!(steps = prefix, state = %outcome.plan.state, "migration set run");

        if prefix == 1 {
            seed_people(backend)?;
        }

        let read_from = match (&set.index_alias, set.migrations.last()) {
            (Some(alias), _) => alias.clone(),
            (None, Some(last)) => last.to_index.clone(),
            (None, None) => continue,
        };
        let documents = read_all(backend, &read_from)?;
        reports.push(StageReport {
            steps: prefix,
            outcome,
            read_from,
            documents,
        });
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use esmigrate_core::{ChainState, MemoryBackend};
    use pretty_assertions::assert_eq;

    fn names(document: &Document) -> (Option<&str>, Option<&str>, Option<&str>) {
        (
            document.field_str("name"),
            document.field_str("given_name"),
            document.field_str("family_name"),
        )
    }

    #[test]
    fn test_split_name() {
        let split = split_name(Document::new("p", PERSON).with_field("name", "Bob Boberson"));
        assert_eq!(split.len(), 1);
        assert_eq!(names(&split[0]), (None, Some("Bob"), Some("Boberson")));

        let split = split_name(Document::new("p", PERSON).with_field("name", "Ana de la Cruz"));
        assert_eq!(names(&split[0]), (None, Some("Ana"), Some("de la Cruz")));

        let split = split_name(Document::new("p", PERSON).with_field("name", "Cher"));
        assert_eq!(names(&split[0]), (None, Some("Cher"), None));
    }

    #[test]
    fn test_split_name_without_name_is_unchanged() {
        let doc = Document::new("p", PERSON).with_field("age", 40);
        assert_eq!(split_name(doc.clone()), vec![doc]);
    }

    #[test]
    fn test_people_set_bounds() {
        assert!(matches!(
            people_set("people", 0),
            Err(DemoError::InvalidSteps { requested: 0, max: 2 })
        ));
        assert!(matches!(
            people_set("people", 3),
            Err(DemoError::InvalidSteps { requested: 3, max: 2 })
        ));

        let set = people_set("people", 2).unwrap();
        assert_eq!(set.index_alias.as_deref(), Some("people"));
        assert!(set.validate().is_ok());
    }

    #[test]
    fn test_run_demo() {
        let backend = MemoryBackend::new();
        let reports = run_demo(&backend, "people", 2, &MigrationConfig::default()).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].outcome.plan.state, ChainState::NotStarted);
        assert_eq!(reports[0].read_from, "people");
        assert_eq!(
            reports[0].documents.iter().map(names).collect::<Vec<_>>(),
            vec![
                (Some("Bob Boberson"), None, None),
                (Some("Fred Frederson"), None, None),
            ]
        );

        assert_eq!(
            reports[1].outcome.plan.state,
            ChainState::PartiallyComplete { step: 1 }
        );
        assert_eq!(
            reports[1].documents.iter().map(names).collect::<Vec<_>>(),
            vec![
                (None, Some("Bob"), Some("Boberson")),
                (None, Some("Fred"), Some("Frederson")),
            ]
        );
        assert!(reports[1].documents.iter().all(|d| d.index == SPLIT_NAMES_INDEX));
        assert_eq!(backend.alias_targets("people"), vec![SPLIT_NAMES_INDEX]);
    }

    #[test]
    fn test_run_demo_without_alias_reads_last_index() {
        let backend = MemoryBackend::new();
        let reports = run_demo(&backend, "", 2, &MigrationConfig::default()).unwrap();

        assert_eq!(reports[0].read_from, PEOPLE_INDEX);
        assert_eq!(reports[1].read_from, SPLIT_NAMES_INDEX);
        assert_eq!(reports[1].documents.len(), 2);
        assert!(backend.alias_targets("people").is_empty());
    }

    #[test]
    fn test_run_demo_rejects_steps_before_any_call() {
        let backend = MemoryBackend::new();
        let err = run_demo(&backend, "people", 5, &MigrationConfig::default()).unwrap_err();
        assert!(matches!(err, DemoError::InvalidSteps { .. }));
        assert!(backend.calls().is_empty());
    }
}
