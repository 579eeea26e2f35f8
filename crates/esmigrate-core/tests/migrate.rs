//! Integration tests for the single-migration executor.

use esmigrate_core::backend::{BackendCall, BackendOp, MemoryBackend, Visitor};
use esmigrate_core::{
    drop_all, migrate, Backend, BackendError, BulkCommand, Document, Migration, MigrationError,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn fram_backend(docs: Vec<Document>) -> MemoryBackend {
    let backend = MemoryBackend::new();
    backend.seed_index("fram", Value::Null, docs);
    backend
}

fn foo_docs() -> Vec<Document> {
    vec![
        Document::new("fram", "foo").with_id("bar").with_field("howdy", "there"),
        Document::new("fram", "foo").with_id("abc").with_field("def", "ghi"),
    ]
}

fn assert_nothing_written(backend: &MemoryBackend) {
    assert_eq!(backend.call_count(BackendOp::CreateIndex), 0);
    assert_eq!(backend.call_count(BackendOp::Index), 0);
    assert_eq!(backend.call_count(BackendOp::ForEach), 0);
}

#[test]
fn test_missing_source_fails_without_creating() {
    let backend = MemoryBackend::new();
    let err = migrate(&backend, &Migration::new("fram", "tu")).unwrap_err();

    assert_eq!(
        err,
        MigrationError::SourceMissing {
            index: "fram".to_string()
        }
    );
    assert!(err.is_precondition());
    assert_nothing_written(&backend);
}

#[test]
fn test_existing_destination_fails_without_creating() {
    let backend = fram_backend(foo_docs());
    backend.seed_index("tu", Value::Null, []);

    let err = migrate(&backend, &Migration::new("fram", "tu")).unwrap_err();

    assert_eq!(
        err,
        MigrationError::DestinationExists {
            index: "tu".to_string()
        }
    );
    assert_nothing_written(&backend);
}

#[test]
fn test_existence_check_errors_fail_without_creating() {
    let backend = fram_backend(foo_docs());
    backend.fail_call(BackendOp::IndicesExist, 0, "Failed for some reason");
    backend.fail_call(BackendOp::IndicesExist, 2, "Failed for some other reason");

    // First attempt fails on the source check.
    let err = migrate(&backend, &Migration::new("fram", "tu")).unwrap_err();
    assert_eq!(err.to_string(), "request failed: Failed for some reason");
    assert_nothing_written(&backend);

    // Second attempt passes the source check and fails on the destination check.
    let err = migrate(&backend, &Migration::new("fram", "tu")).unwrap_err();
    assert_eq!(err.to_string(), "request failed: Failed for some other reason");
    assert_nothing_written(&backend);
}

#[test]
fn test_create_error_is_returned_and_nothing_copied() {
    let backend = fram_backend(foo_docs());
    backend.fail_call(BackendOp::CreateIndex, 0, "Failed to create somehow");

    let err = migrate(&backend, &Migration::new("fram", "tu")).unwrap_err();

    assert_eq!(
        err,
        MigrationError::Backend(BackendError::request("Failed to create somehow"))
    );
    assert_eq!(backend.call_count(BackendOp::ForEach), 0);
    assert_eq!(backend.call_count(BackendOp::Index), 0);
}

#[test]
fn test_invalid_settings_abort_before_copy() {
    let backend = fram_backend(foo_docs());
    let migration = Migration::new("fram", "tu").with_settings(json!("not settings"));

    let err = migrate(&backend, &migration).unwrap_err();

    assert!(matches!(
        err,
        MigrationError::Backend(BackendError::InvalidSettings { .. })
    ));
    assert_eq!(backend.call_count(BackendOp::ForEach), 0);
}

#[test]
fn test_fresh_creation_copies_nothing() {
    let backend = MemoryBackend::new();
    let settings = json!({"mappings": {"person": {"properties": {"name": {"type": "string"}}}}});

    let result = migrate(&backend, &Migration::initial("people-00").with_settings(settings.clone()))
        .unwrap();

    assert!(result.created_only());
    assert_eq!(
        backend.calls_of(BackendOp::CreateIndex),
        vec![BackendCall::CreateIndex {
            name: "people-00".to_string(),
            settings: settings.clone(),
        }]
    );
    assert_eq!(backend.call_count(BackendOp::ForEach), 0);
    assert_eq!(backend.call_count(BackendOp::Index), 0);
    assert_eq!(backend.settings("people-00"), Some(settings));
    // Only the destination was checked.
    assert_eq!(backend.checked_indices(), vec!["people-00"]);
}

#[test]
fn test_copy_without_transformers_is_identity() {
    let backend = fram_backend(foo_docs());

    let result = migrate(&backend, &Migration::new("fram", "tu")).unwrap();

    assert_eq!(result.documents_read, 2);
    assert_eq!(result.documents_written, 2);
    assert_eq!(
        backend.indexed_documents(),
        vec![
            Document::new("tu", "foo")
                .with_id("bar")
                .with_field("howdy", "there")
                .with_bulk_command(BulkCommand::Index),
            Document::new("tu", "foo")
                .with_id("abc")
                .with_field("def", "ghi")
                .with_bulk_command(BulkCommand::Index),
        ]
    );
}

#[test]
fn test_copy_applies_type_transformers() {
    let backend = fram_backend(vec![
        Document::new("fram", "foo").with_id("bar").with_field("howdy", "there"),
        Document::new("fram", "bar").with_id("abc").with_field("def", "ghi"),
    ]);
    let migration = Migration::new("fram", "tu")
        .with_transformer("foo", |mut doc: Document| {
            doc.set_field("extra", "stuff");
            vec![doc]
        })
        .with_transformer("bar", drop_all);

    migrate(&backend, &migration).unwrap();

    assert_eq!(
        backend.indexed_documents(),
        vec![Document::new("tu", "foo")
            .with_id("bar")
            .with_field("howdy", "there")
            .with_field("extra", "stuff")
            .with_bulk_command(BulkCommand::Index)]
    );
}

#[test]
fn test_first_write_failure_aborts_copy() {
    let backend = fram_backend(vec![
        Document::new("fram", "foo").with_id("1"),
        Document::new("fram", "foo").with_id("2"),
        Document::new("fram", "foo").with_id("3"),
    ]);
    backend.fail_call(BackendOp::Index, 1, "bulk rejected");

    let err = migrate(&backend, &Migration::new("fram", "tu")).unwrap_err();

    assert_eq!(err, MigrationError::Backend(BackendError::request("bulk rejected")));
    // The third document was never attempted.
    assert_eq!(backend.call_count(BackendOp::Index), 2);
    // The destination keeps what was written before the failure.
    let written = backend.documents("tu").unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].id.as_deref(), Some("1"));
    assert_eq!(backend.open_scrolls(), 0);
}

#[test]
fn test_retry_after_partial_copy_requires_removing_destination() {
    let backend = fram_backend(foo_docs());
    backend.fail_call(BackendOp::Index, 0, "bulk rejected");
    let migration = Migration::new("fram", "tu");

    assert!(migrate(&backend, &migration).is_err());

    let err = migrate(&backend, &migration).unwrap_err();
    assert!(matches!(err, MigrationError::DestinationExists { .. }));

    backend.delete_index("tu");
    let result = migrate(&backend, &migration).unwrap();
    assert_eq!(result.documents_written, 2);
    assert_eq!(backend.documents("tu").unwrap().len(), 2);
}

#[test]
fn test_copy_spans_many_pages() {
    let docs: Vec<Document> = (0..250)
        .map(|i| Document::new("fram", "n").with_id(i.to_string()).with_field("i", i))
        .collect();
    let backend = fram_backend(docs);

    let result = migrate(&backend, &Migration::new("fram", "tu")).unwrap();

    assert_eq!(result.documents_read, 250);
    let written = backend.documents("tu").unwrap();
    assert_eq!(written.len(), 250);
    assert_eq!(written[249].field("i"), Some(&json!(249)));
}

/// Lets another writer create the destination between the existence check
/// and `create_index`, as a concurrent run would.
struct RacingBackend {
    inner: MemoryBackend,
}

impl Backend for RacingBackend {
    fn indices_exist(&self, names: &[&str]) -> Result<bool, BackendError> {
        self.inner.indices_exist(names)
    }

    fn create_index(&self, name: &str, settings: &Value) -> Result<(), BackendError> {
        self.inner.seed_index(name, Value::Null, []);
        self.inner.create_index(name, settings)
    }

    fn index(&self, document: Document) -> Result<(), BackendError> {
        self.inner.index(document)
    }

    fn for_each(
        &self,
        query: &Value,
        indices: &[&str],
        types: &[&str],
        visit: &mut Visitor<'_>,
    ) -> Result<(), BackendError> {
        self.inner.for_each(query, indices, types, visit)
    }

    fn add_alias(&self, alias: &str, indices: &[&str]) -> Result<(), BackendError> {
        self.inner.add_alias(alias, indices)
    }

    fn remove_alias(&self, alias: &str, indices: &[&str]) -> Result<(), BackendError> {
        self.inner.remove_alias(alias, indices)
    }

    fn get_alias(&self, alias: &str) -> Result<Vec<String>, BackendError> {
        self.inner.get_alias(alias)
    }

    fn refresh_index(&self, name: &str) -> Result<(), BackendError> {
        self.inner.refresh_index(name)
    }
}

#[test]
fn test_destination_created_concurrently_is_terminal() {
    let backend = RacingBackend {
        inner: fram_backend(foo_docs()),
    };

    let err = migrate(&backend, &Migration::new("fram", "tu")).unwrap_err();

    assert_eq!(
        err,
        MigrationError::Backend(BackendError::IndexExists("tu".to_string()))
    );
    assert!(!err.is_precondition());
    // Both checks passed before the create was attempted.
    assert_eq!(backend.inner.checked_indices(), vec!["fram", "tu"]);
    assert_eq!(backend.inner.call_count(BackendOp::CreateIndex), 1);
    assert_eq!(backend.inner.call_count(BackendOp::ForEach), 0);
    assert_eq!(backend.inner.call_count(BackendOp::Index), 0);
    // The other writer's index is left as it was.
    assert_eq!(backend.inner.documents("tu"), Some(Vec::new()));
}

