//! Output formatters for documents.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use esmigrate_core::Document;
use serde_json::Value;
use std::collections::BTreeSet;

/// Output format for documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table, one row per document
    Table,
    /// Pretty-printed JSON array
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Render documents in the given format.
pub fn format_documents(format: OutputFormat, documents: &[Document]) -> String {
    match format {
        OutputFormat::Table => format_as_table(documents),
        OutputFormat::Json => format_as_json(documents),
    }
}

/// One column per field name seen in any document, after `id` and `type`.
fn format_as_table(documents: &[Document]) -> String {
    if documents.is_empty() {
        return "No documents".to_string();
    }

    let fields: BTreeSet<&str> = documents
        .iter()
        .flat_map(|d| d.fields.keys().map(String::as_str))
        .collect();

    let mut table = Table::new();
    let mut headers = vec![Cell::new("id"), Cell::new("type")];
    headers.extend(fields.iter().map(|f| Cell::new(f)));
    table.set_header(headers);

    for document in documents {
        let mut row = vec![
            Cell::new(document.id.as_deref().unwrap_or("")),
            Cell::new(&document.doc_type),
        ];
        row.extend(
            fields
                .iter()
                .map(|f| Cell::new(document.field(f).map(value_to_cell).unwrap_or_default())),
        );
        table.add_row(row);
    }

    table.to_string()
}

fn format_as_json(documents: &[Document]) -> String {
    serde_json::to_string_pretty(documents).unwrap_or_else(|_| "[]".to_string())
}

fn value_to_cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
