//! Subcommands and the state file they run against.

use std::fs;
use std::path::Path;

use clap::Subcommand;
use esmigrate_core::{
    copy_index, migrate_alias, move_alias, BackendError, IndexCopy, MemoryBackend,
    MemorySnapshot, MigrationConfig, MigrationError, TypeTransformers,
};
use serde_json::Value;
use thiserror::Error;

use crate::demo::{self, DemoError};
use crate::formatter::{format_documents, OutputFormat};

/// esmigrate subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the bundled people chain one step longer each time
    Demo {
        /// Alias moved to the newest index (empty disables alias management)
        #[arg(long, default_value = "people")]
        alias: String,

        /// Number of chain steps to run up to
        #[arg(long, default_value_t = 2)]
        steps: usize,
    },

    /// Create a new index and copy every document of another into it
    Copy {
        /// Index to read
        from_index: String,
        /// Index to create
        to_index: String,
        /// Settings for the new index, as JSON
        #[arg(long)]
        settings: Option<String>,
    },

    /// Point an alias at one index, removing it from all others
    Point {
        /// Alias to move
        alias: String,
        /// Index the alias should serve
        index: String,
    },

    /// Copy the index behind an alias into a new index and move the alias
    Migrate {
        /// Alias pointing at exactly one index
        alias: String,
        /// Index to create
        to_index: String,
        /// Settings for the new index, as JSON
        #[arg(long)]
        settings: Option<String>,
    },

    /// Print every document of an index or alias
    Show {
        /// Index or alias to read
        index: String,
    },
}

impl Default for Command {
    fn default() -> Self {
        Command::Demo {
            alias: "people".to_string(),
            steps: 2,
        }
    }
}

/// Errors from running a subcommand.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid --settings JSON: {0}")]
    InvalidSettings(#[source] serde_json::Error),

    #[error("failed to access state file {path}: {source}")]
    StateIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is not a valid snapshot: {source}")]
    StateFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Demo(#[from] DemoError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Load the backend from `path`, or start empty when there is no file yet.
pub fn load_state(path: Option<&Path>) -> Result<MemoryBackend, CommandError> {
    let Some(path) = path.filter(|p| p.exists()) else {
        return Ok(MemoryBackend::new());
    };

    let text = fs::read_to_string(path).map_err(|source| CommandError::StateIo {
        path: path.display().to_string(),
        source,
    })?;
    let snapshot: MemorySnapshot =
        serde_json::from_str(&text).map_err(|source| CommandError::StateFormat {
            path: path.display().to_string(),
            source,
        })?;
    tracing::debug!(
        path = %path.display(),
        indices = snapshot.indices.len(),
        aliases = snapshot.aliases.len(),
        "state loaded"
    );
    Ok(MemoryBackend::from_snapshot(snapshot))
}

/// Write the backend's indices and aliases to `path`.
pub fn save_state(path: &Path, backend: &MemoryBackend) -> Result<(), CommandError> {
    let io_error = |source| CommandError::StateIo {
        path: path.display().to_string(),
        source,
    };
    let text = serde_json::to_string_pretty(&backend.snapshot())
        .map_err(|e| io_error(std::io::Error::other(e)))?;
    fs::write(path, text).map_err(io_error)
}

fn parse_settings(settings: Option<&str>) -> Result<Value, CommandError> {
    match settings {
        Some(text) => serde_json::from_str(text).map_err(CommandError::InvalidSettings),
        None => Ok(Value::Null),
    }
}

/// Run one subcommand and render its output.
pub fn execute(
    backend: &MemoryBackend,
    command: Command,
    config: &MigrationConfig,
    format: OutputFormat,
) -> Result<String, CommandError> {
    match command {
        Command::Demo { alias, steps } => {
            let reports = demo::run_demo(backend, &alias, steps, config)?;
            let sections: Vec<String> = reports
                .iter()
                .map(|report| {
                    format!(
                        "After {} step(s) [{}], reading {}:\n{}",
                        report.steps,
                        report.outcome.plan.state,
                        report.read_from,
                        format_documents(format, &report.documents)
                    )
                })
                .collect();
            Ok(sections.join("\n\n"))
        }

        Command::Copy {
            from_index,
            to_index,
            settings,
        } => {
            let copy =
                IndexCopy::new(from_index, to_index).with_settings(parse_settings(settings.as_deref())?);
            let result = copy_index(backend, &copy, config.clone())?;
            Ok(format!(
                "Copied {} into {}: {} read, {} written",
                copy.from_index, copy.to_index, result.documents_read, result.documents_written
            ))
        }

        Command::Point { alias, index } => {
            let removed = move_alias(backend, &alias, &index)?;
            if removed.is_empty() {
                Ok(format!("Alias {} points at {}", alias, index))
            } else {
                Ok(format!(
                    "Alias {} points at {} (removed from {})",
                    alias,
                    index,
                    removed.join(", ")
                ))
            }
        }

        Command::Migrate {
            alias,
            to_index,
            settings,
        } => {
            let result = migrate_alias(
                backend,
                &alias,
                &to_index,
                parse_settings(settings.as_deref())?,
                TypeTransformers::new(),
                config.clone(),
            )?;
            Ok(format!(
                "Migrated alias {} from {} to {}: {} read, {} written",
                alias,
                result.from_index.as_deref().unwrap_or_default(),
                result.to_index,
                result.documents_read,
                result.documents_written
            ))
        }

        Command::Show { index } => {
            let documents = demo::read_all(backend, &index)?;
            Ok(format_documents(format, &documents))
        }
    }
}
