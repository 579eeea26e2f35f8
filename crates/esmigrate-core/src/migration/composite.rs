//! Folding a run of chained migrations into one.
//!
//! Running steps `i..=k` one after another is equivalent to creating step
//! `k`'s index with step `k`'s settings and copying step `i`'s source into it
//! through every intermediate transform. The composite skips the
//! intermediate indices entirely.

use super::error::MigrationError;
use super::step::Migration;

impl Migration {
    /// Build the single migration equivalent to running `steps` in order.
    ///
    /// The result reads from the first step's source, writes to the last
    /// step's destination with the last step's settings, and applies every
    /// step's transforms in sequence.
    pub fn composite(steps: &[Migration]) -> Result<Migration, MigrationError> {
        let (Some(first), Some(last)) = (steps.first(), steps.last()) else {
            return Err(MigrationError::EmptyChain);
        };

        Ok(Migration {
            from_index: first.from_index.clone(),
            to_index: last.to_index.clone(),
            settings: last.settings.clone(),
            stages: steps
                .iter()
                .flat_map(|step| step.stages.iter().cloned())
                .collect(),
        })
    }
}
