use tracing::warn;

use crate::error::{Result, XmlRegError};
use crate::options::RunOptions;

/// Outcome of a completed operation.
#[derive(Debug, Default)]
pub struct OperationReport {
    /// Values and keys exported, written or deleted.
    pub applied: usize,
    /// Per-item failures that were logged and skipped.
    pub skipped: Vec<XmlRegError>,
    /// Keys left in place because the fragment did not describe all of their content.
    pub kept_keys: Vec<String>,
}

impl OperationReport {
    pub fn applied_count(&self) -> usize {
        self.applied
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    pub(crate) fn record(&mut self) {
        self.applied += 1;
    }

    /// Applies the skip-errors policy to one item's outcome: with skipping on, a failure
    /// is logged, kept in the report and the traversal goes on.
    pub(crate) fn settle(&mut self, options: RunOptions, result: Result<()>) -> Result<()> {
        match result {
            Err(err) if options.skip_errors => {
                warn!("skipping: {}", err);
                self.skipped.push(err);
                Ok(())
            }
            other => other,
        }
    }
}
