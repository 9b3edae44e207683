//! Source schema validation.

use std::collections::BTreeSet;

use crate::error::{ProcessorError, ProcessorResult};

/// Check that every expected source column is present.
///
/// Extra columns are fine. On failure the first missing column, in sorted
/// order, is reported.
pub fn validate_schema(table_columns: &[String], expected: &BTreeSet<String>) -> ProcessorResult<()> {
    match expected
        .iter()
        .find(|col| !table_columns.iter().any(|c| c == *col))
    {
        Some(missing) => Err(ProcessorError::Schema(format!(
            "Expected column '{}' is not in the source file.",
            missing
        ))),
        None => Ok(()),
    }
}
