//! Data map definition and resolution.
//!
//! A data map is an ordered list of `(final, source, formatter)` entries.
//! [`resolve`] checks it once, up front, and binds every formatter name to a
//! callable so no lookup can fail once rows are being processed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::formatters::{FormatFn, IDENTITY};
use crate::error::{ProcessorError, ProcessorResult};

/// One output column: where it comes from and how it is formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawEntry")]
pub struct DataMapEntry {
    #[serde(rename = "final")]
    pub final_column: String,
    #[serde(rename = "source")]
    pub source_column: String,
    pub formatter: Option<String>,
}

/// Accepts `["final", "Source", "fmt"]` as well as the object form.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Tuple(String, String, Option<String>),
    Pair(String, String),
    Object {
        #[serde(rename = "final")]
        final_column: String,
        #[serde(rename = "source")]
        source_column: String,
        #[serde(default)]
        formatter: Option<String>,
    },
}

impl From<RawEntry> for DataMapEntry {
    fn from(raw: RawEntry) -> Self {
        match raw {
            RawEntry::Tuple(final_column, source_column, formatter) => {
                Self::new(final_column, source_column, formatter)
            }
            RawEntry::Pair(final_column, source_column) => {
                Self::new(final_column, source_column, None::<String>)
            }
            RawEntry::Object {
                final_column,
                source_column,
                formatter,
            } => Self::new(final_column, source_column, formatter),
        }
    }
}

impl DataMapEntry {
    pub fn new(
        final_column: impl Into<String>,
        source_column: impl Into<String>,
        formatter: Option<impl Into<String>>,
    ) -> Self {
        Self {
            final_column: final_column.into(),
            source_column: source_column.into(),
            formatter: formatter.map(Into::into),
        }
    }
}

impl<F, S, T> From<(F, S, Option<T>)> for DataMapEntry
where
    F: Into<String>,
    S: Into<String>,
    T: Into<String>,
{
    fn from((final_column, source_column, formatter): (F, S, Option<T>)) -> Self {
        Self::new(final_column, source_column, formatter)
    }
}

/// A data map entry with its formatter bound.
#[derive(Clone)]
pub struct ResolvedEntry {
    pub final_column: String,
    pub source_column: String,
    /// Name the formatter was resolved from (`identity` when none was given).
    pub formatter_name: String,
    pub formatter: FormatFn,
}

impl fmt::Debug for ResolvedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedEntry")
            .field("final_column", &self.final_column)
            .field("source_column", &self.source_column)
            .field("formatter", &self.formatter_name)
            .finish()
    }
}

/// The validated, callable form of a data map.
#[derive(Debug, Clone)]
pub struct ResolvedMapping {
    /// Distinct source columns the table must contain.
    pub source_columns: BTreeSet<String>,
    /// Output columns, in output order.
    pub final_columns: Vec<String>,
    pub resolved_entries: Vec<ResolvedEntry>,
}

/// Resolve `data_map` against `lookup`.
///
/// Fails on an absent or empty map, or on the first formatter name `lookup`
/// does not know. Every entry is checked before anything is returned.
pub fn resolve<L>(data_map: Option<&[DataMapEntry]>, lookup: L) -> ProcessorResult<ResolvedMapping>
where
    L: Fn(&str) -> Option<FormatFn>,
{
    let data_map = match data_map {
        Some(map) if !map.is_empty() => map,
        _ => return Err(ProcessorError::Configuration("data_map is None.".to_string())),
    };

    let resolved_entries = data_map
        .iter()
        .map(|entry| {
            let name = entry.formatter.as_deref().unwrap_or(IDENTITY);
            let formatter = lookup(name).ok_or_else(|| {
                ProcessorError::Configuration(format!("Formatter '{}' is not defined.", name))
            })?;
            Ok(ResolvedEntry {
                final_column: entry.final_column.clone(),
                source_column: entry.source_column.clone(),
                formatter_name: name.to_string(),
                formatter,
            })
        })
        .collect::<ProcessorResult<Vec<_>>>()?;

    Ok(ResolvedMapping {
        source_columns: data_map.iter().map(|e| e.source_column.clone()).collect(),
        final_columns: data_map.iter().map(|e| e.final_column.clone()).collect(),
        resolved_entries,
    })
}
