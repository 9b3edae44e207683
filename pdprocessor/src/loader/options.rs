//! Load-time options shared by every [`super::TableLoader`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{LoadError, LoadResult};

/// Encoding used when none is given.
pub const DEFAULT_ENCODING: &str = "latin-1";

/// Cell texts treated as missing in addition to `na_values`.
pub const DEFAULT_NA_VALUES: &[&str] = &[
    "", "#N/A", "#NA", "N/A", "n/a", "NA", "<NA>", "NULL", "null", "NaN", "nan", "None",
];

/// Which sheet of a workbook to read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

impl SheetSelector {
    /// Digits select by index, anything else by name.
    pub fn parse(s: &str) -> Self {
        match s.parse::<usize>() {
            Ok(i) => SheetSelector::Index(i),
            Err(_) => SheetSelector::Name(s.to_string()),
        }
    }
}

/// Which columns of the file to keep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSelector {
    #[default]
    All,
    /// Zero-based positions.
    Indices(Vec<usize>),
    /// Spreadsheet letters, e.g. `"A:C,E"`. Ranges are inclusive.
    Letters(String),
}

impl ColumnSelector {
    /// Resolve to zero-based positions for a table `width` columns wide.
    pub fn resolve(&self, width: usize) -> LoadResult<Vec<usize>> {
        match self {
            ColumnSelector::All => Ok((0..width).collect()),
            ColumnSelector::Indices(indices) => {
                if let Some(bad) = indices.iter().find(|&&i| i >= width) {
                    return Err(LoadError::InvalidSelector(format!(
                        "column index {} out of range ({} columns)",
                        bad, width
                    )));
                }
                Ok(indices.clone())
            }
            ColumnSelector::Letters(spec) => {
                let indices = parse_column_letters(spec)?;
                if let Some(bad) = indices.iter().find(|&&i| i >= width) {
                    return Err(LoadError::InvalidSelector(format!(
                        "column {} out of range ({} columns)",
                        index_to_letters(*bad),
                        width
                    )));
                }
                Ok(indices)
            }
        }
    }
}

/// Forced type for a column, bypassing inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Text,
    Int,
    Float,
    Bool,
    Date,
}

impl std::fmt::Display for CellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CellType::Text => "text",
            CellType::Int => "int",
            CellType::Float => "float",
            CellType::Bool => "bool",
            CellType::Date => "date",
        };
        f.write_str(name)
    }
}

/// Which loader handles the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Pick from the file extension.
    #[default]
    Auto,
    Delimited,
    Spreadsheet,
}

impl Engine {
    /// Resolve `Auto` against the extension of `path`.
    pub fn resolve(self, path: &Path) -> LoadResult<Engine> {
        if self != Engine::Auto {
            return Ok(self);
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "tsv" | "txt" | "dat" => Ok(Engine::Delimited),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "xla" | "ods" => Ok(Engine::Spreadsheet),
            _ => Err(LoadError::UnknownFormat(path.display().to_string())),
        }
    }
}

/// Options recognised by the loaders.
///
/// Spreadsheet-only and delimited-only fields are ignored by the other loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Sheet to read from a workbook.
    pub sheet: SheetSelector,
    /// Row holding the column names, counted after `skip_rows`. `None` = no header.
    pub header: Option<usize>,
    /// Rows dropped from the top of the file.
    pub skip_rows: usize,
    /// Rows dropped from the bottom of the file.
    pub skip_footer: usize,
    pub use_cols: ColumnSelector,
    /// Replaces the header names.
    pub names: Vec<String>,
    /// Columns whose text is parsed into dates.
    pub parse_dates: Vec<String>,
    /// Pattern tried first when parsing `parse_dates` columns.
    pub date_format: Option<String>,
    pub na_values: Vec<String>,
    pub thousands: Option<char>,
    pub dtype: HashMap<String, CellType>,
    pub true_values: Vec<String>,
    pub false_values: Vec<String>,
    /// Field separator. `None` sniffs it from the first line.
    pub delimiter: Option<char>,
    /// Encoding label understood by `encoding_rs`, or `"auto"`.
    pub encoding: String,
    pub engine: Engine,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            sheet: SheetSelector::default(),
            header: Some(0),
            skip_rows: 0,
            skip_footer: 0,
            use_cols: ColumnSelector::All,
            names: Vec::new(),
            parse_dates: Vec::new(),
            date_format: None,
            na_values: Vec::new(),
            thousands: None,
            dtype: HashMap::new(),
            true_values: Vec::new(),
            false_values: Vec::new(),
            delimiter: Some(','),
            encoding: DEFAULT_ENCODING.to_string(),
            engine: Engine::Auto,
        }
    }
}

impl LoadOptions {
    pub(crate) fn is_na(&self, text: &str) -> bool {
        DEFAULT_NA_VALUES.contains(&text) || self.na_values.iter().any(|na| na == text)
    }

    pub(crate) fn parse_bool(&self, text: &str) -> Option<bool> {
        if self.true_values.iter().any(|v| v == text) {
            return Some(true);
        }
        if self.false_values.iter().any(|v| v == text) {
            return Some(false);
        }
        match text {
            "True" | "TRUE" | "true" => Some(true),
            "False" | "FALSE" | "false" => Some(false),
            _ => None,
        }
    }

    pub(crate) fn strip_thousands<'a>(&self, text: &'a str) -> std::borrow::Cow<'a, str> {
        match self.thousands {
            Some(sep) if text.contains(sep) => text.replace(sep, "").into(),
            _ => text.into(),
        }
    }
}

/// Parse `"A:C,E"` into `[0, 1, 2, 4]`.
pub fn parse_column_letters(spec: &str) -> LoadResult<Vec<usize>> {
    let part_re = Regex::new(r"^([A-Za-z]+)(?::([A-Za-z]+))?$")
        .map_err(|e| LoadError::InvalidSelector(e.to_string()))?;

    let mut indices = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let caps = part_re
            .captures(part)
            .ok_or_else(|| LoadError::InvalidSelector(format!("'{}'", part)))?;
        let start = letters_to_index(&caps[1]);
        let end = caps.get(2).map(|m| letters_to_index(m.as_str())).unwrap_or(start);
        if end < start {
            return Err(LoadError::InvalidSelector(format!("reversed range '{}'", part)));
        }
        indices.extend(start..=end);
    }

    if indices.is_empty() {
        return Err(LoadError::InvalidSelector(format!("'{}' selects no columns", spec)));
    }
    Ok(indices)
}

fn letters_to_index(letters: &str) -> usize {
    letters
        .to_ascii_uppercase()
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize)
        - 1
}

fn index_to_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}
