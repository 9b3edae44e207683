//! Cell formatters.
//!
//! A formatter is a pure function from one cell value to another. The
//! built-ins live in [`FormatterRegistry::with_builtins`]; callers add their
//! own with [`FormatterRegistry::register`].

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{FormatError, FormatResult};
use crate::models::CellValue;

/// Pattern used by the `date` formatter unless the processor overrides it.
pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y";

/// Name of the formatter used when a data map entry names none.
pub const IDENTITY: &str = "identity";

/// A callable formatter, ready to run on cells.
pub type FormatFn = Arc<dyn Fn(&CellValue) -> FormatResult<CellValue> + Send + Sync>;

/// A registered formatter.
#[derive(Clone)]
pub enum Formatter {
    Identity,
    Uppercase,
    Lowercase,
    Trim,
    /// Reads the processor's date pattern when bound.
    Date,
    Custom(FormatFn),
}

impl Formatter {
    /// Produce the callable, capturing the date pattern for [`Formatter::Date`].
    pub fn bind(&self, date_format: &str) -> FormatFn {
        match self {
            Formatter::Identity => Arc::new(|v: &CellValue| Ok(identity(v))),
            Formatter::Uppercase => Arc::new(uppercase),
            Formatter::Lowercase => Arc::new(lowercase),
            Formatter::Trim => Arc::new(trim),
            Formatter::Date => {
                let pattern = date_format.to_string();
                Arc::new(move |v: &CellValue| date(v, &pattern))
            }
            Formatter::Custom(f) => Arc::clone(f),
        }
    }
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formatter::Identity => f.write_str("Identity"),
            Formatter::Uppercase => f.write_str("Uppercase"),
            Formatter::Lowercase => f.write_str("Lowercase"),
            Formatter::Trim => f.write_str("Trim"),
            Formatter::Date => f.write_str("Date"),
            Formatter::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Formatters known to one processor, by name.
#[derive(Debug, Clone)]
pub struct FormatterRegistry {
    formatters: HashMap<String, Formatter>,
}

impl FormatterRegistry {
    /// Registry holding `identity`, `uppercase`, `lowercase`, `trim` and `date`.
    pub fn with_builtins() -> Self {
        let mut formatters = HashMap::new();
        formatters.insert(IDENTITY.to_string(), Formatter::Identity);
        formatters.insert("uppercase".to_string(), Formatter::Uppercase);
        formatters.insert("lowercase".to_string(), Formatter::Lowercase);
        formatters.insert("trim".to_string(), Formatter::Trim);
        formatters.insert("date".to_string(), Formatter::Date);
        Self { formatters }
    }

    /// Add or replace a formatter.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&CellValue) -> FormatResult<CellValue> + Send + Sync + 'static,
    {
        self.formatters.insert(name.into(), Formatter::Custom(Arc::new(f)));
    }

    pub fn get(&self, name: &str) -> Option<&Formatter> {
        self.formatters.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formatters.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.formatters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

// =============================================================================
// Built-ins
// =============================================================================

pub fn identity(value: &CellValue) -> CellValue {
    value.clone()
}

pub fn uppercase(value: &CellValue) -> FormatResult<CellValue> {
    text_only("uppercase", value).map(|s| CellValue::Text(s.to_uppercase()))
}

pub fn lowercase(value: &CellValue) -> FormatResult<CellValue> {
    text_only("lowercase", value).map(|s| CellValue::Text(s.to_lowercase()))
}

pub fn trim(value: &CellValue) -> FormatResult<CellValue> {
    text_only("trim", value).map(|s| CellValue::Text(s.trim().to_string()))
}

/// Normalise to a calendar date.
///
/// Dates pass through, date-times lose their time, text is parsed with `pattern`.
///
/// `%Y` in `pattern` means a 4-digit year: `"5/6/70"` does not match `%m/%d/%Y`.
pub fn date(value: &CellValue, pattern: &str) -> FormatResult<CellValue> {
    match value {
        CellValue::Date(_) => Ok(value.clone()),
        CellValue::DateTime(dt) => Ok(CellValue::Date(dt.date())),
        CellValue::Text(s) => NaiveDate::parse_from_str(s.trim(), pattern)
            .or_else(|_| NaiveDateTime::parse_from_str(s.trim(), pattern).map(|dt| dt.date()))
            .ok()
            .filter(|d| !pattern.contains("%Y") || (1000..=9999).contains(&d.year()))
            .map(CellValue::Date)
            .ok_or_else(|| FormatError::Parse {
                value: s.clone(),
                pattern: pattern.to_string(),
            }),
        other => Err(type_error("date", other)),
    }
}

fn text_only<'a>(formatter: &str, value: &'a CellValue) -> FormatResult<&'a str> {
    value.as_str().ok_or_else(|| type_error(formatter, value))
}

fn type_error(formatter: &str, value: &CellValue) -> FormatError {
    FormatError::Type {
        formatter: formatter.to_string(),
        found: value.type_name().to_string(),
        value: value.to_string(),
    }
}

/// Description of the built-in formatters, for `--help` style listings.
pub fn formatters_description() -> String {
    r#"Built-in formatters:

| Name      | Description                                                   |
|-----------|---------------------------------------------------------------|
| identity  | Return the value unchanged (used when no formatter is named)  |
| uppercase | Upper-case text; fails on non-text values                     |
| lowercase | Lower-case text; fails on non-text values                     |
| trim      | Strip leading/trailing whitespace; fails on non-text values   |
| date      | Reduce to a calendar date; text is parsed with the date format |
|           | (default "%m/%d/%Y", override with date_format)               |

Example data map entry: ["start_date", "Start", "date"]"#
        .to_string()
}
