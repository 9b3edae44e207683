//! Table loaders for delimited and spreadsheet files.
//!
//! Each loader reads a raw grid of cells and hands it to [`shape`], which
//! applies the options common to every format (header row, skipped rows,
//! column selection, names, missing values, type inference).

pub mod delimited;
pub mod options;
pub mod spreadsheet;

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt::Debug;
use std::path::Path;

use crate::error::{LoadError, LoadResult};
use crate::models::{CellValue, Table};

pub use delimited::{decode_content, detect_delimiter, detect_encoding, DelimitedLoader};
pub use options::{CellType, ColumnSelector, Engine, LoadOptions, SheetSelector};
pub use spreadsheet::SpreadsheetLoader;

/// Turns a file into a [`Table`].
pub trait TableLoader: Debug {
    fn load(&self, path: &Path, options: &LoadOptions) -> LoadResult<Table>;
}

/// Loader for `engine`, resolving [`Engine::Auto`] from the extension of `path`.
pub fn loader_for(engine: Engine, path: &Path) -> LoadResult<Box<dyn TableLoader>> {
    match engine.resolve(path)? {
        Engine::Spreadsheet => Ok(Box::new(SpreadsheetLoader)),
        Engine::Delimited | Engine::Auto => Ok(Box::new(DelimitedLoader)),
    }
}

/// Selects the loader from `options.engine` at load time.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoLoader;

impl TableLoader for AutoLoader {
    fn load(&self, path: &Path, options: &LoadOptions) -> LoadResult<Table> {
        loader_for(options.engine, path)?.load(path, options)
    }
}

/// Patterns tried, in order, on `parse_dates` columns.
const DATE_HINTS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y", "%Y/%m/%d", "%d-%b-%Y"];
const DATETIME_HINTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

// =============================================================================
// Grid shaping
// =============================================================================

/// Build a [`Table`] from a raw grid of cells.
///
/// `grid` rows may have different lengths; the widest row (or the header)
/// sets the table width.
pub(crate) fn shape(grid: Vec<Vec<CellValue>>, options: &LoadOptions) -> LoadResult<Table> {
    let mut grid: Vec<Vec<CellValue>> = grid.into_iter().skip(options.skip_rows).collect();

    let (header, first_data) = match options.header {
        Some(h) => {
            if h >= grid.len() {
                return Err(LoadError::HeaderOutOfRange {
                    header: h,
                    rows: grid.len(),
                });
            }
            (Some(grid[h].clone()), h + 1)
        }
        None => (None, 0),
    };

    // 1-based file line of each data row, header and skipped rows included
    let first_line = first_data + options.skip_rows + 1;
    let mut data: Vec<(usize, Vec<CellValue>)> = grid
        .drain(first_data..)
        .enumerate()
        .map(|(offset, row)| (first_line + offset, row))
        .collect();
    let keep = data.len().saturating_sub(options.skip_footer);
    data.truncate(keep);
    data.retain(|(_, row)| row.iter().any(|c| !is_blank(c)));
    let (lines, data): (Vec<usize>, Vec<Vec<CellValue>>) = data.into_iter().unzip();

    let width = data
        .iter()
        .map(Vec::len)
        .chain(header.as_ref().map(Vec::len))
        .max()
        .unwrap_or(0);
    let selected = options.use_cols.resolve(width)?;

    let columns = column_names(header.as_deref(), &selected, options)?;

    let mut cells_by_column: Vec<Vec<CellValue>> = selected
        .iter()
        .map(|&i| {
            data.iter()
                .map(|row| row.get(i).cloned().unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    for (name, cells) in columns.iter().zip(cells_by_column.iter_mut()) {
        type_column(name, cells, options, &lines)?;
    }

    let rows = (0..data.len())
        .map(|r| cells_by_column.iter().map(|col| col[r].clone()).collect())
        .collect();

    Ok(Table::new(columns, rows))
}

fn is_blank(cell: &CellValue) -> bool {
    match cell {
        CellValue::Null => true,
        CellValue::Text(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn column_names(
    header: Option<&[CellValue]>,
    selected: &[usize],
    options: &LoadOptions,
) -> LoadResult<Vec<String>> {
    if !options.names.is_empty() {
        if options.names.len() != selected.len() {
            return Err(LoadError::NamesMismatch {
                expected: selected.len(),
                got: options.names.len(),
            });
        }
        return Ok(options.names.clone());
    }

    Ok(selected
        .iter()
        .map(|&i| match header.and_then(|h| h.get(i)) {
            Some(cell) if !is_blank(cell) => cell.to_string(),
            Some(_) => format!("Unnamed: {}", i),
            None if header.is_some() => format!("Unnamed: {}", i),
            None => i.to_string(),
        })
        .collect())
}

/// Apply missing values, `dtype`, `parse_dates` and inference to one column.
fn type_column(
    name: &str,
    cells: &mut [CellValue],
    options: &LoadOptions,
    lines: &[usize],
) -> LoadResult<()> {
    for cell in cells.iter_mut() {
        if let CellValue::Text(s) = cell {
            if options.is_na(s) || options.is_na(s.trim()) {
                *cell = CellValue::Null;
            }
        }
    }

    if let Some(&target) = options.dtype.get(name) {
        for (cell, &line) in cells.iter_mut().zip(lines) {
            let converted = coerce(cell, target, options).ok_or_else(|| LoadError::Conversion {
                line,
                column: name.to_string(),
                value: cell.to_string(),
                target: target.to_string(),
            })?;
            *cell = converted;
        }
        return Ok(());
    }

    if options.parse_dates.iter().any(|c| c == name) {
        for cell in cells.iter_mut() {
            if let CellValue::Text(s) = cell {
                if let Some(parsed) = parse_date_hint(s.trim(), options.date_format.as_deref()) {
                    *cell = parsed;
                }
            }
        }
        return Ok(());
    }

    infer_column(cells, options);
    Ok(())
}

/// Narrowest common type for the non-null cells: int, then float, then bool.
/// Columns that fit none keep their cells as they are.
fn infer_column(cells: &mut [CellValue], options: &LoadOptions) {
    let present = || cells.iter().filter(|c| !c.is_null());
    if present().next().is_none() {
        return;
    }

    let target = if present().all(|c| coerce(c, CellType::Int, options).is_some()) {
        Some(CellType::Int)
    } else if present().all(|c| coerce(c, CellType::Float, options).is_some()) {
        Some(CellType::Float)
    } else if present().all(|c| matches!(c, CellValue::Bool(_) | CellValue::Text(_)))
        && present().all(|c| coerce(c, CellType::Bool, options).is_some())
    {
        Some(CellType::Bool)
    } else {
        None
    };

    if let Some(target) = target {
        for cell in cells.iter_mut().filter(|c| !c.is_null()) {
            if let Some(converted) = coerce(cell, target, options) {
                *cell = converted;
            }
        }
    }
}

/// Convert one cell to `target`. Nulls stay null.
fn coerce(cell: &CellValue, target: CellType, options: &LoadOptions) -> Option<CellValue> {
    if cell.is_null() {
        return Some(CellValue::Null);
    }
    match (target, cell) {
        (CellType::Text, CellValue::Text(_)) => Some(cell.clone()),
        (CellType::Text, other) => Some(CellValue::Text(other.to_string())),

        (CellType::Int, CellValue::Int(_)) => Some(cell.clone()),
        (CellType::Int, CellValue::Float(f))
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
        {
            Some(CellValue::Int(*f as i64))
        }
        (CellType::Int, CellValue::Text(s)) => options
            .strip_thousands(s.trim())
            .parse::<i64>()
            .ok()
            .map(CellValue::Int),

        (CellType::Float, CellValue::Float(_)) => Some(cell.clone()),
        (CellType::Float, CellValue::Int(i)) => Some(CellValue::Float(*i as f64)),
        (CellType::Float, CellValue::Text(s)) => options
            .strip_thousands(s.trim())
            .parse::<f64>()
            .ok()
            .map(CellValue::Float),

        (CellType::Bool, CellValue::Bool(_)) => Some(cell.clone()),
        (CellType::Bool, CellValue::Text(s)) => options.parse_bool(s.trim()).map(CellValue::Bool),
        (CellType::Bool, CellValue::Int(i)) if *i == 0 || *i == 1 => Some(CellValue::Bool(*i == 1)),

        (CellType::Date, CellValue::Date(_)) => Some(cell.clone()),
        (CellType::Date, CellValue::DateTime(dt)) => Some(CellValue::Date(dt.date())),
        (CellType::Date, CellValue::Text(s)) => {
            match parse_date_hint(s.trim(), options.date_format.as_deref())? {
                CellValue::DateTime(dt) => Some(CellValue::Date(dt.date())),
                other => Some(other),
            }
        }

        _ => None,
    }
}

/// Parse text as a date or date-time, trying `preferred` first.
pub(crate) fn parse_date_hint(text: &str, preferred: Option<&str>) -> Option<CellValue> {
    if let Some(fmt) = preferred {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(CellValue::DateTime(dt));
        }
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            return Some(CellValue::Date(d));
        }
    }
    DATETIME_HINTS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(CellValue::DateTime)
        .or_else(|| {
            DATE_HINTS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .map(CellValue::Date)
        })
}
