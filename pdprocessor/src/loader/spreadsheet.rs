//! Spreadsheet loader (xlsx, xlsm, xlsb, xls, ods) backed by calamine.

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use std::path::Path;

use super::{shape, LoadOptions, SheetSelector, TableLoader};
use crate::error::{LoadError, LoadResult};
use crate::models::{CellValue, Table};

/// Loads one sheet of a workbook.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpreadsheetLoader;

impl TableLoader for SpreadsheetLoader {
    fn load(&self, path: &Path, options: &LoadOptions) -> LoadResult<Table> {
        let mut workbook = open_workbook_auto(path)?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = match &options.sheet {
            SheetSelector::Index(i) => sheet_names
                .get(*i)
                .cloned()
                .ok_or_else(|| LoadError::SheetNotFound(format!("at index {}", i)))?,
            SheetSelector::Name(name) => sheet_names
                .iter()
                .find(|s| *s == name)
                .cloned()
                .ok_or_else(|| LoadError::SheetNotFound(format!("'{}'", name)))?,
        };
        log::debug!("reading sheet '{}' of {}", sheet_name, path.display());

        let range = workbook.worksheet_range(&sheet_name)?;

        // Ranges start at the first used cell; pad back to A1 so row
        // indices and column letters match what the user sees.
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut grid: Vec<Vec<CellValue>> = vec![Vec::new(); row_offset];
        for row in range.rows() {
            let mut cells = vec![CellValue::Null; col_offset];
            cells.extend(row.iter().map(cell_to_value));
            grid.push(cells);
        }

        shape(grid, options)
    }
}

/// Convert a workbook cell to a [`CellValue`].
fn cell_to_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => CellValue::Float(dt.as_f64()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Float(dt.as_f64())),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .map(CellValue::DateTime)
            .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d").map(CellValue::Date))
            .unwrap_or_else(|_| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Null,
    }
}
