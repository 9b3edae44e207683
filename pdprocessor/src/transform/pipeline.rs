//! The data-map-driven processing pipeline.
//!
//! A [`Processor`] runs, in order and exactly once per call to
//! [`Processor::process`]:
//!
//! ```text
//! validate path → resolve data map → load → validate schema
//!     → preprocess hook → format & project → postprocess hook
//! ```
//!
//! The first failing step ends the run.
//!
//! # Example
//!
//! ```rust,ignore
//! use pdprocessor::{DataMapEntry, Processor};
//!
//! let mut processor = Processor::new("catalog.csv");
//! processor.set_data_map(vec![
//!     DataMapEntry::new("title", "Title", Some("uppercase")),
//!     DataMapEntry::new("released", "Release Date", Some("date")),
//! ]);
//! let table = processor.process()?;
//! println!("{} rows", table.row_count());
//! ```

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use tokio::sync::broadcast;

use super::formatters::{FormatterRegistry, DEFAULT_DATE_FORMAT};
use super::mapping::{resolve, DataMapEntry, ResolvedEntry, ResolvedMapping};
use super::schema::validate_schema;
use crate::error::{FormatResult, ProcessorError, ProcessorResult};
use crate::loader::{AutoLoader, DelimitedLoader, LoadOptions, SpreadsheetLoader, TableLoader};
use crate::logs::{LogBroadcaster, LogEntry, Stage};
use crate::models::{CellValue, Table};

// =============================================================================
// Hooks
// =============================================================================

/// Extension points run around the format step.
///
/// Both are always called; the default implementations do nothing.
pub trait ProcessHooks: Debug {
    /// Runs after schema validation, on the table as loaded.
    fn preprocess(&mut self, _table: &mut Table) -> ProcessorResult<()> {
        Ok(())
    }

    /// Runs on the final, projected table.
    fn postprocess(&mut self, _table: &mut Table) -> ProcessorResult<()> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl ProcessHooks for NoopHooks {}

// =============================================================================
// Processor
// =============================================================================

/// Loads one file and reshapes it through a data map.
#[derive(Debug)]
pub struct Processor {
    path: PathBuf,
    data_map: Option<Vec<DataMapEntry>>,
    options: LoadOptions,
    date_format: String,
    formatters: FormatterRegistry,
    loader: Box<dyn TableLoader>,
    hooks: Box<dyn ProcessHooks>,
    logs: LogBroadcaster,
    mapping: Option<ResolvedMapping>,
    table: Option<Table>,
}

impl Processor {
    /// Processor whose loader is chosen from `LoadOptions::engine` (by
    /// extension unless set).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_loader(path, AutoLoader)
    }

    /// Processor for a delimited text file.
    pub fn delimited(path: impl Into<PathBuf>) -> Self {
        Self::with_loader(path, DelimitedLoader)
    }

    /// Processor for a workbook.
    pub fn spreadsheet(path: impl Into<PathBuf>) -> Self {
        Self::with_loader(path, SpreadsheetLoader)
    }

    /// Processor with a caller-supplied loader.
    pub fn with_loader(path: impl Into<PathBuf>, loader: impl TableLoader + 'static) -> Self {
        Self {
            path: path.into(),
            data_map: None,
            options: LoadOptions::default(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            formatters: FormatterRegistry::with_builtins(),
            loader: Box::new(loader),
            hooks: Box::new(NoopHooks),
            logs: LogBroadcaster::new(),
            mapping: None,
            table: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data_map(&self) -> Option<&[DataMapEntry]> {
        self.data_map.as_deref()
    }

    pub fn set_data_map(&mut self, data_map: Vec<DataMapEntry>) {
        self.data_map = Some(data_map);
    }

    pub fn load_options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn load_options_mut(&mut self) -> &mut LoadOptions {
        &mut self.options
    }

    pub fn set_load_options(&mut self, options: LoadOptions) {
        self.options = options;
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    /// Pattern the `date` formatter parses text with on the next run.
    pub fn set_date_format(&mut self, date_format: impl Into<String>) {
        self.date_format = date_format.into();
    }

    pub fn formatters(&self) -> &FormatterRegistry {
        &self.formatters
    }

    /// Make `name` usable in the data map.
    pub fn register_formatter<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&CellValue) -> FormatResult<CellValue> + Send + Sync + 'static,
    {
        self.formatters.register(name, f);
    }

    pub fn set_hooks(&mut self, hooks: impl ProcessHooks + 'static) {
        self.hooks = Box::new(hooks);
    }

    /// Follow the stages of subsequent runs.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.logs.subscribe()
    }

    /// Table of the last run. After a failure this is whatever the run got
    /// to, if it loaded anything.
    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    pub fn into_table(self) -> Option<Table> {
        self.table
    }

    /// Mapping resolved by the last run.
    pub fn mapping(&self) -> Option<&ResolvedMapping> {
        self.mapping.as_ref()
    }

    /// Run the pipeline and return the final table.
    pub fn process(&mut self) -> ProcessorResult<&Table> {
        self.mapping = None;
        self.table = None;

        match self.run() {
            Ok(()) => {
                self.logs.success(Stage::Done, "processing complete");
                // run() always leaves a table behind on success
                Ok(&*self.table.get_or_insert_with(Table::default))
            }
            Err(e) => {
                self.logs.error(Stage::Failed, e.to_string());
                Err(e)
            }
        }
    }

    fn run(&mut self) -> ProcessorResult<()> {
        self.validate_path()?;
        self.logs.info(Stage::PathValidated, format!("found {}", self.path.display()));

        let formatters = &self.formatters;
        let date_format = self.date_format.as_str();
        let mapping = self.mapping.insert(resolve(self.data_map.as_deref(), |name| {
            formatters.get(name).map(|f| f.bind(date_format))
        })?);
        self.logs.info(
            Stage::MappingResolved,
            format!(
                "{} source column(s) → {} final column(s)",
                mapping.source_columns.len(),
                mapping.final_columns.len()
            ),
        );

        let table = self.table.insert(self.loader.load(&self.path, &self.options)?);
        self.logs.info(
            Stage::Loaded,
            format!("{} rows × {} columns", table.row_count(), table.column_count()),
        );
        if table.row_count() == 0 {
            self.logs.warning(Stage::Loaded, format!("{} has no data rows", self.path.display()));
        }

        validate_schema(table.columns(), &mapping.source_columns)?;
        self.logs.info(Stage::SchemaValidated, "all source columns present");

        self.hooks.preprocess(table)?;
        self.logs.info(Stage::PreProcessed, format!("{} rows", table.row_count()));

        format_and_project(table, &mapping.resolved_entries, &mapping.final_columns)?;
        self.logs.info(
            Stage::FormattedAndProjected,
            format!("columns: {}", table.columns().join(", ")),
        );

        self.hooks.postprocess(table)?;
        self.logs.info(Stage::PostProcessed, format!("{} rows", table.row_count()));

        Ok(())
    }

    /// Fail unless the path points at an existing file.
    pub fn validate_path(&self) -> ProcessorResult<()> {
        if !self.path.is_file() {
            return Err(ProcessorError::Path(format!(
                "No file found at '{}'.",
                self.path.display()
            )));
        }
        Ok(())
    }
}

/// Apply each entry's formatter to its source column, write the result to
/// its final column, then keep exactly `final_columns`, in order.
///
/// Entries run in order, so a later entry sees columns written by an
/// earlier one. The first formatter error aborts the whole step.
pub fn format_and_project(
    table: &mut Table,
    entries: &[ResolvedEntry],
    final_columns: &[String],
) -> ProcessorResult<()> {
    for entry in entries {
        let values = table.column_values(&entry.source_column).ok_or_else(|| {
            ProcessorError::Schema(format!(
                "Expected column '{}' is not in the source file.",
                entry.source_column
            ))
        })?;

        let formatted = values
            .into_iter()
            .map(|v| (entry.formatter)(v))
            .collect::<FormatResult<Vec<_>>>()?;

        table.set_column(&entry.final_column, formatted);
    }

    table.select(final_columns).map_err(|missing| {
        ProcessorError::Configuration(format!("Final column '{}' was never written.", missing))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FormatError, LoadError, LoadResult};
    use chrono::NaiveDate;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;

    const SAMPLE_CSV: &str = "String,Float,Integer,Date\n\
                              string,1.47,1,5/6/1970\n\
                              string,0,2,11/18/2017\n";

    fn data_map() -> Vec<DataMapEntry> {
        vec![
            DataMapEntry::new("string", "String", Some("uppercase")),
            DataMapEntry::new("float", "Float", None::<&str>),
            DataMapEntry::new("integer", "Integer", None::<&str>),
            DataMapEntry::new("date", "Date", Some("date")),
        ]
    }

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn ymd(y: i32, m: u32, d: u32) -> CellValue {
        CellValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    /// Loader that hands back a fixed table.
    #[derive(Debug)]
    struct FixedLoader(Table);

    impl TableLoader for FixedLoader {
        fn load(&self, _path: &Path, _options: &LoadOptions) -> LoadResult<Table> {
            Ok(self.0.clone())
        }
    }

    #[derive(Debug)]
    struct FailingLoader;

    impl TableLoader for FailingLoader {
        fn load(&self, _path: &Path, _options: &LoadOptions) -> LoadResult<Table> {
            Err(LoadError::SheetNotFound("'Totals'".into()))
        }
    }

    #[derive(Debug, Default, Clone)]
    struct RecordingHooks {
        calls: Arc<Mutex<Vec<(&'static str, Vec<String>)>>>,
    }

    impl ProcessHooks for RecordingHooks {
        fn preprocess(&mut self, table: &mut Table) -> ProcessorResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(("pre", table.columns().to_vec()));
            Ok(())
        }

        fn postprocess(&mut self, table: &mut Table) -> ProcessorResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(("post", table.columns().to_vec()));
            Ok(())
        }
    }

    #[test]
    fn test_new() {
        let processor = Processor::new("some/file.csv");
        assert_eq!(processor.path(), Path::new("some/file.csv"));
        assert_eq!(processor.date_format(), DEFAULT_DATE_FORMAT);
        assert!(processor.data_map().is_none());
        assert!(processor.table().is_none());
    }

    #[test]
    fn test_validate_path_with_valid_file() {
        let file = csv_file(SAMPLE_CSV);
        assert!(Processor::new(file.path()).validate_path().is_ok());
    }

    #[test]
    fn test_validate_path_with_invalid_path() {
        let err = Processor::new("invalid_path").validate_path().unwrap_err();
        assert!(matches!(err, ProcessorError::Path(_)));
        assert_eq!(err.message(), "No file found at 'invalid_path'.");
    }

    #[test]
    fn test_validate_path_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Processor::new(dir.path()).validate_path().is_err());
    }

    #[test]
    fn test_process() {
        let file = csv_file(SAMPLE_CSV);
        let mut processor = Processor::new(file.path());
        processor.set_data_map(data_map());

        let table = processor.process().unwrap();

        assert_eq!(table.columns(), &["string", "float", "integer", "date"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.rows()[0],
            vec![
                CellValue::from("STRING"),
                CellValue::Float(1.47),
                CellValue::Int(1),
                ymd(1970, 5, 6),
            ]
        );
        assert_eq!(table.rows()[1][3], ymd(2017, 11, 18));
        assert!(processor.mapping().is_some());
    }

    #[test]
    fn test_process_without_data_map() {
        let file = csv_file(SAMPLE_CSV);
        let mut processor = Processor::new(file.path());

        let err = processor.process().unwrap_err();
        assert!(matches!(err, ProcessorError::Configuration(_)));
        assert_eq!(err.message(), "data_map is None.");

        processor.set_data_map(Vec::new());
        assert_eq!(processor.process().unwrap_err().message(), "data_map is None.");
    }

    #[test]
    fn test_process_with_invalid_path() {
        let mut processor = Processor::new("invalid_path");
        processor.set_data_map(data_map());

        let err = processor.process().unwrap_err();
        assert!(matches!(err, ProcessorError::Path(_)));
        assert_eq!(err.message(), "No file found at 'invalid_path'.");
    }

    #[test]
    fn test_process_with_missing_column() {
        let file = csv_file(SAMPLE_CSV);
        let mut processor = Processor::new(file.path());
        let mut map = data_map();
        map.push(DataMapEntry::new("byte", "Byte", None::<&str>));
        processor.set_data_map(map);

        let err = processor.process().unwrap_err();
        assert!(matches!(err, ProcessorError::Schema(_)));
        assert_eq!(err.message(), "Expected column 'Byte' is not in the source file.");
        // the loaded table stays available for inspection
        assert_eq!(processor.table().unwrap().columns()[0], "String");
    }

    #[test]
    fn test_process_with_undefined_formatter_does_not_load() {
        let file = csv_file(SAMPLE_CSV);
        let mut processor = Processor::with_loader(file.path(), FailingLoader);
        processor.set_data_map(vec![DataMapEntry::new("a", "String", Some("format_nope"))]);

        let err = processor.process().unwrap_err();
        assert_eq!(err.message(), "Formatter 'format_nope' is not defined.");
        assert!(processor.table().is_none());
    }

    #[test]
    fn test_process_with_bad_date() {
        let file = csv_file("String,Float,Integer,Date\nstring,1.47,1,13/40/1970\n");
        let mut processor = Processor::new(file.path());
        processor.set_data_map(data_map());

        let err = processor.process().unwrap_err();
        assert!(matches!(err, ProcessorError::Format(FormatError::Parse { .. })));
    }

    #[test]
    fn test_process_with_custom_date_format() {
        let file = csv_file("Date\n1970-05-06\n");
        let mut processor = Processor::new(file.path());
        processor.set_data_map(vec![DataMapEntry::new("date", "Date", Some("date"))]);

        assert!(processor.process().is_err());

        processor.set_date_format("%Y-%m-%d");
        let table = processor.process().unwrap();
        assert_eq!(table.rows()[0][0], ymd(1970, 5, 6));
    }

    #[test]
    fn test_loader_errors_pass_through() {
        let file = csv_file(SAMPLE_CSV);
        let mut processor = Processor::with_loader(file.path(), FailingLoader);
        processor.set_data_map(data_map());

        let err = processor.process().unwrap_err();
        assert!(matches!(err, ProcessorError::Load(LoadError::SheetNotFound(_))));
        assert_eq!(err.to_string(), "Sheet 'Totals' not found");
    }

    #[test]
    fn test_custom_formatter_and_fixed_loader() {
        let file = csv_file("");
        let table = Table::new(
            vec!["n".into(), "ignored".into()],
            vec![vec![CellValue::Int(2), CellValue::Null]],
        );
        let mut processor = Processor::with_loader(file.path(), FixedLoader(table));
        processor.register_formatter("double", |v| match v {
            CellValue::Int(i) => Ok(CellValue::Int(i * 2)),
            other => Err(FormatError::Custom(format!("not a number: {}", other))),
        });
        processor.set_data_map(vec![
            DataMapEntry::new("n", "n", None::<&str>),
            DataMapEntry::new("doubled", "n", Some("double")),
        ]);

        let table = processor.process().unwrap();
        assert_eq!(table.columns(), &["n", "doubled"]);
        assert_eq!(table.rows()[0], vec![CellValue::Int(2), CellValue::Int(4)]);
    }

    #[test]
    fn test_hooks_are_always_called() {
        let file = csv_file(SAMPLE_CSV);
        let hooks = RecordingHooks::default();
        let calls = Arc::clone(&hooks.calls);

        let mut processor = Processor::new(file.path());
        processor.set_hooks(hooks);
        processor.set_data_map(data_map());
        processor.process().unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "pre");
        assert_eq!(calls[0].1, vec!["String", "Float", "Integer", "Date"]);
        assert_eq!(calls[1].0, "post");
        assert_eq!(calls[1].1, vec!["string", "float", "integer", "date"]);
    }

    #[test]
    fn test_preprocess_hook_can_filter_rows() {
        #[derive(Debug)]
        struct SkipZeroFloats;

        impl ProcessHooks for SkipZeroFloats {
            fn preprocess(&mut self, table: &mut Table) -> ProcessorResult<()> {
                let idx = table
                    .column_index("Float")
                    .ok_or_else(|| ProcessorError::Hook("no Float column".into()))?;
                table.retain_rows(|row| row[idx] != CellValue::Float(0.0));
                Ok(())
            }
        }

        let file = csv_file(SAMPLE_CSV);
        let mut processor = Processor::new(file.path());
        processor.set_hooks(SkipZeroFloats);
        processor.set_data_map(data_map());

        let table = processor.process().unwrap();
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_stages_are_reported_in_order() {
        let file = csv_file(SAMPLE_CSV);
        let mut processor = Processor::new(file.path());
        processor.set_data_map(data_map());
        let mut rx = processor.subscribe();

        processor.process().unwrap();

        let mut stages = Vec::new();
        while let Ok(entry) = rx.try_recv() {
            stages.push(entry.stage);
        }
        assert_eq!(
            stages,
            vec![
                Stage::PathValidated,
                Stage::MappingResolved,
                Stage::Loaded,
                Stage::SchemaValidated,
                Stage::PreProcessed,
                Stage::FormattedAndProjected,
                Stage::PostProcessed,
                Stage::Done,
            ]
        );
    }

    #[test]
    fn test_process_spreadsheet() {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.xlsx");

        let mut workbook = Workbook::new();
        let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm");
        let sheet = workbook.add_worksheet();
        for (col, name) in ["String", "Float", "Integer", "Date"].iter().enumerate() {
            sheet.write_string(0, col as u16, *name).unwrap();
        }
        sheet.write_string(1, 0, "string").unwrap();
        sheet.write_number(1, 1, 1.47).unwrap();
        sheet.write_number(1, 2, 1).unwrap();
        let when = ExcelDateTime::from_ymd(1970, 5, 6)
            .unwrap()
            .and_hms(13, 45, 0.0)
            .unwrap();
        sheet.write_datetime_with_format(1, 3, &when, &datetime_format).unwrap();
        workbook.save(&path).unwrap();

        let mut processor = Processor::new(&path);
        processor.set_data_map(data_map());
        let table = processor.process().unwrap();

        assert_eq!(table.columns(), &["string", "float", "integer", "date"]);
        assert_eq!(
            table.rows()[0],
            vec![
                CellValue::from("STRING"),
                CellValue::Float(1.47),
                CellValue::Int(1),
                ymd(1970, 5, 6),
            ]
        );
    }

    #[test]
    fn test_empty_table_is_a_warning() {
        let file = csv_file("String,Float,Integer,Date\n");
        let mut processor = Processor::new(file.path());
        processor.set_data_map(data_map());
        let mut rx = processor.subscribe();

        assert_eq!(processor.process().unwrap().row_count(), 0);

        let mut warnings = Vec::new();
        while let Ok(entry) = rx.try_recv() {
            if entry.level == crate::logs::LogLevel::Warning {
                warnings.push(entry.stage);
            }
        }
        assert_eq!(warnings, vec![Stage::Loaded]);
    }

    #[test]
    fn test_failure_is_reported() {
        let mut processor = Processor::new("invalid_path");
        let mut rx = processor.subscribe();
        let _ = processor.process();

        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.stage, Stage::Failed);
        assert!(entry.message.contains("invalid_path"));
    }

    #[test]
    fn test_format_and_project_exact_columns() {
        let mut table = Table::new(
            vec!["A".into(), "B".into(), "C".into()],
            vec![vec!["x".into(), "y".into(), "z".into()]],
        );
        let identity = crate::transform::formatters::Formatter::Identity.bind(DEFAULT_DATE_FORMAT);
        let entries = vec![
            ResolvedEntry {
                final_column: "c".into(),
                source_column: "C".into(),
                formatter_name: "identity".into(),
                formatter: identity.clone(),
            },
            ResolvedEntry {
                final_column: "A".into(),
                source_column: "B".into(),
                formatter_name: "identity".into(),
                formatter: identity,
            },
        ];
        let finals = vec!["c".to_string(), "A".to_string()];

        format_and_project(&mut table, &entries, &finals).unwrap();
        assert_eq!(table.columns(), &["c", "A"]);
        assert_eq!(table.rows()[0], vec![CellValue::from("z"), CellValue::from("y")]);
    }

    #[test]
    fn test_format_error_aborts_projection() {
        let mut table = Table::new(
            vec!["n".into()],
            vec![vec!["ok".into()], vec![CellValue::Int(1)]],
        );
        let upper = crate::transform::formatters::Formatter::Uppercase.bind(DEFAULT_DATE_FORMAT);
        let entries = vec![ResolvedEntry {
            final_column: "N".into(),
            source_column: "n".into(),
            formatter_name: "uppercase".into(),
            formatter: upper,
        }];

        let err = format_and_project(&mut table, &entries, &["N".to_string()]).unwrap_err();
        assert!(matches!(err, ProcessorError::Format(FormatError::Type { .. })));
        assert_eq!(table.columns(), &["n"]);
    }
}
