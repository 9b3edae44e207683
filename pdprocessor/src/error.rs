//! Error types for the pdprocessor pipeline.
//!
//! One enum per layer, converted upwards with `From` so `?` works across
//! layer boundaries:
//!
//! - [`LoadError`] - raised by a [`crate::loader::TableLoader`]
//! - [`FormatError`] - raised by a formatter on a single cell
//! - [`ConfigError`] - raised while reading a processor config file
//! - [`ProcessorError`] - what [`crate::Processor::process`] returns

use thiserror::Error;

// =============================================================================
// Loader Errors
// =============================================================================

/// Errors raised while turning a file into a [`crate::Table`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read the file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes could not be decoded with the requested encoding.
    #[error("Failed to decode content as '{encoding}': {message}")]
    Encoding { encoding: String, message: String },

    /// The delimited reader rejected the content.
    #[error("Invalid delimited content: {0}")]
    Csv(#[from] csv::Error),

    /// The workbook could not be opened or read.
    #[error("Spreadsheet error: {0}")]
    Workbook(#[from] calamine::Error),

    /// The requested sheet does not exist.
    #[error("Sheet {0} not found")]
    SheetNotFound(String),

    /// The header row index points past the end of the data.
    #[error("Header row {header} is out of range ({rows} rows available)")]
    HeaderOutOfRange { header: usize, rows: usize },

    /// A column selector could not be interpreted.
    #[error("Invalid column selector: {0}")]
    InvalidSelector(String),

    /// An option value the loader cannot honor.
    #[error("Invalid load option: {0}")]
    InvalidOption(String),

    /// `names` does not match the number of selected columns.
    #[error("Expected {expected} column names, got {got}")]
    NamesMismatch { expected: usize, got: usize },

    /// A cell could not be converted to the type forced by `dtype`.
    #[error("Line {line}, column '{column}' (value '{value}'): cannot convert to {target}")]
    Conversion {
        line: usize,
        column: String,
        value: String,
        target: String,
    },

    /// The engine could not be picked from the file extension.
    #[error("Cannot infer file format for '{0}'; set an explicit engine")]
    UnknownFormat(String),
}

// =============================================================================
// Formatter Errors
// =============================================================================

/// Errors raised by a formatter on a single cell value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    /// The value is not of a type the formatter accepts.
    #[error("Formatter '{formatter}' cannot handle {found} value '{value}'")]
    Type {
        formatter: String,
        found: String,
        value: String,
    },

    /// Text did not match the expected pattern.
    #[error("Value '{value}' does not match format '{pattern}'")]
    Parse { value: String, pattern: String },

    /// A caller-registered formatter rejected the value.
    #[error("{0}")]
    Custom(String),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors raised while reading a [`crate::ProcessorConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The config is not valid JSON or has the wrong shape.
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Processor Errors (top-level)
// =============================================================================

/// Errors returned by [`crate::Processor::process`].
///
/// The taxonomy is flat: whichever stage fails first determines the variant,
/// and nothing is retried or aggregated.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// The path does not reference an existing file.
    #[error("{0}")]
    Path(String),

    /// The data map is missing or references an unknown formatter.
    #[error("{0}")]
    Configuration(String),

    /// The loaded table lacks an expected source column.
    #[error("{0}")]
    Schema(String),

    /// A formatter rejected a cell.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// The loader failed. Passed through untouched.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A pre- or postprocess hook rejected the table.
    #[error("{0}")]
    Hook(String),
}

impl ProcessorError {
    /// The human-readable message, without any variant prefix.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for loader operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for a single formatter call.
pub type FormatResult<T> = Result<T, FormatError>;

/// Result type for config loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for processor operations.
pub type ProcessorResult<T> = Result<T, ProcessorError>;
