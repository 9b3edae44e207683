//! # pdprocessor - Data-map driven table processing
//!
//! pdprocessor loads a delimited or spreadsheet file into a [`Table`] and
//! reshapes it through a data map: an ordered list of
//! `(final column, source column, formatter)` entries.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV / XLSX │────▶│   Loader    │────▶│  Processor  │────▶│ Final Table │
//! │    file     │     │ (auto-type) │     │ (data map)  │     │  (ordered)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pdprocessor::{DataMapEntry, Processor};
//!
//! let mut processor = Processor::new("input.csv");
//! processor.set_data_map(vec![
//!     DataMapEntry::new("string", "String", Some("uppercase")),
//!     DataMapEntry::new("date", "Date", Some("date")),
//! ]);
//! let table = processor.process()?;
//! println!("{}", serde_json::to_string_pretty(&table.to_records())?);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Layered error types
//! - [`models`] - Cell values and tables
//! - [`loader`] - Delimited and spreadsheet loaders
//! - [`transform`] - Formatters, data maps and the pipeline
//! - [`config`] - JSON processor configs
//! - [`logs`] - Per-run progress reporting

// Core modules
pub mod error;
pub mod models;

// Loading
pub mod loader;

// Transformation
pub mod transform;

// Configuration
pub mod config;

// Progress
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, ConfigResult, FormatError, FormatResult, LoadError, LoadResult, ProcessorError,
    ProcessorResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{CellValue, Table};

// =============================================================================
// Re-exports - Loading
// =============================================================================

pub use loader::{
    decode_content, detect_delimiter, detect_encoding, loader_for, AutoLoader, CellType,
    ColumnSelector, DelimitedLoader, Engine, LoadOptions, SheetSelector, SpreadsheetLoader,
    TableLoader,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    formatters_description, DataMapEntry, FormatterRegistry, NoopHooks, ProcessHooks, Processor,
    ResolvedMapping, DEFAULT_DATE_FORMAT,
};

// =============================================================================
// Re-exports - Config & Progress
// =============================================================================

pub use config::{ProcessorConfig, DATE_FORMAT_ENV};
pub use logs::{LogEntry, LogLevel, Stage};
