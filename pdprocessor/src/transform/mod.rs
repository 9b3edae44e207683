//! Transformation module.
//!
//! This module turns a loaded table into the mapped one:
//! - Formatters: Named cell conversions
//! - Mapping: Data map entries and their resolution
//! - Schema: Source column checks
//! - Pipeline: The `Processor` that runs everything in order

pub mod formatters;
pub mod mapping;
pub mod pipeline;
pub mod schema;

pub use formatters::{
    formatters_description, FormatFn, Formatter, FormatterRegistry, DEFAULT_DATE_FORMAT, IDENTITY,
};
pub use mapping::{resolve, DataMapEntry, ResolvedEntry, ResolvedMapping};
pub use pipeline::{format_and_project, NoopHooks, ProcessHooks, Processor};
pub use schema::validate_schema;
