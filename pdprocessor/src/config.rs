//! Processor configuration files.
//!
//! A config bundles a data map with the load options and date pattern it
//! was written for, so the same mapping can be rerun from the CLI:
//!
//! ```json
//! {
//!   "data_map": [
//!     ["string", "String", "uppercase"],
//!     ["float", "Float", null],
//!     {"final": "date", "source": "Date", "formatter": "date"}
//!   ],
//!   "date_format": "%m/%d/%Y",
//!   "options": {"encoding": "utf-8", "delimiter": ";"}
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigResult;
use crate::loader::LoadOptions;
use crate::transform::{DataMapEntry, Processor};

/// Environment variable the CLI reads a fallback date pattern from.
pub const DATE_FORMAT_ENV: &str = "PDPROCESSOR_DATE_FORMAT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub data_map: Vec<DataMapEntry>,
    /// Pattern for the `date` formatter. Unset keeps the processor's.
    pub date_format: Option<String>,
    pub options: LoadOptions,
}

impl ProcessorConfig {
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Install the data map, options and date pattern on `processor`.
    pub fn apply_to(self, processor: &mut Processor) {
        processor.set_data_map(self.data_map);
        processor.set_load_options(self.options);
        if let Some(date_format) = self.date_format {
            processor.set_date_format(date_format);
        }
    }
}
