//! Delimited text loader (CSV, TSV, ...) with encoding and delimiter detection.

use encoding_rs::Encoding;
use std::path::Path;

use super::{shape, LoadOptions, TableLoader};
use crate::error::{LoadError, LoadResult};
use crate::models::{CellValue, Table};

/// Loads comma (or otherwise) separated text files.
#[derive(Debug, Default, Clone, Copy)]
pub struct DelimitedLoader;

impl TableLoader for DelimitedLoader {
    fn load(&self, path: &Path, options: &LoadOptions) -> LoadResult<Table> {
        let bytes = std::fs::read(path)?;
        log::debug!("read {} bytes from {}", bytes.len(), path.display());
        load_bytes(&bytes, options)
    }
}

/// Parse delimited content already in memory.
pub fn load_bytes(bytes: &[u8], options: &LoadOptions) -> LoadResult<Table> {
    let encoding = if options.encoding.eq_ignore_ascii_case("auto") {
        detect_encoding(bytes)
    } else {
        options.encoding.clone()
    };
    let content = decode_content(bytes, &encoding)?;

    let delimiter = options.delimiter.unwrap_or_else(|| detect_delimiter(&content));
    if !delimiter.is_ascii() {
        return Err(LoadError::InvalidOption(format!(
            "delimiter '{}' must be a single ASCII character",
            delimiter
        )));
    }
    log::debug!("parsing with encoding {} and delimiter {:?}", encoding, delimiter);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        grid.push(record.iter().map(CellValue::from).collect());
    }

    shape(grid, options)
}

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "latin-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        "" => "utf-8".to_string(),
        _ => charset,
    }
}

/// Decode bytes using an encoding label (`utf-8`, `latin-1`, `cp1252`, ...).
pub fn decode_content(bytes: &[u8], encoding: &str) -> LoadResult<String> {
    let label = match encoding.to_lowercase().as_str() {
        "latin1" | "latin-1" | "iso8859-1" => "iso-8859-1".to_string(),
        "utf8" => "utf-8".to_string(),
        other => other.to_string(),
    };

    let codec = Encoding::for_label(label.as_bytes()).ok_or_else(|| LoadError::Encoding {
        encoding: encoding.to_string(),
        message: "unknown encoding".to_string(),
    })?;

    let (decoded, _, had_errors) = codec.decode(bytes);
    if had_errors {
        return Err(LoadError::Encoding {
            encoding: encoding.to_string(),
            message: "malformed byte sequence".to_string(),
        });
    }
    Ok(decoded.into_owned())
}

/// Detect the delimiter by counting occurrences in the first line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn utf8() -> LoadOptions {
        LoadOptions {
            encoding: "utf-8".into(),
            ..LoadOptions::default()
        }
    }

    #[test]
    fn test_simple_csv() {
        let table = load_bytes(b"name,age\nAlice,30\nBob,25", &utf8()).unwrap();

        assert_eq!(table.columns(), &["name", "age"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[0][0], CellValue::from("Alice"));
        assert_eq!(table.rows()[1][1], CellValue::Int(25));
    }

    #[test]
    fn test_quoted_values() {
        let csv = "name,value\n\"Doe, Jane\",\"Hello World\"";
        let table = load_bytes(csv.as_bytes(), &utf8()).unwrap();

        assert_eq!(table.rows()[0][0], CellValue::from("Doe, Jane"));
        assert_eq!(table.rows()[0][1], CellValue::from("Hello World"));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let table = load_bytes(b"a,b\n1,2\n\n3,4\n", &utf8()).unwrap();
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_missing_values() {
        let table = load_bytes(b"a,b,c\n1,,3", &utf8()).unwrap();
        assert_eq!(table.rows()[0][1], CellValue::Null);
        assert_eq!(table.rows()[0][2], CellValue::Int(3));
    }

    #[test]
    fn test_auto_delimiter() {
        let options = LoadOptions {
            delimiter: None,
            ..utf8()
        };
        let table = load_bytes(b"a;b;c\n1;2;3", &options).unwrap();
        assert_eq!(table.columns(), &["a", "b", "c"]);
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let options = LoadOptions {
            delimiter: Some('§'),
            ..utf8()
        };
        assert!(matches!(
            load_bytes(b"a", &options),
            Err(LoadError::InvalidOption(_))
        ));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "latin-1").unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        let bytes: &[u8] = &[0x53, 0xE9, 0x74];
        assert!(matches!(
            decode_content(bytes, "utf-8"),
            Err(LoadError::Encoding { .. })
        ));
        assert!(decode_content(bytes, "klingon").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"String,Float\nstring,1.47\n").unwrap();

        let table = DelimitedLoader.load(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(table.columns(), &["String", "Float"]);
        assert_eq!(table.rows()[0][1], CellValue::Float(1.47));
    }

    #[test]
    fn test_load_missing_file() {
        let err = DelimitedLoader
            .load(Path::new("does/not/exist.csv"), &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
