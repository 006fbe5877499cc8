//! Loading uploaded spreadsheets into a DataFrame.
//!
//! The format is chosen from the filename extension before any bytes are
//! parsed. CSV goes through the Polars reader, Excel workbooks through
//! calamine (first worksheet, first row as header).

use calamine::{Data, DataType as _, Reader, open_workbook_auto_from_rs};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ProcessingError, Result};

/// Number of rows Polars looks at when inferring CSV column types.
const CSV_INFER_SCHEMA_ROWS: usize = 100;

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Excel,
}

impl FileFormat {
    /// Pick the parser from the filename extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::UnsupportedFormat`] for anything other than
    /// `.csv`, `.xlsx` or `.xls`.
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("xlsx") | Some("xls") => Ok(Self::Excel),
            _ => Err(ProcessingError::UnsupportedFormat(filename.to_string())),
        }
    }
}

/// Parse uploaded bytes into a DataFrame.
///
/// # Errors
///
/// - [`ProcessingError::UnsupportedFormat`] when the extension is not supported
/// - [`ProcessingError::EmptyInput`] when there are no bytes or no columns
/// - [`ProcessingError::LoadFailed`] / [`ProcessingError::Excel`] when parsing fails
pub fn load_dataset(bytes: &[u8], filename: &str) -> Result<DataFrame> {
    let format = FileFormat::from_filename(filename)?;

    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ProcessingError::EmptyInput);
    }

    let df = match format {
        FileFormat::Csv => load_csv(bytes)?,
        FileFormat::Excel => load_excel(bytes)?,
    };

    if df.width() == 0 {
        return Err(ProcessingError::EmptyInput);
    }

    info!(
        "Loaded '{}' as {:?}: {} rows x {} columns",
        filename,
        format,
        df.height(),
        df.width()
    );
    Ok(df)
}

/// Load CSV bytes, retrying once on pre-cleaned content.
fn load_csv(bytes: &[u8]) -> Result<DataFrame> {
    let first_attempt = CsvReadOptions::default()
        .with_infer_schema_length(Some(CSV_INFER_SCHEMA_ROWS))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish();

    match first_attempt {
        Ok(df) => Ok(df),
        Err(e) => {
            debug!("Standard CSV parsing failed: {}", e);
            let content = String::from_utf8_lossy(bytes);
            let cleaned = clean_csv_content(&content);

            CsvReadOptions::default()
                .with_infer_schema_length(Some(CSV_INFER_SCHEMA_ROWS))
                .with_has_header(true)
                .into_reader_with_file_handle(Cursor::new(cleaned.into_bytes()))
                .finish()
                .map_err(|e| ProcessingError::LoadFailed(e.to_string()))
        }
    }
}

/// Drop blank lines and collapse doubled quotes.
fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Load the first worksheet of an xlsx/xls workbook.
fn load_excel(bytes: &[u8]) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ProcessingError::LoadFailed("workbook has no worksheets".to_string()))??;

    let rows: Vec<&[Data]> = range.rows().collect();
    let Some((header_row, body)) = rows.split_first() else {
        return Err(ProcessingError::EmptyInput);
    };

    let mut columns = Vec::with_capacity(header_row.len());
    for (idx, header) in header_row.iter().enumerate() {
        let name = header
            .as_string()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("column_{}", idx + 1));

        let cells: Vec<Option<&Data>> = body.iter().map(|row| row.get(idx)).collect();
        columns.push(excel_column_to_series(&name, &cells).into());
    }

    DataFrame::new(columns).map_err(ProcessingError::from)
}

/// Build a column from calamine cells: Int64 when every non-empty cell is a
/// whole number, Float64 when every one is numeric, String otherwise (dates
/// rendered as ISO text).
fn excel_column_to_series(name: &str, cells: &[Option<&Data>]) -> Series {
    let all_numeric = cells
        .iter()
        .flatten()
        .all(|cell| matches!(cell, Data::Int(_) | Data::Float(_) | Data::Empty));

    let all_whole = cells
        .iter()
        .flatten()
        .all(|cell| matches!(cell, Data::Empty) || excel_cell_to_i64(cell).is_some());

    if all_whole {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|cell| cell.and_then(excel_cell_to_i64))
            .collect();
        return Series::new(name.into(), values);
    }

    if all_numeric {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|cell| cell.and_then(|c| c.as_f64()))
            .collect();
        return Series::new(name.into(), values);
    }

    let values: Vec<Option<String>> = cells
        .iter()
        .map(|cell| cell.and_then(excel_cell_to_string))
        .collect();
    Series::new(name.into(), values)
}

/// Whole-number cells. Workbooks store most numbers as floats, so `2021.0`
/// counts too.
fn excel_cell_to_i64(cell: &Data) -> Option<i64> {
    match cell {
        Data::Int(v) => Some(*v),
        Data::Float(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Some(*v as i64),
        _ => None,
    }
}

fn excel_cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Data::DateTime(_) => cell.as_datetime().map(|dt| {
            if dt.time() == chrono::NaiveTime::MIN {
                dt.format("%Y-%m-%d").to_string()
            } else {
                dt.format("%Y-%m-%d %H:%M:%S").to_string()
            }
        }),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.trim().to_string()),
        Data::Int(v) => Some(v.to_string()),
        Data::Float(v) => Some(v.to_string()),
        Data::Bool(v) => Some(v.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_filename() {
        assert_eq!(FileFormat::from_filename("sales.csv").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_filename("Q1.XLSX").unwrap(), FileFormat::Excel);
        assert_eq!(FileFormat::from_filename("legacy.xls").unwrap(), FileFormat::Excel);
    }

    #[test]
    fn test_unsupported_format_rejected() {
        for name in ["notes.txt", "report.pdf", "no_extension", "data.csv.bak"] {
            let err = FileFormat::from_filename(name).unwrap_err();
            assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT", "{}", name);
        }
    }

    #[test]
    fn test_unsupported_format_checked_before_parsing() {
        // bytes are a perfectly valid CSV, the extension alone decides
        let err = load_dataset(b"a,b\n1,2\n", "upload.json").unwrap_err();
        assert!(matches!(err, ProcessingError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_load_csv() {
        let csv = b"Date,Revenue,Region\n2024-01-01,100,North\n2024-01-02,,South\n";
        let df = load_dataset(csv, "sales.csv").unwrap();
        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.column("Region").unwrap().dtype(), &DataType::String);
        // dates stay text until the repair stage coerces them
        assert_eq!(df.column("Date").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("Revenue").unwrap().null_count(), 1);
    }

    #[test]
    fn test_load_csv_keeps_currency_text() {
        let csv = b"price\n$10\n$20\nabc\n\n";
        let df = load_dataset(csv, "prices.csv").unwrap();
        assert_eq!(df.column("price").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            load_dataset(b"", "empty.csv"),
            Err(ProcessingError::EmptyInput)
        ));
        assert!(matches!(
            load_dataset(b"  \n", "blank.csv"),
            Err(ProcessingError::EmptyInput)
        ));
    }

    #[test]
    fn test_invalid_excel_bytes() {
        let err = load_dataset(b"definitely not a workbook", "broken.xlsx").unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_clean_csv_content() {
        let cleaned = clean_csv_content("a,b\n\n1,\"\"x\"\"\n");
        assert_eq!(cleaned, "a,b\n1,\"x\"");
    }

    #[test]
    fn test_excel_column_whole_numbers_are_integers() {
        let a = Data::Float(2021.0);
        let b = Data::Int(2022);
        let empty = Data::Empty;
        let series = excel_column_to_series("Year", &[Some(&a), Some(&empty), Some(&b), None]);
        assert_eq!(series.dtype(), &DataType::Int64);
        let values: Vec<Option<i64>> = series.i64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(2021), None, Some(2022), None]);
    }

    #[test]
    fn test_excel_column_numeric() {
        let a = Data::Float(1.5);
        let b = Data::Int(2);
        let empty = Data::Empty;
        let series = excel_column_to_series("amount", &[Some(&a), Some(&b), Some(&empty), None]);
        assert_eq!(series.dtype(), &DataType::Float64);
        assert_eq!(series.null_count(), 2);
    }

    #[test]
    fn test_excel_column_mixed_is_text() {
        let a = Data::String("north".to_string());
        let b = Data::Int(7);
        let series = excel_column_to_series("region", &[Some(&a), Some(&b)]);
        assert_eq!(series.dtype(), &DataType::String);
        let values: Vec<Option<&str>> = series.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("north"), Some("7")]);
    }
}
