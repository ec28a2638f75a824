//! Spreadsheet export → raw records.
//! CSV text goes through the `csv` crate; `.xlsx`/`.ods` exports through `calamine`.
//! Both apply the same coercion: a cell whose trimmed text is a finite number becomes a
//! JSON number, anything else stays text. Empty text is never zero.

use std::path::Path;

use calamine::Reader;
use serde_json::{Number, Value};

use crate::config::DatasetSchema;
use crate::data::record::{Columns, CrashRecord};
use crate::error::IngestError;

/// Parse CSV text into raw records (coordinates aliased, not yet validated).
///
/// The first line is the header. Data lines are trimmed and blank lines skipped.
/// Missing trailing fields read as empty strings; extra fields are dropped.
pub fn parse_csv(text: &str, schema: &DatasetSchema) -> Result<Vec<CrashRecord>, IngestError> {
    let lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(lines.as_bytes());
    let mut rows = reader.records();

    let Some(header) = rows.next().transpose()? else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();

    let mut records = Vec::new();
    for row in rows {
        let row = row?;
        let mut columns = Columns::new();
        for (index, header) in headers.iter().enumerate() {
            let raw = row.get(index).unwrap_or("");
            columns.insert(header.clone(), coerce_field(raw));
        }
        records.push(CrashRecord::from_columns(columns, schema));
    }

    Ok(records)
}

/// Number when the whole trimmed text is a finite numeric literal, otherwise the text as-is.
pub fn coerce_field(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::String(raw.to_string());
    }
    if let Ok(integer) = trimmed.parse::<i64>() {
        return Value::Number(integer.into());
    }
    match trimmed.parse::<f64>() {
        Ok(float) if float.is_finite() => float_value(float),
        _ => Value::String(raw.to_string()),
    }
}

fn float_value(float: f64) -> Value {
    if float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
        return Value::Number((float as i64).into());
    }
    Number::from_f64(float)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Read a worksheet export. Uses `sheet` when given, otherwise the first sheet.
pub fn read_workbook(
    path: &Path,
    sheet: Option<&str>,
    schema: &DatasetSchema,
) -> Result<Vec<CrashRecord>, IngestError> {
    let mut workbook = calamine::open_workbook_auto(path)?;
    let names = workbook.sheet_names();
    let sheet_name = match sheet {
        Some(name) => names
            .iter()
            .find(|candidate| candidate.as_str() == name)
            .cloned()
            .ok_or_else(|| IngestError::MissingSheet(name.to_string()))?,
        None => names
            .first()
            .cloned()
            .ok_or_else(|| IngestError::MissingSheet("<first>".to_string()))?,
    };

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header
        .iter()
        .map(|cell| cell_text(cell).trim().to_string())
        .collect();

    let mut records = Vec::new();
    for row in rows {
        if row.iter().all(|cell| matches!(cell, calamine::Data::Empty)) {
            continue;
        }
        let mut columns = Columns::new();
        for (index, header) in headers.iter().enumerate() {
            let value = row.get(index).map(cell_value).unwrap_or_else(|| Value::String(String::new()));
            columns.insert(header.clone(), value);
        }
        records.push(CrashRecord::from_columns(columns, schema));
    }

    Ok(records)
}

fn cell_value(cell: &calamine::Data) -> Value {
    match cell {
        calamine::Data::Empty => Value::String(String::new()),
        calamine::Data::String(text) => coerce_field(text),
        calamine::Data::Float(float) if float.is_finite() => float_value(*float),
        calamine::Data::Int(integer) => Value::Number((*integer).into()),
        other => Value::String(cell_text(other)),
    }
}

fn cell_text(cell: &calamine::Data) -> String {
    match cell {
        calamine::Data::Empty => String::new(),
        calamine::Data::String(text) => text.clone(),
        calamine::Data::Float(float) => format!("{float}"),
        calamine::Data::Int(integer) => format!("{integer}"),
        calamine::Data::Bool(flag) => if *flag { "TRUE" } else { "FALSE" }.to_string(),
        other => format!("{other:?}"),
    }
}

pub fn is_workbook_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "xlsx" | "xlsm" | "xls" | "ods"))
        .unwrap_or(false)
}
