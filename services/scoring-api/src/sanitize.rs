//! Lead sanitization and CSV ingestion.
//!
//! A single bad row never fails the batch: it is logged and skipped, and the
//! survivors keep their input order. Only an unreadable file (bad header
//! row) is a hard failure.

use serde_json::{Map, Value};
use shared::dto::Lead;
use shared::error::AppError;
use tracing::{info, warn};

/// The six canonical lead fields, in CSV column convention.
pub const LEAD_FIELDS: [&str; 6] = [
    "name",
    "role",
    "company",
    "industry",
    "location",
    "linkedin_bio",
];

/// Coerce one raw row mapping into a canonical lead. Missing and null
/// values default to ""; nested arrays/objects make the row unusable.
pub fn lead_from_row(row: &Map<String, Value>) -> Result<Lead, AppError> {
    Ok(Lead {
        name: scalar(row, "name")?,
        role: scalar(row, "role")?,
        company: scalar(row, "company")?,
        industry: scalar(row, "industry")?,
        location: scalar(row, "location")?,
        linkedin_bio: scalar(row, "linkedin_bio")?,
    })
}

fn scalar(row: &Map<String, Value>, field: &str) -> Result<String, AppError> {
    match row.get(field) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(other) => Err(AppError::Validation(format!(
            "lead field '{field}' is not a scalar value: {other}"
        ))),
    }
}

/// Sanitize a sequence of raw row mappings, dropping unusable rows.
pub fn sanitize_rows(rows: &[Map<String, Value>]) -> Vec<Lead> {
    let mut leads = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        match lead_from_row(row) {
            Ok(lead) => leads.push(lead),
            Err(e) => warn!(row = i + 1, %e, "skipping invalid lead row"),
        }
    }
    leads
}

/// Decode a CSV upload into leads. Header decoding errors fail the whole
/// file; row-level errors only drop the affected row.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<Lead>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|e| AppError::CsvParse(format!("Failed to parse CSV file: {e}")))?
        .clone();

    let mut leads = Vec::new();
    for (i, record) in reader.records().enumerate() {
        // data rows start at line 2, after the header
        let line = i + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!(line, %e, "skipping unreadable CSV row");
                continue;
            }
        };
        let mut row = Map::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            row.insert(header.to_string(), Value::String(value.to_string()));
        }
        match lead_from_row(&row) {
            Ok(lead) => leads.push(lead),
            Err(e) => warn!(line, %e, "skipping invalid lead row"),
        }
    }
    info!(leads = leads.len(), "parsed leads from CSV");
    Ok(leads)
}
