//! CSV export of scored leads.

use shared::dto::ScoredLeadRecord;
use shared::error::{AppError, Result};

/// Render records as CSV. Columns are the sorted JSON keys of the record
/// shape (minus the owner, which never leaves the service); every value is
/// quoted, with embedded quotes doubled.
pub fn to_csv(records: &[ScoredLeadRecord]) -> Result<String> {
    let Some(first) = records.first() else {
        return Ok(String::new());
    };

    let mut columns: Vec<String> = row_map(first)?.keys().cloned().collect();
    columns.sort();

    let mut out = String::new();
    out.push_str(
        &columns
            .iter()
            .map(|c| quote(c))
            .collect::<Vec<_>>()
            .join(","),
    );
    out.push('\n');

    for record in records {
        let row = row_map(record)?;
        let line = columns
            .iter()
            .map(|c| quote(&cell_text(row.get(c))))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

fn row_map(record: &ScoredLeadRecord) -> Result<serde_json::Map<String, serde_json::Value>> {
    let mut value = serde_json::to_value(record)
        .map_err(|e| AppError::Database(format!("failed to serialize record: {e}")))?;
    let obj = value
        .as_object_mut()
        .ok_or_else(|| AppError::Database("record did not serialize to an object".into()))?;
    obj.remove("ownerId");
    Ok(obj.clone())
}

fn cell_text(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}
