use std::path::Path;

use serde_json::Value;

use crate::database::columns::ColumnMap;
use crate::database::{Database, ImportSummary};

/// Records come either as a bare array or wrapped as `{"records": [...]}` /
/// `{"data": [...]}`.
fn records_of(doc: Value) -> Result<Vec<Value>, String> {
    match doc {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => match obj.remove("records").or_else(|| obj.remove("data")) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err("Expected a `records` or `data` array".to_string()),
        },
        _ => Err("Expected a JSON array of records".to_string()),
    }
}

pub fn import_records_json(
    db: &Database,
    text: &str,
    columns: &ColumnMap,
    default_mode: &str,
) -> Result<ImportSummary, String> {
    let doc: Value = serde_json::from_str(text).map_err(|e| format!("Failed to parse records: {}", e))?;
    let records = records_of(doc)?;
    db.import_records(&records, columns, default_mode)
        .map_err(|e| format!("Failed to import records: {}", e))
}

pub fn import_records_file(
    db: &Database,
    path: &Path,
    columns: &ColumnMap,
    default_mode: &str,
) -> Result<ImportSummary, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    import_records_json(db, &text, columns, default_mode)
}
