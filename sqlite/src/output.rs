//! Result rows of an executed script.

use rusqlite::types::Value;
use serde_json::{Map, Number, Value as Json};

/// Columns and rows produced by the last statement of a script.
///
/// Statements that return no rows (DDL, inserts) leave `columns` empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryOutput {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Each row as a JSON object keyed by column name.
    ///
    /// Blobs are rendered as lowercase hex strings and non-finite reals as
    /// `null`.
    pub fn json_rows(&self) -> Vec<Json> {
        self.rows
            .iter()
            .map(|row| {
                let object: Map<String, Json> = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().map(to_json))
                    .collect();
                Json::Object(object)
            })
            .collect()
    }
}

fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Integer(i) => Json::from(*i),
        Value::Real(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::Text(s) => Json::String(s.clone()),
        Value::Blob(bytes) => Json::String(bytes.iter().map(|b| format!("{b:02x}")).collect()),
    }
}
