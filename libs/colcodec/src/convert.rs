//! JSON rendering of value trees for diagnostics and logging.

use base64::Engine;

use crate::value::{Row, Value};

impl Value {
    /// Binary renders as standard base64, decimals as decimal strings and
    /// maps as arrays of `{"key", "value"}` objects.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int32(v) => serde_json::json!(v),
            Value::Int64(v) => serde_json::json!(v),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Float(f) => serde_json::json!(f),
            Value::Double(d) => serde_json::json!(d),
            Value::Binary(bytes) => {
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            Value::Decimal(d) => serde_json::Value::String(d.to_string()),
            Value::Row(row) => row.to_json(),
            Value::Map(entries) => serde_json::Value::Array(
                entries
                    .iter()
                    .map(|(k, v)| serde_json::json!({ "key": k.to_json(), "value": v.to_json() }))
                    .collect(),
            ),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }
}

impl Row {
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}
