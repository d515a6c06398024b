//! Canonical value tree built from normalized JSON data.

use std::cmp::Ordering;

/// A JSON-shaped value prepared for canonical encoding.
///
/// Unlike `serde_json::Value`, map entries are held as an ordered list so the
/// encoder controls their order. Integers keep their exact width: values that
/// fit `i64` are `Integer`, larger positive values are `Unsigned`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Unsigned integer above `i64::MAX`.
    Unsigned(u64),
    /// 64-bit float.
    Float(f64),
    /// Text string (UTF-8).
    Text(String),
    /// Array of values.
    Array(Vec<Value>),
    /// Map with text keys.
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Create a map value with canonically sorted keys.
    pub fn map(mut pairs: Vec<(String, Value)>) -> Self {
        pairs.sort_by(|a, b| cmp_text_canonical(&a.0, &b.0));
        Value::Map(pairs)
    }
}

/// Canonical ordering of text keys: encoded length first, then bytewise.
///
/// For text strings the encoded length grows monotonically with the UTF-8
/// byte length, so comparing byte lengths is equivalent.
pub(crate) fn cmp_text_canonical(a: &str, b: &str) -> Ordering {
    match a.len().cmp(&b.len()) {
        Ordering::Equal => a.as_bytes().cmp(b.as_bytes()),
        ord => ord,
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else if let Some(u) = n.as_u64() {
                    Value::Unsigned(u)
                } else {
                    // serde_json only yields finite floats here
                    Value::Float(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(items) => Value::Array(items.iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => Value::map(
                obj.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}
