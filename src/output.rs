//! JSON conversion for expression values.
//!
//! Scopes arrive as JSON and results leave as JSON. Conversion goes through
//! `serde_json::Value`, so object keys come out sorted and output is
//! deterministic.
//!
//! Functions and host objects have no JSON form and convert to `null`, as do
//! non-finite floats.
//!
//! # Examples
//!
//! ```
//! use ngexpr::Value;
//! use ngexpr::output::{from_json, to_json_string};
//!
//! let scope = from_json(serde_json::json!({"a": [1, 2.5, "x"]}));
//! assert_eq!(scope.get("a").unwrap().get_keyed(&Value::Integer(0)).unwrap(), Value::Integer(1));
//! assert_eq!(to_json_string(&scope), r#"{"a":[1,2.5,"x"]}"#);
//! ```

use crate::value::Value;

/// Convert a JSON document into a value. Objects and arrays become fresh shared values.
pub fn from_json(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map_or(Value::Null, Value::Float),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::array(arr.into_iter().map(from_json).collect()),
        serde_json::Value::Object(obj) => {
            Value::object(obj.into_iter().map(|(k, v)| (k, from_json(v))))
        }
    }
}

pub fn to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Null | Value::Function(_) | Value::Host(_) => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(arr) => serde_json::Value::Array(arr.borrow().iter().map(to_json).collect()),
        Value::Object(obj) => serde_json::Value::Object(
            obj.borrow()
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
        ),
    }
}

/// Compact JSON text.
pub fn to_json_string(v: &Value) -> String {
    to_json(v).to_string()
}

/// JSON text with 2-space indentation.
pub fn to_json_pretty(v: &Value) -> String {
    format!("{:#}", to_json(v))
}
