//! JSON bridging for control byte 0x0F ("load a JKSN string, parse it as
//! JSON, return result"). This is a literal feature of the wire protocol,
//! not the reflection-based native-struct mapping the spec calls out of
//! scope — this module only ever converts between `Value` and JSON text.

use num_bigint::BigInt;
use serde_json::Number;

use crate::error::{Error, Result};
use crate::{Integer, Value};

pub fn value_to_json_text(value: &Value) -> String {
    to_json(value).to_string()
}

pub fn json_text_to_value(text: &str) -> Result<Value> {
    let parsed: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| Error::UnsupportedValue(format!("invalid embedded JSON: {e}")))?;
    Ok(from_json(&parsed))
}

fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null | Value::Unspecified => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => match n.as_i64() {
            Some(v) => serde_json::Value::Number(Number::from(v)),
            None => match n.as_u64() {
                Some(v) => serde_json::Value::Number(Number::from(v)),
                // JSON has no arbitrary-precision integer; fall back to text.
                None => serde_json::Value::String(n.as_bigint().to_string()),
            },
        },
        Value::F32(f) => Number::from_f64(*f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::F64(f) => Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Blob(b) => {
            serde_json::Value::Array(b.iter().map(|&x| serde_json::Value::from(x)).collect())
        }
        Value::Array(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Object(pairs) => {
            let mut map = serde_json::Map::with_capacity(pairs.len());
            for (k, v) in pairs {
                let key = match k {
                    Value::Str(s) => s.clone(),
                    other => value_to_json_text(other),
                };
                map.insert(key, to_json(v));
            }
            serde_json::Value::Object(map)
        }
    }
}

fn from_json(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Value::Int(Integer::from(v))
            } else if let Some(v) = n.as_u64() {
                Value::Int(Integer::from(v))
            } else if let Some(v) = n.as_f64() {
                Value::F64(v)
            } else {
                Value::Int(Integer::from(BigInt::from(0)))
            }
        }
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => Value::Array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            Value::Object(map.iter().map(|(k, v)| (Value::from(k.as_str()), from_json(v))).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_object() {
        let text = r#"{"a":1,"b":[true,null,"x"]}"#;
        let v = json_text_to_value(text).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(v.get("a").and_then(Value::as_int).and_then(Integer::as_i64), Some(1));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(json_text_to_value("{not json").is_err());
    }
}
