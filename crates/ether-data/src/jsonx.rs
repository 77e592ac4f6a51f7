//! The JSON wire encoding for [`Value`], the Rust analog of
//! `cent.data.jsonx.JSONx`.
//!
//! `Bytes` and `Custom` have no native JSON shape, so both are rewritten
//! into a 3- or 4-element array tagged with the sentinel string
//! `"__jsonx__"` before serialization, and the reverse rewrite is applied
//! on load:
//!
//! - `Bytes(b)`            -> `["__jsonx__", "bytes", hex(b)]`
//! - `Custom{name,payload}` -> `["__jsonx__", "custom", name, ast_dump(payload)]`
//!
//! Any other array happens to start with the string `"__jsonx__"` only if
//! an encoder produced it by hand; `ast_load` treats that as a malformed
//! escape rather than silently accepting it, since only the two forms
//! above are ever emitted by `ast_dump`.

use crate::error::DataError;
use crate::value::Value;

const ESCAPE_TAG: &str = "__jsonx__";

pub struct JsonX;

impl JsonX {
    /// Rewrites `Bytes`/`Custom` nodes into their escape-array form,
    /// recursing through `Array`/`Map`. The result contains only
    /// `Null`/`Bool`/`Int`/`Float`/`Str`/`Array`/`Map` nodes.
    pub fn ast_dump(x: &Value) -> Value {
        match x {
            Value::Map(pairs) => Value::Map(
                pairs
                    .iter()
                    .map(|(k, v)| (JsonX::ast_dump(k), JsonX::ast_dump(v)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(JsonX::ast_dump).collect()),
            Value::Bytes(b) => Value::Array(vec![
                Value::str(ESCAPE_TAG),
                Value::str("bytes"),
                Value::str(hex::encode(b)),
            ]),
            Value::Custom { name, payload } => Value::Array(vec![
                Value::str(ESCAPE_TAG),
                Value::str("custom"),
                Value::str(name.clone()),
                JsonX::ast_dump(payload),
            ]),
            other => other.clone(),
        }
    }

    /// Reverses [`JsonX::ast_dump`]: expands escape arrays back into
    /// `Bytes`/`Custom` nodes.
    pub fn ast_load(x: Value) -> Result<Value, DataError> {
        match x {
            Value::Map(pairs) => {
                let loaded = pairs
                    .into_iter()
                    .map(|(k, v)| Ok((JsonX::ast_load(k)?, JsonX::ast_load(v)?)))
                    .collect::<Result<_, DataError>>()?;
                Ok(Value::Map(loaded))
            }
            Value::Array(items) => {
                let is_escape = items.len() > 2 && matches!(items.first(), Some(Value::Str(s)) if s == ESCAPE_TAG);
                if !is_escape {
                    let loaded = items.into_iter().map(JsonX::ast_load).collect::<Result<_, _>>()?;
                    return Ok(Value::Array(loaded));
                }

                let kind = items[1].as_str().ok_or(DataError::MalformedEscape)?;
                match kind {
                    "bytes" => {
                        let hex_str = items.get(2).and_then(Value::as_str).ok_or(DataError::MalformedEscape)?;
                        let bytes = hex::decode(hex_str)?;
                        Ok(Value::Bytes(bytes))
                    }
                    "custom" => {
                        let name = items.get(2).and_then(Value::as_str).ok_or(DataError::MalformedEscape)?.to_owned();
                        let payload = items.into_iter().nth(3).ok_or(DataError::MalformedEscape)?;
                        Ok(Value::Custom {
                            name,
                            payload: Box::new(JsonX::ast_load(payload)?),
                        })
                    }
                    other => Err(DataError::UnknownEscape(other.to_owned())),
                }
            }
            other => Ok(other),
        }
    }

    /// Serializes `x` to a JSON string. The root must dump as an array or
    /// object per the wire convention; a bare scalar at the top level is
    /// rejected the same way the source raises `DataException`.
    pub fn dump(x: &Value) -> Result<String, DataError> {
        let escaped = JsonX::ast_dump(x);
        if !matches!(escaped, Value::Array(_) | Value::Map(_)) {
            return Err(DataError::RootNotContainer);
        }
        let json = value_to_json(&escaped)?;
        Ok(serde_json::to_string(&json)?)
    }

    /// Parses a JSON string into `Value`, expanding escape arrays back into
    /// `Bytes`/`Custom` nodes.
    pub fn load(x: &str) -> Result<Value, DataError> {
        let json: serde_json::Value = serde_json::from_str(x)?;
        if !matches!(json, serde_json::Value::Array(_) | serde_json::Value::Object(_)) {
            return Err(DataError::RootNotContainer);
        }
        JsonX::ast_load(json_to_value(json))
    }
}

/// Converts a parsed `serde_json::Value` into our AST. JSON object keys are
/// always strings, so every `Map` produced here has string keys; non-string
/// keys only arise from values built programmatically with [`Value::Map`].
fn json_to_value(j: serde_json::Value) -> Value {
    match j {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => Value::Str(s),
        serde_json::Value::Array(items) => Value::Array(items.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (Value::Str(k), json_to_value(v)))
                .collect(),
        ),
    }
}

/// Converts our AST into a `serde_json::Value`, rejecting any `Map` with a
/// non-string key at any nesting depth: JSON objects require string keys,
/// and there is no lossless way to coerce an arbitrary node into one.
fn value_to_json(v: &Value) -> Result<serde_json::Value, DataError> {
    match v {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Int(i) => Ok(serde_json::Value::Number((*i).into())),
        Value::Float(f) => Ok(serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)),
        Value::Str(s) => Ok(serde_json::Value::String(s.clone())),
        Value::Bytes(_) | Value::Custom { .. } => {
            unreachable!("ast_dump must escape Bytes/Custom before value_to_json runs")
        }
        Value::Array(items) => Ok(serde_json::Value::Array(
            items.iter().map(value_to_json).collect::<Result<_, _>>()?,
        )),
        Value::Map(pairs) => {
            let mut obj = serde_json::Map::with_capacity(pairs.len());
            for (k, v) in pairs {
                let key = k.as_str().ok_or(DataError::NonStringMapKey)?;
                obj.insert(key.to_owned(), value_to_json(v)?);
            }
            Ok(serde_json::Value::Object(obj))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_round_trip() {
        let v = Value::map([("k", Value::Bytes(vec![0, 1, 255]))]);
        let s = JsonX::dump(&v).unwrap();
        assert!(s.contains("__jsonx__"));
        let back = JsonX::load(&s).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn custom_round_trip() {
        let v = Value::Array(vec![Value::Custom {
            name: "pt".into(),
            payload: Box::new(Value::map([("x", Value::Int(1)), ("y", Value::Int(2))])),
        }]);
        let s = JsonX::dump(&v).unwrap();
        let back = JsonX::load(&s).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn scalar_root_rejected() {
        assert!(JsonX::dump(&Value::Int(1)).is_err());
        assert!(JsonX::load("1").is_err());
    }

    #[test]
    fn non_string_map_key_rejected() {
        let v = Value::Map(vec![(Value::Int(1), Value::Null)]);
        assert!(matches!(JsonX::dump(&v), Err(DataError::NonStringMapKey)));
    }

    #[test]
    fn unknown_escape_kind_rejected() {
        let raw = r#"["__jsonx__", "not-a-real-kind", "x"]"#;
        let err = JsonX::load(raw).unwrap_err();
        assert!(matches!(err, DataError::UnknownEscape(_)));
    }

    #[test]
    fn plain_array_starting_with_tag_but_short_is_not_an_escape() {
        let raw = r#"["__jsonx__"]"#;
        let back = JsonX::load(raw).unwrap();
        assert_eq!(back, Value::Array(vec![Value::str(ESCAPE_TAG)]));
    }
}
