//! Bridges values of arbitrary Rust types to and from [`Value`], mirroring
//! `cent.data.py.Py`. Where Python's `Py.load` branches on `isinstance`,
//! Rust needs an explicit boundary type: [`Native`] plays the role of "a
//! Python object of unknown type" for anything that isn't already one of
//! the AST's primitive shapes.

use std::any::Any;

use crate::custom;
use crate::error::DataError;
use crate::value::Value;

/// A native value on its way into or out of the AST. The primitive
/// variants mirror `Value` one-for-one; `Other` is the catch-all for a
/// boxed Rust type that must be resolved through the custom-type registry,
/// the analog of Python falling through to `isinstance(x, object)`.
pub enum Native {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Str(String),
    Array(Vec<Native>),
    Map(Vec<(Native, Native)>),
    Other(Box<dyn Any>),
}

pub struct Py;

impl Py {
    /// Converts a native value into the AST, looking up unregistered
    /// `Other` payloads in the custom-type registry by `TypeId`.
    pub fn load(x: Native) -> Result<Value, DataError> {
        match x {
            Native::Null => Ok(Value::Null),
            Native::Bool(b) => Ok(Value::Bool(b)),
            Native::Int(i) => Ok(Value::Int(i)),
            Native::Float(f) => Ok(Value::Float(f)),
            Native::Bytes(b) => Ok(Value::Bytes(b)),
            Native::Str(s) => Ok(Value::Str(s)),
            Native::Array(items) => {
                let loaded = items.into_iter().map(Py::load).collect::<Result<_, _>>()?;
                Ok(Value::Array(loaded))
            }
            Native::Map(pairs) => {
                let loaded = pairs
                    .into_iter()
                    .map(|(k, v)| Ok((Py::load(k)?, Py::load(v)?)))
                    .collect::<Result<_, DataError>>()?;
                Ok(Value::Map(loaded))
            }
            Native::Other(boxed) => {
                let type_id = (*boxed).type_id();
                let name = custom::name_for(type_id)
                    .ok_or_else(|| DataError::UnregisteredCustom(format!("{type_id:?}")))?;
                let payload = custom::dump(&name, boxed.as_ref())
                    .expect("registry entry found by name_for must dump");
                Ok(Value::Custom {
                    name,
                    payload: Box::new(payload),
                })
            }
        }
    }

    /// Converts the AST back into native values. `Custom` nodes are
    /// resolved through the registry and returned as `Native::Other`;
    /// callers downcast with `Any::downcast` against the type they expect.
    pub fn dump(x: &Value) -> Result<Native, DataError> {
        match x {
            Value::Null => Ok(Native::Null),
            Value::Bool(b) => Ok(Native::Bool(*b)),
            Value::Int(i) => Ok(Native::Int(*i)),
            Value::Float(f) => Ok(Native::Float(*f)),
            Value::Bytes(b) => Ok(Native::Bytes(b.clone())),
            Value::Str(s) => Ok(Native::Str(s.clone())),
            Value::Array(items) => {
                let dumped = items.iter().map(Py::dump).collect::<Result<_, _>>()?;
                Ok(Native::Array(dumped))
            }
            Value::Map(pairs) => {
                let dumped = pairs
                    .iter()
                    .map(|(k, v)| Ok((Py::dump(k)?, Py::dump(v)?)))
                    .collect::<Result<_, DataError>>()?;
                Ok(Native::Map(dumped))
            }
            Value::Custom { name, payload } => {
                let boxed = custom::load(name, payload)?;
                Ok(Native::Other(boxed))
            }
        }
    }
}

/// True if `type_id` has a registered custom-type dump/load pair.
pub fn is_registered(type_id: std::any::TypeId) -> bool {
    custom::type_id_registered(type_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_round_trip() {
        let n = Native::Array(vec![
            Native::Int(1),
            Native::Str("x".into()),
            Native::Bool(true),
        ]);
        let v = Py::load(n).unwrap();
        assert_eq!(
            v,
            Value::Array(vec![Value::Int(1), Value::Str("x".into()), Value::Bool(true)])
        );
    }

    #[test]
    fn unregistered_other_errors() {
        struct Unregistered;
        let n = Native::Other(Box::new(Unregistered));
        assert!(Py::load(n).is_err());
    }
}
