//! Process-wide registry mapping a Rust type to a wire name and back, the
//! analog of `cent.data.custom.CustomType`'s `NAMES`/`TYPES` tables.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::DataError;
use crate::value::Value;

type DumpFn = Box<dyn Fn(&dyn Any) -> Value + Send + Sync>;
type LoadFn = Box<dyn Fn(&Value) -> Result<Box<dyn Any>, DataError> + Send + Sync>;

struct Entry {
    type_id: TypeId,
    dump: DumpFn,
    load: LoadFn,
}

#[derive(Default)]
struct Registry {
    by_name: HashMap<String, Entry>,
    name_of: HashMap<TypeId, String>,
}

static REGISTRY: std::sync::OnceLock<RwLock<Registry>> = std::sync::OnceLock::new();

fn registry() -> &'static RwLock<Registry> {
    REGISTRY.get_or_init(|| RwLock::new(Registry::default()))
}

/// Registers `T` under `name` with explicit AST-shaped `dump`/`load`
/// functions, mirroring `CustomType.register`.
///
/// Registering the same `name` twice replaces the previous entry; this
/// matches the source's last-write-wins behavior and keeps test setup
/// idempotent.
pub fn register<T: Any + 'static>(
    name: &str,
    dump: impl Fn(&T) -> Value + Send + Sync + 'static,
    load: impl Fn(&Value) -> Result<T, DataError> + Send + Sync + 'static,
) {
    let type_id = TypeId::of::<T>();
    let entry = Entry {
        type_id,
        dump: Box::new(move |any| dump(any.downcast_ref::<T>().expect("type id matched"))),
        load: Box::new(move |v| load(v).map(|t| Box::new(t) as Box<dyn Any>)),
    };
    let mut reg = registry().write().expect("custom registry poisoned");
    reg.by_name.insert(name.to_owned(), entry);
    reg.name_of.insert(type_id, name.to_owned());
}

/// Registers `T` as an opaque byte blob, serialized with `bincode`. Intended
/// for types with no natural AST shape — the "pickled" style from
/// `cent/data/custom.py`'s `PICKLE` convenience wrapper.
pub fn register_pickled<T>(name: &str)
where
    T: Any + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    register::<T>(
        name,
        |t: &T| {
            let bytes = bincode::serialize(t).expect("bincode serialize is infallible for T: Serialize");
            Value::Bytes(bytes)
        },
        |v: &Value| {
            let bytes = v
                .as_bytes()
                .ok_or_else(|| DataError::UnregisteredCustom(name.to_owned()))?;
            bincode::deserialize(bytes).map_err(|_| DataError::MalformedEscape)
        },
    );
}

pub(crate) fn name_for(type_id: TypeId) -> Option<String> {
    registry().read().expect("custom registry poisoned").name_of.get(&type_id).cloned()
}

pub(crate) fn dump(name: &str, value: &dyn Any) -> Option<Value> {
    let reg = registry().read().expect("custom registry poisoned");
    reg.by_name.get(name).map(|e| (e.dump)(value))
}

pub(crate) fn load(name: &str, payload: &Value) -> Result<Box<dyn Any>, DataError> {
    let reg = registry().read().expect("custom registry poisoned");
    let entry = reg
        .by_name
        .get(name)
        .ok_or_else(|| DataError::UnregisteredCustom(name.to_owned()))?;
    (entry.load)(payload)
}

pub(crate) fn type_id_registered(type_id: TypeId) -> bool {
    registry()
        .read()
        .expect("custom registry poisoned")
        .name_of
        .contains_key(&type_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn pickled_round_trip() {
        register_pickled::<Point>("test.custom.point");
        let p = Point { x: 3, y: -4 };
        let dumped = dump("test.custom.point", &p).expect("registered");
        let loaded = load("test.custom.point", &dumped).expect("decodes");
        assert_eq!(*loaded.downcast::<Point>().unwrap(), p);
    }

    #[test]
    fn unregistered_name_errors() {
        let err = load("test.custom.does-not-exist", &Value::Null).unwrap_err();
        assert!(matches!(err, DataError::UnregisteredCustom(_)));
    }
}
