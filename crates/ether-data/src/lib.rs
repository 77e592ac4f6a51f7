//! `ether-data`: the typed AST and lossless JSON codec shared by every
//! `ether-runtime` and `ether-call` wire message.
//!
//! [`Value`] is the AST; [`jsonx::JsonX`] is the only place that knows how
//! to turn it into JSON text and back. [`custom`] holds the process-wide
//! registry a [`py::Native::Other`] payload is resolved through.

mod custom;
mod error;
mod jsonx;
mod py;
mod value;

pub use custom::{register, register_pickled};
pub use error::DataError;
pub use jsonx::JsonX;
pub use py::{is_registered, Native, Py};
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_native_through_jsonx() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Tag(String);

        register_pickled::<Tag>("test.e2e.tag");

        let native = Native::Map(vec![(
            Native::Str("label".into()),
            Native::Other(Box::new(Tag("hello".into()))),
        )]);
        let ast = Py::load(native).unwrap();
        let json = JsonX::dump(&ast).unwrap();
        let back_ast = JsonX::load(&json).unwrap();
        assert_eq!(ast, back_ast);

        let native_back = Py::dump(&back_ast).unwrap();
        let Native::Map(pairs) = native_back else {
            panic!("expected a map");
        };
        let (_, Native::Other(boxed)) = &pairs[0] else {
            panic!("expected a custom payload");
        };
        assert_eq!(boxed.downcast_ref::<Tag>().unwrap(), &Tag("hello".into()));
    }
}
