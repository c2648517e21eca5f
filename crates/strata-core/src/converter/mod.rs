//! Value converters: mapping between in-memory values and their wire strings.
//!
//! Every tier stores a field as one string. A converter turns a value into
//! that string and back. The empty string is reserved for "no value" and is
//! treated as a delete by the write path.

mod collection;
mod entity;
mod json;
mod registry;
mod tagged;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ConversionError;

pub use collection::{ListConverter, MapConverter, OptionalConverter};
pub use entity::{Entity, EntityConverter};
pub use json::JsonConverter;
pub use registry::ConverterRegistry;
pub use tagged::TaggedConverter;

/// Bidirectional mapping between `T` and its wire representation.
pub trait ValueConverter<T>: Send + Sync {
    /// Encode a value. An empty string means "no value".
    fn encode(&self, value: &T) -> Result<String, ConversionError>;

    /// Decode a wire string. Malformed input is an error.
    fn decode(&self, raw: &str) -> Result<T, ConversionError>;

    /// Whether [`encode`](Self::encode) emits JSON text that can be embedded
    /// as-is inside an enclosing JSON document.
    fn emits_json(&self) -> bool {
        false
    }
}

/// Shared handle to a converter.
pub type SharedConverter<T> = Arc<dyn ValueConverter<T>>;

/// Stable name of a type, used to key the converter registry and to tag
/// heterogeneous collection elements on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag(&'static str);

impl TypeTag {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Values that know their runtime type tag.
pub trait Tagged {
    fn type_tag(&self) -> TypeTag;
}

/// Encode an element as a JSON value for embedding in a collection document.
pub(crate) fn embed<T>(
    converter: &dyn ValueConverter<T>,
    value: &T,
) -> Result<Value, ConversionError> {
    let token = converter.encode(value)?;
    if converter.emits_json() {
        Ok(serde_json::from_str(&token)?)
    } else {
        Ok(Value::String(token))
    }
}

/// Inverse of [`embed`].
pub(crate) fn extract<T>(
    converter: &dyn ValueConverter<T>,
    value: Value,
) -> Result<T, ConversionError> {
    if converter.emits_json() {
        return converter.decode(&value.to_string());
    }
    match value {
        Value::String(token) => converter.decode(&token),
        other => Err(ConversionError::malformed(format!(
            "expected a string token, found {other}"
        ))),
    }
}
