use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::ValueConverter;
use crate::error::ConversionError;

/// Default converter: serde JSON text.
pub struct JsonConverter<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonConverter<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ValueConverter<T> for JsonConverter<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<String, ConversionError> {
        Ok(serde_json::to_string(value)?)
    }

    fn decode(&self, raw: &str) -> Result<T, ConversionError> {
        Ok(serde_json::from_str(raw)?)
    }

    fn emits_json(&self) -> bool {
        true
    }
}
