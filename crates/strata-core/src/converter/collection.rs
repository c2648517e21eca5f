//! Converters for optional values, lists and maps built from element converters.
//!
//! Collections are written as JSON documents. Elements whose converter emits
//! JSON are embedded directly (`[1,2,3]`); elements with a custom converter,
//! such as entity references, are embedded as string tokens (`["u1","u2"]`).
//! Empty collections encode to the empty string.

use std::collections::HashMap;
use std::hash::Hash;

use serde_json::{Map, Value};

use super::{SharedConverter, ValueConverter, embed, extract};
use crate::error::ConversionError;

/// Lifts an element converter to `Option<V>`; `None` encodes as "no value".
pub struct OptionalConverter<V> {
    inner: SharedConverter<V>,
}

impl<V> OptionalConverter<V> {
    pub fn new(inner: SharedConverter<V>) -> Self {
        Self { inner }
    }
}

impl<V> ValueConverter<Option<V>> for OptionalConverter<V> {
    fn encode(&self, value: &Option<V>) -> Result<String, ConversionError> {
        match value {
            Some(v) => self.inner.encode(v),
            None => Ok(String::new()),
        }
    }

    fn decode(&self, raw: &str) -> Result<Option<V>, ConversionError> {
        self.inner.decode(raw).map(Some)
    }
}

/// List converter driven by an element converter.
pub struct ListConverter<V> {
    element: SharedConverter<V>,
}

impl<V> ListConverter<V> {
    pub fn new(element: SharedConverter<V>) -> Self {
        Self { element }
    }
}

impl<V> ValueConverter<Vec<V>> for ListConverter<V> {
    fn encode(&self, list: &Vec<V>) -> Result<String, ConversionError> {
        if list.is_empty() {
            return Ok(String::new());
        }
        let tokens = list
            .iter()
            .map(|element| embed(self.element.as_ref(), element))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(serde_json::to_string(&tokens)?)
    }

    fn decode(&self, raw: &str) -> Result<Vec<V>, ConversionError> {
        let tokens: Vec<Value> = serde_json::from_str(raw)?;
        tokens
            .into_iter()
            .map(|token| extract(self.element.as_ref(), token))
            .collect()
    }

    fn emits_json(&self) -> bool {
        true
    }
}

/// Map converter driven by key and value converters.
///
/// JSON object keys are strings, so a key whose converter emits a JSON string
/// is written unquoted and any other JSON key (numbers, booleans) is written
/// as its literal text.
pub struct MapConverter<K, V> {
    key: SharedConverter<K>,
    value: SharedConverter<V>,
}

impl<K, V> MapConverter<K, V> {
    pub fn new(key: SharedConverter<K>, value: SharedConverter<V>) -> Self {
        Self { key, value }
    }

    fn encode_key(&self, key: &K) -> Result<String, ConversionError> {
        let token = self.key.encode(key)?;
        if !self.key.emits_json() {
            return Ok(token);
        }
        match serde_json::from_str::<Value>(&token)? {
            Value::String(s) => Ok(s),
            Value::Number(_) | Value::Bool(_) => Ok(token),
            other => Err(ConversionError::malformed(format!(
                "map key must encode to a string, number or bool, found {other}"
            ))),
        }
    }

    fn decode_key(&self, raw: &str) -> Result<K, ConversionError> {
        if !self.key.emits_json() {
            return self.key.decode(raw);
        }
        let quoted = Value::String(raw.to_string()).to_string();
        self.key.decode(&quoted).or_else(|_| self.key.decode(raw))
    }
}

impl<K, V> ValueConverter<HashMap<K, V>> for MapConverter<K, V>
where
    K: Eq + Hash,
{
    fn encode(&self, map: &HashMap<K, V>) -> Result<String, ConversionError> {
        if map.is_empty() {
            return Ok(String::new());
        }
        let mut object = Map::with_capacity(map.len());
        for (k, v) in map {
            object.insert(self.encode_key(k)?, embed(self.value.as_ref(), v)?);
        }
        Ok(serde_json::to_string(&object)?)
    }

    fn decode(&self, raw: &str) -> Result<HashMap<K, V>, ConversionError> {
        let object: Map<String, Value> = serde_json::from_str(raw)?;
        let mut map = HashMap::with_capacity(object.len());
        for (k, v) in object {
            map.insert(self.decode_key(&k)?, extract(self.value.as_ref(), v)?);
        }
        Ok(map)
    }

    fn emits_json(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::JsonConverter;
    use std::sync::Arc;

    /// Stores a `u32` as its hex text, standing in for a custom converter.
    struct HexConverter;

    impl ValueConverter<u32> for HexConverter {
        fn encode(&self, value: &u32) -> Result<String, ConversionError> {
            Ok(format!("{value:x}"))
        }

        fn decode(&self, raw: &str) -> Result<u32, ConversionError> {
            u32::from_str_radix(raw, 16).map_err(|e| ConversionError::malformed(e.to_string()))
        }
    }

    fn json<T>() -> SharedConverter<T>
    where
        T: serde::Serialize + serde::de::DeserializeOwned + 'static,
    {
        Arc::new(JsonConverter::<T>::new())
    }

    #[test]
    fn test_optional() {
        let conv = OptionalConverter::new(json::<i64>());
        assert_eq!(conv.encode(&None).unwrap(), "");
        assert_eq!(conv.encode(&Some(5)).unwrap(), "5");
        assert_eq!(conv.decode("5").unwrap(), Some(5));
    }

    #[test]
    fn test_list_with_json_elements() {
        let conv = ListConverter::new(json::<String>());
        let list = vec!["a".to_string(), "b:c".to_string()];
        let raw = conv.encode(&list).unwrap();
        assert_eq!(raw, r#"["a","b:c"]"#);
        assert_eq!(conv.decode(&raw).unwrap(), list);
    }

    #[test]
    fn test_list_with_custom_elements_uses_tokens() {
        let conv = ListConverter::new(Arc::new(HexConverter) as SharedConverter<u32>);
        let raw = conv.encode(&vec![255, 16]).unwrap();
        assert_eq!(raw, r#"["ff","10"]"#);
        assert_eq!(conv.decode(&raw).unwrap(), vec![255, 16]);
    }

    #[test]
    fn test_empty_collections_encode_to_no_value() {
        let list = ListConverter::new(json::<i64>());
        assert_eq!(list.encode(&Vec::new()).unwrap(), "");

        let map = MapConverter::new(json::<String>(), json::<i64>());
        assert_eq!(map.encode(&HashMap::new()).unwrap(), "");
    }

    #[test]
    fn test_map_with_string_keys() {
        let conv = MapConverter::new(json::<String>(), json::<i64>());
        let mut map = HashMap::new();
        map.insert("gold".to_string(), 10);
        map.insert("42".to_string(), 3);
        let raw = conv.encode(&map).unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&raw).unwrap(),
            serde_json::json!({"gold": 10, "42": 3})
        );
        assert_eq!(conv.decode(&raw).unwrap(), map);
    }

    #[test]
    fn test_map_with_numeric_keys_and_custom_values() {
        let conv = MapConverter::new(json::<u16>(), Arc::new(HexConverter) as SharedConverter<u32>);
        let mut map = HashMap::new();
        map.insert(1u16, 255u32);
        map.insert(2u16, 4096u32);
        let raw = conv.encode(&map).unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&raw).unwrap(),
            serde_json::json!({"1": "ff", "2": "1000"})
        );
        assert_eq!(conv.decode(&raw).unwrap(), map);
    }

    #[test]
    fn test_malformed_collections() {
        let conv = ListConverter::new(json::<i64>());
        assert!(conv.decode("{not json").is_err());
        assert!(conv.decode(r#"["x"]"#).is_err());

        let custom = ListConverter::new(Arc::new(HexConverter) as SharedConverter<u32>);
        assert!(custom.decode("[1]").is_err());
    }
}
