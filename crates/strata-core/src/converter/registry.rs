use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{JsonConverter, SharedConverter, TypeTag};
use crate::error::RegistryError;

/// Registry of custom converters keyed by type tag.
///
/// Converters are wired once during schema setup, so registering a second
/// converter for a tag is rejected instead of silently replacing the first.
#[derive(Default)]
pub struct ConverterRegistry {
    converters: DashMap<&'static str, Arc<dyn Any + Send + Sync>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: 'static>(
        &self,
        tag: TypeTag,
        converter: SharedConverter<T>,
    ) -> Result<(), RegistryError> {
        match self.converters.entry(tag.as_str()) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyRegistered(tag.to_string())),
            Entry::Vacant(slot) => {
                let erased: Arc<dyn Any + Send + Sync> = Arc::new(converter);
                slot.insert(erased);
                tracing::debug!(tag = %tag, "converter registered");
                Ok(())
            }
        }
    }

    /// Look up the converter registered for `tag`.
    ///
    /// Returns `None` when nothing is registered or when the registered
    /// converter is for a different value type.
    pub fn get<T: 'static>(&self, tag: TypeTag) -> Option<SharedConverter<T>> {
        let entry = self.converters.get(tag.as_str())?;
        let converter = entry.value().downcast_ref::<SharedConverter<T>>().cloned();
        if converter.is_none() {
            tracing::warn!(tag = %tag, "registered converter has a different value type");
        }
        converter
    }

    pub fn contains(&self, tag: TypeTag) -> bool {
        self.converters.contains_key(tag.as_str())
    }

    /// Registered converter for `tag`, or the JSON default.
    pub fn resolve<T>(&self, tag: TypeTag) -> SharedConverter<T>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        self.get(tag)
            .unwrap_or_else(|| Arc::new(JsonConverter::<T>::new()))
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<&str> = self.converters.iter().map(|e| *e.key()).collect();
        tags.sort_unstable();
        f.debug_struct("ConverterRegistry").field("tags", &tags).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ValueConverter;
    use crate::error::ConversionError;

    const POINT: TypeTag = TypeTag::new("point");

    #[derive(Debug, PartialEq)]
    struct Point(i32, i32);

    struct PointConverter;

    impl ValueConverter<Point> for PointConverter {
        fn encode(&self, value: &Point) -> Result<String, ConversionError> {
            Ok(format!("{}:{}", value.0, value.1))
        }

        fn decode(&self, raw: &str) -> Result<Point, ConversionError> {
            let (x, y) = raw
                .split_once(':')
                .ok_or_else(|| ConversionError::malformed(raw))?;
            let parse = |s: &str| s.parse().map_err(|_| ConversionError::malformed(raw));
            Ok(Point(parse(x)?, parse(y)?))
        }
    }

    #[test]
    fn test_register_and_get() {
        let registry = ConverterRegistry::new();
        registry
            .register::<Point>(POINT, Arc::new(PointConverter))
            .unwrap();

        assert!(registry.contains(POINT));
        let conv = registry.get::<Point>(POINT).unwrap();
        assert_eq!(conv.encode(&Point(3, -4)).unwrap(), "3:-4");
        assert_eq!(conv.decode("3:-4").unwrap(), Point(3, -4));
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let registry = ConverterRegistry::new();
        registry
            .register::<Point>(POINT, Arc::new(PointConverter))
            .unwrap();
        let err = registry
            .register::<Point>(POINT, Arc::new(PointConverter))
            .unwrap_err();
        assert_eq!(err, RegistryError::AlreadyRegistered("point".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_type_mismatch_returns_none() {
        let registry = ConverterRegistry::new();
        registry
            .register::<Point>(POINT, Arc::new(PointConverter))
            .unwrap();
        assert!(registry.get::<String>(POINT).is_none());
    }

    #[test]
    fn test_resolve_falls_back_to_json() {
        let registry = ConverterRegistry::new();
        let conv = registry.resolve::<Vec<u8>>(TypeTag::new("bytes"));
        assert_eq!(conv.encode(&vec![1, 2]).unwrap(), "[1,2]");
        assert!(conv.emits_json());
    }
}
