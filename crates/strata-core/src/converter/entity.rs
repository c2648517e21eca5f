use std::sync::Arc;

use super::ValueConverter;
use crate::error::ConversionError;
use crate::identifier::Identifier;

/// A cached entity that can be referenced from other entities' fields.
pub trait Entity {
    fn identifier(&self) -> Identifier;
}

type Resolver<E> = dyn Fn(&Identifier) -> Option<E> + Send + Sync;

/// Stores an entity reference as its bare identifier.
///
/// Decoding hands the identifier to a resolver, which materializes (or looks
/// up) the referenced entity. The entity's own fields are not read here.
pub struct EntityConverter<E> {
    resolver: Arc<Resolver<E>>,
}

impl<E> EntityConverter<E> {
    pub fn new<F>(resolver: F) -> Self
    where
        F: Fn(&Identifier) -> Option<E> + Send + Sync + 'static,
    {
        Self {
            resolver: Arc::new(resolver),
        }
    }
}

impl<E: Entity> ValueConverter<E> for EntityConverter<E> {
    fn encode(&self, value: &E) -> Result<String, ConversionError> {
        Ok(value.identifier().to_string())
    }

    fn decode(&self, raw: &str) -> Result<E, ConversionError> {
        if raw.is_empty() {
            return Err(ConversionError::malformed("empty entity identifier"));
        }
        let identifier = Identifier::parse(raw);
        (self.resolver)(&identifier)
            .ok_or_else(|| ConversionError::UnresolvedReference(raw.to_string()))
    }
}
