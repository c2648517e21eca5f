//! Canonical address of a cached value.

use std::fmt;

use crate::error::KeyError;
use crate::identifier::Identifier;
use crate::slot::slot_for_key;

/// Location of a field inside the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreLocation {
    /// Lower-cased namespace.
    pub collection: String,
    /// String form of the identifier.
    pub document_key: String,
    /// Lower-cased field name.
    pub field_name: String,
}

/// Key descriptor for one field of one entity.
///
/// Derives the shared-cache key (`namespace.field.identifier`), the
/// document-store location and the routing slot. All derived values are
/// computed once at construction; the slot is a pure function of the cache
/// key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataKey {
    namespace: String,
    field: String,
    identifier: Identifier,
    cache_key: String,
    location: StoreLocation,
    slot: u16,
}

impl DataKey {
    /// Compute a key descriptor.
    ///
    /// Rejects empty components and namespaces or fields containing the `.`
    /// separator, since those would make distinct triples collide on the same
    /// cache key.
    pub fn new(
        namespace: impl Into<String>,
        field: impl Into<String>,
        identifier: impl Into<Identifier>,
    ) -> Result<Self, KeyError> {
        let namespace = namespace.into();
        let field = field.into();
        let identifier = identifier.into();

        if namespace.is_empty() {
            return Err(KeyError::EmptyNamespace);
        }
        if field.is_empty() {
            return Err(KeyError::EmptyField);
        }
        if identifier.is_empty() {
            return Err(KeyError::EmptyIdentifier);
        }
        for part in [&namespace, &field] {
            if part.contains('.') {
                return Err(KeyError::ContainsSeparator(part.clone()));
            }
        }

        let document_key = identifier.to_string();
        let cache_key = format!("{namespace}.{field}.{document_key}");
        let slot = slot_for_key(&cache_key);
        let location = StoreLocation {
            collection: namespace.to_lowercase(),
            document_key,
            field_name: field.to_lowercase(),
        };

        Ok(Self {
            namespace,
            field,
            identifier,
            cache_key,
            location,
            slot,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Shared-cache key: `namespace.field.identifier`.
    #[inline]
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    #[inline]
    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// Routing slot in `0..SLOT_COUNT`.
    #[inline]
    pub fn slot(&self) -> u16 {
        self.slot
    }
}

impl fmt::Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::SLOT_COUNT;
    use uuid::Uuid;

    #[test]
    fn test_derived_values() {
        let key = DataKey::new("User", "Level", "u1").unwrap();
        assert_eq!(key.cache_key(), "User.Level.u1");
        assert_eq!(key.location().collection, "user");
        assert_eq!(key.location().document_key, "u1");
        assert_eq!(key.location().field_name, "level");
        assert!((key.slot() as usize) < SLOT_COUNT);
    }

    #[test]
    fn test_slot_is_deterministic() {
        let id = Uuid::new_v4();
        let a = DataKey::new("user", "level", id).unwrap();
        let b = DataKey::new("user", "level", id).unwrap();
        assert_eq!(a.slot(), b.slot());
        assert_eq!(a.slot(), slot_for_key(&format!("user.level.{id}")));
    }

    #[test]
    fn test_rejects_invalid_components() {
        assert_eq!(DataKey::new("", "level", "u1"), Err(KeyError::EmptyNamespace));
        assert_eq!(DataKey::new("user", "", "u1"), Err(KeyError::EmptyField));
        assert_eq!(DataKey::new("user", "level", ""), Err(KeyError::EmptyIdentifier));
        assert_eq!(
            DataKey::new("user.v2", "level", "u1"),
            Err(KeyError::ContainsSeparator("user.v2".into()))
        );
    }
}
