//! Static field tables per entity type.
//!
//! A schema lists the cached fields of one namespace with their replication
//! policy, shape and optional converter tags. It is validated once and then
//! used to build cache objects for any identifier, with converters resolved
//! from the context's registry (JSON when no tag is registered).

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use serde::Serialize;
use serde::de::DeserializeOwned;
use strata_core::{DataKey, Identifier, ReplicationPolicy, TypeTag};

use crate::context::SyncContext;
use crate::error::SchemaError;
use crate::object::{ListCacheObject, MapCacheObject, ScalarCacheObject};

/// Shape of a cached field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Scalar,
    List,
    Map,
}

impl FieldKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::List => "list",
            Self::Map => "map",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a schema table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: &'static str,
    pub policy: ReplicationPolicy,
    pub kind: FieldKind,
    /// Registry tag for the value (or element) converter.
    pub value_tag: Option<TypeTag>,
    /// Registry tag for the map key converter.
    pub key_tag: Option<TypeTag>,
}

impl FieldSchema {
    pub const fn scalar(name: &'static str, policy: ReplicationPolicy) -> Self {
        Self::new(name, policy, FieldKind::Scalar)
    }

    pub const fn list(name: &'static str, policy: ReplicationPolicy) -> Self {
        Self::new(name, policy, FieldKind::List)
    }

    pub const fn map(name: &'static str, policy: ReplicationPolicy) -> Self {
        Self::new(name, policy, FieldKind::Map)
    }

    const fn new(name: &'static str, policy: ReplicationPolicy, kind: FieldKind) -> Self {
        Self {
            name,
            policy,
            kind,
            value_tag: None,
            key_tag: None,
        }
    }

    pub const fn with_value_tag(mut self, tag: TypeTag) -> Self {
        self.value_tag = Some(tag);
        self
    }

    pub const fn with_key_tag(mut self, tag: TypeTag) -> Self {
        self.key_tag = Some(tag);
        self
    }
}

/// Validated field table of one namespace.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    namespace: String,
    fields: Vec<FieldSchema>,
}

impl EntitySchema {
    pub fn builder(namespace: impl Into<String>) -> EntitySchemaBuilder {
        EntitySchemaBuilder {
            namespace: namespace.into(),
            fields: Vec::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn key(
        &self,
        field: &str,
        identifier: impl Into<Identifier>,
    ) -> Result<DataKey, SchemaError> {
        Ok(DataKey::new(self.namespace.as_str(), field, identifier)?)
    }

    pub fn scalar<V>(
        &self,
        ctx: &SyncContext,
        field: &str,
        identifier: impl Into<Identifier>,
    ) -> Result<ScalarCacheObject<V>, SchemaError>
    where
        V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let schema = self.lookup(field, FieldKind::Scalar)?;
        let converter = ctx.registry().resolve::<V>(tag_or_default::<V>(schema.value_tag));
        Ok(ctx.scalar(self.key(field, identifier)?, schema.policy, converter))
    }

    pub fn list<V>(
        &self,
        ctx: &SyncContext,
        field: &str,
        identifier: impl Into<Identifier>,
    ) -> Result<ListCacheObject<V>, SchemaError>
    where
        V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let schema = self.lookup(field, FieldKind::List)?;
        let element = ctx.registry().resolve::<V>(tag_or_default::<V>(schema.value_tag));
        Ok(ctx.list(self.key(field, identifier)?, schema.policy, element))
    }

    pub fn map<K, V>(
        &self,
        ctx: &SyncContext,
        field: &str,
        identifier: impl Into<Identifier>,
    ) -> Result<MapCacheObject<K, V>, SchemaError>
    where
        K: Eq + Hash + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
        V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let schema = self.lookup(field, FieldKind::Map)?;
        let key_converter = ctx.registry().resolve::<K>(tag_or_default::<K>(schema.key_tag));
        let value_converter = ctx.registry().resolve::<V>(tag_or_default::<V>(schema.value_tag));
        Ok(ctx.map(
            self.key(field, identifier)?,
            schema.policy,
            key_converter,
            value_converter,
        ))
    }

    fn lookup(&self, field: &str, kind: FieldKind) -> Result<&FieldSchema, SchemaError> {
        let schema = self.field(field).ok_or_else(|| SchemaError::UnknownField {
            namespace: self.namespace.clone(),
            field: field.to_string(),
        })?;
        if schema.kind != kind {
            return Err(SchemaError::KindMismatch {
                field: field.to_string(),
                expected: kind.as_str(),
                actual: schema.kind.as_str(),
            });
        }
        Ok(schema)
    }
}

/// Untagged fields resolve under the Rust type name, which is never
/// registered, so they fall back to JSON.
fn tag_or_default<T>(tag: Option<TypeTag>) -> TypeTag {
    tag.unwrap_or_else(|| TypeTag::new(std::any::type_name::<T>()))
}

pub struct EntitySchemaBuilder {
    namespace: String,
    fields: Vec<FieldSchema>,
}

impl EntitySchemaBuilder {
    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: &[FieldSchema]) -> Self {
        self.fields.extend_from_slice(fields);
        self
    }

    pub fn build(self) -> Result<EntitySchema, SchemaError> {
        if self.namespace.is_empty() {
            return Err(SchemaError::EmptyNamespace);
        }
        // Check key validation with a placeholder identifier
        DataKey::new(self.namespace.as_str(), "_", "_")?;

        let mut seen = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyFieldName(self.namespace.clone()));
            }
            DataKey::new(self.namespace.as_str(), field.name, "_")?;
            // Fields sharing a lower-cased name would share a document field
            if !seen.insert(field.name.to_lowercase()) {
                return Err(SchemaError::DuplicateField {
                    namespace: self.namespace.clone(),
                    field: field.name.to_string(),
                });
            }
        }

        Ok(EntitySchema {
            namespace: self.namespace,
            fields: self.fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::KeyError;

    const USER_FIELDS: &[FieldSchema] = &[
        FieldSchema::scalar("level", ReplicationPolicy::Both),
        FieldSchema::list("friends", ReplicationPolicy::Sync),
        FieldSchema::map("inventory", ReplicationPolicy::Persist),
        FieldSchema::scalar("session", ReplicationPolicy::None),
    ];

    fn user_schema() -> EntitySchema {
        EntitySchema::builder("user")
            .fields(USER_FIELDS)
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_valid_schema() {
        let schema = user_schema();
        assert_eq!(schema.namespace(), "user");
        assert_eq!(schema.fields().len(), 4);
        assert_eq!(schema.field("friends").unwrap().kind, FieldKind::List);
        assert!(schema.field("missing").is_none());
    }

    #[test]
    fn test_build_rejects_invalid_tables() {
        assert_eq!(
            EntitySchema::builder("").build().unwrap_err(),
            SchemaError::EmptyNamespace
        );
        assert_eq!(
            EntitySchema::builder("user")
                .field(FieldSchema::scalar("level", ReplicationPolicy::Both))
                .field(FieldSchema::scalar("Level", ReplicationPolicy::Sync))
                .build()
                .unwrap_err(),
            SchemaError::DuplicateField {
                namespace: "user".into(),
                field: "Level".into()
            }
        );
        assert_eq!(
            EntitySchema::builder("user")
                .field(FieldSchema::scalar("a.b", ReplicationPolicy::Both))
                .build()
                .unwrap_err(),
            SchemaError::InvalidKey(KeyError::ContainsSeparator("a.b".into()))
        );
        assert!(matches!(
            EntitySchema::builder("user")
                .field(FieldSchema::scalar("", ReplicationPolicy::Both))
                .build(),
            Err(SchemaError::EmptyFieldName(_))
        ));
    }

    #[tokio::test]
    async fn test_objects_from_schema() {
        let ctx = SyncContext::builder().build();
        let schema = user_schema();

        let level = schema.scalar::<u32>(&ctx, "level", "u1").unwrap();
        assert_eq!(level.key().cache_key(), "user.level.u1");
        assert_eq!(level.policy(), ReplicationPolicy::Both);

        let friends = schema.list::<String>(&ctx, "friends", "u1").unwrap();
        assert_eq!(friends.policy(), ReplicationPolicy::Sync);

        let inventory = schema.map::<String, u32>(&ctx, "inventory", "u1").unwrap();
        assert_eq!(inventory.key().location().field_name, "inventory");

        assert!(matches!(
            schema.list::<u32>(&ctx, "level", "u1"),
            Err(SchemaError::KindMismatch { .. })
        ));
        assert!(matches!(
            schema.scalar::<u32>(&ctx, "ghost", "u1"),
            Err(SchemaError::UnknownField { .. })
        ));

        ctx.shutdown().await;
    }
}
