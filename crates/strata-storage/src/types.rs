//! Document types exchanged with the document store.

use serde_json::{Map, Value};

/// Field holding the document key, used as the lookup filter.
pub const DOCUMENT_KEY_FIELD: &str = "_id";

/// Field mirroring the document key on inserted documents.
pub const IDENTIFIER_FIELD: &str = "identifier";

/// A stored document: a flat JSON object.
pub type Document = Map<String, Value>;

/// Single-field update applied to an existing document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    /// `$set` the field to an encoded value.
    Set { field: String, value: String },
    /// `$unset` the field.
    Unset { field: String },
}

impl FieldUpdate {
    pub fn set(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Set {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn unset(field: impl Into<String>) -> Self {
        Self::Unset {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Self::Set { field, .. } | Self::Unset { field } => field,
        }
    }

    /// Apply this update to a document in place.
    pub fn apply(&self, document: &mut Document) {
        match self {
            Self::Set { field, value } => {
                document.insert(field.clone(), Value::String(value.clone()));
            }
            Self::Unset { field } => {
                document.remove(field);
            }
        }
    }
}

/// Build the document inserted when a field is first written.
pub fn new_document(document_key: &str, field: &str, value: &str) -> Document {
    let mut document = Document::new();
    document.insert(
        DOCUMENT_KEY_FIELD.to_string(),
        Value::String(document_key.to_string()),
    );
    document.insert(
        IDENTIFIER_FIELD.to_string(),
        Value::String(document_key.to_string()),
    );
    document.insert(field.to_string(), Value::String(value.to_string()));
    document
}

/// Document key of a document, if present.
pub fn document_key(document: &Document) -> Option<&str> {
    document.get(DOCUMENT_KEY_FIELD).and_then(Value::as_str)
}

/// Encoded value of `field`, if present and a string.
pub fn field_value<'a>(document: &'a Document, field: &str) -> Option<&'a str> {
    document.get(field).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_carries_identifier() {
        let doc = new_document("u1", "level", "42");
        assert_eq!(document_key(&doc), Some("u1"));
        assert_eq!(field_value(&doc, IDENTIFIER_FIELD), Some("u1"));
        assert_eq!(field_value(&doc, "level"), Some("42"));
    }

    #[test]
    fn test_apply_updates() {
        let mut doc = new_document("u1", "level", "42");
        FieldUpdate::set("gold", "10").apply(&mut doc);
        assert_eq!(field_value(&doc, "gold"), Some("10"));

        FieldUpdate::unset("level").apply(&mut doc);
        assert_eq!(field_value(&doc, "level"), None);
        assert_eq!(document_key(&doc), Some("u1"));
    }
}
