use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identity of the entity that owns a cached field.
///
/// Opaque to the cache layer apart from its string form, which is used in
/// cache keys and as the document key. Enum-like identifiers are carried as
/// [`Identifier::Name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Uuid(Uuid),
    Name(String),
}

impl Identifier {
    pub fn is_empty(&self) -> bool {
        match self {
            Identifier::Uuid(_) => false,
            Identifier::Name(name) => name.is_empty(),
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Identifier::Uuid(id) => Some(*id),
            Identifier::Name(_) => None,
        }
    }

    /// Parse the string form back into an identifier.
    ///
    /// Strings that are valid UUIDs become [`Identifier::Uuid`], everything
    /// else is kept as a name.
    pub fn parse(s: &str) -> Self {
        match Uuid::parse_str(s) {
            Ok(id) => Identifier::Uuid(id),
            Err(_) => Identifier::Name(s.to_string()),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Uuid(id) => write!(f, "{id}"),
            Identifier::Name(name) => f.write_str(name),
        }
    }
}

impl FromStr for Identifier {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Identifier::parse(s))
    }
}

impl From<Uuid> for Identifier {
    fn from(id: Uuid) -> Self {
        Identifier::Uuid(id)
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Identifier::Name(name)
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier::Name(name.to_string())
    }
}
