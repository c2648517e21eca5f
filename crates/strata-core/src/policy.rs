use serde::{Deserialize, Serialize};
use std::fmt;

/// Which tiers a cached field is replicated to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicationPolicy {
    /// Shared cache only, with invalidation broadcast.
    Sync,
    /// Document store only.
    Persist,
    /// Shared cache and document store, with invalidation broadcast.
    Both,
    /// Process-local memory only. Never touches the network.
    None,
}

impl ReplicationPolicy {
    /// Writes go to the shared cache and publish a sync message.
    #[inline]
    pub fn syncs(self) -> bool {
        matches!(self, Self::Sync | Self::Both)
    }

    /// Reads fall back to, and writes go to, the document store.
    #[inline]
    pub fn persists(self) -> bool {
        matches!(self, Self::Persist | Self::Both)
    }

    #[inline]
    pub fn is_local(self) -> bool {
        self == Self::None
    }
}

impl fmt::Display for ReplicationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => write!(f, "sync"),
            Self::Persist => write!(f, "persist"),
            Self::Both => write!(f, "both"),
            Self::None => write!(f, "none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers() {
        assert!(ReplicationPolicy::Sync.syncs());
        assert!(!ReplicationPolicy::Sync.persists());
        assert!(ReplicationPolicy::Persist.persists());
        assert!(!ReplicationPolicy::Persist.syncs());
        assert!(ReplicationPolicy::Both.syncs() && ReplicationPolicy::Both.persists());
        assert!(ReplicationPolicy::None.is_local());
        assert!(!ReplicationPolicy::None.syncs() && !ReplicationPolicy::None.persists());
    }

    #[test]
    fn test_serde_names() {
        let policy: ReplicationPolicy = serde_json::from_str("\"both\"").unwrap();
        assert_eq!(policy, ReplicationPolicy::Both);
        assert_eq!(serde_json::to_string(&ReplicationPolicy::None).unwrap(), "\"none\"");
    }
}
