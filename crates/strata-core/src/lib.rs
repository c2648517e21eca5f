//! # strata-core
//!
//! Pure building blocks of the Strata tiered cache: key descriptors and
//! routing slots, replication policies, value converters and their registry,
//! the invalidation clock and the sync message codec. Nothing in this crate
//! performs I/O.

pub mod clock;
pub mod converter;
pub mod error;
pub mod identifier;
pub mod key;
pub mod policy;
pub mod slot;
pub mod sync;
pub mod time;

pub use clock::InvalidationClock;
pub use converter::{
    ConverterRegistry, Entity, EntityConverter, JsonConverter, ListConverter, MapConverter,
    OptionalConverter, SharedConverter, Tagged, TaggedConverter, TypeTag, ValueConverter,
};
pub use error::{ConversionError, CoreError, KeyError, RegistryError, Result, SyncMessageError};
pub use identifier::Identifier;
pub use key::{DataKey, StoreLocation};
pub use policy::ReplicationPolicy;
pub use slot::{SLOT_COUNT, slot_for_key};
pub use sync::{SYNC_MESSAGE_LEN, SyncMessage};
pub use time::{now_millis, refresh_stamp};
