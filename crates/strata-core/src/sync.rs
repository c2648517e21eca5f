//! Wire format of the cross-instance invalidation message.
//!
//! ```text
//! +---------------------------+--------------+
//! | sender instance id (16 B) | slot (u16 BE)|
//! +---------------------------+--------------+
//! ```

use uuid::Uuid;

use crate::error::SyncMessageError;
use crate::slot::SLOT_COUNT;

/// Encoded length of a [`SyncMessage`].
pub const SYNC_MESSAGE_LEN: usize = 18;

/// Notification that a routing slot changed on another instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyncMessage {
    pub sender: Uuid,
    pub slot: u16,
}

impl SyncMessage {
    pub fn new(sender: Uuid, slot: u16) -> Self {
        Self { sender, slot }
    }

    pub fn encode(&self) -> [u8; SYNC_MESSAGE_LEN] {
        let mut buf = [0u8; SYNC_MESSAGE_LEN];
        buf[..16].copy_from_slice(self.sender.as_bytes());
        buf[16..].copy_from_slice(&self.slot.to_be_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SyncMessageError> {
        if bytes.len() != SYNC_MESSAGE_LEN {
            return Err(SyncMessageError::InvalidLength {
                expected: SYNC_MESSAGE_LEN,
                actual: bytes.len(),
            });
        }

        let mut id = [0u8; 16];
        id.copy_from_slice(&bytes[..16]);
        let slot = u16::from_be_bytes([bytes[16], bytes[17]]);
        if slot as usize >= SLOT_COUNT {
            return Err(SyncMessageError::SlotOutOfRange(slot));
        }

        Ok(Self {
            sender: Uuid::from_bytes(id),
            slot,
        })
    }
}
