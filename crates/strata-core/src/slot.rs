//! Routing slot calculation.
//!
//! Keys are mapped onto [`SLOT_COUNT`] slots with the CRC16 (XMODEM) checksum
//! used by Redis Cluster, including its `{hash tag}` rule: when a key contains
//! a non-empty `{...}` section only that section is hashed.

/// Number of routing slots. Unit of invalidation granularity.
pub const SLOT_COUNT: usize = 16384;

/// CRC16-XMODEM (poly 0x1021, init 0) as used by Redis Cluster.
pub fn crc16(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in bytes {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Compute the routing slot for a cache key.
pub fn slot_for_key(key: &str) -> u16 {
    let bytes = key.as_bytes();
    let hashed = hash_tag(bytes).unwrap_or(bytes);
    crc16(hashed) % SLOT_COUNT as u16
}

fn hash_tag(key: &[u8]) -> Option<&[u8]> {
    let open = key.iter().position(|&b| b == b'{')?;
    let close = key[open + 1..].iter().position(|&b| b == b'}')?;
    if close == 0 {
        return None;
    }
    Some(&key[open + 1..open + 1 + close])
}
