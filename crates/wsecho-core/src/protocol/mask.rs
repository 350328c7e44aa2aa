//! Payload masking (RFC 6455 §5.3).
//!
//! Every client-to-server payload is XOR-ed with a 4-byte key, cycling the
//! key by byte position.  XOR is its own inverse, so the same routine masks
//! and unmasks.

/// Length of a masking key in bytes.
pub const MASK_KEY_LEN: usize = 4;

/// Masks or unmasks `buf` in place with `key`.
///
/// Byte `i` is XOR-ed with `key[i % 4]`; no state carries between calls, so
/// a payload must be passed in one slice starting at position zero.
pub fn apply_mask(buf: &mut [u8], key: [u8; MASK_KEY_LEN]) {
    for (index, byte) in buf.iter_mut().enumerate() {
        *byte ^= key[index % MASK_KEY_LEN];
    }
}

/// Returns a masked copy of `payload`.
pub fn mask(payload: &[u8], key: [u8; MASK_KEY_LEN]) -> Vec<u8> {
    let mut out = payload.to_vec();
    apply_mask(&mut out, key);
    out
}

/// Returns an unmasked copy of `payload`.
pub fn unmask(payload: &[u8], key: [u8; MASK_KEY_LEN]) -> Vec<u8> {
    mask(payload, key)
}
