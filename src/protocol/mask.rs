//! Payload masking (RFC 6455 Section 5.3).
//!
//! Clients mask every frame they send; the server unmasks them on receipt.
//! Masking is an XOR with a 4-byte key, so the same call masks and unmasks.

/// XOR `data` in place with the repeating 4-byte `mask`.
///
/// Processes 4 bytes at a time, then the tail byte by byte.
///
/// # Example
///
/// ```
/// use statusws::protocol::apply_mask;
///
/// let mut data = b"Hello".to_vec();
/// apply_mask(&mut data, [0x37, 0xfa, 0x21, 0x3d]);
/// assert_eq!(data, [0x7f, 0x9f, 0x4d, 0x51, 0x58]);
/// ```
#[inline]
pub fn apply_mask(data: &mut [u8], mask: [u8; 4]) {
    let mask_u32 = u32::from_ne_bytes(mask);
    let mut chunks = data.chunks_exact_mut(4);

    for chunk in &mut chunks {
        let val = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        chunk.copy_from_slice(&(val ^ mask_u32).to_ne_bytes());
    }

    for (i, byte) in chunks.into_remainder().iter_mut().enumerate() {
        *byte ^= mask[i];
    }
}
