//! RC4 stream cipher
//!
//! The symmetric cipher used by the standard security handler (V=2, RC4
//! with 40 to 128 bit keys). Implemented here because no maintained crate
//! ships it; it survives only for PDF compatibility, not as a recommended
//! cipher.

/// Encrypt or decrypt a buffer with the given key. RC4 is symmetric, so
/// one function covers both directions.
pub(crate) fn rc4_apply(key: &[u8], data: &[u8]) -> Vec<u8> {
    debug_assert!(!key.is_empty());

    // Key scheduling
    let mut s = [0u8; 256];
    for (i, slot) in s.iter_mut().enumerate() {
        *slot = i as u8;
    }
    let mut j = 0u8;
    for i in 0..256 {
        j = j
            .wrapping_add(s[i])
            .wrapping_add(key[i % key.len()]);
        s.swap(i, j as usize);
    }

    // Keystream generation
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0u8;
    let mut j = 0u8;
    for &byte in data {
        i = i.wrapping_add(1);
        j = j.wrapping_add(s[i as usize]);
        s.swap(i as usize, j as usize);
        let k = s[(s[i as usize].wrapping_add(s[j as usize])) as usize];
        out.push(byte ^ k);
    }
    out
}
