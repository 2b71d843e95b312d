//! Little-endian 16-bit PCM serialization for delivered periods.

/// Serialize samples as little-endian 16-bit signed PCM (two bytes each).
pub fn encode_le_i16(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Inverse of [`encode_le_i16`]. A trailing odd byte is ignored.
pub fn decode_le_i16(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}
