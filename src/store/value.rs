//! Stored value types

use bytes::Bytes;

/// A stored value: an opaque byte string or a fixed-width float vector.
///
/// Last write wins, including across kinds; callers pattern-match rather
/// than assume what a key holds.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Binary-safe byte string
    Str(Bytes),

    /// Sequence of 32-bit floats, searchable with VECSIM
    Vector(Vec<f32>),
}

/// Decode a wire payload into floats.
///
/// The payload must be a whole number of little-endian f32s; anything else
/// is a client error.
pub fn vector_from_bytes(raw: &[u8]) -> Option<Vec<f32>> {
    if raw.len() % 4 != 0 {
        return None;
    }
    Some(
        raw.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}

/// Inverse of [`vector_from_bytes`]; used when logging VECSET frames.
pub fn vector_to_bytes(vector: &[f32]) -> Bytes {
    let mut raw = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        raw.extend_from_slice(&v.to_le_bytes());
    }
    Bytes::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_bytes_roundtrip() {
        let floats = vec![1.0f32, -0.5, 3.25];
        let raw = vector_to_bytes(&floats);
        assert_eq!(raw.len(), 12);
        assert_eq!(vector_from_bytes(&raw).unwrap(), floats);
    }

    #[test]
    fn test_vector_from_ragged_bytes() {
        assert!(vector_from_bytes(&[0, 0, 0]).is_none());
        assert_eq!(vector_from_bytes(&[]).unwrap(), Vec::<f32>::new());
    }

}
