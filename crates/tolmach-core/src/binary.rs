//! Binary envelope for ahead-of-time generator artifacts.
//!
//! Layout: 4-byte magic, little-endian format version (u16), little-endian
//! crc32 of the payload (u32), then the postcard-encoded payload. Loading
//! validates all three before decoding.

use serde::Serialize;
use serde::de::DeserializeOwned;

pub const MAGIC: [u8; 4] = *b"TLMC";
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact truncated: {0} bytes is shorter than the header")]
    Truncated(usize),

    #[error("bad artifact magic")]
    BadMagic,

    #[error("unsupported artifact format version {found} (expected {FORMAT_VERSION})")]
    UnsupportedVersion { found: u16 },

    #[error("artifact checksum mismatch")]
    ChecksumMismatch,

    #[error("artifact payload malformed: {0}")]
    Decode(#[from] postcard::Error),
}

/// Wrap a serializable value in the artifact envelope.
pub fn encode<T: Serialize>(value: &T) -> Vec<u8> {
    let payload = postcard::to_allocvec(value).expect("artifact serialization should not fail");
    let checksum = crc32fast::hash(&payload);

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&checksum.to_le_bytes());
    out.extend_from_slice(&payload);
    out
}

/// Validate the envelope and decode the payload.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ArtifactError> {
    if bytes.len() < HEADER_LEN {
        return Err(ArtifactError::Truncated(bytes.len()));
    }
    if bytes[0..4] != MAGIC {
        return Err(ArtifactError::BadMagic);
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != FORMAT_VERSION {
        return Err(ArtifactError::UnsupportedVersion { found: version });
    }

    let expected = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
    let payload = &bytes[HEADER_LEN..];
    if crc32fast::hash(payload) != expected {
        return Err(ArtifactError::ChecksumMismatch);
    }

    Ok(postcard::from_bytes(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let value = vec!["model".to_string(), "if".to_string()];
        let bytes = encode(&value);
        let back: Vec<String> = decode(&bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn corrupted_payload_is_rejected() {
        let mut bytes = encode(&42u32);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(matches!(
            decode::<u32>(&bytes),
            Err(ArtifactError::ChecksumMismatch)
        ));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut bytes = encode(&42u32);
        bytes[0] = b'X';
        assert!(matches!(decode::<u32>(&bytes), Err(ArtifactError::BadMagic)));
    }

    #[test]
    fn future_version_is_rejected() {
        let mut bytes = encode(&42u32);
        bytes[4] = 0xff;
        assert!(matches!(
            decode::<u32>(&bytes),
            Err(ArtifactError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn truncated_input_is_rejected() {
        assert!(matches!(
            decode::<u32>(&[0; 4]),
            Err(ArtifactError::Truncated(4))
        ));
    }
}
