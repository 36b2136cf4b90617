//! Postcard serialization for stored record bodies.
//!
//! Event bodies are stored in postcard form; the configuration record uses
//! JSON and does not go through this module.

use serde::{de::DeserializeOwned, Serialize};
use snafu::Snafu;

/// Error type for codec operations.
#[derive(Debug, Snafu)]
pub enum CodecError {
    /// Encoding failed.
    #[snafu(display("encoding failed: {source}"))]
    Encode {
        /// The underlying postcard error.
        source: postcard::Error,
    },

    /// Decoding failed.
    #[snafu(display("decoding failed: {source}"))]
    Decode {
        /// The underlying postcard error.
        source: postcard::Error,
    },
}

/// Encodes a value to bytes.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(value).map_err(|source| CodecError::Encode { source })
}

/// Decodes a value from bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    postcard::from_bytes(bytes).map_err(|source| CodecError::Decode { source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Event, EventId, Kind, Pubkey, Tag, Tags, Timestamp};

    #[test]
    fn event_roundtrip() {
        let ev = Event {
            id: EventId::new([3u8; 32]),
            pubkey: Pubkey::new([4u8; 32]),
            created_at: Timestamp::from_secs(1234),
            kind: Kind::new(30023),
            tags: Tags::new(vec![Tag::new(["d", "post-1"])]),
            content: "hello".into(),
            sig: vec![5u8; 64],
        };
        let bytes = encode(&ev).expect("encode");
        let back: Event = decode(&bytes).expect("decode");
        assert_eq!(back, ev);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode::<Event>(&[0xff, 0x01]).is_err());
    }
}
