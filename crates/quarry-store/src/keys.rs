//! Index element codec.
//!
//! Keys are the concatenation of a one-byte family prefix and a fixed order
//! of elements; time-ordered families end in (timestamp, serial) so that
//! lexicographic byte order equals (value, time, serial) order. Each element
//! serializes to a byte sink, deserializes from a byte source (failing on
//! short input rather than reading out of bounds), and reports its encoded
//! length.

use quarry_types::{EventId, Pubkey, Timestamp, ID_LEN, PUBKEY_LEN};

/// Encoded length of a serial.
pub const SERIAL_LEN: usize = 8;

/// Encoded length of a timestamp.
pub const CREATED_AT_LEN: usize = 8;

/// Encoded length of a kind.
pub const KIND_LEN: usize = 2;

/// Length of a truncated tombstone id.
pub const TOMBSTONE_LEN: usize = 16;

/// An index key element: fixed serialization, defensive deserialization,
/// and a reported encoded length.
pub trait Element: Sized {
    /// Appends the encoded element to `out`.
    fn write(&self, out: &mut Vec<u8>);

    /// Reads one element from the front of `input`, advancing it. Returns
    /// `None` when too few bytes remain.
    fn read(input: &mut &[u8]) -> Option<Self>;

    /// Encoded length in bytes.
    fn encoded_len(&self) -> usize;
}

fn take<'a>(input: &mut &'a [u8], n: usize) -> Option<&'a [u8]> {
    if input.len() < n {
        return None;
    }
    let (head, rest) = input.split_at(n);
    *input = rest;
    Some(head)
}

/// Full 32-byte event id element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Id(pub EventId);

impl Element for Id {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.0.as_bytes());
    }

    fn read(input: &mut &[u8]) -> Option<Self> {
        let bytes = take(input, ID_LEN)?;
        EventId::from_slice(bytes).map(Id)
    }

    fn encoded_len(&self) -> usize {
        ID_LEN
    }
}

/// Full 32-byte author pubkey element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Author(pub Pubkey);

impl Element for Author {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.0.as_bytes());
    }

    fn read(input: &mut &[u8]) -> Option<Self> {
        let bytes = take(input, PUBKEY_LEN)?;
        Pubkey::from_slice(bytes).map(Author)
    }

    fn encoded_len(&self) -> usize {
        PUBKEY_LEN
    }
}

/// Two-byte big-endian kind element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kind(pub u16);

impl Element for Kind {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0.to_be_bytes());
    }

    fn read(input: &mut &[u8]) -> Option<Self> {
        let bytes = take(input, KIND_LEN)?;
        Some(Kind(u16::from_be_bytes([bytes[0], bytes[1]])))
    }

    fn encoded_len(&self) -> usize {
        KIND_LEN
    }
}

/// Eight-byte big-endian timestamp element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedAt(pub Timestamp);

impl Element for CreatedAt {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0.to_be_bytes());
    }

    fn read(input: &mut &[u8]) -> Option<Self> {
        let bytes = take(input, CREATED_AT_LEN)?;
        let arr: [u8; CREATED_AT_LEN] = bytes.try_into().ok()?;
        Some(CreatedAt(Timestamp::from_be_bytes(arr)))
    }

    fn encoded_len(&self) -> usize {
        CREATED_AT_LEN
    }
}

/// Eight-byte big-endian serial element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Serial(pub u64);

impl Element for Serial {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0.to_be_bytes());
    }

    fn read(input: &mut &[u8]) -> Option<Self> {
        let bytes = take(input, SERIAL_LEN)?;
        let arr: [u8; SERIAL_LEN] = bytes.try_into().ok()?;
        Some(Serial(u64::from_be_bytes(arr)))
    }

    fn encoded_len(&self) -> usize {
        SERIAL_LEN
    }
}

/// Arbitrary-length byte element (tag values, address identifiers). Carries
/// no length header: it is only ever the last variable component before the
/// fixed-width (timestamp, serial) tail, so decoding consumes the remainder
/// minus that tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arb(pub Vec<u8>);

impl Element for Arb {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }

    fn read(input: &mut &[u8]) -> Option<Self> {
        let tail = CREATED_AT_LEN + SERIAL_LEN;
        if input.len() < tail {
            return None;
        }
        let bytes = take(input, input.len() - tail)?;
        Some(Arb(bytes.to_vec()))
    }

    fn encoded_len(&self) -> usize {
        self.0.len()
    }
}

/// Decodes the serial from the last eight bytes of a key. Fails on
/// truncated keys.
pub fn serial_from_key(key: &[u8]) -> Option<u64> {
    if key.len() < SERIAL_LEN {
        return None;
    }
    let arr: [u8; SERIAL_LEN] = key[key.len() - SERIAL_LEN..].try_into().ok()?;
    Some(u64::from_be_bytes(arr))
}

/// Decodes the timestamp sitting in the eight bytes before the serial at
/// the tail of a key. Fails on truncated keys.
pub fn created_at_from_key(key: &[u8]) -> Option<Timestamp> {
    if key.len() < CREATED_AT_LEN + SERIAL_LEN {
        return None;
    }
    let start = key.len() - CREATED_AT_LEN - SERIAL_LEN;
    let arr: [u8; CREATED_AT_LEN] = key[start..start + CREATED_AT_LEN].try_into().ok()?;
    Some(Timestamp::from_be_bytes(arr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_elements_roundtrip() {
        let mut buf = Vec::new();
        Id(EventId::new([1u8; 32])).write(&mut buf);
        Author(Pubkey::new([2u8; 32])).write(&mut buf);
        Kind(30023).write(&mut buf);
        CreatedAt(Timestamp::from_secs(1000)).write(&mut buf);
        Serial(42).write(&mut buf);

        let mut input = buf.as_slice();
        assert_eq!(Id::read(&mut input), Some(Id(EventId::new([1u8; 32]))));
        assert_eq!(
            Author::read(&mut input),
            Some(Author(Pubkey::new([2u8; 32])))
        );
        assert_eq!(Kind::read(&mut input), Some(Kind(30023)));
        assert_eq!(
            CreatedAt::read(&mut input),
            Some(CreatedAt(Timestamp::from_secs(1000)))
        );
        assert_eq!(Serial::read(&mut input), Some(Serial(42)));
        assert!(input.is_empty());
    }

    #[test]
    fn truncated_input_fails_cleanly() {
        let mut short: &[u8] = &[0u8; 7];
        assert_eq!(Serial::read(&mut short), None);
        let mut short: &[u8] = &[0u8; 31];
        assert_eq!(Id::read(&mut short), None);
        let mut short: &[u8] = &[0u8; 1];
        assert_eq!(Kind::read(&mut short), None);
        let mut short: &[u8] = &[0u8; 15];
        assert_eq!(Arb::read(&mut short), None);
    }

    #[test]
    fn arb_consumes_up_to_tail() {
        let mut buf = Vec::new();
        Arb(b"topic".to_vec()).write(&mut buf);
        CreatedAt(Timestamp::from_secs(7)).write(&mut buf);
        Serial(9).write(&mut buf);

        let mut input = buf.as_slice();
        assert_eq!(Arb::read(&mut input), Some(Arb(b"topic".to_vec())));
        assert_eq!(input.len(), CREATED_AT_LEN + SERIAL_LEN);
    }

    #[test]
    fn tail_decodes_are_position_relative() {
        let mut key = vec![6u8];
        key.extend_from_slice(b"value");
        key.extend_from_slice(&Timestamp::from_secs(333).to_be_bytes());
        key.extend_from_slice(&77u64.to_be_bytes());

        assert_eq!(serial_from_key(&key), Some(77));
        assert_eq!(created_at_from_key(&key), Some(Timestamp::from_secs(333)));
        assert_eq!(serial_from_key(&[1, 2, 3]), None);
        assert_eq!(created_at_from_key(&[0u8; 15]), None);
    }
}
