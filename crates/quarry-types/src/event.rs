//! Events and their identifier types.
//!
//! An event is an immutable, signed record. The store treats the content
//! and signature as opaque; verification belongs to the protocol layer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Kind, Tags, Timestamp};

/// Length of an event id (a 32-byte content hash).
pub const ID_LEN: usize = 32;

/// Length of an author public key.
pub const PUBKEY_LEN: usize = 32;

/// 32-byte event identifier.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EventId([u8; ID_LEN]);

impl EventId {
    /// Wraps raw id bytes.
    pub const fn new(bytes: [u8; ID_LEN]) -> Self {
        EventId(bytes)
    }

    /// Parses an id from a byte slice of exactly [`ID_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(EventId)
    }

    /// Parses an id from its 64-character hex form.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != 2 * ID_LEN {
            return None;
        }
        let bytes = hex::decode(s).ok()?;
        Self::from_slice(&bytes)
    }

    /// The raw id bytes.
    pub const fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    /// The first `n` bytes of the id, used for tombstone keys.
    pub fn truncated(&self, n: usize) -> &[u8] {
        &self.0[..n]
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// 32-byte author public key.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Pubkey([u8; PUBKEY_LEN]);

impl Pubkey {
    /// Wraps raw key bytes.
    pub const fn new(bytes: [u8; PUBKEY_LEN]) -> Self {
        Pubkey(bytes)
    }

    /// Parses a key from a byte slice of exactly [`PUBKEY_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Pubkey)
    }

    /// Parses a key from its 64-character hex form.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != 2 * PUBKEY_LEN {
            return None;
        }
        let bytes = hex::decode(s).ok()?;
        Self::from_slice(&bytes)
    }

    /// The raw key bytes.
    pub const fn as_bytes(&self) -> &[u8; PUBKEY_LEN] {
        &self.0
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A signed, immutable event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Content hash identifying the event.
    pub id: EventId,
    /// Author public key.
    pub pubkey: Pubkey,
    /// Creation time in whole seconds.
    pub created_at: Timestamp,
    /// Numeric kind.
    pub kind: Kind,
    /// Ordered tag list.
    pub tags: Tags,
    /// Opaque content.
    pub content: String,
    /// Signature over the canonical form; opaque to the store.
    pub sig: Vec<u8>,
}

impl Event {
    /// Builds an id-only placeholder for a record whose body lives in the
    /// secondary storage tier. The caller is expected to resolve it there.
    pub fn stub(id: EventId) -> Self {
        Event { id, ..Event::default() }
    }

    /// True for id-only placeholders produced by [`Event::stub`].
    pub fn is_stub(&self) -> bool {
        self.sig.is_empty() && self.pubkey == Pubkey::default()
    }

    /// The first "d" tag value, keying parameterized-replaceable events.
    /// Absent and empty are equivalent.
    pub fn d_tag(&self) -> &str {
        self.tags.first_value("d").unwrap_or("")
    }

    /// The expiration time, when the event carries a parseable
    /// "expiration" tag.
    pub fn expiration(&self) -> Option<Timestamp> {
        let raw = self.tags.first_value("expiration")?;
        raw.parse::<u64>().ok().map(Timestamp::from_secs)
    }
}
