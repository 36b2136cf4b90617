//! Key families and composed key builders.
//!
//! Every key begins with a one-byte family prefix. Big-endian encoding of
//! all multi-byte integers keeps lexicographic order equal to numeric
//! order, so a reverse range scan over a family prefix walks newest-first.
//!
//! | Family        | Key after prefix                                      |
//! |---------------|-------------------------------------------------------|
//! | Event         | serial(8), value = body or 32-byte tier-2 stub        |
//! | CreatedAt     | createdAt(8) ++ serial(8), scrape queries             |
//! | Id            | id(32) ++ serial(8)                                   |
//! | Kind          | kind(2) ++ createdAt(8) ++ serial(8)                  |
//! | Pubkey        | pubkey(32) ++ createdAt(8) ++ serial(8)               |
//! | PubkeyKind    | pubkey(32) ++ kind(2) ++ createdAt(8) ++ serial(8)    |
//! | Tag           | rawValue ++ createdAt(8) ++ serial(8)                 |
//! | Tag32         | pubkeyBytes(32) ++ serial(8)                          |
//! | TagAddr       | kind(2) ++ pubkey(32) ++ ident ++ createdAt(8) ++ serial(8) |
//! | Counter       | serial(8), value = last-access timestamp(8)           |
//! | FullIndex     | serial(8) ++ id(32) ++ pubkey(32) ++ createdAt(8)     |
//! | Tombstone     | truncatedId(16)                                       |
//! | Configuration | (singleton)                                           |
//! | SerialMeta    | (singleton, serial lease)                             |

use quarry_types::{EventId, Pubkey, Timestamp};

use crate::keys::{self, Element};

/// One-byte key family prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Prefix {
    /// Primary event records.
    Event = 0,
    /// Time-only index, serves scrape queries.
    CreatedAt = 1,
    /// By-id index.
    Id = 2,
    /// By-kind index.
    Kind = 3,
    /// By-pubkey index.
    Pubkey = 4,
    /// By-pubkey-and-kind index.
    PubkeyKind = 5,
    /// Generic UTF-8 tag index.
    Tag = 6,
    /// Pubkey-shaped tag index.
    Tag32 = 7,
    /// Address (`kind:pubkey:identifier`) tag index.
    TagAddr = 8,
    /// Last-access counters, advisory, used by tier eviction.
    Counter = 9,
    /// Serial-to-summary index, readable without the event body.
    FullIndex = 10,
    /// Permanent deletion markers.
    Tombstone = 11,
    /// The singleton configuration record.
    Configuration = 12,
    /// The serial allocator's persisted lease.
    SerialMeta = 13,
}

/// Every family, for whole-store sweeps.
pub const ALL_PREFIXES: [Prefix; 14] = [
    Prefix::Event,
    Prefix::CreatedAt,
    Prefix::Id,
    Prefix::Kind,
    Prefix::Pubkey,
    Prefix::PubkeyKind,
    Prefix::Tag,
    Prefix::Tag32,
    Prefix::TagAddr,
    Prefix::Counter,
    Prefix::FullIndex,
    Prefix::Tombstone,
    Prefix::Configuration,
    Prefix::SerialMeta,
];

impl Prefix {
    /// The prefix byte.
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// A key holding only the prefix byte.
    pub fn key(self) -> Vec<u8> {
        vec![self.byte()]
    }

    fn compose(self, elements: &[&dyn DynElement]) -> Vec<u8> {
        let len = 1 + elements.iter().map(|e| e.len()).sum::<usize>();
        let mut key = Vec::with_capacity(len);
        key.push(self.byte());
        for e in elements {
            e.append(&mut key);
        }
        key
    }
}

// Object-safe shim over Element for heterogeneous composition.
trait DynElement {
    fn append(&self, out: &mut Vec<u8>);
    fn len(&self) -> usize;
}

impl<T: Element> DynElement for T {
    fn append(&self, out: &mut Vec<u8>) {
        self.write(out)
    }

    fn len(&self) -> usize {
        self.encoded_len()
    }
}

/// Primary record key for a serial.
pub fn event_key(serial: u64) -> Vec<u8> {
    Prefix::Event.compose(&[&keys::Serial(serial)])
}

/// By-id index key.
pub fn id_key(id: EventId, serial: u64) -> Vec<u8> {
    Prefix::Id.compose(&[&keys::Id(id), &keys::Serial(serial)])
}

/// Scan prefix over every serial of one id.
pub fn id_prefix(id: EventId) -> Vec<u8> {
    Prefix::Id.compose(&[&keys::Id(id)])
}

/// By-pubkey index key.
pub fn pubkey_key(pubkey: Pubkey, created_at: Timestamp, serial: u64) -> Vec<u8> {
    Prefix::Pubkey.compose(&[
        &keys::Author(pubkey),
        &keys::CreatedAt(created_at),
        &keys::Serial(serial),
    ])
}

/// Scan prefix over one author's by-pubkey entries.
pub fn pubkey_prefix(pubkey: Pubkey) -> Vec<u8> {
    Prefix::Pubkey.compose(&[&keys::Author(pubkey)])
}

/// By-kind index key.
pub fn kind_key(kind: u16, created_at: Timestamp, serial: u64) -> Vec<u8> {
    Prefix::Kind.compose(&[
        &keys::Kind(kind),
        &keys::CreatedAt(created_at),
        &keys::Serial(serial),
    ])
}

/// Scan prefix over one kind's entries.
pub fn kind_prefix(kind: u16) -> Vec<u8> {
    Prefix::Kind.compose(&[&keys::Kind(kind)])
}

/// By-pubkey-and-kind index key.
pub fn pubkey_kind_key(pubkey: Pubkey, kind: u16, created_at: Timestamp, serial: u64) -> Vec<u8> {
    Prefix::PubkeyKind.compose(&[
        &keys::Author(pubkey),
        &keys::Kind(kind),
        &keys::CreatedAt(created_at),
        &keys::Serial(serial),
    ])
}

/// Scan prefix over one (author, kind) pair.
pub fn pubkey_kind_prefix(pubkey: Pubkey, kind: u16) -> Vec<u8> {
    Prefix::PubkeyKind.compose(&[&keys::Author(pubkey), &keys::Kind(kind)])
}

/// Time-only index key.
pub fn created_at_key(created_at: Timestamp, serial: u64) -> Vec<u8> {
    Prefix::CreatedAt.compose(&[&keys::CreatedAt(created_at), &keys::Serial(serial)])
}

/// Generic tag index key.
pub fn tag_key(value: &[u8], created_at: Timestamp, serial: u64) -> Vec<u8> {
    Prefix::Tag.compose(&[
        &keys::Arb(value.to_vec()),
        &keys::CreatedAt(created_at),
        &keys::Serial(serial),
    ])
}

/// Scan prefix over a generic tag value.
pub fn tag_prefix(value: &[u8]) -> Vec<u8> {
    Prefix::Tag.compose(&[&keys::Arb(value.to_vec())])
}

/// Pubkey-shaped tag index key. Carries no timestamp component.
pub fn tag32_key(pubkey: Pubkey, serial: u64) -> Vec<u8> {
    Prefix::Tag32.compose(&[&keys::Author(pubkey), &keys::Serial(serial)])
}

/// Scan prefix over a pubkey-shaped tag value.
pub fn tag32_prefix(pubkey: Pubkey) -> Vec<u8> {
    Prefix::Tag32.compose(&[&keys::Author(pubkey)])
}

/// Address tag index key.
pub fn tag_addr_key(
    kind: u16,
    pubkey: Pubkey,
    identifier: &[u8],
    created_at: Timestamp,
    serial: u64,
) -> Vec<u8> {
    Prefix::TagAddr.compose(&[
        &keys::Kind(kind),
        &keys::Author(pubkey),
        &keys::Arb(identifier.to_vec()),
        &keys::CreatedAt(created_at),
        &keys::Serial(serial),
    ])
}

/// Scan prefix over an address tag value.
pub fn tag_addr_prefix(kind: u16, pubkey: Pubkey, identifier: &[u8]) -> Vec<u8> {
    Prefix::TagAddr.compose(&[
        &keys::Kind(kind),
        &keys::Author(pubkey),
        &keys::Arb(identifier.to_vec()),
    ])
}

/// Access-counter key; the value is a last-access timestamp.
pub fn counter_key(serial: u64) -> Vec<u8> {
    Prefix::Counter.compose(&[&keys::Serial(serial)])
}

/// Full-summary index key: id, pubkey and time readable without
/// deserializing the event body.
pub fn full_index_key(serial: u64, id: EventId, pubkey: Pubkey, created_at: Timestamp) -> Vec<u8> {
    Prefix::FullIndex.compose(&[
        &keys::Serial(serial),
        &keys::Id(id),
        &keys::Author(pubkey),
        &keys::CreatedAt(created_at),
    ])
}

/// Scan prefix over one serial's full-summary entry.
pub fn full_index_prefix(serial: u64) -> Vec<u8> {
    Prefix::FullIndex.compose(&[&keys::Serial(serial)])
}

/// Tombstone key: a truncated event id. Its presence permanently blocks
/// re-insertion of that id.
pub fn tombstone_key(id: EventId) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + keys::TOMBSTONE_LEN);
    key.push(Prefix::Tombstone.byte());
    key.extend_from_slice(id.truncated(keys::TOMBSTONE_LEN));
    key
}

/// The singleton configuration key.
pub fn configuration_key() -> Vec<u8> {
    Prefix::Configuration.key()
}

/// The serial allocator's lease key.
pub fn serial_meta_key() -> Vec<u8> {
    Prefix::SerialMeta.key()
}

/// Decoded full-summary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Serial of the record.
    pub serial: u64,
    /// Event id.
    pub id: EventId,
    /// Author pubkey.
    pub pubkey: Pubkey,
    /// Creation time.
    pub created_at: Timestamp,
}

/// Decodes a [`Prefix::FullIndex`] key. Fails on any malformed or
/// truncated key.
pub fn decode_full_index(key: &[u8]) -> Option<Summary> {
    if key.first() != Some(&Prefix::FullIndex.byte()) {
        return None;
    }
    let mut input = &key[1..];
    let serial = keys::Serial::read(&mut input)?;
    let id = keys::Id::read(&mut input)?;
    let pubkey = keys::Author::read(&mut input)?;
    let created_at = keys::CreatedAt::read(&mut input)?;
    if !input.is_empty() {
        return None;
    }
    Some(Summary {
        serial: serial.0,
        id: id.0,
        pubkey: pubkey.0,
        created_at: created_at.0,
    })
}
