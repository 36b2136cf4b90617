//! Index key construction for events.
//!
//! Given an event and its serial, [`index_keys_for_event`] produces the
//! complete set of index keys the save transaction writes. Tag indexing
//! dispatches on the shape of the value: pubkey-shaped and address-shaped
//! tag values are overwhelmingly common query predicates, so they get
//! dense fixed-width encodings distinct from arbitrary text.

use quarry_types::{Event, Pubkey, Timestamp};

use crate::index;

/// Upper bound on indexable tag value length, in bytes. Longer values stay
/// retrievable via the other families, just not by tag.
const MAX_TAG_VALUE_LEN: usize = 100;

/// Produces every index key for an event stored under `serial`: by-id,
/// by-pubkey, by-kind, by-pubkey-kind, per-tag, time-only, the access
/// counter (value filled by the caller), and the full summary.
pub fn index_keys_for_event(event: &Event, serial: u64) -> Vec<Vec<u8>> {
    let created_at = event.created_at;
    let kind = event.kind.as_u16();
    let mut keys = Vec::with_capacity(7 + event.tags.len());

    keys.push(index::id_key(event.id, serial));
    keys.push(index::pubkey_key(event.pubkey, created_at, serial));
    keys.push(index::kind_key(kind, created_at, serial));
    keys.push(index::pubkey_kind_key(event.pubkey, kind, created_at, serial));

    let mut seen_values: Vec<&str> = Vec::new();
    for tag in event.tags.iter() {
        let (Some(key), Some(value)) = (tag.key(), tag.value()) else {
            continue;
        };
        // no value, non-single-character key, or out-of-bounds value length
        // makes the tag non-indexable
        if tag.len() < 2
            || key.len() != 1
            || value.is_empty()
            || value.len() > MAX_TAG_VALUE_LEN
        {
            continue;
        }
        // first occurrence of a value wins
        if seen_values.contains(&value) {
            continue;
        }
        seen_values.push(value);
        keys.push(tag_index_key(key, value, created_at, serial));
    }

    keys.push(index::created_at_key(created_at, serial));
    keys.push(index::counter_key(serial));
    keys.push(index::full_index_key(serial, event.id, event.pubkey, created_at));
    keys
}

/// Builds the index key for one tag, dispatching on value shape.
fn tag_index_key(tag_key: &str, value: &str, created_at: Timestamp, serial: u64) -> Vec<u8> {
    if let Some(pubkey) = pubkey_shaped(value) {
        return index::tag32_key(pubkey, serial);
    }
    if tag_key == "a" {
        if let Some((kind, pubkey, identifier)) = parse_address(value) {
            return index::tag_addr_key(kind, pubkey, identifier.as_bytes(), created_at, serial);
        }
    }
    index::tag_key(value.as_bytes(), created_at, serial)
}

/// Builds the scan prefix the planner uses for one tag filter value,
/// dispatching on the same shapes as [`tag_index_key`].
pub(crate) fn tag_scan_prefix(value: &str) -> Vec<u8> {
    if let Some(pubkey) = pubkey_shaped(value) {
        return index::tag32_prefix(pubkey);
    }
    if let Some((kind, pubkey, identifier)) = parse_address(value) {
        return index::tag_addr_prefix(kind, pubkey, identifier.as_bytes());
    }
    index::tag_prefix(value.as_bytes())
}

/// A value of exactly 64 hex characters decodable as bytes is treated as a
/// pubkey.
fn pubkey_shaped(value: &str) -> Option<Pubkey> {
    if value.len() != 64 {
        return None;
    }
    let bytes = hex::decode(value).ok()?;
    Pubkey::from_slice(&bytes)
}

/// Parses a `kind:pubkey:identifier` address. The identifier may be empty.
fn parse_address(value: &str) -> Option<(u16, Pubkey, &str)> {
    if value.bytes().filter(|&b| b == b':').count() != 2 {
        return None;
    }
    let mut parts = value.splitn(3, ':');
    let kind = parts.next()?.parse::<u16>().ok()?;
    let pubkey = Pubkey::from_hex(parts.next()?)?;
    let identifier = parts.next()?;
    Some((kind, pubkey, identifier))
}

#[cfg(test)]
mod tests {
    use quarry_types::{EventId, Kind, Tag, Tags};

    use super::*;
    use crate::index::Prefix;

    fn event_with_tags(tags: Vec<Tag>) -> Event {
        Event {
            id: EventId::new([1u8; 32]),
            pubkey: Pubkey::new([2u8; 32]),
            created_at: Timestamp::from_secs(1000),
            kind: Kind::new(1),
            tags: Tags::new(tags),
            content: String::new(),
            sig: vec![0u8; 64],
        }
    }

    fn family_counts(keys: &[Vec<u8>]) -> Vec<u8> {
        keys.iter().map(|k| k[0]).collect()
    }

    #[test]
    fn always_emits_seven_base_keys() {
        let keys = index_keys_for_event(&event_with_tags(vec![]), 1);
        assert_eq!(keys.len(), 7);
        let families = family_counts(&keys);
        for prefix in [
            Prefix::Id,
            Prefix::Pubkey,
            Prefix::Kind,
            Prefix::PubkeyKind,
            Prefix::CreatedAt,
            Prefix::Counter,
            Prefix::FullIndex,
        ] {
            assert!(families.contains(&prefix.byte()), "{prefix:?} missing");
        }
        // every key carries the serial in its tail position
        for key in &keys {
            assert!(key.ends_with(&1u64.to_be_bytes()) || key[0] == Prefix::FullIndex.byte());
        }
    }

    #[test]
    fn skips_non_indexable_tags() {
        let long = "x".repeat(101);
        let keys = index_keys_for_event(
            &event_with_tags(vec![
                Tag::new(["t"]),                   // no value
                Tag::new(["tt", "value"]),         // key not one character
                Tag::new(["t", ""]),               // empty value
                Tag::new(["t", long.as_str()]),    // oversized value
            ]),
            1,
        );
        assert_eq!(keys.len(), 7);
    }

    #[test]
    fn duplicate_values_indexed_once() {
        let keys = index_keys_for_event(
            &event_with_tags(vec![
                Tag::new(["t", "rust"]),
                Tag::new(["r", "rust"]),
                Tag::new(["t", "other"]),
            ]),
            1,
        );
        assert_eq!(keys.len(), 9);
    }

    #[test]
    fn tag_shape_dispatch() {
        let pk_hex = hex::encode([7u8; 32]);
        let addr = format!("30023:{}:post-1", pk_hex);
        let keys = index_keys_for_event(
            &event_with_tags(vec![
                Tag::new(["p", pk_hex.as_str()]),
                Tag::new(["a", addr.as_str()]),
                Tag::new(["t", "plain"]),
            ]),
            1,
        );
        let families = family_counts(&keys);
        assert!(families.contains(&Prefix::Tag32.byte()));
        assert!(families.contains(&Prefix::TagAddr.byte()));
        assert!(families.contains(&Prefix::Tag.byte()));
    }

    #[test]
    fn malformed_address_falls_back_to_generic() {
        // two colons but a non-numeric kind is not an address
        let prefix = tag_scan_prefix("abc:def:ghi");
        assert_eq!(prefix[0], Prefix::Tag.byte());
        // an "a" tag with a bad pubkey is indexed as generic text
        let keys = index_keys_for_event(
            &event_with_tags(vec![Tag::new(["a", "30023:nothex:d"])]),
            1,
        );
        assert!(family_counts(&keys).contains(&Prefix::Tag.byte()));
    }

    #[test]
    fn scan_prefix_matches_index_key() {
        let pk_hex = hex::encode([9u8; 32]);
        for value in [pk_hex.as_str(), "plain-topic"] {
            let prefix = tag_scan_prefix(value);
            let key = tag_index_key("t", value, Timestamp::from_secs(5), 3);
            assert!(key.starts_with(&prefix));
        }
        let addr = format!("0:{}:", hex::encode([9u8; 32]));
        let prefix = tag_scan_prefix(&addr);
        let key = tag_index_key("a", &addr, Timestamp::from_secs(5), 3);
        assert!(key.starts_with(&prefix));
    }
}
