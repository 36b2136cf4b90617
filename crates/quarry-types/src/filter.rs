//! Subscription filters.
//!
//! A filter is a predicate over events: optional id, author, kind, and tag
//! sets plus a time range and a result limit. The query planner turns the
//! most selective part into index prefixes; whatever cannot be expressed as
//! a prefix is re-applied in memory through [`Filter::matches`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Event, EventId, Kind, Pubkey, Timestamp};

/// A predicate over events.
///
/// Ids and authors are carried in hex form as received from the wire;
/// malformed entries are skipped by the planner with a diagnostic rather
/// than failing the whole query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Event ids, 64 hex characters each.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
    /// Author public keys, 64 hex characters each.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    /// Numeric kinds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<Kind>,
    /// Tag constraints: tag key to accepted values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, Vec<String>>,
    /// Inclusive lower bound on creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<Timestamp>,
    /// Inclusive upper bound on creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<Timestamp>,
    /// Maximum number of results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Filter {
    /// An empty filter, matching everything.
    pub fn new() -> Self {
        Filter::default()
    }

    /// True when no field constrains the result set.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
            && self.authors.is_empty()
            && self.kinds.is_empty()
            && self.tags.is_empty()
            && self.since.is_none()
            && self.until.is_none()
    }

    /// Direct field matching, used for the residual predicate the index
    /// scan cannot express.
    pub fn matches(&self, event: &Event) -> bool {
        if !self.ids.is_empty() {
            let hit = self
                .ids
                .iter()
                .any(|h| EventId::from_hex(h) == Some(event.id));
            if !hit {
                return false;
            }
        }
        if !self.authors.is_empty() {
            let hit = self
                .authors
                .iter()
                .any(|h| Pubkey::from_hex(h) == Some(event.pubkey));
            if !hit {
                return false;
            }
        }
        if !self.kinds.is_empty() && !self.kinds.contains(&event.kind) {
            return false;
        }
        for (key, values) in &self.tags {
            let hit = event.tags.iter().any(|t| {
                t.key() == Some(key.as_str())
                    && t.value().is_some_and(|v| values.iter().any(|w| w == v))
            });
            if !hit {
                return false;
            }
        }
        if let Some(since) = self.since {
            if event.created_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if event.created_at > until {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Tag, Tags};

    fn event() -> Event {
        Event {
            id: EventId::new([1u8; 32]),
            pubkey: Pubkey::new([2u8; 32]),
            created_at: Timestamp::from_secs(500),
            kind: Kind::new(1),
            tags: Tags::new(vec![Tag::new(["t", "rust"])]),
            content: String::new(),
            sig: vec![0u8; 64],
        }
    }

    #[test]
    fn empty_filter_matches_all() {
        assert!(Filter::new().matches(&event()));
    }

    #[test]
    fn kind_and_tag_constraints() {
        let ev = event();
        let mut f = Filter::new();
        f.kinds = vec![Kind::new(1)];
        assert!(f.matches(&ev));
        f.kinds = vec![Kind::new(7)];
        assert!(!f.matches(&ev));

        let mut f = Filter::new();
        f.tags.insert("t".into(), vec!["rust".into(), "go".into()]);
        assert!(f.matches(&ev));
        f.tags.insert("t".into(), vec!["zig".into()]);
        assert!(!f.matches(&ev));
    }

    #[test]
    fn time_bounds() {
        let ev = event();
        let mut f = Filter::new();
        f.since = Some(Timestamp::from_secs(501));
        assert!(!f.matches(&ev));
        f.since = Some(Timestamp::from_secs(500));
        assert!(f.matches(&ev));
        f.until = Some(Timestamp::from_secs(499));
        assert!(!f.matches(&ev));
    }

    #[test]
    fn malformed_filter_id_never_matches() {
        let ev = event();
        let mut f = Filter::new();
        f.ids = vec!["not-hex".into()];
        assert!(!f.matches(&ev));
    }
}
