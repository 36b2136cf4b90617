//! Event kind classification.
//!
//! Kinds partition the event space into lifecycle classes:
//!
//! | Range / value   | Class                       |
//! |-----------------|-----------------------------|
//! | 20000..30000    | ephemeral (never persisted) |
//! | 0, 3, 10000..20000 | replaceable (author+kind unique) |
//! | 30000..40000    | parameterized-replaceable (author+kind+d-tag unique) |
//! | 0, 3            | directory (superseded, never deleted on replacement) |
//! | 5               | deletion (tombstones its targets) |
//! | everything else | regular                     |

use serde::{Deserialize, Serialize};

/// Numeric event kind (0-65535).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Kind(u16);

/// Kind of deletion events.
pub const DELETION: Kind = Kind(5);

impl Kind {
    /// Creates a kind from its numeric value.
    pub const fn new(value: u16) -> Self {
        Kind(value)
    }

    /// The numeric value.
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Ephemeral kinds are accepted but never persisted.
    pub const fn is_ephemeral(self) -> bool {
        self.0 >= 20000 && self.0 < 30000
    }

    /// Replaceable kinds keep only the newest event per author.
    pub const fn is_replaceable(self) -> bool {
        self.0 == 0 || self.0 == 3 || (self.0 >= 10000 && self.0 < 20000)
    }

    /// Parameterized-replaceable kinds are additionally keyed by the first
    /// "d" tag value.
    pub const fn is_parameterized_replaceable(self) -> bool {
        self.0 >= 30000 && self.0 < 40000
    }

    /// Directory kinds are superseded but never deleted during replacement,
    /// so clients querying stale directory data keep getting an answer.
    pub const fn is_directory(self) -> bool {
        self.0 == 0 || self.0 == 3
    }

    /// Deletion events carry "e"/"a" tags naming tombstone targets.
    pub const fn is_deletion(self) -> bool {
        self.0 == DELETION.0
    }

    /// Big-endian key encoding.
    pub const fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

impl From<u16> for Kind {
    fn from(value: u16) -> Self {
        Kind(value)
    }
}
