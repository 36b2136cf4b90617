//! Table definitions for redb storage.
//!
//! Every key family shares one byte-keyed table; the first key byte selects
//! the family (see [`crate::index::Prefix`]). Keeping a single keyspace
//! preserves the byte-exact layout of the index scheme and lets reverse
//! range scans run across a family prefix.

use redb::TableDefinition;

/// All primary records, index entries, tombstones, the configuration blob,
/// and the serial lease live here, distinguished by their prefix byte.
pub const RECORDS: TableDefinition<'static, &'static [u8], &'static [u8]> =
    TableDefinition::new("records");
