//! Event storage and indexing engine.
//!
//! Quarry stores signed, immutable events in a single ordered key-value
//! store (redb) and maintains a multi-family secondary index over them:
//!
//! - a key codec encoding fixed- and variable-width index elements so that
//!   lexicographic byte order equals (value, time, serial) order
//! - a crash-durable monotonic serial allocator joining primary records to
//!   their index entries
//! - a filter-to-prefix query planner and a bounded, cancellable
//!   reverse-time executor
//! - lifecycle policy: save, replace, delete, tombstone, lazy expiration
//!
//! Reads run on isolated snapshots; every save or delete commits as a
//! single write transaction, so partial writes are never observable.

mod delete;
mod error;
mod index;
mod indexes;
mod keys;
mod planner;
mod query;
mod save;
mod serial;
mod store;
mod tables;

pub use error::{Result, StoreError};
pub use index::{decode_full_index, Prefix, Summary};
pub use indexes::index_keys_for_event;
pub use serial::SerialAllocator;
pub use store::{Options, Store, DEFAULT_MAX_LIMIT};
