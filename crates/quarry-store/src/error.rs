//! Store error taxonomy.
//!
//! Conflicts (duplicate, tombstone, stale replacement) are named variants so
//! the protocol layer can produce specific user-facing notices. Malformed
//! filter elements are skipped with diagnostics and never surface here.
//! Infrastructure failures are propagated unchanged; retry policy belongs
//! to the caller.

use snafu::Snafu;

/// Result alias for store operations.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Error type for store operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    /// The event id is already stored with a full body.
    #[snafu(display("duplicate event {id}"))]
    DuplicateEvent {
        /// Hex id of the duplicate.
        id: String,
    },

    /// A tombstone permanently blocks re-insertion of this id.
    #[snafu(display("tombstone found for {id}, event will not be saved"))]
    TombstoneConflict {
        /// Hex id of the blocked event.
        id: String,
    },

    /// A newer event exists for the same replaceable identity.
    #[snafu(display("not replacing newer event for author {author} kind {kind}"))]
    StaleReplacement {
        /// Hex author pubkey of the identity.
        author: String,
        /// Numeric kind of the identity.
        kind: u16,
    },

    /// A tag filter was present but every value set was empty.
    #[snafu(display("empty tag filters"))]
    EmptyTagFilters,

    /// The operation's token was cancelled before any write began.
    #[snafu(display("operation cancelled"))]
    Cancelled,

    /// Failed to open the database.
    #[snafu(display("failed to open database at {path}: {source}"))]
    Open {
        /// Path that was opened.
        path: String,
        /// The underlying redb error.
        source: redb::DatabaseError,
    },

    /// Failed to begin a transaction.
    #[snafu(display("transaction error: {source}"))]
    Transaction {
        /// The underlying redb error.
        source: redb::TransactionError,
    },

    /// Failed to open a table.
    #[snafu(display("table error: {source}"))]
    Table {
        /// The underlying redb error.
        source: redb::TableError,
    },

    /// A read or write against the store failed.
    #[snafu(display("storage error: {source}"))]
    Storage {
        /// The underlying redb error.
        source: redb::StorageError,
    },

    /// Failed to commit a write transaction.
    #[snafu(display("commit error: {source}"))]
    Commit {
        /// The underlying redb error.
        source: redb::CommitError,
    },

    /// An event body failed to encode or decode.
    #[snafu(display("codec error: {source}"))]
    Codec {
        /// The underlying codec error.
        source: quarry_types::CodecError,
    },

    /// The configuration record failed to encode or decode.
    #[snafu(display("configuration error: {source}"))]
    Configuration {
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

impl StoreError {
    /// True for the named conflict conditions that the protocol layer maps
    /// to user-facing notices rather than generic errors.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::DuplicateEvent { .. }
                | StoreError::TombstoneConflict { .. }
                | StoreError::StaleReplacement { .. }
        )
    }
}
