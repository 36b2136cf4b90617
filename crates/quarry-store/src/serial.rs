//! Crash-durable monotonic serial allocation.
//!
//! Serials order stored records and join each primary record to its index
//! entries; they are never reused, even across deletes. The allocator
//! persists a lease of values in one write transaction and serves calls
//! from memory until the lease runs out, so the common path costs no
//! durability round-trip. A crash forfeits at most one lease of values,
//! which is harmless: serials are gap-tolerant.

use std::sync::Arc;

use parking_lot::Mutex;
use redb::Database;
use snafu::ResultExt;

use crate::error::{CommitSnafu, Result, StorageSnafu, TableSnafu, TransactionSnafu};
use crate::index::serial_meta_key;
use crate::tables::RECORDS;

/// Values reserved per persisted lease.
const LEASE: u64 = 1024;

struct Cursor {
    next: u64,
    lease_end: u64,
}

/// Monotonic serial allocator backed by a persisted lease.
pub struct SerialAllocator {
    db: Arc<Database>,
    cursor: Mutex<Cursor>,
}

impl SerialAllocator {
    /// Loads the persisted lease and reserves a fresh one. The store calls
    /// this once at open.
    pub fn open(db: Arc<Database>) -> Result<Self> {
        let start = {
            let txn = db.begin_read().context(TransactionSnafu)?;
            let table = txn.open_table(RECORDS).context(TableSnafu)?;
            match table.get(&serial_meta_key()[..]).context(StorageSnafu)? {
                Some(guard) => {
                    let bytes: [u8; 8] = guard.value().try_into().unwrap_or([0u8; 8]);
                    u64::from_be_bytes(bytes)
                }
                None => 0,
            }
        };
        let allocator = SerialAllocator {
            db,
            cursor: Mutex::new(Cursor {
                next: start,
                lease_end: start,
            }),
        };
        // reserve the first lease eagerly so the first save cannot race an
        // unpersisted cursor
        {
            let mut cursor = allocator.cursor.lock();
            allocator.extend_lease(&mut cursor)?;
        }
        Ok(allocator)
    }

    /// Returns the next serial, strictly greater than every serial returned
    /// before it over the store's lifetime. Fails, and must abort the
    /// calling save, when a new lease cannot be persisted.
    pub fn next(&self) -> Result<u64> {
        let mut cursor = self.cursor.lock();
        if cursor.next == cursor.lease_end {
            self.extend_lease(&mut cursor)?;
        }
        let serial = cursor.next;
        cursor.next += 1;
        Ok(serial)
    }

    fn extend_lease(&self, cursor: &mut Cursor) -> Result<()> {
        let new_end = cursor.lease_end + LEASE;
        let txn = self.db.begin_write().context(TransactionSnafu)?;
        {
            let mut table = txn.open_table(RECORDS).context(TableSnafu)?;
            table
                .insert(&serial_meta_key()[..], &new_end.to_be_bytes()[..])
                .context(StorageSnafu)?;
        }
        txn.commit().context(CommitSnafu)?;
        cursor.lease_end = new_end;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_at(path: &std::path::Path) -> Arc<Database> {
        let db = Database::create(path).expect("create db");
        let txn = db.begin_write().expect("begin write");
        txn.open_table(RECORDS).expect("open table");
        txn.commit().expect("commit");
        Arc::new(db)
    }

    #[test]
    fn strictly_increasing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let alloc = SerialAllocator::open(db_at(&dir.path().join("q.redb"))).expect("open");
        let mut last = alloc.next().expect("next");
        for _ in 0..2 * LEASE {
            let serial = alloc.next().expect("next");
            assert!(serial > last);
            last = serial;
        }
    }

    #[test]
    fn reopen_never_reuses() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("q.redb");
        let mut handed_out = Vec::new();
        {
            let alloc = SerialAllocator::open(db_at(&path)).expect("open");
            for _ in 0..10 {
                handed_out.push(alloc.next().expect("next"));
            }
        }
        let alloc = SerialAllocator::open(db_at(&path)).expect("reopen");
        let serial = alloc.next().expect("next");
        assert!(handed_out.iter().all(|&s| serial > s));
    }
}
