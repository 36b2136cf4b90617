//! The delete path: removing a record and its index entries, tombstoning,
//! and wiping the store.

use quarry_types::{Event, EventId};
use redb::ReadableTable;
use snafu::{ensure, ResultExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{
    CancelledSnafu, CommitSnafu, Result, StorageSnafu, TableSnafu, TransactionSnafu,
};
use crate::index;
use crate::indexes::index_keys_for_event;
use crate::keys::serial_from_key;
use crate::query::STUB_LEN;
use crate::store::Store;
use crate::tables::RECORDS;

impl Store {
    /// Removes an event's primary record and all of its index entries in
    /// one transaction. With `tombstone` set, additionally writes a
    /// permanent marker blocking any future save of the id; without it the
    /// id stays restorable, which replaceable-event supersession relies on
    /// so backups can recover prior versions.
    ///
    /// An already-cancelled token rejects the delete with
    /// [`StoreError::Cancelled`]; a returned `Ok` always means the keys
    /// are gone.
    ///
    /// [`StoreError::Cancelled`]: crate::StoreError::Cancelled
    pub async fn delete_event(
        &self,
        token: &CancellationToken,
        id: &EventId,
        tombstone: bool,
    ) -> Result<()> {
        ensure!(!self.cancelled(token), CancelledSnafu);
        let txn = self.inner.db.begin_write().context(TransactionSnafu)?;
        {
            let mut table = txn.open_table(RECORDS).context(TableSnafu)?;

            let doomed = collect_record_keys(&table, *id)?;
            for key in doomed {
                table.remove(&key[..]).context(StorageSnafu)?;
            }
            if tombstone {
                table
                    .insert(&index::tombstone_key(*id)[..], &[][..])
                    .context(StorageSnafu)?;
            }
        }
        txn.commit().context(CommitSnafu)?;
        debug!(%id, tombstone, "deleted event");
        Ok(())
    }

    /// Wipes every key family in the store: primary records, all index
    /// families, tombstones, the configuration, and the serial lease. The
    /// open handle keeps serving serials from its current lease; they
    /// restart on reopen.
    pub fn wipe(&self) -> Result<()> {
        warn!("wiping event store");
        let txn = self.inner.db.begin_write().context(TransactionSnafu)?;
        {
            let mut table = txn.open_table(RECORDS).context(TableSnafu)?;
            for prefix in index::ALL_PREFIXES {
                let lower = prefix.key();
                let upper = [prefix.byte() + 1];
                let mut doomed = Vec::new();
                for entry in table.range(&lower[..]..&upper[..]).context(StorageSnafu)? {
                    let (key, _) = entry.context(StorageSnafu)?;
                    doomed.push(key.value().to_vec());
                }
                for key in doomed {
                    table.remove(&key[..]).context(StorageSnafu)?;
                }
            }
        }
        txn.commit().context(CommitSnafu)
    }
}

/// Gathers every key belonging to the id's stored record. A full body
/// yields the complete index-key set; a tier-2 stub only its
/// serial-addressed keys (primary, id, counter, full summary), leaving the
/// time-family entries to lazy eviction since the body needed to rebuild
/// them is gone.
fn collect_record_keys<T>(table: &T, id: EventId) -> Result<Vec<Vec<u8>>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let prefix = index::id_prefix(id);
    let mut upper = prefix.clone();
    upper.extend_from_slice(&u64::MAX.to_be_bytes());
    let mut serials = Vec::new();
    for entry in table.range(&prefix[..]..=&upper[..]).context(StorageSnafu)? {
        let (key, _) = entry.context(StorageSnafu)?;
        if let Some(serial) = serial_from_key(key.value()) {
            serials.push(serial);
        }
    }

    let mut doomed = Vec::new();
    for serial in serials {
        let record_key = index::event_key(serial);
        match table.get(&record_key[..]).context(StorageSnafu)? {
            Some(guard) if guard.value().len() != STUB_LEN => {
                match quarry_types::decode::<Event>(guard.value()) {
                    Ok(event) => doomed.extend(index_keys_for_event(&event, serial)),
                    Err(error) => {
                        warn!(serial, %error, "undecodable record, removing reachable keys");
                        doomed.extend(serial_addressed_keys(table, id, serial)?);
                    }
                }
            }
            _ => doomed.extend(serial_addressed_keys(table, id, serial)?),
        }
        doomed.push(record_key);
    }
    Ok(doomed)
}

/// The keys reachable from a serial alone, for records without a
/// decodable body.
fn serial_addressed_keys<T>(table: &T, id: EventId, serial: u64) -> Result<Vec<Vec<u8>>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let mut keys = vec![index::id_key(id, serial), index::counter_key(serial)];
    let prefix = index::full_index_prefix(serial);
    let mut upper = prefix.clone();
    upper.extend_from_slice(&[0xff; 72]);
    for entry in table.range(&prefix[..]..=&upper[..]).context(StorageSnafu)? {
        let (key, _) = entry.context(StorageSnafu)?;
        if key.value().starts_with(&prefix) {
            keys.push(key.value().to_vec());
        }
    }
    Ok(keys)
}
