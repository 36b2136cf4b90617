//! The save path: duplicate and tombstone checks, replaceable-kind
//! replacement, stub completion, and the atomic primary+index write.
//!
//! Replacement is planned before the save and executed after it: the
//! replace step returns the ids it wants gone, and they are deleted only
//! once the incoming event has committed, so a failed save never destroys
//! the record it was meant to replace.

use quarry_types::{Event, EventId, Filter, Timestamp};
use redb::ReadableTable;
use snafu::{ensure, ResultExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{
    CancelledSnafu, CodecSnafu, CommitSnafu, Result, StorageSnafu, StoreError, TableSnafu,
    TransactionSnafu,
};
use crate::index;
use crate::indexes::index_keys_for_event;
use crate::keys::serial_from_key;
use crate::query::STUB_LEN;
use crate::store::Store;
use crate::tables::RECORDS;

impl Store {
    /// Saves an event.
    ///
    /// Ephemeral kinds return `Ok` without persisting. Replaceable and
    /// parameterized-replaceable kinds first retire older events for the
    /// same identity; an existing strictly newer event rejects the save
    /// with [`StoreError::StaleReplacement`]. A tombstoned id is rejected
    /// with [`StoreError::TombstoneConflict`]; an id already stored with a
    /// full body with [`StoreError::DuplicateEvent`]. Saving over a tier-2
    /// stub completes the stub in place. An already-cancelled token rejects
    /// the save with [`StoreError::Cancelled`] before anything is written.
    pub async fn save_event(&self, token: &CancellationToken, event: &Event) -> Result<()> {
        if event.kind.is_ephemeral() {
            return Ok(());
        }
        ensure!(!self.cancelled(token), CancelledSnafu);
        // replacement bookkeeping must observe the complete existing set
        // and finish once the save commits, so it runs detached from the
        // caller's token: a mid-flight cancellation must never skip the
        // stale check or strand a superseded event
        let detached = CancellationToken::new();
        let pending = self.replace_targets(&detached, event).await?;
        self.save_raw(event)?;
        for id in pending {
            debug!(%id, replacement = %event.id, "removing replaced event");
            // no tombstone: a superseded version stays restorable from
            // backups and exports
            self.delete_event(&detached, &id, false).await?;
        }
        Ok(())
    }

    /// Queries the events an incoming replaceable event supersedes and
    /// returns the ids to delete after the save commits. Directory kinds
    /// are superseded but kept.
    async fn replace_targets(
        &self,
        token: &CancellationToken,
        event: &Event,
    ) -> Result<Vec<EventId>> {
        let parameterized = event.kind.is_parameterized_replaceable();
        if !event.kind.is_replaceable() && !parameterized {
            return Ok(Vec::new());
        }
        let mut filter = Filter::new();
        filter.authors = vec![event.pubkey.to_string()];
        filter.kinds = vec![event.kind];
        let existing = self.query_events(token, &filter).await?;

        let mut pending = Vec::new();
        for old in existing {
            if old.id == event.id {
                continue;
            }
            if parameterized && old.d_tag() != event.d_tag() {
                continue;
            }
            if old.created_at > event.created_at {
                return Err(StoreError::StaleReplacement {
                    author: event.pubkey.to_string(),
                    kind: event.kind.as_u16(),
                });
            }
            if !old.kind.is_directory() {
                pending.push(old.id);
            }
        }
        Ok(pending)
    }

    /// Writes the primary record and the full index-key set as one
    /// transaction, after the duplicate and tombstone checks. The check and
    /// the insert share the write transaction, so of two concurrent saves
    /// of the same id the loser observes the winner's committed id entry.
    fn save_raw(&self, event: &Event) -> Result<()> {
        // allocated outside the write transaction (the allocator persists
        // its lease in its own transaction); unused on the duplicate path,
        // and serials are gap-tolerant
        let serial = self.inner.serial.next()?;
        let body = quarry_types::encode(event).context(CodecSnafu)?;

        let txn = self.inner.db.begin_write().context(TransactionSnafu)?;
        {
            let mut table = txn.open_table(RECORDS).context(TableSnafu)?;

            let tombstone = index::tombstone_key(event.id);
            if table.get(&tombstone[..]).context(StorageSnafu)?.is_some() {
                warn!(id = %event.id, "tombstone found, event will not be saved");
                return Err(StoreError::TombstoneConflict {
                    id: event.id.to_string(),
                });
            }

            let now = Timestamp::now().to_be_bytes();
            if let Some(existing) = find_serial(&table, event.id)? {
                complete_stub(&mut table, existing, event, &body, &now)?;
            } else {
                table
                    .insert(&index::event_key(serial)[..], &body[..])
                    .context(StorageSnafu)?;
                for key in index_keys_for_event(event, serial) {
                    let value: &[u8] = if key[0] == index::Prefix::Counter.byte() {
                        &now
                    } else {
                        &[]
                    };
                    table.insert(&key[..], value).context(StorageSnafu)?;
                }
            }
        }
        txn.commit().context(CommitSnafu)
    }
}

/// Looks up the serial an id is stored under, if any.
fn find_serial<T>(table: &T, id: EventId) -> Result<Option<u64>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let prefix = index::id_prefix(id);
    let mut upper = prefix.clone();
    upper.extend_from_slice(&u64::MAX.to_be_bytes());
    let mut range = table
        .range(&prefix[..]..=&upper[..])
        .context(StorageSnafu)?;
    match range.next() {
        Some(entry) => {
            let (key, _) = entry.context(StorageSnafu)?;
            Ok(serial_from_key(key.value()))
        }
        None => Ok(None),
    }
}

/// Handles a save whose id already has a primary record: a 32-byte stub is
/// completed with the full body (and its access counter bumped); anything
/// else is a true duplicate.
fn complete_stub(
    table: &mut redb::Table<'_, &'static [u8], &'static [u8]>,
    serial: u64,
    event: &Event,
    body: &[u8],
    now: &[u8; 8],
) -> Result<()> {
    let event_key = index::event_key(serial);
    let is_stub = match table.get(&event_key[..]).context(StorageSnafu)? {
        Some(guard) => guard.value().len() == STUB_LEN,
        // id entry without a primary record: half-deleted stub, restorable
        None => true,
    };
    if !is_stub {
        return Err(StoreError::DuplicateEvent {
            id: event.id.to_string(),
        });
    }
    debug!(id = %event.id, serial, "completing tier-2 stub with full body");
    table.insert(&event_key[..], body).context(StorageSnafu)?;
    table
        .insert(&index::counter_key(serial)[..], &now[..])
        .context(StorageSnafu)?;
    Ok(())
}
