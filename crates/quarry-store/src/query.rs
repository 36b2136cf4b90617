//! The query executor.
//!
//! Sub-queries run sequentially, each as a bounded reverse scan over its
//! index prefix inside a read snapshot; candidate serials are deduplicated
//! before the more expensive record resolution. Expired records are
//! dropped from the result set and deleted on a background task so the
//! read path never blocks on a write. A cancelled query returns whatever
//! it had accumulated; partial results from a cancelled scrape are not
//! harmful since writes remain transactional.

use std::collections::BTreeSet;

use quarry_types::{Event, EventId, Filter, Timestamp};
use redb::ReadableTable;
use snafu::ResultExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{Result, StorageSnafu, TableSnafu, TransactionSnafu};
use crate::index;
use crate::keys::{created_at_from_key, serial_from_key, CREATED_AT_LEN, SERIAL_LEN};
use crate::planner::plan;
use crate::store::Store;
use crate::tables::RECORDS;

/// Length of a tier-2 stub value: exactly a content hash.
pub(crate) const STUB_LEN: usize = 32;

impl Store {
    /// Runs a filter against the indexes and returns matching events,
    /// newest first. Ties on creation time break by serial, descending.
    ///
    /// With tier-2 support enabled, records whose body lives in the
    /// secondary tier are surfaced as id-only stubs ([`Event::is_stub`])
    /// for the caller to resolve there.
    pub async fn query_events(&self, token: &CancellationToken, filter: &Filter) -> Result<Vec<Event>> {
        let plan = plan(filter)?;
        let limit = filter
            .limit
            .map(|l| l.min(self.inner.max_limit))
            .unwrap_or(self.inner.max_limit);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let serials = self.scan_indexes(token, &plan, limit)?;
        trace!(
            candidates = serials.len(),
            queries = plan.queries.len(),
            "index scan complete"
        );

        let mut found: Vec<(Event, u64)> = Vec::new();
        let mut expired: Vec<EventId> = Vec::new();
        let mut seen: BTreeSet<EventId> = BTreeSet::new();
        let now = Timestamp::now();
        {
            let txn = self.inner.db.begin_read().context(TransactionSnafu)?;
            let table = txn.open_table(RECORDS).context(TableSnafu)?;
            for &serial in &serials {
                if self.cancelled(token) {
                    break;
                }
                let record_key = index::event_key(serial);
                let Some(guard) = table.get(&record_key[..]).context(StorageSnafu)? else {
                    // index entry outlived its record (stub deletion); the
                    // entry dies lazily
                    continue;
                };
                let value = guard.value();
                if self.inner.tier2_enabled && value.len() == STUB_LEN {
                    if let Some(id) = EventId::from_slice(value) {
                        trace!(%id, "found tier-2 stub, caller must resolve");
                        if seen.insert(id) {
                            found.push((Event::stub(id), serial));
                        }
                    }
                    continue;
                }
                let event: Event = match quarry_types::decode(value) {
                    Ok(event) => event,
                    Err(error) => {
                        warn!(serial, %error, "skipping undecodable event record");
                        continue;
                    }
                };
                if event.expiration().is_some_and(|exp| exp <= now) {
                    expired.push(event.id);
                    continue;
                }
                if let Some(residual) = &plan.residual {
                    if !residual.matches(&event) {
                        continue;
                    }
                }
                if seen.insert(event.id) {
                    found.push((event, serial));
                }
                if found.len() >= limit {
                    break;
                }
            }
        }

        if !expired.is_empty() {
            self.delete_expired(expired);
        }

        found.sort_by(|a, b| {
            b.0.created_at
                .cmp(&a.0.created_at)
                .then_with(|| b.1.cmp(&a.1))
        });
        found.truncate(limit);

        let accessed: Vec<u64> = found
            .iter()
            .filter(|(event, _)| !event.is_stub())
            .map(|&(_, serial)| serial)
            .collect();
        if !accessed.is_empty() {
            self.bump_access(accessed);
        }

        Ok(found.into_iter().map(|(event, _)| event).collect())
    }

    /// First pass: walk each planned prefix newest-first, collecting
    /// candidate serials until the aggregate hit count reaches the limit.
    fn scan_indexes(
        &self,
        token: &CancellationToken,
        plan: &crate::planner::Plan,
        limit: usize,
    ) -> Result<BTreeSet<u64>> {
        let mut serials = BTreeSet::new();
        let mut total = 0usize;
        'queries: for query in &plan.queries {
            if self.cancelled(token) {
                break;
            }
            let txn = self.inner.db.begin_read().context(TransactionSnafu)?;
            let table = txn.open_table(RECORDS).context(TableSnafu)?;
            let range = table
                .range(&query.prefix[..]..=&query.start[..])
                .context(StorageSnafu)?;
            for entry in range.rev() {
                if self.cancelled(token) {
                    break 'queries;
                }
                let (key_guard, _) = entry.context(StorageSnafu)?;
                let key = key_guard.value();
                if !key.starts_with(&query.prefix) {
                    break;
                }
                if !query.skip_ts {
                    if key.len() < query.prefix.len() + CREATED_AT_LEN + SERIAL_LEN {
                        continue;
                    }
                    let Some(created_at) = created_at_from_key(key) else {
                        continue;
                    };
                    if created_at.as_secs() < plan.since {
                        break;
                    }
                }
                let Some(serial) = serial_from_key(key) else {
                    continue;
                };
                serials.insert(serial);
                total += 1;
                // broad filters are a resource-exhaustion vector; stop
                // scanning once enough hits have accumulated
                if total >= limit {
                    break 'queries;
                }
            }
        }
        Ok(serials)
    }

    /// Fire-and-forget deletion of lazily discovered expired events.
    fn delete_expired(&self, ids: Vec<EventId>) {
        let store = self.clone();
        self.inner.tasks.spawn(async move {
            let token = CancellationToken::new();
            for id in ids {
                debug!(%id, "deleting expired event");
                if let Err(error) = store.delete_event(&token, &id, false).await {
                    warn!(%id, %error, "failed to delete expired event");
                }
            }
        });
    }

    /// Fire-and-forget bump of the access counters for returned events.
    /// Last-write-wins races are acceptable: the counter is advisory,
    /// feeding tier eviction, not correctness.
    fn bump_access(&self, serials: Vec<u64>) {
        let store = self.clone();
        self.inner.tasks.spawn(async move {
            let now = Timestamp::now().to_be_bytes();
            let result: Result<()> = (|| {
                let txn = store.inner.db.begin_write().context(TransactionSnafu)?;
                {
                    let mut table = txn.open_table(RECORDS).context(TableSnafu)?;
                    for serial in serials {
                        let key = index::counter_key(serial);
                        let exists = table.get(&key[..]).context(StorageSnafu)?.is_some();
                        if exists {
                            table.insert(&key[..], &now[..]).context(StorageSnafu)?;
                        }
                    }
                }
                txn.commit().context(crate::error::CommitSnafu)
            })();
            if let Err(error) = result {
                warn!(%error, "failed to bump access counters");
            }
        });
    }
}
