//! Filter-to-query planning.
//!
//! A filter becomes a list of (search-prefix, scan-start) sub-queries plus
//! a residual filter the executor re-applies in memory. Precedence is
//! mutually exclusive, first match wins: ids are the narrowest predicate
//! and short-circuit everything broader.
//!
//! 1. ids → one by-id lookup per id
//! 2. authors, no kinds → one by-pubkey prefix per author
//! 3. authors and kinds → one prefix per (author, kind) pair; tags residual
//! 4. tags → one prefix per (key, value) pair; kinds residual
//! 5. kinds → one by-kind prefix per kind
//! 6. nothing → a single scrape over the time-only family
//!
//! Malformed ids and authors are skipped with a diagnostic; clients will be
//! clients. The scan start is prefix ++ until-bound; `since` terminates
//! the reverse scan for time-carrying families. `skip_ts` exempts by-id
//! and pubkey-shaped-tag plans (their keys hold no timestamp) and the
//! scrape plan (which serves "latest N" requests regardless of since).

use quarry_types::{EventId, Filter, Pubkey};
use tracing::debug;

use crate::error::{EmptyTagFiltersSnafu, Result};
use crate::index;
use crate::indexes::tag_scan_prefix;

/// One planned index scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SubQuery {
    /// Keys must share this prefix to belong to the sub-query.
    pub prefix: Vec<u8>,
    /// Reverse scans seek here: prefix ++ until-bound.
    pub start: Vec<u8>,
    /// Skip tail-timestamp decoding; the since bound does not apply at the
    /// scan level.
    pub skip_ts: bool,
}

/// The full plan for a filter.
#[derive(Debug, Clone, Default)]
pub(crate) struct Plan {
    /// Sub-queries to scan, in order.
    pub queries: Vec<SubQuery>,
    /// Predicate the index selection could not express.
    pub residual: Option<Filter>,
    /// Effective lower time bound terminating each scan.
    pub since: u64,
}

pub(crate) fn plan(filter: &Filter) -> Result<Plan> {
    let mut plan = Plan::default();

    if !filter.ids.is_empty() {
        for id_hex in &filter.ids {
            let Some(id) = EventId::from_hex(id_hex) else {
                debug!(id = %id_hex, "skipping malformed id in filter");
                continue;
            };
            plan.queries.push(SubQuery {
                prefix: index::id_prefix(id),
                start: Vec::new(),
                skip_ts: true,
            });
        }
    } else if !filter.authors.is_empty() && filter.kinds.is_empty() {
        for author_hex in &filter.authors {
            let Some(author) = Pubkey::from_hex(author_hex) else {
                debug!(author = %author_hex, "skipping malformed author in filter");
                continue;
            };
            plan.queries.push(SubQuery {
                prefix: index::pubkey_prefix(author),
                start: Vec::new(),
                skip_ts: false,
            });
        }
    } else if !filter.authors.is_empty() {
        for author_hex in &filter.authors {
            let Some(author) = Pubkey::from_hex(author_hex) else {
                debug!(author = %author_hex, "skipping malformed author in filter");
                continue;
            };
            for kind in &filter.kinds {
                plan.queries.push(SubQuery {
                    prefix: index::pubkey_kind_prefix(author, kind.as_u16()),
                    start: Vec::new(),
                    skip_ts: false,
                });
            }
        }
        if !filter.tags.is_empty() {
            plan.residual = Some(Filter {
                tags: filter.tags.clone(),
                ..Filter::default()
            });
        }
    } else if !filter.tags.is_empty() {
        let total: usize = filter.tags.values().map(Vec::len).sum();
        snafu::ensure!(total > 0, EmptyTagFiltersSnafu);
        for values in filter.tags.values() {
            for value in values {
                let prefix = tag_scan_prefix(value);
                // pubkey-shaped tag keys carry no timestamp component, so
                // the since bound cannot terminate their scan
                let skip_ts = prefix[0] == index::Prefix::Tag32.byte();
                plan.queries.push(SubQuery {
                    prefix,
                    start: Vec::new(),
                    skip_ts,
                });
            }
        }
        if !filter.kinds.is_empty() {
            plan.residual = Some(Filter {
                kinds: filter.kinds.clone(),
                ..Filter::default()
            });
        }
    } else if !filter.kinds.is_empty() {
        for kind in &filter.kinds {
            plan.queries.push(SubQuery {
                prefix: index::kind_prefix(kind.as_u16()),
                start: Vec::new(),
                skip_ts: false,
            });
        }
    } else {
        // nothing to narrow by: scrape the newest events off the time-only
        // family (this also serves filters carrying only since/until)
        plan.queries.push(SubQuery {
            prefix: index::Prefix::CreatedAt.key(),
            start: Vec::new(),
            skip_ts: true,
        });
    }

    plan.since = filter.since.map(|t| t.as_secs()).unwrap_or(0);
    let until = filter
        .until
        .map(|t| t.as_secs().saturating_add(1))
        .unwrap_or(u64::MAX);
    for query in &mut plan.queries {
        let mut start = query.prefix.clone();
        start.extend_from_slice(&until.to_be_bytes());
        query.start = start;
    }
    Ok(plan)
}
