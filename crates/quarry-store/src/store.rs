//! The store handle.
//!
//! [`Store`] owns the database, the serial allocator, and the background
//! task tracker. It is cheap to clone and shared across connection tasks;
//! reads run on independent snapshots and every write commits as its own
//! transaction. Construct it where the process wires its dependencies and
//! pass it down explicitly; nothing in this crate reaches for globals.

use std::path::Path;
use std::sync::Arc;

use quarry_types::Configuration;
use redb::Database;
use snafu::ResultExt;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::{
    CommitSnafu, ConfigurationSnafu, OpenSnafu, Result, StorageSnafu, TableSnafu, TransactionSnafu,
};
use crate::index::configuration_key;
use crate::serial::SerialAllocator;
use crate::tables::RECORDS;

/// Default cap on results for filters without a limit. Overly broad filters
/// are a resource-exhaustion vector; this keeps the usual largest batch at
/// around 256kb.
pub const DEFAULT_MAX_LIMIT: usize = 2048;

/// Store construction options.
#[derive(Debug, Clone)]
pub struct Options {
    /// Result cap applied when a filter carries no limit, and the aggregate
    /// ceiling applied when it does.
    pub max_limit: usize,
    /// Whether primary records may be 32-byte stubs resolved through a
    /// secondary storage tier.
    pub tier2_enabled: bool,
    /// Process-wide shutdown signal; cancelling it aborts in-flight scans.
    pub shutdown: CancellationToken,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            max_limit: DEFAULT_MAX_LIMIT,
            tier2_enabled: false,
            shutdown: CancellationToken::new(),
        }
    }
}

pub(crate) struct Inner {
    pub db: Arc<Database>,
    pub serial: SerialAllocator,
    pub max_limit: usize,
    pub tier2_enabled: bool,
    pub shutdown: CancellationToken,
    pub tasks: TaskTracker,
}

/// Handle to an open event store.
#[derive(Clone)]
pub struct Store {
    pub(crate) inner: Arc<Inner>,
}

impl Store {
    /// Opens or creates the store at `path`.
    pub fn open(path: impl AsRef<Path>, options: Options) -> Result<Self> {
        let path = path.as_ref();
        let db = Database::create(path).context(OpenSnafu {
            path: path.display().to_string(),
        })?;
        let db = Arc::new(db);
        // ensure the table exists before any read transaction touches it
        let txn = db.begin_write().context(TransactionSnafu)?;
        txn.open_table(RECORDS).context(TableSnafu)?;
        txn.commit().context(CommitSnafu)?;

        let serial = SerialAllocator::open(Arc::clone(&db))?;
        Ok(Store {
            inner: Arc::new(Inner {
                db,
                serial,
                max_limit: options.max_limit,
                tier2_enabled: options.tier2_enabled,
                shutdown: options.shutdown,
                tasks: TaskTracker::new(),
            }),
        })
    }

    /// Reads the configuration record, or the default when none was ever
    /// stored.
    pub fn get_configuration(&self) -> Result<Configuration> {
        let txn = self.inner.db.begin_read().context(TransactionSnafu)?;
        let table = txn.open_table(RECORDS).context(TableSnafu)?;
        match table.get(&configuration_key()[..]).context(StorageSnafu)? {
            Some(guard) => {
                serde_json::from_slice(guard.value()).context(ConfigurationSnafu)
            }
            None => Ok(Configuration::default()),
        }
    }

    /// Replaces the configuration record.
    pub fn set_configuration(&self, configuration: &Configuration) -> Result<()> {
        let body = serde_json::to_vec(configuration).context(ConfigurationSnafu)?;
        let txn = self.inner.db.begin_write().context(TransactionSnafu)?;
        {
            let mut table = txn.open_table(RECORDS).context(TableSnafu)?;
            table
                .insert(&configuration_key()[..], &body[..])
                .context(StorageSnafu)?;
        }
        txn.commit().context(CommitSnafu)
    }

    /// Drains in-flight background work (deferred deletions, access-counter
    /// bumps) before returning. Writes issued through the API are already
    /// committed when their call returns; this only waits for the
    /// fire-and-forget tail.
    pub async fn close(self) {
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
    }

    pub(crate) fn cancelled(&self, token: &CancellationToken) -> bool {
        token.is_cancelled() || self.inner.shutdown.is_cancelled()
    }
}
