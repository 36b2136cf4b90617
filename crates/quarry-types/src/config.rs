//! The store configuration record.
//!
//! A singleton JSON blob kept under a fixed key in the store. The protocol
//! layer reads and updates it through the storage API; the engine itself
//! only persists it.

use serde::{Deserialize, Serialize};

/// Runtime-adjustable relay policy stored alongside the events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Pubkeys (hex) whose events are rejected by the protocol layer.
    #[serde(default)]
    pub block_list: Vec<String>,
    /// Pubkeys (hex) with administrative rights over the relay.
    #[serde(default)]
    pub owners: Vec<String>,
    /// Whether the relay advertises itself as a directory service.
    #[serde(default)]
    pub directory: bool,
}
