//! Domain types for the quarry event store.
//!
//! This crate provides:
//! - Event, event id, and author pubkey types
//! - Kind classification (ephemeral, replaceable, parameterized, directory)
//! - Tags and the standing-subscription Filter
//! - Seconds-resolution timestamps
//! - The store configuration record
//! - Postcard codec helpers with consistent error handling

mod codec;
mod config;
mod event;
mod filter;
mod kind;
mod tags;
mod timestamp;

pub use codec::{decode, encode, CodecError};
pub use config::Configuration;
pub use event::{Event, EventId, Pubkey, ID_LEN, PUBKEY_LEN};
pub use filter::Filter;
pub use kind::Kind;
pub use tags::{Tag, Tags};
pub use timestamp::Timestamp;
