//! # hivecache
//!
//! Core of the hivecache distributed in-memory key-value cache.
//!
//! Clients address named [`Group`]s; each group is sharded across a
//! fleet of peers by consistent hashing. A read checks the local cache,
//! then (on miss) asks the owning peer, then falls back to the
//! user-supplied [`Loader`], with a single-flight barrier guaranteeing
//! at most one concurrent load per key on this node.
//!
//! The RPC transport and service discovery live outside this crate and
//! reach it through the [`PeerPicker`] and [`Fetcher`] capabilities.

#![warn(missing_docs)]

mod byteview;
mod cache;
mod error;
mod group;
mod peers;
mod registry;
mod ring;
mod singleflight;

pub use byteview::ByteView;
pub use cache::Cache;
pub use error::{Error, Result};
pub use group::{Group, GroupOptions, Loader};
pub use hivelru::{ByteCost, CacheStats, StatsSnapshot};
pub use peers::{Fetcher, PeerPicker};
pub use registry::Registry;
pub use ring::{HashFn, Ring};
pub use singleflight::SingleFlight;
