//! Vixen - Alopex ordered in-memory index engine.
//!
//! This crate provides the ordered-index engine backing two store value
//! types: an ordered map (unique key -> value, ordered by an attached score)
//! and a time series (unique time-valued score -> value, ordered by that
//! score).
//!
//! # Components
//!
//! - [`SkipList`]: probabilistic ordered index with O(log N) rank queries
//! - [`OrderedMap`]: hash index + skip list, key identity, score order
//! - [`TimeSeries`]: skip list alone, the time score is the identity
//! - [`Store`]: value lifecycle, type routing, and the command surface
//!
//! # Example
//!
//! ```rust
//! use alopex_vixen::{Reply, Store};
//!
//! let mut store = Store::new();
//! store.series_add("temps", &["10", "cold", "20", "warm"])?;
//!
//! assert_eq!(store.series_len("temps")?, Reply::Integer(2));
//! assert_eq!(store.series_rank("temps", "20")?, Reply::Integer(1));
//! # Ok::<(), alopex_vixen::StoreError>(())
//! ```
//!
//! Commands execute single-threaded and run to completion; the surrounding
//! store serializes them, so the engine carries no locks. Every read result
//! is a snapshot - internal nodes never escape.

#![deny(missing_docs)]

pub mod error;
pub mod index;
pub mod map;
pub mod query;
pub mod series;
pub mod store;

pub use error::{Result, StoreError};
pub use index::{Cursor, IndexConfig, SkipList};
pub use map::{MapItem, OrderedMap, SetOutcome};
pub use query::{RangeFlags, ScoreBounds};
pub use series::TimeSeries;
pub use store::{Reply, Store, Value};
