//! Ordered index primitives shared by the map and time series containers.

pub mod skiplist;

pub use skiplist::{Cursor, IndexConfig, SkipList};
