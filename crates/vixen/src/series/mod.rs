//! Time series: values keyed and ordered by a time score.
//!
//! The container mirrors the ordered map but drops the hash index: the score
//! *is* the identity, so a single skip list holds everything and point
//! lookups are exact-score probes. At most one element exists per distinct
//! time.

use crate::error::{Result, StoreError};
use crate::index::{IndexConfig, SkipList};
use crate::map::SetOutcome;
use crate::query::{self, ScoreBounds};

/// A series of values ordered by a time-valued score.
#[derive(Debug)]
pub struct TimeSeries {
    index: SkipList<String>,
}

impl Default for TimeSeries {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSeries {
    /// Creates an empty series.
    pub fn new() -> Self {
        Self::with_config(IndexConfig::default())
    }

    /// Creates an empty series with a custom index configuration.
    pub fn with_config(config: IndexConfig) -> Self {
        Self {
            index: SkipList::with_config(config),
        }
    }

    /// Number of elements, O(1).
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true when the series holds no elements.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns true when an element exists at exactly `time`.
    pub fn exists(&self, time: f64) -> bool {
        self.index
            .first_with_score_gte(time)
            .is_some_and(|c| c.score() == time)
    }

    /// Value stored at exactly `time`. The result is a snapshot, never an
    /// alias into internal storage.
    pub fn get(&self, time: f64) -> Option<String> {
        self.index
            .first_with_score_gte(time)
            .filter(|c| c.score() == time)
            .map(|c| c.payload().clone())
    }

    /// Inserts or overwrites the element at `time`.
    ///
    /// An existing element has its value replaced in place; the identity is
    /// the time itself, so an update never reorders.
    pub fn set(&mut self, time: f64, value: &str) -> SetOutcome {
        if let Some(stored) = self.index.payload_mut_at_score(time) {
            *stored = value.to_string();
            return SetOutcome::Updated { reordered: false };
        }
        self.index.insert(time, value.to_string());
        SetOutcome::Inserted
    }

    /// Zero-based rank of the element at exactly `time`, or `None` when no
    /// element carries that time.
    pub fn rank(&self, time: f64) -> Option<usize> {
        self.index.rank_of_score(time)
    }

    /// Value at rank 0, O(1).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyCollection`] when the series is empty.
    pub fn head(&self) -> Result<String> {
        self.index
            .first()
            .map(|c| c.payload().clone())
            .ok_or(StoreError::EmptyCollection)
    }

    /// Value at rank `len - 1`, O(1).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyCollection`] when the series is empty.
    pub fn tail(&self) -> Result<String> {
        self.index
            .last()
            .map(|c| c.payload().clone())
            .ok_or(StoreError::EmptyCollection)
    }

    /// `(time, value)` pairs inside the signed rank window, last rank first
    /// when `reverse`. An empty window yields an empty result, not an error.
    pub fn range_by_rank(&self, start: i64, end: i64, reverse: bool) -> Vec<(f64, String)> {
        query::scan_by_rank(&self.index, start, end, reverse)
            .into_iter()
            .map(|(time, value)| (time, value.clone()))
            .collect()
    }

    /// `(time, value)` pairs inside the time interval, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unsupported`] when `reverse` is requested.
    pub fn range_by_time(&self, bounds: &ScoreBounds, reverse: bool) -> Result<Vec<(f64, String)>> {
        let hits = query::scan_by_score(&self.index, bounds, reverse)?;
        Ok(hits
            .into_iter()
            .map(|(time, value)| (time, value.clone()))
            .collect())
    }

    /// Number of elements inside the time interval.
    pub fn count_by_time(&self, bounds: &ScoreBounds) -> usize {
        query::count_by_score(&self.index, bounds)
    }
}
