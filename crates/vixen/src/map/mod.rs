//! Ordered map: a sorted associative container.
//!
//! Values are ordered with respect to scores (doubles) but accessed by key,
//! so the container couples two structures: a hash index for O(1) key lookup
//! and a skip list keyed by `(score, key)` for the ordered queries. The
//! bijection between the two is the container's principal invariant: every
//! hash entry has exactly one skip list node carrying the same key at the
//! same score, and vice versa. [`OrderedMap::set`] is the only code path
//! that touches both structures.

use crate::error::{Result, StoreError};
use crate::index::{IndexConfig, SkipList};
use crate::query::{self, ScoreBounds};
use std::collections::HashMap;
use tracing::debug;

/// Outcome of a set operation on either container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The key (or time) was absent and a new element was created.
    Inserted,
    /// An existing element was overwritten.
    Updated {
        /// True when the score changed and the element moved in the order.
        reordered: bool,
    },
}

/// One item of an ordered map range result. All fields are snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct MapItem {
    /// Element key.
    pub key: String,
    /// Score the element is ordered by.
    pub score: f64,
    /// Stored value.
    pub value: String,
}

#[derive(Debug)]
struct Entry {
    score: f64,
    value: String,
}

/// A sorted associative container: unique key, value, and ordering score.
#[derive(Debug)]
pub struct OrderedMap {
    entries: HashMap<String, Entry>,
    index: SkipList<String>,
}

impl Default for OrderedMap {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderedMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::with_config(IndexConfig::default())
    }

    /// Creates an empty map with a custom index configuration.
    pub fn with_config(config: IndexConfig) -> Self {
        Self {
            entries: HashMap::new(),
            index: SkipList::with_config(config),
        }
    }

    /// Number of elements, O(1).
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true when the map holds no elements.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns true when `key` is present, O(1) average.
    pub fn exists(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Value stored under `key`, O(1) average. The result is a snapshot,
    /// never an alias into internal storage.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Inserts or overwrites the element under `key`.
    ///
    /// The stored value is always replaced. When the score of an existing
    /// element changes, its skip list node is re-inserted at the new score;
    /// an unchanged score never reorders. This is the single mutation routine
    /// touching both the hash index and the skip list, which keeps the
    /// bijection invariant local.
    pub fn set(&mut self, key: &str, score: f64, value: &str) -> SetOutcome {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.value = value.to_string();
            if entry.score == score {
                return SetOutcome::Updated { reordered: false };
            }
            let old_score = entry.score;
            entry.score = score;
            debug!("score change reorders {} ({} -> {})", key, old_score, score);

            let owned = key.to_string();
            self.index
                .remove(old_score, &owned)
                .expect("hash entry without a matching index node");
            self.index.insert(score, owned);
            return SetOutcome::Updated { reordered: true };
        }

        self.entries.insert(
            key.to_string(),
            Entry {
                score,
                value: value.to_string(),
            },
        );
        self.index.insert(score, key.to_string());
        SetOutcome::Inserted
    }

    /// Key at rank 0, O(1).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyCollection`] when the map is empty.
    pub fn head(&self) -> Result<String> {
        self.index
            .first()
            .map(|c| c.payload().clone())
            .ok_or(StoreError::EmptyCollection)
    }

    /// Key at rank `len - 1`, O(1).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyCollection`] when the map is empty.
    pub fn tail(&self) -> Result<String> {
        self.index
            .last()
            .map(|c| c.payload().clone())
            .ok_or(StoreError::EmptyCollection)
    }

    /// All keys in score order.
    pub fn keys(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.len());
        let mut cursor = self.index.first();
        while let Some(c) = cursor {
            out.push(c.payload().clone());
            cursor = c.next();
        }
        out
    }

    /// All `(key, value)` pairs in score order.
    pub fn items(&self) -> Vec<(String, String)> {
        let mut out = Vec::with_capacity(self.len());
        let mut cursor = self.index.first();
        while let Some(c) = cursor {
            let key = c.payload();
            out.push((key.clone(), self.entry(key).value.clone()));
            cursor = c.next();
        }
        out
    }

    /// Elements inside the signed rank window, last rank first when
    /// `reverse`. An empty window yields an empty result, not an error.
    pub fn range_by_rank(&self, start: i64, end: i64, reverse: bool) -> Vec<MapItem> {
        query::scan_by_rank(&self.index, start, end, reverse)
            .into_iter()
            .map(|(score, key)| self.item(key, score))
            .collect()
    }

    /// Elements inside the score interval, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unsupported`] when `reverse` is requested.
    pub fn range_by_score(&self, bounds: &ScoreBounds, reverse: bool) -> Result<Vec<MapItem>> {
        let hits = query::scan_by_score(&self.index, bounds, reverse)?;
        Ok(hits
            .into_iter()
            .map(|(score, key)| self.item(key, score))
            .collect())
    }

    /// Number of elements inside the score interval.
    pub fn count_by_score(&self, bounds: &ScoreBounds) -> usize {
        query::count_by_score(&self.index, bounds)
    }

    fn item(&self, key: &str, score: f64) -> MapItem {
        MapItem {
            key: key.to_string(),
            score,
            value: self.entry(key).value.clone(),
        }
    }

    fn entry(&self, key: &str) -> &Entry {
        self.entries
            .get(key)
            .expect("index node without a matching hash entry")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OrderedMap {
        let mut map = OrderedMap::new();
        map.set("a", 1.0, "x");
        map.set("b", 2.0, "y");
        map.set("c", 3.0, "z");
        map
    }

    /// Checks the bijection invariant from the outside: every key the hash
    /// side knows shows up exactly once in rank order, at its stored score.
    fn assert_bijection(map: &OrderedMap) {
        let ranked = map.range_by_rank(0, -1, false);
        assert_eq!(ranked.len(), map.len());
        for item in &ranked {
            assert!(map.exists(&item.key));
            assert_eq!(map.get(&item.key).as_deref(), Some(item.value.as_str()));
        }
        let mut keys: Vec<_> = ranked.iter().map(|i| i.key.clone()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), map.len(), "duplicate key in the index");
    }

    #[test]
    fn test_set_reports_outcomes() {
        let mut map = OrderedMap::new();
        assert_eq!(map.set("k", 5.0, "v1"), SetOutcome::Inserted);
        assert_eq!(
            map.set("k", 5.0, "v2"),
            SetOutcome::Updated { reordered: false }
        );
        assert_eq!(
            map.set("k", 7.0, "v3"),
            SetOutcome::Updated { reordered: true }
        );
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("k").as_deref(), Some("v3"));
        assert_bijection(&map);
    }

    #[test]
    fn test_set_idempotent_on_identical_pair() {
        let mut map = sample();
        let before = map.range_by_rank(0, -1, false);
        assert_eq!(
            map.set("b", 2.0, "y"),
            SetOutcome::Updated { reordered: false }
        );
        assert_eq!(map.len(), 3);
        assert_eq!(map.range_by_rank(0, -1, false), before);
    }

    #[test]
    fn test_score_change_moves_rank() {
        let mut map = sample();
        map.set("a", 10.0, "x");
        assert_eq!(map.keys(), vec!["b", "c", "a"]);
        assert_bijection(&map);
    }

    #[test]
    fn test_get_returns_snapshot() {
        let mut map = sample();
        let mut copy = map.get("a").unwrap();
        copy.push_str("mutated");
        assert_eq!(map.get("a").as_deref(), Some("x"));
        map.set("a", 1.0, "x2");
        assert_eq!(copy, "xmutated");
    }

    #[test]
    fn test_head_tail() {
        let map = sample();
        assert_eq!(map.head().unwrap(), "a");
        assert_eq!(map.tail().unwrap(), "c");

        let empty = OrderedMap::new();
        assert!(matches!(empty.head(), Err(StoreError::EmptyCollection)));
        assert!(matches!(empty.tail(), Err(StoreError::EmptyCollection)));
    }

    #[test]
    fn test_keys_and_items_in_score_order() {
        let mut map = OrderedMap::new();
        map.set("late", 9.0, "l");
        map.set("early", 1.0, "e");
        assert_eq!(map.keys(), vec!["early", "late"]);
        assert_eq!(
            map.items(),
            vec![
                ("early".to_string(), "e".to_string()),
                ("late".to_string(), "l".to_string()),
            ]
        );
    }

    #[test]
    fn test_range_by_rank_monotone_scores() {
        let map = sample();
        let items = map.range_by_rank(0, -1, false);
        for pair in items.windows(2) {
            assert!(pair[0].score <= pair[1].score);
        }
    }

    #[test]
    fn test_range_by_rank_tail_boundary() {
        let map = sample();
        let last = map.range_by_rank(-1, -1, false);
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].key, "c");

        let empty = OrderedMap::new();
        assert!(empty.range_by_rank(-1, -1, false).is_empty());
    }

    #[test]
    fn test_range_by_score_roundtrip_with_count() {
        let map = sample();
        let bounds = ScoreBounds::inclusive(2.0, 3.0);
        let items = map.range_by_score(&bounds, false).unwrap();
        assert_eq!(
            items.iter().map(|i| i.key.as_str()).collect::<Vec<_>>(),
            vec!["b", "c"]
        );
        assert_eq!(map.count_by_score(&bounds), items.len());
    }

    #[test]
    fn test_range_by_score_reverse_unsupported() {
        let map = sample();
        assert!(matches!(
            map.range_by_score(&ScoreBounds::inclusive(0.0, 9.0), true),
            Err(StoreError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_duplicate_scores_keep_distinct_keys() {
        let mut map = OrderedMap::new();
        map.set("b", 1.0, "2");
        map.set("a", 1.0, "1");
        map.set("c", 1.0, "3");
        assert_eq!(map.len(), 3);
        // Ties order by key.
        assert_eq!(map.keys(), vec!["a", "b", "c"]);
        assert_bijection(&map);

        // Reordering one of the tied keys must touch only that key.
        map.set("b", 0.5, "2");
        assert_eq!(map.keys(), vec!["b", "a", "c"]);
        assert_bijection(&map);
    }
}
