//! Probabilistic skip list with rank support.
//!
//! This module provides the ordered index backing both store value types.
//! Nodes are ordered by `(score, payload)` so duplicate scores keep a stable
//! total order, and every forward link carries a span (the number of bottom
//! level hops it covers), which makes rank queries O(log N).
//!
//! # Structure
//!
//! ```text
//! Level 2: HEAD ----------------> C ----------------------> NIL
//! Level 1: HEAD ------> A ------> C ----------> E --------> NIL
//! Level 0: HEAD -> A -> B -> C -> D -> E -> NIL   (backward chain here)
//! ```
//!
//! Nodes live in an arena (`Vec`) addressed by stable `u32` indices with a
//! free list for slot reuse; no node pointer ever escapes the structure.
//! Callers navigate through the read-only [`Cursor`] type instead.

use crate::error::{Result, StoreError};
use std::cmp::Ordering;

/// Default cap on node levels. 32 levels cover billions of elements.
pub const DEFAULT_MAX_LEVEL: usize = 32;

/// Default probability of promoting a node one level higher.
pub const DEFAULT_PROMOTE_PROBABILITY: f64 = 0.25;

/// Node index type.
type Idx = u32;

/// Null index marker. Doubles as "header" when used as a position.
const NIL: Idx = Idx::MAX;

/// Configuration for skip list level generation.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Maximum number of levels a node may occupy. Default: 32.
    pub max_level: usize,
    /// Probability that a node is promoted one level higher. Default: 0.25.
    pub promote_probability: f64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_level: DEFAULT_MAX_LEVEL,
            promote_probability: DEFAULT_PROMOTE_PROBABILITY,
        }
    }
}

impl IndexConfig {
    /// Creates a configuration with a custom level cap.
    pub fn with_max_level(mut self, max_level: usize) -> Self {
        self.max_level = max_level;
        self
    }

    /// Creates a configuration with a custom promotion probability.
    pub fn with_promote_probability(mut self, probability: f64) -> Self {
        self.promote_probability = probability;
        self
    }
}

/// A forward link at one level: target node plus the number of bottom-level
/// hops the link covers.
#[derive(Debug, Clone, Copy)]
struct Link {
    forward: Idx,
    span: usize,
}

impl Link {
    const fn empty() -> Self {
        Self {
            forward: NIL,
            span: 0,
        }
    }
}

#[derive(Debug)]
struct Node<T> {
    score: f64,
    payload: T,
    /// Level-0 predecessor; NIL when this is the first node.
    backward: Idx,
    links: Vec<Link>,
}

/// Probabilistic ordered index over `(score, payload)` pairs.
///
/// Scores are ordered by `f64::total_cmp`; ties are broken by the payload's
/// `Ord`. Removal requires the exact pair used at insert, so duplicate scores
/// never make a delete ambiguous.
#[derive(Debug)]
pub struct SkipList<T> {
    /// Header sentinel links, one per possible level.
    head: Vec<Link>,
    /// Node arena; vacated slots are recycled through `free`.
    nodes: Vec<Option<Node<T>>>,
    free: Vec<Idx>,
    tail: Idx,
    length: usize,
    /// Highest level currently in use (always >= 1).
    level: usize,
    config: IndexConfig,
}

impl<T: Ord> Default for SkipList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> SkipList<T> {
    /// Creates an empty skip list with the default configuration.
    pub fn new() -> Self {
        Self::with_config(IndexConfig::default())
    }

    /// Creates an empty skip list with a custom configuration.
    pub fn with_config(config: IndexConfig) -> Self {
        let max_level = config.max_level.max(1);
        Self {
            head: vec![Link::empty(); max_level],
            nodes: Vec::new(),
            free: Vec::new(),
            tail: NIL,
            length: 0,
            level: 1,
            config: IndexConfig { max_level, ..config },
        }
    }

    /// Number of elements in the list.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns true when the list holds no elements.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Cursor at the lowest-ranked element, O(1).
    pub fn first(&self) -> Option<Cursor<'_, T>> {
        self.cursor(self.head[0].forward)
    }

    /// Cursor at the highest-ranked element, O(1).
    pub fn last(&self) -> Option<Cursor<'_, T>> {
        self.cursor(self.tail)
    }

    /// Inserts a `(score, payload)` pair.
    ///
    /// The caller guarantees the exact pair is not already present; the map
    /// enforces this through its hash index and the time series through its
    /// exact-score probe.
    pub fn insert(&mut self, score: f64, payload: T) {
        let max_level = self.config.max_level;
        let mut update = vec![NIL; max_level];
        let mut rank = vec![0usize; max_level];

        let mut x = NIL;
        for level in (0..self.level).rev() {
            rank[level] = if level == self.level - 1 {
                0
            } else {
                rank[level + 1]
            };
            loop {
                let link = self.link(x, level);
                if link.forward == NIL {
                    break;
                }
                if !Self::precedes(self.node(link.forward), score, &payload) {
                    break;
                }
                rank[level] += link.span;
                x = link.forward;
            }
            update[level] = x;
        }

        let node_level = self.random_level();
        if node_level > self.level {
            for level in self.level..node_level {
                rank[level] = 0;
                update[level] = NIL;
                self.head[level].span = self.length;
            }
            self.level = node_level;
        }

        let idx = self.alloc(score, payload, node_level);
        for level in 0..node_level {
            let pred = self.link(update[level], level);
            let stepped = rank[0] - rank[level];
            self.node_mut(idx).links[level] = Link {
                forward: pred.forward,
                span: pred.span - stepped,
            };
            self.set_link(
                update[level],
                level,
                Link {
                    forward: idx,
                    span: stepped + 1,
                },
            );
        }
        // Levels above the new node just gained one element under their links.
        for level in node_level..self.level {
            let mut link = self.link(update[level], level);
            link.span += 1;
            self.set_link(update[level], level, link);
        }

        self.node_mut(idx).backward = update[0];
        let after = self.node(idx).links[0].forward;
        if after == NIL {
            self.tail = idx;
        } else {
            self.node_mut(after).backward = idx;
        }
        self.length += 1;
    }

    /// Removes the exact `(score, payload)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the exact pair is absent. An
    /// absent pair is a caller contract violation and is never silently
    /// ignored.
    pub fn remove(&mut self, score: f64, payload: &T) -> Result<()> {
        let mut update = vec![NIL; self.level];
        let mut x = NIL;
        for level in (0..self.level).rev() {
            loop {
                let link = self.link(x, level);
                if link.forward == NIL {
                    break;
                }
                if !Self::precedes(self.node(link.forward), score, payload) {
                    break;
                }
                x = link.forward;
            }
            update[level] = x;
        }

        let target = self.link(update[0], 0).forward;
        if target == NIL {
            return Err(StoreError::NotFound);
        }
        {
            let node = self.node(target);
            if node.score != score || node.payload != *payload {
                return Err(StoreError::NotFound);
            }
        }

        for level in 0..self.level {
            let link = self.link(update[level], level);
            if link.forward == target {
                let removed = self.node(target).links[level];
                self.set_link(
                    update[level],
                    level,
                    Link {
                        forward: removed.forward,
                        span: link.span + removed.span - 1,
                    },
                );
            } else {
                self.set_link(
                    update[level],
                    level,
                    Link {
                        forward: link.forward,
                        span: link.span - 1,
                    },
                );
            }
        }

        let (after, before) = {
            let node = self.node(target);
            (node.links[0].forward, node.backward)
        };
        if after == NIL {
            self.tail = before;
        } else {
            self.node_mut(after).backward = before;
        }
        while self.level > 1 && self.head[self.level - 1].forward == NIL {
            self.level -= 1;
        }
        self.length -= 1;
        self.nodes[target as usize] = None;
        self.free.push(target);
        Ok(())
    }

    /// Cursor at the first element with score >= `score`.
    pub fn first_with_score_gte(&self, score: f64) -> Option<Cursor<'_, T>> {
        self.seek_min(score, false)
    }

    /// Cursor at the first element satisfying the min bound: score >= `min`,
    /// or score > `min` when `exclusive`.
    pub(crate) fn seek_min(&self, min: f64, exclusive: bool) -> Option<Cursor<'_, T>> {
        let mut x = NIL;
        for level in (0..self.level).rev() {
            loop {
                let link = self.link(x, level);
                if link.forward == NIL {
                    break;
                }
                let order = self.node(link.forward).score.total_cmp(&min);
                let below = if exclusive {
                    order != Ordering::Greater
                } else {
                    order == Ordering::Less
                };
                if !below {
                    break;
                }
                x = link.forward;
            }
        }
        self.cursor(self.link(x, 0).forward)
    }

    /// Cursor at the element with zero-based rank `rank`, using spans to
    /// descend in O(log N).
    pub fn get_by_rank(&self, rank: usize) -> Option<Cursor<'_, T>> {
        if rank >= self.length {
            return None;
        }
        let target = rank + 1;
        let mut traversed = 0usize;
        let mut x = NIL;
        for level in (0..self.level).rev() {
            loop {
                let link = self.link(x, level);
                if link.forward == NIL || traversed + link.span > target {
                    break;
                }
                traversed += link.span;
                x = link.forward;
            }
            if traversed == target {
                return self.cursor(x);
            }
        }
        None
    }

    /// Zero-based rank of the first element with exactly `score`, or `None`
    /// when no element carries that score.
    pub fn rank_of_score(&self, score: f64) -> Option<usize> {
        let mut rank = 0usize;
        let mut x = NIL;
        for level in (0..self.level).rev() {
            loop {
                let link = self.link(x, level);
                if link.forward == NIL {
                    break;
                }
                if self.node(link.forward).score.total_cmp(&score) != Ordering::Less {
                    break;
                }
                rank += link.span;
                x = link.forward;
            }
        }
        let idx = self.link(x, 0).forward;
        (idx != NIL && self.node(idx).score == score).then_some(rank)
    }

    /// Mutable access to the payload of the first element with exactly
    /// `score`. The order key is untouched, so this cannot disturb the index;
    /// crate-internal because payload mutation could still reorder duplicate
    /// score ties.
    pub(crate) fn payload_mut_at_score(&mut self, score: f64) -> Option<&mut T> {
        let mut x = NIL;
        for level in (0..self.level).rev() {
            loop {
                let link = self.link(x, level);
                if link.forward == NIL {
                    break;
                }
                if self.node(link.forward).score.total_cmp(&score) != Ordering::Less {
                    break;
                }
                x = link.forward;
            }
        }
        let idx = self.link(x, 0).forward;
        if idx != NIL && self.node(idx).score == score {
            Some(&mut self.node_mut(idx).payload)
        } else {
            None
        }
    }

    /// Strict weak ordering: does `node` sort before `(score, payload)`?
    fn precedes(node: &Node<T>, score: f64, payload: &T) -> bool {
        match node.score.total_cmp(&score) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => node.payload < *payload,
        }
    }

    fn random_level(&self) -> usize {
        let mut level = 1;
        while level < self.config.max_level
            && rand::random::<f64>() < self.config.promote_probability
        {
            level += 1;
        }
        level
    }

    fn alloc(&mut self, score: f64, payload: T, level: usize) -> Idx {
        let node = Node {
            score,
            payload,
            backward: NIL,
            links: vec![Link::empty(); level],
        };
        if let Some(idx) = self.free.pop() {
            self.nodes[idx as usize] = Some(node);
            idx
        } else {
            let idx = self.nodes.len() as Idx;
            self.nodes.push(Some(node));
            idx
        }
    }

    fn node(&self, idx: Idx) -> &Node<T> {
        self.nodes[idx as usize]
            .as_ref()
            .expect("stale skip list node index")
    }

    fn node_mut(&mut self, idx: Idx) -> &mut Node<T> {
        self.nodes[idx as usize]
            .as_mut()
            .expect("stale skip list node index")
    }

    /// Link at `level` leaving position `at`; NIL addresses the header.
    fn link(&self, at: Idx, level: usize) -> Link {
        if at == NIL {
            self.head[level]
        } else {
            self.node(at).links[level]
        }
    }

    fn set_link(&mut self, at: Idx, level: usize, link: Link) {
        if at == NIL {
            self.head[level] = link;
        } else {
            self.node_mut(at).links[level] = link;
        }
    }

    fn cursor(&self, idx: Idx) -> Option<Cursor<'_, T>> {
        (idx != NIL).then_some(Cursor { list: self, idx })
    }
}

/// Read-only position in a [`SkipList`].
///
/// Cursors are the only public navigation surface; they never expose internal
/// node storage.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a, T> {
    list: &'a SkipList<T>,
    idx: Idx,
}

impl<'a, T: Ord> Cursor<'a, T> {
    /// Score of the element under the cursor.
    pub fn score(&self) -> f64 {
        self.list.node(self.idx).score
    }

    /// Payload of the element under the cursor.
    pub fn payload(&self) -> &'a T {
        &self.list.node(self.idx).payload
    }

    /// Cursor at the next element in score order.
    pub fn next(&self) -> Option<Cursor<'a, T>> {
        self.list.cursor(self.list.node(self.idx).links[0].forward)
    }

    /// Cursor at the previous element, via the level-0 backward chain.
    pub fn prev(&self) -> Option<Cursor<'a, T>> {
        self.list.cursor(self.list.node(self.idx).backward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl<T: Ord + std::fmt::Debug> SkipList<T> {
        /// Walks the whole structure and checks every invariant the queries
        /// rely on: length, level-0 ordering, backward chain, tail, and the
        /// span of every reachable link.
        fn assert_valid(&self) {
            // Level-0 ordering, backward chain, and length.
            let mut count = 0;
            let mut prev = NIL;
            let mut idx = self.head[0].forward;
            while idx != NIL {
                let node = self.node(idx);
                assert_eq!(node.backward, prev, "broken backward chain");
                if prev != NIL {
                    let p = self.node(prev);
                    assert!(
                        Self::precedes(p, node.score, &node.payload),
                        "level 0 out of order: {:?} !< {:?}",
                        (p.score, &p.payload),
                        (node.score, &node.payload),
                    );
                }
                prev = idx;
                idx = node.links[0].forward;
                count += 1;
            }
            assert_eq!(count, self.length, "length does not match level-0 walk");
            assert_eq!(self.tail, prev, "tail does not match last node");

            // Each reachable link's span equals its level-0 hop count.
            for level in 0..self.level {
                let mut at = NIL;
                loop {
                    let link = self.link(at, level);
                    if link.forward == NIL {
                        break;
                    }
                    assert_eq!(
                        link.span,
                        self.hops_between(at, link.forward),
                        "bad span at level {level}"
                    );
                    at = link.forward;
                }
            }
        }

        fn hops_between(&self, from: Idx, to: Idx) -> usize {
            let mut hops = 0;
            let mut idx = if from == NIL {
                self.head[0].forward
            } else {
                self.node(from).links[0].forward
            };
            loop {
                hops += 1;
                if idx == to {
                    return hops;
                }
                idx = self.node(idx).links[0].forward;
            }
        }
    }

    fn sample() -> SkipList<String> {
        let mut list = SkipList::new();
        for (score, member) in [(3.0, "c"), (1.0, "a"), (2.0, "b"), (5.0, "e"), (4.0, "d")] {
            list.insert(score, member.to_string());
        }
        list
    }

    #[test]
    fn test_insert_orders_by_score() {
        let list = sample();
        list.assert_valid();

        let mut seen = Vec::new();
        let mut cur = list.first();
        while let Some(c) = cur {
            seen.push((c.score(), c.payload().clone()));
            cur = c.next();
        }
        assert_eq!(
            seen,
            vec![
                (1.0, "a".to_string()),
                (2.0, "b".to_string()),
                (3.0, "c".to_string()),
                (4.0, "d".to_string()),
                (5.0, "e".to_string()),
            ]
        );
    }

    #[test]
    fn test_duplicate_scores_break_ties_by_payload() {
        let mut list = SkipList::new();
        list.insert(1.0, "b".to_string());
        list.insert(1.0, "a".to_string());
        list.insert(1.0, "c".to_string());
        list.assert_valid();

        let first = list.first().unwrap();
        assert_eq!(first.payload(), "a");
        assert_eq!(first.next().unwrap().payload(), "b");
        assert_eq!(list.last().unwrap().payload(), "c");
    }

    #[test]
    fn test_remove_requires_exact_pair() {
        let mut list = sample();

        // Right score, wrong member.
        assert!(matches!(
            list.remove(2.0, &"z".to_string()),
            Err(StoreError::NotFound)
        ));
        // Wrong score, right member.
        assert!(matches!(
            list.remove(9.0, &"b".to_string()),
            Err(StoreError::NotFound)
        ));
        assert_eq!(list.len(), 5);

        list.remove(2.0, &"b".to_string()).unwrap();
        list.assert_valid();
        assert_eq!(list.len(), 4);
        assert!(list.rank_of_score(2.0).is_none());
    }

    #[test]
    fn test_remove_head_and_tail_update_ends() {
        let mut list = sample();
        list.remove(1.0, &"a".to_string()).unwrap();
        list.remove(5.0, &"e".to_string()).unwrap();
        list.assert_valid();

        assert_eq!(list.first().unwrap().payload(), "b");
        assert_eq!(list.last().unwrap().payload(), "d");
    }

    #[test]
    fn test_get_by_rank() {
        let list = sample();
        for (rank, member) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            assert_eq!(list.get_by_rank(rank).unwrap().payload(), member);
        }
        assert!(list.get_by_rank(5).is_none());
    }

    #[test]
    fn test_rank_of_score() {
        let list = sample();
        assert_eq!(list.rank_of_score(1.0), Some(0));
        assert_eq!(list.rank_of_score(4.0), Some(3));
        assert_eq!(list.rank_of_score(4.5), None);
        assert_eq!(SkipList::<String>::new().rank_of_score(1.0), None);
    }

    #[test]
    fn test_rank_of_duplicate_score_is_first() {
        let mut list = SkipList::new();
        list.insert(1.0, "a".to_string());
        list.insert(2.0, "b".to_string());
        list.insert(2.0, "c".to_string());
        assert_eq!(list.rank_of_score(2.0), Some(1));
    }

    #[test]
    fn test_first_with_score_gte() {
        let list = sample();
        assert_eq!(list.first_with_score_gte(2.5).unwrap().payload(), "c");
        assert_eq!(list.first_with_score_gte(3.0).unwrap().payload(), "c");
        assert!(list.first_with_score_gte(5.5).is_none());
    }

    #[test]
    fn test_seek_min_exclusive_skips_equal_scores() {
        let mut list = SkipList::new();
        list.insert(1.0, "a".to_string());
        list.insert(1.0, "b".to_string());
        list.insert(2.0, "c".to_string());

        assert_eq!(list.seek_min(1.0, true).unwrap().payload(), "c");
        assert_eq!(list.seek_min(1.0, false).unwrap().payload(), "a");
    }

    #[test]
    fn test_payload_mut_at_score() {
        let mut list = SkipList::new();
        list.insert(10.0, "old".to_string());

        *list.payload_mut_at_score(10.0).unwrap() = "new".to_string();
        assert_eq!(list.first().unwrap().payload(), "new");
        assert!(list.payload_mut_at_score(11.0).is_none());
        list.assert_valid();
    }

    #[test]
    fn test_backward_walk_from_tail() {
        let list = sample();
        let mut seen = Vec::new();
        let mut cur = list.last();
        while let Some(c) = cur {
            seen.push(c.payload().clone());
            cur = c.prev();
        }
        assert_eq!(seen, vec!["e", "d", "c", "b", "a"]);
    }

    #[test]
    fn test_slot_reuse_keeps_structure_valid() {
        let mut list = SkipList::new();
        for i in 0..64 {
            list.insert(i as f64, format!("m{i}"));
        }
        for i in (0..64).step_by(2) {
            list.remove(i as f64, &format!("m{i}")).unwrap();
        }
        for i in 0..32 {
            list.insert(1000.0 + i as f64, format!("r{i}"));
        }
        list.assert_valid();
        assert_eq!(list.len(), 64);
        assert_eq!(list.get_by_rank(0).unwrap().payload(), "m1");
    }

    #[test]
    fn test_level_cap_respected() {
        let config = IndexConfig::default()
            .with_max_level(2)
            .with_promote_probability(1.0);
        let mut list = SkipList::with_config(config);
        for i in 0..100 {
            list.insert(i as f64, i);
        }
        list.assert_valid();
        assert_eq!(list.len(), 100);
        assert_eq!(*list.get_by_rank(99).unwrap().payload(), 99);
    }

    #[test]
    fn test_empty_list_queries() {
        let list: SkipList<String> = SkipList::new();
        assert!(list.is_empty());
        assert!(list.first().is_none());
        assert!(list.last().is_none());
        assert!(list.get_by_rank(0).is_none());
        assert!(list.first_with_score_gte(0.0).is_none());
    }
}
