//! Shared range query engine.
//!
//! Both store value types answer the same four query modes (point lookup,
//! rank-range, score-range, and count), so the normalization, argument
//! grammar, and skip list traversals live here and the containers only shape
//! the results.
//!
//! # Argument grammar
//!
//! Rank bounds are signed indices; negative values count from the end
//! (`-1` is the last element). Score bounds parse from strings; a leading
//! `(` marks an exclusive bound and the usual `inf`/`+inf`/`-inf` spellings
//! are accepted. NaN never enters the engine: it is rejected at parse time.

use crate::error::{Result, StoreError};
use crate::index::SkipList;

/// Output inclusion flags for range replies.
///
/// Defaults to values-only, matching a range call with no option tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeFlags {
    /// Emit the score (the time, for a series) of each item.
    pub with_scores: bool,
    /// Emit the value of each item.
    pub with_values: bool,
}

impl Default for RangeFlags {
    fn default() -> Self {
        Self {
            with_scores: false,
            with_values: true,
        }
    }
}

impl RangeFlags {
    /// Parses trailing option tokens of a range command.
    ///
    /// Recognized (ASCII case-insensitive): `WITHSCORES`/`WITHTIMES`,
    /// `WITHVALUES`, `WITHALL` (both), and `NOVALUES` (scores only).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Syntax`] on any other token.
    pub fn parse(tokens: &[&str]) -> Result<Self> {
        let mut flags = Self::default();
        for token in tokens {
            if token.eq_ignore_ascii_case("withscores") || token.eq_ignore_ascii_case("withtimes")
            {
                flags.with_scores = true;
            } else if token.eq_ignore_ascii_case("withvalues") {
                flags.with_values = true;
            } else if token.eq_ignore_ascii_case("withall") {
                flags.with_scores = true;
                flags.with_values = true;
            } else if token.eq_ignore_ascii_case("novalues") {
                flags.with_scores = true;
                flags.with_values = false;
            } else {
                return Err(StoreError::Syntax {
                    token: token.to_string(),
                });
            }
        }
        Ok(flags)
    }
}

/// A score interval with independently inclusive or exclusive ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBounds {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
    /// Elements must score strictly above `min`.
    pub min_exclusive: bool,
    /// Elements must score strictly below `max`.
    pub max_exclusive: bool,
}

impl ScoreBounds {
    /// An interval including both ends.
    pub fn inclusive(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            min_exclusive: false,
            max_exclusive: false,
        }
    }

    /// Parses a `(min, max)` pair of bound arguments.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidNumber`] when either argument is not a
    /// double (NaN included).
    pub fn parse(min: &str, max: &str) -> Result<Self> {
        let (min, min_exclusive) = Self::parse_bound(min)?;
        let (max, max_exclusive) = Self::parse_bound(max)?;
        Ok(Self {
            min,
            max,
            min_exclusive,
            max_exclusive,
        })
    }

    fn parse_bound(input: &str) -> Result<(f64, bool)> {
        match input.strip_prefix('(') {
            Some(rest) => {
                // Report the whole argument on failure, prefix included.
                let value = parse_score(rest).map_err(|_| StoreError::InvalidNumber {
                    input: input.to_string(),
                })?;
                Ok((value, true))
            }
            None => Ok((parse_score(input)?, false)),
        }
    }

    fn accepts_max(&self, score: f64) -> bool {
        if self.max_exclusive {
            score < self.max
        } else {
            score <= self.max
        }
    }
}

/// Parses a score or time argument.
///
/// # Errors
///
/// Returns [`StoreError::InvalidNumber`] when the argument is not a double or
/// is NaN.
pub(crate) fn parse_score(input: &str) -> Result<f64> {
    let value: f64 = input.parse().map_err(|_| StoreError::InvalidNumber {
        input: input.to_string(),
    })?;
    if value.is_nan() {
        return Err(StoreError::InvalidNumber {
            input: input.to_string(),
        });
    }
    // Collapse -0.0 so numeric equality and the index's total order agree.
    Ok(if value == 0.0 { 0.0 } else { value })
}

/// Normalizes a signed rank window against a sequence of `len` elements.
///
/// Returns the zero-based start rank and the result count, or `None` when the
/// window is empty. An empty window is a valid result, not an error.
pub(crate) fn rank_window(len: usize, start: i64, end: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let mut start = if start < 0 { start + len } else { start };
    let mut end = if end < 0 { end + len } else { end };
    if start < 0 {
        start = 0;
    }
    if start > end || start >= len {
        return None;
    }
    if end >= len {
        end = len - 1;
    }
    Some((start as usize, (end - start + 1) as usize))
}

/// Walks a normalized rank window and yields `(score, payload)` pairs, last
/// rank first when `reverse`.
///
/// The start node is located in O(1) when the window begins at the trivial
/// end, otherwise through an O(log N) rank descent.
pub(crate) fn scan_by_rank<'a, T: Ord>(
    list: &'a SkipList<T>,
    start: i64,
    end: i64,
    reverse: bool,
) -> Vec<(f64, &'a T)> {
    let Some((first_rank, count)) = rank_window(list.len(), start, end) else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(count);
    if reverse {
        let mut cursor = if first_rank == 0 {
            list.last()
        } else {
            list.get_by_rank(list.len() - 1 - first_rank)
        };
        for _ in 0..count {
            let Some(c) = cursor else { break };
            out.push((c.score(), c.payload()));
            cursor = c.prev();
        }
    } else {
        let mut cursor = if first_rank == 0 {
            list.first()
        } else {
            list.get_by_rank(first_rank)
        };
        for _ in 0..count {
            let Some(c) = cursor else { break };
            out.push((c.score(), c.payload()));
            cursor = c.next();
        }
    }
    out
}

/// Walks a score interval in ascending order and yields `(score, payload)`
/// pairs. Ascending order guarantees no element matches past the first max
/// bound violation, so the walk stops there.
///
/// # Errors
///
/// Returns [`StoreError::Unsupported`] when `reverse` is requested; a
/// descending score walk would silently mis-order results otherwise.
pub(crate) fn scan_by_score<'a, T: Ord>(
    list: &'a SkipList<T>,
    bounds: &ScoreBounds,
    reverse: bool,
) -> Result<Vec<(f64, &'a T)>> {
    if reverse {
        return Err(StoreError::Unsupported {
            operation: "reverse score range".to_string(),
        });
    }

    let mut out = Vec::new();
    let mut cursor = list.seek_min(bounds.min, bounds.min_exclusive);
    while let Some(c) = cursor {
        if !bounds.accepts_max(c.score()) {
            break;
        }
        out.push((c.score(), c.payload()));
        cursor = c.next();
    }
    Ok(out)
}

/// Counts the elements inside a score interval without materializing them.
pub(crate) fn count_by_score<T: Ord>(list: &SkipList<T>, bounds: &ScoreBounds) -> usize {
    let mut count = 0;
    let mut cursor = list.seek_min(bounds.min, bounds.min_exclusive);
    while let Some(c) = cursor {
        if !bounds.accepts_max(c.score()) {
            break;
        }
        count += 1;
        cursor = c.next();
    }
    count
}
