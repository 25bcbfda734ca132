//! Type-specific command execution over the store.
//!
//! Arguments arrive pre-tokenized from the host dispatcher; scores and times
//! arrive as strings and are parsed here so the argument grammar (exclusive
//! `(` bounds, infinities, NaN rejection) lives in one place. Multi-tuple
//! mutations are all-or-nothing: every tuple is validated before the first
//! one is applied, and a malformed ADD never creates the instance.

use crate::error::{Result, StoreError};
use crate::map::{MapItem, OrderedMap};
use crate::query::{self, RangeFlags, ScoreBounds};
use crate::series::TimeSeries;
use crate::store::{Store, Value};
use tracing::debug;

/// Reply shapes the host turns into wire replies. No framing happens here.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Simple acknowledgement.
    Ok,
    /// Absent value.
    Nil,
    /// Integer reply (lengths, counts, ranks, booleans).
    Integer(i64),
    /// Score or time reply.
    Double(f64),
    /// Bulk string reply.
    Bulk(String),
    /// Ordered multi-item reply.
    Multi(Vec<Reply>),
}

impl Store {
    // ------------------------------------------------------------------
    // Ordered map commands
    // ------------------------------------------------------------------

    /// MLEN: number of elements; 0 for a missing key.
    pub fn map_len(&self, key: &str) -> Result<Reply> {
        let len = self.expect_map(key)?.map_or(0, OrderedMap::len);
        Ok(Reply::Integer(len as i64))
    }

    /// MEXISTS: 1 when `field` is present, else 0.
    pub fn map_exists(&self, key: &str, field: &str) -> Result<Reply> {
        let exists = self.expect_map(key)?.is_some_and(|m| m.exists(field));
        Ok(Reply::Integer(exists as i64))
    }

    /// MGET: value stored under `field`, or nil.
    pub fn map_get(&self, key: &str, field: &str) -> Result<Reply> {
        match self.expect_map(key)?.and_then(|m| m.get(field)) {
            Some(value) => Ok(Reply::Bulk(value)),
            None => Ok(Reply::Nil),
        }
    }

    /// MADD: repeating `score field value` tuples, all-or-nothing.
    pub fn map_add(&mut self, key: &str, args: &[&str]) -> Result<Reply> {
        if args.is_empty() || args.len() % 3 != 0 {
            return Err(StoreError::Arity {
                command: "MADD".to_string(),
            });
        }
        // Type check precedes argument parsing; nothing is created yet.
        self.expect_map(key)?;
        let mut tuples = Vec::with_capacity(args.len() / 3);
        for chunk in args.chunks_exact(3) {
            tuples.push((query::parse_score(chunk[0])?, chunk[1], chunk[2]));
        }

        let map = self.map_for_write(key)?;
        for (score, field, value) in tuples {
            map.set(field, score, value);
        }
        self.touch(key);
        Ok(Reply::Ok)
    }

    /// MHEAD: key at rank 0.
    pub fn map_head(&self, key: &str) -> Result<Reply> {
        let map = self.expect_map(key)?.ok_or(StoreError::EmptyCollection)?;
        Ok(Reply::Bulk(map.head()?))
    }

    /// MTAIL: key at the last rank.
    pub fn map_tail(&self, key: &str) -> Result<Reply> {
        let map = self.expect_map(key)?.ok_or(StoreError::EmptyCollection)?;
        Ok(Reply::Bulk(map.tail()?))
    }

    /// MKEYS: all keys in score order.
    pub fn map_keys(&self, key: &str) -> Result<Reply> {
        let keys = self.expect_map(key)?.map_or_else(Vec::new, |m| m.keys());
        Ok(Reply::Multi(keys.into_iter().map(Reply::Bulk).collect()))
    }

    /// MITEMS: all `(key, value)` pairs in score order.
    pub fn map_items(&self, key: &str) -> Result<Reply> {
        let items = self.expect_map(key)?.map_or_else(Vec::new, |m| m.items());
        let mut out = Vec::with_capacity(items.len() * 2);
        for (field, value) in items {
            out.push(Reply::Bulk(field));
            out.push(Reply::Bulk(value));
        }
        Ok(Reply::Multi(out))
    }

    /// MRANGE: elements inside the signed rank window.
    pub fn map_range(&self, key: &str, start: i64, end: i64, options: &[&str]) -> Result<Reply> {
        let flags = RangeFlags::parse(options)?;
        let Some(map) = self.expect_map(key)? else {
            return Ok(Reply::Multi(Vec::new()));
        };
        Ok(shape_map_items(map.range_by_rank(start, end, false), flags))
    }

    /// MRANGEBYSCORE: elements inside the score interval.
    pub fn map_range_by_score(
        &self,
        key: &str,
        min: &str,
        max: &str,
        options: &[&str],
    ) -> Result<Reply> {
        let bounds = ScoreBounds::parse(min, max)?;
        let flags = RangeFlags::parse(options)?;
        let Some(map) = self.expect_map(key)? else {
            return Ok(Reply::Multi(Vec::new()));
        };
        Ok(shape_map_items(map.range_by_score(&bounds, false)?, flags))
    }

    /// MCOUNT: number of elements inside the score interval.
    pub fn map_count(&self, key: &str, min: &str, max: &str) -> Result<Reply> {
        let bounds = ScoreBounds::parse(min, max)?;
        let count = self
            .expect_map(key)?
            .map_or(0, |m| m.count_by_score(&bounds));
        Ok(Reply::Integer(count as i64))
    }

    // ------------------------------------------------------------------
    // Time series commands
    // ------------------------------------------------------------------

    /// TLEN: number of elements; 0 for a missing key.
    pub fn series_len(&self, key: &str) -> Result<Reply> {
        let len = self.expect_series(key)?.map_or(0, TimeSeries::len);
        Ok(Reply::Integer(len as i64))
    }

    /// TEXISTS: 1 when an element exists at exactly `time`, else 0.
    pub fn series_exists(&self, key: &str, time: &str) -> Result<Reply> {
        let time = query::parse_score(time)?;
        let exists = self.expect_series(key)?.is_some_and(|s| s.exists(time));
        Ok(Reply::Integer(exists as i64))
    }

    /// TGET: value stored at exactly `time`, or nil.
    pub fn series_get(&self, key: &str, time: &str) -> Result<Reply> {
        let time = query::parse_score(time)?;
        match self.expect_series(key)?.and_then(|s| s.get(time)) {
            Some(value) => Ok(Reply::Bulk(value)),
            None => Ok(Reply::Nil),
        }
    }

    /// TADD: repeating `time value` tuples, all-or-nothing.
    pub fn series_add(&mut self, key: &str, args: &[&str]) -> Result<Reply> {
        if args.is_empty() || args.len() % 2 != 0 {
            return Err(StoreError::Arity {
                command: "TADD".to_string(),
            });
        }
        self.expect_series(key)?;
        let mut tuples = Vec::with_capacity(args.len() / 2);
        for chunk in args.chunks_exact(2) {
            tuples.push((query::parse_score(chunk[0])?, chunk[1]));
        }

        let series = self.series_for_write(key)?;
        for (time, value) in tuples {
            series.set(time, value);
        }
        self.touch(key);
        Ok(Reply::Ok)
    }

    /// THEAD: value at rank 0.
    pub fn series_head(&self, key: &str) -> Result<Reply> {
        let series = self
            .expect_series(key)?
            .ok_or(StoreError::EmptyCollection)?;
        Ok(Reply::Bulk(series.head()?))
    }

    /// TTAIL: value at the last rank.
    pub fn series_tail(&self, key: &str) -> Result<Reply> {
        let series = self
            .expect_series(key)?
            .ok_or(StoreError::EmptyCollection)?;
        Ok(Reply::Bulk(series.tail()?))
    }

    /// TRANGE: elements inside the signed rank window.
    pub fn series_range(
        &self,
        key: &str,
        start: i64,
        end: i64,
        options: &[&str],
    ) -> Result<Reply> {
        let flags = RangeFlags::parse(options)?;
        let Some(series) = self.expect_series(key)? else {
            return Ok(Reply::Multi(Vec::new()));
        };
        Ok(shape_series_items(
            series.range_by_rank(start, end, false),
            flags,
        ))
    }

    /// TRANGEBYTIME: elements inside the time interval.
    pub fn series_range_by_time(
        &self,
        key: &str,
        min: &str,
        max: &str,
        options: &[&str],
    ) -> Result<Reply> {
        let bounds = ScoreBounds::parse(min, max)?;
        let flags = RangeFlags::parse(options)?;
        let Some(series) = self.expect_series(key)? else {
            return Ok(Reply::Multi(Vec::new()));
        };
        Ok(shape_series_items(
            series.range_by_time(&bounds, false)?,
            flags,
        ))
    }

    /// TCOUNT: number of elements inside the time interval.
    pub fn series_count(&self, key: &str, min: &str, max: &str) -> Result<Reply> {
        let bounds = ScoreBounds::parse(min, max)?;
        let count = self
            .expect_series(key)?
            .map_or(0, |s| s.count_by_time(&bounds));
        Ok(Reply::Integer(count as i64))
    }

    /// TRANK: zero-based rank of the element at exactly `time`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no element carries that time.
    pub fn series_rank(&self, key: &str, time: &str) -> Result<Reply> {
        let time = query::parse_score(time)?;
        let rank = self
            .expect_series(key)?
            .and_then(|s| s.rank(time))
            .ok_or(StoreError::NotFound)?;
        Ok(Reply::Integer(rank as i64))
    }

    // ------------------------------------------------------------------
    // Type routing
    // ------------------------------------------------------------------

    fn expect_map(&self, key: &str) -> Result<Option<&OrderedMap>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(Value::Map(map)) => Ok(Some(map)),
            Some(_) => Err(StoreError::WrongType),
        }
    }

    fn expect_series(&self, key: &str) -> Result<Option<&TimeSeries>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(Value::Series(series)) => Ok(Some(series)),
            Some(_) => Err(StoreError::WrongType),
        }
    }

    fn map_for_write(&mut self, key: &str) -> Result<&mut OrderedMap> {
        let config = self.config.clone();
        let slot = self.values.entry(key.to_string()).or_insert_with(|| {
            debug!("created ordered map instance at {}", key);
            Value::Map(OrderedMap::with_config(config))
        });
        match slot {
            Value::Map(map) => Ok(map),
            Value::Series(_) => Err(StoreError::WrongType),
        }
    }

    fn series_for_write(&mut self, key: &str) -> Result<&mut TimeSeries> {
        let config = self.config.clone();
        let slot = self.values.entry(key.to_string()).or_insert_with(|| {
            debug!("created time series instance at {}", key);
            Value::Series(TimeSeries::with_config(config))
        });
        match slot {
            Value::Series(series) => Ok(series),
            Value::Map(_) => Err(StoreError::WrongType),
        }
    }
}

fn shape_map_items(items: Vec<MapItem>, flags: RangeFlags) -> Reply {
    let mut out = Vec::new();
    for item in items {
        out.push(Reply::Bulk(item.key));
        if flags.with_scores {
            out.push(Reply::Double(item.score));
        }
        if flags.with_values {
            out.push(Reply::Bulk(item.value));
        }
    }
    Reply::Multi(out)
}

fn shape_series_items(items: Vec<(f64, String)>, flags: RangeFlags) -> Reply {
    let mut out = Vec::new();
    for (time, value) in items {
        if flags.with_scores {
            out.push(Reply::Double(time));
        }
        if flags.with_values {
            out.push(Reply::Bulk(value));
        }
    }
    Reply::Multi(out)
}
