//! Store boundary: value lifecycle, type routing, and the command surface.
//!
//! This module is the seam between the index engine and the surrounding
//! store. It owns a slice of the keyspace (`key -> Value`), creates an
//! instance on first write and destroys it on key deletion, routes commands
//! through the [`Value`] type discriminant, and fires the change-notification
//! hook after every successful mutation. The hook is called here but never
//! implemented here: replication, dirty tracking beyond the counter, and
//! blocked-client wakeups belong to the host.

mod command;

pub use command::Reply;

use crate::index::IndexConfig;
use crate::map::OrderedMap;
use crate::series::TimeSeries;
use std::collections::HashMap;
use tracing::debug;

/// A typed store value. The discriminant routes type-specific commands and
/// lets generic key commands bypass the engine entirely.
#[derive(Debug)]
pub enum Value {
    /// An ordered map instance.
    Map(OrderedMap),
    /// A time series instance.
    Series(TimeSeries),
}

impl Value {
    /// Human-readable type name, for generic type queries.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Map(_) => "map",
            Value::Series(_) => "series",
        }
    }
}

/// Change-notification hook, invoked with the key of every successful
/// mutating command.
type ChangeHook = Box<dyn FnMut(&str)>;

/// A slice of the store keyspace holding ordered maps and time series.
///
/// Commands execute one at a time to completion; the store serializes them,
/// so no locking exists at this layer.
pub struct Store {
    values: HashMap<String, Value>,
    config: IndexConfig,
    dirty: u64,
    hook: Option<ChangeHook>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::with_config(IndexConfig::default())
    }

    /// Creates an empty store whose instances use a custom index
    /// configuration.
    pub fn with_config(config: IndexConfig) -> Self {
        Self {
            values: HashMap::new(),
            config,
            dirty: 0,
            hook: None,
        }
    }

    /// Installs the change-notification hook.
    pub fn set_change_hook(&mut self, hook: impl FnMut(&str) + 'static) {
        self.hook = Some(Box::new(hook));
    }

    /// Number of successful mutating commands since creation.
    pub fn dirty(&self) -> u64 {
        self.dirty
    }

    /// Returns true when `key` holds a value of any type.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Type name of the value at `key`, for generic type queries.
    pub fn kind(&self, key: &str) -> Option<&'static str> {
        self.values.get(key).map(Value::kind)
    }

    /// Destroys the instance at `key`, releasing its hash index and skip
    /// list. Returns true when something was removed. Invoked by the host on
    /// key deletion or overwrite.
    pub fn destroy(&mut self, key: &str) -> bool {
        if self.values.remove(key).is_some() {
            debug!("destroyed instance at {}", key);
            self.touch(key);
            true
        } else {
            false
        }
    }

    /// Bumps the dirty counter and fires the change hook.
    fn touch(&mut self, key: &str) {
        self.dirty += 1;
        if let Some(hook) = self.hook.as_mut() {
            hook(key);
        }
    }
}
