/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/2/26
******************************************************************************/

//! Named settings shared between a sequencer and its forks.
//!
//! Each sequencer owns a [`SharedSettings`] layer. A fork's layer points at its
//! parent's, so a key missing on the fork is read from the parent at lookup
//! time. Writes land either in the fork's own layer (`set`) or, through the
//! write-through slot, in the root sequencer's (`setter`).

use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// One layer of named settings with an optional fallback parent.
#[derive(Debug, Default)]
pub struct SharedSettings {
    own: DashMap<String, Value>,
    parent: Option<Arc<SharedSettings>>,
}

impl SharedSettings {
    /// Creates a root layer.
    #[must_use]
    pub fn root() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates an empty layer that falls back to `parent`.
    #[must_use]
    pub fn child_of(parent: &Arc<Self>) -> Arc<Self> {
        Arc::new(Self {
            own: DashMap::new(),
            parent: Some(Arc::clone(parent)),
        })
    }

    /// Looks `key` up in this layer, then in each ancestor.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.own.get(key) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.get(key))
    }

    /// Returns `true` if `key` is stored in this layer itself.
    #[must_use]
    pub fn has_own(&self, key: &str) -> bool {
        self.own.contains_key(key)
    }

    /// Writes `key` in this layer. `Null` removes it.
    pub fn put(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if value.is_null() {
            self.own.remove(&key);
        } else {
            self.own.insert(key, value);
        }
    }

    /// Number of keys stored in this layer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.own.len()
    }

    /// Returns `true` if this layer stores no key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.own.is_empty()
    }
}
