//! The in-memory key/value store.
//!
//! Keys map to tagged values: a string with an optional absolute expiry, or
//! a stream of id-ordered entries. Expiry is lazy: an expired string may
//! still sit in the map and is treated as absent when read.

use std::collections::HashMap;
use std::fmt;

use jiff::Timestamp;

/// A stream entry id: a `(milliseconds, sequence)` pair ordered
/// lexicographically and rendered as `"<ms>-<seq>"`.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const ZERO: StreamId = StreamId { ms: 0, seq: 0 };
    pub const MAX: StreamId = StreamId {
        ms: u64::MAX,
        seq: u64::MAX,
    };

    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// One stream entry: its id plus the field/value pairs in the order the
/// client supplied them.
#[derive(Debug, PartialEq, Clone)]
pub struct StreamEntry {
    pub id: StreamId,
    pub fields: Vec<(String, String)>,
}

/// An append-only stream. `last_id` is the largest id accepted so far and
/// is strictly monotonic; entries are stored in insertion order, which by
/// that invariant is also id order.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Stream {
    pub entries: Vec<StreamEntry>,
    pub last_id: StreamId,
}

impl Stream {
    /// Appends an entry whose id the caller has already validated as
    /// strictly greater than `last_id`.
    pub fn append(&mut self, id: StreamId, fields: Vec<(String, String)>) {
        self.entries.push(StreamEntry { id, fields });
        self.last_id = id;
    }

    /// Entries with `start <= id <= end`.
    pub fn range(&self, start: StreamId, end: StreamId) -> Vec<&StreamEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.id >= start && entry.id <= end)
            .collect()
    }

    /// Entries strictly newer than `after`.
    pub fn entries_after(&self, after: StreamId) -> Vec<&StreamEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.id > after)
            .collect()
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum DataType {
    String(String),
    Stream(Stream),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Value {
    pub data: DataType,
    pub expires_at: Option<Timestamp>,
}

impl Value {
    pub fn string(data: impl Into<String>) -> Self {
        Self {
            data: DataType::String(data.into()),
            expires_at: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Timestamp::now() > expires_at)
    }
}

/// Key/value store with insertion-order key tracking, shared by every
/// connection behind a mutex.
#[derive(Debug, Default)]
pub struct Store {
    values: HashMap<String, Value>,
    insertion_order: Vec<String>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.values.get_mut(key)
    }

    pub fn insert(&mut self, key: String, value: Value) {
        if !self.values.contains_key(&key) {
            self.insertion_order.push(key.clone());
        }
        self.values.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.values.remove(key);
        if removed.is_some() {
            self.insertion_order.retain(|existing| existing != key);
        }
        removed
    }

    /// Keys of live (non-expired) values, in insertion order.
    pub fn live_keys(&self) -> Vec<&String> {
        self.insertion_order
            .iter()
            .filter(|key| self.values.get(*key).is_some_and(|value| !value.is_expired()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
