//! Shared key/value records
//!
//! A `Record` is the small bag of values replicated between roles at a
//! logical path. Merging overlays keys and never drops untouched ones.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{SkyError, SkyResult};

/// A single record value
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Int(i64),
    Text(String),
    List(Vec<Record>),
}

/// Key/value record addressed by a path
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    entries: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Integer value, `None` when missing or of another type
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.entries.get(key) {
            Some(Value::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(Value::Text(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_list(&self, key: &str) -> Option<&[Record]> {
        match self.entries.get(key) {
            Some(Value::List(v)) => Some(v),
            _ => None,
        }
    }

    /// Integer value or `MalformedRecord` naming the path and key
    pub fn require_int(&self, path: &str, key: &str) -> SkyResult<i64> {
        self.get_int(key).ok_or_else(|| SkyError::MalformedRecord {
            path: path.to_string(),
            key: key.to_string(),
        })
    }

    pub fn put_int(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.entries.insert(key.into(), Value::Int(value));
        self
    }

    pub fn put_text(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.insert(key.into(), Value::Text(value.into()));
        self
    }

    pub fn put_list(&mut self, key: impl Into<String>, value: Vec<Record>) -> &mut Self {
        self.entries.insert(key.into(), Value::List(value));
        self
    }

    pub fn with_int(mut self, key: impl Into<String>, value: i64) -> Self {
        self.put_int(key, value);
        self
    }

    pub fn with_list(mut self, key: impl Into<String>, value: Vec<Record>) -> Self {
        self.put_list(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overlay every key of `other` onto this record.
    /// Keys absent from `other` are kept.
    pub fn overlay(&mut self, other: &Record) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// Union of this record and `other`, `other` winning on shared keys
    pub fn merged(&self, other: &Record) -> Record {
        let mut merged = self.clone();
        merged.overlay(other);
        merged
    }

    /// Encode as JSON bytes
    pub fn to_bytes(&self) -> SkyResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode from JSON bytes
    pub fn from_bytes(buf: &[u8]) -> SkyResult<Self> {
        Ok(serde_json::from_slice(buf)?)
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Record {
            entries: iter.into_iter().collect(),
        }
    }
}
