//! Platform key-value container
//!
//! Mirrors the Android `Bundle` / iOS `NSDictionary` shape that native
//! messaging and analytics SDKs exchange: string keys mapped to a small set
//! of scalar types, string arrays and nested bundles. Key order is stable
//! (`BTreeMap`) so serialized payloads are deterministic.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A value stored in a [`Bundle`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BundleValue {
    /// Boolean
    Bool(bool),
    /// 64-bit integer
    Long(i64),
    /// Double precision float
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Array of strings
    StringArray(Vec<String>),
    /// Nested bundle
    Bundle(Bundle),
}

impl fmt::Display for BundleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleValue::Bool(v) => write!(f, "{}", v),
            BundleValue::Long(v) => write!(f, "{}", v),
            BundleValue::Double(v) => write!(f, "{}", v),
            BundleValue::String(v) => f.write_str(v),
            BundleValue::StringArray(v) => write!(f, "[{}]", v.join(", ")),
            BundleValue::Bundle(b) => match serde_json::to_string(b) {
                Ok(json) => f.write_str(&json),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

impl From<&str> for BundleValue {
    fn from(v: &str) -> Self {
        BundleValue::String(v.to_string())
    }
}

impl From<String> for BundleValue {
    fn from(v: String) -> Self {
        BundleValue::String(v)
    }
}

impl From<i32> for BundleValue {
    fn from(v: i32) -> Self {
        BundleValue::Long(i64::from(v))
    }
}

impl From<i64> for BundleValue {
    fn from(v: i64) -> Self {
        BundleValue::Long(v)
    }
}

impl From<f64> for BundleValue {
    fn from(v: f64) -> Self {
        BundleValue::Double(v)
    }
}

impl From<bool> for BundleValue {
    fn from(v: bool) -> Self {
        BundleValue::Bool(v)
    }
}

impl From<Vec<String>> for BundleValue {
    fn from(v: Vec<String>) -> Self {
        BundleValue::StringArray(v)
    }
}

impl From<Bundle> for BundleValue {
    fn from(v: Bundle) -> Self {
        BundleValue::Bundle(v)
    }
}

/// Ordered string-keyed container of [`BundleValue`]s
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bundle {
    entries: BTreeMap<String, BundleValue>,
}

impl Bundle {
    /// Create an empty bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert any convertible value, replacing a previous entry
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<BundleValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Insert a string; `None` removes the key, like a null put on Android
    pub fn put_string(&mut self, key: impl Into<String>, value: Option<&str>) {
        let key = key.into();
        match value {
            Some(v) => {
                self.entries.insert(key, BundleValue::String(v.to_string()));
            }
            None => {
                self.entries.remove(&key);
            }
        }
    }

    /// Insert a nested bundle; `None` removes the key
    pub fn put_bundle(&mut self, key: impl Into<String>, value: Option<Bundle>) {
        let key = key.into();
        match value {
            Some(b) => {
                self.entries.insert(key, BundleValue::Bundle(b));
            }
            None => {
                self.entries.remove(&key);
            }
        }
    }

    /// Raw entry lookup
    pub fn get(&self, key: &str) -> Option<&BundleValue> {
        self.entries.get(key)
    }

    /// String entry; other types yield `None`
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(BundleValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Nested bundle entry; other types yield `None`
    pub fn get_bundle(&self, key: &str) -> Option<&Bundle> {
        match self.entries.get(key) {
            Some(BundleValue::Bundle(b)) => Some(b),
            _ => None,
        }
    }

    /// Whether `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove an entry
    pub fn remove(&mut self, key: &str) -> Option<BundleValue> {
        self.entries.remove(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bundle has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BundleValue)> {
        self.entries.iter()
    }

    /// Flatten into a string map, rendering every value with `Display`
    pub fn to_string_map(&self) -> HashMap<String, String> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }

    /// Build a bundle of string entries
    pub fn from_string_map(map: &HashMap<String, String>) -> Self {
        let entries = map
            .iter()
            .map(|(k, v)| (k.clone(), BundleValue::String(v.clone())))
            .collect();
        Self { entries }
    }
}

impl<K: Into<String>, V: Into<BundleValue>> FromIterator<(K, V)> for Bundle {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { entries }
    }
}
