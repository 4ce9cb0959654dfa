//! Metadata for objects and properties.
//!
//! An ordered bag of unique string keys. Insertion order is preserved for
//! serialization but ignored by equality. Carries the well-known boolean
//! flags the layering engine consumes (`prune`, `replace`).

use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

/// Ordered key/value metadata with unique keys.
#[derive(Clone, Default)]
pub struct MetaData {
    entries: SmallVec<[(String, String); 4]>,
}

impl MetaData {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing any existing entry for the key in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        for (k, v) in &mut self.entries {
            if k == &key {
                *v = value;
                return;
            }
        }
        self.entries.push((key, value));
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Check if a key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Remove a key and return its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries
            .iter()
            .position(|(k, _)| k == key)
            .map(|pos| self.entries.remove(pos).1)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over key/value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialize to the `key=value;key2=value2` string form, escaping
    /// `\`, `;` and `=` in keys and values.
    pub fn serialize(&self) -> String {
        let mut result = String::new();
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                result.push(';');
            }
            result.push_str(&escape(k));
            result.push('=');
            result.push_str(&escape(v));
        }
        result
    }

    /// Parse the serialized string form. Entries without an unescaped `=`
    /// or with an empty key are skipped.
    pub fn parse(s: &str) -> Self {
        let mut meta = Self::new();
        if s.is_empty() {
            return meta;
        }
        for part in split_entries(s) {
            if let Some(eq_pos) = find_unescaped(part, b'=') {
                let key = unescape(&part[..eq_pos]);
                let value = unescape(&part[eq_pos + 1..]);
                if !key.is_empty() {
                    meta.set(key, value);
                }
            }
        }
        meta
    }

    // === Layering flags ===

    /// Key deleting a subtree from a composited result.
    pub const PRUNE_KEY: &'static str = "prune";

    /// Key discarding lower-priority contributions to a subtree.
    pub const REPLACE_KEY: &'static str = "replace";

    /// Read a boolean-valued key; `1` and `true` are set.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some("1") | Some("true"))
    }

    /// True if this node is marked for pruning during composition.
    pub fn is_prune(&self) -> bool {
        self.flag(Self::PRUNE_KEY)
    }

    /// True if this node replaces lower-priority layers during composition.
    pub fn is_replace(&self) -> bool {
        self.flag(Self::REPLACE_KEY)
    }

    /// Set the prune flag.
    pub fn set_prune(&mut self) {
        self.set(Self::PRUNE_KEY, "1");
    }

    /// Set the replace flag.
    pub fn set_replace(&mut self) {
        self.set(Self::REPLACE_KEY, "1");
    }
}

/// Equality ignores insertion order.
impl PartialEq for MetaData {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k) == Some(v.as_str()))
    }
}

impl Eq for MetaData {}

impl fmt::Debug for MetaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl From<HashMap<String, String>> for MetaData {
    fn from(map: HashMap<String, String>) -> Self {
        let mut meta = Self::new();
        for (k, v) in map {
            meta.set(k, v);
        }
        meta
    }
}

impl FromIterator<(String, String)> for MetaData {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut meta = Self::new();
        for (k, v) in iter {
            meta.set(k, v);
        }
        meta
    }
}

fn escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            ';' => result.push_str("\\;"),
            '=' => result.push_str("\\="),
            _ => result.push(c),
        }
    }
    result
}

fn unescape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some(&next) if matches!(next, '\\' | ';' | '=') => {
                    result.push(next);
                    chars.next();
                }
                _ => result.push(c),
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Position of the first occurrence of `ch` not preceded by an odd run of
/// backslashes.
fn find_unescaped(s: &str, ch: u8) -> Option<usize> {
    let bytes = s.as_bytes();
    for i in 0..bytes.len() {
        if bytes[i] == ch {
            let backslashes = bytes[..i].iter().rev().take_while(|&&b| b == b'\\').count();
            if backslashes % 2 == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Split on unescaped semicolons.
fn split_entries(s: &str) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    for i in 0..bytes.len() {
        if bytes[i] == b';' {
            let backslashes = bytes[..i].iter().rev().take_while(|&&b| b == b'\\').count();
            if backslashes % 2 == 0 {
                parts.push(&s[start..i]);
                start = i + 1;
            }
        }
    }
    if start < s.len() {
        parts.push(&s[start..]);
    }
    parts
}
