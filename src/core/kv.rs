use std::fmt;

use serde::{Deserialize, Serialize};

/// A single value in a [`Kv`] record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum KvValue {
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Str(String),
    /// Boolean flag.
    Bool(bool),
}

impl fmt::Display for KvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KvValue::Int(value) => write!(f, "{}", value),
            KvValue::Float(value) => write!(f, "{}", value),
            KvValue::Str(value) => write!(f, "{}", value),
            KvValue::Bool(value) => write!(f, "{}", value),
        }
    }
}

impl From<i64> for KvValue {
    fn from(value: i64) -> Self {
        KvValue::Int(value)
    }
}

impl From<i32> for KvValue {
    fn from(value: i32) -> Self {
        KvValue::Int(value as i64)
    }
}

impl From<u64> for KvValue {
    fn from(value: u64) -> Self {
        KvValue::Int(value as i64)
    }
}

impl From<usize> for KvValue {
    fn from(value: usize) -> Self {
        KvValue::Int(value as i64)
    }
}

impl From<f64> for KvValue {
    fn from(value: f64) -> Self {
        KvValue::Float(value)
    }
}

impl From<f32> for KvValue {
    fn from(value: f32) -> Self {
        KvValue::Float(value as f64)
    }
}

impl From<&str> for KvValue {
    fn from(value: &str) -> Self {
        KvValue::Str(value.to_owned())
    }
}

impl From<String> for KvValue {
    fn from(value: String) -> Self {
        KvValue::Str(value)
    }
}

impl From<bool> for KvValue {
    fn from(value: bool) -> Self {
        KvValue::Bool(value)
    }
}

/// An ordered string-keyed record of per-iteration diagnostics.
///
/// The executor rebuilds the record of its state on every iteration from the
/// diagnostics returned by the solver plus standard fields (iteration number,
/// current and best cost, elapsed time). Observers receive it as is, so
/// solvers can expose arbitrary internals without forcing a fixed schema.
///
/// Insertion order is preserved and duplicate keys overwrite in place.
///
/// ```rust
/// use optex::kv;
///
/// let kv = kv!["gamma" => 0.9, "restarted" => false];
/// assert_eq!(kv.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Kv {
    entries: Vec<(String, KvValue)>,
}

impl Kv {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a key-value pair, overwriting the value in place if the key is
    /// already present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<KvValue>) -> &mut Self {
        let key = key.into();
        let value = value.into();

        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }

        self
    }

    /// Returns the value stored under given key, if any.
    pub fn get(&self, key: &str) -> Option<&KvValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// Appends all entries of `other`, overwriting values of keys that are
    /// already present.
    pub fn merge(&mut self, other: Kv) -> &mut Self {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
        self
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the record has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &KvValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Display for Kv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in self.iter() {
            if !first {
                write!(f, "  ")?;
            }
            write!(f, "{}={}", key, value)?;
            first = false;
        }
        Ok(())
    }
}

impl FromIterator<(String, KvValue)> for Kv {
    fn from_iter<T: IntoIterator<Item = (String, KvValue)>>(iter: T) -> Self {
        let mut kv = Kv::new();
        for (key, value) in iter {
            kv.insert(key, value);
        }
        kv
    }
}

/// Convenience macro for building a [`Kv`] record.
///
/// ```rust
/// use optex::{kv, KvValue};
///
/// let kv = kv!["step" => 0.5, "method" => "dogleg"];
/// assert_eq!(kv.get("step"), Some(&KvValue::Float(0.5)));
/// ```
#[macro_export]
macro_rules! kv {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut kv = $crate::Kv::new();
        $(kv.insert($key, $value);)*
        kv
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_preserved() {
        let kv = kv!["b" => 1, "a" => 2, "c" => 3];
        let keys: Vec<_> = kv.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn insert_overwrites_in_place() {
        let mut kv = kv!["a" => 1, "b" => 2];
        kv.insert("a", 10);

        assert_eq!(kv.len(), 2);
        assert_eq!(kv.get("a"), Some(&KvValue::Int(10)));

        let keys: Vec<_> = kv.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn merge_overwrites_and_appends() {
        let mut kv = kv!["iter" => 3, "cost" => 1.5];
        kv.merge(kv!["cost" => 1.25, "radius" => 0.1]);

        assert_eq!(kv.get("cost"), Some(&KvValue::Float(1.25)));
        assert_eq!(kv.get("radius"), Some(&KvValue::Float(0.1)));
        assert_eq!(kv.len(), 3);
    }

    #[test]
    fn display() {
        let kv = kv!["iter" => 1, "converged" => false];
        assert_eq!(kv.to_string(), "iter=1  converged=false");
    }
}
