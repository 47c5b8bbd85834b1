use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::KeyValue;

/// Environment variables accumulated for a task.
///
/// Stored as an append-only list of key–value pairs and serialized as a transparent array wrapper.
/// Entries are never removed; a later entry for the same key shadows every earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskEnv(pub Vec<KeyValue>);

impl TaskEnv {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Number of raw entries, including shadowed ones.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Create an environment containing a single key–value pair.
    pub fn single<K, V>(key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(vec![KeyValue::new(key, value)])
    }

    /// Check if the environment is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over all key–value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.0.iter()
    }

    /// Get the value for a key, returning the last matching entry.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|kv| kv.key() == key)
            .map(|kv| kv.value())
    }

    /// Append a key–value pair to the environment.
    ///
    /// Later entries override earlier ones when queried via [`TaskEnv::get`].
    pub fn push<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.push(KeyValue::new(key, value));
    }

    /// Append every entry of `other`, keeping its order.
    pub fn extend(&mut self, other: &TaskEnv) {
        self.0.extend(other.0.iter().cloned());
    }

    /// Merge two environments, where entries from `other` override earlier ones.
    ///
    /// The environments are combined by simple concatenation, allowing [`TaskEnv::get`] to resolve overrides naturally by scanning from the end.
    pub fn merged(&self, other: &TaskEnv) -> TaskEnv {
        let mut out = self.clone();
        out.extend(other);
        out
    }

    /// Collapse the list into the final variable set handed to the task process.
    pub fn resolved(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|kv| (kv.key().to_string(), kv.value().to_string()))
            .collect()
    }
}

impl Default for TaskEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for TaskEnv
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        TaskEnv(iter.into_iter().map(KeyValue::from).collect())
    }
}
