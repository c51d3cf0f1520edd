//! Key/value mappings used for project and service environments.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

/// A plain key/value mapping where every key carries a value.
///
/// Used for the project-level environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mapping(BTreeMap<String, String>);

impl Mapping {
    /// Creates an empty mapping.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Looks up a key, returning its value if present.
    #[must_use]
    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Sets a key, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when the mapping has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }

    /// Converts into a mapping where every key is present with a value.
    #[must_use]
    pub fn to_mapping_with_equals(&self) -> MappingWithEquals {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), Some(v.clone())))
            .collect()
    }
}

impl FromIterator<(String, String)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, String>> for Mapping {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

/// A mapping whose values may be explicitly unset.
///
/// Three states are distinguishable for any key: absent, present without a
/// value (`KEY`), and present with a value (`KEY=value`, possibly empty).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingWithEquals(BTreeMap<String, Option<String>>);

impl MappingWithEquals {
    /// Creates an empty mapping.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Sets a key to a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let _ = self.0.insert(key.into(), Some(value.into()));
    }

    /// Declares a key without a value.
    pub fn unset(&mut self, key: impl Into<String>) {
        let _ = self.0.insert(key.into(), None);
    }

    /// Returns the entry for a key: `None` when absent, `Some(None)` when unset.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.0.get(key).map(Option::as_deref)
    }

    /// Returns the value for a key when it is present and set.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).flatten()
    }

    /// Returns true when the key is present, set or not.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when the mapping has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Option<String>> {
        self.0.iter()
    }

    /// Fills keys declared without a value from `lookup`.
    ///
    /// Keys the lookup cannot answer stay unset.
    #[must_use]
    pub fn resolve_unset<'a, F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        for (key, value) in &mut self.0 {
            if value.is_none() {
                if let Some(found) = lookup(key) {
                    *value = Some(found.to_owned());
                }
            }
        }
        self
    }

    /// Overlays `other` on top of `self`, last writer wins per key.
    ///
    /// An unset key in `other` replaces any value in `self` with unset.
    #[must_use]
    pub fn override_by(mut self, other: &Self) -> Self {
        for (key, value) in &other.0 {
            let _ = self.0.insert(key.clone(), value.clone());
        }
        self
    }
}

impl FromIterator<(String, Option<String>)> for MappingWithEquals {
    fn from_iter<I: IntoIterator<Item = (String, Option<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MappingWithEquals {
    type Item = (&'a String, &'a Option<String>);
    type IntoIter = btree_map::Iter<'a, String, Option<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
