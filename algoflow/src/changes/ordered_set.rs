//! Insertion-ordered, deduplicating set.
//!
//! First-seen order is part of the change-detection contract, so the
//! ordering is explicit here rather than borrowed from a hash map's
//! iteration behavior.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::hash::Hash;

/// A set that preserves first-insertion order.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct OrderedSet<T>
where
    T: Eq + Hash + Clone,
{
    items: Vec<T>,
    #[serde(skip)]
    seen: HashSet<T>,
}

impl<'de, T> Deserialize<'de> for OrderedSet<T>
where
    T: Eq + Hash + Clone + Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let items = Vec::<T>::deserialize(deserializer)?;
        Ok(items.into_iter().collect())
    }
}

impl<T> OrderedSet<T>
where
    T: Eq + Hash + Clone,
{
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Inserts an item, keeping the first-seen position.
    ///
    /// Returns true if the item was newly inserted.
    pub fn insert(&mut self, item: T) -> bool {
        if self.seen.insert(item.clone()) {
            self.items.push(item);
            true
        } else {
            false
        }
    }

    /// Returns true if the item is present.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.seen.contains(item)
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Returns the items as a slice, in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consumes the set, returning the ordered items.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for OrderedSet<T>
where
    T: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for OrderedSet<T>
where
    T: Eq + Hash + Clone,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

impl<T> PartialEq for OrderedSet<T>
where
    T: Eq + Hash + Clone,
{
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T> Eq for OrderedSet<T> where T: Eq + Hash + Clone {}

impl<'a, T> IntoIterator for &'a OrderedSet<T>
where
    T: Eq + Hash + Clone,
{
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_first_seen_order() {
        let mut set = OrderedSet::new();
        assert!(set.insert("b"));
        assert!(set.insert("a"));
        assert!(!set.insert("b"));
        assert!(set.insert("c"));

        assert_eq!(set.as_slice(), &["b", "a", "c"]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_contains() {
        let set: OrderedSet<_> = ["x", "y"].into_iter().collect();
        assert!(set.contains(&"x"));
        assert!(!set.contains(&"z"));
    }

    #[test]
    fn test_serializes_as_ordered_list() {
        let set: OrderedSet<_> = ["b", "a"].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["b","a"]"#);
    }

    #[test]
    fn test_deserialization_rebuilds_dedup_state() {
        let mut set: OrderedSet<String> = serde_json::from_str(r#"["b","a","b"]"#).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&"a".to_string()));
        assert!(!set.insert("b".to_string()));
    }
}
