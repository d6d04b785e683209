//! Insertion-ordered map whose keys can be renamed in place.
//!
//! Member collections (model properties, enum members, union variants,
//! interface operations) and symbol tables are stored in a
//! [`RekeyableMap`]. Entries live in a slot vector in insertion order with a
//! hash index on the side; removal leaves a tombstone so positions of the
//! remaining entries never shift.

use ahash::AHashMap;
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

#[derive(Clone)]
pub struct RekeyableMap<K, V> {
  slots: Vec<Option<(K, V)>>,
  index: AHashMap<K, usize>,
}

impl<K, V> Default for RekeyableMap<K, V> {
  fn default() -> Self {
    Self {
      slots: Vec::new(),
      index: AHashMap::default(),
    }
  }
}

impl<K: Hash + Eq + Clone, V> RekeyableMap<K, V> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.index.len()
  }

  pub fn is_empty(&self) -> bool {
    self.index.is_empty()
  }

  /// Inserts `value`; an existing key keeps its position and gets the new
  /// value, returning the old one.
  pub fn insert(&mut self, key: K, value: V) -> Option<V> {
    if let Some(&slot) = self.index.get(&key) {
      let entry = self.slots[slot].as_mut().map(|(_, v)| v);
      return entry.map(|v| std::mem::replace(v, value));
    }
    self.index.insert(key.clone(), self.slots.len());
    self.slots.push(Some((key, value)));
    None
  }

  pub fn get<Q>(&self, key: &Q) -> Option<&V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let slot = *self.index.get(key)?;
    self.slots[slot].as_ref().map(|(_, v)| v)
  }

  pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let slot = *self.index.get(key)?;
    self.slots[slot].as_mut().map(|(_, v)| v)
  }

  pub fn contains_key<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.index.contains_key(key)
  }

  pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let slot = self.index.remove(key)?;
    self.slots[slot].take().map(|(_, v)| v)
  }

  /// Renames `existing` to `new_key` without moving it. An entry already
  /// stored under `new_key` is dropped. Returns `false` when `existing` is
  /// absent.
  pub fn rekey<Q>(&mut self, existing: &Q, new_key: K) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let Some(slot) = self.index.remove(existing) else {
      return false;
    };
    if let Some(displaced) = self.index.remove::<K>(&new_key) {
      self.slots[displaced] = None;
    }
    if let Some((key, _)) = self.slots[slot].as_mut() {
      *key = new_key.clone();
    }
    self.index.insert(new_key, slot);
    true
  }

  /// Position of `key` among live entries.
  pub fn position<Q>(&self, key: &Q) -> Option<usize>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let slot = *self.index.get(key)?;
    Some(self.slots[..slot].iter().filter(|s| s.is_some()).count())
  }

  pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&K, &V)> + '_ {
    self
      .slots
      .iter()
      .filter_map(|slot| slot.as_ref().map(|(k, v)| (k, v)))
  }

  pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + '_ {
    self.iter().map(|(k, _)| k)
  }

  pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + '_ {
    self.iter().map(|(_, v)| v)
  }

  pub fn first(&self) -> Option<(&K, &V)> {
    self.iter().next()
  }
}

impl<K: Hash + Eq + Clone, V> FromIterator<(K, V)> for RekeyableMap<K, V> {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut map = RekeyableMap::new();
    for (k, v) in iter {
      map.insert(k, v);
    }
    map
  }
}

impl<K: Hash + Eq + Clone + fmt::Debug, V: fmt::Debug> fmt::Debug for RekeyableMap<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_map().entries(self.iter()).finish()
  }
}

impl<K: Hash + Eq + Clone, V: PartialEq> PartialEq for RekeyableMap<K, V> {
  fn eq(&self, other: &Self) -> bool {
    self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
  }
}

impl<K: Hash + Eq + Clone, V: Eq> Eq for RekeyableMap<K, V> {}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  fn keys(map: &RekeyableMap<String, u32>) -> Vec<&str> {
    map.keys().map(|k| k.as_str()).collect()
  }

  #[test]
  fn rekey_keeps_position() {
    let mut map: RekeyableMap<String, u32> =
      [("a", 1), ("b", 2), ("c", 3)].into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    assert!(map.rekey("b", "b2".to_string()));
    assert_eq!(keys(&map), vec!["a", "b2", "c"]);
    assert_eq!(map.len(), 3);
    assert_eq!(map.get("b2"), Some(&2));
    assert_eq!(map.get("b"), None);
  }

  #[test]
  fn rekey_onto_existing_key_drops_it() {
    let mut map: RekeyableMap<String, u32> =
      [("a", 1), ("b", 2), ("c", 3)].into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    assert!(map.rekey("a", "c".to_string()));
    assert_eq!(keys(&map), vec!["c", "b"]);
    assert_eq!(map.get("c"), Some(&1));
    assert!(!map.rekey("missing", "z".to_string()));
  }

  #[test]
  fn insert_existing_replaces_in_place() {
    let mut map = RekeyableMap::new();
    map.insert("x".to_string(), 1);
    map.insert("y".to_string(), 2);
    assert_eq!(map.insert("x".to_string(), 10), Some(1));
    assert_eq!(keys(&map), vec!["x", "y"]);
    assert_eq!(map.remove("x"), Some(10));
    assert_eq!(map.position("y"), Some(0));
  }

  proptest! {
    #[test]
    fn rekey_preserves_order_and_len(
      names in proptest::collection::btree_set("[a-z]{1,4}", 1..12),
      pick in any::<proptest::sample::Index>(),
    ) {
      let names: Vec<String> = names.into_iter().collect();
      let mut map: RekeyableMap<String, usize> =
        names.iter().cloned().enumerate().map(|(i, k)| (k, i)).collect();
      let target = pick.index(names.len());
      let renamed = format!("{}_renamed", names[target]);
      prop_assert!(map.rekey(names[target].as_str(), renamed.clone()));
      let mut expected = names.clone();
      expected[target] = renamed;
      let actual: Vec<String> = map.keys().cloned().collect();
      prop_assert_eq!(actual, expected);
      prop_assert_eq!(map.len(), names.len());
      let values: Vec<usize> = map.values().copied().collect();
      prop_assert_eq!(values, (0..names.len()).collect::<Vec<_>>());
    }
  }
}
