use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use generational_arena::{Arena, Index};
use serde::de::{Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, Serializer};

#[derive(Debug, Clone)]
struct Node<K> {
  key: K,
  next: Option<Index>,
  prev: Option<Index>,
}

/// A recency order over unique keys with O(1) touch, removal and eviction.
///
/// On the wire it is a plain array ordered from least to most recently used,
/// so the last element is the most recent.
#[derive(Clone)]
pub struct LruList<K: Eq + Hash + Clone> {
  // Arena stores all nodes contiguously.
  nodes: Arena<Node<K>>,
  lookup: HashMap<K, Index, ahash::RandomState>,
  // Head is the most-recently-used item.
  head: Option<Index>,
  // Tail is the least-recently-used item.
  tail: Option<Index>,
}

impl<K: Eq + Hash + Clone> Default for LruList<K> {
  fn default() -> Self {
    Self::new()
  }
}

impl<K: Eq + Hash + Clone> LruList<K> {
  pub fn new() -> Self {
    Self {
      nodes: Arena::new(),
      lookup: HashMap::default(),
      head: None,
      tail: None,
    }
  }

  // Unlinks a node without touching the arena or lookup map.
  fn unlink(&mut self, index: Index) {
    let node = &self.nodes[index];
    let prev_node_idx = node.prev;
    let next_node_idx = node.next;

    if let Some(prev_idx) = prev_node_idx {
      self.nodes[prev_idx].next = next_node_idx;
    } else {
      self.head = next_node_idx;
    }

    if let Some(next_idx) = next_node_idx {
      self.nodes[next_idx].prev = prev_node_idx;
    } else {
      self.tail = prev_node_idx;
    }
  }

  fn push_front_node(&mut self, index: Index) {
    let old_head_idx = self.head;
    self.nodes[index].next = old_head_idx;
    self.nodes[index].prev = None;
    self.head = Some(index);

    if let Some(old_head) = old_head_idx {
      self.nodes[old_head].prev = Some(index);
    }

    if self.tail.is_none() {
      self.tail = Some(index);
    }
  }

  pub fn len(&self) -> usize {
    self.lookup.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lookup.is_empty()
  }

  pub fn contains<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.lookup.contains_key(key)
  }

  /// Marks `key` as the most recently used, inserting it if absent.
  /// Returns `true` if the key was newly inserted.
  pub fn touch(&mut self, key: K) -> bool {
    if let Some(&index) = self.lookup.get(&key) {
      if self.head != Some(index) {
        self.unlink(index);
        self.push_front_node(index);
      }
      false
    } else {
      let index = self.nodes.insert(Node {
        key: key.clone(),
        next: None,
        prev: None,
      });
      self.lookup.insert(key, index);
      self.push_front_node(index);
      true
    }
  }

  /// Moves an existing key to the most recent position. Returns `false` if
  /// the key is not tracked.
  pub fn promote<Q>(&mut self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    match self.lookup.get(key) {
      Some(&index) => {
        if self.head != Some(index) {
          self.unlink(index);
          self.push_front_node(index);
        }
        true
      }
      None => false,
    }
  }

  /// Removes and returns the least recently used key.
  pub fn pop_lru(&mut self) -> Option<K> {
    let tail_index = self.tail?;
    self.unlink(tail_index);
    let node = self.nodes.remove(tail_index)?;
    self.lookup.remove(&node.key);
    Some(node.key)
  }

  /// The least recently used key, if any.
  pub fn peek_lru(&self) -> Option<&K> {
    self.tail.map(|index| &self.nodes[index].key)
  }

  /// The most recently used key, if any.
  pub fn peek_mru(&self) -> Option<&K> {
    self.head.map(|index| &self.nodes[index].key)
  }

  pub fn remove<Q>(&mut self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    match self.lookup.remove(key) {
      Some(index) => {
        self.unlink(index);
        self.nodes.remove(index);
        true
      }
      None => false,
    }
  }

  pub fn clear(&mut self) {
    self.nodes.clear();
    self.lookup.clear();
    self.head = None;
    self.tail = None;
  }

  /// Iterates keys from least to most recently used.
  pub fn iter(&self) -> Iter<'_, K> {
    Iter {
      list: self,
      current: self.tail,
      remaining: self.len(),
    }
  }

  /// Keys ordered from least to most recently used.
  pub fn to_vec(&self) -> Vec<K> {
    self.iter().cloned().collect()
  }
}

/// Iterator over an [`LruList`], least recently used first.
pub struct Iter<'a, K: Eq + Hash + Clone> {
  list: &'a LruList<K>,
  current: Option<Index>,
  remaining: usize,
}

impl<'a, K: Eq + Hash + Clone> Iterator for Iter<'a, K> {
  type Item = &'a K;

  fn next(&mut self) -> Option<Self::Item> {
    let index = self.current?;
    let node = &self.list.nodes[index];
    self.current = node.prev;
    self.remaining -= 1;
    Some(&node.key)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    (self.remaining, Some(self.remaining))
  }
}

impl<K: Eq + Hash + Clone> ExactSizeIterator for Iter<'_, K> {}

impl<K: Eq + Hash + Clone> FromIterator<K> for LruList<K> {
  /// Later keys are more recent; a repeated key ends up at its last position.
  fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
    let mut list = LruList::new();
    for key in iter {
      list.touch(key);
    }
    list
  }
}

impl<K: Eq + Hash + Clone + fmt::Debug> fmt::Debug for LruList<K> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(self.iter()).finish()
  }
}

impl<K: Eq + Hash + Clone> PartialEq for LruList<K> {
  fn eq(&self, other: &Self) -> bool {
    self.len() == other.len() && self.iter().eq(other.iter())
  }
}

impl<K: Eq + Hash + Clone> Eq for LruList<K> {}

impl<K: Eq + Hash + Clone + Serialize> Serialize for LruList<K> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(self.iter())
  }
}

impl<'de, K> Deserialize<'de> for LruList<K>
where
  K: Eq + Hash + Clone + Deserialize<'de>,
{
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    struct ListVisitor<K>(PhantomData<K>);

    impl<'de, K> Visitor<'de> for ListVisitor<K>
    where
      K: Eq + Hash + Clone + Deserialize<'de>,
    {
      type Value = LruList<K>;

      fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a sequence of keys ordered least to most recently used")
      }

      fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut list = LruList::new();
        while let Some(key) = seq.next_element()? {
          list.touch(key);
        }
        Ok(list)
      }
    }

    deserializer.deserialize_seq(ListVisitor(PhantomData))
  }
}
