//! Ordered in-memory key/value store
//!
//! Keys are compared bytewise, so composite keys built from big-endian
//! integers iterate in numeric order. Values are bincode-encoded serde types.
//!
//! A store is a shared, immutable base map plus an overlay of pending
//! writes. Cloning one only copies the overlay, which is how a context
//! branches; [`KvStore::commit`] folds the overlay back into the base once
//! nothing else shares it.

use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::cmp::Ordering;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::ops::Bound;
use std::sync::Arc;

type Range = (Bound<Vec<u8>>, Bound<Vec<u8>>);

#[derive(Debug, Clone, Default)]
pub struct KvStore {
    base: Arc<BTreeMap<Vec<u8>, Vec<u8>>>,
    /// `None` marks a delete that hides a base entry
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        match self.writes.get(key) {
            Some(write) => write.as_deref(),
            None => self.base.get(key).map(Vec::as_slice),
        }
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    pub fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    pub fn delete(&mut self, key: &[u8]) {
        if self.base.contains_key(key) {
            self.writes.insert(key.to_vec(), None);
        } else {
            self.writes.remove(key);
        }
    }

    pub fn len(&self) -> usize {
        self.iter_range((Bound::Unbounded, Bound::Unbounded)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of writes not yet folded into the base
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Fold pending writes into the base. A base still shared with another
    /// branch is left alone.
    pub fn commit(&mut self) {
        if let Some(base) = Arc::get_mut(&mut self.base) {
            for (key, write) in std::mem::take(&mut self.writes) {
                match write {
                    Some(value) => {
                        base.insert(key, value);
                    }
                    None => {
                        base.remove(&key);
                    }
                }
            }
        }
    }

    /// Decode the value under `key`
    pub fn get_value<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        match self.get(key) {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn set_value<T: Serialize>(&mut self, key: Vec<u8>, value: &T) -> Result<()> {
        let bytes = bincode::serialize(value)?;
        self.set(key, bytes);
        Ok(())
    }

    fn iter_range(&self, range: Range) -> Merged<'_> {
        Merged {
            base: self.base.range(range.clone()).peekable(),
            writes: self.writes.range(range).peekable(),
        }
    }

    /// Entries whose key starts with `prefix`, in key order
    pub fn prefix_iter<'a>(&'a self, prefix: &[u8]) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        let start = Bound::Included(prefix.to_vec());
        let end = match prefix_end(prefix) {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        self.iter_range((start, end))
    }

    /// Entries with `start <= key < end`; `None` as end means unbounded
    pub fn range_iter<'a>(
        &'a self,
        start: Vec<u8>,
        end: Option<Vec<u8>>,
    ) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        let end = end.map_or(Bound::Unbounded, Bound::Excluded);
        self.iter_range((Bound::Included(start), end))
    }

    /// Keys under `prefix`, collected so the caller may mutate afterwards
    pub fn prefix_keys(&self, prefix: &[u8]) -> Vec<Vec<u8>> {
        self.prefix_iter(prefix).map(|(k, _)| k.to_vec()).collect()
    }

    pub fn delete_prefix(&mut self, prefix: &[u8]) {
        for key in self.prefix_keys(prefix) {
            self.delete(&key);
        }
    }
}

impl PartialEq for KvStore {
    fn eq(&self, other: &Self) -> bool {
        let all = || (Bound::Unbounded, Bound::Unbounded);
        self.iter_range(all()).eq(other.iter_range(all()))
    }
}

impl Eq for KvStore {}

/// Base entries with the overlay applied on top, in key order
struct Merged<'a> {
    base: Peekable<btree_map::Range<'a, Vec<u8>, Vec<u8>>>,
    writes: Peekable<btree_map::Range<'a, Vec<u8>, Option<Vec<u8>>>>,
}

impl<'a> Iterator for Merged<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let order = match (self.base.peek(), self.writes.peek()) {
                (None, None) => return None,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some((base_key, _)), Some((write_key, _))) => base_key.cmp(write_key),
            };

            match order {
                Ordering::Less => {
                    let (key, value) = self.base.next()?;
                    return Some((key.as_slice(), value.as_slice()));
                }
                // shadowed by the overlay
                Ordering::Equal => {
                    self.base.next();
                }
                Ordering::Greater => {}
            }

            let (key, write) = self.writes.next()?;
            if let Some(value) = write {
                return Some((key.as_slice(), value.as_slice()));
            }
        }
    }
}

/// Smallest key greater than every key starting with `prefix`.
/// `None` if the prefix is all 0xff (or empty).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}
