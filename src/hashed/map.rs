//! Unordered maps backed by the bucket index
//!
//! [`HashMap`] keeps one cell per key; [`HashMultiMap`] keeps every inserted
//! pair, equal keys forming a contiguous run. Iteration order is insertion
//! order, held by the internal cell list, and survives rehashing.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use crate::cursor::Cursor;
use crate::error::{Result, TesseraError};
use crate::hash::DefaultHashBuilder;
use crate::hashed::core::{HashCore, HashNode};
use crate::storage::{CellIter, NIL};

/// Unordered unique map with insertion-ordered iteration
///
/// Lookups are expected O(1) through a power-of-two bucket index; the
/// element list preserves insertion order across growth. `insert` never
/// overwrites: inserting a present key reports the existing cell and leaves
/// its value untouched.
///
/// # Examples
///
/// ```
/// use tessera::HashMap;
///
/// let mut map = HashMap::new();
/// map.insert("a", 1).unwrap();
/// map.insert("b", 2).unwrap();
/// let (_, fresh) = map.insert("a", 3).unwrap();
/// assert!(!fresh);
/// assert_eq!(map.at(&"a"), Ok(&1));
/// assert_eq!(map.len(), 2);
/// ```
///
/// # Performance Characteristics
///
/// - Lookup, insert, erase: expected O(1) amortized
/// - `equal_range`, `count`: O(run length)
/// - Rehash: O(n), triggered when the load factor would pass
///   [`max_load_factor`](HashMap::max_load_factor)
#[derive(Clone)]
pub struct HashMap<K, V, S = DefaultHashBuilder> {
    core: HashCore<(K, V)>,
    hasher: S,
}

impl<K, V> HashMap<K, V, DefaultHashBuilder> {
    /// Creates an empty map with the default hasher
    pub fn new() -> Self {
        HashMap::with_hasher(DefaultHashBuilder::default())
    }

    /// Creates an empty map sized for `capacity` cells
    pub fn with_capacity(capacity: usize) -> Self {
        HashMap::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K, V, S: BuildHasher> HashMap<K, V, S> {
    /// Creates an empty map using `hasher`
    pub fn with_hasher(hasher: S) -> Self {
        HashMap { core: HashCore::new(), hasher }
    }

    /// Creates an empty map sized for `capacity` cells using `hasher`
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        HashMap { core: HashCore::with_capacity(capacity), hasher }
    }

    /// Returns the map's build hasher
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Returns the number of entries
    pub fn len(&self) -> usize {
        self.core.len()
    }

    /// Returns `true` if the map holds no entries
    pub fn is_empty(&self) -> bool {
        self.core.len() == 0
    }

    /// Removes every entry, keeping hasher and bucket array
    pub fn clear(&mut self) {
        self.core.clear();
    }

    /// Current number of buckets
    pub fn bucket_count(&self) -> usize {
        self.core.bucket_count()
    }

    /// Cells per bucket on average
    pub fn load_factor(&self) -> f32 {
        self.core.load_factor()
    }

    /// Load factor ceiling that triggers growth (default 1.0)
    pub fn max_load_factor(&self) -> f32 {
        self.core.max_load_factor()
    }

    /// Sets the load factor ceiling, rehashing if already above it
    pub fn set_max_load_factor(&mut self, factor: f32) -> Result<()> {
        self.core.set_max_load_factor(factor)
    }

    /// Grows the bucket array to at least `min_buckets`
    pub fn rehash(&mut self, min_buckets: usize) {
        self.core.rehash(min_buckets);
    }

    /// Prepares for `additional` more entries without intermediate rehashes
    pub fn reserve(&mut self, additional: usize) {
        self.core.reserve(additional);
    }

    /// Exchanges the entire contents of two maps in O(1)
    ///
    /// Cursors follow the cells they name across the swap.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Returns the value stored under `key`
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.core.find_by(self.hasher.hash_one(key), |e| e.0.borrow() == key);
        if id == NIL {
            None
        } else {
            Some(&self.core.elem(id).1)
        }
    }

    /// Returns a mutable reference to the value stored under `key`
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.core.find_by(self.hasher.hash_one(key), |e| e.0.borrow() == key);
        if id == NIL {
            None
        } else {
            Some(&mut self.core.elem_mut(id).1)
        }
    }

    /// Checked access: the value for `key`, or `KeyNotFound`
    pub fn at<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).ok_or_else(TesseraError::key_not_found)
    }

    /// Checked mutable access: the value for `key`, or `KeyNotFound`
    pub fn at_mut<Q>(&mut self, key: &Q) -> Result<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_mut(key).ok_or_else(TesseraError::key_not_found)
    }

    /// Returns `true` if `key` is present
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Number of entries under `key` (0 or 1)
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        usize::from(self.contains_key(key))
    }

    /// Cursor to the entry for `key`, or `end`
    pub fn find<Q>(&self, key: &Q) -> Cursor
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.core.cursor(self.core.find_by(self.hasher.hash_one(key), |e| e.0.borrow() == key))
    }

    /// Half-open cursor range of the entries equal to `key`
    pub fn equal_range<Q>(&self, key: &Q) -> (Cursor, Cursor)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (first, past) =
            self.core.equal_range_by(self.hasher.hash_one(key), |e| e.0.borrow() == key);
        (self.core.cursor(first), self.core.cursor(past))
    }

    // ------------------------------------------------------------------
    // Modifiers
    // ------------------------------------------------------------------

    /// Inserts `key → value` unless the key is present
    ///
    /// Returns the cursor of the decisive cell and whether a new cell was
    /// created; a present key keeps its stored value.
    pub fn insert(&mut self, key: K, value: V) -> Result<(Cursor, bool)>
    where
        K: Hash + Eq,
    {
        let hash = self.hasher.hash_one(&key);
        let (id, inserted) = self.core.insert_unique_by((key, value), hash, |a, b| a.0 == b.0)?;
        Ok((self.core.cursor(id), inserted))
    }

    /// Inserts, overwriting the value of a present key
    pub fn insert_or_assign(&mut self, key: K, value: V) -> Result<(Cursor, bool)>
    where
        K: Hash + Eq,
    {
        let id = self.core.find_by(self.hasher.hash_one(&key), |e| e.0 == key);
        if id != NIL {
            self.core.elem_mut(id).1 = value;
            return Ok((self.core.cursor(id), false));
        }
        self.insert(key, value)
    }

    /// Value for `key`, inserting `V::default()` first when absent
    pub fn get_or_default(&mut self, key: K) -> Result<&mut V>
    where
        K: Hash + Eq,
        V: Default,
    {
        let hash = self.hasher.hash_one(&key);
        let found = self.core.find_by(hash, |e| e.0 == key);
        let id = if found != NIL {
            found
        } else {
            self.core.insert_unique_by((key, V::default()), hash, |a, b| a.0 == b.0)?.0
        };
        Ok(&mut self.core.elem_mut(id).1)
    }

    /// Removes the entry for `key`, returning its value
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.core.find_by(self.hasher.hash_one(key), |e| e.0.borrow() == key);
        if id == NIL {
            return None;
        }
        Some(self.core.erase(id).0 .1)
    }

    /// Erases the entry at `cursor`, returning the cursor after it
    pub fn erase(&mut self, cursor: Cursor) -> Result<Cursor> {
        let id = self.core.resolve_cell(cursor)?;
        let (_, next) = self.core.erase(id);
        Ok(self.core.cursor(next))
    }

    /// Erases the half-open range `[from, to)`, returning `to`
    pub fn erase_range(&mut self, from: Cursor, to: Cursor) -> Result<Cursor> {
        let from = self.core.resolve(from)?;
        let to = self.core.resolve(to)?;
        let after = self.core.erase_range(from, to)?;
        Ok(self.core.cursor(after))
    }

    // ------------------------------------------------------------------
    // Cursor navigation
    // ------------------------------------------------------------------

    /// Cursor to the oldest entry, or `end` when empty
    pub fn begin(&self) -> Cursor {
        self.core.cursor(self.core.first_id())
    }

    /// The one-past-the-last sentinel cursor
    pub fn end(&self) -> Cursor {
        self.core.end()
    }

    /// Cursor after `cursor` in insertion order; `end` stays `end`
    pub fn next(&self, cursor: Cursor) -> Result<Cursor> {
        let id = self.core.resolve(cursor)?;
        if id == NIL {
            return Ok(self.core.end());
        }
        Ok(self.core.cursor(self.core.next_id(id)))
    }

    /// Cursor before `cursor`; stepping before the first entry is an error
    pub fn prev(&self, cursor: Cursor) -> Result<Cursor> {
        let id = self.core.resolve(cursor)?;
        let prev = if id == NIL { self.core.last_id() } else { self.core.prev_id(id) };
        if prev == NIL {
            return Err(TesseraError::invalid_argument("no entry precedes the cursor"));
        }
        Ok(self.core.cursor(prev))
    }

    /// Key of the entry at `cursor`
    pub fn key_at(&self, cursor: Cursor) -> Result<&K> {
        Ok(&self.core.elem(self.core.resolve_cell(cursor)?).0)
    }

    /// Value of the entry at `cursor`
    pub fn value_at(&self, cursor: Cursor) -> Result<&V> {
        Ok(&self.core.elem(self.core.resolve_cell(cursor)?).1)
    }

    /// Mutable value of the entry at `cursor`
    pub fn value_at_mut(&mut self, cursor: Cursor) -> Result<&mut V> {
        let id = self.core.resolve_cell(cursor)?;
        Ok(&mut self.core.elem_mut(id).1)
    }

    /// Key and value of the entry at `cursor`
    pub fn entry_at(&self, cursor: Cursor) -> Result<(&K, &V)> {
        let e = self.core.elem(self.core.resolve_cell(cursor)?);
        Ok((&e.0, &e.1))
    }

    // ------------------------------------------------------------------
    // Iteration
    // ------------------------------------------------------------------

    /// Iterates over `(key, value)` pairs in insertion order
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter { inner: self.core.iter() }
    }

    /// Iterates over keys in insertion order
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Iterates over values in insertion order
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    #[doc(hidden)]
    pub fn debug_validate(&self) {
        self.core.debug_validate();
    }
}

impl<K, V, S: BuildHasher + Default> Default for HashMap<K, V, S> {
    fn default() -> Self {
        HashMap::with_hasher(S::default())
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for HashMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.core.iter().map(|n| (&n.elem.0, &n.elem.1))).finish()
    }
}

impl<K: Hash + Eq, V: PartialEq, S: BuildHasher> PartialEq for HashMap<K, V, S> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.core.iter().all(|n| other.get(&n.elem.0) == Some(&n.elem.1))
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> Extend<(K, V)> for HashMap<K, V, S> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v).expect("cell capacity exceeded");
        }
    }
}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for HashMap<K, V, DefaultHashBuilder> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = HashMap::new();
        map.extend(iter);
        map
    }
}

impl<'a, K, V, S: BuildHasher> IntoIterator for &'a HashMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K, V, S> IntoIterator for HashMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;
    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter { core: self.core }
    }
}

/// Unordered map allowing equal keys
///
/// Equal keys form a contiguous run in the element list; a new duplicate
/// joins the end of its run, wherever the run sits in insertion order.
///
/// # Examples
///
/// ```
/// use tessera::HashMultiMap;
///
/// let mut map = HashMultiMap::new();
/// map.insert("k", 1).unwrap();
/// map.insert("other", 0).unwrap();
/// map.insert("k", 2).unwrap();
/// assert_eq!(map.count(&"k"), 2);
/// let values: Vec<i32> = map.values().copied().collect();
/// assert_eq!(values, [1, 2, 0]);
/// ```
#[derive(Clone)]
pub struct HashMultiMap<K, V, S = DefaultHashBuilder> {
    core: HashCore<(K, V)>,
    hasher: S,
}

impl<K, V> HashMultiMap<K, V, DefaultHashBuilder> {
    /// Creates an empty multimap with the default hasher
    pub fn new() -> Self {
        HashMultiMap::with_hasher(DefaultHashBuilder::default())
    }

    /// Creates an empty multimap sized for `capacity` cells
    pub fn with_capacity(capacity: usize) -> Self {
        HashMultiMap::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K, V, S: BuildHasher> HashMultiMap<K, V, S> {
    /// Creates an empty multimap using `hasher`
    pub fn with_hasher(hasher: S) -> Self {
        HashMultiMap { core: HashCore::new(), hasher }
    }

    /// Creates an empty multimap sized for `capacity` cells using `hasher`
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        HashMultiMap { core: HashCore::with_capacity(capacity), hasher }
    }

    /// Returns the multimap's build hasher
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Returns the number of entries
    pub fn len(&self) -> usize {
        self.core.len()
    }

    /// Returns `true` if the multimap holds no entries
    pub fn is_empty(&self) -> bool {
        self.core.len() == 0
    }

    /// Removes every entry, keeping hasher and bucket array
    pub fn clear(&mut self) {
        self.core.clear();
    }

    /// Current number of buckets
    pub fn bucket_count(&self) -> usize {
        self.core.bucket_count()
    }

    /// Cells per bucket on average
    pub fn load_factor(&self) -> f32 {
        self.core.load_factor()
    }

    /// Load factor ceiling that triggers growth (default 1.0)
    pub fn max_load_factor(&self) -> f32 {
        self.core.max_load_factor()
    }

    /// Sets the load factor ceiling, rehashing if already above it
    pub fn set_max_load_factor(&mut self, factor: f32) -> Result<()> {
        self.core.set_max_load_factor(factor)
    }

    /// Grows the bucket array to at least `min_buckets`
    pub fn rehash(&mut self, min_buckets: usize) {
        self.core.rehash(min_buckets);
    }

    /// Prepares for `additional` more entries without intermediate rehashes
    pub fn reserve(&mut self, additional: usize) {
        self.core.reserve(additional);
    }

    /// Exchanges the entire contents of two multimaps in O(1)
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    /// Value of the first entry under `key`
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.core.find_first_by(self.hasher.hash_one(key), |e| e.0.borrow() == key);
        if id == NIL {
            None
        } else {
            Some(&self.core.elem(id).1)
        }
    }

    /// Checked access to the first entry for `key`
    pub fn at<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).ok_or_else(TesseraError::key_not_found)
    }

    /// Returns `true` if `key` is present
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Number of entries under `key`
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.core.count_by(self.hasher.hash_one(key), |e| e.0.borrow() == key)
    }

    /// Cursor to the first entry for `key`, or `end`
    pub fn find<Q>(&self, key: &Q) -> Cursor
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.core
            .cursor(self.core.find_first_by(self.hasher.hash_one(key), |e| e.0.borrow() == key))
    }

    /// Half-open cursor range spanning the run of entries equal to `key`
    pub fn equal_range<Q>(&self, key: &Q) -> (Cursor, Cursor)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (first, past) =
            self.core.equal_range_by(self.hasher.hash_one(key), |e| e.0.borrow() == key);
        (self.core.cursor(first), self.core.cursor(past))
    }

    /// Inserts `key → value` at the end of its key's run
    ///
    /// A key with no run yet starts one at the list tail.
    pub fn insert(&mut self, key: K, value: V) -> Result<Cursor>
    where
        K: Hash + Eq,
    {
        let hash = self.hasher.hash_one(&key);
        let id = self.core.insert_multi_by((key, value), hash, |a, b| a.0 == b.0)?;
        Ok(self.core.cursor(id))
    }

    /// Value of the first entry for `key`, inserting `V::default()` first
    /// when the key is absent
    pub fn get_or_default(&mut self, key: K) -> Result<&mut V>
    where
        K: Hash + Eq,
        V: Default,
    {
        let hash = self.hasher.hash_one(&key);
        let found = self.core.find_first_by(hash, |e| e.0 == key);
        let id = if found != NIL {
            found
        } else {
            self.core.insert_multi_by((key, V::default()), hash, |a, b| a.0 == b.0)?
        };
        Ok(&mut self.core.elem_mut(id).1)
    }

    /// Removes every entry under `key`, returning how many were erased
    pub fn remove<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (mut cur, past) =
            self.core.equal_range_by(self.hasher.hash_one(key), |e| e.0.borrow() == key);
        let mut erased = 0;
        while cur != past {
            let (_, next) = self.core.erase(cur);
            cur = next;
            erased += 1;
        }
        erased
    }

    /// Erases the entry at `cursor`, returning the cursor after it
    pub fn erase(&mut self, cursor: Cursor) -> Result<Cursor> {
        let id = self.core.resolve_cell(cursor)?;
        let (_, next) = self.core.erase(id);
        Ok(self.core.cursor(next))
    }

    /// Erases the half-open range `[from, to)`, returning `to`
    pub fn erase_range(&mut self, from: Cursor, to: Cursor) -> Result<Cursor> {
        let from = self.core.resolve(from)?;
        let to = self.core.resolve(to)?;
        let after = self.core.erase_range(from, to)?;
        Ok(self.core.cursor(after))
    }

    /// Cursor to the oldest entry, or `end` when empty
    pub fn begin(&self) -> Cursor {
        self.core.cursor(self.core.first_id())
    }

    /// The one-past-the-last sentinel cursor
    pub fn end(&self) -> Cursor {
        self.core.end()
    }

    /// Cursor after `cursor`; `end` stays `end`
    pub fn next(&self, cursor: Cursor) -> Result<Cursor> {
        let id = self.core.resolve(cursor)?;
        if id == NIL {
            return Ok(self.core.end());
        }
        Ok(self.core.cursor(self.core.next_id(id)))
    }

    /// Cursor before `cursor`; stepping before the first entry is an error
    pub fn prev(&self, cursor: Cursor) -> Result<Cursor> {
        let id = self.core.resolve(cursor)?;
        let prev = if id == NIL { self.core.last_id() } else { self.core.prev_id(id) };
        if prev == NIL {
            return Err(TesseraError::invalid_argument("no entry precedes the cursor"));
        }
        Ok(self.core.cursor(prev))
    }

    /// Key of the entry at `cursor`
    pub fn key_at(&self, cursor: Cursor) -> Result<&K> {
        Ok(&self.core.elem(self.core.resolve_cell(cursor)?).0)
    }

    /// Value of the entry at `cursor`
    pub fn value_at(&self, cursor: Cursor) -> Result<&V> {
        Ok(&self.core.elem(self.core.resolve_cell(cursor)?).1)
    }

    /// Mutable value of the entry at `cursor`
    pub fn value_at_mut(&mut self, cursor: Cursor) -> Result<&mut V> {
        let id = self.core.resolve_cell(cursor)?;
        Ok(&mut self.core.elem_mut(id).1)
    }

    /// Iterates over `(key, value)` pairs in insertion order
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter { inner: self.core.iter() }
    }

    /// Iterates over keys in insertion order
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Iterates over values in insertion order
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    #[doc(hidden)]
    pub fn debug_validate(&self) {
        self.core.debug_validate();
    }
}

impl<K, V, S: BuildHasher + Default> Default for HashMultiMap<K, V, S> {
    fn default() -> Self {
        HashMultiMap::with_hasher(S::default())
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for HashMultiMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.core.iter().map(|n| (&n.elem.0, &n.elem.1))).finish()
    }
}

impl<K: Hash + Eq, V: PartialEq, S: BuildHasher> PartialEq for HashMultiMap<K, V, S> {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        // Compare run by run: same key multiplicity, values a permutation.
        let mut cur = self.begin();
        while !cur.is_end() {
            let key = match self.key_at(cur) {
                Ok(key) => key,
                Err(_) => return false,
            };
            let (mine, theirs) = (self.run_values(key), other.run_values(key));
            if mine.len() != theirs.len() {
                return false;
            }
            let mut unmatched: Vec<&V> = theirs;
            for value in mine {
                match unmatched.iter().position(|v| *v == value) {
                    Some(pos) => {
                        unmatched.swap_remove(pos);
                    }
                    None => return false,
                }
            }
            // Skip to the end of this run.
            let (_, past) = self.equal_range(key);
            cur = past;
        }
        true
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> HashMultiMap<K, V, S> {
    fn run_values<'a>(&'a self, key: &K) -> Vec<&'a V> {
        let (mut cur, past) = self.equal_range(key);
        let mut values = Vec::new();
        while cur != past {
            if let Ok(v) = self.value_at(cur) {
                values.push(v);
            }
            cur = match self.next(cur) {
                Ok(next) => next,
                Err(_) => break,
            };
        }
        values
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> Extend<(K, V)> for HashMultiMap<K, V, S> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v).expect("cell capacity exceeded");
        }
    }
}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for HashMultiMap<K, V, DefaultHashBuilder> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = HashMultiMap::new();
        map.extend(iter);
        map
    }
}

impl<'a, K, V, S: BuildHasher> IntoIterator for &'a HashMultiMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K, V, S> IntoIterator for HashMultiMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;
    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter { core: self.core }
    }
}

/// Iterator over the entries of an unordered map, in insertion order
pub struct Iter<'a, K, V> {
    inner: CellIter<'a, HashNode<(K, V)>>,
}

impl<'a, K, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Iter { inner: self.inner.clone() }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|n| (&n.elem.0, &n.elem.1))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|n| (&n.elem.0, &n.elem.1))
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}

/// Iterator over the keys of an unordered map
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V> ExactSizeIterator for Keys<'a, K, V> {}

/// Iterator over the values of an unordered map
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V> ExactSizeIterator for Values<'a, K, V> {}

/// Consuming iterator over the entries of an unordered map
pub struct IntoIter<K, V> {
    core: HashCore<(K, V)>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.core.pop_front_raw()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.core.len(), Some(self.core.len()))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Fnv1aBuildHasher;

    #[test]
    fn test_insert_and_get() {
        let mut map = HashMap::new();
        assert!(map.insert("a", 1).unwrap().1);
        assert!(map.insert("b", 2).unwrap().1);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a"), Some(&1));
        assert_eq!(map.get("c"), None);
    }

    #[test]
    fn test_duplicate_insert_keeps_first_value() {
        let mut map = HashMap::new();
        map.insert("a".to_string(), 1).unwrap();
        let (cursor, inserted) = map.insert("a".to_string(), 3).unwrap();
        assert!(!inserted);
        assert_eq!(map.value_at(cursor), Ok(&1));
        assert_eq!(map.len(), 1);
        assert_eq!(map.at("a"), Ok(&1));
    }

    #[test]
    fn test_insertion_order_iteration() {
        let mut map = HashMap::new();
        for (k, v) in [("z", 1), ("a", 2), ("m", 3)] {
            map.insert(k, v).unwrap();
        }
        let keys: Vec<&str> = map.keys().copied().collect();
        assert_eq!(keys, ["z", "a", "m"]);
        map.debug_validate();
    }

    #[test]
    fn test_borrowed_key_lookup() {
        let mut map = HashMap::new();
        map.insert("hello".to_string(), 1).unwrap();
        // &str probes a String-keyed map.
        assert_eq!(map.get("hello"), Some(&1));
        assert_eq!(map.remove("hello"), Some(1));
        assert!(map.is_empty());
    }

    #[test]
    fn test_growth_preserves_order_and_cursors() {
        let mut map = HashMap::new();
        map.insert(0, 0).unwrap();
        let early = map.find(&0);
        for i in 1..1000 {
            map.insert(i, i).unwrap();
        }
        assert!(map.bucket_count() >= 1000);
        assert_eq!(map.value_at(early), Ok(&0));
        let keys: Vec<i32> = map.keys().copied().collect();
        assert_eq!(keys, (0..1000).collect::<Vec<_>>());
        map.debug_validate();
    }

    #[test]
    fn test_deterministic_hasher() {
        let mut map: HashMap<&str, i32, Fnv1aBuildHasher> =
            HashMap::with_hasher(Fnv1aBuildHasher);
        map.insert("x", 1).unwrap();
        assert_eq!(map.get("x"), Some(&1));
    }

    #[test]
    fn test_remove_and_erase() {
        let mut map: HashMap<i32, i32> = (0..10).map(|i| (i, i)).collect();
        assert_eq!(map.remove(&5), Some(5));
        assert_eq!(map.remove(&5), None);

        let cursor = map.find(&6);
        let after = map.erase(cursor).unwrap();
        assert_eq!(map.key_at(after), Ok(&7));
        assert!(map.value_at(cursor).is_err());
        assert_eq!(map.len(), 8);
        map.debug_validate();
    }

    #[test]
    fn test_get_or_default_accumulates() {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for word in ["the", "cat", "the"] {
            *counts.get_or_default(word).unwrap() += 1;
        }
        assert_eq!(counts.at(&"the"), Ok(&2));
        assert_eq!(counts.at(&"cat"), Ok(&1));
    }

    #[test]
    fn test_swap_carries_cursors() {
        let mut a: HashMap<i32, i32> = [(1, 1), (2, 2), (3, 3)].into_iter().collect();
        let mut b: HashMap<i32, i32> = [(10, 10), (20, 20)].into_iter().collect();
        let from_a = a.find(&2);
        a.swap(&mut b);
        assert_eq!(a.len(), 2);
        assert_eq!(b.value_at(from_a), Ok(&2));
        assert!(a.value_at(from_a).is_err());
    }

    #[test]
    fn test_eq_ignores_insertion_order() {
        let a: HashMap<&str, i32> = [("x", 1), ("y", 2)].into_iter().collect();
        let b: HashMap<&str, i32> = [("y", 2), ("x", 1)].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_multimap_runs_stay_contiguous() {
        let mut map = HashMultiMap::new();
        map.insert("k", 1).unwrap();
        map.insert("other", 0).unwrap();
        map.insert("k", 2).unwrap();
        map.insert("k", 3).unwrap();

        assert_eq!(map.count(&"k"), 3);
        let values: Vec<i32> = map.values().copied().collect();
        assert_eq!(values, [1, 2, 3, 0]);

        let (mut cur, past) = map.equal_range(&"k");
        let mut run = Vec::new();
        while cur != past {
            run.push(*map.value_at(cur).unwrap());
            cur = map.next(cur).unwrap();
        }
        assert_eq!(run, [1, 2, 3]);
        map.debug_validate();
    }

    #[test]
    fn test_multimap_remove_all() {
        let mut map = HashMultiMap::new();
        for v in 0..3 {
            map.insert("dup", v).unwrap();
        }
        map.insert("keep", 9).unwrap();
        assert_eq!(map.remove(&"dup"), 3);
        assert_eq!(map.remove(&"dup"), 0);
        assert_eq!(map.len(), 1);
        map.debug_validate();
    }

    #[test]
    fn test_multimap_runs_survive_rehash() {
        let mut map = HashMultiMap::new();
        for i in 0..100 {
            map.insert(i % 10, i).unwrap();
        }
        assert_eq!(map.len(), 100);
        for key in 0..10 {
            assert_eq!(map.count(&key), 10);
            let (mut cur, past) = map.equal_range(&key);
            let mut seen = 0;
            while cur != past {
                assert_eq!(map.key_at(cur), Ok(&key));
                cur = map.next(cur).unwrap();
                seen += 1;
            }
            assert_eq!(seen, 10);
        }
        map.debug_validate();
    }

    #[test]
    fn test_multimap_eq_is_per_run_permutation() {
        let a: HashMultiMap<&str, i32> = [("k", 1), ("k", 2)].into_iter().collect();
        let b: HashMultiMap<&str, i32> = [("k", 2), ("k", 1)].into_iter().collect();
        let c: HashMultiMap<&str, i32> = [("k", 1), ("k", 1)].into_iter().collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_into_iter_insertion_order() {
        let map: HashMap<&str, i32> = [("b", 2), ("a", 1)].into_iter().collect();
        let pairs: Vec<(&str, i32)> = map.into_iter().collect();
        assert_eq!(pairs, [("b", 2), ("a", 1)]);
    }

    #[test]
    fn test_clear_retains_hasher_state() {
        let mut map: HashMap<i32, i32> = (0..100).map(|i| (i, i)).collect();
        let buckets = map.bucket_count();
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.bucket_count(), buckets);
        map.insert(1, 1).unwrap();
        assert_eq!(map.get(&1), Some(&1));
    }
}
