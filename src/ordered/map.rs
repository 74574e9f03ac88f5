//! Ordered maps backed by the red-black index
//!
//! [`TreeMap`] keeps one cell per key; [`TreeMultiMap`] keeps every inserted
//! pair and groups equivalent keys into contiguous runs. Both iterate in
//! comparator order and share the cursor protocol.

use std::cmp::Ordering;
use std::fmt;

use crate::compare::{Comparator, Natural};
use crate::cursor::Cursor;
use crate::error::{Result, TesseraError};
use crate::ordered::core::{OrdCore, OrdNode};
use crate::storage::{CellIter, NIL};

/// Ordered unique map over a comparator
///
/// Keys are held in the order induced by `C` (default: the natural `Ord`
/// order). A key is a duplicate iff it is *equivalent* to a stored key under
/// the comparator — `insert` then leaves the map unchanged and reports the
/// existing cell. Cell identity is stable: insertion and rebalancing never
/// invalidate cursors, erasure invalidates only cursors to the erased cell.
///
/// # Examples
///
/// ```
/// use tessera::TreeMap;
///
/// let mut map = TreeMap::new();
/// map.insert(2, "b").unwrap();
/// map.insert(1, "a").unwrap();
/// map.insert(3, "c").unwrap();
///
/// let keys: Vec<i32> = map.keys().copied().collect();
/// assert_eq!(keys, [1, 2, 3]);
/// assert_eq!(map.at(&2), Ok(&"b"));
/// ```
///
/// # Performance Characteristics
///
/// - Lookup, insert, erase: O(log n)
/// - Hint insert with a correct hint: O(1) placement plus rebalance
/// - Iteration: O(1) per step over the internal cell list
#[derive(Clone)]
pub struct TreeMap<K, V, C = Natural> {
    core: OrdCore<(K, V)>,
    cmp: C,
}

impl<K: Ord, V> TreeMap<K, V> {
    /// Creates an empty map ordered by the keys' natural order
    pub fn new() -> Self {
        TreeMap::with_comparator(Natural)
    }
}

impl<K, V, C: Comparator<K>> TreeMap<K, V, C> {
    /// Creates an empty map ordered by `cmp`
    pub fn with_comparator(cmp: C) -> Self {
        TreeMap { core: OrdCore::new(), cmp }
    }

    /// Builds a map from `iter`, ordered by `cmp`
    pub fn from_iter_with_comparator<I>(iter: I, cmp: C) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = TreeMap::with_comparator(cmp);
        for (k, v) in iter {
            map.insert(k, v)?;
        }
        Ok(map)
    }

    /// Returns the number of entries
    pub fn len(&self) -> usize {
        self.core.len()
    }

    /// Returns `true` if the map holds no entries
    pub fn is_empty(&self) -> bool {
        self.core.len() == 0
    }

    /// Removes every entry, keeping the comparator
    pub fn clear(&mut self) {
        self.core.clear();
    }

    /// Returns the map's key comparator
    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    /// Comparator over whole entries, ordering by the key part
    pub fn value_comparator(&self) -> impl Comparator<(K, V)> + '_ {
        crate::compare::from_fn(move |a: &(K, V), b: &(K, V)| self.cmp.compare(&a.0, &b.0))
    }

    /// Exchanges the entire contents of two maps in O(1)
    ///
    /// Cursors follow the cells they name: a cursor obtained from `self`
    /// before the call dereferences into `other` afterwards.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    fn ord_to<'k>(&'k self, key: &'k K) -> impl FnMut(&(K, V)) -> Ordering + 'k {
        move |e| self.cmp.compare(&e.0, key)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Returns the value for a key equivalent to `key`
    pub fn get(&self, key: &K) -> Option<&V> {
        let id = self.core.find_by(self.ord_to(key));
        if id == NIL {
            None
        } else {
            Some(&self.core.elem(id).1)
        }
    }

    /// Returns a mutable reference to the value for `key`
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.core.find_by(self.ord_to(key));
        if id == NIL {
            None
        } else {
            Some(&mut self.core.elem_mut(id).1)
        }
    }

    /// Checked access: the value for `key`, or `KeyNotFound`
    pub fn at(&self, key: &K) -> Result<&V> {
        self.get(key).ok_or_else(TesseraError::key_not_found)
    }

    /// Checked mutable access: the value for `key`, or `KeyNotFound`
    pub fn at_mut(&mut self, key: &K) -> Result<&mut V> {
        self.get_mut(key).ok_or_else(TesseraError::key_not_found)
    }

    /// Returns `true` if some key is equivalent to `key`
    pub fn contains_key(&self, key: &K) -> bool {
        self.core.find_by(self.ord_to(key)) != NIL
    }

    /// Number of entries with a key equivalent to `key` (0 or 1)
    pub fn count(&self, key: &K) -> usize {
        usize::from(self.contains_key(key))
    }

    /// Cursor to the entry for `key`, or `end`
    pub fn find(&self, key: &K) -> Cursor {
        self.core.cursor(self.core.find_by(self.ord_to(key)))
    }

    /// Cursor to the first entry whose key is not less than `key`
    pub fn lower_bound(&self, key: &K) -> Cursor {
        self.core.cursor(self.core.lower_bound_by(self.ord_to(key)))
    }

    /// Cursor to the first entry whose key is strictly greater than `key`
    pub fn upper_bound(&self, key: &K) -> Cursor {
        self.core.cursor(self.core.upper_bound_by(self.ord_to(key)))
    }

    /// Half-open cursor range `[lower_bound(key), upper_bound(key))`
    pub fn equal_range(&self, key: &K) -> (Cursor, Cursor) {
        let (lower, upper) = self.core.equal_range_by(self.ord_to(key));
        (self.core.cursor(lower), self.core.cursor(upper))
    }

    // ------------------------------------------------------------------
    // Modifiers
    // ------------------------------------------------------------------

    /// Inserts `key → value` unless an equivalent key is present
    ///
    /// Returns the cursor of the decisive cell and whether a new cell was
    /// created. On a duplicate the stored value is left untouched; use
    /// [`insert_or_assign`](TreeMap::insert_or_assign) for replace
    /// semantics.
    ///
    /// # Examples
    ///
    /// ```
    /// use tessera::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    /// let (_, fresh) = map.insert("a", 1).unwrap();
    /// assert!(fresh);
    /// let (cursor, fresh) = map.insert("a", 99).unwrap();
    /// assert!(!fresh);
    /// assert_eq!(map.value_at(cursor), Ok(&1));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Result<(Cursor, bool)> {
        let cmp = &self.cmp;
        let (id, inserted) =
            self.core.insert_unique_by((key, value), |a, b| cmp.compare(&a.0, &b.0))?;
        Ok((self.core.cursor(id), inserted))
    }

    /// Inserts, overwriting the value of an equivalent key
    pub fn insert_or_assign(&mut self, key: K, value: V) -> Result<(Cursor, bool)> {
        let id = self.core.find_by(self.ord_to(&key));
        if id != NIL {
            self.core.elem_mut(id).1 = value;
            return Ok((self.core.cursor(id), false));
        }
        self.insert(key, value)
    }

    /// Inserts with a placement hint
    ///
    /// `hint` names the entry expected to precede `key`; `end` means
    /// "append". When the hint is right the placement is O(1); a wrong hint
    /// falls back to the full insert. A duplicate key returns the cursor of
    /// the existing equivalent entry.
    pub fn insert_hint(&mut self, hint: Cursor, key: K, value: V) -> Result<Cursor> {
        let hint_id = self.core.resolve(hint)?;
        let before = {
            let cmp = &self.cmp;
            if hint_id == NIL {
                let tail = self.core.last_id();
                if tail == NIL || cmp.lt(&self.core.elem(tail).0, &key) {
                    Some(NIL)
                } else {
                    None
                }
            } else if cmp.lt(&self.core.elem(hint_id).0, &key) {
                let next = self.core.next_id(hint_id);
                if next == NIL || cmp.lt(&key, &self.core.elem(next).0) {
                    Some(next)
                } else {
                    None
                }
            } else {
                None
            }
        };
        match before {
            Some(before) => {
                let id = self.core.place_before(before, (key, value))?;
                self.core.note_hint_hit();
                Ok(self.core.cursor(id))
            }
            None => {
                let (cursor, _) = self.insert(key, value)?;
                Ok(cursor)
            }
        }
    }

    /// Value for `key`, inserting `V::default()` first when absent
    pub fn get_or_default(&mut self, key: K) -> Result<&mut V>
    where
        V: Default,
    {
        let found = self.core.find_by(self.ord_to(&key));
        let id = if found != NIL {
            found
        } else {
            let cmp = &self.cmp;
            self.core.insert_unique_by((key, V::default()), |a, b| cmp.compare(&a.0, &b.0))?.0
        };
        Ok(&mut self.core.elem_mut(id).1)
    }

    /// Removes the entry for `key`, returning its value
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.core.find_by(self.ord_to(key));
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
    ///
    /// A range that is not a forward walk of this map is rejected before
    /// anything is erased.
    pub fn erase_range(&mut self, from: Cursor, to: Cursor) -> Result<Cursor> {
        let from = self.core.resolve(from)?;
        let to = self.core.resolve(to)?;
        let after = self.core.erase_range(from, to)?;
        Ok(self.core.cursor(after))
    }

    // ------------------------------------------------------------------
    // Cursor navigation
    // ------------------------------------------------------------------

    /// Cursor to the first entry, or `end` when empty
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

    /// Key and value of the entry at `cursor`
    pub fn entry_at(&self, cursor: Cursor) -> Result<(&K, &V)> {
        let e = self.core.elem(self.core.resolve_cell(cursor)?);
        Ok((&e.0, &e.1))
    }

    // ------------------------------------------------------------------
    // Iteration
    // ------------------------------------------------------------------

    /// Iterates over `(key, value)` pairs in comparator order
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter { inner: self.core.iter() }
    }

    /// Iterates over keys in comparator order
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Iterates over values in key order
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Hint insertions that took the O(1) fast path
    pub fn hint_hits(&self) -> u64 {
        self.core.hint_hits()
    }

    #[doc(hidden)]
    pub fn debug_validate(&self) {
        self.core.debug_validate();
    }
}

impl<K, V, C: Comparator<K> + Default> Default for TreeMap<K, V, C> {
    fn default() -> Self {
        TreeMap::with_comparator(C::default())
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for TreeMap<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.core.iter().map(|n| (&n.elem.0, &n.elem.1))).finish()
    }
}

impl<K: PartialEq, V: PartialEq, C: Comparator<K>> PartialEq for TreeMap<K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .core
                .iter()
                .zip(other.core.iter())
                .all(|(a, b)| a.elem.0 == b.elem.0 && a.elem.1 == b.elem.1)
    }
}

impl<K, V, C: Comparator<K>> Extend<(K, V)> for TreeMap<K, V, C> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v).expect("cell capacity exceeded");
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for TreeMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = TreeMap::new();
        map.extend(iter);
        map
    }
}

impl<'a, K, V, C: Comparator<K>> IntoIterator for &'a TreeMap<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K, V, C> IntoIterator for TreeMap<K, V, C> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;
    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter { core: self.core }
    }
}

/// Ordered map allowing equivalent keys
///
/// Equivalent keys form a contiguous run in insertion order (stable), so
/// [`equal_range`](TreeMultiMap::equal_range) spans exactly the run.
///
/// # Examples
///
/// ```
/// use tessera::TreeMultiMap;
///
/// let mut map = TreeMultiMap::new();
/// map.insert(1, "first").unwrap();
/// map.insert(1, "second").unwrap();
/// assert_eq!(map.count(&1), 2);
/// ```
#[derive(Clone)]
pub struct TreeMultiMap<K, V, C = Natural> {
    core: OrdCore<(K, V)>,
    cmp: C,
}

impl<K: Ord, V> TreeMultiMap<K, V> {
    /// Creates an empty multimap ordered by the keys' natural order
    pub fn new() -> Self {
        TreeMultiMap::with_comparator(Natural)
    }
}

impl<K, V, C: Comparator<K>> TreeMultiMap<K, V, C> {
    /// Creates an empty multimap ordered by `cmp`
    pub fn with_comparator(cmp: C) -> Self {
        TreeMultiMap { core: OrdCore::new(), cmp }
    }

    /// Builds a multimap from `iter`, ordered by `cmp`
    pub fn from_iter_with_comparator<I>(iter: I, cmp: C) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = TreeMultiMap::with_comparator(cmp);
        for (k, v) in iter {
            map.insert(k, v)?;
        }
        Ok(map)
    }

    /// Returns the number of entries
    pub fn len(&self) -> usize {
        self.core.len()
    }

    /// Returns `true` if the multimap holds no entries
    pub fn is_empty(&self) -> bool {
        self.core.len() == 0
    }

    /// Removes every entry, keeping the comparator
    pub fn clear(&mut self) {
        self.core.clear();
    }

    /// Returns the multimap's key comparator
    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    /// Comparator over whole entries, ordering by the key part
    pub fn value_comparator(&self) -> impl Comparator<(K, V)> + '_ {
        crate::compare::from_fn(move |a: &(K, V), b: &(K, V)| self.cmp.compare(&a.0, &b.0))
    }

    /// Exchanges the entire contents of two multimaps in O(1)
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    fn ord_to<'k>(&'k self, key: &'k K) -> impl FnMut(&(K, V)) -> Ordering + 'k {
        move |e| self.cmp.compare(&e.0, key)
    }

    /// Value of the first entry with a key equivalent to `key`
    pub fn get(&self, key: &K) -> Option<&V> {
        let id = self.core.find_by(self.ord_to(key));
        if id == NIL {
            None
        } else {
            Some(&self.core.elem(id).1)
        }
    }

    /// Checked access to the first entry for `key`
    pub fn at(&self, key: &K) -> Result<&V> {
        self.get(key).ok_or_else(TesseraError::key_not_found)
    }

    /// Returns `true` if some key is equivalent to `key`
    pub fn contains_key(&self, key: &K) -> bool {
        self.core.find_by(self.ord_to(key)) != NIL
    }

    /// Number of entries with a key equivalent to `key`
    pub fn count(&self, key: &K) -> usize {
        self.core.count_by(self.ord_to(key))
    }

    /// Cursor to the first entry for `key`, or `end`
    pub fn find(&self, key: &K) -> Cursor {
        self.core.cursor(self.core.find_by(self.ord_to(key)))
    }

    /// Cursor to the first entry whose key is not less than `key`
    pub fn lower_bound(&self, key: &K) -> Cursor {
        self.core.cursor(self.core.lower_bound_by(self.ord_to(key)))
    }

    /// Cursor to the first entry whose key is strictly greater than `key`
    pub fn upper_bound(&self, key: &K) -> Cursor {
        self.core.cursor(self.core.upper_bound_by(self.ord_to(key)))
    }

    /// Half-open cursor range spanning the entries equivalent to `key`
    pub fn equal_range(&self, key: &K) -> (Cursor, Cursor) {
        let (lower, upper) = self.core.equal_range_by(self.ord_to(key));
        (self.core.cursor(lower), self.core.cursor(upper))
    }

    /// Inserts `key → value` after any entries with an equivalent key
    ///
    /// Equivalent keys therefore keep their insertion order.
    pub fn insert(&mut self, key: K, value: V) -> Result<Cursor> {
        let cmp = &self.cmp;
        let id = self.core.insert_multi_by((key, value), |a, b| cmp.compare(&a.0, &b.0))?;
        Ok(self.core.cursor(id))
    }

    /// Inserts with a placement hint; `end` means "append"
    ///
    /// The hint is right when its key precedes or is equivalent to `key` and
    /// the following key (if any) is strictly greater.
    pub fn insert_hint(&mut self, hint: Cursor, key: K, value: V) -> Result<Cursor> {
        let hint_id = self.core.resolve(hint)?;
        let before = {
            let cmp = &self.cmp;
            if hint_id == NIL {
                let tail = self.core.last_id();
                if tail == NIL || !cmp.lt(&key, &self.core.elem(tail).0) {
                    Some(NIL)
                } else {
                    None
                }
            } else if !cmp.lt(&key, &self.core.elem(hint_id).0) {
                let next = self.core.next_id(hint_id);
                if next == NIL || cmp.lt(&key, &self.core.elem(next).0) {
                    Some(next)
                } else {
                    None
                }
            } else {
                None
            }
        };
        match before {
            Some(before) => {
                let id = self.core.place_before(before, (key, value))?;
                self.core.note_hint_hit();
                Ok(self.core.cursor(id))
            }
            None => self.insert(key, value),
        }
    }

    /// Value of the first entry for `key`, inserting `V::default()` first
    /// when no equivalent key is present
    pub fn get_or_default(&mut self, key: K) -> Result<&mut V>
    where
        V: Default,
    {
        let found = self.core.find_by(self.ord_to(&key));
        let id = if found != NIL {
            found
        } else {
            let cmp = &self.cmp;
            self.core.insert_multi_by((key, V::default()), |a, b| cmp.compare(&a.0, &b.0))?
        };
        Ok(&mut self.core.elem_mut(id).1)
    }

    /// Removes every entry with a key equivalent to `key`, returning how
    /// many were erased
    pub fn remove(&mut self, key: &K) -> usize {
        let (mut cur, upper) = self.core.equal_range_by(self.ord_to(key));
        let mut erased = 0;
        while cur != upper {
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

    /// Cursor to the first entry, or `end` when empty
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

    /// Iterates over `(key, value)` pairs in comparator order
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter { inner: self.core.iter() }
    }

    /// Iterates over keys in comparator order
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Iterates over values in key order
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Hint insertions that took the O(1) fast path
    pub fn hint_hits(&self) -> u64 {
        self.core.hint_hits()
    }

    #[doc(hidden)]
    pub fn debug_validate(&self) {
        self.core.debug_validate();
    }
}

impl<K, V, C: Comparator<K> + Default> Default for TreeMultiMap<K, V, C> {
    fn default() -> Self {
        TreeMultiMap::with_comparator(C::default())
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for TreeMultiMap<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.core.iter().map(|n| (&n.elem.0, &n.elem.1))).finish()
    }
}

impl<K: PartialEq, V: PartialEq, C: Comparator<K>> PartialEq for TreeMultiMap<K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .core
                .iter()
                .zip(other.core.iter())
                .all(|(a, b)| a.elem.0 == b.elem.0 && a.elem.1 == b.elem.1)
    }
}

impl<K, V, C: Comparator<K>> Extend<(K, V)> for TreeMultiMap<K, V, C> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v).expect("cell capacity exceeded");
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for TreeMultiMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = TreeMultiMap::new();
        map.extend(iter);
        map
    }
}

impl<'a, K, V, C: Comparator<K>> IntoIterator for &'a TreeMultiMap<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K, V, C> IntoIterator for TreeMultiMap<K, V, C> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;
    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter { core: self.core }
    }
}

/// Iterator over the entries of an ordered map
pub struct Iter<'a, K, V> {
    inner: CellIter<'a, OrdNode<(K, V)>>,
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

/// Iterator over the keys of an ordered map
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

impl<'a, K, V> DoubleEndedIterator for Keys<'a, K, V> {
    fn next_back(&mut self) -> Option<&'a K> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<'a, K, V> ExactSizeIterator for Keys<'a, K, V> {}

/// Iterator over the values of an ordered map
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

impl<'a, K, V> DoubleEndedIterator for Values<'a, K, V> {
    fn next_back(&mut self) -> Option<&'a V> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<'a, K, V> ExactSizeIterator for Values<'a, K, V> {}

/// Consuming iterator over the entries of an ordered map
pub struct IntoIter<K, V> {
    core: OrdCore<(K, V)>,
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
    use crate::compare::from_fn;

    #[test]
    fn test_insert_and_get() {
        let mut map = TreeMap::new();
        assert_eq!(map.insert(2, "b").unwrap().1, true);
        assert_eq!(map.insert(1, "a").unwrap().1, true);
        assert_eq!(map.len(), 2);

        assert_eq!(map.get(&1), Some(&"a"));
        assert_eq!(map.get(&2), Some(&"b"));
        assert_eq!(map.get(&3), None);
        assert!(map.at(&3).is_err());
    }

    #[test]
    fn test_insert_duplicate_keeps_original() {
        let mut map = TreeMap::new();
        map.insert("k", 1).unwrap();
        let (cursor, inserted) = map.insert("k", 2).unwrap();
        assert!(!inserted);
        assert_eq!(map.value_at(cursor), Ok(&1));
        assert_eq!(map.len(), 1);

        let (_, replaced) = map.insert_or_assign("k", 2).unwrap();
        assert!(!replaced);
        assert_eq!(map.get(&"k"), Some(&2));
    }

    #[test]
    fn test_iteration_is_sorted() {
        let mut map = TreeMap::new();
        for key in [5, 3, 8, 1, 9, 2] {
            map.insert(key, key * 10).unwrap();
        }
        let keys: Vec<i32> = map.keys().copied().collect();
        assert_eq!(keys, [1, 2, 3, 5, 8, 9]);
        let back: Vec<i32> = map.keys().rev().copied().collect();
        assert_eq!(back, [9, 8, 5, 3, 2, 1]);
        map.debug_validate();
    }

    #[test]
    fn test_custom_comparator() {
        let by_desc = from_fn(|a: &i32, b: &i32| b.cmp(a));
        let mut map = TreeMap::with_comparator(by_desc);
        for key in [1, 3, 2] {
            map.insert(key, ()).unwrap();
        }
        let keys: Vec<i32> = map.keys().copied().collect();
        assert_eq!(keys, [3, 2, 1]);
    }

    #[test]
    fn test_bounds_and_equal_range() {
        let mut map = TreeMap::new();
        for key in [10, 20, 30] {
            map.insert(key, ()).unwrap();
        }
        assert_eq!(map.key_at(map.lower_bound(&20)), Ok(&20));
        assert_eq!(map.key_at(map.upper_bound(&20)), Ok(&30));
        assert_eq!(map.key_at(map.lower_bound(&15)), Ok(&20));
        assert!(map.upper_bound(&30).is_end());

        let (lo, hi) = map.equal_range(&20);
        assert_eq!(map.key_at(lo), Ok(&20));
        assert_eq!(map.key_at(hi), Ok(&30));
    }

    #[test]
    fn test_hint_insert_fast_path() {
        let mut map = TreeMap::new();
        for key in 1..=3 {
            let end = map.end();
            map.insert_hint(end, key, key).unwrap();
        }
        assert_eq!(map.hint_hits(), 3);
        let keys: Vec<i32> = map.keys().copied().collect();
        assert_eq!(keys, [1, 2, 3]);
        map.debug_validate();
    }

    #[test]
    fn test_hint_insert_wrong_hint_falls_back() {
        let mut map = TreeMap::new();
        map.insert(10, ()).unwrap();
        map.insert(30, ()).unwrap();
        // Hinting at end for a middle key is wrong; result is still correct.
        let end = map.end();
        map.insert_hint(end, 20, ()).unwrap();
        assert_eq!(map.hint_hits(), 0);
        let keys: Vec<i32> = map.keys().copied().collect();
        assert_eq!(keys, [10, 20, 30]);
    }

    #[test]
    fn test_hint_insert_duplicate_returns_existing() {
        let mut map = TreeMap::new();
        let (existing, _) = map.insert(5, "first").unwrap();
        let end = map.end();
        let cursor = map.insert_hint(end, 5, "second").unwrap();
        assert_eq!(cursor, existing);
        assert_eq!(map.get(&5), Some(&"first"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_remove_and_erase() {
        let mut map = TreeMap::new();
        for key in 1..=5 {
            map.insert(key, key).unwrap();
        }
        assert_eq!(map.remove(&3), Some(3));
        assert_eq!(map.remove(&3), None);

        let cursor = map.find(&4);
        let after = map.erase(cursor).unwrap();
        assert_eq!(map.key_at(after), Ok(&5));
        assert_eq!(map.len(), 3);
        // The erased cursor is now rejected.
        assert!(map.value_at(cursor).is_err());
        map.debug_validate();
    }

    #[test]
    fn test_erase_range() {
        let mut map: TreeMap<i32, i32> = (1..=10).map(|k| (k, k)).collect();
        let from = map.find(&3);
        let to = map.find(&8);
        let after = map.erase_range(from, to).unwrap();
        assert_eq!(map.key_at(after), Ok(&8));
        let keys: Vec<i32> = map.keys().copied().collect();
        assert_eq!(keys, [1, 2, 8, 9, 10]);
        map.debug_validate();
    }

    #[test]
    fn test_cursor_from_other_container_rejected() {
        let mut a = TreeMap::new();
        let mut b = TreeMap::new();
        a.insert(1, 1).unwrap();
        b.insert(1, 1).unwrap();
        let foreign = b.find(&1);
        assert!(a.value_at(foreign).is_err());
        assert!(a.erase(foreign).is_err());
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_swap_carries_cursors() {
        let mut a: TreeMap<i32, i32> = [(1, 1), (2, 2), (3, 3)].into_iter().collect();
        let mut b: TreeMap<i32, i32> = [(10, 10), (20, 20)].into_iter().collect();
        let from_a = a.find(&2);

        a.swap(&mut b);
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 3);
        // The old cursor now belongs to b, which received a's cells.
        assert_eq!(b.value_at(from_a), Ok(&2));
        assert!(a.value_at(from_a).is_err());
    }

    #[test]
    fn test_get_or_default() {
        let mut map: TreeMap<&str, i32> = TreeMap::new();
        *map.get_or_default("x").unwrap() += 5;
        *map.get_or_default("x").unwrap() += 5;
        assert_eq!(map.get(&"x"), Some(&10));
    }

    #[test]
    fn test_value_comparator_orders_entries_by_key() {
        let map: TreeMap<i32, &str> = [(2, "b"), (1, "a")].into_iter().collect();
        let vc = map.value_comparator();
        assert!(vc.lt(&(1, "z"), &(2, "a")));
        assert!(vc.equiv(&(1, "x"), &(1, "y")));
    }

    #[test]
    fn test_multimap_insert_order_within_run() {
        let mut map = TreeMultiMap::new();
        map.insert(2, "first").unwrap();
        map.insert(1, "low").unwrap();
        map.insert(2, "second").unwrap();
        map.insert(3, "high").unwrap();
        map.insert(2, "third").unwrap();

        let values: Vec<&str> = map.values().copied().collect();
        assert_eq!(values, ["low", "first", "second", "third", "high"]);
        assert_eq!(map.count(&2), 3);
        map.debug_validate();
    }

    #[test]
    fn test_multimap_equal_range_spans_run() {
        let mut map = TreeMultiMap::new();
        for (k, v) in [(2, 'a'), (2, 'b'), (1, 'c'), (2, 'd'), (3, 'e')] {
            map.insert(k, v).unwrap();
        }
        let (mut cur, upper) = map.equal_range(&2);
        let mut run = Vec::new();
        while cur != upper {
            run.push(*map.value_at(cur).unwrap());
            cur = map.next(cur).unwrap();
        }
        assert_eq!(run, ['a', 'b', 'd']);
    }

    #[test]
    fn test_multimap_remove_all() {
        let mut map = TreeMultiMap::new();
        for v in ["a", "b", "c"] {
            map.insert(7, v).unwrap();
        }
        map.insert(8, "z").unwrap();
        assert_eq!(map.remove(&7), 3);
        assert_eq!(map.remove(&7), 0);
        assert_eq!(map.len(), 1);
        map.debug_validate();
    }

    #[test]
    fn test_multimap_hint_append_run() {
        let mut map = TreeMultiMap::new();
        let end = map.end();
        map.insert_hint(end, 1, ()).unwrap();
        // Equivalent key with end hint is still an O(1) append.
        let end = map.end();
        map.insert_hint(end, 1, ()).unwrap();
        assert_eq!(map.hint_hits(), 2);
        assert_eq!(map.count(&1), 2);
        map.debug_validate();
    }

    #[test]
    fn test_into_iter_consumes_in_order() {
        let map: TreeMap<i32, char> = [(2, 'b'), (1, 'a'), (3, 'c')].into_iter().collect();
        let pairs: Vec<(i32, char)> = map.into_iter().collect();
        assert_eq!(pairs, [(1, 'a'), (2, 'b'), (3, 'c')]);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut map = TreeMap::new();
        map.insert(1, String::from("one")).unwrap();
        let mut copy = map.clone();
        copy.insert(2, String::from("two")).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(copy.len(), 2);
    }

    #[test]
    fn test_debug_and_eq() {
        let map: TreeMap<i32, i32> = [(1, 10), (2, 20)].into_iter().collect();
        let same: TreeMap<i32, i32> = [(2, 20), (1, 10)].into_iter().collect();
        assert_eq!(map, same);
        let rendered = format!("{:?}", map);
        assert!(rendered.contains("1: 10"));
    }
}
