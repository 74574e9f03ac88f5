//! Shared plumbing of the hash-backed associative containers
//!
//! A [`HashCore`] owns one cell arena, the insertion-ordered element list,
//! and a power-of-two array of buckets holding cell ids. Lookups go through
//! the buckets; iteration goes through the list. Rehashing reassigns ids to
//! buckets but never touches the list, so cursors and element order survive
//! growth.
//!
//! Multi-variant inserts keep equivalent keys contiguous in the list (new
//! cells join the end of their run), which makes `equal_range` a plain list
//! span.

use crate::cursor::{next_token, Cursor};
use crate::error::{Result, TesseraError};
use crate::hash::{bucket_count_for, MIN_BUCKETS};
use crate::storage::{Arena, CellIter, Linked, LinkedList, Links, NIL};

/// One cell of an unordered container: element, cached hash, list links.
#[derive(Debug, Clone)]
pub(crate) struct HashNode<E> {
    pub(crate) elem: E,
    pub(crate) hash: u64,
    links: Links,
}

impl<E> Linked for HashNode<E> {
    fn links(&self) -> &Links {
        &self.links
    }
    fn links_mut(&mut self) -> &mut Links {
        &mut self.links
    }
}

/// List + bucket index over one arena of cells.
#[derive(Debug)]
pub(crate) struct HashCore<E> {
    arena: Arena<HashNode<E>>,
    list: LinkedList,
    buckets: Vec<Vec<u32>>,
    max_load_factor: f32,
    token: u64,
}

impl<E: Clone> Clone for HashCore<E> {
    fn clone(&self) -> Self {
        HashCore {
            arena: self.arena.clone(),
            list: self.list.clone(),
            buckets: self.buckets.clone(),
            max_load_factor: self.max_load_factor,
            token: next_token(),
        }
    }
}

impl<E> HashCore<E> {
    pub(crate) fn new() -> Self {
        Self::with_capacity(0)
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let buckets = bucket_count_for(capacity, 1.0);
        HashCore {
            arena: Arena::with_capacity(capacity),
            list: LinkedList::new(),
            buckets: vec![Vec::new(); buckets],
            max_load_factor: 1.0,
            token: next_token(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.arena.len()
    }

    pub(crate) fn clear(&mut self) {
        self.arena.clear();
        self.list.clear();
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }

    pub(crate) fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn load_factor(&self) -> f32 {
        self.len() as f32 / self.buckets.len() as f32
    }

    pub(crate) fn max_load_factor(&self) -> f32 {
        self.max_load_factor
    }

    pub(crate) fn set_max_load_factor(&mut self, factor: f32) -> Result<()> {
        if !(factor > 0.0) {
            return Err(TesseraError::invalid_argument("max load factor must be positive"));
        }
        self.max_load_factor = factor;
        if self.load_factor() > factor {
            self.rehash(bucket_count_for(self.len(), factor));
        }
        Ok(())
    }

    /// Rebuilds the bucket array with at least `min_buckets` buckets.
    pub(crate) fn rehash(&mut self, min_buckets: usize) {
        let required = bucket_count_for(self.len(), self.max_load_factor);
        let new_count = min_buckets.next_power_of_two().max(required).max(MIN_BUCKETS);
        log::trace!(
            "rehash: {} cells, {} -> {} buckets",
            self.len(),
            self.buckets.len(),
            new_count
        );
        self.buckets = vec![Vec::new(); new_count];
        // Re-bucket in list order so layout is a function of element order.
        let mut cur = self.list.head;
        while cur != NIL {
            let hash = self.arena.get(cur).hash;
            let slot = self.bucket_of(hash);
            self.buckets[slot].push(cur);
            cur = self.arena.get(cur).links.next;
        }
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        self.arena.reserve(additional);
        let target = self.len() + additional;
        if bucket_count_for(target, self.max_load_factor) > self.buckets.len() {
            self.rehash(bucket_count_for(target, self.max_load_factor));
        }
    }

    fn bucket_of(&self, hash: u64) -> usize {
        // Fold the upper bits in so power-of-two masking sees the full hash.
        ((hash ^ (hash >> 32)) as usize) & (self.buckets.len() - 1)
    }

    fn grow_if_needed(&mut self) {
        if (self.len() + 1) as f32 > self.max_load_factor * self.buckets.len() as f32 {
            self.rehash(self.buckets.len() * 2);
        }
    }

    // ------------------------------------------------------------------
    // Cursors & navigation
    // ------------------------------------------------------------------

    pub(crate) fn cursor(&self, id: u32) -> Cursor {
        Cursor::new(self.token, id)
    }

    pub(crate) fn end(&self) -> Cursor {
        Cursor::end_of(self.token)
    }

    pub(crate) fn resolve(&self, cursor: Cursor) -> Result<u32> {
        if cursor.token != self.token {
            return Err(TesseraError::invalid_argument("cursor from another container"));
        }
        if cursor.node != NIL && !self.arena.is_live(cursor.node) {
            return Err(TesseraError::invalid_argument("cursor to an erased cell"));
        }
        Ok(cursor.node)
    }

    pub(crate) fn resolve_cell(&self, cursor: Cursor) -> Result<u32> {
        let id = self.resolve(cursor)?;
        if id == NIL {
            return Err(TesseraError::invalid_argument("end cursor is not dereferenceable"));
        }
        Ok(id)
    }

    pub(crate) fn first_id(&self) -> u32 {
        self.list.head
    }

    pub(crate) fn next_id(&self, id: u32) -> u32 {
        self.arena.get(id).links.next
    }

    pub(crate) fn prev_id(&self, id: u32) -> u32 {
        self.arena.get(id).links.prev
    }

    pub(crate) fn last_id(&self) -> u32 {
        self.list.tail
    }

    pub(crate) fn elem(&self, id: u32) -> &E {
        &self.arena.get(id).elem
    }

    pub(crate) fn elem_mut(&mut self, id: u32) -> &mut E {
        &mut self.arena.get_mut(id).elem
    }

    pub(crate) fn iter(&self) -> CellIter<'_, HashNode<E>> {
        CellIter::new(&self.arena, &self.list)
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    /// Some cell with this hash satisfying `eq`, or `NIL`.
    pub(crate) fn find_by<F>(&self, hash: u64, mut eq: F) -> u32
    where
        F: FnMut(&E) -> bool,
    {
        let slot = self.bucket_of(hash);
        for &id in &self.buckets[slot] {
            let node = self.arena.get(id);
            if node.hash == hash && eq(&node.elem) {
                return id;
            }
        }
        NIL
    }

    /// First cell of the contiguous run matching `eq`, or `NIL`.
    pub(crate) fn find_first_by<F>(&self, hash: u64, mut eq: F) -> u32
    where
        F: FnMut(&E) -> bool,
    {
        let found = self.find_by(hash, &mut eq);
        if found == NIL {
            return NIL;
        }
        let mut first = found;
        loop {
            let prev = self.arena.get(first).links.prev;
            if prev != NIL && eq(&self.arena.get(prev).elem) {
                first = prev;
            } else {
                return first;
            }
        }
    }

    /// Half-open id span of the run matching `eq`; `(NIL, NIL)` when absent.
    pub(crate) fn equal_range_by<F>(&self, hash: u64, mut eq: F) -> (u32, u32)
    where
        F: FnMut(&E) -> bool,
    {
        let first = self.find_first_by(hash, &mut eq);
        if first == NIL {
            return (NIL, NIL);
        }
        let mut last = first;
        loop {
            let next = self.arena.get(last).links.next;
            if next != NIL && eq(&self.arena.get(next).elem) {
                last = next;
            } else {
                return (first, next);
            }
        }
    }

    pub(crate) fn count_by<F>(&self, hash: u64, eq: F) -> usize
    where
        F: FnMut(&E) -> bool,
    {
        let (mut cur, past) = self.equal_range_by(hash, eq);
        let mut count = 0;
        while cur != past {
            count += 1;
            cur = self.next_id(cur);
        }
        count
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Inserts at the list tail unless a cell matching `eq` exists.
    ///
    /// `eq(existing, new)` is key equality on the projected keys.
    pub(crate) fn insert_unique_by<F>(&mut self, elem: E, hash: u64, mut eq: F) -> Result<(u32, bool)>
    where
        F: FnMut(&E, &E) -> bool,
    {
        let found = {
            let probe = &elem;
            self.find_by(hash, |e| eq(e, probe))
        };
        if found != NIL {
            return Ok((found, false));
        }
        self.grow_if_needed();
        let id = self.arena.insert(HashNode { elem, hash, links: Links::detached() })?;
        self.list.link_before(&mut self.arena, NIL, id);
        let slot = self.bucket_of(hash);
        self.buckets[slot].push(id);
        Ok((id, true))
    }

    /// Inserts at the end of the matching run, or at the list tail.
    pub(crate) fn insert_multi_by<F>(&mut self, elem: E, hash: u64, mut eq: F) -> Result<u32>
    where
        F: FnMut(&E, &E) -> bool,
    {
        let run_last = {
            let probe = &elem;
            let found = self.find_by(hash, |e| eq(e, probe));
            if found == NIL {
                NIL
            } else {
                let mut last = found;
                loop {
                    let next = self.arena.get(last).links.next;
                    if next != NIL && eq(&self.arena.get(next).elem, probe) {
                        last = next;
                    } else {
                        break last;
                    }
                }
            }
        };
        self.grow_if_needed();
        let id = self.arena.insert(HashNode { elem, hash, links: Links::detached() })?;
        if run_last == NIL {
            self.list.link_before(&mut self.arena, NIL, id);
        } else {
            self.list.link_after(&mut self.arena, run_last, id);
        }
        let slot = self.bucket_of(hash);
        self.buckets[slot].push(id);
        Ok(id)
    }

    /// Erases the cell, returning its element and the id of its successor.
    pub(crate) fn erase(&mut self, id: u32) -> (E, u32) {
        let hash = self.arena.get(id).hash;
        let slot = self.bucket_of(hash);
        let pos = self.buckets[slot]
            .iter()
            .position(|&candidate| candidate == id)
            .expect("cell missing from its bucket");
        self.buckets[slot].swap_remove(pos);

        let next = self.arena.get(id).links.next;
        self.list.unlink(&mut self.arena, id);
        (self.arena.remove(id).elem, next)
    }

    /// Erases `[from, to)`, returning `to`. Fails without mutating when the
    /// range is not a forward walk of this container.
    pub(crate) fn erase_range(&mut self, from: u32, to: u32) -> Result<u32> {
        let mut ids = Vec::new();
        let mut cur = from;
        while cur != to {
            if cur == NIL {
                return Err(TesseraError::invalid_argument(
                    "range end not reachable from range start",
                ));
            }
            ids.push(cur);
            cur = self.next_id(cur);
        }
        for id in ids {
            self.erase(id);
        }
        Ok(to)
    }

    /// Detaches and returns the first element, bypassing the buckets.
    ///
    /// Only for consuming iteration.
    pub(crate) fn pop_front_raw(&mut self) -> Option<E> {
        let id = self.list.head;
        if id == NIL {
            return None;
        }
        self.list.unlink(&mut self.arena, id);
        Some(self.arena.remove(id).elem)
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Panics unless every cell sits in exactly the bucket its hash selects
    /// and the list covers every cell.
    pub(crate) fn debug_validate(&self) {
        assert!(!self.buckets.is_empty(), "bucket array must never be empty");
        let mut seen = 0usize;
        for (slot, bucket) in self.buckets.iter().enumerate() {
            for &id in bucket {
                assert!(self.arena.is_live(id), "bucket holds dead cell {}", id);
                assert_eq!(
                    self.bucket_of(self.arena.get(id).hash),
                    slot,
                    "cell {} bucketed under the wrong hash slot",
                    id
                );
                seen += 1;
            }
        }
        assert_eq!(seen, self.len(), "buckets and arena disagree on cell count");

        let mut walked = 0usize;
        let mut cur = self.list.head;
        while cur != NIL {
            walked += 1;
            cur = self.arena.get(cur).links.next;
        }
        assert_eq!(walked, self.len(), "list walk and arena disagree on cell count");
        assert!(
            self.len() as f32 <= self.max_load_factor * self.buckets.len() as f32,
            "load factor exceeded without growth"
        );
    }
}
