//! Shared plumbing of the tree-backed associative containers
//!
//! An [`OrdCore`] owns one cell arena, the intrusive element list, and the
//! red-black index over those cells. The public containers layer key
//! projection and a comparator on top; everything here works through
//! caller-supplied ordering closures.
//!
//! Invariant maintained by every mutation: the in-order walk of the tree
//! and the forward walk of the list visit the same cells in the same order.

use std::cmp::Ordering;

use crate::cursor::{next_token, Cursor};
use crate::error::{Result, TesseraError};
use crate::rbtree::{RbTree, TreeLinks, TreeNode};
use crate::storage::{Arena, CellIter, Linked, LinkedList, Links, NIL};

/// One cell of an ordered container: element plus list and tree links.
#[derive(Debug, Clone)]
pub(crate) struct OrdNode<E> {
    pub(crate) elem: E,
    links: Links,
    tree: TreeLinks,
}

impl<E> OrdNode<E> {
    fn new(elem: E) -> Self {
        OrdNode { elem, links: Links::detached(), tree: TreeLinks::detached() }
    }
}

impl<E> Linked for OrdNode<E> {
    fn links(&self) -> &Links {
        &self.links
    }
    fn links_mut(&mut self) -> &mut Links {
        &mut self.links
    }
}

impl<E> TreeNode for OrdNode<E> {
    fn tree(&self) -> &TreeLinks {
        &self.tree
    }
    fn tree_mut(&mut self) -> &mut TreeLinks {
        &mut self.tree
    }
}

/// List + red-black index over one arena of cells.
#[derive(Debug)]
pub(crate) struct OrdCore<E> {
    arena: Arena<OrdNode<E>>,
    list: LinkedList,
    tree: RbTree,
    token: u64,
    hint_hits: u64,
}

impl<E: Clone> Clone for OrdCore<E> {
    fn clone(&self) -> Self {
        // Deep copy: cell ids carry over but the token does not, so cursors
        // minted by the original are rejected by the copy.
        OrdCore {
            arena: self.arena.clone(),
            list: self.list.clone(),
            tree: self.tree.clone(),
            token: next_token(),
            hint_hits: 0,
        }
    }
}

impl<E> OrdCore<E> {
    pub(crate) fn new() -> Self {
        OrdCore {
            arena: Arena::new(),
            list: LinkedList::new(),
            tree: RbTree::new(),
            token: next_token(),
            hint_hits: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.arena.len()
    }

    pub(crate) fn clear(&mut self) {
        self.arena.clear();
        self.list.clear();
        self.tree.clear();
    }

    pub(crate) fn hint_hits(&self) -> u64 {
        self.hint_hits
    }

    // ------------------------------------------------------------------
    // Cursors
    // ------------------------------------------------------------------

    pub(crate) fn cursor(&self, id: u32) -> Cursor {
        Cursor::new(self.token, id)
    }

    pub(crate) fn end(&self) -> Cursor {
        Cursor::end_of(self.token)
    }

    /// Accepts any cursor of this container, including `end`.
    pub(crate) fn resolve(&self, cursor: Cursor) -> Result<u32> {
        if cursor.token != self.token {
            return Err(TesseraError::invalid_argument("cursor from another container"));
        }
        if cursor.node != NIL && !self.arena.is_live(cursor.node) {
            return Err(TesseraError::invalid_argument("cursor to an erased cell"));
        }
        Ok(cursor.node)
    }

    /// Accepts only a dereferenceable (non-`end`) cursor of this container.
    pub(crate) fn resolve_cell(&self, cursor: Cursor) -> Result<u32> {
        let id = self.resolve(cursor)?;
        if id == NIL {
            return Err(TesseraError::invalid_argument("end cursor is not dereferenceable"));
        }
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub(crate) fn first_id(&self) -> u32 {
        self.list.head
    }

    pub(crate) fn last_id(&self) -> u32 {
        self.list.tail
    }

    pub(crate) fn next_id(&self, id: u32) -> u32 {
        self.arena.get(id).links.next
    }

    pub(crate) fn prev_id(&self, id: u32) -> u32 {
        self.arena.get(id).links.prev
    }

    pub(crate) fn elem(&self, id: u32) -> &E {
        &self.arena.get(id).elem
    }

    pub(crate) fn elem_mut(&mut self, id: u32) -> &mut E {
        &mut self.arena.get_mut(id).elem
    }

    pub(crate) fn iter(&self) -> CellIter<'_, OrdNode<E>> {
        CellIter::new(&self.arena, &self.list)
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    /// First cell whose element does not order before the probe.
    ///
    /// `ord(e)` reports how `e` orders relative to the probe key.
    pub(crate) fn lower_bound_by<F>(&self, ord: F) -> u32
    where
        F: FnMut(&E) -> Ordering,
    {
        let mut ord = ord;
        self.tree.lower_bound(&self.arena, |n| ord(&n.elem))
    }

    /// First cell whose element orders strictly after the probe.
    pub(crate) fn upper_bound_by<F>(&self, ord: F) -> u32
    where
        F: FnMut(&E) -> Ordering,
    {
        let mut ord = ord;
        self.tree.upper_bound(&self.arena, |n| ord(&n.elem))
    }

    /// Some cell equivalent to the probe, or `NIL`.
    pub(crate) fn find_by<F>(&self, mut ord: F) -> u32
    where
        F: FnMut(&E) -> Ordering,
    {
        let lb = self.lower_bound_by(&mut ord);
        if lb != NIL && ord(self.elem(lb)) == Ordering::Equal {
            lb
        } else {
            NIL
        }
    }

    /// Half-open id range of the cells equivalent to the probe.
    pub(crate) fn equal_range_by<F>(&self, mut ord: F) -> (u32, u32)
    where
        F: FnMut(&E) -> Ordering,
    {
        (self.lower_bound_by(&mut ord), self.upper_bound_by(&mut ord))
    }

    /// Number of cells equivalent to the probe.
    pub(crate) fn count_by<F>(&self, ord: F) -> usize
    where
        F: FnMut(&E) -> Ordering,
    {
        let (mut cur, upper) = self.equal_range_by(ord);
        let mut count = 0;
        while cur != upper {
            count += 1;
            cur = self.next_id(cur);
        }
        count
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Inserts `elem` unless an equivalent cell exists.
    ///
    /// `ord(existing, new)` is the comparator applied to the projected keys.
    /// Returns the cell id and whether a new cell was created.
    pub(crate) fn insert_unique_by<F>(&mut self, elem: E, mut ord: F) -> Result<(u32, bool)>
    where
        F: FnMut(&E, &E) -> Ordering,
    {
        let lb = {
            let probe = &elem;
            self.lower_bound_by(|e| ord(e, probe))
        };
        if lb != NIL && ord(self.elem(lb), &elem) == Ordering::Equal {
            return Ok((lb, false));
        }
        let id = self.place_before(lb, elem)?;
        Ok((id, true))
    }

    /// Inserts `elem` after any cells it is equivalent to.
    pub(crate) fn insert_multi_by<F>(&mut self, elem: E, mut ord: F) -> Result<u32>
    where
        F: FnMut(&E, &E) -> Ordering,
    {
        let ub = {
            let probe = &elem;
            self.upper_bound_by(|e| ord(e, probe))
        };
        self.place_before(ub, elem)
    }

    /// Links a new cell into the list immediately before `before` and into
    /// the tree at the matching in-order edge. `before == NIL` appends.
    ///
    /// The caller is responsible for `before` being the correct in-order
    /// position of `elem`; this is what makes hint insertion O(1).
    pub(crate) fn place_before(&mut self, before: u32, elem: E) -> Result<u32> {
        let (parent, as_left) = if before == NIL {
            // Append: the list tail is the rightmost tree cell.
            (self.list.tail, false)
        } else if self.arena.get(before).tree.left == NIL {
            (before, true)
        } else {
            // The in-order predecessor of `before` is the rightmost cell of
            // its left subtree, so its right edge is free.
            (self.arena.get(before).links.prev, false)
        };
        let id = self.arena.insert(OrdNode::new(elem))?;
        self.list.link_before(&mut self.arena, before, id);
        self.tree.attach(&mut self.arena, parent, as_left, id);
        Ok(id)
    }

    pub(crate) fn note_hint_hit(&mut self) {
        self.hint_hits += 1;
    }

    /// Erases the cell, returning its element and the id of its successor.
    pub(crate) fn erase(&mut self, id: u32) -> (E, u32) {
        let next = self.arena.get(id).links.next;
        self.tree.erase(&mut self.arena, id);
        self.list.unlink(&mut self.arena, id);
        let node = self.arena.remove(id);
        (node.elem, next)
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

    /// Detaches and returns the first element, bypassing the tree.
    ///
    /// Only for consuming iteration: tree links of remaining cells go stale.
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

    /// Panics unless the tree invariants hold and the tree's in-order walk
    /// equals the list's forward walk.
    pub(crate) fn debug_validate(&self) {
        if let Err(msg) = self.tree.validate(&self.arena) {
            panic!("red-black invariant violated: {}", msg);
        }
        let mut in_order = Vec::new();
        self.tree.in_order(&self.arena, &mut in_order);
        let mut list_order = Vec::with_capacity(self.len());
        let mut cur = self.list.head;
        while cur != NIL {
            list_order.push(cur);
            cur = self.next_id(cur);
        }
        assert_eq!(in_order, list_order, "tree in-order walk diverges from list walk");
        assert_eq!(list_order.len(), self.len(), "cell count diverges from list length");
    }
}
