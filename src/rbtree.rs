//! Red-black index threaded through arena cells
//!
//! The tree stores no payloads of its own: parent/left/right/color links are
//! embedded next to the list links of each cell, so a cell id is both a list
//! position and a tree node. Erasure transplants nodes rather than moving
//! values, which keeps every surviving cursor valid through rebalancing.
//!
//! Search is parameterized by a closure ordering a candidate cell against
//! the probe key; the container layers comparators and key projection on
//! top.

use std::cmp::Ordering;

use crate::storage::{Arena, Linked, NIL};

/// Node color of the classic red-black scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Color {
    Red,
    Black,
}

/// Tree links embedded in every ordered-container cell.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeLinks {
    pub(crate) parent: u32,
    pub(crate) left: u32,
    pub(crate) right: u32,
    pub(crate) color: Color,
}

impl TreeLinks {
    pub(crate) fn detached() -> Self {
        TreeLinks { parent: NIL, left: NIL, right: NIL, color: Color::Red }
    }
}

/// Access to the embedded [`TreeLinks`] of a node type.
pub(crate) trait TreeNode: Linked {
    fn tree(&self) -> &TreeLinks;
    fn tree_mut(&mut self) -> &mut TreeLinks;
}

/// Red-black tree over cells of an [`Arena`].
#[derive(Debug, Clone)]
pub(crate) struct RbTree {
    pub(crate) root: u32,
}

impl RbTree {
    pub(crate) fn new() -> Self {
        RbTree { root: NIL }
    }

    pub(crate) fn clear(&mut self) {
        self.root = NIL;
    }

    fn color<N: TreeNode>(arena: &Arena<N>, id: u32) -> Color {
        if id == NIL {
            Color::Black
        } else {
            arena.get(id).tree().color
        }
    }

    /// First cell whose ordering against the probe is not `Less`.
    ///
    /// `ord(cell)` must report how the cell's key orders relative to the
    /// probe key.
    pub(crate) fn lower_bound<N, F>(&self, arena: &Arena<N>, mut ord: F) -> u32
    where
        N: TreeNode,
        F: FnMut(&N) -> Ordering,
    {
        let mut cur = self.root;
        let mut candidate = NIL;
        while cur != NIL {
            let node = arena.get(cur);
            if ord(node) == Ordering::Less {
                cur = node.tree().right;
            } else {
                candidate = cur;
                cur = node.tree().left;
            }
        }
        candidate
    }

    /// First cell whose ordering against the probe is `Greater`.
    pub(crate) fn upper_bound<N, F>(&self, arena: &Arena<N>, mut ord: F) -> u32
    where
        N: TreeNode,
        F: FnMut(&N) -> Ordering,
    {
        let mut cur = self.root;
        let mut candidate = NIL;
        while cur != NIL {
            let node = arena.get(cur);
            if ord(node) == Ordering::Greater {
                candidate = cur;
                cur = node.tree().left;
            } else {
                cur = node.tree().right;
            }
        }
        candidate
    }

    /// Links `id` at an empty edge of `parent` and restores the red-black
    /// invariants. `parent == NIL` makes `id` the root.
    pub(crate) fn attach<N: TreeNode>(
        &mut self,
        arena: &mut Arena<N>,
        parent: u32,
        as_left: bool,
        id: u32,
    ) {
        {
            let links = arena.get_mut(id).tree_mut();
            links.parent = parent;
            links.left = NIL;
            links.right = NIL;
            links.color = Color::Red;
        }
        if parent == NIL {
            self.root = id;
        } else if as_left {
            debug_assert_eq!(arena.get(parent).tree().left, NIL);
            arena.get_mut(parent).tree_mut().left = id;
        } else {
            debug_assert_eq!(arena.get(parent).tree().right, NIL);
            arena.get_mut(parent).tree_mut().right = id;
        }
        self.insert_fixup(arena, id);
    }

    fn rotate_left<N: TreeNode>(&mut self, arena: &mut Arena<N>, x: u32) {
        let y = arena.get(x).tree().right;
        let y_left = arena.get(y).tree().left;

        arena.get_mut(x).tree_mut().right = y_left;
        if y_left != NIL {
            arena.get_mut(y_left).tree_mut().parent = x;
        }

        let x_parent = arena.get(x).tree().parent;
        arena.get_mut(y).tree_mut().parent = x_parent;
        if x_parent == NIL {
            self.root = y;
        } else if arena.get(x_parent).tree().left == x {
            arena.get_mut(x_parent).tree_mut().left = y;
        } else {
            arena.get_mut(x_parent).tree_mut().right = y;
        }

        arena.get_mut(y).tree_mut().left = x;
        arena.get_mut(x).tree_mut().parent = y;
    }

    fn rotate_right<N: TreeNode>(&mut self, arena: &mut Arena<N>, x: u32) {
        let y = arena.get(x).tree().left;
        let y_right = arena.get(y).tree().right;

        arena.get_mut(x).tree_mut().left = y_right;
        if y_right != NIL {
            arena.get_mut(y_right).tree_mut().parent = x;
        }

        let x_parent = arena.get(x).tree().parent;
        arena.get_mut(y).tree_mut().parent = x_parent;
        if x_parent == NIL {
            self.root = y;
        } else if arena.get(x_parent).tree().left == x {
            arena.get_mut(x_parent).tree_mut().left = y;
        } else {
            arena.get_mut(x_parent).tree_mut().right = y;
        }

        arena.get_mut(y).tree_mut().right = x;
        arena.get_mut(x).tree_mut().parent = y;
    }

    fn insert_fixup<N: TreeNode>(&mut self, arena: &mut Arena<N>, mut z: u32) {
        loop {
            let parent = arena.get(z).tree().parent;
            if Self::color(arena, parent) == Color::Black {
                break;
            }
            // Parent is red, so a black grandparent exists.
            let grand = arena.get(parent).tree().parent;
            if parent == arena.get(grand).tree().left {
                let uncle = arena.get(grand).tree().right;
                if Self::color(arena, uncle) == Color::Red {
                    arena.get_mut(parent).tree_mut().color = Color::Black;
                    arena.get_mut(uncle).tree_mut().color = Color::Black;
                    arena.get_mut(grand).tree_mut().color = Color::Red;
                    z = grand;
                } else {
                    if z == arena.get(parent).tree().right {
                        z = parent;
                        self.rotate_left(arena, z);
                    }
                    let parent = arena.get(z).tree().parent;
                    let grand = arena.get(parent).tree().parent;
                    arena.get_mut(parent).tree_mut().color = Color::Black;
                    arena.get_mut(grand).tree_mut().color = Color::Red;
                    self.rotate_right(arena, grand);
                }
            } else {
                let uncle = arena.get(grand).tree().left;
                if Self::color(arena, uncle) == Color::Red {
                    arena.get_mut(parent).tree_mut().color = Color::Black;
                    arena.get_mut(uncle).tree_mut().color = Color::Black;
                    arena.get_mut(grand).tree_mut().color = Color::Red;
                    z = grand;
                } else {
                    if z == arena.get(parent).tree().left {
                        z = parent;
                        self.rotate_right(arena, z);
                    }
                    let parent = arena.get(z).tree().parent;
                    let grand = arena.get(parent).tree().parent;
                    arena.get_mut(parent).tree_mut().color = Color::Black;
                    arena.get_mut(grand).tree_mut().color = Color::Red;
                    self.rotate_left(arena, grand);
                }
            }
        }
        let root = self.root;
        arena.get_mut(root).tree_mut().color = Color::Black;
    }

    fn minimum<N: TreeNode>(arena: &Arena<N>, mut id: u32) -> u32 {
        loop {
            let left = arena.get(id).tree().left;
            if left == NIL {
                return id;
            }
            id = left;
        }
    }

    /// Replaces the subtree rooted at `u` with the one rooted at `v`.
    fn transplant<N: TreeNode>(&mut self, arena: &mut Arena<N>, u: u32, v: u32) {
        let u_parent = arena.get(u).tree().parent;
        if u_parent == NIL {
            self.root = v;
        } else if arena.get(u_parent).tree().left == u {
            arena.get_mut(u_parent).tree_mut().left = v;
        } else {
            arena.get_mut(u_parent).tree_mut().right = v;
        }
        if v != NIL {
            arena.get_mut(v).tree_mut().parent = u_parent;
        }
    }

    /// Unlinks `z` from the tree, restoring the red-black invariants.
    ///
    /// The cell itself stays in the arena; the caller frees it after also
    /// unlinking the list side.
    pub(crate) fn erase<N: TreeNode>(&mut self, arena: &mut Arena<N>, z: u32) {
        let z_left = arena.get(z).tree().left;
        let z_right = arena.get(z).tree().right;

        let removed_color;
        let x;
        let x_parent;

        if z_left == NIL {
            removed_color = arena.get(z).tree().color;
            x = z_right;
            x_parent = arena.get(z).tree().parent;
            self.transplant(arena, z, z_right);
        } else if z_right == NIL {
            removed_color = arena.get(z).tree().color;
            x = z_left;
            x_parent = arena.get(z).tree().parent;
            self.transplant(arena, z, z_left);
        } else {
            // Two children: the in-order successor y takes z's place.
            let y = Self::minimum(arena, z_right);
            removed_color = arena.get(y).tree().color;
            x = arena.get(y).tree().right;
            if arena.get(y).tree().parent == z {
                x_parent = y;
            } else {
                x_parent = arena.get(y).tree().parent;
                self.transplant(arena, y, x);
                let z_right_now = arena.get(z).tree().right;
                arena.get_mut(y).tree_mut().right = z_right_now;
                arena.get_mut(z_right_now).tree_mut().parent = y;
            }
            self.transplant(arena, z, y);
            let z_left_now = arena.get(z).tree().left;
            arena.get_mut(y).tree_mut().left = z_left_now;
            arena.get_mut(z_left_now).tree_mut().parent = y;
            let z_color = arena.get(z).tree().color;
            arena.get_mut(y).tree_mut().color = z_color;
        }

        if removed_color == Color::Black {
            self.erase_fixup(arena, x, x_parent);
        }
        *arena.get_mut(z).tree_mut() = TreeLinks::detached();
    }

    fn erase_fixup<N: TreeNode>(&mut self, arena: &mut Arena<N>, mut x: u32, mut x_parent: u32) {
        while x != self.root && Self::color(arena, x) == Color::Black {
            if x == arena.get(x_parent).tree().left {
                let mut w = arena.get(x_parent).tree().right;
                if Self::color(arena, w) == Color::Red {
                    arena.get_mut(w).tree_mut().color = Color::Black;
                    arena.get_mut(x_parent).tree_mut().color = Color::Red;
                    self.rotate_left(arena, x_parent);
                    w = arena.get(x_parent).tree().right;
                }
                let w_left = arena.get(w).tree().left;
                let w_right = arena.get(w).tree().right;
                if Self::color(arena, w_left) == Color::Black
                    && Self::color(arena, w_right) == Color::Black
                {
                    arena.get_mut(w).tree_mut().color = Color::Red;
                    x = x_parent;
                    x_parent = arena.get(x).tree().parent;
                } else {
                    if Self::color(arena, w_right) == Color::Black {
                        arena.get_mut(w_left).tree_mut().color = Color::Black;
                        arena.get_mut(w).tree_mut().color = Color::Red;
                        self.rotate_right(arena, w);
                        w = arena.get(x_parent).tree().right;
                    }
                    let parent_color = arena.get(x_parent).tree().color;
                    arena.get_mut(w).tree_mut().color = parent_color;
                    arena.get_mut(x_parent).tree_mut().color = Color::Black;
                    let w_right = arena.get(w).tree().right;
                    if w_right != NIL {
                        arena.get_mut(w_right).tree_mut().color = Color::Black;
                    }
                    self.rotate_left(arena, x_parent);
                    x = self.root;
                    break;
                }
            } else {
                let mut w = arena.get(x_parent).tree().left;
                if Self::color(arena, w) == Color::Red {
                    arena.get_mut(w).tree_mut().color = Color::Black;
                    arena.get_mut(x_parent).tree_mut().color = Color::Red;
                    self.rotate_right(arena, x_parent);
                    w = arena.get(x_parent).tree().left;
                }
                let w_left = arena.get(w).tree().left;
                let w_right = arena.get(w).tree().right;
                if Self::color(arena, w_left) == Color::Black
                    && Self::color(arena, w_right) == Color::Black
                {
                    arena.get_mut(w).tree_mut().color = Color::Red;
                    x = x_parent;
                    x_parent = arena.get(x).tree().parent;
                } else {
                    if Self::color(arena, w_left) == Color::Black {
                        arena.get_mut(w_right).tree_mut().color = Color::Black;
                        arena.get_mut(w).tree_mut().color = Color::Red;
                        self.rotate_left(arena, w);
                        w = arena.get(x_parent).tree().left;
                    }
                    let parent_color = arena.get(x_parent).tree().color;
                    arena.get_mut(w).tree_mut().color = parent_color;
                    arena.get_mut(x_parent).tree_mut().color = Color::Black;
                    let w_left = arena.get(w).tree().left;
                    if w_left != NIL {
                        arena.get_mut(w_left).tree_mut().color = Color::Black;
                    }
                    self.rotate_right(arena, x_parent);
                    x = self.root;
                    break;
                }
            }
        }
        if x != NIL {
            arena.get_mut(x).tree_mut().color = Color::Black;
        }
    }

    /// Appends the in-order walk of the subtree to `out`.
    pub(crate) fn in_order<N: TreeNode>(&self, arena: &Arena<N>, out: &mut Vec<u32>) {
        fn walk<N: TreeNode>(arena: &Arena<N>, id: u32, out: &mut Vec<u32>) {
            if id == NIL {
                return;
            }
            let links = *arena.get(id).tree();
            walk(arena, links.left, out);
            out.push(id);
            walk(arena, links.right, out);
        }
        walk(arena, self.root, out);
    }

    /// Checks the structural invariants, returning the black height.
    ///
    /// Verified: the root is black, no red cell has a red child, every
    /// root-to-leaf path crosses the same number of black cells, and child
    /// parent pointers are consistent.
    pub(crate) fn validate<N: TreeNode>(&self, arena: &Arena<N>) -> std::result::Result<usize, String> {
        fn check<N: TreeNode>(
            arena: &Arena<N>,
            id: u32,
            parent: u32,
        ) -> std::result::Result<usize, String> {
            if id == NIL {
                return Ok(1);
            }
            let links = arena.get(id).tree();
            if links.parent != parent {
                return Err(format!(
                    "cell {} records parent {}, expected {}",
                    id, links.parent, parent
                ));
            }
            if links.color == Color::Red {
                for child in [links.left, links.right] {
                    if child != NIL && arena.get(child).tree().color == Color::Red {
                        return Err(format!("red cell {} has red child {}", id, child));
                    }
                }
            }
            let left_height = check(arena, links.left, id)?;
            let right_height = check(arena, links.right, id)?;
            if left_height != right_height {
                return Err(format!(
                    "black height mismatch below cell {}: {} vs {}",
                    id, left_height, right_height
                ));
            }
            Ok(left_height + usize::from(links.color == Color::Black))
        }

        if self.root != NIL && arena.get(self.root).tree().color != Color::Black {
            return Err("root is red".to_string());
        }
        check(arena, self.root, NIL)
    }
}
