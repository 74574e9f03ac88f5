//! # Tessera: Containers in the STL Tradition
//!
//! This crate provides a family of sequence and associative containers
//! sharing a uniform cursor protocol, predictable complexity guarantees, and
//! orderings driven by a strict-weak-ordering comparator.
//!
//! ## Key Features
//!
//! - **Ordered associative family**: [`TreeMap`], [`TreeMultiMap`],
//!   [`TreeSet`], [`TreeMultiSet`] — red-black indexed, comparator
//!   parameterized, with lower/upper bounds, `equal_range`, and O(1) hint
//!   insertion
//! - **Unordered associative family**: [`HashMap`], [`HashMultiMap`],
//!   [`HashSet`], [`HashMultiSet`] — bucketed hash index over an
//!   insertion-ordered cell list, load-factor managed
//! - **Stable cells**: every associative container stores elements in arena
//!   cells addressed by [`Cursor`] handles; insertion and rehashing never
//!   invalidate cursors, erasure invalidates only the erased cell
//! - **Sequence containers**: [`Vector`], [`Deque`], cursor-based [`List`],
//!   and the [`Stack`] / [`Queue`] adaptors
//! - **Generic algorithms**: comparator-driven searches and sorts defined
//!   against iterators and slices only
//! - **Deterministic hashing on demand**: `ahash` by default,
//!   [`Fnv1aBuildHasher`](hash::Fnv1aBuildHasher) for reproducible layouts
//!
//! ## Quick Start
//!
//! ```rust
//! use tessera::{HashMap, TreeMap, TreeSet};
//!
//! // Sorted iteration with duplicate detection by comparator equivalence.
//! let mut set = TreeSet::new();
//! for v in [3, 1, 4, 1, 5, 9, 2, 6] {
//!     set.insert(v).unwrap();
//! }
//! let sorted: Vec<i32> = set.iter().copied().collect();
//! assert_eq!(sorted, [1, 2, 3, 4, 5, 6, 9]);
//!
//! // Range queries through cursors.
//! let mut map = TreeMap::new();
//! map.insert("b", 2).unwrap();
//! map.insert("a", 1).unwrap();
//! assert_eq!(map.key_at(map.lower_bound(&"b")), Ok(&"b"));
//!
//! // Insertion-ordered hash map that never silently overwrites.
//! let mut hits: HashMap<&str, u32> = HashMap::new();
//! let (_, fresh) = hits.insert("page", 1).unwrap();
//! assert!(fresh);
//! let (_, fresh) = hits.insert("page", 2).unwrap();
//! assert!(!fresh);
//! assert_eq!(hits.at(&"page"), Ok(&1));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod algorithms;
pub mod compare;
pub mod cursor;
pub mod error;
pub mod hash;
pub mod hashed;
pub mod ordered;
pub mod sequence;

mod rbtree;
#[cfg(feature = "serde")]
mod serde_impls;
mod storage;

// Re-export core types
pub use compare::{Comparator, Natural, Rev};
pub use cursor::{reversed, Cursor, Reversed};
pub use error::{Result, TesseraError};
pub use hashed::{HashMap, HashMultiMap, HashMultiSet, HashSet};
pub use ordered::{TreeMap, TreeMultiMap, TreeMultiSet, TreeSet};
pub use sequence::{Deque, List, Queue, Stack, Vector};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library (currently no-op, for future use)
pub fn init() {
    log::debug!("Initializing tessera v{}", VERSION);
}
