//! Hash-backed associative containers
//!
//! Four containers over one architecture: cells live on an intrusive list in
//! insertion order, and a power-of-two bucket array indexes the same cells
//! for expected O(1) search. Rehashing re-buckets ids without touching the
//! list, so element order and cursors survive growth.
//!
//! - [`HashMap`] / [`HashSet`] — one cell per key
//! - [`HashMultiMap`] / [`HashMultiSet`] — equal keys kept, contiguous per
//!   run so `equal_range` is a plain list span

pub(crate) mod core;
mod map;
mod set;

pub use map::{HashMap, HashMultiMap, IntoIter, Iter, Keys, Values};
pub use set::{HashMultiSet, HashSet, SetIntoIter, SetIter};
