//! Tree-backed associative containers
//!
//! Four containers over one architecture: cells live on an intrusive list
//! kept in comparator order, and a red-black tree indexes the same cells for
//! O(log n) search. Unique and multi variants differ only in how the index
//! treats equivalent keys.
//!
//! - [`TreeMap`] / [`TreeSet`] — one cell per equivalence class
//! - [`TreeMultiMap`] / [`TreeMultiSet`] — equivalent keys kept, in stable
//!   insertion order

pub(crate) mod core;
mod map;
mod set;

pub use map::{IntoIter, Iter, Keys, TreeMap, TreeMultiMap, Values};
pub use set::{SetIntoIter, SetIter, TreeMultiSet, TreeSet};
