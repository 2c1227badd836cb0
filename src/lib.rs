//! Self-balancing ordered maps and radix tries.
//!
//! Four tree engines over one arena-backed node representation:
//!
//! - [`RbMap`]: classical red-black tree map.
//! - [`AvlMap`] / [`AvlSet`]: AVL tree map and set.
//! - [`LlrbTree`]: left-leaning red-black tree map.
//! - [`RadixTree`] / [`BinaryRadixTree`]: prefix-compressed radix trees
//!   over string and byte keys.
//! - [`SortedMap`]: header-sentinel ordered map with bidirectional
//!   iterators, bound queries and positional access.
//!
//! Nodes live in a [`NodeArena`] and reference each other through stable
//! [`NodeId`] handles, so parent back-pointers are plain data and `set`
//! can hand out a node reference whose value is mutable in place:
//!
//! ```
//! use arbor::AvlMap;
//!
//! let mut map = AvlMap::new();
//! let id = map.set("b", 2);
//! map.set("a", 1);
//! map.set("c", 3);
//!
//! *map.value_mut(id) = 20;
//! assert_eq!(map.get(&"b"), Some(&20));
//! assert_eq!(map.iter().map(|(k, _)| *k).collect::<Vec<_>>(), vec!["a", "b", "c"]);
//! ```
//!
//! All maps share the same contract: `set` inserts or overwrites
//! (preserving node identity), `del` reports a missing key as `false`
//! rather than an error, extrema are cached, and iteration is in-order
//! through parent-pointer threading. Single-threaded by design; wrap a
//! map in external synchronization to share it.

pub mod arena;
pub mod avl;
pub mod bst;
pub mod keys;
pub mod llrb;
pub mod map;
pub mod node;
pub mod print;
pub mod radix;
pub mod rb;
pub mod sorted_map;

pub use arena::{NodeArena, NodeId};
pub use avl::{AvlMap, AvlNode, AvlSet};
pub use keys::VectorKey;
pub use llrb::{LlrbNode, LlrbTree};
pub use map::{BalanceOps, Comparator, NaturalOrder, TreeMap};
pub use node::{KeyedNode, LinkNode};
pub use radix::{BinaryRadixTree, ByteSlice, RadixTree};
pub use rb::{Color, RbMap, RbNode};
pub use sorted_map::{IteratorType, SortedMap, SortedMapIterator};
