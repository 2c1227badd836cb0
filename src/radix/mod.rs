//! Prefix-compressed radix trees over byte and string keys.

pub mod node;
pub mod slice;
pub mod tree;

pub use slice::ByteSlice;
pub use tree::{BinaryRadixTree, RadixTree};
