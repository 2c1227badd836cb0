use crate::arena::NodeId;
use crate::node::LinkNode;
use crate::radix::slice::ByteSlice;

/// Radix tree node.
///
/// `p`/`l`/`r` link the node into its parent's *sibling tree*: a plain
/// BST ordered by each sibling's first key byte, searched with the shared
/// [`crate::bst`] primitives. `children` points at the root of this
/// node's own sibling tree, one level down. A node with `value: None` is
/// an intermediate produced by a prefix split.
pub struct TrieNode<V> {
    pub(crate) p: Option<NodeId>,
    pub(crate) l: Option<NodeId>,
    pub(crate) r: Option<NodeId>,
    pub(crate) children: Option<NodeId>,
    pub(crate) key: ByteSlice,
    pub(crate) value: Option<V>,
}

impl<V> TrieNode<V> {
    pub(crate) fn new(key: ByteSlice, value: Option<V>) -> Self {
        Self {
            p: None,
            l: None,
            r: None,
            children: None,
            key,
            value,
        }
    }
}

impl<V> LinkNode for TrieNode<V> {
    fn p(&self) -> Option<NodeId> {
        self.p
    }
    fn l(&self) -> Option<NodeId> {
        self.l
    }
    fn r(&self) -> Option<NodeId> {
        self.r
    }
    fn set_p(&mut self, p: Option<NodeId>) {
        self.p = p;
    }
    fn set_l(&mut self, l: Option<NodeId>) {
        self.l = l;
    }
    fn set_r(&mut self, r: Option<NodeId>) {
        self.r = r;
    }
}
