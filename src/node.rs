use crate::arena::{NodeArena, NodeId};

/// Parent/left/right link accessors shared by every tree node shape in
/// this crate.
///
/// All of the traversal and rotation primitives in [`crate::bst`] are
/// written against this trait alone, so they work for red-black, AVL,
/// LLRB and radix sibling trees alike.
pub trait LinkNode {
    fn p(&self) -> Option<NodeId>;
    fn l(&self) -> Option<NodeId>;
    fn r(&self) -> Option<NodeId>;
    fn set_p(&mut self, p: Option<NodeId>);
    fn set_l(&mut self, l: Option<NodeId>);
    fn set_r(&mut self, r: Option<NodeId>);
}

/// A [`LinkNode`] that carries a key/value payload.
pub trait KeyedNode<K, V>: LinkNode {
    /// Fresh unlinked node.
    fn new(key: K, value: V) -> Self;
    fn key(&self) -> &K;
    fn value(&self) -> &V;
    fn value_mut(&mut self) -> &mut V;
    /// Tear the node apart into its payload.
    fn into_kv(self) -> (K, V);
    /// Mutable access to both payload fields at once. Only the engines
    /// use this, to relocate payloads during delete-by-successor.
    #[doc(hidden)]
    fn kv_mut(&mut self) -> (&mut K, &mut V);
}

/// Exchange the payloads of two nodes, leaving links and balancing
/// metadata where they are.
pub(crate) fn swap_kv<K, V, N>(arena: &mut NodeArena<N>, a: NodeId, b: NodeId)
where
    N: KeyedNode<K, V>,
{
    let (na, nb) = arena.pair_mut(a, b);
    let (ka, va) = na.kv_mut();
    let (kb, vb) = nb.kv_mut();
    std::mem::swap(ka, kb);
    std::mem::swap(va, vb);
}
