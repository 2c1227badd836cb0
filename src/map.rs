//! The generic sorted-map façade shared by the red-black and AVL engines.

use std::cmp::Ordering;
use std::fmt::Debug;
use std::marker::PhantomData;

use crate::arena::{NodeArena, NodeId};
use crate::bst;
use crate::node::{KeyedNode, LinkNode};
use crate::print::{print_binary, print_tree, PrintChild};

/// Key ordering used by a map instance.
///
/// The blanket impl lets any `Fn(&K, &K) -> Ordering` closure serve as a
/// comparator; [`NaturalOrder`] is the zero-sized default for `K: Ord`.
pub trait Comparator<K> {
    fn cmp(&self, a: &K, b: &K) -> Ordering;
}

/// Compares keys through their `Ord` instance.
#[derive(Clone, Copy, Debug, Default)]
pub struct NaturalOrder;

impl<K: Ord> Comparator<K> for NaturalOrder {
    #[inline]
    fn cmp(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

impl<K, F> Comparator<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn cmp(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}

/// The balancing capability a node type plugs into [`TreeMap`].
///
/// Each engine implements the same four structural operations over the
/// shared parent/left/right node fields; the façade stays generic over
/// which balancing discipline maintains the tree shape.
pub trait BalanceOps<K, V>: KeyedNode<K, V> + Sized {
    /// Insert the pre-allocated, unlinked node `n`, descending from
    /// `root`. Returns the new root.
    fn insert<C: Comparator<K>>(
        arena: &mut NodeArena<Self>,
        root: Option<NodeId>,
        n: NodeId,
        cmp: &C,
    ) -> NodeId;

    /// Attach `n` as `parent`'s left child (the caller guarantees that
    /// slot is the correct BST position) and rebalance. Returns the new
    /// root.
    fn insert_left(
        arena: &mut NodeArena<Self>,
        root: NodeId,
        n: NodeId,
        parent: NodeId,
    ) -> NodeId;

    /// Mirror of [`BalanceOps::insert_left`].
    fn insert_right(
        arena: &mut NodeArena<Self>,
        root: NodeId,
        n: NodeId,
        parent: NodeId,
    ) -> NodeId;

    /// Remove the entry held by `n`, rebalance, and free exactly one
    /// arena slot. Returns the new root.
    ///
    /// When `n` has two children the engine relocates the in-order
    /// successor's payload into `n` and frees the successor's slot, so
    /// the freed id is not necessarily `n`.
    fn remove(arena: &mut NodeArena<Self>, root: Option<NodeId>, n: NodeId) -> Option<NodeId>;

    /// Extra annotation for the structural debug dump (e.g. node color).
    fn meta(&self) -> String {
        String::new()
    }

    /// Assert this engine's structural invariants. Test support.
    #[doc(hidden)]
    fn validate(arena: &NodeArena<Self>, root: Option<NodeId>);
}

/// Sorted map over a pluggable self-balancing tree engine.
///
/// Nodes are held in a [`NodeArena`]; `set` returns the inserted node's
/// stable [`NodeId`], and mutating through [`TreeMap::value_mut`] writes
/// straight into the stored entry. Cached min/max handles make extremum
/// queries O(1) and give inserts at either end a fast path that skips the
/// root descent.
///
/// Use the [`crate::RbMap`] / [`crate::AvlMap`] aliases rather than
/// naming the node type directly.
///
/// ```
/// let mut map = arbor::RbMap::new();
/// let id = map.set(2, "two");
/// map.set(1, "one");
/// assert_eq!(map.get(&2), Some(&"two"));
/// *map.value_mut(id) = "TWO";
/// assert_eq!(map.get(&2), Some(&"TWO"));
/// assert!(map.del(&1));
/// assert!(!map.del(&1));
/// ```
pub struct TreeMap<K, V, N, C = NaturalOrder>
where
    N: BalanceOps<K, V>,
    C: Comparator<K>,
{
    arena: NodeArena<N>,
    root: Option<NodeId>,
    min: Option<NodeId>,
    max: Option<NodeId>,
    comparator: C,
    _kv: PhantomData<(K, V)>,
}

impl<K, V, N> TreeMap<K, V, N, NaturalOrder>
where
    K: Ord,
    N: BalanceOps<K, V>,
{
    pub fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<K, V, N> Default for TreeMap<K, V, N, NaturalOrder>
where
    K: Ord,
    N: BalanceOps<K, V>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, N, C> TreeMap<K, V, N, C>
where
    N: BalanceOps<K, V>,
    C: Comparator<K>,
{
    pub fn with_comparator(comparator: C) -> Self {
        Self {
            arena: NodeArena::new(),
            root: None,
            min: None,
            max: None,
            comparator,
            _kv: PhantomData,
        }
    }

    /// Insert `key`, or overwrite its value when already present.
    /// Returns the handle of the node holding the entry; for an existing
    /// key the node identity is preserved.
    pub fn set(&mut self, key: K, value: V) -> NodeId {
        let Some(root) = self.root else {
            let n = self.arena.insert(N::new(key, value));
            self.root = Some(N::insert(&mut self.arena, None, n, &self.comparator));
            self.min = Some(n);
            self.max = Some(n);
            return n;
        };
        let max = self.max.expect("non-empty tree has a max");
        if self.comparator.cmp(&key, self.arena[max].key()) == Ordering::Greater {
            let n = self.arena.insert(N::new(key, value));
            self.root = Some(N::insert_right(&mut self.arena, root, n, max));
            self.max = Some(n);
            return n;
        }
        let min = self.min.expect("non-empty tree has a min");
        if self.comparator.cmp(&key, self.arena[min].key()) == Ordering::Less {
            let n = self.arena.insert(N::new(key, value));
            self.root = Some(N::insert_left(&mut self.arena, root, n, min));
            self.min = Some(n);
            return n;
        }
        let mut curr = root;
        loop {
            match self.comparator.cmp(&key, self.arena[curr].key()) {
                Ordering::Less => match self.arena[curr].l() {
                    Some(l) => curr = l,
                    None => {
                        let n = self.arena.insert(N::new(key, value));
                        self.root = Some(N::insert_left(&mut self.arena, root, n, curr));
                        return n;
                    }
                },
                Ordering::Greater => match self.arena[curr].r() {
                    Some(r) => curr = r,
                    None => {
                        let n = self.arena.insert(N::new(key, value));
                        self.root = Some(N::insert_right(&mut self.arena, root, n, curr));
                        return n;
                    }
                },
                Ordering::Equal => {
                    *self.arena[curr].value_mut() = value;
                    return curr;
                }
            }
        }
    }

    /// Handle of the node holding `key`, if any.
    pub fn find(&self, key: &K) -> Option<NodeId> {
        bst::find(&self.arena, self.root, key, &self.comparator)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(key).map(|n| self.arena[n].value())
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let n = self.find(key)?;
        Some(self.arena[n].value_mut())
    }

    pub fn has(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Remove `key`. Returns whether an entry was removed; a missing key
    /// leaves the map untouched.
    pub fn del(&mut self, key: &K) -> bool {
        let Some(node) = self.find(key) else {
            return false;
        };
        if Some(node) == self.max {
            self.max = bst::prev(&self.arena, node);
        } else if Some(node) == self.min {
            self.min = bst::next(&self.arena, node);
        }
        self.root = N::remove(&mut self.arena, self.root, node);
        if self.root.is_none() {
            self.min = None;
            self.max = None;
        }
        true
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = None;
        self.min = None;
        self.max = None;
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Node with the smallest key.
    pub fn first(&self) -> Option<NodeId> {
        self.min
    }

    /// Node with the largest key.
    pub fn last(&self) -> Option<NodeId> {
        self.max
    }

    /// Exact match, or the entry with the greatest key below `key`.
    pub fn get_or_next_lower(&self, key: &K) -> Option<NodeId> {
        bst::find_or_next_lower(&self.arena, self.root, key, &self.comparator)
    }

    pub fn key(&self, id: NodeId) -> &K {
        self.arena[id].key()
    }

    pub fn value(&self, id: NodeId) -> &V {
        self.arena[id].value()
    }

    /// Mutable access to the value stored at `id`; writes are visible to
    /// every subsequent lookup.
    pub fn value_mut(&mut self, id: NodeId) -> &mut V {
        self.arena[id].value_mut()
    }

    /// In-order successor of `id`.
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        bst::next(&self.arena, id)
    }

    /// In-order predecessor of `id`.
    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        bst::prev(&self.arena, id)
    }

    /// Visit every entry in ascending key order.
    pub fn for_each<F: FnMut(&K, &V)>(&self, mut f: F) {
        let mut curr = self.min;
        while let Some(n) = curr {
            let node = &self.arena[n];
            f(node.key(), node.value());
            curr = bst::next(&self.arena, n);
        }
    }

    /// Lazy ascending iteration over `(&K, &V)` pairs. Restartable:
    /// each call starts a fresh pass from the smallest key.
    pub fn iter(&self) -> Iter<'_, K, V, N> {
        Iter {
            arena: &self.arena,
            curr: self.min,
            _kv: PhantomData,
        }
    }

    /// Structural dump as an ASCII tree diagram. Debug aid only.
    pub fn to_debug_string(&self, tab: &str) -> String
    where
        K: Debug,
        V: Debug,
    {
        let root = self.root;
        let arena = &self.arena;
        "TreeMap".to_string()
            + &print_tree(
                tab,
                &[Some(Box::new(move |tab: &str| {
                    dump_subtree(arena, root, tab)
                }) as PrintChild<'_>)],
            )
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self)
    where
        K: Debug,
    {
        if let Some(root) = self.root {
            assert!(self.arena[root].p().is_none(), "root has a parent");
            bst::assert_links(&self.arena, root);
        }
        assert_eq!(
            bst::subtree_size(&self.arena, self.root),
            self.arena.len(),
            "arena size does not match reachable nodes"
        );
        assert_eq!(self.min, bst::first(&self.arena, self.root), "stale min cache");
        assert_eq!(self.max, bst::last(&self.arena, self.root), "stale max cache");
        let mut prev: Option<NodeId> = None;
        let mut curr = self.min;
        while let Some(n) = curr {
            if let Some(p) = prev {
                assert_eq!(
                    self.comparator.cmp(self.arena[p].key(), self.arena[n].key()),
                    Ordering::Less,
                    "in-order keys not strictly increasing: {:?} then {:?}",
                    self.arena[p].key(),
                    self.arena[n].key()
                );
            }
            prev = Some(n);
            curr = bst::next(&self.arena, n);
        }
        N::validate(&self.arena, self.root);
    }
}

/// Render `root`'s subtree the way the engines' debug dumps do: key/value
/// payload plus the node's [`BalanceOps::meta`] annotation.
pub(crate) fn dump_subtree<K, V, N>(
    arena: &NodeArena<N>,
    root: Option<NodeId>,
    tab: &str,
) -> String
where
    K: Debug,
    V: Debug,
    N: BalanceOps<K, V>,
{
    let Some(root) = root else {
        return String::from("∅");
    };
    let node = &arena[root];
    let meta = node.meta();
    let head = if meta.is_empty() {
        format!("Node {{ {:?} = {:?} }}", node.key(), node.value())
    } else {
        format!("Node [{}] {{ {:?} = {:?} }}", meta, node.key(), node.value())
    };
    let l = node.l();
    let r = node.r();
    head + &print_binary(
        tab,
        l.map(|l| Box::new(move |tab: &str| dump_subtree(arena, Some(l), tab)) as PrintChild<'_>),
        r.map(|r| Box::new(move |tab: &str| dump_subtree(arena, Some(r), tab)) as PrintChild<'_>),
    )
}

/// Ascending in-order iterator, threaded through parent pointers rather
/// than an explicit stack.
pub struct Iter<'a, K, V, N: KeyedNode<K, V>> {
    arena: &'a NodeArena<N>,
    curr: Option<NodeId>,
    _kv: PhantomData<(&'a K, &'a V)>,
}

impl<'a, K, V, N: KeyedNode<K, V>> Iter<'a, K, V, N> {
    pub(crate) fn new(arena: &'a NodeArena<N>, start: Option<NodeId>) -> Self {
        Self {
            arena,
            curr: start,
            _kv: PhantomData,
        }
    }
}

impl<'a, K, V, N: KeyedNode<K, V>> Iterator for Iter<'a, K, V, N> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.curr?;
        let arena = self.arena;
        self.curr = bst::next(arena, n);
        let node = &arena[n];
        Some((node.key(), node.value()))
    }
}
