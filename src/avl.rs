//! AVL tree engine.
//!
//! Height balancing through per-node balance factors, `height(right) -
//! height(left)`, kept in `{-1, 0, 1}` (±2 transiently while a fix-up is
//! in flight). Insertion stops at the first corrective rotation; deletion
//! keeps climbing for as long as the rebalanced subtree got shorter.

use std::cmp::Ordering;

use crate::arena::{NodeArena, NodeId};
use crate::bst;
use crate::map::{BalanceOps, Comparator, NaturalOrder, TreeMap};
use crate::node::{swap_kv, KeyedNode, LinkNode};

/// AVL tree node.
pub struct AvlNode<K, V> {
    p: Option<NodeId>,
    l: Option<NodeId>,
    r: Option<NodeId>,
    bf: i8,
    k: K,
    v: V,
}

impl<K, V> LinkNode for AvlNode<K, V> {
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

impl<K, V> KeyedNode<K, V> for AvlNode<K, V> {
    fn new(k: K, v: V) -> Self {
        Self {
            p: None,
            l: None,
            r: None,
            bf: 0,
            k,
            v,
        }
    }
    fn key(&self) -> &K {
        &self.k
    }
    fn value(&self) -> &V {
        &self.v
    }
    fn value_mut(&mut self) -> &mut V {
        &mut self.v
    }
    fn into_kv(self) -> (K, V) {
        (self.k, self.v)
    }
    fn kv_mut(&mut self) -> (&mut K, &mut V) {
        (&mut self.k, &mut self.v)
    }
}

/// Left rotation with balance-factor transfer. The formulas are the
/// general ones, valid for every bf combination that can reach here.
fn rotate_left_bf<K, V>(arena: &mut NodeArena<AvlNode<K, V>>, x: NodeId) -> NodeId {
    let z = bst::rotate_left(arena, x);
    let zbf = arena[z].bf;
    let xbf = arena[x].bf - 1 - zbf.max(0);
    arena[x].bf = xbf;
    arena[z].bf += -1 + xbf.min(0);
    z
}

/// Right rotation with balance-factor transfer.
fn rotate_right_bf<K, V>(arena: &mut NodeArena<AvlNode<K, V>>, x: NodeId) -> NodeId {
    let z = bst::rotate_right(arena, x);
    let zbf = arena[z].bf;
    let xbf = arena[x].bf + 1 - zbf.min(0);
    arena[x].bf = xbf;
    arena[z].bf += 1 + xbf.max(0);
    z
}

/// Climb from the freshly linked node, updating balance factors; a single
/// or double rotation at the first unbalanced ancestor restores the
/// invariant and ends the walk.
fn insert_fixup<K, V>(
    arena: &mut NodeArena<AvlNode<K, V>>,
    root: NodeId,
    mut child: NodeId,
) -> NodeId {
    loop {
        let Some(p) = arena[child].p() else {
            return root;
        };
        let is_left = arena[p].l() == Some(child);
        let bf = arena[p].bf + if is_left { -1 } else { 1 };
        arena[p].bf = bf;
        match bf {
            0 => return root,
            -1 | 1 => child = p,
            _ => {
                let top = if bf < 0 {
                    // Left-heavy; the left child leans left (LL) or
                    // right (LR).
                    let l = arena[p].l().expect("left-heavy node has a left child");
                    if arena[l].bf <= 0 {
                        rotate_right_bf(arena, p)
                    } else {
                        rotate_left_bf(arena, l);
                        rotate_right_bf(arena, p)
                    }
                } else {
                    let r = arena[p].r().expect("right-heavy node has a right child");
                    if arena[r].bf >= 0 {
                        rotate_left_bf(arena, p)
                    } else {
                        rotate_right_bf(arena, r);
                        rotate_left_bf(arena, p)
                    }
                };
                return if arena[top].p().is_none() { top } else { root };
            }
        }
    }
}

/// Climb from `p` after its `was_left` subtree shrank by one level.
/// Unlike insertion this may rotate at several ancestors.
fn delete_fixup<K, V>(
    arena: &mut NodeArena<AvlNode<K, V>>,
    root: NodeId,
    mut p: NodeId,
    mut was_left: bool,
) -> NodeId {
    loop {
        let bf = arena[p].bf + if was_left { 1 } else { -1 };
        arena[p].bf = bf;
        let (sub_root, shrank) = match bf {
            -1 | 1 => return root,
            0 => (p, true),
            _ => {
                if bf > 0 {
                    let r = arena[p].r().expect("right-heavy node has a right child");
                    let rbf = arena[r].bf;
                    if rbf >= 0 {
                        // Single rotation; with a perfectly balanced
                        // sibling the subtree keeps its height.
                        (rotate_left_bf(arena, p), rbf != 0)
                    } else {
                        rotate_right_bf(arena, r);
                        (rotate_left_bf(arena, p), true)
                    }
                } else {
                    let l = arena[p].l().expect("left-heavy node has a left child");
                    let lbf = arena[l].bf;
                    if lbf <= 0 {
                        (rotate_right_bf(arena, p), lbf != 0)
                    } else {
                        rotate_left_bf(arena, l);
                        (rotate_right_bf(arena, p), true)
                    }
                }
            }
        };
        match arena[sub_root].p() {
            None => return sub_root,
            Some(pp) => {
                if !shrank {
                    return root;
                }
                was_left = arena[pp].l() == Some(sub_root);
                p = pp;
            }
        }
    }
}

impl<K, V> BalanceOps<K, V> for AvlNode<K, V> {
    fn insert<C: Comparator<K>>(
        arena: &mut NodeArena<Self>,
        root: Option<NodeId>,
        n: NodeId,
        cmp: &C,
    ) -> NodeId {
        let Some(root) = root else {
            return n;
        };
        let mut curr = root;
        loop {
            let ord = cmp.cmp(arena[n].key(), arena[curr].key());
            let next = if ord == Ordering::Less {
                arena[curr].l()
            } else {
                arena[curr].r()
            };
            match next {
                Some(next) => curr = next,
                None => {
                    return if ord == Ordering::Less {
                        Self::insert_left(arena, root, n, curr)
                    } else {
                        Self::insert_right(arena, root, n, curr)
                    };
                }
            }
        }
    }

    fn insert_left(
        arena: &mut NodeArena<Self>,
        root: NodeId,
        n: NodeId,
        parent: NodeId,
    ) -> NodeId {
        debug_assert!(arena[parent].l().is_none());
        arena[parent].set_l(Some(n));
        arena[n].set_p(Some(parent));
        insert_fixup(arena, root, n)
    }

    fn insert_right(
        arena: &mut NodeArena<Self>,
        root: NodeId,
        n: NodeId,
        parent: NodeId,
    ) -> NodeId {
        debug_assert!(arena[parent].r().is_none());
        arena[parent].set_r(Some(n));
        arena[n].set_p(Some(parent));
        insert_fixup(arena, root, n)
    }

    fn remove(arena: &mut NodeArena<Self>, root: Option<NodeId>, n: NodeId) -> Option<NodeId> {
        let root = root?;
        let mut n = n;
        if arena[n].l().is_some() && arena[n].r().is_some() {
            let s = bst::first(arena, arena[n].r()).expect("right subtree is non-empty");
            swap_kv(arena, n, s);
            n = s;
        }
        let child = arena[n].l().or(arena[n].r());
        match arena[n].p() {
            None => {
                // Removing the root; a lone child is necessarily a leaf.
                arena.remove(n);
                if let Some(c) = child {
                    arena[c].set_p(None);
                    Some(c)
                } else {
                    None
                }
            }
            Some(p) => {
                let was_left = arena[p].l() == Some(n);
                if was_left {
                    arena[p].set_l(child);
                } else {
                    arena[p].set_r(child);
                }
                if let Some(c) = child {
                    arena[c].set_p(Some(p));
                }
                arena.remove(n);
                Some(delete_fixup(arena, root, p, was_left))
            }
        }
    }

    fn meta(&self) -> String {
        if self.bf == 0 {
            String::new()
        } else {
            format!("{:+}", self.bf)
        }
    }

    #[doc(hidden)]
    fn validate(arena: &NodeArena<Self>, root: Option<NodeId>) {
        check_height(arena, root);
    }
}

/// Assert balance factors below `n` and return the subtree height.
fn check_height<K, V>(arena: &NodeArena<AvlNode<K, V>>, n: Option<NodeId>) -> i32 {
    let Some(n) = n else {
        return 0;
    };
    let node = &arena[n];
    let lh = check_height(arena, node.l());
    let rh = check_height(arena, node.r());
    assert_eq!(node.bf as i32, rh - lh, "stored balance factor is stale");
    assert!(
        (-1..=1).contains(&node.bf),
        "balance factor out of range: {}",
        node.bf
    );
    lh.max(rh) + 1
}

/// Sorted map balanced by the AVL engine.
pub type AvlMap<K, V, C = NaturalOrder> = TreeMap<K, V, AvlNode<K, V>, C>;

/// Sorted set over the AVL engine: elements are node keys, there is no
/// separate value payload.
///
/// ```
/// let mut set = arbor::AvlSet::new();
/// set.add(3);
/// set.add(1);
/// set.add(2);
/// assert!(set.has(&2));
/// assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
/// ```
pub struct AvlSet<T, C = NaturalOrder>
where
    C: Comparator<T>,
{
    map: TreeMap<T, (), AvlNode<T, ()>, C>,
}

impl<T: Ord> AvlSet<T, NaturalOrder> {
    pub fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<T: Ord> Default for AvlSet<T, NaturalOrder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C: Comparator<T>> AvlSet<T, C> {
    pub fn with_comparator(comparator: C) -> Self {
        Self {
            map: TreeMap::with_comparator(comparator),
        }
    }

    /// Insert `value`; adding an element twice is a no-op that keeps the
    /// original node.
    pub fn add(&mut self, value: T) -> NodeId {
        self.map.set(value, ())
    }

    pub fn has(&self, value: &T) -> bool {
        self.map.has(value)
    }

    pub fn del(&mut self, value: &T) -> bool {
        self.map.del(value)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear()
    }

    pub fn first(&self) -> Option<&T> {
        self.map.first().map(|n| self.map.key(n))
    }

    pub fn last(&self) -> Option<&T> {
        self.map.last().map(|n| self.map.key(n))
    }

    /// Exact match, or the greatest element below `value`.
    pub fn get_or_next_lower(&self, value: &T) -> Option<&T> {
        self.map.get_or_next_lower(value).map(|n| self.map.key(n))
    }

    pub fn for_each<F: FnMut(&T)>(&self, mut f: F) {
        self.map.for_each(|k, _| f(k));
    }

    /// Ascending iteration over the elements.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.map.iter().map(|(k, _)| k)
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self)
    where
        T: std::fmt::Debug,
    {
        self.map.assert_invariants();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(map: &AvlMap<i32, i32>) -> Vec<i32> {
        map.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn single_rotation_cases() {
        // RR: ascending chain rotates left at the root.
        let mut map = AvlMap::new();
        for k in [1, 2, 3] {
            map.set(k, k);
            map.assert_invariants();
        }
        assert_eq!(keys(&map), vec![1, 2, 3]);

        // LL: descending chain rotates right.
        let mut map = AvlMap::new();
        for k in [3, 2, 1] {
            map.set(k, k);
            map.assert_invariants();
        }
        assert_eq!(keys(&map), vec![1, 2, 3]);
    }

    #[test]
    fn double_rotation_cases() {
        // LR: left child leaning right.
        let mut map = AvlMap::new();
        for k in [3, 1, 2] {
            map.set(k, k);
            map.assert_invariants();
        }
        assert_eq!(keys(&map), vec![1, 2, 3]);

        // RL: right child leaning left.
        let mut map = AvlMap::new();
        for k in [1, 3, 2] {
            map.set(k, k);
            map.assert_invariants();
        }
        assert_eq!(keys(&map), vec![1, 2, 3]);
    }

    #[test]
    fn ascending_insert_then_ascending_delete() {
        let mut map = AvlMap::new();
        for k in 0..100 {
            map.set(k, k);
            map.assert_invariants();
        }
        for k in 0..100 {
            assert!(map.del(&k));
            map.assert_invariants();
            assert_eq!(map.len(), (99 - k) as usize);
        }
        assert!(map.is_empty());
    }

    #[test]
    fn deletion_can_cascade_rotations() {
        // A Fibonacci-ish skewed tree: deleting in the short subtree
        // forces rebalancing at more than one ancestor level.
        let mut map = AvlMap::new();
        for k in [8, 5, 11, 3, 7, 10, 12, 2, 4, 6, 9, 1] {
            map.set(k, k);
            map.assert_invariants();
        }
        assert!(map.del(&12));
        map.assert_invariants();
        assert_eq!(map.len(), 11);
        assert_eq!(keys(&map), vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
    }

    #[test]
    fn value_mut_writes_through() {
        let mut map = AvlMap::new();
        let id = map.set(1, 10);
        *map.value_mut(id) += 5;
        assert_eq!(map.get(&1), Some(&15));
    }

    #[test]
    fn set_basics() {
        let mut set = AvlSet::new();
        set.add(3);
        set.add(1);
        set.add(2);
        set.add(2);
        assert_eq!(set.len(), 3);
        assert!(set.has(&2));
        assert!(set.del(&2));
        assert!(!set.has(&2));
        assert_eq!(set.first(), Some(&1));
        assert_eq!(set.last(), Some(&3));
        assert_eq!(set.get_or_next_lower(&2), Some(&1));
        set.assert_invariants();
    }
}
