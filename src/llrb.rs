//! Left-leaning red-black tree.
//!
//! A simplified red-black variant: the same coloring invariants plus
//! "red links lean left": no node ever has a red right child. Insertion
//! repairs the tree with a bottom-up rotate/rotate/color-flip pass;
//! deletion pushes a red link down ahead of the search path with
//! `move_red_left`/`move_red_right` so the target never ends up as an
//! uncovered black node.

use std::cmp::Ordering;
use std::fmt::Debug;
use std::marker::PhantomData;

use crate::arena::{NodeArena, NodeId};
use crate::bst;
use crate::map::{Comparator, Iter, NaturalOrder};
use crate::node::{swap_kv, KeyedNode, LinkNode};
use crate::print::{print_binary, print_tree, PrintChild};
use crate::rb::Color;

/// LLRB tree node.
pub struct LlrbNode<K, V> {
    p: Option<NodeId>,
    l: Option<NodeId>,
    r: Option<NodeId>,
    color: Color,
    k: K,
    v: V,
}

impl<K, V> LinkNode for LlrbNode<K, V> {
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

impl<K, V> KeyedNode<K, V> for LlrbNode<K, V> {
    fn new(k: K, v: V) -> Self {
        Self {
            p: None,
            l: None,
            r: None,
            color: Color::Red,
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

type Arena<K, V> = NodeArena<LlrbNode<K, V>>;

#[inline]
fn is_red<K, V>(arena: &Arena<K, V>, n: Option<NodeId>) -> bool {
    n.map(|n| arena[n].color == Color::Red).unwrap_or(false)
}

#[inline]
fn left_of<K, V>(arena: &Arena<K, V>, n: Option<NodeId>) -> Option<NodeId> {
    n.and_then(|n| arena[n].l())
}

/// Toggle the colors of `n` and both children: the "push red up" step.
fn color_flip<K, V>(arena: &mut Arena<K, V>, n: NodeId) {
    let flip = |c: Color| match c {
        Color::Red => Color::Black,
        Color::Black => Color::Red,
    };
    arena[n].color = flip(arena[n].color);
    if let Some(l) = arena[n].l() {
        arena[l].color = flip(arena[l].color);
    }
    if let Some(r) = arena[n].r() {
        arena[r].color = flip(arena[r].color);
    }
}

/// Left rotation transferring the link color onto the risen node.
fn rotate_left<K, V>(arena: &mut Arena<K, V>, n: NodeId) -> NodeId {
    let x = bst::rotate_left(arena, n);
    arena[x].color = arena[n].color;
    arena[n].color = Color::Red;
    x
}

/// Right rotation transferring the link color onto the risen node.
fn rotate_right<K, V>(arena: &mut Arena<K, V>, n: NodeId) -> NodeId {
    let x = bst::rotate_right(arena, n);
    arena[x].color = arena[n].color;
    arena[n].color = Color::Red;
    x
}

/// Restore the left-leaning invariants at `n` on the way back up.
fn balance<K, V>(arena: &mut Arena<K, V>, mut n: NodeId) -> NodeId {
    if is_red(arena, arena[n].r()) {
        n = rotate_left(arena, n);
    }
    if is_red(arena, arena[n].l()) && is_red(arena, left_of(arena, arena[n].l())) {
        n = rotate_right(arena, n);
    }
    if is_red(arena, arena[n].l()) && is_red(arena, arena[n].r()) {
        color_flip(arena, n);
    }
    n
}

/// Make `n.l` or a node below it red before descending left.
fn move_red_left<K, V>(arena: &mut Arena<K, V>, mut n: NodeId) -> NodeId {
    color_flip(arena, n);
    if let Some(r) = arena[n].r() {
        if is_red(arena, arena[r].l()) {
            rotate_right(arena, r);
            n = rotate_left(arena, n);
            color_flip(arena, n);
        }
    }
    n
}

/// Make `n.r` or a node below it red before descending right.
fn move_red_right<K, V>(arena: &mut Arena<K, V>, mut n: NodeId) -> NodeId {
    color_flip(arena, n);
    if let Some(l) = arena[n].l() {
        if is_red(arena, arena[l].l()) {
            n = rotate_right(arena, n);
            color_flip(arena, n);
        }
    }
    n
}

/// Remove the minimum of the subtree at `n`, freeing its arena slot.
fn delete_min<K, V>(arena: &mut Arena<K, V>, mut n: NodeId) -> Option<NodeId> {
    if arena[n].l().is_none() {
        // The leftmost node of an LLRB subtree has no right child either.
        debug_assert!(arena[n].r().is_none());
        arena.remove(n);
        return None;
    }
    let l = arena[n].l().expect("checked above");
    if !is_red(arena, Some(l)) && !is_red(arena, arena[l].l()) {
        n = move_red_left(arena, n);
    }
    let l = arena[n].l().expect("move_red_left keeps a left child");
    let new_l = delete_min(arena, l);
    arena[n].set_l(new_l);
    if let Some(new_l) = new_l {
        arena[new_l].set_p(Some(n));
    }
    Some(balance(arena, n))
}

fn insert_rec<K, V, C: Comparator<K>>(
    arena: &mut Arena<K, V>,
    h: Option<NodeId>,
    n: NodeId,
    cmp: &C,
    existing: &mut Option<NodeId>,
) -> NodeId {
    let Some(mut h) = h else {
        return n;
    };
    match cmp.cmp(arena[n].key(), arena[h].key()) {
        Ordering::Less => {
            let new_l = insert_rec(arena, arena[h].l(), n, cmp, existing);
            arena[h].set_l(Some(new_l));
            arena[new_l].set_p(Some(h));
        }
        Ordering::Greater => {
            let new_r = insert_rec(arena, arena[h].r(), n, cmp, existing);
            arena[h].set_r(Some(new_r));
            arena[new_r].set_p(Some(h));
        }
        Ordering::Equal => {
            // Overwrite in place; the speculatively allocated node goes
            // straight back to the arena.
            let (_, v) = arena.remove(n).into_kv();
            *arena[h].value_mut() = v;
            *existing = Some(h);
            return h;
        }
    }
    if is_red(arena, arena[h].r()) && !is_red(arena, arena[h].l()) {
        h = rotate_left(arena, h);
    }
    if is_red(arena, arena[h].l()) && is_red(arena, left_of(arena, arena[h].l())) {
        h = rotate_right(arena, h);
    }
    if is_red(arena, arena[h].l()) && is_red(arena, arena[h].r()) {
        color_flip(arena, h);
    }
    h
}

fn delete_rec<K, V, C: Comparator<K>>(
    arena: &mut Arena<K, V>,
    mut h: NodeId,
    key: &K,
    cmp: &C,
) -> Option<NodeId> {
    if cmp.cmp(key, arena[h].key()) == Ordering::Less {
        if let Some(l) = arena[h].l() {
            if !is_red(arena, Some(l)) && !is_red(arena, arena[l].l()) {
                h = move_red_left(arena, h);
            }
            let l = arena[h].l().expect("move_red_left keeps a left child");
            let new_l = delete_rec(arena, l, key, cmp);
            arena[h].set_l(new_l);
            if let Some(new_l) = new_l {
                arena[new_l].set_p(Some(h));
            }
        }
    } else {
        if is_red(arena, arena[h].l()) {
            h = rotate_right(arena, h);
        }
        if cmp.cmp(key, arena[h].key()) == Ordering::Equal && arena[h].r().is_none() {
            arena.remove(h);
            return None;
        }
        if let Some(r) = arena[h].r() {
            if !is_red(arena, Some(r)) && !is_red(arena, arena[r].l()) {
                h = move_red_right(arena, h);
            }
        }
        if cmp.cmp(key, arena[h].key()) == Ordering::Equal {
            // Two-sided: adopt the in-order successor's payload, then
            // remove the successor from the right subtree.
            let r = arena[h].r().expect("equal case with no right child returned above");
            let m = bst::first(arena, Some(r)).expect("non-empty subtree");
            swap_kv(arena, h, m);
            let new_r = delete_min(arena, r);
            arena[h].set_r(new_r);
            if let Some(new_r) = new_r {
                arena[new_r].set_p(Some(h));
            }
        } else if let Some(r) = arena[h].r() {
            let new_r = delete_rec(arena, r, key, cmp);
            arena[h].set_r(new_r);
            if let Some(new_r) = new_r {
                arena[new_r].set_p(Some(h));
            }
        }
    }
    Some(balance(arena, h))
}

/// Sorted map balanced as a left-leaning red-black tree.
///
/// Same façade contract as [`crate::RbMap`]/[`crate::AvlMap`]; the
/// balancing discipline trades the classical case analysis for color
/// flips plus two rotations.
///
/// ```
/// let mut tree = arbor::LlrbTree::new();
/// tree.set(2, "b");
/// tree.set(1, "a");
/// tree.set(3, "c");
/// assert_eq!(tree.get(&2), Some(&"b"));
/// assert!(tree.del(&2));
/// assert_eq!(tree.iter().map(|(k, _)| *k).collect::<Vec<_>>(), vec![1, 3]);
/// ```
pub struct LlrbTree<K, V, C = NaturalOrder>
where
    C: Comparator<K>,
{
    arena: Arena<K, V>,
    root: Option<NodeId>,
    min: Option<NodeId>,
    max: Option<NodeId>,
    comparator: C,
    _kv: PhantomData<(K, V)>,
}

impl<K: Ord, V> LlrbTree<K, V, NaturalOrder> {
    pub fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<K: Ord, V> Default for LlrbTree<K, V, NaturalOrder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C: Comparator<K>> LlrbTree<K, V, C> {
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

    /// Insert or overwrite. Returns the handle of the entry's node;
    /// existing keys keep their node identity.
    pub fn set(&mut self, key: K, value: V) -> NodeId {
        let n = self.arena.insert(LlrbNode::new(key, value));
        let mut existing = None;
        let new_root = insert_rec(&mut self.arena, self.root, n, &self.comparator, &mut existing);
        self.arena[new_root].color = Color::Black;
        self.arena[new_root].set_p(None);
        self.root = Some(new_root);
        let entry = existing.unwrap_or(n);
        if existing.is_none() {
            match self.min {
                None => {
                    self.min = Some(entry);
                    self.max = Some(entry);
                }
                Some(min) => {
                    if self
                        .comparator
                        .cmp(self.arena[entry].key(), self.arena[min].key())
                        == Ordering::Less
                    {
                        self.min = Some(entry);
                    }
                    let max = self.max.expect("min and max are set together");
                    if self
                        .comparator
                        .cmp(self.arena[entry].key(), self.arena[max].key())
                        == Ordering::Greater
                    {
                        self.max = Some(entry);
                    }
                }
            }
        }
        entry
    }

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

    /// Remove `key`; `false` (and no mutation) when it is absent.
    pub fn del(&mut self, key: &K) -> bool {
        if self.find(key).is_none() {
            return false;
        }
        let root = self.root.expect("find succeeded on a non-empty tree");
        self.root = delete_rec(&mut self.arena, root, key, &self.comparator);
        if let Some(root) = self.root {
            self.arena[root].color = Color::Black;
            self.arena[root].set_p(None);
        }
        // Deletion reshuffles payloads; recompute the extrema caches.
        self.min = bst::first(&self.arena, self.root);
        self.max = bst::last(&self.arena, self.root);
        true
    }

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

    pub fn first(&self) -> Option<NodeId> {
        self.min
    }

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

    pub fn value_mut(&mut self, id: NodeId) -> &mut V {
        self.arena[id].value_mut()
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        bst::next(&self.arena, id)
    }

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

    /// Lazy ascending iteration over `(&K, &V)` pairs.
    pub fn iter(&self) -> Iter<'_, K, V, LlrbNode<K, V>> {
        Iter::new(&self.arena, self.min)
    }

    /// Structural dump as an ASCII tree diagram. Debug aid only.
    pub fn to_debug_string(&self, tab: &str) -> String
    where
        K: Debug,
        V: Debug,
    {
        let arena = &self.arena;
        let root = self.root;
        "LlrbTree".to_string()
            + &print_tree(
                tab,
                &[Some(Box::new(move |tab: &str| dump(arena, root, tab)) as PrintChild<'_>)],
            )
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self)
    where
        K: Debug,
    {
        let Some(root) = self.root else {
            assert_eq!(self.arena.len(), 0);
            return;
        };
        assert_eq!(self.arena[root].color, Color::Black, "root must be black");
        assert!(self.arena[root].p().is_none(), "root has a parent");
        bst::assert_links(&self.arena, root);
        assert_eq!(bst::subtree_size(&self.arena, self.root), self.arena.len());
        assert_eq!(self.min, bst::first(&self.arena, self.root), "stale min cache");
        assert_eq!(self.max, bst::last(&self.arena, self.root), "stale max cache");
        black_height(&self.arena, Some(root));
        let mut prev: Option<NodeId> = None;
        let mut curr = self.min;
        while let Some(n) = curr {
            if let Some(p) = prev {
                assert_eq!(
                    self.comparator
                        .cmp(self.arena[p].key(), self.arena[n].key()),
                    Ordering::Less,
                    "in-order keys not strictly increasing"
                );
            }
            prev = Some(n);
            curr = bst::next(&self.arena, n);
        }
    }
}

/// Coloring plus left-leaning checks; returns the black height.
fn black_height<K, V>(arena: &Arena<K, V>, n: Option<NodeId>) -> usize {
    let Some(n) = n else {
        return 0;
    };
    let node = &arena[n];
    assert!(!is_red(arena, node.r()), "red link leans right");
    if node.color == Color::Red {
        assert!(!is_red(arena, node.l()), "red node has a red child");
    }
    let lh = black_height(arena, node.l());
    let rh = black_height(arena, node.r());
    assert_eq!(lh, rh, "black height mismatch");
    lh + (node.color == Color::Black) as usize
}

fn dump<K: Debug, V: Debug>(arena: &Arena<K, V>, root: Option<NodeId>, tab: &str) -> String {
    let Some(root) = root else {
        return String::from("∅");
    };
    let node = &arena[root];
    let head = match node.color {
        Color::Red => format!("Node [red] {{ {:?} = {:?} }}", node.key(), node.value()),
        Color::Black => format!("Node {{ {:?} = {:?} }}", node.key(), node.value()),
    };
    let l = node.l();
    let r = node.r();
    head + &print_binary(
        tab,
        l.map(|l| Box::new(move |tab: &str| dump(arena, Some(l), tab)) as PrintChild<'_>),
        r.map(|r| Box::new(move |tab: &str| dump(arena, Some(r), tab)) as PrintChild<'_>),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(tree: &LlrbTree<i32, i32>) -> Vec<i32> {
        tree.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn insert_fix_cases_in_one_chain() {
        let mut tree = LlrbTree::new();
        // 1 then 2: red right link → rotate left.
        tree.set(1, 1);
        tree.assert_invariants();
        tree.set(2, 2);
        tree.assert_invariants();
        // 3: both children red at the new subtree root → color flip.
        tree.set(3, 3);
        tree.assert_invariants();
        // 0 then -1: red-red left chain → rotate right.
        tree.set(0, 0);
        tree.assert_invariants();
        tree.set(-1, -1);
        tree.assert_invariants();
        assert_eq!(keys(&tree), vec![-1, 0, 1, 2, 3]);
    }

    #[test]
    fn overwrite_keeps_identity_and_size() {
        let mut tree = LlrbTree::new();
        let a = tree.set(5, 50);
        let b = tree.set(5, 51);
        assert_eq!(a, b);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(&5), Some(&51));
    }

    #[test]
    fn ascending_insert_then_ascending_delete() {
        let mut tree = LlrbTree::new();
        for k in 0..100 {
            tree.set(k, k);
            tree.assert_invariants();
        }
        for k in 0..100 {
            assert!(tree.del(&k));
            tree.assert_invariants();
            assert_eq!(tree.len(), (99 - k) as usize);
        }
        assert!(tree.is_empty());
        assert!(tree.first().is_none());
    }

    #[test]
    fn descending_delete() {
        let mut tree = LlrbTree::new();
        for k in 0..50 {
            tree.set(k, k);
        }
        for k in (0..50).rev() {
            assert!(tree.del(&k));
            tree.assert_invariants();
        }
        assert!(tree.is_empty());
    }

    #[test]
    fn delete_missing_is_a_no_op() {
        let mut tree = LlrbTree::new();
        assert!(!tree.del(&7));
        tree.set(1, 1);
        assert!(!tree.del(&7));
        assert_eq!(tree.len(), 1);
        tree.assert_invariants();
    }

    #[test]
    fn interior_two_child_delete() {
        let mut tree = LlrbTree::new();
        for k in [50, 25, 75, 10, 30, 60, 90, 5, 15, 27, 35] {
            tree.set(k, k);
            tree.assert_invariants();
        }
        assert!(tree.del(&25));
        tree.assert_invariants();
        assert!(tree.del(&50));
        tree.assert_invariants();
        assert_eq!(keys(&tree), vec![5, 10, 15, 27, 30, 35, 60, 75, 90]);
    }

    #[test]
    fn floor_and_iteration() {
        let mut tree = LlrbTree::new();
        for k in [10, 20, 30, 40] {
            tree.set(k, k * 10);
        }
        assert_eq!(tree.get_or_next_lower(&25).map(|n| *tree.key(n)), Some(20));
        assert_eq!(tree.get_or_next_lower(&5), None);
        let mut seen = Vec::new();
        tree.for_each(|k, v| seen.push((*k, *v)));
        assert_eq!(seen, vec![(10, 100), (20, 200), (30, 300), (40, 400)]);
    }
}
