//! Traversal and rotation primitives shared by every tree variant.
//!
//! These are total functions over well-formed trees: passing a malformed
//! tree (broken parent links, cycles) is a caller bug, not a recoverable
//! condition, and none of these functions validate their input on the hot
//! path.

use std::cmp::Ordering;

use crate::arena::{NodeArena, NodeId};
use crate::map::Comparator;
use crate::node::{KeyedNode, LinkNode};

/// Leftmost descendant of `root`.
pub fn first<N: LinkNode>(arena: &NodeArena<N>, root: Option<NodeId>) -> Option<NodeId> {
    let mut curr = root?;
    while let Some(l) = arena[curr].l() {
        curr = l;
    }
    Some(curr)
}

/// Rightmost descendant of `root`.
pub fn last<N: LinkNode>(arena: &NodeArena<N>, root: Option<NodeId>) -> Option<NodeId> {
    let mut curr = root?;
    while let Some(r) = arena[curr].r() {
        curr = r;
    }
    Some(curr)
}

/// In-order successor of `curr`, threading through parent pointers.
pub fn next<N: LinkNode>(arena: &NodeArena<N>, curr: NodeId) -> Option<NodeId> {
    if let Some(r) = arena[curr].r() {
        return first(arena, Some(r));
    }
    let mut curr = curr;
    let mut p = arena[curr].p();
    while let Some(pi) = p {
        if arena[pi].r() == Some(curr) {
            curr = pi;
            p = arena[pi].p();
        } else {
            return Some(pi);
        }
    }
    None
}

/// In-order predecessor of `curr`.
pub fn prev<N: LinkNode>(arena: &NodeArena<N>, curr: NodeId) -> Option<NodeId> {
    if let Some(l) = arena[curr].l() {
        return last(arena, Some(l));
    }
    let mut curr = curr;
    let mut p = arena[curr].p();
    while let Some(pi) = p {
        if arena[pi].l() == Some(curr) {
            curr = pi;
            p = arena[pi].p();
        } else {
            return Some(pi);
        }
    }
    None
}

/// Number of nodes reachable from `root`.
pub fn subtree_size<N: LinkNode>(arena: &NodeArena<N>, root: Option<NodeId>) -> usize {
    match root {
        None => 0,
        Some(n) => {
            1 + subtree_size(arena, arena[n].l()) + subtree_size(arena, arena[n].r())
        }
    }
}

/// BST descent driven by a probe function.
///
/// `probe` returns the ordering of the searched-for key relative to the
/// visited node's key: `Less` descends left, `Greater` descends right.
pub fn find_by<N, F>(arena: &NodeArena<N>, root: Option<NodeId>, mut probe: F) -> Option<NodeId>
where
    N: LinkNode,
    F: FnMut(&N) -> Ordering,
{
    let mut curr = root;
    while let Some(n) = curr {
        curr = match probe(&arena[n]) {
            Ordering::Equal => return Some(n),
            Ordering::Less => arena[n].l(),
            Ordering::Greater => arena[n].r(),
        };
    }
    None
}

/// Standard BST search.
pub fn find<K, V, N, C>(
    arena: &NodeArena<N>,
    root: Option<NodeId>,
    key: &K,
    cmp: &C,
) -> Option<NodeId>
where
    N: KeyedNode<K, V>,
    C: Comparator<K>,
{
    find_by(arena, root, |n| cmp.cmp(key, n.key()))
}

/// Exact match, or the node with the greatest key below the probe (floor
/// search). `probe` has the same orientation as in [`find_by`].
pub fn find_or_next_lower_by<N, F>(
    arena: &NodeArena<N>,
    root: Option<NodeId>,
    mut probe: F,
) -> Option<NodeId>
where
    N: LinkNode,
    F: FnMut(&N) -> Ordering,
{
    let mut curr = root;
    let mut result = None;
    while let Some(n) = curr {
        match probe(&arena[n]) {
            Ordering::Equal => return Some(n),
            Ordering::Less => curr = arena[n].l(),
            Ordering::Greater => {
                result = Some(n);
                curr = arena[n].r();
            }
        }
    }
    result
}

/// Floor lookup: the node for `key`, else the greatest node below it.
pub fn find_or_next_lower<K, V, N, C>(
    arena: &NodeArena<N>,
    root: Option<NodeId>,
    key: &K,
    cmp: &C,
) -> Option<NodeId>
where
    N: KeyedNode<K, V>,
    C: Comparator<K>,
{
    find_or_next_lower_by(arena, root, |n| cmp.cmp(key, n.key()))
}

/// Splice `node` in as `p`'s left child; an existing left child is pushed
/// below `node`. Plain link surgery, no rebalancing.
pub fn insert_left<N: LinkNode>(arena: &mut NodeArena<N>, node: NodeId, p: NodeId) {
    let l = arena[p].l();
    arena[node].set_l(l);
    arena[p].set_l(Some(node));
    arena[node].set_p(Some(p));
    if let Some(l) = l {
        arena[l].set_p(Some(node));
    }
}

/// Mirror of [`insert_left`].
pub fn insert_right<N: LinkNode>(arena: &mut NodeArena<N>, node: NodeId, p: NodeId) {
    let r = arena[p].r();
    arena[node].set_r(r);
    arena[p].set_r(Some(node));
    arena[node].set_p(Some(p));
    if let Some(r) = r {
        arena[r].set_p(Some(node));
    }
}

/// Unbalanced BST insert: descend from `root` and splice `node` in at the
/// leaf position its key selects. Keys equal to an existing key go right.
/// Returns the root (unchanged unless the tree was empty).
pub fn insert<K, V, N, C>(
    arena: &mut NodeArena<N>,
    root: Option<NodeId>,
    node: NodeId,
    cmp: &C,
) -> NodeId
where
    N: KeyedNode<K, V>,
    C: Comparator<K>,
{
    let Some(root) = root else {
        return node;
    };
    let mut curr = root;
    loop {
        let goes_left = cmp.cmp(arena[node].key(), arena[curr].key()) == Ordering::Less;
        let next = if goes_left { arena[curr].l() } else { arena[curr].r() };
        match next {
            Some(next) => curr = next,
            None => {
                if goes_left {
                    insert_left(arena, node, curr);
                } else {
                    insert_right(arena, node, curr);
                }
                return root;
            }
        }
    }
}

/// Unlink `node` from an unbalanced tree rooted at `root` and return the
/// new root. The node's slot is left in the arena for the caller to free.
///
/// A two-child node is replaced by its left subtree, with the right
/// subtree reattached under the left subtree's rightmost node.
pub fn remove<N: LinkNode>(
    arena: &mut NodeArena<N>,
    root: Option<NodeId>,
    node: NodeId,
) -> Option<NodeId> {
    let p = arena[node].p();
    let l = arena[node].l();
    let r = arena[node].r();
    arena[node].set_p(None);
    arena[node].set_l(None);
    arena[node].set_r(None);
    match (l, r) {
        (None, None) => {
            let Some(p) = p else {
                return None;
            };
            if arena[p].l() == Some(node) {
                arena[p].set_l(None);
            } else {
                arena[p].set_r(None);
            }
            root
        }
        (Some(l), Some(r)) => {
            let most_right = last(arena, Some(l)).expect("non-empty subtree");
            arena[most_right].set_r(Some(r));
            arena[r].set_p(Some(most_right));
            match p {
                Some(p) => {
                    if arena[p].l() == Some(node) {
                        arena[p].set_l(Some(l));
                    } else {
                        arena[p].set_r(Some(l));
                    }
                    arena[l].set_p(Some(p));
                    root
                }
                None => {
                    arena[l].set_p(None);
                    Some(l)
                }
            }
        }
        _ => {
            let child = l.or(r).expect("one child");
            arena[child].set_p(p);
            match p {
                Some(p) => {
                    if arena[p].l() == Some(node) {
                        arena[p].set_l(Some(child));
                    } else {
                        arena[p].set_r(Some(child));
                    }
                    root
                }
                None => Some(child),
            }
        }
    }
}

/// Walk `root`'s subtree asserting that every parent/child link pair is
/// mutually consistent. Test support.
pub(crate) fn assert_links<N: LinkNode>(arena: &NodeArena<N>, root: NodeId) {
    if let Some(l) = arena[root].l() {
        assert_eq!(arena[l].p(), Some(root), "left child has wrong parent");
        assert_links(arena, l);
    }
    if let Some(r) = arena[root].r() {
        assert_eq!(arena[r].p(), Some(root), "right child has wrong parent");
        assert_links(arena, r);
    }
}

/// Single left rotation: `n`'s right child rises into its place. Returns
/// the risen node; the caller is responsible for noticing when the risen
/// node has no parent and therefore became the tree root.
pub fn rotate_left<N: LinkNode>(arena: &mut NodeArena<N>, n: NodeId) -> NodeId {
    let r = arena[n].r().expect("rotate_left requires a right child");
    let rl = arena[r].l();
    arena[n].set_r(rl);
    if let Some(rl) = rl {
        arena[rl].set_p(Some(n));
    }
    let p = arena[n].p();
    arena[r].set_l(Some(n));
    arena[r].set_p(p);
    arena[n].set_p(Some(r));
    if let Some(p) = p {
        if arena[p].l() == Some(n) {
            arena[p].set_l(Some(r));
        } else {
            arena[p].set_r(Some(r));
        }
    }
    r
}

/// Single right rotation: `n`'s left child rises into its place.
pub fn rotate_right<N: LinkNode>(arena: &mut NodeArena<N>, n: NodeId) -> NodeId {
    let l = arena[n].l().expect("rotate_right requires a left child");
    let lr = arena[l].r();
    arena[n].set_l(lr);
    if let Some(lr) = lr {
        arena[lr].set_p(Some(n));
    }
    let p = arena[n].p();
    arena[l].set_r(Some(n));
    arena[l].set_p(p);
    arena[n].set_p(Some(l));
    if let Some(p) = p {
        if arena[p].l() == Some(n) {
            arena[p].set_l(Some(l));
        } else {
            arena[p].set_r(Some(l));
        }
    }
    l
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::NaturalOrder;

    struct TestNode {
        p: Option<NodeId>,
        l: Option<NodeId>,
        r: Option<NodeId>,
        k: i32,
        v: i32,
    }

    impl LinkNode for TestNode {
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

    impl KeyedNode<i32, i32> for TestNode {
        fn new(k: i32, v: i32) -> Self {
            Self {
                p: None,
                l: None,
                r: None,
                k,
                v,
            }
        }
        fn key(&self) -> &i32 {
            &self.k
        }
        fn value(&self) -> &i32 {
            &self.v
        }
        fn value_mut(&mut self) -> &mut i32 {
            &mut self.v
        }
        fn into_kv(self) -> (i32, i32) {
            (self.k, self.v)
        }
        fn kv_mut(&mut self) -> (&mut i32, &mut i32) {
            (&mut self.k, &mut self.v)
        }
    }

    fn node(arena: &mut NodeArena<TestNode>, k: i32) -> NodeId {
        arena.insert(TestNode::new(k, k * 10))
    }

    fn link_left(arena: &mut NodeArena<TestNode>, p: NodeId, c: NodeId) {
        arena[p].set_l(Some(c));
        arena[c].set_p(Some(p));
    }

    fn link_right(arena: &mut NodeArena<TestNode>, p: NodeId, c: NodeId) {
        arena[p].set_r(Some(c));
        arena[c].set_p(Some(p));
    }

    ///       4
    ///      / \
    ///     2   6
    ///    / \ / \
    ///   1  3 5  7
    fn sample() -> (NodeArena<TestNode>, NodeId) {
        let mut arena = NodeArena::new();
        let n4 = node(&mut arena, 4);
        let n2 = node(&mut arena, 2);
        let n6 = node(&mut arena, 6);
        let n1 = node(&mut arena, 1);
        let n3 = node(&mut arena, 3);
        let n5 = node(&mut arena, 5);
        let n7 = node(&mut arena, 7);
        link_left(&mut arena, n4, n2);
        link_right(&mut arena, n4, n6);
        link_left(&mut arena, n2, n1);
        link_right(&mut arena, n2, n3);
        link_left(&mut arena, n6, n5);
        link_right(&mut arena, n6, n7);
        (arena, n4)
    }

    fn in_order_keys(arena: &NodeArena<TestNode>, root: Option<NodeId>) -> Vec<i32> {
        let mut keys = Vec::new();
        let mut curr = first(arena, root);
        while let Some(n) = curr {
            keys.push(arena[n].k);
            curr = next(arena, n);
        }
        keys
    }

    #[test]
    fn in_order_walk_is_sorted() {
        let (arena, root) = sample();
        assert_eq!(in_order_keys(&arena, Some(root)), vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn backwards_walk_is_reverse_sorted() {
        let (arena, root) = sample();
        let mut keys = Vec::new();
        let mut curr = last(&arena, Some(root));
        while let Some(n) = curr {
            keys.push(arena[n].k);
            curr = prev(&arena, n);
        }
        assert_eq!(keys, vec![7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn find_hits_and_misses() {
        let (arena, root) = sample();
        let cmp = NaturalOrder;
        for k in 1..=7 {
            let hit = find(&arena, Some(root), &k, &cmp).unwrap();
            assert_eq!(arena[hit].k, k);
        }
        assert!(find(&arena, Some(root), &0, &cmp).is_none());
        assert!(find(&arena, Some(root), &8, &cmp).is_none());
    }

    #[test]
    fn floor_search() {
        let (mut arena, root) = sample();
        // Thin the tree out so some probes fall between stored keys.
        let n3 = find(&arena, Some(root), &3, &NaturalOrder).unwrap();
        let root = remove(&mut arena, Some(root), n3);
        arena.remove(n3);

        let floor = |k: i32| {
            find_or_next_lower(&arena, root, &k, &NaturalOrder).map(|n| arena[n].k)
        };
        assert_eq!(floor(3), Some(2));
        assert_eq!(floor(4), Some(4));
        assert_eq!(floor(100), Some(7));
        assert_eq!(floor(0), None);
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let (mut arena, root) = sample();
        let mut root = Some(root);
        for k in [4, 1, 6, 3, 7, 2, 5] {
            let n = find(&arena, root, &k, &NaturalOrder).unwrap();
            root = remove(&mut arena, root, n);
            arena.remove(n);
            let keys = in_order_keys(&arena, root);
            let mut sorted = keys.clone();
            sorted.sort_unstable();
            assert_eq!(keys, sorted);
            assert_eq!(keys.len(), arena.len());
        }
        assert!(root.is_none());
    }

    #[test]
    fn unbalanced_insert_builds_a_search_tree() {
        let mut arena = NodeArena::new();
        let mut root = None;
        for k in [4, 2, 6, 1, 3, 5, 7] {
            let id = node(&mut arena, k);
            root = Some(insert(&mut arena, root, id, &NaturalOrder));
        }
        assert_eq!(in_order_keys(&arena, root), vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(subtree_size(&arena, root), 7);
    }

    #[test]
    fn rotations_preserve_order_and_links() {
        let (mut arena, root) = sample();
        let new_root = rotate_left(&mut arena, root);
        assert_eq!(arena[new_root].k, 6);
        assert_eq!(arena[new_root].p(), None);
        assert_eq!(in_order_keys(&arena, Some(new_root)), vec![1, 2, 3, 4, 5, 6, 7]);
        let back = rotate_right(&mut arena, new_root);
        assert_eq!(arena[back].k, 4);
        assert_eq!(in_order_keys(&arena, Some(back)), vec![1, 2, 3, 4, 5, 6, 7]);
    }
}
