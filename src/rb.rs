//! Red-black tree engine.
//!
//! Classical red-black balancing over parent-linked arena nodes: insertion
//! repairs red-red violations with recolor/rotate cascades, deletion
//! resolves the transient double-black deficiency case by case. The
//! [`crate::RbMap`] alias plugs this engine into the shared map façade.

use crate::arena::{NodeArena, NodeId};
use crate::bst;
use crate::map::{BalanceOps, Comparator, NaturalOrder, TreeMap};
use crate::node::{swap_kv, KeyedNode, LinkNode};

/// Node color.
///
/// Shared by the red-black, LLRB and sorted-map nodes. The AVL balance
/// factor is a different quantity and deliberately a different type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Color {
    Red,
    Black,
}

/// Red-black tree node.
pub struct RbNode<K, V> {
    p: Option<NodeId>,
    l: Option<NodeId>,
    r: Option<NodeId>,
    color: Color,
    k: K,
    v: V,
}

impl<K, V> LinkNode for RbNode<K, V> {
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

impl<K, V> KeyedNode<K, V> for RbNode<K, V> {
    fn new(k: K, v: V) -> Self {
        // Fresh nodes enter the tree red; insertion fix-up restores the
        // coloring invariants.
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

#[inline]
fn is_red<K, V>(arena: &NodeArena<RbNode<K, V>>, n: Option<NodeId>) -> bool {
    // Absent children count as black.
    n.map(|n| arena[n].color == Color::Red).unwrap_or(false)
}

#[inline]
fn color_of<K, V>(arena: &NodeArena<RbNode<K, V>>, n: NodeId) -> Color {
    arena[n].color
}

#[inline]
fn set_color<K, V>(arena: &mut NodeArena<RbNode<K, V>>, n: NodeId, color: Color) {
    arena[n].color = color;
}

/// Repair red-red violations upward from the freshly linked red node `n`.
/// Returns the (possibly new) root.
fn insert_fixup<K, V>(
    arena: &mut NodeArena<RbNode<K, V>>,
    mut root: NodeId,
    mut n: NodeId,
) -> NodeId {
    loop {
        let Some(p) = arena[n].p() else {
            // Violation reached the root: a red root is self-correcting.
            set_color(arena, n, Color::Black);
            return n;
        };
        if color_of(arena, p) == Color::Black {
            break;
        }
        let g = arena[p].p().expect("red node has a parent");
        let p_is_left = arena[g].l() == Some(p);
        let uncle = if p_is_left { arena[g].r() } else { arena[g].l() };
        if is_red(arena, uncle) {
            set_color(arena, p, Color::Black);
            set_color(arena, uncle.expect("red uncle"), Color::Black);
            set_color(arena, g, Color::Red);
            n = g;
            continue;
        }
        // Black uncle: one or two rotations at the grandparent terminate
        // the cascade.
        let top = if p_is_left {
            let mut p = p;
            if arena[p].r() == Some(n) {
                // Inner (zig-zag) child: convert to the outer case first.
                bst::rotate_left(arena, p);
                p = n;
            }
            let top = bst::rotate_right(arena, g);
            debug_assert_eq!(top, p);
            top
        } else {
            let mut p = p;
            if arena[p].l() == Some(n) {
                bst::rotate_right(arena, p);
                p = n;
            }
            let top = bst::rotate_left(arena, g);
            debug_assert_eq!(top, p);
            top
        };
        set_color(arena, top, Color::Black);
        set_color(arena, g, Color::Red);
        if arena[top].p().is_none() {
            root = top;
        }
        break;
    }
    set_color(arena, root, Color::Black);
    root
}

/// Resolve the double-black deficiency at `n` (still linked into the
/// tree). Cascades at most O(log n) levels; each step does O(1) work.
fn fix_double_black<K, V>(
    arena: &mut NodeArena<RbNode<K, V>>,
    mut root: NodeId,
    mut n: NodeId,
) -> NodeId {
    loop {
        let Some(p) = arena[n].p() else {
            // Deficiency reached the root and vanishes.
            return root;
        };
        let n_is_left = arena[p].l() == Some(n);
        let mut s = if n_is_left { arena[p].r() } else { arena[p].l() }
            .expect("double-black node has a sibling");

        if color_of(arena, s) == Color::Red {
            // Red sibling: rotate it above the parent; `n`'s new sibling
            // is black and one of the remaining cases applies.
            set_color(arena, s, Color::Black);
            set_color(arena, p, Color::Red);
            let top = if n_is_left {
                bst::rotate_left(arena, p)
            } else {
                bst::rotate_right(arena, p)
            };
            if arena[top].p().is_none() {
                root = top;
            }
            s = if n_is_left { arena[p].r() } else { arena[p].l() }
                .expect("sibling after rotation");
        }

        let (near, far) = if n_is_left {
            (arena[s].l(), arena[s].r())
        } else {
            (arena[s].r(), arena[s].l())
        };

        if !is_red(arena, near) && !is_red(arena, far) {
            // Black sibling, black nephews: push the deficiency up.
            set_color(arena, s, Color::Red);
            if color_of(arena, p) == Color::Red {
                set_color(arena, p, Color::Black);
                return root;
            }
            n = p;
            continue;
        }

        let s = if is_red(arena, near) && !is_red(arena, far) {
            // Near nephew red: rotate the sibling to convert into the
            // far-red case.
            let near = near.expect("near nephew is red");
            set_color(arena, near, Color::Black);
            set_color(arena, s, Color::Red);
            if n_is_left {
                bst::rotate_right(arena, s);
                arena[p].r().expect("sibling after conversion")
            } else {
                bst::rotate_left(arena, s);
                arena[p].l().expect("sibling after conversion")
            }
        } else {
            s
        };

        // Far nephew red: rotate the parent through the sibling; the
        // sibling inherits the parent's color and the deficiency is paid.
        let far = if n_is_left { arena[s].r() } else { arena[s].l() }
            .expect("far nephew is red");
        let p_color = color_of(arena, p);
        set_color(arena, s, p_color);
        set_color(arena, p, Color::Black);
        set_color(arena, far, Color::Black);
        let top = if n_is_left {
            bst::rotate_left(arena, p)
        } else {
            bst::rotate_right(arena, p)
        };
        if arena[top].p().is_none() {
            root = top;
        }
        return root;
    }
}

impl<K, V> BalanceOps<K, V> for RbNode<K, V> {
    fn insert<C: Comparator<K>>(
        arena: &mut NodeArena<Self>,
        root: Option<NodeId>,
        n: NodeId,
        cmp: &C,
    ) -> NodeId {
        let Some(root) = root else {
            set_color(arena, n, Color::Black);
            return n;
        };
        let mut curr = root;
        loop {
            let ord = cmp.cmp(arena[n].key(), arena[curr].key());
            let next = if ord == std::cmp::Ordering::Less {
                arena[curr].l()
            } else {
                arena[curr].r()
            };
            match next {
                Some(next) => curr = next,
                None => {
                    return if ord == std::cmp::Ordering::Less {
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
        let mut root = root?;
        let mut n = n;
        if arena[n].l().is_some() && arena[n].r().is_some() {
            // Two children: relocate the in-order successor's payload
            // here and delete the successor, which has no left child.
            let s = bst::first(arena, arena[n].r()).expect("right subtree is non-empty");
            swap_kv(arena, n, s);
            n = s;
        }
        let child = arena[n].l().or(arena[n].r());
        let p = arena[n].p();
        match child {
            Some(c) => {
                arena[c].set_p(p);
                match p {
                    Some(p) => {
                        if arena[p].l() == Some(n) {
                            arena[p].set_l(Some(c));
                        } else {
                            arena[p].set_r(Some(c));
                        }
                    }
                    None => root = c,
                }
                if color_of(arena, n) == Color::Black {
                    if color_of(arena, c) == Color::Red {
                        set_color(arena, c, Color::Black);
                    } else {
                        root = fix_double_black(arena, root, c);
                    }
                }
                arena.remove(n);
                Some(root)
            }
            None => {
                let Some(_) = p else {
                    // Sole node of the tree.
                    arena.remove(n);
                    return None;
                };
                if color_of(arena, n) == Color::Black {
                    // Resolve the deficiency while `n` is still linked,
                    // then unlink it.
                    root = fix_double_black(arena, root, n);
                }
                let p = arena[n].p().expect("fix-up never detaches the node");
                if arena[p].l() == Some(n) {
                    arena[p].set_l(None);
                } else {
                    arena[p].set_r(None);
                }
                arena.remove(n);
                Some(root)
            }
        }
    }

    fn meta(&self) -> String {
        match self.color {
            Color::Red => "red".to_string(),
            Color::Black => String::new(),
        }
    }

    #[doc(hidden)]
    fn validate(arena: &NodeArena<Self>, root: Option<NodeId>) {
        let Some(root) = root else {
            return;
        };
        assert_eq!(color_of(arena, root), Color::Black, "root must be black");
        black_height(arena, Some(root));
    }
}

/// Assert the coloring invariants below `n` and return its black-height.
fn black_height<K, V>(arena: &NodeArena<RbNode<K, V>>, n: Option<NodeId>) -> usize {
    let Some(n) = n else {
        return 0;
    };
    let node = &arena[n];
    if node.color == Color::Red {
        assert!(!is_red(arena, node.l()), "red node has a red left child");
        assert!(!is_red(arena, node.r()), "red node has a red right child");
    }
    let lh = black_height(arena, node.l());
    let rh = black_height(arena, node.r());
    assert_eq!(lh, rh, "black height mismatch");
    lh + (node.color == Color::Black) as usize
}

/// Sorted map balanced by the red-black engine.
pub type RbMap<K, V, C = NaturalOrder> = TreeMap<K, V, RbNode<K, V>, C>;

#[cfg(test)]
mod tests {
    use super::*;

    type Arena = NodeArena<RbNode<i32, String>>;

    fn n(arena: &mut Arena, k: i32, color: Color) -> NodeId {
        let id = arena.insert(RbNode::new(k, k.to_string()));
        arena[id].color = color;
        id
    }

    fn link_left(arena: &mut Arena, parent: NodeId, child: NodeId) {
        arena[parent].set_l(Some(child));
        arena[child].set_p(Some(parent));
    }

    fn link_right(arena: &mut Arena, parent: NodeId, child: NodeId) {
        arena[parent].set_r(Some(child));
        arena[child].set_p(Some(parent));
    }

    fn keys(arena: &Arena, root: Option<NodeId>) -> Vec<i32> {
        let mut out = Vec::new();
        let mut curr = bst::first(arena, root);
        while let Some(id) = curr {
            out.push(*arena[id].key());
            curr = bst::next(arena, id);
        }
        out
    }

    fn check(arena: &Arena, root: Option<NodeId>) {
        if let Some(root) = root {
            assert!(arena[root].p().is_none());
            bst::assert_links(arena, root);
        }
        RbNode::validate(arena, root);
    }

    #[test]
    fn three_node_colors() {
        // Engine-level version of the façade test below, with access to
        // the node colors: root black, both leaves red.
        let mut arena = Arena::new();
        let cmp = crate::map::NaturalOrder;
        let mut root = None;
        for k in [10, 5, 15] {
            let id = arena.insert(RbNode::new(k, k.to_string()));
            root = Some(RbNode::insert(&mut arena, root, id, &cmp));
        }
        let root = root.unwrap();
        assert_eq!(*arena[root].key(), 10);
        assert_eq!(arena[root].color, Color::Black);
        let l = arena[root].l().unwrap();
        let r = arena[root].r().unwrap();
        assert_eq!(*arena[l].key(), 5);
        assert_eq!(*arena[r].key(), 15);
        assert_eq!(arena[l].color, Color::Red);
        assert_eq!(arena[r].color, Color::Red);
        check(&arena, Some(root));
        assert_eq!(keys(&arena, Some(root)), vec![5, 10, 15]);
    }

    #[test]
    fn three_node_shape() {
        let mut map = RbMap::new();
        map.set(10, "ten");
        map.set(5, "five");
        map.set(15, "fifteen");
        map.assert_invariants();
        let root = map.find(&10).unwrap();
        assert_eq!(map.first().map(|n| *map.key(n)), Some(5));
        assert_eq!(map.last().map(|n| *map.key(n)), Some(15));
        assert_eq!(map.next(map.first().unwrap()), Some(root));
        assert_eq!(
            map.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            vec![5, 10, 15]
        );
    }

    #[test]
    fn recolor_cascade_reaches_root() {
        // Ascending inserts exercise the recolor and outer-rotation
        // cases repeatedly.
        let mut map = RbMap::new();
        for k in 0..64 {
            map.set(k, k.to_string());
            map.assert_invariants();
        }
        assert_eq!(map.len(), 64);
    }

    #[test]
    fn duplicate_set_keeps_node_identity() {
        let mut map = RbMap::new();
        let a = map.set(7, "a".to_string());
        let b = map.set(7, "b".to_string());
        assert_eq!(a, b);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&7), Some(&"b".to_string()));
    }

    #[test]
    fn delete_from_empty_and_missing() {
        let mut map: RbMap<i32, String> = RbMap::new();
        assert!(!map.del(&1));
        map.set(1, "one".to_string());
        assert!(!map.del(&2));
        assert_eq!(map.len(), 1);
        assert!(map.del(&1));
        assert!(map.is_empty());
        assert!(map.first().is_none());
    }

    // The double-black shapes below are hand-linked so each fix-up case
    // runs in isolation; `remove` is driven directly at the engine level.

    #[test]
    fn delete_case_red_sibling() {
        //       20(b)
        //      /     \
        //   10(b)   30(r)
        //           /   \
        //        25(b) 35(b)
        let mut arena = Arena::new();
        let p = n(&mut arena, 20, Color::Black);
        let x = n(&mut arena, 10, Color::Black);
        let s = n(&mut arena, 30, Color::Red);
        let c = n(&mut arena, 25, Color::Black);
        let d = n(&mut arena, 35, Color::Black);
        link_left(&mut arena, p, x);
        link_right(&mut arena, p, s);
        link_left(&mut arena, s, c);
        link_right(&mut arena, s, d);
        check(&arena, Some(p));

        let root = RbNode::remove(&mut arena, Some(p), x);
        check(&arena, root);
        assert_eq!(keys(&arena, root), vec![20, 25, 30, 35]);
    }

    #[test]
    fn delete_case_black_sibling_black_nephews_red_parent() {
        //       20(r)
        //      /     \
        //   10(b)   30(b)
        // Parent red: recoloring terminates without propagation.
        let mut arena = Arena::new();
        let g = n(&mut arena, 40, Color::Black);
        let p = n(&mut arena, 20, Color::Red);
        let x = n(&mut arena, 10, Color::Black);
        let s = n(&mut arena, 30, Color::Black);
        let gr = n(&mut arena, 50, Color::Black);
        link_left(&mut arena, g, p);
        link_right(&mut arena, g, gr);
        link_left(&mut arena, p, x);
        link_right(&mut arena, p, s);
        check(&arena, Some(g));

        let root = RbNode::remove(&mut arena, Some(g), x);
        check(&arena, root);
        assert_eq!(keys(&arena, root), vec![20, 30, 40, 50]);
    }

    #[test]
    fn delete_case_black_sibling_black_nephews_black_parent_propagates() {
        //       20(b)
        //      /     \
        //   10(b)   30(b)
        // The deficiency climbs to the root and vanishes there.
        let mut arena = Arena::new();
        let p = n(&mut arena, 20, Color::Black);
        let x = n(&mut arena, 10, Color::Black);
        let s = n(&mut arena, 30, Color::Black);
        link_left(&mut arena, p, x);
        link_right(&mut arena, p, s);
        check(&arena, Some(p));

        let root = RbNode::remove(&mut arena, Some(p), x);
        check(&arena, root);
        assert_eq!(keys(&arena, root), vec![20, 30]);
    }

    #[test]
    fn delete_case_near_nephew_red() {
        //       20(b)
        //      /     \
        //   10(b)   30(b)
        //           /
        //        25(r)
        let mut arena = Arena::new();
        let p = n(&mut arena, 20, Color::Black);
        let x = n(&mut arena, 10, Color::Black);
        let s = n(&mut arena, 30, Color::Black);
        let near = n(&mut arena, 25, Color::Red);
        link_left(&mut arena, p, x);
        link_right(&mut arena, p, s);
        link_left(&mut arena, s, near);
        check(&arena, Some(p));

        let root = RbNode::remove(&mut arena, Some(p), x);
        check(&arena, root);
        assert_eq!(keys(&arena, root), vec![20, 25, 30]);
    }

    #[test]
    fn delete_case_far_nephew_red() {
        //       20(b)
        //      /     \
        //   10(b)   30(b)
        //               \
        //              35(r)
        let mut arena = Arena::new();
        let p = n(&mut arena, 20, Color::Black);
        let x = n(&mut arena, 10, Color::Black);
        let s = n(&mut arena, 30, Color::Black);
        let far = n(&mut arena, 35, Color::Red);
        link_left(&mut arena, p, x);
        link_right(&mut arena, p, s);
        link_right(&mut arena, s, far);
        check(&arena, Some(p));

        let root = RbNode::remove(&mut arena, Some(p), x);
        check(&arena, root);
        assert_eq!(keys(&arena, root), vec![20, 30, 35]);
    }

    #[test]
    fn delete_two_children_uses_successor() {
        let mut map = RbMap::new();
        for k in [50, 25, 75, 10, 30, 60, 90] {
            map.set(k, k.to_string());
        }
        assert!(map.del(&50));
        map.assert_invariants();
        assert_eq!(
            map.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            vec![10, 25, 30, 60, 75, 90]
        );
    }

    #[test]
    fn ascending_insert_then_ascending_delete() {
        let mut map = RbMap::new();
        for k in 0..100 {
            map.set(k, k.to_string());
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
    fn floor_lookup() {
        let mut map = RbMap::new();
        for k in [10, 20, 30] {
            map.set(k, k.to_string());
        }
        assert_eq!(map.get_or_next_lower(&25).map(|n| *map.key(n)), Some(20));
        assert_eq!(map.get_or_next_lower(&30).map(|n| *map.key(n)), Some(30));
        assert_eq!(map.get_or_next_lower(&5), None);
    }

    #[test]
    fn closure_comparator_reverses_order() {
        let mut map = RbMap::with_comparator(|a: &i32, b: &i32| b.cmp(a));
        for k in [1, 2, 3] {
            map.set(k, k);
            map.assert_invariants();
        }
        assert_eq!(map.iter().map(|(k, _)| *k).collect::<Vec<_>>(), vec![3, 2, 1]);
        assert_eq!(map.first().map(|n| *map.key(n)), Some(3));
        assert_eq!(map.get_or_next_lower(&2).map(|n| *map.key(n)), Some(2));
    }

    #[test]
    fn debug_dump_smoke() {
        let mut map = RbMap::new();
        map.set(2, "two");
        map.set(1, "one");
        map.set(3, "three");
        let dump = map.to_debug_string("");
        assert!(dump.contains("TreeMap"));
        assert!(dump.contains("2"));
        assert!(dump.contains("red"));
    }
}
