//! Ordered map with a header sentinel, bidirectional iterators, bound
//! queries, and optional O(log n) positional access.
//!
//! The tree is red-black underneath, but unlike [`crate::RbMap`] it
//! threads a dedicated header node through the structure: `header.p` is
//! the root, `header.l` the minimum, `header.r` the maximum, and the
//! header itself doubles as the past-the-end position in both iteration
//! directions. The header is a real arena slot that never carries a
//! key/value payload; every algorithm special-cases it by handle instead
//! of treating it as an ordinary node.

use std::cmp::Ordering;
use std::marker::PhantomData;

use crate::arena::{NodeArena, NodeId};
use crate::map::{Comparator, NaturalOrder};
use crate::rb::Color;

#[cold]
fn throw_iterator_access_error() -> ! {
    panic!("iterator access denied");
}

#[cold]
fn throw_out_of_range(pos: usize, len: usize) -> ! {
    panic!("position {pos} out of range for container of length {len}");
}

struct SortedMapNode<K, V> {
    p: Option<NodeId>,
    l: Option<NodeId>,
    r: Option<NodeId>,
    color: Color,
    /// Subtree node count; maintained only when indexing is enabled.
    sub: usize,
    /// `None` only for the header sentinel.
    kv: Option<(K, V)>,
}

impl<K, V> SortedMapNode<K, V> {
    fn new(kv: Option<(K, V)>, color: Color) -> Self {
        Self {
            p: None,
            l: None,
            r: None,
            color,
            sub: 1,
            kv,
        }
    }

    fn key(&self) -> &K {
        &self.kv.as_ref().expect("header carries no payload").0
    }

    fn value(&self) -> &V {
        &self.kv.as_ref().expect("header carries no payload").1
    }
}

/// Direction of a [`SortedMapIterator`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IteratorType {
    Normal,
    Reverse,
}

/// Bidirectional position into a [`SortedMap`].
///
/// A plain handle pair; stepping and dereferencing go through the map
/// (`next`, `prev`, `entry_of`), which panics on attempts to step past
/// the sentinel: that is a call-site bug, not a data condition.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SortedMapIterator {
    pub(crate) node: NodeId,
    ty: IteratorType,
}

impl SortedMapIterator {
    pub fn iterator_type(&self) -> IteratorType {
        self.ty
    }
}

/// Ordered map with header-sentinel iterators and positional access.
///
/// Positional operations (`get_element_by_pos`, `erase_element_by_pos`,
/// [`SortedMap::index_of`]) run in O(log n) when the map was built with
/// [`SortedMap::with_index`], which maintains a subtree-size counter on
/// every node; without it they fall back to an O(n) in-order walk.
///
/// ```
/// let mut map = arbor::SortedMap::with_index();
/// for k in [3, 1, 2] {
///     map.set_element(k, k * 10);
/// }
/// assert_eq!(map.get_element_by_pos(1), (&2, &20));
/// let mut it = map.lower_bound(&2);
/// assert_eq!(map.entry_of(it), (&2, &20));
/// map.next(&mut it);
/// assert_eq!(map.entry_of(it), (&3, &30));
/// ```
pub struct SortedMap<K, V, C = NaturalOrder>
where
    C: Comparator<K>,
{
    arena: NodeArena<SortedMapNode<K, V>>,
    header: NodeId,
    root: Option<NodeId>,
    len: usize,
    enable_index: bool,
    comparator: C,
    _kv: PhantomData<(K, V)>,
}

impl<K: Ord, V> SortedMap<K, V, NaturalOrder> {
    pub fn new() -> Self {
        Self::with_options(NaturalOrder, false)
    }

    /// Map with per-node subtree sizes for O(log n) positional access.
    pub fn with_index() -> Self {
        Self::with_options(NaturalOrder, true)
    }
}

impl<K: Ord, V> Default for SortedMap<K, V, NaturalOrder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for SortedMap<K, V, NaturalOrder> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.set_element(k, v);
        }
        map
    }
}

impl<K, V, C: Comparator<K>> SortedMap<K, V, C> {
    pub fn with_comparator(comparator: C) -> Self {
        Self::with_options(comparator, false)
    }

    pub fn with_options(comparator: C, enable_index: bool) -> Self {
        let mut arena = NodeArena::new();
        let header = arena.insert(SortedMapNode::new(None, Color::Red));
        Self {
            arena,
            header,
            root: None,
            len: 0,
            enable_index,
            comparator,
            _kv: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.header = self.arena.insert(SortedMapNode::new(None, Color::Red));
        self.root = None;
        self.len = 0;
    }

    // -- node-level helpers ------------------------------------------------

    #[inline]
    fn is_red(&self, n: Option<NodeId>) -> bool {
        n.map(|n| self.arena[n].color == Color::Red).unwrap_or(false)
    }

    #[inline]
    fn sub_of(&self, n: Option<NodeId>) -> usize {
        n.map(|n| self.arena[n].sub).unwrap_or(0)
    }

    fn compute(&mut self, n: NodeId) {
        let sub = 1 + self.sub_of(self.arena[n].l) + self.sub_of(self.arena[n].r);
        self.arena[n].sub = sub;
    }

    fn min_node(&self) -> Option<NodeId> {
        self.arena[self.header].l
    }

    fn max_node(&self) -> Option<NodeId> {
        self.arena[self.header].r
    }

    /// In-order successor; the header acts as the past-the-end result,
    /// and stepping forward from the header lands on the minimum.
    fn node_next(&self, n: NodeId) -> NodeId {
        if n == self.header {
            match self.min_node() {
                Some(min) => return min,
                None => throw_iterator_access_error(),
            }
        }
        if Some(n) == self.max_node() {
            return self.header;
        }
        if let Some(r) = self.arena[n].r {
            let mut curr = r;
            while let Some(l) = self.arena[curr].l {
                curr = l;
            }
            return curr;
        }
        let mut curr = n;
        let mut p = self.arena[curr].p.expect("linked node has a parent");
        while p != self.header && self.arena[p].r == Some(curr) {
            curr = p;
            p = self.arena[p].p.expect("linked node has a parent");
        }
        debug_assert_ne!(p, self.header, "walk past the maximum");
        p
    }

    /// In-order predecessor; stepping back from the header lands on the
    /// maximum, stepping back from the minimum lands on the header.
    fn node_prev(&self, n: NodeId) -> NodeId {
        if n == self.header {
            match self.max_node() {
                Some(max) => return max,
                None => throw_iterator_access_error(),
            }
        }
        if Some(n) == self.min_node() {
            return self.header;
        }
        if let Some(l) = self.arena[n].l {
            let mut curr = l;
            while let Some(r) = self.arena[curr].r {
                curr = r;
            }
            return curr;
        }
        if self.arena[n].p == Some(self.header) {
            // Root without a left subtree is the minimum; handled above.
            unreachable!("root with no left child is the minimum");
        }
        let mut curr = n;
        let mut p = self.arena[curr].p.expect("linked node has a parent");
        while p != self.header && self.arena[p].l == Some(curr) {
            curr = p;
            p = self.arena[p].p.expect("linked node has a parent");
        }
        debug_assert_ne!(p, self.header, "walk past the minimum");
        p
    }

    /// Lift `n`'s right child. Updates the root and, when indexing is on,
    /// the two affected subtree sizes.
    fn rotate_left(&mut self, n: NodeId) -> NodeId {
        let p = self.arena[n].p.expect("rotating a linked node");
        let r = self.arena[n].r.expect("rotate_left requires a right child");
        let rl = self.arena[r].l;
        if p == self.header {
            self.root = Some(r);
        } else if self.arena[p].l == Some(n) {
            self.arena[p].l = Some(r);
        } else {
            self.arena[p].r = Some(r);
        }
        self.arena[r].p = Some(p);
        self.arena[r].l = Some(n);
        self.arena[n].p = Some(r);
        self.arena[n].r = rl;
        if let Some(rl) = rl {
            self.arena[rl].p = Some(n);
        }
        if self.enable_index {
            self.compute(n);
            self.compute(r);
        }
        r
    }

    /// Lift `n`'s left child.
    fn rotate_right(&mut self, n: NodeId) -> NodeId {
        let p = self.arena[n].p.expect("rotating a linked node");
        let l = self.arena[n].l.expect("rotate_right requires a left child");
        let lr = self.arena[l].r;
        if p == self.header {
            self.root = Some(l);
        } else if self.arena[p].l == Some(n) {
            self.arena[p].l = Some(l);
        } else {
            self.arena[p].r = Some(l);
        }
        self.arena[l].p = Some(p);
        self.arena[l].r = Some(n);
        self.arena[n].p = Some(l);
        self.arena[n].l = lr;
        if let Some(lr) = lr {
            self.arena[lr].p = Some(n);
        }
        if self.enable_index {
            self.compute(n);
            self.compute(l);
        }
        l
    }

    // -- bound searches ----------------------------------------------------

    fn lower_bound_node(&self, key: &K) -> NodeId {
        let mut curr = self.root;
        let mut res = self.header;
        while let Some(n) = curr {
            match self.comparator.cmp(self.arena[n].key(), key) {
                Ordering::Less => curr = self.arena[n].r,
                Ordering::Greater => {
                    res = n;
                    curr = self.arena[n].l;
                }
                Ordering::Equal => return n,
            }
        }
        res
    }

    fn upper_bound_node(&self, key: &K) -> NodeId {
        let mut curr = self.root;
        let mut res = self.header;
        while let Some(n) = curr {
            if self.comparator.cmp(self.arena[n].key(), key) == Ordering::Greater {
                res = n;
                curr = self.arena[n].l;
            } else {
                curr = self.arena[n].r;
            }
        }
        res
    }

    fn reverse_lower_bound_node(&self, key: &K) -> NodeId {
        let mut curr = self.root;
        let mut res = self.header;
        while let Some(n) = curr {
            match self.comparator.cmp(self.arena[n].key(), key) {
                Ordering::Less => {
                    res = n;
                    curr = self.arena[n].r;
                }
                Ordering::Greater => curr = self.arena[n].l,
                Ordering::Equal => return n,
            }
        }
        res
    }

    fn reverse_upper_bound_node(&self, key: &K) -> NodeId {
        let mut curr = self.root;
        let mut res = self.header;
        while let Some(n) = curr {
            if self.comparator.cmp(self.arena[n].key(), key) == Ordering::Less {
                res = n;
                curr = self.arena[n].r;
            } else {
                curr = self.arena[n].l;
            }
        }
        res
    }

    fn node_by_key(&self, key: &K) -> NodeId {
        let mut curr = self.root;
        while let Some(n) = curr {
            match self.comparator.cmp(self.arena[n].key(), key) {
                Ordering::Less => curr = self.arena[n].r,
                Ordering::Greater => curr = self.arena[n].l,
                Ordering::Equal => return n,
            }
        }
        self.header
    }

    // -- insertion ---------------------------------------------------------

    fn insert_fixup(&mut self, mut cur: NodeId) {
        loop {
            let p = self.arena[cur].p.expect("linked node has a parent");
            debug_assert_ne!(p, self.header, "a fresh node is never the root here");
            if self.arena[p].color == Color::Black {
                return;
            }
            let g = self.arena[p].p.expect("red node has a real parent");
            let p_is_left = self.arena[g].l == Some(p);
            let uncle = if p_is_left {
                self.arena[g].r
            } else {
                self.arena[g].l
            };
            if self.is_red(uncle) {
                self.arena[uncle.expect("red uncle")].color = Color::Black;
                self.arena[p].color = Color::Black;
                if Some(g) == self.root {
                    return;
                }
                self.arena[g].color = Color::Red;
                cur = g;
                continue;
            }
            if p_is_left {
                if self.arena[p].r == Some(cur) {
                    self.arena[cur].color = Color::Black;
                    self.arena[g].color = Color::Red;
                    self.rotate_left(p);
                    self.rotate_right(g);
                } else {
                    self.arena[p].color = Color::Black;
                    self.arena[g].color = Color::Red;
                    self.rotate_right(g);
                }
            } else if self.arena[p].l == Some(cur) {
                self.arena[cur].color = Color::Black;
                self.arena[g].color = Color::Red;
                self.rotate_right(p);
                self.rotate_left(g);
            } else {
                self.arena[p].color = Color::Black;
                self.arena[g].color = Color::Red;
                self.rotate_left(g);
            }
            return;
        }
    }

    /// Insert a key-value pair or overwrite the value under an existing
    /// key. Returns the container length afterwards.
    pub fn set_element(&mut self, key: K, value: V) -> usize {
        let Some(_) = self.root else {
            let n = self
                .arena
                .insert(SortedMapNode::new(Some((key, value)), Color::Black));
            self.arena[n].p = Some(self.header);
            self.root = Some(n);
            self.arena[self.header].l = Some(n);
            self.arena[self.header].r = Some(n);
            self.len = 1;
            return self.len;
        };
        let min = self.min_node().expect("non-empty tree has a minimum");
        let cur = match self.comparator.cmp(self.arena[min].key(), &key) {
            Ordering::Equal => {
                self.arena[min].kv = Some((key, value));
                return self.len;
            }
            Ordering::Greater => {
                let n = self
                    .arena
                    .insert(SortedMapNode::new(Some((key, value)), Color::Red));
                self.arena[min].l = Some(n);
                self.arena[n].p = Some(min);
                self.arena[self.header].l = Some(n);
                n
            }
            Ordering::Less => {
                let max = self.max_node().expect("non-empty tree has a maximum");
                match self.comparator.cmp(self.arena[max].key(), &key) {
                    Ordering::Equal => {
                        self.arena[max].kv = Some((key, value));
                        return self.len;
                    }
                    Ordering::Less => {
                        let n = self
                            .arena
                            .insert(SortedMapNode::new(Some((key, value)), Color::Red));
                        self.arena[max].r = Some(n);
                        self.arena[n].p = Some(max);
                        self.arena[self.header].r = Some(n);
                        n
                    }
                    Ordering::Greater => {
                        // Interior key: ordinary BST descent.
                        let mut curr = self.root.expect("checked above");
                        loop {
                            match self.comparator.cmp(self.arena[curr].key(), &key) {
                                Ordering::Greater => match self.arena[curr].l {
                                    Some(l) => curr = l,
                                    None => {
                                        let n = self.arena.insert(SortedMapNode::new(
                                            Some((key, value)),
                                            Color::Red,
                                        ));
                                        self.arena[curr].l = Some(n);
                                        self.arena[n].p = Some(curr);
                                        break n;
                                    }
                                },
                                Ordering::Less => match self.arena[curr].r {
                                    Some(r) => curr = r,
                                    None => {
                                        let n = self.arena.insert(SortedMapNode::new(
                                            Some((key, value)),
                                            Color::Red,
                                        ));
                                        self.arena[curr].r = Some(n);
                                        self.arena[n].p = Some(curr);
                                        break n;
                                    }
                                },
                                Ordering::Equal => {
                                    self.arena[curr].kv = Some((key, value));
                                    return self.len;
                                }
                            }
                        }
                    }
                }
            }
        };
        if self.enable_index {
            let mut parent = self.arena[cur].p.expect("fresh node is linked");
            while parent != self.header {
                self.arena[parent].sub += 1;
                parent = self.arena[parent].p.expect("linked node has a parent");
            }
        }
        self.insert_fixup(cur);
        self.len += 1;
        self.len
    }

    // -- deletion ----------------------------------------------------------

    fn erase_fixup(&mut self, mut cur: NodeId) {
        loop {
            let p = self.arena[cur].p.expect("linked node has a parent");
            if p == self.header {
                return;
            }
            if self.arena[cur].color == Color::Red {
                self.arena[cur].color = Color::Black;
                return;
            }
            if Some(cur) == self.arena[p].l {
                let brother = self.arena[p].r.expect("black non-root node has a sibling");
                if self.is_red(Some(brother)) {
                    self.arena[brother].color = Color::Black;
                    self.arena[p].color = Color::Red;
                    self.rotate_left(p);
                } else if self.is_red(self.arena[brother].r) {
                    self.arena[brother].color = self.arena[p].color;
                    self.arena[p].color = Color::Black;
                    let br = self.arena[brother].r.expect("red nephew");
                    self.arena[br].color = Color::Black;
                    self.rotate_left(p);
                    return;
                } else if self.is_red(self.arena[brother].l) {
                    self.arena[brother].color = Color::Red;
                    let bl = self.arena[brother].l.expect("red nephew");
                    self.arena[bl].color = Color::Black;
                    self.rotate_right(brother);
                } else {
                    self.arena[brother].color = Color::Red;
                    cur = p;
                }
            } else {
                let brother = self.arena[p].l.expect("black non-root node has a sibling");
                if self.is_red(Some(brother)) {
                    self.arena[brother].color = Color::Black;
                    self.arena[p].color = Color::Red;
                    self.rotate_right(p);
                } else if self.is_red(self.arena[brother].l) {
                    self.arena[brother].color = self.arena[p].color;
                    self.arena[p].color = Color::Black;
                    let bl = self.arena[brother].l.expect("red nephew");
                    self.arena[bl].color = Color::Black;
                    self.rotate_right(p);
                    return;
                } else if self.is_red(self.arena[brother].r) {
                    self.arena[brother].color = Color::Red;
                    let br = self.arena[brother].r.expect("red nephew");
                    self.arena[br].color = Color::Black;
                    self.rotate_left(brother);
                } else {
                    self.arena[brother].color = Color::Red;
                    cur = p;
                }
            }
        }
    }

    fn erase_node(&mut self, cur: NodeId) {
        if self.len == 1 {
            self.clear();
            return;
        }
        // Swap the doomed payload down until it sits in a leaf; the
        // intermediate payloads shift one position toward the root.
        let mut cur = cur;
        let mut swap = cur;
        while self.arena[swap].l.is_some() || self.arena[swap].r.is_some() {
            if let Some(r) = self.arena[swap].r {
                swap = r;
                while let Some(l) = self.arena[swap].l {
                    swap = l;
                }
            } else {
                swap = self.arena[swap].l.expect("loop guard");
            }
            let (a, b) = self.arena.pair_mut(cur, swap);
            std::mem::swap(&mut a.kv, &mut b.kv);
            cur = swap;
        }
        if self.arena[self.header].l == Some(swap) {
            self.arena[self.header].l = self.arena[swap].p;
        } else if self.arena[self.header].r == Some(swap) {
            self.arena[self.header].r = self.arena[swap].p;
        }
        self.erase_fixup(swap);
        let mut parent = self.arena[swap].p.expect("leaf below the root has a parent");
        if self.arena[parent].l == Some(swap) {
            self.arena[parent].l = None;
        } else {
            self.arena[parent].r = None;
        }
        self.arena.remove(swap);
        self.len -= 1;
        let root = self.root.expect("tree still has nodes");
        self.arena[root].color = Color::Black;
        if self.enable_index {
            while parent != self.header {
                self.arena[parent].sub -= 1;
                parent = self.arena[parent].p.expect("linked node has a parent");
            }
        }
    }

    /// Remove the entry under `key`. Returns whether anything was erased.
    pub fn erase_element_by_key(&mut self, key: &K) -> bool {
        if self.len == 0 {
            return false;
        }
        let node = self.node_by_key(key);
        if node == self.header {
            return false;
        }
        self.erase_node(node);
        true
    }

    /// Remove the element at `pos` (0-based in key order). Returns the
    /// container length afterwards. Panics when `pos` is out of range.
    pub fn erase_element_by_pos(&mut self, pos: usize) -> usize {
        if pos >= self.len {
            throw_out_of_range(pos, self.len);
        }
        let node = self.node_at_pos(pos);
        self.erase_node(node);
        self.len
    }

    /// Remove the element an iterator points at and advance it.
    ///
    /// A normal iterator moves forward when the erased node had no right
    /// child (otherwise the successor's payload slides into place under
    /// the same handle); a reverse iterator moves when the node had a
    /// right child or was a leaf.
    pub fn erase_element_by_iterator(&mut self, it: SortedMapIterator) -> SortedMapIterator {
        let node = it.node;
        if node == self.header {
            throw_iterator_access_error();
        }
        let has_no_right = self.arena[node].r.is_none();
        let mut it = it;
        match it.ty {
            IteratorType::Normal => {
                if has_no_right {
                    self.next(&mut it);
                }
            }
            IteratorType::Reverse => {
                if !has_no_right || self.arena[node].l.is_none() {
                    self.next(&mut it);
                }
            }
        }
        self.erase_node(node);
        it
    }

    // -- positional access -------------------------------------------------

    fn node_at_pos(&self, pos: usize) -> NodeId {
        if self.enable_index {
            // Order-statistics descent over the subtree sizes.
            let mut curr = self.root.expect("checked by the caller");
            let mut pos = pos;
            loop {
                let lsize = self.sub_of(self.arena[curr].l);
                match pos.cmp(&lsize) {
                    Ordering::Less => curr = self.arena[curr].l.expect("size accounted for it"),
                    Ordering::Equal => return curr,
                    Ordering::Greater => {
                        pos -= lsize + 1;
                        curr = self.arena[curr].r.expect("size accounted for it");
                    }
                }
            }
        } else {
            let mut curr = self.min_node().expect("checked by the caller");
            for _ in 0..pos {
                curr = self.node_next(curr);
            }
            curr
        }
    }

    /// Entry at `pos` (0-based in key order). Panics when out of range.
    pub fn get_element_by_pos(&self, pos: usize) -> (&K, &V) {
        if pos >= self.len {
            throw_out_of_range(pos, self.len);
        }
        let node = self.node_at_pos(pos);
        let kv = self.arena[node].kv.as_ref().expect("real node");
        (&kv.0, &kv.1)
    }

    /// Sequential position of the iterator's node. With indexing enabled
    /// this is O(log n); otherwise it walks from the front.
    pub fn index_of(&self, it: SortedMapIterator) -> usize {
        let node = it.node;
        if node == self.header {
            return match self.root {
                Some(root) if self.enable_index => self.arena[root].sub - 1,
                Some(_) => self.len - 1,
                None => 0,
            };
        }
        if self.enable_index {
            let root = self.root.expect("iterator points into the tree");
            let mut index = self.sub_of(self.arena[node].l);
            let mut curr = node;
            while curr != root {
                let parent = self.arena[curr].p.expect("linked node has a parent");
                if self.arena[parent].r == Some(curr) {
                    index += 1 + self.sub_of(self.arena[parent].l);
                }
                curr = parent;
            }
            index
        } else {
            let mut index = 0;
            let mut curr = self.min_node().expect("iterator points into the tree");
            while curr != node {
                curr = self.node_next(curr);
                index += 1;
            }
            index
        }
    }

    // -- lookups -----------------------------------------------------------

    /// Iterator at `key`, or at the end sentinel when absent.
    pub fn find(&self, key: &K) -> SortedMapIterator {
        SortedMapIterator {
            node: self.node_by_key(key),
            ty: IteratorType::Normal,
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.node_by_key(key) != self.header
    }

    pub fn get_element_by_key(&self, key: &K) -> Option<&V> {
        let node = self.node_by_key(key);
        if node == self.header {
            None
        } else {
            Some(self.arena[node].value())
        }
    }

    /// First entry whose key is `>= key`.
    pub fn lower_bound(&self, key: &K) -> SortedMapIterator {
        SortedMapIterator {
            node: self.lower_bound_node(key),
            ty: IteratorType::Normal,
        }
    }

    /// First entry whose key is `> key`.
    pub fn upper_bound(&self, key: &K) -> SortedMapIterator {
        SortedMapIterator {
            node: self.upper_bound_node(key),
            ty: IteratorType::Normal,
        }
    }

    /// Last entry whose key is `<= key`.
    pub fn reverse_lower_bound(&self, key: &K) -> SortedMapIterator {
        SortedMapIterator {
            node: self.reverse_lower_bound_node(key),
            ty: IteratorType::Normal,
        }
    }

    /// Last entry whose key is `< key`.
    pub fn reverse_upper_bound(&self, key: &K) -> SortedMapIterator {
        SortedMapIterator {
            node: self.reverse_upper_bound_node(key),
            ty: IteratorType::Normal,
        }
    }

    // -- iterators ---------------------------------------------------------

    pub fn begin(&self) -> SortedMapIterator {
        SortedMapIterator {
            node: self.min_node().unwrap_or(self.header),
            ty: IteratorType::Normal,
        }
    }

    pub fn end(&self) -> SortedMapIterator {
        SortedMapIterator {
            node: self.header,
            ty: IteratorType::Normal,
        }
    }

    pub fn r_begin(&self) -> SortedMapIterator {
        SortedMapIterator {
            node: self.max_node().unwrap_or(self.header),
            ty: IteratorType::Reverse,
        }
    }

    pub fn r_end(&self) -> SortedMapIterator {
        SortedMapIterator {
            node: self.header,
            ty: IteratorType::Reverse,
        }
    }

    /// Whether the iterator points at a real entry (not a sentinel).
    pub fn is_accessible(&self, it: SortedMapIterator) -> bool {
        it.node != self.header
    }

    /// Step toward the iterator's own end. Panics when already there.
    pub fn next(&self, it: &mut SortedMapIterator) {
        if it.node == self.header {
            throw_iterator_access_error();
        }
        it.node = match it.ty {
            IteratorType::Normal => self.node_next(it.node),
            IteratorType::Reverse => self.node_prev(it.node),
        };
    }

    /// Step toward the iterator's own begin. Panics when stepping before
    /// the first entry.
    pub fn prev(&self, it: &mut SortedMapIterator) {
        match it.ty {
            IteratorType::Normal => {
                if Some(it.node) == self.min_node() {
                    throw_iterator_access_error();
                }
                it.node = self.node_prev(it.node);
            }
            IteratorType::Reverse => {
                if Some(it.node) == self.max_node() {
                    throw_iterator_access_error();
                }
                it.node = self.node_next(it.node);
            }
        }
    }

    /// Key/value under the iterator. Panics on a sentinel position.
    pub fn entry_of(&self, it: SortedMapIterator) -> (&K, &V) {
        if it.node == self.header {
            throw_iterator_access_error();
        }
        let kv = self.arena[it.node].kv.as_ref().expect("real node");
        (&kv.0, &kv.1)
    }

    pub fn front(&self) -> Option<(&K, &V)> {
        let min = self.min_node()?;
        let kv = self.arena[min].kv.as_ref().expect("real node");
        Some((&kv.0, &kv.1))
    }

    pub fn back(&self) -> Option<(&K, &V)> {
        let max = self.max_node()?;
        let kv = self.arena[max].kv.as_ref().expect("real node");
        Some((&kv.0, &kv.1))
    }

    pub fn for_each<F: FnMut(&K, &V)>(&self, mut f: F) {
        let mut curr = self.min_node();
        while let Some(n) = curr {
            let kv = self.arena[n].kv.as_ref().expect("real node");
            f(&kv.0, &kv.1);
            let next = self.node_next(n);
            curr = (next != self.header).then_some(next);
        }
    }

    /// Ascending iteration over `(&K, &V)` pairs.
    pub fn iter(&self) -> SortedMapIter<'_, K, V, C> {
        SortedMapIter {
            map: self,
            curr: self.min_node(),
        }
    }

    // -- odds and ends -----------------------------------------------------

    /// Rekey the entry under the iterator, allowed only when the new key
    /// keeps the entry in the same ordering slot relative to its
    /// neighbors. Returns whether the key was changed.
    pub fn update_key_by_iterator(&mut self, it: SortedMapIterator, key: K) -> bool {
        let node = it.node;
        if node == self.header {
            throw_iterator_access_error();
        }
        let rekey = |map: &mut Self, node: NodeId, key: K| {
            let kv = map.arena[node].kv.as_mut().expect("real node");
            kv.0 = key;
        };
        if self.len == 1 {
            rekey(self, node, key);
            return true;
        }
        if Some(node) == self.min_node() {
            let next = self.node_next(node);
            if self.comparator.cmp(self.arena[next].key(), &key) == Ordering::Greater {
                rekey(self, node, key);
                return true;
            }
            return false;
        }
        if Some(node) == self.max_node() {
            let prev = self.node_prev(node);
            if self.comparator.cmp(self.arena[prev].key(), &key) == Ordering::Less {
                rekey(self, node, key);
                return true;
            }
            return false;
        }
        let prev = self.node_prev(node);
        let next = self.node_next(node);
        if self.comparator.cmp(self.arena[prev].key(), &key) != Ordering::Less
            || self.comparator.cmp(self.arena[next].key(), &key) != Ordering::Greater
        {
            return false;
        }
        rekey(self, node, key);
        true
    }

    /// Copy every entry of `other` into `self`. Returns the new length.
    pub fn union(&mut self, other: &Self) -> usize
    where
        K: Clone,
        V: Clone,
    {
        other.for_each(|k, v| {
            self.set_element(k.clone(), v.clone());
        });
        self.len
    }

    /// Height of the underlying tree.
    pub fn get_height(&self) -> usize {
        fn height<K, V>(arena: &NodeArena<SortedMapNode<K, V>>, n: Option<NodeId>) -> usize {
            match n {
                None => 0,
                Some(n) => 1 + height(arena, arena[n].l).max(height(arena, arena[n].r)),
            }
        }
        height(&self.arena, self.root)
    }

    /// Structural dump as an ASCII tree diagram. Debug aid only.
    pub fn to_debug_string(&self, tab: &str) -> String
    where
        K: std::fmt::Debug,
        V: std::fmt::Debug,
    {
        fn dump<K: std::fmt::Debug, V: std::fmt::Debug>(
            arena: &NodeArena<SortedMapNode<K, V>>,
            root: Option<NodeId>,
            tab: &str,
        ) -> String {
            let Some(root) = root else {
                return String::from("∅");
            };
            let node = &arena[root];
            let kv = node.kv.as_ref().expect("real node");
            let head = match node.color {
                Color::Red => format!("Node [red] {{ {:?} = {:?} }}", kv.0, kv.1),
                Color::Black => format!("Node {{ {:?} = {:?} }}", kv.0, kv.1),
            };
            let (l, r) = (node.l, node.r);
            head + &crate::print::print_binary(
                tab,
                l.map(|l| {
                    Box::new(move |tab: &str| dump(arena, Some(l), tab))
                        as crate::print::PrintChild<'_>
                }),
                r.map(|r| {
                    Box::new(move |tab: &str| dump(arena, Some(r), tab))
                        as crate::print::PrintChild<'_>
                }),
            )
        }
        let arena = &self.arena;
        let root = self.root;
        "SortedMap".to_string()
            + &crate::print::print_tree(
                tab,
                &[Some(Box::new(move |tab: &str| dump(arena, root, tab))
                    as crate::print::PrintChild<'_>)],
            )
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let Some(root) = self.root else {
            assert_eq!(self.len, 0);
            assert!(self.min_node().is_none());
            assert!(self.max_node().is_none());
            return;
        };
        assert_eq!(self.arena[root].p, Some(self.header), "root must hang off the header");
        assert_eq!(self.arena[root].color, Color::Black, "root must be black");
        // Leftmost/rightmost nodes must match the header cache.
        let mut curr = root;
        while let Some(l) = self.arena[curr].l {
            curr = l;
        }
        assert_eq!(Some(curr), self.min_node(), "stale min link");
        let mut curr = root;
        while let Some(r) = self.arena[curr].r {
            curr = r;
        }
        assert_eq!(Some(curr), self.max_node(), "stale max link");
        let (count, _) = self.check_subtree(root);
        assert_eq!(count, self.len, "length counter out of sync");
        assert_eq!(count + 1, self.arena.len(), "arena holds stray nodes");
        // Keys strictly increase in order.
        let mut it = self.begin();
        let mut prev: Option<NodeId> = None;
        while self.is_accessible(it) {
            if let Some(p) = prev {
                assert_eq!(
                    self.comparator
                        .cmp(self.arena[p].key(), self.arena[it.node].key()),
                    Ordering::Less,
                    "in-order keys not strictly increasing"
                );
            }
            prev = Some(it.node);
            self.next(&mut it);
        }
    }

    /// Returns (node count, black height) while asserting link, color and
    /// subtree-size consistency.
    fn check_subtree(&self, n: NodeId) -> (usize, usize) {
        let node = &self.arena[n];
        if node.color == Color::Red {
            assert!(!self.is_red(node.l), "red node has a red left child");
            assert!(!self.is_red(node.r), "red node has a red right child");
        }
        let (lc, lh) = match node.l {
            Some(l) => {
                assert_eq!(self.arena[l].p, Some(n), "left child has wrong parent");
                self.check_subtree(l)
            }
            None => (0, 0),
        };
        let (rc, rh) = match node.r {
            Some(r) => {
                assert_eq!(self.arena[r].p, Some(n), "right child has wrong parent");
                self.check_subtree(r)
            }
            None => (0, 0),
        };
        assert_eq!(lh, rh, "black height mismatch");
        let count = 1 + lc + rc;
        if self.enable_index {
            assert_eq!(node.sub, count, "stale subtree size");
        }
        (count, lh + (node.color == Color::Black) as usize)
    }
}

/// Ascending borrowing iterator over a [`SortedMap`].
pub struct SortedMapIter<'a, K, V, C: Comparator<K>> {
    map: &'a SortedMap<K, V, C>,
    curr: Option<NodeId>,
}

impl<'a, K, V, C: Comparator<K>> Iterator for SortedMapIter<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.curr?;
        let map = self.map;
        let next = map.node_next(n);
        self.curr = (next != map.header).then_some(next);
        let kv = map.arena[n].kv.as_ref().expect("real node");
        Some((&kv.0, &kv.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(map: &SortedMap<i32, i32>) -> Vec<i32> {
        map.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn insert_and_iterate() {
        let mut map = SortedMap::new();
        for k in [5, 1, 4, 2, 3] {
            map.set_element(k, k * 10);
            map.assert_invariants();
        }
        assert_eq!(keys(&map), vec![1, 2, 3, 4, 5]);
        assert_eq!(map.front(), Some((&1, &10)));
        assert_eq!(map.back(), Some((&5, &50)));
        assert_eq!(map.get_element_by_key(&3), Some(&30));
        assert_eq!(map.get_element_by_key(&7), None);
    }

    #[test]
    fn overwrite_keeps_length() {
        let mut map = SortedMap::new();
        map.set_element(1, 10);
        map.set_element(1, 11);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get_element_by_key(&1), Some(&11));
    }

    #[test]
    fn erase_by_key_and_pos() {
        let mut map = SortedMap::new();
        for k in 0..10 {
            map.set_element(k, k);
        }
        assert!(map.erase_element_by_key(&5));
        assert!(!map.erase_element_by_key(&5));
        map.assert_invariants();
        assert_eq!(map.erase_element_by_pos(0), 8);
        map.assert_invariants();
        assert_eq!(keys(&map), vec![1, 2, 3, 4, 6, 7, 8, 9]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn positional_access_out_of_range_panics() {
        let map: SortedMap<i32, i32> = SortedMap::new();
        map.get_element_by_pos(0);
    }

    #[test]
    #[should_panic(expected = "iterator access denied")]
    fn stepping_past_end_panics() {
        let mut map = SortedMap::new();
        map.set_element(1, 1);
        let mut it = map.begin();
        map.next(&mut it);
        assert!(!map.is_accessible(it));
        map.next(&mut it);
    }

    #[test]
    fn bidirectional_stepping() {
        let mut map = SortedMap::new();
        for k in [1, 2, 3] {
            map.set_element(k, k);
        }
        let mut it = map.end();
        map.prev(&mut it);
        assert_eq!(map.entry_of(it), (&3, &3));
        map.prev(&mut it);
        assert_eq!(map.entry_of(it), (&2, &2));

        let mut rit = map.r_begin();
        assert_eq!(map.entry_of(rit), (&3, &3));
        map.next(&mut rit);
        assert_eq!(map.entry_of(rit), (&2, &2));
        map.next(&mut rit);
        map.next(&mut rit);
        assert!(!map.is_accessible(rit));
    }

    #[test]
    fn bounds() {
        let mut map = SortedMap::new();
        for k in [10, 20, 30] {
            map.set_element(k, k);
        }
        assert_eq!(map.entry_of(map.lower_bound(&15)).0, &20);
        assert_eq!(map.entry_of(map.lower_bound(&20)).0, &20);
        assert_eq!(map.entry_of(map.upper_bound(&20)).0, &30);
        assert!(!map.is_accessible(map.upper_bound(&30)));
        assert_eq!(map.entry_of(map.reverse_lower_bound(&25)).0, &20);
        assert_eq!(map.entry_of(map.reverse_lower_bound(&20)).0, &20);
        assert_eq!(map.entry_of(map.reverse_upper_bound(&20)).0, &10);
        assert!(!map.is_accessible(map.reverse_upper_bound(&10)));
    }

    #[test]
    fn positional_index_matches_sorted_order() {
        let mut map = SortedMap::with_index();
        for k in [50, 10, 40, 20, 30, 60, 5] {
            map.set_element(k, k);
            map.assert_invariants();
        }
        let sorted = keys(&map);
        for (i, k) in sorted.iter().enumerate() {
            assert_eq!(map.get_element_by_pos(i).0, k);
            assert_eq!(map.index_of(map.find(k)), i);
        }
        // Stays true across interleaved erases and inserts.
        map.erase_element_by_key(&40);
        map.set_element(35, 35);
        map.set_element(45, 45);
        map.erase_element_by_pos(0);
        map.assert_invariants();
        let sorted = keys(&map);
        for (i, k) in sorted.iter().enumerate() {
            assert_eq!(map.get_element_by_pos(i).0, k);
        }
    }

    #[test]
    fn erase_by_iterator_normal_direction() {
        let mut map = SortedMap::new();
        for k in [1, 2, 3, 4] {
            map.set_element(k, k);
        }
        let it = map.find(&2);
        let it = map.erase_element_by_iterator(it);
        map.assert_invariants();
        assert_eq!(map.entry_of(it).0, &3);
        assert_eq!(keys(&map), vec![1, 3, 4]);
    }

    #[test]
    fn erase_by_iterator_reverse_direction() {
        let mut map = SortedMap::new();
        for k in [1, 2, 3, 4] {
            map.set_element(k, k);
        }
        let mut rit = map.r_begin();
        map.next(&mut rit); // at 3
        let rit = map.erase_element_by_iterator(rit);
        map.assert_invariants();
        assert_eq!(map.entry_of(rit).0, &2);
        assert_eq!(keys(&map), vec![1, 2, 4]);
    }

    #[test]
    fn erase_last_element_clears() {
        let mut map = SortedMap::new();
        map.set_element(1, 1);
        assert!(map.erase_element_by_key(&1));
        assert!(map.is_empty());
        assert!(map.front().is_none());
        map.assert_invariants();
        map.set_element(2, 2);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn update_key_within_slot() {
        let mut map = SortedMap::new();
        for k in [10, 20, 30] {
            map.set_element(k, k);
        }
        let it = map.find(&20);
        assert!(map.update_key_by_iterator(it, 25));
        assert_eq!(keys(&map), vec![10, 25, 30]);
        let it = map.find(&25);
        // 5 would order below 10: rejected.
        assert!(!map.update_key_by_iterator(it, 5));
        assert_eq!(keys(&map), vec![10, 25, 30]);
    }

    #[test]
    fn union_merges() {
        let mut a: SortedMap<i32, i32> = [(1, 1), (2, 2)].into_iter().collect();
        let b: SortedMap<i32, i32> = [(2, 20), (3, 3)].into_iter().collect();
        assert_eq!(a.union(&b), 3);
        assert_eq!(keys(&a), vec![1, 2, 3]);
        assert_eq!(a.get_element_by_key(&2), Some(&20));
    }

    #[test]
    fn height_is_logarithmic() {
        let mut map = SortedMap::new();
        for k in 0..128 {
            map.set_element(k, k);
        }
        // A red-black tree of 128 nodes is at most 2*log2(129) deep.
        assert!(map.get_height() <= 14);
    }

    #[test]
    fn random_erase_pattern_keeps_invariants() {
        let mut map = SortedMap::with_index();
        for k in 0..60 {
            map.set_element(k * 7 % 61, k);
            map.assert_invariants();
        }
        for k in 0..60 {
            assert!(map.erase_element_by_key(&(k * 13 % 61)) || !map.contains(&(k * 13 % 61)));
            map.assert_invariants();
        }
    }
}
