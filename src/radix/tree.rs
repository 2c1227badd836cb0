//! Prefix-compressed radix tree engine and its two façades.
//!
//! Each node owns a key slice; a child is located by binary-searching the
//! parent's sibling tree on the child key's first byte, then consuming
//! the child's whole slice. Insertion splits nodes to keep prefixes
//! maximally compressed; deletion prunes empty nodes upward but does not
//! re-merge single-child parents (a deliberate design note, not an
//! oversight: merging would require re-joining edge buffers on every
//! delete for a rare shape win).

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::arena::{NodeArena, NodeId};
use crate::bst;
use crate::keys::VectorKey;
use crate::node::LinkNode;
use crate::print::{print_tree, PrintChild};
use crate::radix::node::TrieNode;
use crate::radix::slice::{common_prefix_len, ByteSlice};

type Arena<V> = NodeArena<TrieNode<V>>;

/// Locate `node`'s child whose key starts with `byte`.
fn seek_child<V>(arena: &Arena<V>, node: NodeId, byte: u8) -> Option<NodeId> {
    let child = bst::find_or_next_lower_by(arena, arena[node].children, |n: &TrieNode<V>| {
        match n.key.first_byte() {
            Some(b) => byte.cmp(&b),
            // Sibling keys are never empty; descend right past a
            // malformed entry rather than looping.
            None => Ordering::Greater,
        }
    })?;
    // The floor search may land on a smaller first byte; only an exact
    // match counts.
    (arena[child].key.first_byte() == Some(byte)).then_some(child)
}

/// Insert `path` below `root`. Returns the number of keys added: 1 when a
/// new key started holding a value, 0 when an existing value was merely
/// overwritten.
fn insert<V>(arena: &mut Arena<V>, root: NodeId, path: &[u8], value: V) -> usize {
    if path.is_empty() {
        return usize::from(arena[root].value.replace(value).is_none());
    }
    let mut k = ByteSlice::from_slice(path);
    let mut curr = root;
    'main: loop {
        let Some(children_root) = arena[curr].children else {
            let node = arena.insert(TrieNode::new(k, Some(value)));
            arena[curr].children = Some(node);
            return 1;
        };
        let first_byte = k.first_byte().expect("remaining key is never empty here");
        let mut child = Some(children_root);
        let mut prev_child = children_root;
        let mut went_left = false;
        while let Some(c) = child {
            prev_child = c;
            let child_first = arena[c].key.first_byte();
            if child_first == Some(first_byte) {
                let common = common_prefix_len(arena[c].key.as_bytes(), k.as_bytes());
                let child_contained = common == arena[c].key.len();
                let k_contained = common == k.len();
                if child_contained && k_contained {
                    // Exact key: store the value on the existing node.
                    return usize::from(arena[c].value.replace(value).is_none());
                }
                if child_contained {
                    // The child's edge is a prefix of the key: descend
                    // with the remainder.
                    k = k.substring(common);
                    curr = c;
                    continue 'main;
                }
                if k_contained {
                    // The key is a proper prefix of the child's edge:
                    // demote the edge tail into a new node and take the
                    // prefix node for ourselves.
                    let demoted = demote_tail(arena, c, common);
                    arena[c].value = Some(value);
                    arena[c].children = Some(demoted);
                    return 1;
                }
                debug_assert!(common > 0, "matching first byte implies a shared prefix");
                // Partial overlap: split at the common prefix into a
                // value-less intermediate, then insert the remainder as
                // its second child.
                let demoted = demote_tail(arena, c, common);
                arena[c].value = None;
                arena[c].children = Some(demoted);
                k = k.substring(common);
                curr = c;
                continue 'main;
            }
            went_left = child_first > Some(first_byte);
            child = if went_left { arena[c].l() } else { arena[c].r() };
        }
        // No sibling shares the first byte: link a new one in sorted
        // position.
        let node = arena.insert(TrieNode::new(k, Some(value)));
        if went_left {
            bst::insert_left(arena, node, prev_child);
        } else {
            bst::insert_right(arena, node, prev_child);
        }
        return 1;
    }
}

/// Split `c` at `common`: move its edge tail, value and children into a
/// fresh node and shrink `c`'s edge to the shared prefix. Returns the
/// demoted node, which the caller must link as `c`'s sole child.
fn demote_tail<V>(arena: &mut Arena<V>, c: NodeId, common: usize) -> NodeId {
    let tail = arena[c].key.substring(common);
    let value = arena[c].value.take();
    let children = arena[c].children.take();
    let mut demoted = TrieNode::new(tail, value);
    demoted.children = children;
    let demoted_id = arena.insert(demoted);
    let prefix = arena[c].key.prefix(common);
    arena[c].key = prefix;
    demoted_id
}

/// Find the node matching `key` exactly: every edge on the path,
/// including the last, must be consumed in full. A key that ends mid-edge
/// or diverges is not found.
fn find_node<V>(arena: &Arena<V>, root: NodeId, key: &[u8]) -> Option<NodeId> {
    if key.is_empty() {
        return Some(root);
    }
    let mut node = root;
    let mut offset = 0;
    loop {
        let remaining = &key[offset..];
        let child = seek_child(arena, node, remaining[0])?;
        let common = common_prefix_len(arena[child].key.as_bytes(), remaining);
        if common < arena[child].key.len() {
            return None;
        }
        offset += common;
        if offset == key.len() {
            return Some(child);
        }
        node = child;
    }
}

/// Like [`find_node`], also collecting the ancestor chain (starting at
/// `root`) for the prune-up pass of deletion.
fn find_with_parents<V>(arena: &Arena<V>, root: NodeId, key: &[u8]) -> Option<Vec<NodeId>> {
    if key.is_empty() {
        return None;
    }
    let mut list = vec![root];
    let mut node = root;
    let mut offset = 0;
    loop {
        let remaining = &key[offset..];
        let child = seek_child(arena, node, remaining[0])?;
        let common = common_prefix_len(arena[child].key.as_bytes(), remaining);
        if common < arena[child].key.len() {
            return None;
        }
        offset += common;
        list.push(child);
        if offset == key.len() {
            return Some(list);
        }
        node = child;
    }
}

/// Clear the value stored at `key`, then walk back up removing nodes that
/// hold neither a value nor children. Returns whether a value was
/// removed.
fn remove<V>(arena: &mut Arena<V>, root: NodeId, key: &[u8]) -> bool {
    if key.is_empty() {
        return arena[root].value.take().is_some();
    }
    let Some(list) = find_with_parents(arena, root, key) else {
        return false;
    };
    let last = *list.last().expect("list contains at least the root");
    let deleted = arena[last].value.take().is_some();
    for i in (1..list.len()).rev() {
        let child = list[i];
        let parent = list[i - 1];
        if arena[child].value.is_some() || arena[child].children.is_some() {
            break;
        }
        let siblings = arena[parent].children;
        arena[parent].children = bst::remove(arena, siblings, child);
        arena.remove(child);
    }
    deleted
}

/// Flatten the subtree into `record`, keyed by the concatenated edge
/// bytes. Debug/testing aid.
fn to_record<V: Clone>(
    arena: &Arena<V>,
    node: NodeId,
    prefix: &mut Vec<u8>,
    record: &mut BTreeMap<Vec<u8>, V>,
) {
    let key_len = arena[node].key.len();
    let bytes = arena[node].key.to_vec();
    prefix.extend_from_slice(&bytes);
    if let Some(v) = &arena[node].value {
        record.insert(prefix.clone(), v.clone());
    }
    let mut child = bst::first(arena, arena[node].children);
    while let Some(c) = child {
        to_record(arena, c, prefix, record);
        child = bst::next(arena, c);
    }
    prefix.truncate(prefix.len() - key_len);
}

fn dump<V: Debug>(arena: &Arena<V>, node: NodeId, tab: &str) -> String {
    let head = match &arena[node].value {
        Some(v) => format!("{:?} = {:?}", arena[node].key.as_bytes(), v),
        None => format!("{:?}", arena[node].key.as_bytes()),
    };
    let mut children: Vec<Option<PrintChild<'_>>> = Vec::new();
    let mut child = bst::first(arena, arena[node].children);
    while let Some(c) = child {
        children.push(Some(
            Box::new(move |tab: &str| dump(arena, c, tab)) as PrintChild<'_>
        ));
        child = bst::next(arena, c);
    }
    head + &print_tree(tab, &children)
}

fn check_subtree<V>(arena: &Arena<V>, node: NodeId, is_root: bool) -> usize {
    if !is_root {
        assert!(!arena[node].key.is_empty(), "non-root node with empty edge");
        assert!(
            arena[node].value.is_some() || arena[node].children.is_some(),
            "value-less leaf survived deletion pruning"
        );
    }
    let mut count = usize::from(arena[node].value.is_some());
    if let Some(children_root) = arena[node].children {
        assert!(arena[children_root].p().is_none(), "sibling-tree root has a parent");
        bst::assert_links(arena, children_root);
        let mut prev_byte: Option<u8> = None;
        let mut child = bst::first(arena, Some(children_root));
        while let Some(c) = child {
            let byte = arena[c].key.first_byte();
            assert!(byte.is_some(), "sibling with empty key");
            assert!(prev_byte < byte, "sibling first bytes not strictly increasing");
            prev_byte = byte;
            count += check_subtree(arena, c, false);
            child = bst::next(arena, c);
        }
    }
    count
}

/// Radix tree over raw byte keys.
///
/// Keys arrive as anything convertible to [`VectorKey`]: byte slices,
/// strings, or integers through their order-preserving big-endian form.
///
/// ```
/// let mut tree = arbor::BinaryRadixTree::new();
/// tree.set("GET /users", 1);
/// tree.set("GET /posts", 2);
/// assert_eq!(tree.get("GET /users"), Some(&1));
/// assert_eq!(tree.get("GET /"), None); // prefix of stored keys, never set
/// assert!(tree.del("GET /posts"));
/// assert_eq!(tree.len(), 1);
/// ```
pub struct BinaryRadixTree<V> {
    arena: Arena<V>,
    root: NodeId,
    size: usize,
}

impl<V> BinaryRadixTree<V> {
    pub fn new() -> Self {
        let mut arena = NodeArena::new();
        let root = arena.insert(TrieNode::new(ByteSlice::empty(), None));
        Self {
            arena,
            root,
            size: 0,
        }
    }

    /// Insert or overwrite. The empty key addresses the root node.
    pub fn set<K: Into<VectorKey>>(&mut self, key: K, value: V) {
        self.set_k(key.into().as_slice(), value)
    }

    /// Insert or overwrite, direct byte-slice version.
    pub fn set_k(&mut self, key: &[u8], value: V) {
        self.size += insert(&mut self.arena, self.root, key, value);
    }

    pub fn get<K: Into<VectorKey>>(&self, key: K) -> Option<&V> {
        self.get_k(key.into().as_slice())
    }

    pub fn get_k(&self, key: &[u8]) -> Option<&V> {
        let node = find_node(&self.arena, self.root, key)?;
        self.arena[node].value.as_ref()
    }

    pub fn has<K: Into<VectorKey>>(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    /// Remove `key`. Returns whether a value was removed; nodes left
    /// value-less and child-less are pruned from their sibling trees.
    pub fn del<K: Into<VectorKey>>(&mut self, key: K) -> bool {
        self.del_k(key.into().as_slice())
    }

    pub fn del_k(&mut self, key: &[u8]) -> bool {
        let removed = remove(&mut self.arena, self.root, key);
        if removed {
            self.size -= 1;
        }
        removed
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Flat key → value mapping of the whole tree, for inspection and
    /// tests.
    pub fn to_record(&self) -> BTreeMap<Vec<u8>, V>
    where
        V: Clone,
    {
        let mut record = BTreeMap::new();
        let mut prefix = Vec::new();
        to_record(&self.arena, self.root, &mut prefix, &mut record);
        record
    }

    /// Structural dump as an ASCII tree diagram. Debug aid only.
    pub fn to_debug_string(&self, tab: &str) -> String
    where
        V: Debug,
    {
        let arena = &self.arena;
        let root = self.root;
        "BinaryRadixTree".to_string()
            + &print_tree(
                tab,
                &[Some(Box::new(move |tab: &str| dump(arena, root, tab)) as PrintChild<'_>)],
            )
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let count = check_subtree(&self.arena, self.root, true);
        assert_eq!(count, self.size, "size counter out of sync");
    }
}

impl<V> Default for BinaryRadixTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Radix tree with a string-key surface over the byte engine.
///
/// ```
/// let mut tree = arbor::RadixTree::new();
/// tree.set("/api/users", "users-handler");
/// tree.set("/api/posts", "posts-handler");
/// assert_eq!(tree.get("/api/users"), Some(&"users-handler"));
/// assert_eq!(tree.len(), 2);
/// ```
pub struct RadixTree<V> {
    inner: BinaryRadixTree<V>,
}

impl<V> RadixTree<V> {
    pub fn new() -> Self {
        Self {
            inner: BinaryRadixTree::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: V) {
        self.inner.set_k(key.as_bytes(), value)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.inner.get_k(key.as_bytes())
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn del(&mut self, key: &str) -> bool {
        self.inner.del_k(key.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Flat key → value mapping; edge bytes are decoded lossily for
    /// display.
    pub fn to_record(&self) -> BTreeMap<String, V>
    where
        V: Clone,
    {
        self.inner
            .to_record()
            .into_iter()
            .map(|(k, v)| (String::from_utf8_lossy(&k).into_owned(), v))
            .collect()
    }

    pub fn to_debug_string(&self, tab: &str) -> String
    where
        V: Debug,
    {
        self.inner.to_debug_string(tab)
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        self.inner.assert_invariants()
    }
}

impl<V> Default for RadixTree<V> {
    fn default() -> Self {
        Self::new()
    }
}
