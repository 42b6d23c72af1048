//! Ordered key/value store backing every series
//!
//! An AVL tree kept in an index arena with parent links. Besides point
//! inserts and lookups it supports bulk trims (`remove_below`/`remove_above`)
//! that split the tree along one search path instead of deleting keys one by
//! one, and a single-node cursor that turns ascending `get_next` chains into
//! constant-time successor steps.

use std::cell::Cell;
use std::cmp::Ordering;

use crate::range::Range;

mod validate;

type NodeId = usize;
type Link = Option<NodeId>;

#[derive(Debug, Clone)]
struct Node<V> {
    key: i64,
    value: V,
    left: Link,
    right: Link,
    parent: Link,
    height: i32,
}

/// Balanced ordered map from `i64` keys to fixed-width values.
///
/// Not `Sync`: the cursor is updated through shared references, so a store
/// must stay on the thread that owns it.
#[derive(Debug, Clone)]
pub struct OrderedStore<V: Copy = i64> {
    nodes: Vec<Node<V>>,
    free: Vec<NodeId>,
    root: Link,
    len: usize,
    /// Node resolved by the last lookup.
    cursor: Cell<Link>,
    cursor_enabled: bool,
    #[cfg(test)]
    probes: Cell<usize>,
}

impl<V: Copy> OrderedStore<V> {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            len: 0,
            cursor: Cell::new(None),
            cursor_enabled: true,
            #[cfg(test)]
            probes: Cell::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the tree, 0 when empty.
    pub fn height(&self) -> usize {
        self.height_of(self.root) as usize
    }

    /// Turn the lookup cursor on or off. Results never depend on it.
    pub fn set_cursor_cache(&mut self, enabled: bool) {
        self.cursor_enabled = enabled;
        self.cursor.set(None);
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = None;
        self.len = 0;
        self.cursor.set(None);
    }

    pub fn get(&self, key: i64) -> Option<V> {
        let id = self.find(key)?;
        self.touch(id);
        Some(self.nodes[id].value)
    }

    pub fn contains_key(&self, key: i64) -> bool {
        self.find(key).is_some()
    }

    /// Smallest stored key strictly greater than `key`.
    pub fn get_next(&self, key: i64) -> Option<i64> {
        self.next_entry(key).map(|(key, _)| key)
    }

    /// Largest stored key strictly smaller than `key`.
    pub fn get_previous(&self, key: i64) -> Option<i64> {
        self.previous_entry(key).map(|(key, _)| key)
    }

    /// Like [`get_next`](Self::get_next) but also returns the value.
    pub fn next_entry(&self, key: i64) -> Option<(i64, V)> {
        let next = match self.cached(key) {
            Some(id) => self.successor(id),
            None => self.search_after(key),
        }?;
        self.touch(next);
        Some(self.entry(next))
    }

    /// Like [`get_previous`](Self::get_previous) but also returns the value.
    pub fn previous_entry(&self, key: i64) -> Option<(i64, V)> {
        let previous = match self.cached(key) {
            Some(id) => self.predecessor(id),
            None => self.search_before(key),
        }?;
        self.touch(previous);
        Some(self.entry(previous))
    }

    pub fn first(&self) -> Option<(i64, V)> {
        self.root.map(|id| self.entry(self.leftmost(id)))
    }

    pub fn last(&self) -> Option<(i64, V)> {
        self.root.map(|id| self.entry(self.rightmost(id)))
    }

    /// Insert or overwrite. Returns the previous value for `key`, if any.
    ///
    /// Overwriting never changes the shape of the tree.
    pub fn put(&mut self, key: i64, value: V) -> Option<V> {
        let mut parent = None;
        let mut went_left = false;
        let mut link = self.root;
        while let Some(id) = link {
            let node = &mut self.nodes[id];
            match key.cmp(&node.key) {
                Ordering::Equal => {
                    let previous = std::mem::replace(&mut node.value, value);
                    self.touch(id);
                    return Some(previous);
                }
                Ordering::Less => {
                    went_left = true;
                    link = node.left;
                }
                Ordering::Greater => {
                    went_left = false;
                    link = node.right;
                }
            }
            parent = Some(id);
        }

        let id = self.alloc(key, value, parent);
        self.len += 1;
        match parent {
            None => self.root = Some(id),
            Some(p) => {
                if went_left {
                    self.nodes[p].left = Some(id);
                } else {
                    self.nodes[p].right = Some(id);
                }
                let top = self.retrace(p);
                self.root = Some(top);
            }
        }
        self.touch(id);
        self.check();
        None
    }

    /// Drop every key strictly below `key`. Returns how many were removed.
    pub fn remove_below(&mut self, key: i64) -> usize {
        let before = self.len;
        let root = self.root.take();
        self.root = self.trim_below(root, key);
        self.finish_trim();
        before - self.len
    }

    /// Drop every key strictly above `key`. Returns how many were removed.
    pub fn remove_above(&mut self, key: i64) -> usize {
        let before = self.len;
        let root = self.root.take();
        self.root = self.trim_above(root, key);
        self.finish_trim();
        before - self.len
    }

    /// Keep only keys inside `range`. An empty range clears the store.
    pub fn retain_range(&mut self, range: Range) -> usize {
        if range.is_empty() {
            let removed = self.len;
            self.clear();
            return removed;
        }
        self.remove_below(range.start) + self.remove_above(range.end)
    }

    /// All entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            store: self,
            next: self.root.map(|id| self.leftmost(id)),
            end: i64::MAX,
        }
    }

    /// Stored keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = i64> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Entries whose key lies in `range`, ascending.
    pub fn range(&self, range: Range) -> Iter<'_, V> {
        let next = if range.is_empty() {
            None
        } else {
            self.search_from(range.start)
        };
        Iter {
            store: self,
            next,
            end: range.end,
        }
    }

    fn entry(&self, id: NodeId) -> (i64, V) {
        let node = &self.nodes[id];
        (node.key, node.value)
    }

    fn height_of(&self, link: Link) -> i32 {
        link.map_or(0, |id| self.nodes[id].height)
    }

    fn touch(&self, id: NodeId) {
        if self.cursor_enabled {
            self.cursor.set(Some(id));
        }
    }

    fn cached(&self, key: i64) -> Link {
        if !self.cursor_enabled {
            return None;
        }
        self.cursor.get().filter(|id| self.nodes[*id].key == key)
    }

    fn find(&self, key: i64) -> Link {
        let mut link = self.root;
        while let Some(id) = link {
            #[cfg(test)]
            self.probes.set(self.probes.get() + 1);
            let node = &self.nodes[id];
            link = match key.cmp(&node.key) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(id),
            };
        }
        None
    }

    fn search_after(&self, key: i64) -> Link {
        let mut found = None;
        let mut link = self.root;
        while let Some(id) = link {
            let node = &self.nodes[id];
            if node.key > key {
                found = Some(id);
                link = node.left;
            } else {
                link = node.right;
            }
        }
        found
    }

    fn search_from(&self, key: i64) -> Link {
        let mut found = None;
        let mut link = self.root;
        while let Some(id) = link {
            let node = &self.nodes[id];
            if node.key >= key {
                found = Some(id);
                link = node.left;
            } else {
                link = node.right;
            }
        }
        found
    }

    fn search_before(&self, key: i64) -> Link {
        let mut found = None;
        let mut link = self.root;
        while let Some(id) = link {
            let node = &self.nodes[id];
            if node.key < key {
                found = Some(id);
                link = node.right;
            } else {
                link = node.left;
            }
        }
        found
    }

    fn leftmost(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.nodes[id].left {
            id = left;
        }
        id
    }

    fn rightmost(&self, mut id: NodeId) -> NodeId {
        while let Some(right) = self.nodes[id].right {
            id = right;
        }
        id
    }

    fn successor(&self, id: NodeId) -> Link {
        if let Some(right) = self.nodes[id].right {
            return Some(self.leftmost(right));
        }
        let mut child = id;
        let mut parent = self.nodes[id].parent;
        while let Some(p) = parent {
            if self.nodes[p].left == Some(child) {
                return Some(p);
            }
            child = p;
            parent = self.nodes[p].parent;
        }
        None
    }

    fn predecessor(&self, id: NodeId) -> Link {
        if let Some(left) = self.nodes[id].left {
            return Some(self.rightmost(left));
        }
        let mut child = id;
        let mut parent = self.nodes[id].parent;
        while let Some(p) = parent {
            if self.nodes[p].right == Some(child) {
                return Some(p);
            }
            child = p;
            parent = self.nodes[p].parent;
        }
        None
    }

    fn alloc(&mut self, key: i64, value: V, parent: Link) -> NodeId {
        let node = Node {
            key,
            value,
            left: None,
            right: None,
            parent,
            height: 1,
        };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    /// Return a whole subtree to the free list.
    fn release(&mut self, link: Link) {
        let mut stack: Vec<NodeId> = link.into_iter().collect();
        while let Some(id) = stack.pop() {
            stack.extend(self.nodes[id].left);
            stack.extend(self.nodes[id].right);
            self.release_node(id);
        }
    }

    fn release_node(&mut self, id: NodeId) {
        let node = &mut self.nodes[id];
        node.left = None;
        node.right = None;
        node.parent = None;
        self.free.push(id);
        self.len -= 1;
    }

    fn finish_trim(&mut self) {
        if let Some(root) = self.root {
            self.nodes[root].parent = None;
        }
        self.cursor.set(None);
        if self.len == 0 {
            self.clear();
        }
        self.check();
    }

    /// Detach both children, leaving them as standalone subtrees.
    fn detach_children(&mut self, id: NodeId) -> (Link, Link) {
        let left = self.nodes[id].left.take();
        let right = self.nodes[id].right.take();
        for child in left.into_iter().chain(right) {
            self.nodes[child].parent = None;
        }
        (left, right)
    }

    fn trim_below(&mut self, link: Link, key: i64) -> Link {
        let id = link?;
        let (left, right) = self.detach_children(id);
        if self.nodes[id].key < key {
            self.release(left);
            self.release_node(id);
            self.trim_below(right, key)
        } else {
            let left = self.trim_below(left, key);
            Some(self.join(left, id, right))
        }
    }

    fn trim_above(&mut self, link: Link, key: i64) -> Link {
        let id = link?;
        let (left, right) = self.detach_children(id);
        if self.nodes[id].key > key {
            self.release(right);
            self.release_node(id);
            self.trim_above(left, key)
        } else {
            let right = self.trim_above(right, key);
            Some(self.join(left, id, right))
        }
    }

    /// Join two standalone subtrees around `mid`, where every key of `left`
    /// is below `mid` and every key of `right` above it. Returns the new
    /// subtree root, which has no parent.
    fn join(&mut self, left: Link, mid: NodeId, right: Link) -> NodeId {
        let (hl, hr) = (self.height_of(left), self.height_of(right));
        if hl > hr + 1 {
            let mut parent = None;
            let mut spine = left;
            while self.height_of(spine) > hr + 1 {
                parent = spine;
                spine = spine.and_then(|id| self.nodes[id].right);
            }
            self.attach(mid, spine, right);
            if let Some(p) = parent {
                self.nodes[p].right = Some(mid);
                self.nodes[mid].parent = Some(p);
                return self.retrace(p);
            }
        } else if hr > hl + 1 {
            let mut parent = None;
            let mut spine = right;
            while self.height_of(spine) > hl + 1 {
                parent = spine;
                spine = spine.and_then(|id| self.nodes[id].left);
            }
            self.attach(mid, left, spine);
            if let Some(p) = parent {
                self.nodes[p].left = Some(mid);
                self.nodes[mid].parent = Some(p);
                return self.retrace(p);
            }
        } else {
            self.attach(mid, left, right);
        }
        self.nodes[mid].parent = None;
        mid
    }

    fn attach(&mut self, mid: NodeId, left: Link, right: Link) {
        self.nodes[mid].left = left;
        self.nodes[mid].right = right;
        for child in left.into_iter().chain(right) {
            self.nodes[child].parent = Some(mid);
        }
        self.update_height(mid);
    }

    /// Rebalance from `from` up to the top of its tree and return the top.
    fn retrace(&mut self, from: NodeId) -> NodeId {
        let mut id = from;
        loop {
            id = self.rebalance(id);
            match self.nodes[id].parent {
                Some(parent) => id = parent,
                None => return id,
            }
        }
    }

    /// Restore the balance of one node whose children differ by at most 2.
    /// Returns the node now occupying its position.
    fn rebalance(&mut self, id: NodeId) -> NodeId {
        let (left, right) = (self.nodes[id].left, self.nodes[id].right);
        let balance = self.height_of(left) - self.height_of(right);
        match (left, right) {
            (Some(l), _) if balance > 1 => {
                // left-right case needs the inner rotation first
                if self.height_of(self.nodes[l].left) < self.height_of(self.nodes[l].right) {
                    self.rotate_left(l);
                }
                self.rotate_right(id)
            }
            (_, Some(r)) if balance < -1 => {
                if self.height_of(self.nodes[r].right) < self.height_of(self.nodes[r].left) {
                    self.rotate_right(r);
                }
                self.rotate_left(id)
            }
            _ => {
                self.update_height(id);
                id
            }
        }
    }

    fn rotate_left(&mut self, x: NodeId) -> NodeId {
        let Some(y) = self.nodes[x].right else {
            return x;
        };
        let inner = self.nodes[y].left;
        let parent = self.nodes[x].parent;
        self.nodes[x].right = inner;
        if let Some(c) = inner {
            self.nodes[c].parent = Some(x);
        }
        self.nodes[y].left = Some(x);
        self.nodes[x].parent = Some(y);
        self.nodes[y].parent = parent;
        self.replace_child(parent, x, y);
        self.update_height(x);
        self.update_height(y);
        y
    }

    fn rotate_right(&mut self, x: NodeId) -> NodeId {
        let Some(y) = self.nodes[x].left else {
            return x;
        };
        let inner = self.nodes[y].right;
        let parent = self.nodes[x].parent;
        self.nodes[x].left = inner;
        if let Some(c) = inner {
            self.nodes[c].parent = Some(x);
        }
        self.nodes[y].right = Some(x);
        self.nodes[x].parent = Some(y);
        self.nodes[y].parent = parent;
        self.replace_child(parent, x, y);
        self.update_height(x);
        self.update_height(y);
        y
    }

    fn replace_child(&mut self, parent: Link, old: NodeId, new: NodeId) {
        if let Some(p) = parent {
            let node = &mut self.nodes[p];
            if node.left == Some(old) {
                node.left = Some(new);
            } else {
                node.right = Some(new);
            }
        }
    }

    fn update_height(&mut self, id: NodeId) {
        let height = 1 + self
            .height_of(self.nodes[id].left)
            .max(self.height_of(self.nodes[id].right));
        self.nodes[id].height = height;
    }

    #[cfg(any(test, feature = "self-check"))]
    fn check(&self) {
        if let Err(err) = self.validate() {
            panic!("ordered store corrupted: {err}");
        }
    }

    #[cfg(not(any(test, feature = "self-check")))]
    fn check(&self) {}
}

impl<V: Copy> Default for OrderedStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Ascending iterator over store entries.
pub struct Iter<'a, V: Copy> {
    store: &'a OrderedStore<V>,
    next: Link,
    end: i64,
}

impl<V: Copy> Iterator for Iter<'_, V> {
    type Item = (i64, V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let (key, value) = self.store.entry(id);
        if key > self.end {
            self.next = None;
            return None;
        }
        self.next = self.store.successor(id);
        Some((key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeMap;

    fn assert_matches(store: &OrderedStore<i64>, oracle: &BTreeMap<i64, i64>) {
        let stored: Vec<_> = store.iter().collect();
        let expected: Vec<_> = oracle.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(stored, expected);
        assert_eq!(store.len(), oracle.len());
    }

    #[test]
    fn empty_store_answers_none() {
        let store: OrderedStore = OrderedStore::new();
        assert_eq!(store.get(1), None);
        assert_eq!(store.get_next(1), None);
        assert_eq!(store.get_previous(1), None);
        assert_eq!(store.first(), None);
        assert_eq!(store.height(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn overwrite_keeps_shape() {
        let mut store = OrderedStore::new();
        for key in 0..20 {
            store.put(key, key * 10);
        }
        let height = store.height();
        assert_eq!(store.put(7, -1), Some(70));
        assert_eq!(store.get(7), Some(-1));
        assert_eq!(store.len(), 20);
        assert_eq!(store.height(), height);
    }

    #[test]
    fn ascending_inserts_stay_logarithmic() {
        let mut store = OrderedStore::new();
        for key in 1..=1000 {
            store.put(key, key * 2);
        }
        // AVL bound: ceil(1.44 * log2(n + 2))
        let bound = (1.44 * (1002f64).log2()).ceil() as usize;
        assert!(store.height() <= bound, "height {} > {}", store.height(), bound);

        store.probes.set(0);
        assert_eq!(store.get(500), Some(1000));
        assert!(store.probes.get() <= store.height());
    }

    #[test]
    fn neighbours_skip_missing_keys() {
        let mut store = OrderedStore::new();
        for key in [10, 20, 30, 40] {
            store.put(key, key);
        }
        assert_eq!(store.get_next(10), Some(20));
        assert_eq!(store.get_next(15), Some(20));
        assert_eq!(store.get_next(40), None);
        assert_eq!(store.get_previous(10), None);
        assert_eq!(store.get_previous(35), Some(30));
        assert_eq!(store.get_previous(i64::MAX), Some(40));
        assert_eq!(store.first(), Some((10, 10)));
        assert_eq!(store.last(), Some((40, 40)));
    }

    #[test]
    fn range_iterates_inclusive_bounds() {
        let mut store = OrderedStore::new();
        for key in 0..50 {
            store.put(key * 2, key);
        }
        let keys: Vec<_> = store.range(Range::new(9, 16)).map(|(k, _)| k).collect();
        assert_eq!(keys, vec![10, 12, 14, 16]);
        assert_eq!(store.range(Range::EMPTY).count(), 0);
        assert_eq!(store.range(Range::new(200, 300)).count(), 0);
    }

    #[test]
    fn trims_remove_strictly_outside() {
        let mut store = OrderedStore::new();
        for key in -50..=50 {
            store.put(key, key);
        }
        assert_eq!(store.remove_below(-10), 40);
        assert_eq!(store.remove_above(10), 40);
        assert_eq!(store.keys().collect::<Vec<_>>(), (-10..=10).collect::<Vec<_>>());
        assert_eq!(store.remove_below(i64::MIN), 0);
        assert_eq!(store.remove_above(-100), 21);
        assert!(store.is_empty());
        store.put(3, 3);
        assert_eq!(store.get(3), Some(3));
    }

    #[test]
    fn random_operations_match_oracle() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..40 {
            let mut store = OrderedStore::new();
            let mut oracle = BTreeMap::new();
            for _ in 0..400 {
                match rng.gen_range(0..20) {
                    0 => {
                        let key = rng.gen_range(-600..600);
                        store.remove_below(key);
                        oracle.retain(|k, _| *k >= key);
                    }
                    1 => {
                        let key = rng.gen_range(-600..600);
                        store.remove_above(key);
                        oracle.retain(|k, _| *k <= key);
                    }
                    _ => {
                        let key = rng.gen_range(-500..500);
                        let value = rng.gen();
                        assert_eq!(store.put(key, value), oracle.insert(key, value));
                    }
                }
                assert_matches(&store, &oracle);
            }
        }
    }

    #[test]
    fn trim_equals_single_deletions() {
        let mut rng = StdRng::seed_from_u64(7);
        for size in [1usize, 2, 3, 10, 64, 257] {
            let mut store = OrderedStore::new();
            let mut oracle = BTreeMap::new();
            while oracle.len() < size {
                let key = rng.gen_range(-10_000..10_000);
                store.put(key, key ^ 0x55);
                oracle.insert(key, key ^ 0x55);
            }
            let keys: Vec<i64> = oracle.keys().copied().collect();
            for pivot in keys.iter().copied().chain([i64::MIN, i64::MAX, 0]) {
                let mut below = store.clone();
                below.remove_below(pivot);
                let mut expected = oracle.clone();
                for key in &keys {
                    if *key < pivot {
                        expected.remove(key);
                    }
                }
                assert_matches(&below, &expected);

                let mut above = store.clone();
                above.remove_above(pivot);
                let mut expected = oracle.clone();
                for key in &keys {
                    if *key > pivot {
                        expected.remove(key);
                    }
                }
                assert_matches(&above, &expected);
            }
        }
    }

    #[test]
    fn cursor_never_changes_answers() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut cached = OrderedStore::new();
        let mut plain = OrderedStore::new();
        plain.set_cursor_cache(false);
        for _ in 0..300 {
            let key = rng.gen_range(-1000..1000);
            cached.put(key, key);
            plain.put(key, key);
        }

        let mut key = i64::MIN;
        while let Some(next) = cached.get_next(key) {
            assert_eq!(plain.get_next(key), Some(next));
            key = next;
        }
        assert_eq!(plain.get_next(key), None);

        let mut last = 0;
        for step in 0..2000 {
            if step % 50 == 0 {
                let cut = rng.gen_range(-1000..1000);
                if rng.gen() {
                    cached.remove_below(cut);
                    plain.remove_below(cut);
                } else {
                    cached.remove_above(cut);
                    plain.remove_above(cut);
                }
            }
            let probe = if rng.gen_bool(0.7) { last } else { rng.gen_range(-1100..1100) };
            let (a, b) = if rng.gen() {
                (cached.get_next(probe), plain.get_next(probe))
            } else {
                (cached.get_previous(probe), plain.get_previous(probe))
            };
            assert_eq!(a, b);
            last = a.unwrap_or(probe);
        }
    }
}
