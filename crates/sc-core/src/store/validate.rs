//! Structural self-check for the ordered store

use super::{Link, NodeId, OrderedStore};
use crate::error::{CacheError, Result};

impl<V: Copy> OrderedStore<V> {
    /// Walk the whole tree and verify parent links, cached heights, AVL
    /// balance, key order and the entry count.
    ///
    /// Meant for tests and debugging; mutations run it automatically when the
    /// `self-check` feature is enabled.
    pub fn validate(&self) -> Result<()> {
        let Some(root) = self.root else {
            if self.len != 0 {
                return Err(CacheError::CorruptTree {
                    key: 0,
                    reason: format!("empty tree reports {} entries", self.len),
                });
            }
            return Ok(());
        };
        let (_, count) = self.validate_node(root, None, None, None)?;
        if count != self.len {
            return Err(CacheError::CorruptTree {
                key: self.nodes[root].key,
                reason: format!("tree holds {} nodes but len is {}", count, self.len),
            });
        }
        Ok(())
    }

    fn validate_node(
        &self,
        id: NodeId,
        parent: Link,
        lower: Option<i64>,
        upper: Option<i64>,
    ) -> Result<(i32, usize)> {
        let node = &self.nodes[id];
        let corrupt = |reason: String| CacheError::CorruptTree { key: node.key, reason };

        if node.parent != parent {
            return Err(corrupt(format!(
                "parent link {:?} does not match {:?}",
                node.parent, parent
            )));
        }
        if lower.is_some_and(|bound| node.key <= bound) || upper.is_some_and(|bound| node.key >= bound) {
            return Err(corrupt(format!("key out of order (bounds {lower:?}..{upper:?})")));
        }

        let (left_height, left_count) = match node.left {
            Some(left) => self.validate_node(left, Some(id), lower, Some(node.key))?,
            None => (0, 0),
        };
        let (right_height, right_count) = match node.right {
            Some(right) => self.validate_node(right, Some(id), Some(node.key), upper)?,
            None => (0, 0),
        };

        if (left_height - right_height).abs() > 1 {
            return Err(corrupt(format!(
                "unbalanced: left height {left_height}, right height {right_height}"
            )));
        }
        let height = 1 + left_height.max(right_height);
        if node.height != height {
            return Err(corrupt(format!(
                "stored height {} but subtree height is {}",
                node.height, height
            )));
        }
        Ok((height, left_count + right_count + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_broken_height() {
        let mut store = OrderedStore::new();
        for key in 0..8 {
            store.put(key, key);
        }
        assert!(store.validate().is_ok());

        let root = store.root.unwrap();
        store.nodes[root].height += 3;
        match store.validate() {
            Err(CacheError::CorruptTree { key, .. }) => assert_eq!(key, store.nodes[root].key),
            other => panic!("expected corruption, got {other:?}"),
        }
    }

    #[test]
    fn detects_wrong_parent() {
        let mut store = OrderedStore::new();
        for key in 0..3 {
            store.put(key, key);
        }
        let root = store.root.unwrap();
        let left = store.nodes[root].left.unwrap();
        store.nodes[left].parent = None;
        assert!(matches!(store.validate(), Err(CacheError::CorruptTree { key: 0, .. })));
    }
}
