//! store/node — in-memory дерево бакетов, восстановленное из журнала.
//!
//! Каждый бакет хранит дочерние элементы в BTreeMap, поэтому перечисление
//! всегда идёт в порядке возрастания байтов имени/ключа.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Bucket(BucketNode),
    Value(Vec<u8>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketNode {
    pub(crate) children: BTreeMap<Vec<u8>, Node>,
}

impl BucketNode {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn child(&self, name: &[u8]) -> Option<&Node> {
        self.children.get(name)
    }

    #[inline]
    pub fn sub_bucket(&self, name: &[u8]) -> Option<&BucketNode> {
        match self.children.get(name) {
            Some(Node::Bucket(b)) => Some(b),
            _ => None,
        }
    }

    #[inline]
    pub fn sub_bucket_mut(&mut self, name: &[u8]) -> Option<&mut BucketNode> {
        match self.children.get_mut(name) {
            Some(Node::Bucket(b)) => Some(b),
            _ => None,
        }
    }

    /// Пройти путь от этого бакета вниз. Пустой путь — сам бакет.
    pub fn walk<N: AsRef<[u8]>>(&self, path: &[N]) -> Option<&BucketNode> {
        let mut cur = self;
        for name in path {
            cur = cur.sub_bucket(name.as_ref())?;
        }
        Some(cur)
    }

    pub fn walk_mut<N: AsRef<[u8]>>(&mut self, path: &[N]) -> Option<&mut BucketNode> {
        let mut cur = self;
        for name in path {
            cur = cur.sub_bucket_mut(name.as_ref())?;
        }
        Some(cur)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Подсчёт (бакеты, ключи) во всём поддереве, без рекурсии.
    pub fn count_recursive(&self) -> (u64, u64) {
        let mut buckets = 0u64;
        let mut keys = 0u64;
        let mut stack: Vec<&BucketNode> = vec![self];
        while let Some(b) = stack.pop() {
            for node in b.children.values() {
                match node {
                    Node::Bucket(sub) => {
                        buckets += 1;
                        stack.push(sub);
                    }
                    Node::Value(_) => keys += 1,
                }
            }
        }
        (buckets, keys)
    }
}

// Разбор поддерева без рекурсии.
impl Drop for BucketNode {
    fn drop(&mut self) {
        let mut pending = vec![std::mem::take(&mut self.children)];
        while let Some(children) = pending.pop() {
            for (_, node) in children {
                if let Node::Bucket(mut sub) = node {
                    pending.push(std::mem::take(&mut sub.children));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_stops_on_values() {
        let mut root = BucketNode::new();
        let mut a = BucketNode::new();
        a.children.insert(b"x".to_vec(), Node::Value(b"1".to_vec()));
        a.children.insert(b"b".to_vec(), Node::Bucket(BucketNode::new()));
        root.children.insert(b"a".to_vec(), Node::Bucket(a));

        assert!(root.walk(&[b"a".as_slice(), b"b".as_slice()]).is_some());
        assert!(root.walk(&[b"a".as_slice(), b"x".as_slice()]).is_none());
        assert_eq!(root.count_recursive(), (2, 1));
    }

    #[test]
    fn very_deep_tree_drops_without_recursion() {
        let mut top = BucketNode::new();
        for _ in 0..200_000 {
            let mut parent = BucketNode::new();
            parent.children.insert(b"n".to_vec(), Node::Bucket(top));
            top = parent;
        }
        assert_eq!(top.count_recursive(), (200_000, 0));
        drop(top);
    }
}
