//! store/tx — транзакции и хэндлы бакетов.
//!
//! - ReadTx / Bucket — read-only вид на дерево (Copy-хэндлы с временем жизни view).
//! - WriteTx / BucketMut — изменения: каждая операция сразу применяется к дереву,
//!   копится в списке ops (для кадра журнала) и в undo-логе (для отката).
//!
//! BucketMut адресует свой бакет путём от корня и спускается «потребляя» себя,
//! поэтому одновременно жив ровно один изменяемый хэндл на транзакцию.

use anyhow::{anyhow, Result};
use std::collections::btree_map;

use crate::util::display_text;

use super::node::{BucketNode, Node};
use super::ops::{validate_name, BucketPath, Op, Undo};

// -------------------- read side --------------------

/// Read-only транзакция: согласованный вид на всё хранилище.
#[derive(Clone, Copy)]
pub struct ReadTx<'a> {
    root: &'a BucketNode,
}

impl<'a> ReadTx<'a> {
    pub(crate) fn new(root: &'a BucketNode) -> Self {
        Self { root }
    }

    /// Бакет верхнего уровня по имени.
    pub fn bucket(&self, name: &[u8]) -> Option<Bucket<'a>> {
        self.root.sub_bucket(name).map(|node| Bucket { node })
    }

    /// Бакеты верхнего уровня в порядке возрастания имён.
    pub fn buckets(&self) -> Buckets<'a> {
        Buckets {
            inner: self.root.children.iter(),
        }
    }
}

/// Хэндл бакета внутри read-транзакции.
#[derive(Clone, Copy)]
pub struct Bucket<'a> {
    node: &'a BucketNode,
}

impl<'a> Bucket<'a> {
    /// Вложенный бакет; None, если имени нет или это ключ.
    pub fn bucket(&self, name: &[u8]) -> Option<Bucket<'a>> {
        self.node.sub_bucket(name).map(|node| Bucket { node })
    }

    /// Значение ключа; None для отсутствующих ключей и для вложенных бакетов.
    pub fn get(&self, key: &[u8]) -> Option<&'a [u8]> {
        match self.node.child(key) {
            Some(Node::Value(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Прямые дочерние элементы: (имя, Some(value)) для ключей, (имя, None) для бакетов.
    pub fn entries(&self) -> Entries<'a> {
        Entries {
            inner: self.node.children.iter(),
        }
    }

    /// Число прямых дочерних элементов (бакеты + ключи).
    pub fn len(&self) -> usize {
        self.node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node.is_empty()
    }
}

pub struct Entries<'a> {
    inner: btree_map::Iter<'a, Vec<u8>, Node>,
}

impl<'a> Iterator for Entries<'a> {
    type Item = (&'a [u8], Option<&'a [u8]>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, node)| match node {
            Node::Value(v) => (k.as_slice(), Some(v.as_slice())),
            Node::Bucket(_) => (k.as_slice(), None),
        })
    }
}

pub struct Buckets<'a> {
    inner: btree_map::Iter<'a, Vec<u8>, Node>,
}

impl<'a> Iterator for Buckets<'a> {
    type Item = (&'a [u8], Bucket<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        for (k, node) in self.inner.by_ref() {
            if let Node::Bucket(b) = node {
                return Some((k.as_slice(), Bucket { node: b }));
            }
        }
        None
    }
}

// -------------------- write side --------------------

/// Read-write транзакция. Создаётся только через Store::update.
pub struct WriteTx<'s> {
    root: &'s mut BucketNode,
    ops: Vec<Op>,
    undo: Vec<Undo>,
}

impl<'s> WriteTx<'s> {
    pub(crate) fn new(root: &'s mut BucketNode) -> Self {
        Self {
            root,
            ops: Vec::new(),
            undo: Vec::new(),
        }
    }

    pub fn bucket(&self, name: &[u8]) -> Option<Bucket<'_>> {
        self.root.sub_bucket(name).map(|node| Bucket { node })
    }

    /// Изменяемый хэндл бакета верхнего уровня (без создания).
    pub fn bucket_mut(&mut self, name: &[u8]) -> Option<BucketMut<'_, 's>> {
        self.root.sub_bucket(name)?;
        Some(BucketMut {
            tx: self,
            path: vec![name.to_vec()],
        })
    }

    /// Создать бакет верхнего уровня; ошибка, если имя уже занято.
    pub fn create_bucket(&mut self, name: &[u8]) -> Result<BucketMut<'_, 's>> {
        self.create_in(Vec::new(), name, false)
    }

    /// Создать бакет верхнего уровня или вернуть существующий.
    pub fn create_bucket_if_not_exists(&mut self, name: &[u8]) -> Result<BucketMut<'_, 's>> {
        self.create_in(Vec::new(), name, true)
    }

    pub fn delete_bucket(&mut self, name: &[u8]) -> Result<()> {
        self.apply(Op::DeleteBucket {
            path: Vec::new(),
            name: name.to_vec(),
        })
    }

    /// Число операций, накопленных транзакцией.
    pub fn pending_ops(&self) -> usize {
        self.ops.len()
    }

    fn apply(&mut self, op: Op) -> Result<()> {
        if let Some(u) = op.apply(self.root)? {
            self.undo.push(u);
        }
        self.ops.push(op);
        Ok(())
    }

    fn create_in(
        &mut self,
        parent: BucketPath,
        name: &[u8],
        if_not_exists: bool,
    ) -> Result<BucketMut<'_, 's>> {
        validate_name("bucket name", name)?;
        let exists = {
            let p = self
                .root
                .walk(&parent)
                .ok_or_else(|| anyhow!("bucket not found while creating {}", display_text(name)))?;
            matches!(p.child(name), Some(Node::Bucket(_)))
        };
        if !(exists && if_not_exists) {
            self.apply(Op::CreateBucket {
                path: parent.clone(),
                name: name.to_vec(),
            })?;
        }
        let mut path = parent;
        path.push(name.to_vec());
        Ok(BucketMut { tx: self, path })
    }

    pub(crate) fn into_parts(self) -> (Vec<Op>, Vec<Undo>) {
        (self.ops, self.undo)
    }
}

/// Изменяемый хэндл бакета внутри WriteTx.
pub struct BucketMut<'t, 's> {
    tx: &'t mut WriteTx<'s>,
    path: BucketPath,
}

impl<'t, 's> BucketMut<'t, 's> {
    /// Путь бакета от корня транзакции.
    pub fn path(&self) -> &[Vec<u8>] {
        &self.path
    }

    fn node(&self) -> Option<&BucketNode> {
        self.tx.root.walk(&self.path)
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        match self.node()?.child(key) {
            Some(Node::Value(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Есть ли вложенный бакет с таким именем.
    pub fn has_bucket(&self, name: &[u8]) -> bool {
        self.node().and_then(|n| n.sub_bucket(name)).is_some()
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.tx.apply(Op::Put {
            path: self.path.clone(),
            key: key.to_vec(),
            value: value.to_vec(),
        })
    }

    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.tx.apply(Op::Delete {
            path: self.path.clone(),
            key: key.to_vec(),
        })
    }

    pub fn delete_bucket(&mut self, name: &[u8]) -> Result<()> {
        self.tx.apply(Op::DeleteBucket {
            path: self.path.clone(),
            name: name.to_vec(),
        })
    }

    /// Спуститься во вложенный бакет (без создания).
    pub fn into_bucket(self, name: &[u8]) -> Option<BucketMut<'t, 's>> {
        if !self.has_bucket(name) {
            return None;
        }
        let mut path = self.path;
        path.push(name.to_vec());
        Some(BucketMut { tx: self.tx, path })
    }

    pub fn create_bucket(self, name: &[u8]) -> Result<BucketMut<'t, 's>> {
        self.tx.create_in(self.path, name, false)
    }

    pub fn create_bucket_if_not_exists(self, name: &[u8]) -> Result<BucketMut<'t, 's>> {
        self.tx.create_in(self.path, name, true)
    }
}
