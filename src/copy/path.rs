//! copy/path — адресация контейнеров путём имён от корня транзакции.
//!
//! ContainerPath неизменяем: child() строит новый путь, поэтому соседние
//! ветви обхода никогда не делят общий буфер.
//!
//! Резолверы идут строго root→leaf, по одному имени за шаг:
//! - create_path: создаёт недостающие уровни (идемпотентно);
//! - lookup_path / lookup_path_ro: только поиск, отсутствие любого уровня => None.

use anyhow::{bail, Result};
use std::fmt;

use crate::store::{Bucket, BucketMut, ReadTx, WriteTx};
use crate::util::display_text;

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContainerPath {
    names: Vec<Vec<u8>>,
}

impl ContainerPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_names<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: AsRef<[u8]>,
    {
        Self {
            names: names.into_iter().map(|n| n.as_ref().to_vec()).collect(),
        }
    }

    /// Новый путь на один уровень глубже.
    pub fn child(&self, name: &[u8]) -> Self {
        let mut names = Vec::with_capacity(self.names.len() + 1);
        names.extend(self.names.iter().cloned());
        names.push(name.to_vec());
        Self { names }
    }

    pub fn names(&self) -> &[Vec<u8>] {
        &self.names
    }

    pub fn last(&self) -> Option<&[u8]> {
        self.names.last().map(|n| n.as_slice())
    }

    pub fn is_root(&self) -> bool {
        self.names.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.names.len()
    }
}

impl fmt::Display for ContainerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, n) in self.names.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", display_text(n))?;
        }
        write!(f, "]")
    }
}

/// Найти или создать контейнер по пути, создавая недостающие уровни.
pub fn create_path<'t, 's>(
    tx: &'t mut WriteTx<'s>,
    path: &ContainerPath,
) -> Result<BucketMut<'t, 's>> {
    let mut names = path.names().iter();
    let Some(first) = names.next() else {
        bail!("empty path does not address a container");
    };
    let mut cur = tx.create_bucket_if_not_exists(first)?;
    for name in names {
        cur = cur.create_bucket_if_not_exists(name)?;
    }
    Ok(cur)
}

/// Найти контейнер по пути внутри write-транзакции, ничего не создавая.
pub fn lookup_path<'t, 's>(
    tx: &'t mut WriteTx<'s>,
    path: &ContainerPath,
) -> Option<BucketMut<'t, 's>> {
    let mut names = path.names().iter();
    let first = names.next()?;
    let mut cur = tx.bucket_mut(first)?;
    for name in names {
        cur = cur.into_bucket(name)?;
    }
    Some(cur)
}

/// Поиск по пути внутри read-транзакции.
pub fn lookup_path_ro<'a>(tx: &ReadTx<'a>, path: &ContainerPath) -> Option<Bucket<'a>> {
    let mut names = path.names().iter();
    let first = names.next()?;
    let mut cur = tx.bucket(first)?;
    for name in names {
        cur = cur.bucket(name)?;
    }
    Some(cur)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_builds_independent_paths() {
        let base = ContainerPath::from_names(["a"]);
        let left = base.child(b"l");
        let right = base.child(b"r");
        assert_eq!(base.depth(), 1);
        assert_eq!(left.to_string(), "[a l]");
        assert_eq!(right.to_string(), "[a r]");
        assert_eq!(right.last(), Some(b"r".as_slice()));
        assert!(ContainerPath::root().is_root());
    }

    #[test]
    fn display_marks_binary_names() {
        let p = ContainerPath::root().child(&[0xff, 0x00]);
        assert_eq!(p.to_string(), "[(binary 2 B)]");
    }
}
