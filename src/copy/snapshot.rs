//! copy/snapshot — снимок всей иерархии источника под одной read-транзакцией.
//!
//! Обход итеративный (явный стек), глубина ограничена только памятью.
//! Классификация ребёнка: если имя открывается как бакет — это контейнер,
//! иначе — запись (ключ, значение).

use anyhow::{anyhow, Result};
use log::debug;

use crate::store::{Bucket, Entries, ReadTx, Store};
use crate::util::display_text;

use super::error::CopyError;
use super::tree::{Container, Entry};

/// Снять снимок открытого хранилища.
pub fn snapshot(store: &Store) -> Result<Container, CopyError> {
    store
        .view(snapshot_tx)
        .map_err(|source| CopyError::Snapshot { source })
}

/// Снимок внутри уже открытой read-транзакции.
pub fn snapshot_tx(tx: &ReadTx<'_>) -> Result<Container> {
    let mut root = Container::root();
    for (name, bucket) in tx.buckets() {
        root.sub_containers.push(read_bucket(name, bucket)?);
    }
    debug!(
        "snapshot: {} top-level buckets, {} containers, {} entries",
        root.sub_containers.len(),
        root.container_count(),
        root.entry_count()
    );
    Ok(root)
}

struct Frame<'a> {
    node: Container,
    bucket: Bucket<'a>,
    children: Entries<'a>,
}

enum Step<'a> {
    Descend(&'a [u8], Bucket<'a>),
    Done,
}

impl<'a> Frame<'a> {
    fn new(name: &[u8], bucket: Bucket<'a>) -> Self {
        Self {
            node: Container::named(name),
            bucket,
            children: bucket.entries(),
        }
    }

    /// Продвинуться до следующего вложенного бакета; записи по пути складываются в node.
    fn advance(&mut self) -> Result<Step<'a>> {
        for (key, value) in self.children.by_ref() {
            if let Some(sub) = self.bucket.bucket(key) {
                return Ok(Step::Descend(key, sub));
            }
            let value = value.ok_or_else(|| {
                anyhow!(
                    "child {} of bucket {} is neither a bucket nor a value",
                    display_text(key),
                    display_text(&self.node.name)
                )
            })?;
            self.node.entries.push(Entry {
                key: key.to_vec(),
                value: value.to_vec(),
            });
        }
        Ok(Step::Done)
    }
}

fn read_bucket(name: &[u8], bucket: Bucket<'_>) -> Result<Container> {
    let mut stack = vec![Frame::new(name, bucket)];
    loop {
        let step = match stack.last_mut() {
            Some(frame) => frame.advance()?,
            None => return Err(anyhow!("snapshot stack underflow")),
        };
        match step {
            Step::Descend(sub_name, sub) => stack.push(Frame::new(sub_name, sub)),
            Step::Done => {
                let done = match stack.pop() {
                    Some(frame) => frame.node,
                    None => return Err(anyhow!("snapshot stack underflow")),
                };
                match stack.last_mut() {
                    Some(parent) => parent.node.sub_containers.push(done),
                    None => return Ok(done),
                }
            }
        }
    }
}
