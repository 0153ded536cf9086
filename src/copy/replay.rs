//! copy/replay — воспроизведение снимка в хранилище назначения.
//!
//! Для каждого контейнера C по пути P (порядок: сначала дети, потом сам C):
//!   1) observer(P, |C.entries|) — при первом посещении;
//!   2) обработать дочерние контейнеры C;
//!   3) одна write-транзакция: create_path(P);
//!   4) записи C: по транзакции на запись (или одна на контейнер в batch-режиме).
//! Любой сбой фатален: replay останавливается на месте, уже записанное остаётся.

use anyhow::anyhow;
use log::{debug, info};
use serde::Serialize;

use crate::store::Store;

use super::error::CopyError;
use super::path::{create_path, lookup_path, ContainerPath};
use super::tree::{Container, Entry};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayOptions {
    /// Все записи одного контейнера в одной транзакции.
    pub batch_entries: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplayStats {
    pub containers: u64,
    pub entries: u64,
    pub write_txns: u64,
}

struct Visit<'t> {
    container: &'t Container,
    path: ContainerPath,
    next_child: usize,
}

impl<'t> Visit<'t> {
    fn new(container: &'t Container, path: ContainerPath) -> Self {
        Self {
            container,
            path,
            next_child: 0,
        }
    }
}

/// Воспроизвести дерево `root` в `dest`.
pub fn replay<F>(
    root: &Container,
    dest: &mut Store,
    opts: ReplayOptions,
    mut observer: F,
) -> Result<ReplayStats, CopyError>
where
    F: FnMut(&ContainerPath, usize),
{
    let mut stats = ReplayStats::default();
    let mut stack = vec![Visit::new(root, ContainerPath::root())];

    while let Some(top) = stack.last_mut() {
        let container: &Container = top.container;
        if let Some(child) = container.sub_containers.get(top.next_child) {
            top.next_child += 1;
            let path = top.path.child(&child.name);
            observer(&path, child.entries.len());
            stack.push(Visit::new(child, path));
            continue;
        }

        let Some(done) = stack.pop() else { break };
        if done.path.is_root() {
            break;
        }
        materialize(dest, done.container, &done.path, opts, &mut stats)?;
    }

    info!(
        "replay done: containers={} entries={} write_txns={}",
        stats.containers, stats.entries, stats.write_txns
    );
    Ok(stats)
}

/// Создать путь контейнера и вставить его собственные записи.
fn materialize(
    dest: &mut Store,
    container: &Container,
    path: &ContainerPath,
    opts: ReplayOptions,
    stats: &mut ReplayStats,
) -> Result<(), CopyError> {
    dest.update(|tx| create_path(tx, path).map(|_| ()))
        .map_err(|source| CopyError::CreateContainer {
            name: container.name.clone(),
            path: path.clone(),
            source,
        })?;
    stats.containers += 1;
    stats.write_txns += 1;

    if container.entries.is_empty() {
        return Ok(());
    }

    if opts.batch_entries {
        dest.update(|tx| {
            let mut bucket = lookup_path(tx, path)
                .ok_or_else(|| anyhow!("bucket vanished before insert: {}", path))?;
            for e in &container.entries {
                bucket.put(&e.key, &e.value)?;
            }
            Ok(())
        })
        .map_err(|source| insert_error(container, path, &container.entries[0], source))?;
        stats.write_txns += 1;
    } else {
        for e in &container.entries {
            dest.update(|tx| {
                let mut bucket = lookup_path(tx, path)
                    .ok_or_else(|| anyhow!("bucket vanished before insert: {}", path))?;
                bucket.put(&e.key, &e.value)
            })
            .map_err(|source| insert_error(container, path, e, source))?;
            stats.write_txns += 1;
        }
    }
    stats.entries += container.entries.len() as u64;
    debug!("replayed {} ({} entries)", path, container.entries.len());
    Ok(())
}

fn insert_error(
    container: &Container,
    path: &ContainerPath,
    entry: &Entry,
    source: anyhow::Error,
) -> CopyError {
    CopyError::InsertEntry {
        container: container.name.clone(),
        path: path.clone(),
        key: entry.key.clone(),
        source,
    }
}
