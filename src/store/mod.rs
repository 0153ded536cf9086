//! NestDB store — однофайловое транзакционное хранилище вложенных бакетов.
//!
//! Разделение:
//! - node.rs    — in-memory дерево (BucketNode/Node), порядок перечисления = порядок байтов.
//! - ops.rs     — журнальные операции (CreateBucket/DeleteBucket/Put/Delete), кодек, undo.
//! - journal.rs — заголовок файла и кадры коммитов с CRC32C, толерантное чтение хвоста.
//! - tx.rs      — ReadTx/Bucket (view) и WriteTx/BucketMut (update).
//!
//! Модель:
//! - Open: прочитать все валидные кадры и применить их к пустому дереву.
//!   Writer усекает недописанный хвост; reader оставляет файл нетронутым.
//! - view(): closure над согласованным видом дерева.
//! - update(): closure над WriteTx; Err из closure или сбой записи кадра
//!   откатывают все изменения транзакции. Коммит = один кадр в конец файла (+fsync).
//!
//! Перезаписанные и удалённые значения остаются в журнале до компактации копированием
//! (см. crate::copy).

pub mod journal;
pub mod node;
pub mod ops;
pub mod tx;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::consts::STORE_HDR_SIZE;
use crate::lock::{open_locked, LockGuard, LockMode};
use crate::util::{env_flag, fsync_parent_dir};

use self::journal::{check_file_header, read_next_frame, write_file_header, write_frame};
use self::node::BucketNode;
use self::ops::{decode_ops, encode_ops};

pub use self::tx::{Bucket, BucketMut, Buckets, Entries, ReadTx, WriteTx};

/// Параметры открытия хранилища.
#[derive(Clone, Debug)]
pub struct StoreOptions {
    /// fsync файла после каждого коммита.
    /// Env: NEST_FSYNC (default true; "0|false|off|no" => false)
    pub fsync: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { fsync: true }
    }
}

impl StoreOptions {
    pub fn from_env() -> Self {
        let mut opts = Self::default();
        if let Some(on) = env_flag("NEST_FSYNC") {
            opts.fsync = on;
        }
        opts
    }

    pub fn with_fsync(mut self, on: bool) -> Self {
        self.fsync = on;
        self
    }
}

/// Статистика файла и дерева (для `nestdb stat` и отчёта копирования).
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    pub file_len: u64,
    pub frames: u64,
    pub last_txid: u64,
    pub buckets: u64,
    pub keys: u64,
}

pub struct Store {
    path: PathBuf,
    root: BucketNode,
    // Открытый файл хранилища под fs2-lock; writer дописывает кадры через него.
    lock: LockGuard,
    end: u64,
    frames: u64,
    txid: u64,
    readonly: bool,
    opts: StoreOptions,
}

/// Итог чтения журнала при открытии.
struct Loaded {
    root: BucketNode,
    valid_end: u64,
    frames: u64,
    txid: u64,
}

impl Store {
    /// Открыть writer; файл создаётся, если его нет (или он пустой).
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_options(path, StoreOptions::from_env())
    }

    pub fn open_with_options(path: &Path, opts: StoreOptions) -> Result<Self> {
        let mut lock = open_locked(path, LockMode::Exclusive)?;
        let f = lock.file_mut();

        if f.metadata()?.len() == 0 {
            debug!("store: initializing fresh file {}", path.display());
            write_file_header(f)?;
            f.sync_all()?;
            let _ = fsync_parent_dir(path);
        }

        let loaded = load(f).with_context(|| format!("load store {}", path.display()))?;

        let len = f.metadata()?.len();
        if loaded.valid_end < len {
            warn!(
                "store {}: truncating torn journal tail ({} -> {} bytes)",
                path.display(),
                len,
                loaded.valid_end
            );
            f.set_len(loaded.valid_end)?;
            f.sync_all()?;
        }
        f.seek(SeekFrom::Start(loaded.valid_end))?;

        info!(
            "store opened (rw): {} frames={} last_txid={}",
            path.display(),
            loaded.frames,
            loaded.txid
        );
        Ok(Self {
            path: path.to_path_buf(),
            root: loaded.root,
            lock,
            end: loaded.valid_end,
            frames: loaded.frames,
            txid: loaded.txid,
            readonly: false,
            opts,
        })
    }

    /// Открыть read-only. Файл обязан существовать; хвост не усекается,
    /// рядом с файлом ничего не создаётся.
    pub fn open_ro(path: &Path) -> Result<Self> {
        let mut lock = open_locked(path, LockMode::Shared)?;
        let loaded =
            load(lock.file_mut()).with_context(|| format!("load store {}", path.display()))?;

        info!(
            "store opened (ro): {} frames={} last_txid={}",
            path.display(),
            loaded.frames,
            loaded.txid
        );
        Ok(Self {
            path: path.to_path_buf(),
            root: loaded.root,
            lock,
            end: loaded.valid_end,
            frames: loaded.frames,
            txid: loaded.txid,
            readonly: true,
            opts: StoreOptions::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Read-only транзакция над согласованным видом хранилища.
    pub fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadTx<'_>) -> Result<T>,
    {
        let tx = ReadTx::new(&self.root);
        f(&tx)
    }

    /// Read-write транзакция. Ok из closure => коммит одного кадра; Err => откат.
    pub fn update<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTx<'_>) -> Result<T>,
    {
        if self.readonly {
            return Err(anyhow!("store is read-only: {}", self.path.display()));
        }

        let mut tx = WriteTx::new(&mut self.root);
        let res = f(&mut tx);
        let (ops, undo) = tx.into_parts();

        let out = match res {
            Ok(v) => v,
            Err(e) => {
                for u in undo.into_iter().rev() {
                    u.revert(&mut self.root);
                }
                return Err(e);
            }
        };

        if ops.is_empty() {
            return Ok(out);
        }

        let txid = self.txid + 1;
        if let Err(e) = self.append_frame(txid, &ops) {
            for u in undo.into_iter().rev() {
                u.revert(&mut self.root);
            }
            return Err(e.context(format!("commit txid={}", txid)));
        }
        self.txid = txid;
        self.frames += 1;
        Ok(out)
    }

    fn append_frame(&mut self, txid: u64, ops: &[ops::Op]) -> Result<()> {
        let payload = encode_ops(ops)?;
        let fsync = self.opts.fsync;
        let start = self.end;
        let f = self.lock.file_mut();

        match write_commit(f, start, txid, &payload, fsync) {
            Ok(n) => {
                self.end = start + n;
                Ok(())
            }
            Err(e) => {
                // Убрать частично записанный кадр, чтобы следующий коммит не лёг за мусором.
                let _ = f.set_len(start);
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> StoreStats {
        let (buckets, keys) = self.root.count_recursive();
        StoreStats {
            file_len: self.end,
            frames: self.frames,
            last_txid: self.txid,
            buckets,
            keys,
        }
    }

    /// Закрыть хранилище: финальный fsync (writer) и освобождение lock.
    pub fn close(self) -> Result<()> {
        if !self.readonly {
            self.lock
                .file()
                .sync_all()
                .with_context(|| format!("sync store {}", self.path.display()))?;
        }
        debug!("store closed: {}", self.path.display());
        Ok(())
    }
}

/// Применить все валидные кадры журнала к пустому дереву.
fn load(f: &mut File) -> Result<Loaded> {
    check_file_header(f)?;
    let len = f.metadata()?.len();
    let mut out = Loaded {
        root: BucketNode::new(),
        valid_end: STORE_HDR_SIZE as u64,
        frames: 0,
        txid: 0,
    };
    while let Some(frame) = read_next_frame(f, out.valid_end, len)? {
        if frame.txid <= out.txid {
            bail!(
                "non-monotonic txid {} after {} at off={}",
                frame.txid,
                out.txid,
                frame.pos
            );
        }
        let ops = decode_ops(&frame.payload)
            .with_context(|| format!("decode frame txid={} at off={}", frame.txid, frame.pos))?;
        for op in &ops {
            op.apply(&mut out.root).with_context(|| {
                format!("corrupt journal: apply frame txid={} at off={}", frame.txid, frame.pos)
            })?;
        }
        out.txid = frame.txid;
        out.frames += 1;
        out.valid_end = frame.pos + frame.len_total;
    }
    debug!("store load: {} frames, valid end at {}", out.frames, out.valid_end);
    Ok(out)
}

fn write_commit(f: &mut File, start: u64, txid: u64, payload: &[u8], fsync: bool) -> Result<u64> {
    f.seek(SeekFrom::Start(start))?;
    let n = write_frame(f, txid, payload)?;
    f.flush()?;
    if fsync {
        f.sync_data()?;
    }
    Ok(n)
}
