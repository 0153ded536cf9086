//! Компактирующее копирование хранилища: snapshot → replay.
//!
//! Конвейер строго двухфазный:
//!   open source (ro) → snapshot (одна read-транзакция) → close source →
//!   open destination (rw) → replay (N write-транзакций) → close destination →
//!   [verify: reopen destination (ro) и сравнить со снимком].
//! Любой сбой — терминальный; отката нет, частично записанный файл назначения
//! остаётся на диске.

pub mod dest;
pub mod error;
pub mod path;
pub mod replay;
pub mod snapshot;
pub mod tree;

use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::CopyConfig;
use crate::store::Store;
use crate::util::file_len;

pub use self::error::{CopyError, ErrorKind};
pub use self::path::{create_path, lookup_path, lookup_path_ro, ContainerPath};
pub use self::replay::{replay, ReplayOptions, ReplayStats};
pub use self::snapshot::{snapshot, snapshot_tx};
pub use self::tree::{Container, Entry};

/// Итог одного запуска копирования.
#[derive(Debug, Clone, Serialize)]
pub struct CopyReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub containers: u64,
    pub entries: u64,
    pub write_txns: u64,
    pub source_bytes: u64,
    pub destination_bytes: u64,
    pub verified: bool,
}

/// Скопировать `source` в `destination` с отчётом о прогрессе через `observer`.
pub fn copy_store<F>(
    source: &Path,
    destination: &Path,
    cfg: &CopyConfig,
    observer: F,
) -> Result<CopyReport, CopyError>
where
    F: FnMut(&ContainerPath, usize),
{
    if dest::same_file(source, destination) {
        return Err(CopyError::SameFile {
            path: destination.to_path_buf(),
        });
    }

    // Phase 1: snapshot
    let src = Store::open_ro(source).map_err(|e| CopyError::OpenSource {
        path: source.to_path_buf(),
        source: e,
    })?;
    let tree = snapshot::snapshot(&src)?;
    src.close().map_err(|e| CopyError::CloseSource {
        path: source.to_path_buf(),
        source: e,
    })?;
    info!(
        "snapshot of {}: {} containers, {} entries, depth {}",
        source.display(),
        tree.container_count(),
        tree.entry_count(),
        tree.depth()
    );

    // Phase 2: replay
    let mut dst = Store::open_with_options(destination, cfg.store_options()).map_err(|e| {
        CopyError::OpenDestination {
            path: destination.to_path_buf(),
            source: e,
        }
    })?;
    if dst.stats().frames > 0 {
        warn!(
            "destination {} is not empty, snapshot will be merged into it",
            destination.display()
        );
    }
    let stats = replay::replay(&tree, &mut dst, cfg.replay_options(), observer)?;
    dst.close().map_err(|e| CopyError::CloseDestination {
        path: destination.to_path_buf(),
        source: e,
    })?;

    if cfg.verify {
        verify_copy(&tree, destination)?;
    }

    Ok(CopyReport {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        containers: stats.containers,
        entries: stats.entries,
        write_txns: stats.write_txns,
        source_bytes: file_len(source),
        destination_bytes: file_len(destination),
        verified: cfg.verify,
    })
}

/// Сравнить файл назначения со снимком источника.
pub fn verify_copy(expected: &Container, destination: &Path) -> Result<(), CopyError> {
    let dst = Store::open_ro(destination).map_err(|e| CopyError::OpenDestination {
        path: destination.to_path_buf(),
        source: e,
    })?;
    let actual = snapshot::snapshot(&dst)?;
    dst.close().map_err(|e| CopyError::CloseDestination {
        path: destination.to_path_buf(),
        source: e,
    })?;

    match expected.first_difference(&actual) {
        None => {
            info!("verify: {} matches the source snapshot", destination.display());
            Ok(())
        }
        Some(detail) => Err(CopyError::Verify { detail }),
    }
}
