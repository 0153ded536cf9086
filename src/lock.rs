//! File-based locking for single-writer safety.
//!
//! Cross-platform (fs2) advisory locks taken on the store file handle itself:
//! - Exclusive: writer (`Store::open`), conflicts with any other holder.
//! - Shared: readers (`Store::open_ro`), many at once.
//!
//! Writer открывает файл с созданием, reader — только существующий файл,
//! поэтому read-only открытие ничего не создаёт рядом с хранилищем.
//! Захват неблокирующий: занятый lock — ошибка открытия, а не ожидание.
//! Lock is released on Drop.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Открытый и заблокированный файл хранилища.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
    mode: LockMode,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    /// Дескриптор для чтения/записи журнала (тот же, что держит lock).
    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // fs2 unlock errors on drop are ignored deliberately.
        let _ = self.file.unlock();
    }
}

/// Открыть файл хранилища и захватить lock в заданном режиме.
/// Exclusive создаёт файл при отсутствии; Shared требует существующий файл.
pub fn open_locked(store_path: &Path, mode: LockMode) -> Result<LockGuard> {
    let file = match mode {
        LockMode::Shared => OpenOptions::new().read(true).open(store_path),
        LockMode::Exclusive => OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(store_path),
    }
    .with_context(|| format!("open store {}", store_path.display()))?;

    match mode {
        LockMode::Shared => file
            .try_lock_shared()
            .with_context(|| format!("store is locked by a writer: {}", store_path.display()))?,
        LockMode::Exclusive => file.try_lock_exclusive().with_context(|| {
            format!("store is locked by another process: {}", store_path.display())
        })?,
    }
    Ok(LockGuard {
        file,
        path: store_path.to_path_buf(),
        mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("nestdb-lock-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("s.db")
    }

    #[test]
    fn shared_locks_coexist_exclusive_does_not() {
        let store = temp_store("modes");

        let w = open_locked(&store, LockMode::Exclusive).unwrap();
        assert!(open_locked(&store, LockMode::Shared).is_err());
        drop(w);

        let a = open_locked(&store, LockMode::Shared).unwrap();
        let b = open_locked(&store, LockMode::Shared).unwrap();
        assert_eq!(a.mode(), LockMode::Shared);
        assert_eq!(b.path(), store.as_path());
        assert!(open_locked(&store, LockMode::Exclusive).is_err());
    }

    #[test]
    fn shared_open_creates_nothing() {
        let store = temp_store("nocreate");
        let missing = store.with_file_name("absent.db");
        assert!(open_locked(&missing, LockMode::Shared).is_err());
        let dir = missing.parent().unwrap();
        let names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name())
            .collect();
        assert!(names.iter().all(|n| !n.to_string_lossy().starts_with("absent")));
    }
}
