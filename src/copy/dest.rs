//! copy/dest — выбор файла назначения.
//!
//! - По умолчанию: DEFAULT_DEST_PREFIX + имя файла источника, в каталоге источника.
//! - Явно указанный путь годится, если файл существует или его можно создать.
//!   Проверка создания — проба: создать файл и сразу удалить.
//! - Непригодный путь заменяется путём по умолчанию с предупреждением.

use log::{debug, warn};
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::consts::DEFAULT_DEST_PREFIX;

/// Путь назначения по умолчанию для источника.
pub fn default_destination(source: &Path) -> PathBuf {
    let mut name = OsString::from(DEFAULT_DEST_PREFIX);
    match source.file_name() {
        Some(f) => name.push(f),
        None => name.push("store.db"),
    }
    match source.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
        _ => PathBuf::from(name),
    }
}

/// Существующий файл или создаваемый путь.
pub fn is_usable_destination(path: &Path) -> bool {
    if path.is_file() {
        return true;
    }
    if path.exists() {
        // каталог или иной не-файл
        return false;
    }
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => {
            drop(f);
            if let Err(e) = std::fs::remove_file(path) {
                warn!("can't remove probe file {}: {}", path.display(), e);
            }
            true
        }
        Err(e) => {
            debug!("destination probe failed for {}: {}", path.display(), e);
            false
        }
    }
}

/// Итоговый путь назначения.
pub fn resolve_destination(source: &Path, requested: Option<&Path>) -> PathBuf {
    let fallback = default_destination(source);
    match requested {
        None => fallback,
        Some(p) if is_usable_destination(p) => p.to_path_buf(),
        Some(p) => {
            warn!(
                "destination file name {} not valid, changed to default: {}",
                p.display(),
                fallback.display()
            );
            fallback
        }
    }
}

/// Указывают ли два пути на один и тот же файл (по канонизированным путям).
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(x), Ok(y)) => x == y,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_keeps_directory() {
        assert_eq!(
            default_destination(Path::new("data/app.db")),
            PathBuf::from("data/newcopy_app.db")
        );
        assert_eq!(
            default_destination(Path::new("app.db")),
            PathBuf::from("newcopy_app.db")
        );
    }

    #[test]
    fn unusable_destination_falls_back() {
        let dir = std::env::temp_dir();
        // каталог не может быть файлом назначения
        let got = resolve_destination(Path::new("src.db"), Some(dir.as_path()));
        assert_eq!(got, PathBuf::from("newcopy_src.db"));
    }
}
