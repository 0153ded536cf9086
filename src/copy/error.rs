//! copy/error — типизированные ошибки конвейера копирования.
//!
//! Каждый вариант несёт исходную anyhow-ошибку хранилища; вызывающий код
//! (бинарник) решает, как превратить её в код выхода.

use std::fmt;
use std::path::PathBuf;

use crate::util::display_text;

use super::path::ContainerPath;

/// Категория сбоя.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Не открыть/закрыть файл хранилища, неверные аргументы путей.
    Setup,
    /// Не удалось создать контейнер в назначении.
    Structural,
    /// Не удалось вставить запись в назначении.
    Write,
    /// Копия не совпала с источником при проверке.
    Verify,
}

#[derive(Debug)]
pub enum CopyError {
    OpenSource {
        path: PathBuf,
        source: anyhow::Error,
    },
    Snapshot {
        source: anyhow::Error,
    },
    CloseSource {
        path: PathBuf,
        source: anyhow::Error,
    },
    SameFile {
        path: PathBuf,
    },
    OpenDestination {
        path: PathBuf,
        source: anyhow::Error,
    },
    CloseDestination {
        path: PathBuf,
        source: anyhow::Error,
    },
    CreateContainer {
        name: Vec<u8>,
        path: ContainerPath,
        source: anyhow::Error,
    },
    InsertEntry {
        container: Vec<u8>,
        path: ContainerPath,
        key: Vec<u8>,
        source: anyhow::Error,
    },
    Verify {
        detail: String,
    },
}

impl CopyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CopyError::OpenSource { .. }
            | CopyError::Snapshot { .. }
            | CopyError::CloseSource { .. }
            | CopyError::SameFile { .. }
            | CopyError::OpenDestination { .. }
            | CopyError::CloseDestination { .. } => ErrorKind::Setup,
            CopyError::CreateContainer { .. } => ErrorKind::Structural,
            CopyError::InsertEntry { .. } => ErrorKind::Write,
            CopyError::Verify { .. } => ErrorKind::Verify,
        }
    }

    /// Все фатальные сбои завершают процесс с кодом 1.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

impl fmt::Display for CopyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyError::OpenSource { path, .. } => {
                write!(f, "can't open source db {}", path.display())
            }
            CopyError::Snapshot { .. } => write!(f, "can't read source db"),
            CopyError::CloseSource { path, .. } => {
                write!(f, "can't close source db {}", path.display())
            }
            CopyError::SameFile { path } => write!(
                f,
                "destination is the source file itself: {}",
                path.display()
            ),
            CopyError::OpenDestination { path, .. } => {
                write!(f, "can't open destination db {}", path.display())
            }
            CopyError::CloseDestination { path, .. } => {
                write!(f, "can't close destination db {}", path.display())
            }
            CopyError::CreateContainer { name, path, .. } => write!(
                f,
                "can't create bucket {} (path {})",
                display_text(name),
                path
            ),
            CopyError::InsertEntry {
                container,
                path,
                key,
                ..
            } => write!(
                f,
                "can't insert into bucket {} (path {}, key {})",
                display_text(container),
                path,
                display_text(key)
            ),
            CopyError::Verify { detail } => write!(f, "copy verification failed: {}", detail),
        }
    }
}

impl std::error::Error for CopyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CopyError::OpenSource { source, .. }
            | CopyError::Snapshot { source }
            | CopyError::CloseSource { source, .. }
            | CopyError::OpenDestination { source, .. }
            | CopyError::CloseDestination { source, .. }
            | CopyError::CreateContainer { source, .. }
            | CopyError::InsertEntry { source, .. } => Some(source.as_ref()),
            CopyError::SameFile { .. } | CopyError::Verify { .. } => None,
        }
    }
}
