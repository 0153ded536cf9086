// tests/copy_failures.rs
//
// Сбои копирования фатальны: конвейер останавливается на первой ошибке,
// возвращает типизированную CopyError, а уже записанное в назначении остаётся.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use NestDB::copy::{replay, snapshot, ContainerPath, CopyError, ErrorKind, ReplayOptions};
use NestDB::{copy_store, CopyConfig, Store, StoreOptions};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_dir(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("nestdb-fail-{prefix}-{pid}-{t}-{id}"));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn opts() -> StoreOptions {
    StoreOptions::default().with_fsync(false)
}

fn cfg() -> CopyConfig {
    CopyConfig::default().with_fsync(false).with_progress(false)
}

/// Источник: a{x=1}, b{y=2}.
fn make_source(path: &Path) -> Result<()> {
    let mut st = Store::open_with_options(path, opts())?;
    st.update(|tx| {
        tx.create_bucket(b"a")?.put(b"x", b"1")?;
        tx.create_bucket(b"b")?.put(b"y", b"2")?;
        Ok(())
    })?;
    st.close()?;
    Ok(())
}

#[test]
fn insert_conflict_stops_replay() -> Result<()> {
    let dir = unique_dir("insert");
    let src = dir.join("src.db");
    let dst = dir.join("dst.db");
    make_source(&src)?;

    // в назначении a/x уже бакет, поэтому put(x) не пройдёт
    {
        let mut st = Store::open_with_options(&dst, opts())?;
        st.update(|tx| tx.create_bucket(b"a")?.create_bucket(b"x").map(|_| ()))?;
        st.close()?;
    }

    let err = copy_store(&src, &dst, &cfg(), |_, _| {}).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Write);
    assert_eq!(err.exit_code(), 1);
    match &err {
        CopyError::InsertEntry {
            container,
            path,
            key,
            ..
        } => {
            assert_eq!(container.as_slice(), b"a");
            assert_eq!(*path, ContainerPath::from_names(["a"]));
            assert_eq!(key.as_slice(), b"x");
        }
        other => panic!("unexpected error: {other}"),
    }
    let msg = err.to_string();
    assert!(msg.contains("can't insert"), "{msg}");

    // b идёт после a и не должен был появиться
    let st = Store::open_ro(&dst)?;
    st.view(|tx| {
        assert!(tx.bucket(b"b").is_none());
        assert!(tx.bucket(b"a").expect("a").bucket(b"x").is_some());
        Ok(())
    })?;
    st.close()?;
    Ok(())
}

#[test]
fn container_conflict_is_structural() -> Result<()> {
    let dir = unique_dir("structural");
    let src = dir.join("src.db");
    let dst = dir.join("dst.db");
    {
        let mut st = Store::open_with_options(&src, opts())?;
        st.update(|tx| tx.create_bucket(b"a")?.create_bucket(b"inner").map(|_| ()))?;
        st.close()?;
    }
    {
        let mut st = Store::open_with_options(&dst, opts())?;
        st.update(|tx| tx.create_bucket(b"a")?.put(b"inner", b"value"))?;
        st.close()?;
    }

    let err = copy_store(&src, &dst, &cfg(), |_, _| {}).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    match err {
        CopyError::CreateContainer { name, path, .. } => {
            assert_eq!(name.as_slice(), b"inner");
            assert_eq!(path, ContainerPath::from_names(["a", "inner"]));
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[test]
fn replay_into_read_only_store_fails() -> Result<()> {
    let dir = unique_dir("ro");
    let src = dir.join("src.db");
    let dst = dir.join("dst.db");
    make_source(&src)?;
    Store::open_with_options(&dst, opts())?.close()?;

    let tree = {
        let st = Store::open_ro(&src)?;
        let t = snapshot(&st)?;
        st.close()?;
        t
    };

    let mut ro = Store::open_ro(&dst)?;
    let err = replay(&tree, &mut ro, ReplayOptions::default(), |_, _| {}).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    ro.close()?;
    Ok(())
}

#[test]
fn missing_source_is_setup_error() -> Result<()> {
    let dir = unique_dir("missing");
    let src = dir.join("nope.db");
    let dst = dir.join("dst.db");

    let err = copy_store(&src, &dst, &cfg(), |_, _| {}).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Setup);
    assert!(matches!(err, CopyError::OpenSource { .. }));
    // ни назначение, ни что-либо рядом с источником не создаётся
    assert!(!dst.exists());
    let leftovers: Vec<_> = fs::read_dir(&dir)?.collect::<std::io::Result<_>>()?;
    assert!(leftovers.is_empty(), "{:?}", leftovers);
    Ok(())
}

#[test]
fn copying_onto_itself_is_refused() -> Result<()> {
    let dir = unique_dir("same");
    let src = dir.join("src.db");
    make_source(&src)?;
    let before = fs::read(&src)?;

    let alias = dir.join(".").join("src.db");
    let err = copy_store(&src, &alias, &cfg(), |_, _| {}).unwrap_err();
    assert!(matches!(err, CopyError::SameFile { .. }));
    assert_eq!(err.kind(), ErrorKind::Setup);
    assert_eq!(fs::read(&src)?, before);
    Ok(())
}

#[test]
fn locked_source_cannot_be_copied() -> Result<()> {
    let dir = unique_dir("locked");
    let src = dir.join("src.db");
    let dst = dir.join("dst.db");
    make_source(&src)?;

    let writer = Store::open_with_options(&src, opts())?;
    let err = copy_store(&src, &dst, &cfg(), |_, _| {}).unwrap_err();
    assert!(matches!(err, CopyError::OpenSource { .. }));
    writer.close()?;

    copy_store(&src, &dst, &cfg(), |_, _| {})?;
    Ok(())
}
