use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use NestDB::copy::{create_path, lookup_path, lookup_path_ro, ContainerPath};
use NestDB::{Store, StoreOptions};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_file(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("nestdb-path-{prefix}-{pid}-{t}-{id}"));
    fs::create_dir_all(&dir).unwrap();
    dir.join("store.db")
}

fn open(prefix: &str) -> Result<Store> {
    Store::open_with_options(&unique_file(prefix), StoreOptions::default().with_fsync(false))
}

#[test]
fn create_path_is_idempotent() -> Result<()> {
    let mut st = open("idem")?;
    let abc = ContainerPath::from_names(["a", "b", "c"]);

    st.update(|tx| {
        let mut c = create_path(tx, &abc)?;
        c.put(b"k", b"v")?;
        // сосед на промежуточном уровне
        let mut a = create_path(tx, &ContainerPath::from_names(["a"]))?;
        a.put(b"sibling", b"s")?;
        Ok(())
    })?;
    let frames = st.stats().frames;

    // повторное создание полного и частичного пути ничего не меняет
    st.update(|tx| {
        let c = create_path(tx, &abc)?;
        assert_eq!(c.path().len(), 3);
        assert_eq!(c.get(b"k"), Some(b"v".as_slice()));
        create_path(tx, &ContainerPath::from_names(["a", "b"]))?;
        assert_eq!(tx.pending_ops(), 0);
        Ok(())
    })?;
    assert_eq!(st.stats().frames, frames);

    st.view(|tx| {
        let a = lookup_path_ro(tx, &ContainerPath::from_names(["a"])).expect("a");
        assert_eq!(a.get(b"sibling"), Some(b"s".as_slice()));
        let c = lookup_path_ro(tx, &abc).expect("a/b/c");
        assert_eq!(c.get(b"k"), Some(b"v".as_slice()));
        Ok(())
    })?;
    st.close()?;
    Ok(())
}

#[test]
fn lookup_never_creates() -> Result<()> {
    let mut st = open("lookup")?;
    st.update(|tx| create_path(tx, &ContainerPath::from_names(["a"])).map(|_| ()))?;

    st.update(|tx| {
        assert!(lookup_path(tx, &ContainerPath::from_names(["a", "missing"])).is_none());
        assert!(lookup_path(tx, &ContainerPath::from_names(["nope"])).is_none());
        assert!(lookup_path(tx, &ContainerPath::root()).is_none());
        assert_eq!(tx.pending_ops(), 0);
        Ok(())
    })?;

    st.view(|tx| {
        assert!(lookup_path_ro(tx, &ContainerPath::from_names(["a", "missing"])).is_none());
        assert_eq!(tx.buckets().count(), 1);
        Ok(())
    })?;
    st.close()?;
    Ok(())
}

#[test]
fn create_path_rejects_root_and_keys_in_the_way() -> Result<()> {
    let mut st = open("reject")?;
    st.update(|tx| tx.create_bucket(b"a")?.put(b"leaf", b"1"))?;

    let root = st.update(|tx| create_path(tx, &ContainerPath::root()).map(|_| ()));
    assert!(root.is_err());

    let through_key =
        st.update(|tx| create_path(tx, &ContainerPath::from_names(["a", "leaf", "x"])).map(|_| ()));
    assert!(through_key.is_err());

    st.view(|tx| {
        let a = tx.bucket(b"a").expect("a");
        assert_eq!(a.get(b"leaf"), Some(b"1".as_slice()));
        assert!(a.bucket(b"leaf").is_none());
        Ok(())
    })?;
    st.close()?;
    Ok(())
}

/// Записи одного контейнера не видны через путь другого.
#[test]
fn entries_are_scoped_to_their_container() -> Result<()> {
    let mut st = open("scope")?;
    st.update(|tx| {
        create_path(tx, &ContainerPath::from_names(["a", "b"]))?.put(b"k", b"inner")?;
        create_path(tx, &ContainerPath::from_names(["a"]))?.put(b"k", b"outer")?;
        create_path(tx, &ContainerPath::from_names(["c", "b"]))?;
        Ok(())
    })?;

    st.view(|tx| {
        let ab = lookup_path_ro(tx, &ContainerPath::from_names(["a", "b"])).expect("a/b");
        let a = lookup_path_ro(tx, &ContainerPath::from_names(["a"])).expect("a");
        let cb = lookup_path_ro(tx, &ContainerPath::from_names(["c", "b"])).expect("c/b");
        assert_eq!(ab.get(b"k"), Some(b"inner".as_slice()));
        assert_eq!(a.get(b"k"), Some(b"outer".as_slice()));
        assert_eq!(cb.get(b"k"), None);
        Ok(())
    })?;
    st.close()?;
    Ok(())
}
