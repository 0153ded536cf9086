use anyhow::{anyhow, Result};
use std::path::PathBuf;

use NestDB::copy::lookup_path;
use NestDB::Store;

use super::util::bucket_path;

pub fn exec(path: PathBuf, bucket: Vec<String>, key: String) -> Result<()> {
    let bp = bucket_path(&bucket);
    let mut store = Store::open(&path)?;
    let existed = store.update(|tx| {
        let mut b = lookup_path(tx, &bp).ok_or_else(|| anyhow!("bucket not found: {}", bp))?;
        let existed = b.get(key.as_bytes()).is_some();
        b.delete(key.as_bytes())?;
        Ok(existed)
    })?;
    store.close()?;
    if existed {
        println!("OK del {} '{}'", bp, key);
    } else {
        println!("NOT FOUND {} '{}'", bp, key);
    }
    Ok(())
}
