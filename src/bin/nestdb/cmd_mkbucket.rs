use anyhow::Result;
use std::path::PathBuf;

use NestDB::copy::create_path;
use NestDB::Store;

use super::util::bucket_path;

pub fn exec(path: PathBuf, bucket: Vec<String>) -> Result<()> {
    let bp = bucket_path(&bucket);
    let mut store = Store::open(&path)?;
    store.update(|tx| create_path(tx, &bp).map(|_| ()))?;
    store.close()?;
    println!("OK bucket {}", bp);
    Ok(())
}
