use anyhow::Result;
use std::path::PathBuf;

use NestDB::Store;

pub fn exec(path: PathBuf, json: bool) -> Result<()> {
    let store = Store::open_ro(&path)?;
    let st = store.stats();
    store.close()?;

    if json {
        println!("{}", serde_json::to_string(&st)?);
        return Ok(());
    }

    println!("Store {}:", path.display());
    println!("  file_len   = {}", st.file_len);
    println!("  frames     = {}", st.frames);
    println!("  last_txid  = {}", st.last_txid);
    println!("  buckets    = {}", st.buckets);
    println!("  keys       = {}", st.keys);
    Ok(())
}
