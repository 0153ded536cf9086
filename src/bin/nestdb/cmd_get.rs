use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use NestDB::copy::lookup_path_ro;
use NestDB::util::{display_text, hex_dump};
use NestDB::Store;

use super::util::bucket_path;

pub fn exec(path: PathBuf, bucket: Vec<String>, key: String, out: Option<PathBuf>) -> Result<()> {
    let bp = bucket_path(&bucket);
    let store = Store::open_ro(&path)?;
    let found = store.view(|tx| {
        Ok(lookup_path_ro(tx, &bp)
            .and_then(|b| b.get(key.as_bytes()))
            .map(|v| v.to_vec()))
    })?;

    match found {
        Some(v) => {
            if let Some(out_path) = out {
                let mut f = OpenOptions::new()
                    .create(true)
                    .truncate(true)
                    .write(true)
                    .open(&out_path)?;
                f.write_all(&v)?;
                f.sync_all()?;
                println!(
                    "FOUND {} '{}': {} B -> wrote to {}",
                    bp,
                    key,
                    v.len(),
                    out_path.display()
                );
            } else {
                println!("FOUND {} '{}': {} B", bp, key, v.len());
                println!("text: {}", display_text(&v));
                println!("hex:  {}", hex_dump(&v[..v.len().min(64)]));
            }
        }
        None => println!("NOT FOUND {} '{}'", bp, key),
    }
    Ok(())
}
