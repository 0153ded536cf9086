use anyhow::{anyhow, Result};
use std::path::PathBuf;

use NestDB::copy::create_path;
use NestDB::Store;

use super::util::{bucket_path, decode_value_arg, read_all};

pub fn exec(
    path: PathBuf,
    bucket: Vec<String>,
    key: String,
    value: Option<String>,
    value_file: Option<PathBuf>,
) -> Result<()> {
    let val_bytes = match (value, value_file) {
        (_, Some(p)) => read_all(&p)?,
        (Some(s), None) => decode_value_arg(&s)?,
        (None, None) => return Err(anyhow!("either --value or --value-file must be provided")),
    };

    let bp = bucket_path(&bucket);
    let mut store = Store::open(&path)?;
    store.update(|tx| {
        let mut b = create_path(tx, &bp)?;
        b.put(key.as_bytes(), &val_bytes)
    })?;
    store.close()?;
    println!(
        "OK put: bucket={} key='{}', value={} B",
        bp,
        key,
        val_bytes.len()
    );
    Ok(())
}
