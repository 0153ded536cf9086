use std::path::Path;

#[cfg(unix)]
use std::fs::File;

/// Человекочитаемое отображение имени/ключа: UTF-8 как есть, иначе — размер.
pub fn display_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => format!("(binary {} B)", bytes.len()),
    }
}

pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            if i % 16 == 0 {
                out.push('\n');
            } else {
                out.push(' ');
            }
        }
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Размер файла или 0, если файла нет.
pub fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// fsync родительского каталога (best-effort на не-unix).
#[cfg(unix)]
pub fn fsync_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            let dir = File::open(parent)?;
            dir.sync_all()?;
        }
    }
    Ok(())
}
#[cfg(not(unix))]
pub fn fsync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Разбор булевого ENV-флага: "1|true|yes|on" => true, "0|false|no|off" => false.
pub fn env_flag(name: &str) -> Option<bool> {
    let v = std::env::var(name).ok()?;
    let s = v.trim().to_ascii_lowercase();
    match s.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_text_renders_binary_as_size() {
        assert_eq!(display_text(b"alpha"), "alpha");
        assert_eq!(display_text(&[0xff, 0xfe, 0x00]), "(binary 3 B)");
    }

    #[test]
    fn hex_helpers() {
        assert_eq!(hex_dump(&[0xde, 0xad, 0x01]), "de ad 01");
        let dump = hex_dump(&[0u8; 17]);
        assert_eq!(dump.lines().count(), 2);
    }
}
