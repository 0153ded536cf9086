//! store/ops — журнальные операции: кодирование, применение к дереву и откат.
//!
//! Payload кадра (LE):
//!   u32 count
//!   count × op:
//!     u8 kind
//!     path: u16 depth, depth × (u16 len + bytes)
//!     kind-specific: name/key (u16 len + bytes), value (u32 len + bytes)
//!
//! Каждая операция адресует родительский бакет полным путём от корня, поэтому
//! кадр самодостаточен и применяется к дереву без внешнего контекста.

use anyhow::{anyhow, bail, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

use crate::consts::{
    MAX_KEY_SIZE, MAX_PATH_DEPTH, MAX_VALUE_SIZE, OP_CREATE_BUCKET, OP_DELETE, OP_DELETE_BUCKET,
    OP_PUT,
};
use crate::util::display_text;

use super::node::{BucketNode, Node};

pub type BucketPath = Vec<Vec<u8>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    CreateBucket { path: BucketPath, name: Vec<u8> },
    DeleteBucket { path: BucketPath, name: Vec<u8> },
    Put { path: BucketPath, key: Vec<u8>, value: Vec<u8> },
    Delete { path: BucketPath, key: Vec<u8> },
}

/// Запись отката: что вернуть в родительский бакет при rollback.
#[derive(Debug)]
pub enum Undo {
    Remove { path: BucketPath, name: Vec<u8> },
    Restore { path: BucketPath, name: Vec<u8>, prev: Node },
}

pub fn validate_name(kind: &str, name: &[u8]) -> Result<()> {
    if name.is_empty() {
        bail!("{} required (empty)", kind);
    }
    if name.len() > MAX_KEY_SIZE {
        bail!("{} too large: {} bytes (max {})", kind, name.len(), MAX_KEY_SIZE);
    }
    Ok(())
}

fn path_text(path: &[Vec<u8>]) -> String {
    let parts: Vec<String> = path.iter().map(|n| display_text(n)).collect();
    format!("[{}]", parts.join(" "))
}

fn parent_mut<'a>(root: &'a mut BucketNode, path: &[Vec<u8>]) -> Result<&'a mut BucketNode> {
    root.walk_mut(path)
        .ok_or_else(|| anyhow!("bucket not found: {}", path_text(path)))
}

impl Op {
    pub fn path(&self) -> &[Vec<u8>] {
        match self {
            Op::CreateBucket { path, .. }
            | Op::DeleteBucket { path, .. }
            | Op::Put { path, .. }
            | Op::Delete { path, .. } => path,
        }
    }

    /// Применить операцию к дереву. Возвращает запись отката (None — дерево не изменилось).
    pub fn apply(&self, root: &mut BucketNode) -> Result<Option<Undo>> {
        match self {
            Op::CreateBucket { path, name } => {
                validate_name("bucket name", name)?;
                let parent = parent_mut(root, path)?;
                match parent.children.get(name.as_slice()) {
                    Some(Node::Bucket(_)) => {
                        bail!("bucket already exists: {}", display_text(name))
                    }
                    Some(Node::Value(_)) => bail!(
                        "incompatible value: {} is a key, not a bucket",
                        display_text(name)
                    ),
                    None => {}
                }
                parent
                    .children
                    .insert(name.clone(), Node::Bucket(BucketNode::new()));
                Ok(Some(Undo::Remove {
                    path: path.clone(),
                    name: name.clone(),
                }))
            }
            Op::DeleteBucket { path, name } => {
                let parent = parent_mut(root, path)?;
                match parent.children.get(name.as_slice()) {
                    Some(Node::Bucket(_)) => {}
                    Some(Node::Value(_)) => bail!(
                        "incompatible value: {} is a key, not a bucket",
                        display_text(name)
                    ),
                    None => bail!("bucket not found: {}", display_text(name)),
                }
                let prev = parent
                    .children
                    .remove(name.as_slice())
                    .ok_or_else(|| anyhow!("bucket not found: {}", display_text(name)))?;
                Ok(Some(Undo::Restore {
                    path: path.clone(),
                    name: name.clone(),
                    prev,
                }))
            }
            Op::Put { path, key, value } => {
                if path.is_empty() {
                    bail!("keys cannot be stored at the root, open a bucket first");
                }
                validate_name("key", key)?;
                if value.len() > MAX_VALUE_SIZE {
                    bail!("value too large: {} bytes", value.len());
                }
                let parent = parent_mut(root, path)?;
                if let Some(Node::Bucket(_)) = parent.children.get(key.as_slice()) {
                    bail!(
                        "incompatible value: {} is a bucket, not a key",
                        display_text(key)
                    );
                }
                let prev = parent
                    .children
                    .insert(key.clone(), Node::Value(value.clone()));
                Ok(Some(match prev {
                    Some(prev) => Undo::Restore {
                        path: path.clone(),
                        name: key.clone(),
                        prev,
                    },
                    None => Undo::Remove {
                        path: path.clone(),
                        name: key.clone(),
                    },
                }))
            }
            Op::Delete { path, key } => {
                let parent = parent_mut(root, path)?;
                match parent.children.get(key.as_slice()) {
                    Some(Node::Bucket(_)) => bail!(
                        "incompatible value: {} is a bucket, not a key",
                        display_text(key)
                    ),
                    None => return Ok(None),
                    Some(Node::Value(_)) => {}
                }
                Ok(parent
                    .children
                    .remove(key.as_slice())
                    .map(|prev| Undo::Restore {
                        path: path.clone(),
                        name: key.clone(),
                        prev,
                    }))
            }
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) -> Result<()> {
        let (kind, path) = match self {
            Op::CreateBucket { path, .. } => (OP_CREATE_BUCKET, path),
            Op::DeleteBucket { path, .. } => (OP_DELETE_BUCKET, path),
            Op::Put { path, .. } => (OP_PUT, path),
            Op::Delete { path, .. } => (OP_DELETE, path),
        };
        out.write_u8(kind)?;
        if path.len() > MAX_PATH_DEPTH {
            bail!("bucket path too deep: {} (max {})", path.len(), MAX_PATH_DEPTH);
        }
        out.write_u16::<LittleEndian>(path.len() as u16)?;
        for name in path {
            write_short(out, name)?;
        }
        match self {
            Op::CreateBucket { name, .. } | Op::DeleteBucket { name, .. } => {
                write_short(out, name)?
            }
            Op::Put { key, value, .. } => {
                write_short(out, key)?;
                if value.len() > MAX_VALUE_SIZE {
                    bail!("value too large: {} bytes", value.len());
                }
                out.write_u32::<LittleEndian>(value.len() as u32)?;
                out.extend_from_slice(value);
            }
            Op::Delete { key, .. } => write_short(out, key)?,
        }
        Ok(())
    }

    fn decode_from(cur: &mut Cursor<&[u8]>) -> Result<Op> {
        let kind = cur.read_u8()?;
        let depth = cur.read_u16::<LittleEndian>()? as usize;
        let mut path = Vec::with_capacity(depth);
        for _ in 0..depth {
            path.push(read_short(cur)?);
        }
        let op = match kind {
            OP_CREATE_BUCKET => Op::CreateBucket {
                path,
                name: read_short(cur)?,
            },
            OP_DELETE_BUCKET => Op::DeleteBucket {
                path,
                name: read_short(cur)?,
            },
            OP_PUT => {
                let key = read_short(cur)?;
                let vlen = cur.read_u32::<LittleEndian>()? as usize;
                let value = read_exact_vec(cur, vlen)?;
                Op::Put { path, key, value }
            }
            OP_DELETE => Op::Delete {
                path,
                key: read_short(cur)?,
            },
            other => bail!("unknown op kind {}", other),
        };
        Ok(op)
    }
}

impl Undo {
    /// Откатить одну запись. Вызывается в обратном порядке применения.
    pub fn revert(self, root: &mut BucketNode) {
        match self {
            Undo::Remove { path, name } => {
                if let Some(parent) = root.walk_mut(&path) {
                    parent.children.remove(name.as_slice());
                }
            }
            Undo::Restore { path, name, prev } => {
                if let Some(parent) = root.walk_mut(&path) {
                    parent.children.insert(name, prev);
                }
            }
        }
    }
}

fn write_short(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    if bytes.len() > u16::MAX as usize {
        bail!("name too long for op encoding: {} bytes", bytes.len());
    }
    out.write_u16::<LittleEndian>(bytes.len() as u16)?;
    out.extend_from_slice(bytes);
    Ok(())
}

fn read_short(cur: &mut Cursor<&[u8]>) -> Result<Vec<u8>> {
    let len = cur.read_u16::<LittleEndian>()? as usize;
    read_exact_vec(cur, len)
}

fn read_exact_vec(cur: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>> {
    let remaining = cur.get_ref().len() as u64 - cur.position();
    if len as u64 > remaining {
        bail!("op payload truncated: need {} bytes, have {}", len, remaining);
    }
    let mut buf = vec![0u8; len];
    cur.read_exact(&mut buf)?;
    Ok(buf)
}

/// Закодировать список операций одного коммита в payload кадра.
pub fn encode_ops(ops: &[Op]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.write_u32::<LittleEndian>(ops.len() as u32)?;
    for op in ops {
        op.encode_into(&mut out)?;
    }
    Ok(out)
}

pub fn decode_ops(payload: &[u8]) -> Result<Vec<Op>> {
    let mut cur = Cursor::new(payload);
    let count = cur.read_u32::<LittleEndian>()? as usize;
    let mut ops = Vec::with_capacity(count.min(4096));
    for i in 0..count {
        let op = Op::decode_from(&mut cur).map_err(|e| anyhow!("decode op #{}: {}", i, e))?;
        ops.push(op);
    }
    if cur.position() as usize != payload.len() {
        bail!(
            "trailing bytes in op payload: {} of {} consumed",
            cur.position(),
            payload.len()
        );
    }
    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(names: &[&str]) -> BucketPath {
        names.iter().map(|n| n.as_bytes().to_vec()).collect()
    }

    #[test]
    fn payload_decodes_back_to_same_ops() {
        let ops = vec![
            Op::CreateBucket {
                path: vec![],
                name: b"a".to_vec(),
            },
            Op::Put {
                path: p(&["a"]),
                key: b"k".to_vec(),
                value: vec![0u8, 1, 2, 255],
            },
            Op::Delete {
                path: p(&["a"]),
                key: b"k".to_vec(),
            },
            Op::DeleteBucket {
                path: vec![],
                name: b"a".to_vec(),
            },
        ];
        let payload = encode_ops(&ops).unwrap();
        assert_eq!(decode_ops(&payload).unwrap(), ops);
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let ops = vec![Op::Put {
            path: p(&["a"]),
            key: b"k".to_vec(),
            value: b"value".to_vec(),
        }];
        let payload = encode_ops(&ops).unwrap();
        assert!(decode_ops(&payload[..payload.len() - 2]).is_err());
    }

    #[test]
    fn put_over_bucket_is_incompatible_and_undo_restores() {
        let mut root = BucketNode::new();
        Op::CreateBucket {
            path: vec![],
            name: b"a".to_vec(),
        }
        .apply(&mut root)
        .unwrap();
        Op::CreateBucket {
            path: p(&["a"]),
            name: b"b".to_vec(),
        }
        .apply(&mut root)
        .unwrap();

        let err = Op::Put {
            path: p(&["a"]),
            key: b"b".to_vec(),
            value: b"1".to_vec(),
        }
        .apply(&mut root)
        .unwrap_err();
        assert!(err.to_string().contains("incompatible"));

        let undo = Op::Put {
            path: p(&["a"]),
            key: b"x".to_vec(),
            value: b"1".to_vec(),
        }
        .apply(&mut root)
        .unwrap()
        .unwrap();
        assert!(root.walk(&p(&["a"])).unwrap().child(b"x").is_some());
        undo.revert(&mut root);
        assert!(root.walk(&p(&["a"])).unwrap().child(b"x").is_none());
    }

    #[test]
    fn put_at_root_is_rejected() {
        let mut root = BucketNode::new();
        let op = Op::Put {
            path: vec![],
            key: b"k".to_vec(),
            value: vec![],
        };
        assert!(op.apply(&mut root).is_err());
    }
}
