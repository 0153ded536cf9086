//! Общие константы формата файла хранилища и инструмента копирования.

// -------- File header --------
pub const STORE_MAGIC: &[u8; 8] = b"NESTDB01";
pub const STORE_VERSION: u32 = 1;
pub const STORE_HDR_SIZE: usize = 16; // [magic8][ver u32][reserved u32]

pub const STORE_HDR_OFF_VERSION: usize = 8;

// -------- Commit frames --------
// [txid u64][len u32][flags u32][crc32c u32] — CRC по header[0..16) + payload.
pub const FRAME_HDR_SIZE: usize = 20;

pub const FRAME_OFF_TXID: usize = 0;
pub const FRAME_OFF_LEN: usize = 8;
pub const FRAME_OFF_FLAGS: usize = 12;
pub const FRAME_OFF_CRC32: usize = 16;

// -------- Ops inside a frame payload --------
pub const OP_CREATE_BUCKET: u8 = 1;
pub const OP_DELETE_BUCKET: u8 = 2;
pub const OP_PUT: u8 = 3;
pub const OP_DELETE: u8 = 4;

// -------- Limits --------
pub const MAX_KEY_SIZE: usize = 32768;
pub const MAX_VALUE_SIZE: usize = u32::MAX as usize;
pub const MAX_PATH_DEPTH: usize = u16::MAX as usize;

// -------- Copy tool --------
/// Префикс имени файла назначения по умолчанию.
pub const DEFAULT_DEST_PREFIX: &str = "newcopy_";
