//! store/journal — заголовок файла хранилища и кадры коммитов (NESTDB01).
//!
//! Формат:
//! - [0..16)  file header: MAGIC8 "NESTDB01", u32 version, u32 reserved;
//! - далее кадры: [txid u64][len u32][flags u32][crc32c u32][payload len байт].
//!   CRC32C считается по header[0..FRAME_OFF_CRC32) + payload.
//!
//! Чтение толерантно только к частичному хвосту: незавершённый последний кадр
//! или CRC mismatch в последнем кадре — это конец журнала (Ok(None)). Решение
//! об усечении принимает вызывающий код (writer усечёт, reader — нет).
//! Битый кадр, за которым в файле есть ещё байты, — порча журнала (Err).

use anyhow::{anyhow, bail, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::consts::{
    FRAME_HDR_SIZE, FRAME_OFF_CRC32, FRAME_OFF_FLAGS, FRAME_OFF_LEN, FRAME_OFF_TXID,
    STORE_HDR_OFF_VERSION, STORE_HDR_SIZE, STORE_MAGIC, STORE_VERSION,
};

/// Один валидный кадр журнала.
#[derive(Debug)]
pub struct Frame {
    pub txid: u64,
    pub payload: Vec<u8>,
    /// Позиция начала заголовка кадра.
    pub pos: u64,
    /// Заголовок + payload.
    pub len_total: u64,
}

#[inline]
pub fn crc32c_of_parts(head_without_crc: &[u8], payload: &[u8]) -> u32 {
    let c = crc32c::crc32c_append(0, head_without_crc);
    crc32c::crc32c_append(c, payload)
}

/// Записать заголовок файла хранилища в начало файла.
pub fn write_file_header(f: &mut File) -> Result<()> {
    let mut hdr = [0u8; STORE_HDR_SIZE];
    hdr[..8].copy_from_slice(STORE_MAGIC);
    LittleEndian::write_u32(
        &mut hdr[STORE_HDR_OFF_VERSION..STORE_HDR_OFF_VERSION + 4],
        STORE_VERSION,
    );
    f.seek(SeekFrom::Start(0))?;
    f.write_all(&hdr)?;
    Ok(())
}

/// Проверить заголовок файла (magic + версия).
pub fn check_file_header(f: &mut File) -> Result<()> {
    if f.metadata()?.len() < STORE_HDR_SIZE as u64 {
        bail!("store file too small (< header)");
    }
    let mut hdr = [0u8; STORE_HDR_SIZE];
    f.seek(SeekFrom::Start(0))?;
    f.read_exact(&mut hdr)?;
    if &hdr[..8] != STORE_MAGIC {
        bail!("bad store magic (not a NestDB file)");
    }
    let ver = LittleEndian::read_u32(&hdr[STORE_HDR_OFF_VERSION..STORE_HDR_OFF_VERSION + 4]);
    if ver != STORE_VERSION {
        bail!("unsupported store version {} (expected {})", ver, STORE_VERSION);
    }
    Ok(())
}

/// Построить заголовок кадра с заполненным CRC32C.
pub fn build_frame_hdr(txid: u64, flags: u32, payload: &[u8]) -> [u8; FRAME_HDR_SIZE] {
    let mut hdr = [0u8; FRAME_HDR_SIZE];
    LittleEndian::write_u64(&mut hdr[FRAME_OFF_TXID..FRAME_OFF_TXID + 8], txid);
    LittleEndian::write_u32(
        &mut hdr[FRAME_OFF_LEN..FRAME_OFF_LEN + 4],
        payload.len() as u32,
    );
    LittleEndian::write_u32(&mut hdr[FRAME_OFF_FLAGS..FRAME_OFF_FLAGS + 4], flags);
    let crc = crc32c_of_parts(&hdr[..FRAME_OFF_CRC32], payload);
    LittleEndian::write_u32(&mut hdr[FRAME_OFF_CRC32..FRAME_OFF_CRC32 + 4], crc);
    hdr
}

/// Записать один кадр [header][payload] в текущую позицию writer'а.
/// Не делает seek(End) — позиция на ответственности вызывающего кода.
pub fn write_frame<W: Write>(writer: &mut W, txid: u64, payload: &[u8]) -> Result<u64> {
    if payload.len() > u32::MAX as usize {
        return Err(anyhow!(
            "payload too large for a commit frame: {} bytes (max {})",
            payload.len(),
            u32::MAX
        ));
    }
    let hdr = build_frame_hdr(txid, 0, payload);
    // Один write_all на кадр: меньше шансов получить разорванный заголовок.
    let mut buf = Vec::with_capacity(FRAME_HDR_SIZE + payload.len());
    buf.extend_from_slice(&hdr);
    buf.extend_from_slice(payload);
    writer.write_all(&buf)?;
    Ok(buf.len() as u64)
}

/// Считать следующий кадр с позиции pos. file_len — текущая длина файла.
///
/// Возвращает:
/// * Ok(Some(frame)) — кадр прочитан и валиден, следующий начинается с pos + len_total;
/// * Ok(None) — EOF, частичный хвост или CRC mismatch в последнем кадре;
/// * Err(e) — I/O ошибка или битый кадр посреди журнала.
pub fn read_next_frame(f: &mut File, pos: u64, file_len: u64) -> Result<Option<Frame>> {
    if pos + FRAME_HDR_SIZE as u64 > file_len {
        return Ok(None);
    }

    f.seek(SeekFrom::Start(pos))?;
    let mut hdr = [0u8; FRAME_HDR_SIZE];
    f.read_exact(&mut hdr)?;

    let payload_len = LittleEndian::read_u32(&hdr[FRAME_OFF_LEN..FRAME_OFF_LEN + 4]) as u64;
    let len_total = FRAME_HDR_SIZE as u64 + payload_len;
    if pos + len_total > file_len {
        log::debug!(
            "journal: partial frame tail at off={}, need {} bytes, have {}",
            pos,
            len_total,
            file_len - pos
        );
        return Ok(None);
    }

    let mut payload = vec![0u8; payload_len as usize];
    f.read_exact(&mut payload)?;

    let crc_expected = LittleEndian::read_u32(&hdr[FRAME_OFF_CRC32..FRAME_OFF_CRC32 + 4]);
    let crc_actual = crc32c_of_parts(&hdr[..FRAME_OFF_CRC32], &payload);
    if crc_actual != crc_expected {
        if pos + len_total < file_len {
            bail!(
                "corrupt journal at off={}: CRC mismatch (expected={}, actual={}), {} bytes follow",
                pos,
                crc_expected,
                crc_actual,
                file_len - pos - len_total
            );
        }
        log::warn!(
            "journal: CRC mismatch in last frame at off={}, expected={}, actual={}, stop",
            pos,
            crc_expected,
            crc_actual
        );
        return Ok(None);
    }

    Ok(Some(Frame {
        txid: LittleEndian::read_u64(&hdr[FRAME_OFF_TXID..FRAME_OFF_TXID + 8]),
        payload,
        pos,
        len_total,
    }))
}
