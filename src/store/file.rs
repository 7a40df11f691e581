// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! On-disk container for a `MemoryStore`.
//!
//! A fixed header, a brotli-compressed newline-delimited-JSON body (one
//! `SequenceRecord` per line), and a trailing CRC32 footer over the
//! compressed body for corruption detection — a header/body/footer shape
//! at a fraction of the section count a multi-kind binary format would
//! need, since we only ever store one kind of record.

use crate::error::MatcherError;
use crate::record::SequenceRecord;
use crate::store::MemoryStore;
use std::io::{Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"OEM1";

/// Write `records` to `path` as a compressed, checksummed container.
pub fn write_store(path: &Path, records: &[SequenceRecord]) -> std::io::Result<()> {
    let mut body = Vec::new();
    for rec in records {
        serde_json::to_writer(&mut body, rec)?;
        body.push(b'\n');
    }

    let mut compressed = Vec::new();
    {
        let mut writer = brotli::CompressorWriter::new(&mut compressed, 4096, 9, 22);
        writer.write_all(&body)?;
    }

    let checksum = crc32fast::hash(&compressed);

    let mut out = Vec::with_capacity(compressed.len() + 16);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&(records.len() as u32).to_le_bytes());
    out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
    out.extend_from_slice(&compressed);
    out.extend_from_slice(&checksum.to_le_bytes());

    std::fs::write(path, out)
}

/// Read a container written by `write_store` back into a `MemoryStore`.
///
/// Malformed individual records are skipped, not fatal (spec section 7);
/// a missing or truncated file is `MatcherError::IndexMissing`.
pub fn open_store(path: &Path) -> Result<MemoryStore, MatcherError> {
    let data = std::fs::read(path).map_err(|_| MatcherError::IndexMissing {
        path: path.to_path_buf(),
    })?;

    if data.len() < 12 || &data[0..4] != MAGIC {
        return Err(MatcherError::IndexMissing { path: path.to_path_buf() });
    }
    let record_count = u32::from_le_bytes(data[4..8].try_into().unwrap()) as usize;
    let body_len = u32::from_le_bytes(data[8..12].try_into().unwrap()) as usize;
    if data.len() < 12 + body_len + 4 {
        return Err(MatcherError::IndexMissing { path: path.to_path_buf() });
    }
    let compressed = &data[12..12 + body_len];
    let footer = &data[12 + body_len..12 + body_len + 4];
    let expected = u32::from_le_bytes(footer.try_into().unwrap());
    if crc32fast::hash(compressed) != expected {
        return Err(MatcherError::IndexMissing { path: path.to_path_buf() });
    }

    let mut body = Vec::new();
    brotli::Decompressor::new(compressed, 4096)
        .read_to_end(&mut body)
        .map_err(|_| MatcherError::IndexMissing { path: path.to_path_buf() })?;

    let text = String::from_utf8_lossy(&body);
    let mut records = Vec::with_capacity(record_count);
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<SequenceRecord>(line) {
            Ok(rec) => records.push(rec),
            Err(_) => continue, // malformed record: skipped, not fatal (spec section 7)
        }
    }

    Ok(MemoryStore::new(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn round_trips_through_disk() {
        let records = vec![
            SequenceRecord::new("A1".into(), vec![BigInt::from(1), BigInt::from(2), BigInt::from(3)], Some("ones and twos".into()), None),
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.oeismatch");
        write_store(&path, &records).unwrap();
        let store = open_store(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].id, "A1");
    }

    #[test]
    fn missing_file_is_index_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.oeismatch");
        assert!(matches!(open_store(&path), Err(MatcherError::IndexMissing { .. })));
    }
}
