//! The index region: a flat array of fixed-width `{hash, offset, size}` records.
//!
//! # Layout
//! Each record is 12 bytes, strictly little-endian, with no header and no
//! padding:
//!
//! | Offset | Size | Field           |
//! |--------|------|-----------------|
//! | 0      | 4    | `identity_hash` |
//! | 4      | 4    | `offset`        |
//! | 8      | 4    | `size`          |
//!
//! The record count is implied by the region length divided by
//! [`INDEX_ENTRY_SIZE`].  Records are kept in build order; lookup is a
//! linear scan where the first matching hash wins.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::error::{raise, EmbedError, Result};
use crate::hash::identity_hash;

/// On-disk width of one [`IndexEntry`].
pub const INDEX_ENTRY_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub identity_hash: u32,
    pub offset:        u32,
    pub size:          u32,
}

impl IndexEntry {
    /// One past the last blob byte covered by this entry.
    pub fn end(&self) -> u64 {
        self.offset as u64 + self.size as u64
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.identity_hash)?;
        writer.write_u32::<LittleEndian>(self.offset)?;
        writer.write_u32::<LittleEndian>(self.size)?;
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        Ok(Self {
            identity_hash: reader.read_u32::<LittleEndian>()?,
            offset:        reader.read_u32::<LittleEndian>()?,
            size:          reader.read_u32::<LittleEndian>()?,
        })
    }

    /// Decode from exactly [`INDEX_ENTRY_SIZE`] bytes.
    fn decode(record: &[u8]) -> Self {
        Self {
            identity_hash: LittleEndian::read_u32(&record[0..4]),
            offset:        LittleEndian::read_u32(&record[4..8]),
            size:          LittleEndian::read_u32(&record[8..12]),
        }
    }
}

// ── Owned index (build side) ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    pub entries: Vec<IndexEntry>,
}

impl Index {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: IndexEntry) {
        self.entries.push(entry);
    }

    /// First entry whose hash matches `name`'s identity hash.
    pub fn lookup(&self, name: &str) -> Option<&IndexEntry> {
        let hash = identity_hash(name);
        self.entries.iter().find(|e| e.identity_hash == hash)
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for entry in &self.entries {
            entry.write(&mut writer)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.entries.len() * INDEX_ENTRY_SIZE);
        self.write(&mut buf).expect("io::Write for Vec<u8> never returns an error");
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let view = IndexView::new(bytes)?;
        Ok(Self { entries: view.iter().collect() })
    }
}

// ── Zero-copy view (runtime side) ────────────────────────────────────────────

/// Borrowed, allocation-free view over an index region resident in memory.
#[derive(Debug, Clone, Copy)]
pub struct IndexView<'a> {
    bytes: &'a [u8],
}

impl<'a> IndexView<'a> {
    /// Fails with `IndexCorrupt` when the region is not a whole number of records.
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() % INDEX_ENTRY_SIZE != 0 {
            return Err(raise(EmbedError::IndexCorrupt(format!(
                "index region is {} bytes, not a multiple of {}",
                bytes.len(),
                INDEX_ENTRY_SIZE
            ))));
        }
        Ok(Self { bytes })
    }

    pub const fn empty() -> IndexView<'static> {
        IndexView { bytes: &[] }
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / INDEX_ENTRY_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn get(&self, position: usize) -> Option<IndexEntry> {
        let start = position.checked_mul(INDEX_ENTRY_SIZE)?;
        let record = self.bytes.get(start..start + INDEX_ENTRY_SIZE)?;
        Some(IndexEntry::decode(record))
    }

    pub fn iter(&self) -> impl Iterator<Item = IndexEntry> + 'a {
        let bytes = self.bytes;
        bytes.chunks_exact(INDEX_ENTRY_SIZE).map(IndexEntry::decode)
    }

    /// First entry (and its position) whose hash equals `hash`.
    pub fn find_hash(&self, hash: u32) -> Option<(usize, IndexEntry)> {
        self.iter().enumerate().find(|(_, e)| e.identity_hash == hash)
    }

    /// Resolve a logical name, failing with `NotFound` on a miss.
    pub fn lookup(&self, name: &str) -> Result<IndexEntry> {
        self.find_hash(identity_hash(name))
            .map(|(_, entry)| entry)
            .ok_or_else(|| raise(EmbedError::NotFound { name: name.to_owned() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{last_error, ErrorKind};

    fn entry(name: &str, offset: u32, size: u32) -> IndexEntry {
        IndexEntry { identity_hash: identity_hash(name), offset, size }
    }

    #[test]
    fn record_layout_is_little_endian() {
        let e = IndexEntry { identity_hash: 0x0403_0201, offset: 0x0807_0605, size: 0x0c0b_0a09 };
        let mut buf = Vec::new();
        e.write(&mut buf).unwrap();
        assert_eq!(buf, (1u8..=12).collect::<Vec<_>>());
        assert_eq!(IndexEntry::read(&buf[..]).unwrap(), e);
    }

    #[test]
    fn view_reads_what_index_wrote() {
        let mut idx = Index::default();
        idx.push(entry("a.txt", 0, 5));
        idx.push(entry("b.txt", 5, 7));
        let bytes = idx.to_bytes();
        assert_eq!(bytes.len(), 2 * INDEX_ENTRY_SIZE);

        let view = IndexView::new(&bytes).unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(view.get(1), Some(entry("b.txt", 5, 7)));
        assert_eq!(view.get(2), None);
        assert_eq!(view.lookup("a.txt").unwrap(), entry("a.txt", 0, 5));
        assert_eq!(Index::from_bytes(&bytes).unwrap(), idx);
    }

    #[test]
    fn to_bytes_matches_streamed_write() {
        let mut idx = Index::default();
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            idx.push(entry(name, i as u32 * 4, 4));
        }
        let mut streamed = Vec::new();
        idx.write(&mut streamed).unwrap();
        assert_eq!(idx.to_bytes(), streamed);
        assert_eq!(idx.to_bytes().len(), 3 * INDEX_ENTRY_SIZE);
        assert!(Index::default().to_bytes().is_empty());
    }

    #[test]
    fn first_match_wins_on_duplicate_hash() {
        let mut idx = Index::default();
        idx.push(entry("same", 0, 1));
        idx.push(entry("same", 1, 2));
        let bytes = idx.to_bytes();
        let view = IndexView::new(&bytes).unwrap();
        assert_eq!(view.lookup("same").unwrap().offset, 0);
        assert_eq!(idx.lookup("same").unwrap().offset, 0);
    }

    #[test]
    fn miss_sets_not_found() {
        let view = IndexView::new(&[]).unwrap();
        assert!(view.is_empty());
        let err = view.lookup("nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(last_error(), ErrorKind::NotFound);
    }

    #[test]
    fn ragged_region_is_corrupt() {
        let err = IndexView::new(&[0u8; 13]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexCorrupt);
    }
}
