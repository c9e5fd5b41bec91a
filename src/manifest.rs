//! JSON sidecar that names every embedded file.
//!
//! The index stores only identity hashes, so the manifest is what lets
//! tooling list embedded files by name and check an artifact pair for
//! damage.  It is never needed at runtime and does not change the index or
//! blob layout.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fs::EmbeddedFs;
use crate::hash::identity_hash;
use crate::index::IndexEntry;

pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub name:          String,
    pub identity_hash: u32,
    pub offset:        u32,
    pub size:          u32,
    /// BLAKE3 of the file's bytes, hex encoded.
    pub digest:        String,
}

impl ManifestEntry {
    pub fn new(name: String, entry: IndexEntry, data: &[u8]) -> Self {
        Self {
            name,
            identity_hash: entry.identity_hash,
            offset:        entry.offset,
            size:          entry.size,
            digest:        digest_hex(data),
        }
    }

    pub fn index_entry(&self) -> IndexEntry {
        IndexEntry { identity_hash: self.identity_hash, offset: self.offset, size: self.size }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub version: u32,
    pub entries: Vec<ManifestEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self { version: MANIFEST_VERSION, entries: Vec::new() }
    }
}

/// One problem found by [`Manifest::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// The index has no record at this entry's position.
    Missing { name: String, position: usize },
    /// The stored hash does not match the name under the current constants.
    HashMismatch { name: String },
    /// The index record differs from the manifest's.
    EntryMismatch { name: String, expected: IndexEntry, actual: IndexEntry },
    /// The blob bytes no longer match the recorded digest.
    DigestMismatch { name: String },
    /// Lookup by name resolves to an earlier record with the same hash.
    Shadowed { name: String, position: usize, resolved: usize },
    /// Index records the manifest does not describe.
    Unlisted { count: usize },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Missing { name, position } =>
                write!(f, "{name}: no index record at position {position}"),
            Finding::HashMismatch { name } =>
                write!(f, "{name}: stored identity hash does not match the name"),
            Finding::EntryMismatch { name, expected, actual } => write!(
                f,
                "{name}: index has {:08x} @{}+{}, manifest has {:08x} @{}+{}",
                actual.identity_hash, actual.offset, actual.size,
                expected.identity_hash, expected.offset, expected.size,
            ),
            Finding::DigestMismatch { name } =>
                write!(f, "{name}: blob content does not match digest"),
            Finding::Shadowed { name, position, resolved } =>
                write!(f, "{name}: record {position} is shadowed by record {resolved}"),
            Finding::Unlisted { count } =>
                write!(f, "{count} index record(s) not described by the manifest"),
        }
    }
}

impl Manifest {
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn push(&mut self, entry: ManifestEntry) {
        self.entries.push(entry);
    }

    /// Name recorded for the index record at `position`.
    pub fn name_at(&self, position: usize) -> Option<&str> {
        self.entries.get(position).map(|e| e.name.as_str())
    }

    /// Check an artifact pair against this manifest.  An empty result means
    /// every described file is intact and reachable by name.
    pub fn verify(&self, fs: &EmbeddedFs<'_>) -> Vec<Finding> {
        let index = fs.index();
        let mut findings = Vec::new();

        for (position, me) in self.entries.iter().enumerate() {
            let name = &me.name;
            let Some(actual) = index.get(position) else {
                findings.push(Finding::Missing { name: name.clone(), position });
                continue;
            };
            if identity_hash(name) != me.identity_hash {
                findings.push(Finding::HashMismatch { name: name.clone() });
            }
            let expected = me.index_entry();
            if actual != expected {
                findings.push(Finding::EntryMismatch { name: name.clone(), expected, actual });
                continue;
            }
            let data = &fs.blob()[actual.offset as usize..actual.end() as usize];
            if digest_hex(data) != me.digest {
                findings.push(Finding::DigestMismatch { name: name.clone() });
            }
            if let Some((resolved, _)) = index.find_hash(identity_hash(name)) {
                if resolved != position {
                    findings.push(Finding::Shadowed { name: name.clone(), position, resolved });
                }
            }
        }

        if index.len() > self.entries.len() {
            findings.push(Finding::Unlisted { count: index.len() - self.entries.len() });
        }
        findings
    }
}

pub fn digest_hex(data: &[u8]) -> String {
    hex::encode(blake3::hash(data).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::Embedder;

    #[test]
    fn json_roundtrip() {
        let mut e = Embedder::new();
        e.add_file("a.txt", b"alpha").unwrap();
        let built = e.finish();
        let bytes = built.manifest.to_bytes().unwrap();
        let back = Manifest::from_bytes(&bytes).unwrap();
        assert_eq!(back, built.manifest);
        assert_eq!(back.name_at(0), Some("a.txt"));
        assert_eq!(back.entries[0].digest, digest_hex(b"alpha"));
    }

    #[test]
    fn clean_artifacts_verify() {
        let mut e = Embedder::new();
        e.add_file("a.txt", b"alpha").unwrap();
        e.add_file("b.txt", b"beta").unwrap();
        let built = e.finish();
        let index = built.index.to_bytes();
        let fs = EmbeddedFs::new(&index, &built.blob).unwrap();
        assert!(built.manifest.verify(&fs).is_empty());
    }

    #[test]
    fn flipped_blob_byte_is_reported() {
        let mut e = Embedder::new();
        e.add_file("a.txt", b"alpha").unwrap();
        let mut built = e.finish();
        built.blob[0] ^= 0xff;
        let index = built.index.to_bytes();
        let fs = EmbeddedFs::new(&index, &built.blob).unwrap();
        assert_eq!(
            built.manifest.verify(&fs),
            vec![Finding::DigestMismatch { name: "a.txt".into() }]
        );
    }

    #[test]
    fn duplicate_name_is_shadowed() {
        let mut e = Embedder::new();
        e.add_file("same.txt", b"first").unwrap();
        e.add_file("same.txt", b"second").unwrap();
        let built = e.finish();
        let index = built.index.to_bytes();
        let fs = EmbeddedFs::new(&index, &built.blob).unwrap();
        assert_eq!(
            built.manifest.verify(&fs),
            vec![Finding::Shadowed { name: "same.txt".into(), position: 1, resolved: 0 }]
        );
    }

    #[test]
    fn truncated_index_is_reported() {
        let mut e = Embedder::new();
        e.add_file("a.txt", b"alpha").unwrap();
        e.add_file("b.txt", b"beta").unwrap();
        let built = e.finish();
        let index = built.index.to_bytes();
        let fs = EmbeddedFs::new(&index[..12], &built.blob).unwrap();
        assert_eq!(
            built.manifest.verify(&fs),
            vec![Finding::Missing { name: "b.txt".into(), position: 1 }]
        );
    }
}
