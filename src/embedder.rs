//! Build-time side: pack input files into an index region and a blob region.
//!
//! [`Embedder`] accepts files one at a time, in order.  Each file's bytes are
//! appended to the blob and one [`IndexEntry`] is appended to the index;
//! nothing already embedded is ever rewritten.  [`Embedder::finish`] hands
//! back both regions plus a [`Manifest`], and [`Embedded::write_to`] saves
//! them next to each other:
//!
//! | File                 | Content                          |
//! |----------------------|----------------------------------|
//! | `<stem>.idx`         | index region (12-byte records)   |
//! | `<stem>.blob`        | blob region (raw bytes)          |
//! | `<stem>.manifest.json` | names and digests (optional)   |

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, error, warn};
use walkdir::WalkDir;

use crate::error::{raise, EmbedError, ErrorKind, Result};
use crate::hash::identity_hash;
use crate::index::{Index, IndexEntry};
use crate::manifest::{Manifest, ManifestEntry};

// ── EmbedOptions ─────────────────────────────────────────────────────────────

/// Configuration for an [`Embedder`] run.
#[derive(Debug, Clone)]
pub struct EmbedOptions {
    /// Removed from the front of input paths before they become logical names.
    pub strip_prefix:      Option<PathBuf>,
    /// Follow symbolic links while walking input directories.
    pub follow_links:      bool,
    /// Log and skip unreadable inputs instead of aborting the build.
    pub keep_going:        bool,
    /// Fail with `HashCollision` instead of letting the first name win.
    pub reject_collisions: bool,
    /// Write `<stem>.manifest.json` alongside the two regions.
    pub write_manifest:    bool,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            strip_prefix:      None,
            follow_links:      false,
            keep_going:        false,
            reject_collisions: false,
            write_manifest:    true,
        }
    }
}

// ── ArtifactPaths ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub index:    PathBuf,
    pub blob:     PathBuf,
    pub manifest: PathBuf,
}

impl ArtifactPaths {
    /// `stem` plus `.idx`, `.blob` and `.manifest.json`.
    pub fn from_stem<P: AsRef<Path>>(stem: P) -> Self {
        let with = |suffix: &str| {
            let mut s = OsString::from(stem.as_ref().as_os_str());
            s.push(suffix);
            PathBuf::from(s)
        };
        Self {
            index:    with(".idx"),
            blob:     with(".blob"),
            manifest: with(".manifest.json"),
        }
    }
}

// ── Embedded ─────────────────────────────────────────────────────────────────

/// Output of one embedder run.
#[derive(Debug, Clone, Default)]
pub struct Embedded {
    pub index:    Index,
    pub blob:     Vec<u8>,
    pub manifest: Manifest,
}

impl Embedded {
    /// Write the index and blob regions, and the manifest when asked to.
    pub fn write_to(&self, paths: &ArtifactPaths, with_manifest: bool) -> Result<()> {
        for dir in [&paths.index, &paths.blob].iter().filter_map(|p| p.parent()) {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let mut idx = BufWriter::new(File::create(&paths.index)?);
        self.index.write(&mut idx)?;
        idx.flush()?;

        fs::write(&paths.blob, &self.blob)?;

        if with_manifest {
            fs::write(&paths.manifest, self.manifest.to_bytes()?)?;
        }
        debug!(
            index = %paths.index.display(),
            blob = %paths.blob.display(),
            files = self.index.len(),
            bytes = self.blob.len(),
            "wrote artifacts"
        );
        Ok(())
    }
}

// ── Embedder ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Embedder {
    options:  EmbedOptions,
    index:    Index,
    blob:     Vec<u8>,
    manifest: Manifest,
    /// First logical name seen per identity hash.
    names:    HashMap<u32, String>,
}

impl Embedder {
    pub fn new() -> Self {
        Self::with_options(EmbedOptions::default())
    }

    pub fn with_options(options: EmbedOptions) -> Self {
        Self { options, ..Self::default() }
    }

    pub fn options(&self) -> &EmbedOptions {
        &self.options
    }

    /// Number of files embedded so far.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Append `data` under the logical name `name`.
    pub fn add_file(&mut self, name: &str, data: &[u8]) -> Result<IndexEntry> {
        let hash = identity_hash(name);

        if let Some(existing) = self.names.get(&hash) {
            if self.options.reject_collisions {
                return Err(raise(EmbedError::HashCollision {
                    name:     name.to_owned(),
                    existing: existing.clone(),
                    hash,
                }));
            }
            warn!(name, existing = %existing, hash = %format!("{hash:08x}"),
                  "identity hash already taken; lookups resolve to the earlier entry");
        }

        let offset = self.blob.len() as u64;
        let size = data.len() as u64;
        let overflow = || raise(EmbedError::OffsetOverflow { name: name.to_owned(), offset, size });
        if offset + size > u32::MAX as u64 {
            return Err(overflow());
        }
        let entry = IndexEntry {
            identity_hash: hash,
            offset:        u32::try_from(offset).map_err(|_| overflow())?,
            size:          u32::try_from(size).map_err(|_| overflow())?,
        };

        self.index.push(entry);
        self.blob.extend_from_slice(data);
        self.manifest.push(ManifestEntry::new(name.to_owned(), entry, data));
        self.names.entry(hash).or_insert_with(|| name.to_owned());

        debug!(name, hash = %format!("{hash:08x}"), offset, size, "embedded");
        Ok(entry)
    }

    /// Read one file from disk and embed it under its logical name.
    pub fn add_path<P: AsRef<Path>>(&mut self, path: P) -> Result<IndexEntry> {
        let path = path.as_ref();
        let name = logical_name(path, self.options.strip_prefix.as_deref());
        let data = read_source(path)?;
        self.add_file(&name, &data)
    }

    /// Embed a file, or every regular file under a directory in sorted
    /// order.  Returns how many files were embedded.
    pub fn add_input<P: AsRef<Path>>(&mut self, input: P) -> Result<usize> {
        let input = input.as_ref();
        if !input.is_dir() {
            return self.add_reported(input).map(|added| added as usize);
        }

        let mut added = 0;
        let walker = WalkDir::new(input)
            .follow_links(self.options.follow_links)
            .sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    let path = e.path().unwrap_or(input).to_path_buf();
                    let err = raise(EmbedError::SourceUnreadable { path, source: e.into() });
                    if self.skip_or_abort(&err) {
                        continue;
                    }
                    return Err(err);
                }
            };
            if entry.file_type().is_file() && self.add_reported(entry.path())? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// `add_path` with the keep-going policy applied to read failures.
    fn add_reported(&mut self, path: &Path) -> Result<bool> {
        match self.add_path(path) {
            Ok(_) => Ok(true),
            Err(e) if self.skip_or_abort(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Print the diagnostic for a failed input; true if it should be skipped.
    fn skip_or_abort(&self, err: &EmbedError) -> bool {
        let per_file = matches!(err.kind(), ErrorKind::SourceUnreadable | ErrorKind::AllocationFailed);
        if per_file && self.options.keep_going {
            warn!(error = %err, "skipping input");
            true
        } else {
            error!(error = %err, "embedding failed");
            false
        }
    }

    pub fn finish(self) -> Embedded {
        Embedded { index: self.index, blob: self.blob, manifest: self.manifest }
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

/// Logical name for an input path: `strip_prefix` removed, `.` components
/// dropped, remaining components joined with `/`.
pub fn logical_name(path: &Path, strip_prefix: Option<&Path>) -> String {
    let rel = strip_prefix
        .and_then(|prefix| path.strip_prefix(prefix).ok())
        .unwrap_or(path);
    let parts: Vec<_> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            Component::ParentDir => Some("..".into()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
        })
        .collect();
    let joined = parts.join("/");
    if rel.has_root() { format!("/{joined}") } else { joined }
}

/// Read a whole source file, distinguishing open/read failures from
/// failures to reserve a buffer for it.
pub fn read_source(path: &Path) -> Result<Vec<u8>> {
    let unreadable = |source| raise(EmbedError::SourceUnreadable { path: path.to_owned(), source });

    let mut file = File::open(path).map_err(unreadable)?;
    let size = file.metadata().map_err(unreadable)?.len();

    let not_buffered = || raise(EmbedError::AllocationFailed { path: path.to_owned(), size });
    let len = usize::try_from(size).map_err(|_| not_buffered())?;
    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|_| not_buffered())?;

    file.read_to_end(&mut data).map_err(unreadable)?;
    Ok(data)
}
