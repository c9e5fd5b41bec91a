//! [`EmbeddedFs`]: the read-only resource handle over an (index, blob) pair.
//!
//! The handle borrows both regions and never mutates them, so it is `Copy`,
//! `Send` and `Sync`; any number of threads may open independent streams
//! from it at once.  For data linked into the binary, the regions are
//! `'static` and the handle can be built with [`embedded_fs!`](crate::embedded_fs).
//!
//! ```
//! use embedfs::{Embedder, EmbeddedFs};
//!
//! let mut embedder = Embedder::new();
//! embedder.add_file("greeting.txt", b"hi\n")?;
//! let built = embedder.finish();
//! let index = built.index.to_bytes();
//!
//! let fs = EmbeddedFs::new(&index, &built.blob)?;
//! let mut file = fs.open("greeting.txt")?;
//! assert_eq!(file.read_dynamic_line()?.unwrap(), b"hi\n");
//! # Ok::<(), embedfs::EmbedError>(())
//! ```

use crate::error::{raise, EmbedError, Result};
use crate::hash::identity_hash;
use crate::index::{IndexEntry, IndexView};
use crate::stream::EmbeddedFile;

/// Build an `EmbeddedFs<'static>` from two artifact files linked into the
/// binary with `include_bytes!`.  Paths resolve like `include_bytes!` paths.
///
/// ```ignore
/// let fs = embedfs::embedded_fs!("../assets/embedded.idx", "../assets/embedded.blob")?;
/// ```
#[macro_export]
macro_rules! embedded_fs {
    ($index:expr, $blob:expr $(,)?) => {
        $crate::fs::EmbeddedFs::new(
            ::core::include_bytes!($index),
            ::core::include_bytes!($blob),
        )
    };
}

#[derive(Debug, Clone, Copy)]
pub struct EmbeddedFs<'a> {
    index: IndexView<'a>,
    blob:  &'a [u8],
}

impl<'a> EmbeddedFs<'a> {
    /// Wrap an index region and a blob region.
    ///
    /// Fails with `IndexCorrupt` if the index is not a whole number of
    /// records or any record points outside the blob.
    pub fn new(index: &'a [u8], blob: &'a [u8]) -> Result<Self> {
        let index = IndexView::new(index)?;
        for (position, entry) in index.iter().enumerate() {
            if entry.end() > blob.len() as u64 {
                return Err(raise(EmbedError::IndexCorrupt(format!(
                    "entry {} ({:08x}) spans {}..{} but the blob is {} bytes",
                    position,
                    entry.identity_hash,
                    entry.offset,
                    entry.end(),
                    blob.len()
                ))));
            }
        }
        Ok(Self { index, blob })
    }

    /// A filesystem with no entries.
    pub fn empty() -> EmbeddedFs<'static> {
        EmbeddedFs { index: IndexView::empty(), blob: &[] }
    }

    pub fn index(&self) -> IndexView<'a> {
        self.index
    }

    pub fn blob(&self) -> &'a [u8] {
        self.blob
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = IndexEntry> + 'a {
        self.index.iter()
    }

    /// Whether `name` resolves.  Does not touch the thread's error code.
    pub fn contains(&self, name: &str) -> bool {
        self.index.find_hash(identity_hash(name)).is_some()
    }

    pub fn lookup(&self, name: &str) -> Result<IndexEntry> {
        self.index.lookup(name)
    }

    /// Open a stream positioned at the start of `name`'s range.
    pub fn open(&self, name: &str) -> Result<EmbeddedFile<'a>> {
        let entry = self.lookup(name)?;
        self.open_entry(entry)
    }

    pub fn open_entry(&self, entry: IndexEntry) -> Result<EmbeddedFile<'a>> {
        Ok(EmbeddedFile::new(self.contents(entry)?))
    }

    /// The full contents of `name`, borrowed from the blob.
    pub fn read(&self, name: &str) -> Result<&'a [u8]> {
        let entry = self.lookup(name)?;
        self.contents(entry)
    }

    fn contents(&self, entry: IndexEntry) -> Result<&'a [u8]> {
        let blob = self.blob;
        blob.get(entry.offset as usize..entry.end() as usize).ok_or_else(|| {
            raise(EmbedError::IndexCorrupt(format!(
                "entry {:08x} spans {}..{} past the {}-byte blob",
                entry.identity_hash,
                entry.offset,
                entry.end(),
                blob.len()
            )))
        })
    }
}
