pub mod error;
pub mod hash;
pub mod index;
pub mod manifest;
pub mod embedder;
pub mod fs;
pub mod stream;
pub mod vfs;
pub mod stdio;

pub use error::{EmbedError, ErrorKind, Result};
pub use hash::identity_hash;
pub use index::{Index, IndexEntry, IndexView, INDEX_ENTRY_SIZE};
pub use manifest::{Manifest, ManifestEntry, Finding};
pub use embedder::{Embedder, EmbedOptions, Embedded, ArtifactPaths};
pub use fs::EmbeddedFs;
pub use stream::{EmbeddedFile, Origin};
pub use vfs::{FileSource, FileStream, DiskFs, DiskFile};
