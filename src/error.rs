//! Error codes, the [`EmbedError`] type, and the per-thread last-error cell.
//!
//! Every fallible operation returns a [`Result`].  Runtime failures are also
//! recorded in a thread-local cell so that sentinel-style callers (see
//! [`crate::stdio`]) can query the most recent failure after the fact.  The
//! cell is never cleared automatically.

use std::cell::Cell;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

// ── ErrorKind ────────────────────────────────────────────────────────────────

/// Stable, fieldless error code.  The numeric values are frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorKind {
    #[default]
    Success          = 0,
    NotFound         = 1,
    IndexCorrupt     = 2,
    NullStream       = 3,
    CursorOutOfRange = 4,
    SourceUnreadable = 5,
    AllocationFailed = 6,
    OffsetOverflow   = 7,
    HashCollision    = 8,
    Io               = 9,
    Manifest         = 10,
}

impl ErrorKind {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0  => ErrorKind::Success,
            1  => ErrorKind::NotFound,
            2  => ErrorKind::IndexCorrupt,
            3  => ErrorKind::NullStream,
            4  => ErrorKind::CursorOutOfRange,
            5  => ErrorKind::SourceUnreadable,
            6  => ErrorKind::AllocationFailed,
            7  => ErrorKind::OffsetOverflow,
            8  => ErrorKind::HashCollision,
            9  => ErrorKind::Io,
            10 => ErrorKind::Manifest,
            _  => return None,
        })
    }

    /// Static human-readable description of the code.
    pub fn description(self) -> &'static str {
        match self {
            ErrorKind::Success          => "Success.",
            ErrorKind::NotFound         => "No embedded file found.",
            ErrorKind::IndexCorrupt     => "Embedded index is missing or inconsistent with the blob.",
            ErrorKind::NullStream       => "No stream handle given.",
            ErrorKind::CursorOutOfRange => "Stream cursor lies outside the file's range.",
            ErrorKind::SourceUnreadable => "Source file could not be read.",
            ErrorKind::AllocationFailed => "Source file could not be buffered.",
            ErrorKind::OffsetOverflow   => "Blob exceeds the 32-bit offset range of the index.",
            ErrorKind::HashCollision    => "Two logical names share an identity hash.",
            ErrorKind::Io               => "I/O error.",
            ErrorKind::Manifest         => "Manifest could not be encoded or decoded.",
        }
    }

    pub fn is_success(self) -> bool {
        self == ErrorKind::Success
    }
}

// ── EmbedError ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("no embedded file named '{name}'")]
    NotFound { name: String },

    #[error("index corrupt: {0}")]
    IndexCorrupt(String),

    #[error("no stream handle given")]
    NullStream,

    #[error("cursor {position} outside file range 0..={size}")]
    CursorOutOfRange { position: i64, size: u64 },

    #[error("cannot read source '{}': {source}", path.display())]
    SourceUnreadable {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot buffer {size} bytes of '{}'", path.display())]
    AllocationFailed { path: PathBuf, size: u64 },

    #[error("embedding '{name}' ({size} B) at offset {offset} overflows the 32-bit index range")]
    OffsetOverflow { name: String, offset: u64, size: u64 },

    #[error("'{name}' collides with '{existing}' (identity hash {hash:08x})")]
    HashCollision { name: String, existing: String, hash: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl EmbedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EmbedError::NotFound { .. }         => ErrorKind::NotFound,
            EmbedError::IndexCorrupt(_)         => ErrorKind::IndexCorrupt,
            EmbedError::NullStream              => ErrorKind::NullStream,
            EmbedError::CursorOutOfRange { .. } => ErrorKind::CursorOutOfRange,
            EmbedError::SourceUnreadable { .. } => ErrorKind::SourceUnreadable,
            EmbedError::AllocationFailed { .. } => ErrorKind::AllocationFailed,
            EmbedError::OffsetOverflow { .. }   => ErrorKind::OffsetOverflow,
            EmbedError::HashCollision { .. }    => ErrorKind::HashCollision,
            EmbedError::Io(_)                   => ErrorKind::Io,
            EmbedError::Manifest(_)             => ErrorKind::Manifest,
        }
    }
}

impl From<EmbedError> for io::Error {
    fn from(e: EmbedError) -> Self {
        let kind = match e.kind() {
            ErrorKind::NotFound         => io::ErrorKind::NotFound,
            ErrorKind::CursorOutOfRange => io::ErrorKind::InvalidInput,
            ErrorKind::IndexCorrupt     => io::ErrorKind::InvalidData,
            _                           => io::ErrorKind::Other,
        };
        match e {
            EmbedError::Io(inner) => inner,
            other                 => io::Error::new(kind, other),
        }
    }
}

pub type Result<T> = std::result::Result<T, EmbedError>;

// ── Thread-local last error ──────────────────────────────────────────────────

thread_local! {
    static LAST_ERROR: Cell<ErrorKind> = const { Cell::new(ErrorKind::Success) };
}

/// Record `err` as this thread's most recent failure and hand it back.
pub(crate) fn raise(err: EmbedError) -> EmbedError {
    set_last_error(err.kind());
    err
}

pub(crate) fn set_last_error(kind: ErrorKind) {
    LAST_ERROR.with(|c| c.set(kind));
}

/// Code of the most recent failure on the calling thread.
pub fn last_error() -> ErrorKind {
    LAST_ERROR.with(|c| c.get())
}

pub fn clear_last_error() {
    set_last_error(ErrorKind::Success);
}

/// Render the calling thread's current code as `"{context}: ({code}) {description}"`.
pub fn format_error(context: &str) -> String {
    let kind = last_error();
    format!("{}: ({}) {}", context, kind.code(), kind.description())
}
