//! Stream handles over one embedded file's byte range.
//!
//! An [`EmbeddedFile`] borrows its range from the process-wide blob and owns
//! nothing but a cursor and an error flag; dropping it (or calling
//! [`EmbeddedFile::close`]) never touches the blob.
//!
//! # Positions
//! All cursor arithmetic lives in `Position`.  The cursor is an offset
//! from range start, which is offset 0; `range_end - cursor` is the number
//! of unread bytes and `tell` is derived from it as
//! `size - (range_end - cursor)`, so it counts up from 0 at range start to
//! `size` at range end.  This is the negation of the C-style
//! `(range_end - cursor) - size`, which counts up from `-size` to 0.  A failed
//! [`seek`](EmbeddedFile::seek) keeps the computed cursor, so the stream
//! stays out of range until the caller rewinds or seeks somewhere valid.
//!
//! # End of range
//! Bulk reads at the tail are short, not failures.  `read_byte`,
//! `read_line` and `read_dynamic_line` return `None` at end of range
//! without recording an error.

use std::cell::Cell;
use std::io::{self, BufRead, Read};

use crate::error::{raise, EmbedError, ErrorKind, Result};

/// Reference point for [`EmbeddedFile::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Range start.
    Set,
    /// Current cursor.
    Current,
    /// Range end.
    End,
}

impl Origin {
    /// Map a C `whence` value (`0`, `1`, `2`).
    pub fn from_whence(whence: i32) -> Option<Self> {
        match whence {
            0 => Some(Origin::Set),
            1 => Some(Origin::Current),
            2 => Some(Origin::End),
            _ => None,
        }
    }
}

// ── Position ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Position {
    cursor: i64,
    size:   i64,
}

impl Position {
    pub(crate) fn new(size: u64) -> Self {
        Self { cursor: 0, size: i64::try_from(size).unwrap_or(i64::MAX) }
    }

    pub(crate) fn size(&self) -> u64 {
        self.size as u64
    }

    /// `range_end - cursor`; negative once the cursor has run past the end.
    pub(crate) fn until_end(&self) -> i64 {
        self.size.saturating_sub(self.cursor)
    }

    /// `size - (range_end - cursor)`: 0 at range start, `size` at range end.
    pub(crate) fn tell(&self) -> i64 {
        self.size.saturating_sub(self.until_end())
    }

    /// Range start is offset 0.
    fn start(&self) -> i64 {
        0
    }

    fn out_of_range(&self) -> EmbedError {
        raise(EmbedError::CursorOutOfRange { position: self.cursor, size: self.size() })
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.until_end() < 0 || self.tell() < 0 {
            return Err(self.out_of_range());
        }
        Ok(())
    }

    pub(crate) fn at_end(&self) -> Result<bool> {
        self.check()?;
        Ok(self.until_end() == 0)
    }

    /// Unread byte count; fails when the cursor is out of range.
    pub(crate) fn remaining(&self) -> Result<usize> {
        self.check()?;
        Ok(self.until_end() as usize)
    }

    /// Cursor as a slice index; only valid after a successful `check`.
    pub(crate) fn index(&self) -> usize {
        self.cursor as usize
    }

    pub(crate) fn advance(&mut self, n: usize) {
        self.cursor = self.cursor.saturating_add(n as i64);
    }

    pub(crate) fn rewind(&mut self) {
        self.cursor = self.start();
    }

    pub(crate) fn seek(&mut self, offset: i64, origin: Origin) -> Result<()> {
        let base = match origin {
            Origin::Set     => self.start(),
            Origin::Current => self.cursor,
            Origin::End     => self.size,
        };
        self.cursor = base.saturating_add(offset);
        self.check()
    }
}

// ── EmbeddedFile ─────────────────────────────────────────────────────────────

/// A live read cursor over one embedded file.
#[derive(Debug)]
pub struct EmbeddedFile<'a> {
    data:  &'a [u8],
    pos:   Position,
    error: Cell<ErrorKind>,
}

impl<'a> EmbeddedFile<'a> {
    /// Stream over an arbitrary byte range.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos:   Position::new(data.len() as u64),
            error: Cell::new(ErrorKind::Success),
        }
    }

    /// Release the handle.  The underlying blob is unaffected.
    pub fn close(self) {}

    pub fn size(&self) -> u64 {
        self.pos.size()
    }

    /// The whole range this stream covers, independent of the cursor.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Sticky per-stream error: the kind of the last failure on this handle.
    pub fn error(&self) -> ErrorKind {
        self.error.get()
    }

    pub fn clear_error(&self) {
        self.error.set(ErrorKind::Success);
    }

    fn fail(&self, err: EmbedError) -> EmbedError {
        self.error.set(err.kind());
        err
    }

    /// Unread bytes from the cursor to range end.
    pub fn rest(&self) -> Result<&'a [u8]> {
        self.pos.check().map_err(|e| self.fail(e))?;
        Ok(&self.data[self.pos.index()..])
    }

    /// True iff the cursor sits exactly at range end.
    pub fn at_end(&self) -> Result<bool> {
        self.pos.at_end().map_err(|e| self.fail(e))
    }

    /// Copy up to `element_size * count` bytes into `buf` and return the
    /// number of whole elements copied.  A read running into range end is
    /// short; the partial trailing element's bytes are still consumed.
    pub fn read_elements(&mut self, buf: &mut [u8], element_size: usize, count: usize) -> Result<usize> {
        let available = self.pos.remaining().map_err(|e| self.fail(e))?;
        if element_size == 0 {
            return Ok(0);
        }
        let wanted = element_size.saturating_mul(count).min(buf.len());
        let n = wanted.min(available);
        let start = self.pos.index();
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.pos.advance(n);
        Ok(n / element_size)
    }

    /// Byte-granular read: `read_elements(buf, 1, buf.len())`.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        let len = buf.len();
        self.read_elements(buf, 1, len)
    }

    /// Copy bytes into `buf` until it is full, range end is reached, or a
    /// carriage return is next.  The carriage return stays unread.
    /// `None` when already at range end.
    pub fn read_line(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        if self.at_end()? {
            return Ok(None);
        }
        let rest = self.rest()?;
        let n = rest
            .iter()
            .take(buf.len())
            .position(|&b| b == b'\r')
            .unwrap_or_else(|| rest.len().min(buf.len()));
        buf[..n].copy_from_slice(&rest[..n]);
        self.pos.advance(n);
        Ok(Some(n))
    }

    /// Read through the next `\n` (inclusive) or to range end into a buffer
    /// sized to the line.  `None` when already at range end.
    pub fn read_dynamic_line(&mut self) -> Result<Option<Vec<u8>>> {
        if self.at_end()? {
            return Ok(None);
        }
        let rest = self.rest()?;
        let len = rest
            .iter()
            .position(|&b| b == b'\n')
            .map_or(rest.len(), |i| i + 1);
        let line = rest[..len].to_vec();
        self.pos.advance(len);
        Ok(Some(line))
    }

    /// Next byte, or `None` at range end.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.at_end()? {
            return Ok(None);
        }
        let b = self.data[self.pos.index()];
        self.pos.advance(1);
        Ok(Some(b))
    }

    /// Offset of the cursor from range start: 0 at range start, `size` at
    /// range end.  Out-of-range cursors report as negative or above `size`.
    pub fn tell(&self) -> i64 {
        self.pos.tell()
    }

    /// `range_end - cursor`: unread bytes while in range, zero at range end,
    /// negative past it.
    pub fn unread(&self) -> i64 {
        self.pos.until_end()
    }

    /// Back to range start.  The error flag is left as is.
    pub fn rewind(&mut self) {
        self.pos.rewind();
    }

    /// Reposition relative to `origin`.  On `CursorOutOfRange` the cursor
    /// keeps the computed (invalid) value.
    pub fn seek(&mut self, offset: i64, origin: Origin) -> Result<()> {
        self.pos.seek(offset, origin).map_err(|e| self.fail(e))
    }
}

impl Read for EmbeddedFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_bytes(buf)?)
    }
}

impl BufRead for EmbeddedFile<'_> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Ok(self.rest()?)
    }

    fn consume(&mut self, amt: usize) {
        let available = self.pos.remaining().unwrap_or(0);
        self.pos.advance(amt.min(available));
    }
}
