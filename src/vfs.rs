//! One operation set, two backends.
//!
//! [`FileSource`] opens streams by logical name and [`FileStream`] is the
//! sequential-read surface every stream offers.  [`EmbeddedFs`] serves
//! names from the embedded regions; [`DiskFs`] serves the same names from a
//! directory on disk with identical end-of-range, line and seek behaviour.
//! Code written against the traits can switch backends at the call site.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{raise, EmbedError, ErrorKind, Result};
use crate::fs::EmbeddedFs;
use crate::stream::{EmbeddedFile, Origin, Position};

pub trait FileStream {
    fn size(&self) -> u64;
    fn at_end(&mut self) -> Result<bool>;
    fn read_elements(&mut self, buf: &mut [u8], element_size: usize, count: usize) -> Result<usize>;
    fn read_line(&mut self, buf: &mut [u8]) -> Result<Option<usize>>;
    fn read_dynamic_line(&mut self) -> Result<Option<Vec<u8>>>;
    fn read_byte(&mut self) -> Result<Option<u8>>;
    fn tell(&self) -> i64;
    fn rewind(&mut self) -> Result<()>;
    fn seek(&mut self, offset: i64, origin: Origin) -> Result<()>;
}

pub trait FileSource {
    type Stream: FileStream;

    fn open(&self, name: &str) -> Result<Self::Stream>;
}

/// Drain a stream from its cursor to range end.
pub fn read_all<S: FileStream>(stream: &mut S) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(stream.size() as usize);
    let mut chunk = [0u8; 4096];
    let len = chunk.len();
    loop {
        let n = stream.read_elements(&mut chunk, 1, len)?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&chunk[..n]);
    }
    Ok(out)
}

// ── Embedded backend ─────────────────────────────────────────────────────────

impl<'a> FileSource for EmbeddedFs<'a> {
    type Stream = EmbeddedFile<'a>;

    fn open(&self, name: &str) -> Result<EmbeddedFile<'a>> {
        EmbeddedFs::open(self, name)
    }
}

impl FileStream for EmbeddedFile<'_> {
    fn size(&self) -> u64 {
        EmbeddedFile::size(self)
    }

    fn at_end(&mut self) -> Result<bool> {
        EmbeddedFile::at_end(self)
    }

    fn read_elements(&mut self, buf: &mut [u8], element_size: usize, count: usize) -> Result<usize> {
        EmbeddedFile::read_elements(self, buf, element_size, count)
    }

    fn read_line(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        EmbeddedFile::read_line(self, buf)
    }

    fn read_dynamic_line(&mut self) -> Result<Option<Vec<u8>>> {
        EmbeddedFile::read_dynamic_line(self)
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        EmbeddedFile::read_byte(self)
    }

    fn tell(&self) -> i64 {
        EmbeddedFile::tell(self)
    }

    fn rewind(&mut self) -> Result<()> {
        EmbeddedFile::rewind(self);
        Ok(())
    }

    fn seek(&mut self, offset: i64, origin: Origin) -> Result<()> {
        EmbeddedFile::seek(self, offset, origin)
    }
}

// ── Disk backend ─────────────────────────────────────────────────────────────

/// Serves logical names as paths relative to `root`.
#[derive(Debug, Clone)]
pub struct DiskFs {
    root: PathBuf,
}

impl DiskFs {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_owned() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileSource for DiskFs {
    type Stream = DiskFile;

    fn open(&self, name: &str) -> Result<DiskFile> {
        let path = self.root.join(name);
        let file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => raise(EmbedError::NotFound { name: name.to_owned() }),
            _                       => raise(EmbedError::Io(e)),
        })?;
        DiskFile::new(file)
    }
}

/// A file on disk read with the embedded stream semantics.  The size is
/// fixed when the file is opened.
#[derive(Debug)]
pub struct DiskFile {
    reader: BufReader<File>,
    pos:    Position,
    error:  ErrorKind,
}

impl DiskFile {
    pub fn new(file: File) -> Result<Self> {
        let size = file.metadata().map_err(|e| raise(EmbedError::Io(e)))?.len();
        Ok(Self { reader: BufReader::new(file), pos: Position::new(size), error: ErrorKind::Success })
    }

    pub fn error(&self) -> ErrorKind {
        self.error
    }

    pub fn clear_error(&mut self) {
        self.error = ErrorKind::Success;
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.error = e.kind();
        }
        result
    }

    fn io<T>(&mut self, result: io::Result<T>) -> Result<T> {
        result.map_err(|e| io_failure(&mut self.error, e))
    }

    fn remaining(&mut self) -> Result<usize> {
        let r = self.pos.remaining();
        self.track(r)
    }
}

fn io_failure(error: &mut ErrorKind, e: io::Error) -> EmbedError {
    let e = raise(EmbedError::Io(e));
    *error = e.kind();
    e
}

impl FileStream for DiskFile {
    fn size(&self) -> u64 {
        self.pos.size()
    }

    fn at_end(&mut self) -> Result<bool> {
        let r = self.pos.at_end();
        self.track(r)
    }

    fn read_elements(&mut self, buf: &mut [u8], element_size: usize, count: usize) -> Result<usize> {
        let available = self.remaining()?;
        if element_size == 0 {
            return Ok(0);
        }
        let n = element_size.saturating_mul(count).min(buf.len()).min(available);
        let r = self.reader.read_exact(&mut buf[..n]);
        self.io(r)?;
        self.pos.advance(n);
        Ok(n / element_size)
    }

    fn read_line(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        if self.at_end()? {
            return Ok(None);
        }
        let mut n = 0;
        while n < buf.len() {
            let available = self.remaining()?;
            let chunk = match self.reader.fill_buf() {
                Ok(chunk) => chunk,
                Err(e) => return Err(io_failure(&mut self.error, e)),
            };
            let limit = chunk.len().min(available).min(buf.len() - n);
            if limit == 0 {
                break;
            }
            let take = chunk[..limit].iter().position(|&b| b == b'\r').unwrap_or(limit);
            buf[n..n + take].copy_from_slice(&chunk[..take]);
            self.reader.consume(take);
            self.pos.advance(take);
            n += take;
            if take < limit {
                break;
            }
        }
        Ok(Some(n))
    }

    fn read_dynamic_line(&mut self) -> Result<Option<Vec<u8>>> {
        if self.at_end()? {
            return Ok(None);
        }
        let available = self.remaining()? as u64;
        let mut line = Vec::new();
        let r = (&mut self.reader).take(available).read_until(b'\n', &mut line);
        self.io(r)?;
        self.pos.advance(line.len());
        line.shrink_to_fit();
        Ok(Some(line))
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.at_end()? {
            return Ok(None);
        }
        let mut b = [0u8; 1];
        let r = self.reader.read_exact(&mut b);
        self.io(r)?;
        self.pos.advance(1);
        Ok(Some(b[0]))
    }

    fn tell(&self) -> i64 {
        self.pos.tell()
    }

    fn rewind(&mut self) -> Result<()> {
        self.pos.rewind();
        let r = self.reader.seek(SeekFrom::Start(0));
        self.io(r).map(|_| ())
    }

    fn seek(&mut self, offset: i64, origin: Origin) -> Result<()> {
        let r = self.pos.seek(offset, origin);
        self.track(r)?;
        let r = self.reader.seek(SeekFrom::Start(self.pos.tell() as u64));
        self.io(r).map(|_| ())
    }
}
