//! Sentinel-style facade with C stdio names.
//!
//! For call sites ported from `fopen`/`fread`/`fgets` code: every function
//! takes an optional handle, returns a sentinel on failure (`None`, `0`,
//! `-1`, [`EOF`]) and leaves the reason in the thread's last-error cell,
//! readable through [`errno`] and [`perror`].  A missing handle fails with
//! `NullStream`.  Reaching end of range is not an error.

use crate::error::{self, set_last_error, ErrorKind};
use crate::fs::EmbeddedFs;
use crate::stream::{EmbeddedFile, Origin};

pub const EOF: i32 = -1;

fn null_stream<T>(sentinel: T) -> T {
    set_last_error(ErrorKind::NullStream);
    sentinel
}

pub fn fopen<'a>(fs: &EmbeddedFs<'a>, name: &str) -> Option<EmbeddedFile<'a>> {
    fs.open(name).ok()
}

pub fn fclose(stream: Option<EmbeddedFile<'_>>) -> i32 {
    match stream {
        Some(s) => {
            s.close();
            0
        }
        None => null_stream(EOF),
    }
}

/// End-of-range test.  A cursor outside the range also reads as end, with
/// `CursorOutOfRange` recorded.
pub fn feof(stream: Option<&EmbeddedFile<'_>>) -> bool {
    match stream {
        Some(s) => s.at_end().unwrap_or(true),
        None    => null_stream(false),
    }
}

/// Whole elements read; `0` on failure.
pub fn fread(buf: &mut [u8], size: usize, count: usize, stream: Option<&mut EmbeddedFile<'_>>) -> usize {
    match stream {
        Some(s) => s.read_elements(buf, size, count).unwrap_or(0),
        None    => null_stream(0),
    }
}

/// The filled prefix of `buf`, or `None` at end of range or on failure.
pub fn fgets<'b>(buf: &'b mut [u8], stream: Option<&mut EmbeddedFile<'_>>) -> Option<&'b [u8]> {
    let Some(s) = stream else {
        return null_stream(None);
    };
    match s.read_line(buf) {
        Ok(Some(n)) => {
            let filled: &'b [u8] = buf;
            Some(&filled[..n])
        }
        Ok(None) | Err(_) => None,
    }
}

/// Replace `line` with the next line and return its length, or `-1` at end
/// of range or on failure.
pub fn getline(line: &mut Vec<u8>, stream: Option<&mut EmbeddedFile<'_>>) -> isize {
    let Some(s) = stream else {
        return null_stream(-1);
    };
    match s.read_dynamic_line() {
        Ok(Some(next)) => {
            *line = next;
            line.len() as isize
        }
        Ok(None) | Err(_) => -1,
    }
}

pub fn fgetc(stream: Option<&mut EmbeddedFile<'_>>) -> i32 {
    match stream {
        Some(s) => match s.read_byte() {
            Ok(Some(b))       => b as i32,
            Ok(None) | Err(_) => EOF,
        },
        None => null_stream(EOF),
    }
}

/// Offset from range start, counting up from `0` to the file size.  The
/// C-style `(end - pos) - size` form counts from `-size` to `0` instead.
pub fn ftell(stream: Option<&EmbeddedFile<'_>>) -> i64 {
    match stream {
        Some(s) => s.tell(),
        None    => null_stream(-1),
    }
}

/// Store the number of unread bytes in `pos` and return `0`.  At or past
/// range end, `pos` is left untouched and the result is `1`.
pub fn fgetpos(stream: Option<&EmbeddedFile<'_>>, pos: &mut i64) -> i32 {
    let Some(s) = stream else {
        return null_stream(-1);
    };
    let unread = s.unread();
    if unread <= 0 {
        return 1;
    }
    *pos = unread;
    0
}

/// `0` on success, `-1` on failure.
pub fn fseek(stream: Option<&mut EmbeddedFile<'_>>, offset: i64, origin: Origin) -> i32 {
    match stream {
        Some(s) => match s.seek(offset, origin) {
            Ok(())  => 0,
            Err(_)  => -1,
        },
        None => null_stream(-1),
    }
}

pub fn rewind(stream: Option<&mut EmbeddedFile<'_>>) {
    match stream {
        Some(s) => s.rewind(),
        None    => null_stream(()),
    }
}

/// The handle's sticky error code; `0` for a missing handle.
pub fn ferror(stream: Option<&EmbeddedFile<'_>>) -> i32 {
    stream.map_or(0, |s| s.error().code())
}

pub fn clearerr(stream: Option<&EmbeddedFile<'_>>) {
    if let Some(s) = stream {
        s.clear_error();
    }
}

/// Most recent failure on this thread.
pub fn errno() -> ErrorKind {
    error::last_error()
}

pub fn strerror(kind: ErrorKind) -> &'static str {
    kind.description()
}

/// Print `"{context}: ({code}) {description}"` for the current code to stderr.
pub fn perror(context: &str) {
    eprintln!("{}", error::format_error(context));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::Embedder;
    use crate::error::clear_last_error;

    fn with_fs<F: FnOnce(&EmbeddedFs<'_>)>(f: F) {
        let mut e = Embedder::new();
        e.add_file("lines.txt", b"ab\ncd").unwrap();
        e.add_file("crlf.txt", b"one\r\ntwo").unwrap();
        let built = e.finish();
        let index = built.index.to_bytes();
        let fs = EmbeddedFs::new(&index, &built.blob).unwrap();
        f(&fs);
    }

    #[test]
    fn missing_handle_sets_null_stream() {
        clear_last_error();
        assert_eq!(fgetc(None), EOF);
        assert_eq!(errno(), ErrorKind::NullStream);

        clear_last_error();
        assert!(!feof(None));
        assert_eq!(errno(), ErrorKind::NullStream);

        let mut buf = [0u8; 4];
        assert_eq!(fread(&mut buf, 1, 4, None), 0);
        assert!(fgets(&mut buf, None).is_none());
        assert_eq!(getline(&mut Vec::new(), None), -1);
        assert_eq!(ftell(None), -1);
        assert_eq!(fgetpos(None, &mut 0), -1);
        assert_eq!(fseek(None, 0, Origin::Set), -1);
        assert_eq!(fclose(None), EOF);
        assert_eq!(ferror(None), 0);
        assert_eq!(errno(), ErrorKind::NullStream);
    }

    #[test]
    fn fopen_miss_sets_not_found() {
        with_fs(|fs| {
            clear_last_error();
            assert!(fopen(fs, "absent.txt").is_none());
            assert_eq!(errno(), ErrorKind::NotFound);
            assert_eq!(strerror(errno()), "No embedded file found.");
        });
    }

    #[test]
    fn getline_loop() {
        with_fs(|fs| {
            let mut f = fopen(fs, "lines.txt");
            let mut line = Vec::new();
            let mut lines = Vec::new();
            while getline(&mut line, f.as_mut()) != -1 {
                lines.push(line.clone());
            }
            assert_eq!(lines, vec![b"ab\n".to_vec(), b"cd".to_vec()]);
            assert!(feof(f.as_ref()));
            assert_eq!(fgetc(f.as_mut()), EOF);
            assert_eq!(fclose(f), 0);
        });
    }

    #[test]
    fn fgets_stops_at_carriage_return() {
        with_fs(|fs| {
            let mut f = fopen(fs, "crlf.txt");
            let mut buf = [0u8; 16];
            assert_eq!(fgets(&mut buf, f.as_mut()), Some(&b"one"[..]));
            assert_eq!(fgetc(f.as_mut()), b'\r' as i32);
            assert_eq!(fgets(&mut buf, f.as_mut()), Some(&b"\ntwo"[..]));
            assert_eq!(fgets(&mut buf, f.as_mut()), None);
        });
    }

    #[test]
    fn fgetpos_reports_unread_bytes() {
        with_fs(|fs| {
            let mut f = fopen(fs, "lines.txt");
            let mut pos = -7;
            assert_eq!(fgetpos(f.as_ref(), &mut pos), 0);
            assert_eq!(pos, 5);
            assert_eq!(fgetc(f.as_mut()), b'a' as i32);
            assert_eq!(fgetpos(f.as_ref(), &mut pos), 0);
            assert_eq!(pos, 4);
            assert_eq!(ftell(f.as_ref()), 1);

            assert_eq!(fseek(f.as_mut(), 0, Origin::End), 0);
            pos = -7;
            assert_eq!(fgetpos(f.as_ref(), &mut pos), 1);
            assert_eq!(pos, -7);

            assert_eq!(fseek(f.as_mut(), 3, Origin::End), -1);
            assert_eq!(fgetpos(f.as_ref(), &mut pos), 1);
            assert_eq!(pos, -7);
        });
    }

    #[test]
    fn failed_fseek_is_sticky_until_clearerr() {
        with_fs(|fs| {
            let mut f = fopen(fs, "lines.txt");
            assert_eq!(fseek(f.as_mut(), 99, Origin::Set), -1);
            assert_eq!(errno(), ErrorKind::CursorOutOfRange);
            assert_eq!(ferror(f.as_ref()), ErrorKind::CursorOutOfRange.code());
            assert!(feof(f.as_ref()));

            rewind(f.as_mut());
            assert_eq!(ftell(f.as_ref()), 0);
            assert_eq!(ferror(f.as_ref()), ErrorKind::CursorOutOfRange.code());
            clearerr(f.as_ref());
            assert_eq!(ferror(f.as_ref()), 0);

            let mut buf = [0u8; 8];
            assert_eq!(fread(&mut buf, 1, 8, f.as_mut()), 5);
            assert_eq!(&buf[..5], b"ab\ncd");
        });
    }
}
