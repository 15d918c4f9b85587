use std::fmt::Write as _;
use std::fs;
use std::io::BufRead;
use std::path::Path;

use memmap2::Mmap;
use xxhash_rust::xxh64::{xxh64, Xxh64};

use crate::error::{FormatError, Result};

/// Seed used for every content checksum
pub const CHECKSUM_SEED: u64 = 0;

/// Computes the 64-bit content checksum (xxHash64) of a file
pub fn checksum<P: AsRef<Path>>(path: P) -> Result<u64> {
    let file = fs::File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(xxh64(&[], CHECKSUM_SEED));
    }
    let mmap = unsafe { Mmap::map(&file) }?;
    Ok(xxh64(&mmap, CHECKSUM_SEED))
}

/// A line reader with a single line of pushback.
///
/// Tracks the byte offset and the 1-based line number of the current line,
/// and optionally hashes every byte it pulls from the underlying reader. A
/// line that is pushed back with [`LineReader::unread`] is returned again by
/// the next [`LineReader::advance`] without touching the underlying reader, so
/// lookahead works over non-seekable sources.
pub struct LineReader<R: BufRead> {
    inner: R,

    /// Raw bytes of the current line, including the terminator
    buf: Vec<u8>,

    /// Byte offset of the current line
    line_offset: u64,

    /// Byte offset of the next line to be read from `inner`
    next_offset: u64,

    /// Line number of the current line
    line_number: u64,

    /// True when the current line was pushed back
    pushed: bool,

    hasher: Option<Xxh64>,
}
impl<R: BufRead> LineReader<R> {
    /// Creates a reader positioned at the beginning of a stream
    pub fn new(inner: R) -> Self {
        Self::at(inner, 0, 1)
    }

    /// Creates a reader whose next line starts at `offset` and has number `line_number`
    pub fn at(inner: R, offset: u64, line_number: u64) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            line_offset: offset,
            next_offset: offset,
            line_number: line_number.saturating_sub(1),
            pushed: false,
            hasher: None,
        }
    }

    /// Hashes every byte read from the underlying reader
    #[must_use]
    pub fn with_checksum(mut self) -> Self {
        self.hasher = Some(Xxh64::new(CHECKSUM_SEED));
        self
    }

    /// Moves to the next line, returning `false` at the end of the stream
    pub fn advance(&mut self) -> Result<bool> {
        if self.pushed {
            self.pushed = false;
            return Ok(true);
        }
        self.buf.clear();
        let n = self.inner.read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(false);
        }
        if let Some(hasher) = self.hasher.as_mut() {
            hasher.update(&self.buf);
        }
        self.line_offset = self.next_offset;
        self.next_offset += n as u64;
        self.line_number += 1;
        Ok(true)
    }

    /// Pushes the current line back so the next `advance` returns it again
    pub fn unread(&mut self) {
        self.pushed = true;
    }

    /// Text of the current line without its line terminator
    pub fn text(&self) -> Result<&str> {
        let mut bytes = self.buf.as_slice();
        if let Some(stripped) = bytes.strip_suffix(b"\n") {
            bytes = stripped;
        }
        if let Some(stripped) = bytes.strip_suffix(b"\r") {
            bytes = stripped;
        }
        Ok(std::str::from_utf8(bytes)?)
    }

    /// Byte offset of the current line
    pub fn offset(&self) -> u64 {
        self.line_offset
    }

    /// 1-based number of the current line
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Checksum of everything read so far, if hashing was enabled
    pub fn checksum(&self) -> Option<u64> {
        self.hasher.as_ref().map(Xxh64::digest)
    }
}

/// Parses a single value token, accepting `NaN` and `Infinity` in any case
pub fn parse_value(token: &str, line: u64, text: &str) -> std::result::Result<f32, FormatError> {
    token.parse::<f32>().map_err(|_| FormatError::InvalidValue {
        line,
        text: text.to_string(),
    })
}

/// Appends a value with at most `precision` fractional digits.
///
/// Trailing zeros are trimmed and non-finite values use the canonical
/// `NaN`, `Infinity`, and `-Infinity` tokens.
pub fn format_value(buf: &mut String, value: f32, precision: usize) {
    if value.is_nan() {
        buf.push_str("NaN");
        return;
    }
    if value.is_infinite() {
        buf.push_str(if value > 0.0 { "Infinity" } else { "-Infinity" });
        return;
    }
    let start = buf.len();
    let _ = write!(buf, "{value:.precision$}");
    if buf[start..].contains('.') {
        let trimmed = buf.trim_end_matches('0').trim_end_matches('.').len();
        buf.truncate(trimmed);
    }
    if &buf[start..] == "-0" {
        buf.truncate(start);
        buf.push('0');
    }
}
