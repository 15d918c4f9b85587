use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use bytemuck::{Pod, Zeroable};

use super::header::{ContigHeader, LineKind, StepKind};
use super::utils::{parse_value, LineReader};
use super::Interval;
use crate::error::{FormatError, IndexError, RangeError, Result};

/// Discriminator of a serialized fixed-step descriptor
pub const FIXED_DISCRIMINATOR: u8 = 0;

/// Discriminator of a serialized variable-step descriptor
pub const VARIABLE_DISCRIMINATOR: u8 = 1;

/// One entry of a descriptor's sparse index.
///
/// This is stored identically in memory and on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Zeroable, Pod, Default)]
#[repr(C)]
pub struct IndexEntry {
    /// First base pair of the indexed line
    pub bp: u64,

    /// Byte offset of the start of the indexed line
    pub offset: u64,

    /// 1-based line number of the indexed line
    pub line: u64,
}
impl IndexEntry {
    #[must_use]
    pub fn new(bp: u64, offset: u64, line: u64) -> Self {
        Self { bp, offset, line }
    }
}

/// Metadata of one contiguous run of a Wiggle file.
///
/// Holds the geometry declared by a `fixedStep` or `variableStep` header, the
/// extent of the run once it has been scanned, and a sparse map from base pair
/// to byte offset used to seek close to a query before scanning forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContigDescriptor {
    chrom: String,
    start: u64,
    stop: u64,
    span: u64,
    kind: StepKind,

    /// Line number of the first data line
    start_line: u64,

    /// Line number of the last data line
    stop_line: u64,

    /// Sparse index sorted by base pair
    entries: Vec<IndexEntry>,
}
impl ContigDescriptor {
    /// Creates an open descriptor whose data starts at `start_line`
    #[must_use]
    pub fn from_header(header: ContigHeader, start_line: u64) -> Self {
        Self {
            chrom: header.chrom,
            start: header.start,
            stop: header.start,
            span: header.span,
            kind: header.kind,
            start_line,
            stop_line: start_line,
            entries: Vec::new(),
        }
    }

    /// Parses a header line found at `line`; the data is expected on the next line
    pub fn parse_header(text: &str, line: u64) -> std::result::Result<Self, FormatError> {
        ContigHeader::parse(text, line).map(|header| Self::from_header(header, line + 1))
    }

    #[must_use]
    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    #[must_use]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last base pair covered by the run
    #[must_use]
    pub fn stop(&self) -> u64 {
        self.stop
    }

    #[must_use]
    pub fn span(&self) -> u64 {
        self.span
    }

    #[must_use]
    pub fn kind(&self) -> StepKind {
        self.kind
    }

    #[must_use]
    pub fn is_fixed_step(&self) -> bool {
        self.kind.is_fixed()
    }

    #[must_use]
    pub fn step(&self) -> Option<u64> {
        self.kind.step()
    }

    #[must_use]
    pub fn start_line(&self) -> u64 {
        self.start_line
    }

    #[must_use]
    pub fn stop_line(&self) -> u64 {
        self.stop_line
    }

    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// The header line that declares this run
    #[must_use]
    pub fn header(&self) -> ContigHeader {
        ContigHeader {
            chrom: self.chrom.clone(),
            start: self.start,
            span: self.span,
            kind: self.kind,
        }
    }

    /// Number of base pairs between the start and stop of the run
    #[must_use]
    pub fn length(&self) -> u64 {
        self.stop - self.start + 1
    }

    /// Checks whether `[start, stop]` of this run intersects `[low, high]`
    #[must_use]
    pub fn overlaps(&self, low: u64, high: u64) -> bool {
        self.start <= high && self.stop >= low
    }

    pub(crate) fn set_start(&mut self, start: u64) {
        self.start = start;
        self.stop = start;
    }

    pub(crate) fn push_entry(&mut self, entry: IndexEntry) {
        self.entries.push(entry);
    }

    /// Finalizes the extent of the run
    pub(crate) fn close(&mut self, stop: u64, stop_line: u64) {
        self.stop = stop;
        self.stop_line = stop_line;
    }

    /// The indexed entry with the greatest base pair `<= bp`
    #[must_use]
    pub fn upstream_entry(&self, bp: u64) -> Option<&IndexEntry> {
        let idx = self.entries.partition_point(|e| e.bp <= bp);
        idx.checked_sub(1).map(|i| &self.entries[i])
    }

    /// The greatest indexed base pair `<= bp`, `None` if `bp` precedes every entry
    #[must_use]
    pub fn upstream_indexed_bp(&self, bp: u64) -> Option<u64> {
        self.upstream_entry(bp).map(|e| e.bp)
    }

    fn require_step(&self) -> Result<u64> {
        self.kind.step().ok_or_else(|| {
            RangeError::NotFixedStep {
                chrom: self.chrom.clone(),
                start: self.start,
            }
            .into()
        })
    }

    /// Line number of the fixed-step line covering `bp`
    pub fn line_num_for_bp(&self, bp: u64) -> Result<u64> {
        let step = self.require_step()?;
        if bp < self.start || bp > self.stop {
            return Err(RangeError::BasePairOutOfRange {
                bp,
                start: self.start,
                stop: self.stop,
            }
            .into());
        }
        Ok(self.start_line + (bp - self.start) / step)
    }

    /// First base pair of the fixed-step line `line`
    pub fn bp_for_line_num(&self, line: u64) -> Result<u64> {
        let step = self.require_step()?;
        if line < self.start_line || line > self.stop_line {
            return Err(RangeError::LineOutOfRange {
                line,
                start_line: self.start_line,
                stop_line: self.stop_line,
            }
            .into());
        }
        Ok(self.start + (line - self.start_line) * step)
    }

    /// Scans the values of this run that fall into `[low, high]`.
    ///
    /// Seeks to the closest indexed line upstream of `low` and reads forward.
    /// `f` receives the clamped covered range `(from, to)` and the value of
    /// every line that overlaps the request. Scanning stops past `high`, at the
    /// next header, or at the end of the file.
    pub fn visit<R, F>(&self, reader: &mut R, low: u64, high: u64, mut f: F) -> Result<()>
    where
        R: BufRead + Seek,
        F: FnMut(u64, u64, f32),
    {
        let low = low.max(self.start);
        let high = high.min(self.stop);
        if low > high {
            return Ok(());
        }
        let Some(entry) = self.upstream_entry(low).or(self.entries.first()) else {
            return Ok(());
        };

        reader.seek(SeekFrom::Start(entry.offset))?;
        let mut lines = LineReader::at(&mut *reader, entry.offset, entry.line);
        let mut bp = entry.bp;
        while lines.advance()? {
            let text = lines.text()?;
            match LineKind::classify(text) {
                LineKind::Ignored => continue,
                LineKind::Header | LineKind::Track => break,
                LineKind::Data => {}
            }

            if let StepKind::Variable = self.kind {
                bp = parse_position(text, lines.line_number())?;
            }
            if bp > high {
                break;
            }
            let last = bp.saturating_add(self.span - 1);
            if last >= low {
                let token = match self.kind {
                    StepKind::Fixed { .. } => text.trim(),
                    StepKind::Variable => value_token(text, lines.line_number())?,
                };
                let value = parse_value(token, lines.line_number(), text)?;
                f(bp.max(low), last.min(high), value);
            }
            if let StepKind::Fixed { step } = self.kind {
                bp = bp.saturating_add(step);
            }
        }
        Ok(())
    }

    /// Writes the values of this run that overlap `interval` into `out`.
    ///
    /// `out` is laid out in Watson order over `interval` and is left untouched
    /// where the run has no data.
    pub fn fill<R: BufRead + Seek>(
        &self,
        reader: &mut R,
        interval: &Interval,
        out: &mut [f32],
    ) -> Result<()> {
        self.visit(reader, interval.low(), interval.high(), |from, to, value| {
            let lo = interval.offset_of(from);
            let hi = interval.offset_of(to);
            out[lo..=hi].fill(value);
        })
    }

    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        let discriminator = match self.kind {
            StepKind::Fixed { .. } => FIXED_DISCRIMINATOR,
            StepKind::Variable => VARIABLE_DISCRIMINATOR,
        };
        writer.write_u8(discriminator)?;
        writer.write_u32::<LittleEndian>(self.chrom.len() as u32)?;
        writer.write_all(self.chrom.as_bytes())?;
        writer.write_u64::<LittleEndian>(self.start)?;
        writer.write_u64::<LittleEndian>(self.stop)?;
        writer.write_u64::<LittleEndian>(self.span)?;
        if let StepKind::Fixed { step } = self.kind {
            writer.write_u64::<LittleEndian>(step)?;
        }
        writer.write_u64::<LittleEndian>(self.start_line)?;
        writer.write_u64::<LittleEndian>(self.stop_line)?;
        writer.write_u32::<LittleEndian>(self.entries.len() as u32)?;
        writer.write_all(bytemuck::cast_slice(&self.entries))?;
        Ok(())
    }

    pub fn read_bytes<R: Read>(reader: &mut R) -> Result<Self> {
        let discriminator = reader.read_u8()?;
        if discriminator != FIXED_DISCRIMINATOR && discriminator != VARIABLE_DISCRIMINATOR {
            return Err(IndexError::InvalidDiscriminator(discriminator).into());
        }

        let chrom_len = reader.read_u32::<LittleEndian>()? as usize;
        let chrom = String::from_utf8(read_vec(reader, chrom_len)?)
            .map_err(|e| e.utf8_error())?;

        let start = reader.read_u64::<LittleEndian>()?;
        let stop = reader.read_u64::<LittleEndian>()?;
        let span = reader.read_u64::<LittleEndian>()?;
        let kind = if discriminator == FIXED_DISCRIMINATOR {
            let step = reader.read_u64::<LittleEndian>()?;
            check_positive("step", step)?;
            StepKind::Fixed { step }
        } else {
            StepKind::Variable
        };
        check_positive("span", span)?;
        if stop < start {
            return Err(IndexError::InvalidLength {
                field: "stop",
                value: stop as i64,
            }
            .into());
        }

        let start_line = reader.read_u64::<LittleEndian>()?;
        let stop_line = reader.read_u64::<LittleEndian>()?;
        let n_entries = reader.read_u32::<LittleEndian>()? as usize;
        let raw = read_vec(reader, n_entries * std::mem::size_of::<IndexEntry>())?;
        let mut entries = vec![IndexEntry::zeroed(); n_entries];
        bytemuck::cast_slice_mut(&mut entries).copy_from_slice(&raw);

        Ok(Self {
            chrom,
            start,
            stop,
            span,
            kind,
            start_line,
            stop_line,
            entries,
        })
    }
}

/// Reads exactly `len` bytes, growing the buffer only as data arrives
fn read_vec<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    Read::take(&mut *reader, len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    Ok(buf)
}

fn check_positive(field: &'static str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(IndexError::InvalidLength { field, value: 0 }.into());
    }
    Ok(())
}

/// Parses the base pair of a `bp<TAB>value` line
pub(crate) fn parse_position(text: &str, line: u64) -> Result<u64> {
    let mut tokens = text.split_ascii_whitespace();
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(bp), Some(_), None) => bp.parse::<u64>().map_err(|_| {
            FormatError::InvalidDataLine {
                line,
                text: text.to_string(),
            }
            .into()
        }),
        _ => Err(FormatError::InvalidDataLine {
            line,
            text: text.to_string(),
        }
        .into()),
    }
}

/// The value token of a `bp<TAB>value` line
pub(crate) fn value_token(text: &str, line: u64) -> Result<&str> {
    text.split_ascii_whitespace().nth(1).ok_or_else(|| {
        FormatError::InvalidDataLine {
            line,
            text: text.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    /// Builds a fixed-step descriptor over `data` whose header is on line 1
    fn fixed(start: u64, span: u64, step: u64, n_lines: u64) -> ContigDescriptor {
        let header = ContigHeader::fixed("chrI", start, span, step);
        let mut desc = ContigDescriptor::from_header(header, 2);
        let last = start + (n_lines - 1) * step;
        desc.close(last + span - 1, 1 + n_lines);
        desc
    }

    #[test]
    fn test_parse_header() {
        let desc =
            ContigDescriptor::parse_header("fixedStep chrom=chrI start=5 step=2", 3).unwrap();
        assert_eq!(desc.chrom(), "chrI");
        assert_eq!(desc.start(), 5);
        assert_eq!(desc.span(), 1);
        assert_eq!(desc.step(), Some(2));
        assert_eq!(desc.start_line(), 4);
    }

    #[test]
    fn test_upstream_indexed_bp() {
        let mut desc = fixed(1, 1, 1, 100);
        desc.push_entry(IndexEntry::new(1, 30, 2));
        desc.push_entry(IndexEntry::new(11, 50, 12));
        desc.push_entry(IndexEntry::new(21, 70, 22));

        assert_eq!(desc.upstream_indexed_bp(0), None);
        assert_eq!(desc.upstream_indexed_bp(1), Some(1));
        assert_eq!(desc.upstream_indexed_bp(10), Some(1));
        assert_eq!(desc.upstream_indexed_bp(11), Some(11));
        assert_eq!(desc.upstream_indexed_bp(20), Some(11));
        assert_eq!(desc.upstream_indexed_bp(500), Some(21));
    }

    #[test]
    fn test_line_math() -> Result<()> {
        // start=10, step=5, lines 2..=11
        let desc = fixed(10, 1, 5, 10);
        assert_eq!(desc.stop(), 55);
        assert_eq!(desc.line_num_for_bp(10)?, 2);
        assert_eq!(desc.line_num_for_bp(14)?, 2);
        assert_eq!(desc.line_num_for_bp(15)?, 3);
        assert_eq!(desc.line_num_for_bp(55)?, 11);
        assert_eq!(desc.bp_for_line_num(2)?, 10);
        assert_eq!(desc.bp_for_line_num(11)?, 55);

        assert!(desc.line_num_for_bp(9).is_err());
        assert!(desc.line_num_for_bp(56).is_err());
        assert!(desc.bp_for_line_num(1).is_err());
        assert!(desc.bp_for_line_num(12).is_err());
        Ok(())
    }

    #[test]
    fn test_line_math_variable_step() {
        let desc = ContigDescriptor::from_header(ContigHeader::variable("chrI", 1), 2);
        assert!(desc.line_num_for_bp(1).is_err());
        assert!(desc.bp_for_line_num(2).is_err());
    }

    #[test]
    fn test_fill_fixed_step_with_span() -> Result<()> {
        let text = "fixedStep chrom=chrI start=11 span=2 step=5\n1\n2\n3\n";
        let mut desc = fixed(11, 2, 5, 3);
        // header is 44 bytes long
        desc.push_entry(IndexEntry::new(11, 44, 2));

        let interval = Interval::new("chrI", 10, 22);
        let mut out = vec![f32::NAN; interval.length()];
        desc.fill(&mut Cursor::new(text.as_bytes()), &interval, &mut out)?;

        let expected = [
            None,
            Some(1.0),
            Some(1.0),
            None,
            None,
            None,
            Some(2.0),
            Some(2.0),
            None,
            None,
            None,
            Some(3.0),
            Some(3.0),
        ];
        for (value, expected) in out.iter().zip(expected) {
            match expected {
                Some(v) => assert!((value - v).abs() < f32::EPSILON),
                None => assert!(value.is_nan()),
            }
        }
        Ok(())
    }

    #[test]
    fn test_fill_variable_step_stops_at_header() -> Result<()> {
        let text =
            "variableStep chrom=chrI span=3\n10\t1.5\n20\t2.5\nvariableStep chrom=chrI\n21\t9\n";
        let mut desc = ContigDescriptor::from_header(ContigHeader::variable("chrI", 3), 2);
        desc.set_start(10);
        desc.close(22, 3);
        desc.push_entry(IndexEntry::new(10, 31, 2));

        let interval = Interval::new("chrI", 11, 30);
        let mut out = vec![f32::NAN; interval.length()];
        desc.fill(&mut Cursor::new(text.as_bytes()), &interval, &mut out)?;

        assert!((out[0] - 1.5).abs() < f32::EPSILON);
        assert!((out[1] - 1.5).abs() < f32::EPSILON);
        assert!(out[2].is_nan());
        assert!((out[9] - 2.5).abs() < f32::EPSILON);
        assert!((out[11] - 2.5).abs() < f32::EPSILON);
        assert!(out[12..].iter().all(|v| v.is_nan()));
        Ok(())
    }

    #[test]
    fn test_fill_reports_bad_value_line() {
        let text = "fixedStep chrom=chrI start=1 step=1\n1\nxyz\n3\n";
        let mut desc = fixed(1, 1, 1, 3);
        desc.push_entry(IndexEntry::new(1, 36, 2));

        let interval = Interval::new("chrI", 1, 3);
        let mut out = vec![f32::NAN; 3];
        let err = desc
            .fill(&mut Cursor::new(text.as_bytes()), &interval, &mut out)
            .unwrap_err();
        match err {
            crate::Error::FormatError(e) => assert_eq!(e.line(), 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position("100\t2.5", 1).unwrap(), 100);
        assert_eq!(parse_position("100 2.5", 1).unwrap(), 100);
        assert!(parse_position("100", 1).is_err());
        assert!(parse_position("abc\t1", 1).is_err());
        assert!(parse_position("1\t2\t3", 1).is_err());
    }

    #[test]
    fn test_bytes() -> Result<()> {
        let mut desc = fixed(5, 2, 3, 40);
        desc.push_entry(IndexEntry::new(5, 100, 2));
        desc.push_entry(IndexEntry::new(35, 160, 12));

        let mut buffer = Vec::new();
        desc.write_bytes(&mut buffer)?;
        let restored = ContigDescriptor::read_bytes(&mut buffer.as_slice())?;
        assert_eq!(desc, restored);

        let var = ContigDescriptor::from_header(ContigHeader::variable("chrM", 7), 9);
        let mut buffer = Vec::new();
        var.write_bytes(&mut buffer)?;
        assert_eq!(buffer[0], VARIABLE_DISCRIMINATOR);
        let restored = ContigDescriptor::read_bytes(&mut buffer.as_slice())?;
        assert_eq!(var, restored);
        Ok(())
    }

    #[test]
    fn test_fill_with_huge_step() -> Result<()> {
        let text = "fixedStep chrom=chrI step=18446744073709551615\n4\n";
        let mut desc = fixed(1, 1, u64::MAX, 1);
        desc.push_entry(IndexEntry::new(1, 47, 2));

        let interval = Interval::new("chrI", 1, 1);
        let mut out = vec![f32::NAN; 1];
        desc.fill(&mut Cursor::new(text.as_bytes()), &interval, &mut out)?;
        assert!((out[0] - 4.0).abs() < f32::EPSILON);
        Ok(())
    }

    #[test]
    fn test_truncated_entries() -> Result<()> {
        let mut desc = fixed(1, 1, 1, 10);
        desc.push_entry(IndexEntry::new(1, 36, 2));
        desc.push_entry(IndexEntry::new(6, 46, 7));

        let mut buffer = Vec::new();
        desc.write_bytes(&mut buffer)?;
        buffer.truncate(buffer.len() - 1);
        let err = ContigDescriptor::read_bytes(&mut buffer.as_slice()).unwrap_err();
        assert!(matches!(err, crate::Error::IoError(_)));
        Ok(())
    }

    #[test]
    fn test_invalid_discriminator() {
        let err = ContigDescriptor::read_bytes(&mut [9u8; 64].as_slice()).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::IndexError(IndexError::InvalidDiscriminator(9))
        ));
    }
}
