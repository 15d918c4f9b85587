//! Writing contigs as compact Wiggle text
//!
//! [`WigWriter`] picks the encoding of every contig with a
//! [`CompactionPlanner`]: `fixedStep` when the values sit on a regular grid and
//! are dense enough, `variableStep` otherwise. Contigs without any data are
//! skipped.
//!
//! # Example
//!
//! ```rust
//! use wigidx::{Contig, Interval, WigWriterBuilder};
//!
//! let mut writer = WigWriterBuilder::default()
//!     .track_line("type=wiggle_0 name=example")
//!     .build(Vec::new())
//!     .unwrap();
//!
//! let values = vec![f32::NAN, 3.0, 3.0, f32::NAN, 3.0, 3.0];
//! let contig = Contig::new(Interval::new("chrI", 1, 6), values).unwrap();
//! writer.write(&contig).unwrap();
//!
//! let text = String::from_utf8(writer.finish().unwrap()).unwrap();
//! assert!(text.contains("fixedStep chrom=chrI start=2 span=2 step=3"));
//! ```
//!
//! # Parallel Writing
//!
//! [`SharedWigWriter`] wraps a writer in an `Arc<Mutex<_>>` so that several
//! threads can write contigs into the same output. Each contig is rendered
//! and written while the lock is held, so contigs are never interleaved.

use std::fmt::Write as _;
use std::io::Write;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::compact::{CompactionPlanner, Encoding};
use crate::core::{format_value, Contig, ContigHeader};
use crate::error::{Result, WriteError};
use crate::parallel::ParallelProcessor;
use crate::{DEFAULT_DENSITY_THRESHOLD, DEFAULT_PRECISION};

/// Builder for creating configured [`WigWriter`] instances
#[derive(Debug, Clone)]
pub struct WigWriterBuilder {
    /// Minimum fraction of non-NaN values for `fixedStep` output
    density_threshold: f64,
    /// Maximum number of fractional digits per value
    precision: usize,
    /// Optional `track` line written before the first contig
    track_line: Option<String>,
}
impl Default for WigWriterBuilder {
    fn default() -> Self {
        Self {
            density_threshold: DEFAULT_DENSITY_THRESHOLD,
            precision: DEFAULT_PRECISION,
            track_line: None,
        }
    }
}
impl WigWriterBuilder {
    #[must_use]
    pub fn density_threshold(mut self, threshold: f64) -> Self {
        self.density_threshold = threshold;
        self
    }

    #[must_use]
    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Attributes of the `track` line (without the `track` keyword)
    #[must_use]
    pub fn track_line<S: Into<String>>(mut self, attributes: S) -> Self {
        self.track_line = Some(attributes.into());
        self
    }

    /// Builds the writer, writing the track line if one was given
    pub fn build<W: Write>(self, inner: W) -> Result<WigWriter<W>> {
        if !(0.0..=1.0).contains(&self.density_threshold) {
            return Err(WriteError::InvalidDensity(self.density_threshold).into());
        }
        let mut writer = WigWriter {
            inner,
            density_threshold: self.density_threshold,
            precision: self.precision,
            buffer: String::new(),
            n_contigs: 0,
        };
        if let Some(attributes) = self.track_line {
            writeln!(writer.inner, "track {attributes}")?;
        }
        Ok(writer)
    }
}

/// Writes contigs as `fixedStep` / `variableStep` Wiggle text
pub struct WigWriter<W: Write> {
    inner: W,
    density_threshold: f64,
    precision: usize,

    /// Reusable text buffer of the contig being written
    buffer: String,

    /// Number of contigs written so far
    n_contigs: usize,
}
impl<W: Write> WigWriter<W> {
    /// Creates a writer with the default settings and no track line
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            density_threshold: DEFAULT_DENSITY_THRESHOLD,
            precision: DEFAULT_PRECISION,
            buffer: String::new(),
            n_contigs: 0,
        }
    }

    #[must_use]
    pub fn n_contigs(&self) -> usize {
        self.n_contigs
    }

    /// Renders a contig into Wiggle text without writing it.
    ///
    /// Returns `None` when every value is NaN.
    pub fn render(&mut self, contig: &Contig) -> Result<Option<&str>> {
        let chrom = contig.chrom();
        if chrom.is_empty() || chrom.chars().any(char::is_whitespace) {
            return Err(WriteError::InvalidChromosome(chrom.to_string()).into());
        }

        let contig = contig.to_watson();
        let start = contig.interval().low();
        let values = contig.values();
        let planner = CompactionPlanner::new(values);
        let Some(encoding) = planner.plan(self.density_threshold) else {
            debug!("Skipping {} without data", contig.interval());
            return Ok(None);
        };

        self.buffer.clear();
        match encoding {
            Encoding::Fixed { offset, span, step } => {
                let header = ContigHeader::fixed(chrom, start + offset as u64, span, step);
                let _ = writeln!(self.buffer, "{header}");
                for value in values[offset..planner.data_end()]
                    .iter()
                    .step_by(step as usize)
                {
                    format_value(&mut self.buffer, *value, self.precision);
                    self.buffer.push('\n');
                }
            }
            Encoding::Variable { span } => {
                let header = ContigHeader::variable(chrom, span);
                let _ = writeln!(self.buffer, "{header}");
                for run in planner.runs() {
                    let bp = start + run.offset as u64;
                    for k in 0..(run.len as u64 / span) {
                        let _ = write!(self.buffer, "{}\t", bp + k * span);
                        format_value(&mut self.buffer, run.value, self.precision);
                        self.buffer.push('\n');
                    }
                }
            }
        }
        debug!("Rendered {} as {:?}", contig.interval(), encoding);
        Ok(Some(self.buffer.as_str()))
    }

    /// Writes a contig, returning `false` if it was skipped for having no data
    pub fn write(&mut self, contig: &Contig) -> Result<bool> {
        if self.render(contig)?.is_none() {
            return Ok(false);
        }
        self.inner.write_all(self.buffer.as_bytes())?;
        self.n_contigs += 1;
        Ok(true)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Flushes the writer and returns the inner handle
    pub fn finish(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.inner)
    }
}

/// A [`WigWriter`] that can be shared between threads
pub struct SharedWigWriter<W: Write> {
    inner: Arc<Mutex<WigWriter<W>>>,
}
impl<W: Write> Clone for SharedWigWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
impl<W: Write> SharedWigWriter<W> {
    pub fn new(writer: WigWriter<W>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    /// Writes a contig while holding the lock
    pub fn write(&self, contig: &Contig) -> Result<bool> {
        self.inner.lock().write(contig)
    }

    pub fn flush(&self) -> Result<()> {
        self.inner.lock().flush()
    }

    #[must_use]
    pub fn n_contigs(&self) -> usize {
        self.inner.lock().n_contigs()
    }

    /// Returns the writer if this is the last handle to it
    pub fn into_inner(self) -> Option<WigWriter<W>> {
        Arc::try_unwrap(self.inner).ok().map(Mutex::into_inner)
    }
}
impl<W: Write + Send> ParallelProcessor for SharedWigWriter<W> {
    fn process_contig(&mut self, contig: Contig) -> Result<()> {
        self.write(&contig)?;
        Ok(())
    }

    fn on_batch_complete(&mut self) -> Result<()> {
        self.flush()
    }
}

#[cfg(test)]
mod testing {
    use std::thread;

    use super::*;
    use crate::core::Interval;

    const NAN: f32 = f32::NAN;

    fn render(contig: &Contig) -> String {
        let mut writer = WigWriter::new(Vec::new());
        writer.write(contig).unwrap();
        String::from_utf8(writer.finish().unwrap()).unwrap()
    }

    fn contig(chrom: &str, start: u64, values: &[f32]) -> Contig {
        let stop = start + values.len() as u64 - 1;
        Contig::new(Interval::new(chrom, start, stop), values.to_vec()).unwrap()
    }

    #[test]
    fn test_write_fixed_step() {
        let text = render(&contig(
            "chrI",
            1,
            &[NAN, NAN, 3.0, 3.0, NAN, 3.0, 3.0, NAN, 4.0, 4.0],
        ));
        assert_eq!(text, "fixedStep chrom=chrI start=3 span=2 step=3\n3\n3\n4\n");
    }

    #[test]
    fn test_write_dense_values() {
        let text = render(&contig("chrII", 100, &[0.5, 1.25, -2.0]));
        assert_eq!(
            text,
            "fixedStep chrom=chrII start=100 span=1 step=1\n0.5\n1.25\n-2\n"
        );
    }

    #[test]
    fn test_write_variable_step() {
        let text = render(&contig("chrI", 10, &[1.0, 1.0, 1.0, 2.0, 2.0]));
        assert_eq!(
            text,
            "variableStep chrom=chrI span=1\n10\t1\n11\t1\n12\t1\n13\t2\n14\t2\n"
        );
    }

    #[test]
    fn test_write_variable_step_with_span() {
        let text = render(&contig("chrI", 1, &[5.0, 5.0, NAN, NAN, NAN, 6.0, 6.0, 6.0, 6.0]));
        assert_eq!(text, "variableStep chrom=chrI span=2\n1\t5\n6\t6\n8\t6\n");
    }

    #[test]
    fn test_write_crick_contig() {
        let crick = Contig::new(Interval::new("chrI", 3, 1), vec![3.0, 2.0, 1.0]).unwrap();
        let text = render(&crick);
        assert_eq!(text, "fixedStep chrom=chrI start=1 span=1 step=1\n1\n2\n3\n");
    }

    #[test]
    fn test_all_nan_is_skipped() {
        let mut writer = WigWriter::new(Vec::new());
        assert!(!writer.write(&contig("chrI", 1, &[NAN, NAN])).unwrap());
        assert_eq!(writer.n_contigs(), 0);
        assert!(writer.finish().unwrap().is_empty());
    }

    #[test]
    fn test_special_values() {
        let text = render(&contig("chrI", 1, &[f32::INFINITY, f32::NEG_INFINITY]));
        assert_eq!(
            text,
            "fixedStep chrom=chrI start=1 span=1 step=1\nInfinity\n-Infinity\n"
        );
    }

    #[test]
    fn test_precision() {
        let mut writer = WigWriterBuilder::default()
            .precision(2)
            .build(Vec::new())
            .unwrap();
        writer.write(&contig("chrI", 1, &[1.0 / 3.0])).unwrap();
        let text = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert!(text.ends_with("\n0.33\n"));
    }

    #[test]
    fn test_track_line() {
        let writer = WigWriterBuilder::default()
            .track_line("type=wiggle_0 name=test")
            .build(Vec::new())
            .unwrap();
        let text = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(text, "track type=wiggle_0 name=test\n");
    }

    #[test]
    fn test_invalid_density() {
        let result = WigWriterBuilder::default()
            .density_threshold(1.5)
            .build(Vec::new());
        assert!(matches!(
            result,
            Err(crate::Error::WriteError(WriteError::InvalidDensity(_)))
        ));
    }

    #[test]
    fn test_invalid_chromosome() {
        let mut writer = WigWriter::new(Vec::new());
        for chrom in ["", "chr I"] {
            let err = writer.write(&contig(chrom, 1, &[1.0])).unwrap_err();
            assert!(matches!(
                err,
                crate::Error::WriteError(WriteError::InvalidChromosome(_))
            ));
        }
    }

    #[test]
    fn test_shared_writer_keeps_contigs_whole() {
        let shared = SharedWigWriter::new(WigWriter::new(Vec::new()));
        thread::scope(|scope| {
            for t in 0..4u64 {
                let shared = shared.clone();
                scope.spawn(move || {
                    for i in 0..10u64 {
                        let values = vec![(t * 10 + i) as f32; 5];
                        shared
                            .write(&contig(&format!("chr{t}"), i * 100 + 1, &values))
                            .unwrap();
                    }
                });
            }
        });
        assert_eq!(shared.n_contigs(), 40);

        let writer = shared.into_inner().unwrap();
        let text = String::from_utf8(writer.finish().unwrap()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 80);
        for pair in lines.chunks(2) {
            assert!(pair[0].starts_with("fixedStep"));
            assert!(!pair[1].starts_with("fixedStep"));
        }
    }
}
