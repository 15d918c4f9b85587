use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, info};

use super::TrackIndex;
use crate::core::utils::parse_value;
use crate::core::{
    parse_position, value_token, ContigDescriptor, IndexEntry, LineKind, LineReader, StepKind,
    SummaryStats,
};
use crate::error::{FormatError, Result};
use crate::DEFAULT_SAMPLING;

/// Builds a [`TrackIndex`] with a single sequential scan of Wiggle text.
///
/// The first data line of every contig is always indexed, followed by every
/// `sampling`-th data line after it. Smaller sampling intervals make queries
/// seek closer to their target at the cost of a larger index.
#[derive(Debug, Clone, Copy)]
pub struct IndexBuilder {
    sampling: u64,
}
impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLING)
    }
}
impl IndexBuilder {
    /// Creates a builder indexing every `sampling`-th data line (0 is treated as 1)
    #[must_use]
    pub fn new(sampling: u64) -> Self {
        Self {
            sampling: sampling.max(1),
        }
    }

    #[must_use]
    pub fn sampling(&self) -> u64 {
        self.sampling
    }

    /// Indexes the file at `path`
    pub fn build_path<P: AsRef<Path>>(&self, path: P) -> Result<TrackIndex> {
        let path = path.as_ref();
        info!("Indexing {}", path.display());
        let file = File::open(path)?;
        self.build(BufReader::new(file))
    }

    /// Indexes Wiggle text read from `reader`.
    ///
    /// Byte offsets in the index are relative to the first byte of `reader`.
    pub fn build<R: BufRead>(&self, reader: R) -> Result<TrackIndex> {
        let mut lines = LineReader::new(reader).with_checksum();
        let mut index = TrackIndex::new(0, SummaryStats::new());
        let mut stats = SummaryStats::new();
        let mut state = ContigState::default();
        let mut seen_header = false;

        while lines.advance()? {
            let line = lines.line_number();
            let text = lines.text()?;
            match LineKind::classify(text) {
                LineKind::Ignored => {}
                LineKind::Track => {
                    if seen_header {
                        return Err(FormatError::UnexpectedTrackLine {
                            line,
                            text: text.to_string(),
                        }
                        .into());
                    }
                    debug!("Skipping track line {line}");
                }
                LineKind::Header => {
                    let mut descriptor = ContigDescriptor::parse_header(text, line)?;
                    seen_header = true;
                    if let Some(previous) = state.current.take() {
                        state.close(previous, &mut index);
                    }
                    match descriptor.kind() {
                        StepKind::Fixed { .. } => state.next_bp = Some(descriptor.start()),
                        StepKind::Variable => {
                            if let Some(first) = peek_position(&mut lines)? {
                                descriptor.set_start(first);
                            }
                        }
                    }
                    state.reset(descriptor);
                }
                LineKind::Data => {
                    let Some(descriptor) = state.current.as_mut() else {
                        return Err(FormatError::MissingContigHeader {
                            line,
                            text: text.to_string(),
                        }
                        .into());
                    };

                    let overflow = || FormatError::CoordinateOverflow {
                        line,
                        text: text.to_string(),
                    };
                    let (bp, token) = match descriptor.kind() {
                        StepKind::Fixed { step } => {
                            let bp = state.next_bp.ok_or_else(overflow)?;
                            state.next_bp = bp.checked_add(step);
                            (bp, text.trim())
                        }
                        StepKind::Variable => {
                            let bp = parse_position(text, line)?;
                            if state.n_lines > 0 && bp <= state.last_bp {
                                return Err(FormatError::UnsortedPosition {
                                    line,
                                    text: text.to_string(),
                                }
                                .into());
                            }
                            (bp, value_token(text, line)?)
                        }
                    };

                    let last = bp
                        .checked_add(descriptor.span() - 1)
                        .ok_or_else(overflow)?;
                    let value = parse_value(token, line, text)?;
                    stats.push_n(value, descriptor.span());

                    if state.n_lines % self.sampling == 0 {
                        descriptor.push_entry(IndexEntry::new(bp, lines.offset(), line));
                    }
                    state.last_bp = bp;
                    state.last_stop = last;
                    state.last_line = line;
                    state.n_lines += 1;
                }
            }
        }
        if let Some(last) = state.current.take() {
            state.close(last, &mut index);
        }

        index.set_stats(stats);
        index.set_checksum(lines.checksum().unwrap_or_default());
        info!(
            "Indexed {} contigs on {} chromosomes",
            index.num_contigs(),
            index.chromosomes().len()
        );
        debug!("Source checksum: {:#018x}", index.checksum());
        Ok(index)
    }
}

/// Scan state of the contig being indexed
#[derive(Default)]
struct ContigState {
    current: Option<ContigDescriptor>,

    /// Base pair of the next fixed-step line, `None` once it no longer fits in a `u64`
    next_bp: Option<u64>,

    /// Base pair of the last data line
    last_bp: u64,

    /// Last base pair covered by the last data line
    last_stop: u64,

    /// Line number of the last data line
    last_line: u64,

    /// Number of data lines seen in the contig
    n_lines: u64,
}
impl ContigState {
    fn reset(&mut self, descriptor: ContigDescriptor) {
        self.current = Some(descriptor);
        self.last_bp = 0;
        self.last_stop = 0;
        self.last_line = 0;
        self.n_lines = 0;
    }

    /// Finalizes the extent of a contig and records it, dropping it when empty
    fn close(&self, mut descriptor: ContigDescriptor, index: &mut TrackIndex) {
        if self.n_lines == 0 {
            debug!(
                "Dropping empty contig {}:{} declared before line {}",
                descriptor.chrom(),
                descriptor.start(),
                descriptor.start_line()
            );
            return;
        }
        descriptor.close(self.last_stop, self.last_line);
        debug!(
            "Contig {}:{}-{} on lines {}-{}",
            descriptor.chrom(),
            descriptor.start(),
            descriptor.stop(),
            descriptor.start_line(),
            descriptor.stop_line()
        );
        index.push(descriptor);
    }
}

/// Looks ahead for the position of the first data line of a variable-step contig.
///
/// Ignored lines are consumed. The first line that is not ignored is pushed
/// back so the main scan sees it next.
fn peek_position<R: BufRead>(lines: &mut LineReader<R>) -> Result<Option<u64>> {
    while lines.advance()? {
        let text = lines.text()?;
        match LineKind::classify(text) {
            LineKind::Ignored => {}
            LineKind::Data => {
                let bp = parse_position(text, lines.line_number())?;
                lines.unread();
                return Ok(Some(bp));
            }
            LineKind::Header | LineKind::Track => {
                lines.unread();
                return Ok(None);
            }
        }
    }
    Ok(None)
}
