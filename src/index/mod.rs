//! # Track Index
//!
//! A [`TrackIndex`] is the in-memory result of one sequential scan of a Wiggle
//! file. It maps every chromosome to the ordered list of
//! [`ContigDescriptor`]s declared for it, keeps whole-file summary statistics,
//! and remembers the checksum of the source file it was built from.
//!
//! The index is immutable once built and can be shared by many readers
//! through an `Arc`.
//!
//! ## Index Cache
//!
//! An index can be persisted next to its source file and reloaded on the next
//! open. The cache is accepted only if its format version matches
//! [`INDEX_VERSION`](crate::INDEX_VERSION) and its checksum matches the
//! current content of the source file.
//!
//! ```text
//! ┌───────────────────────────┐
//! │ i64 format version        │
//! ├───────────────────────────┤
//! │ u64 source checksum       │
//! ├───────────────────────────┤
//! │ whole-file statistics     │ 40 bytes
//! ├───────────────────────────┤
//! │ i32 contig count          │
//! ├───────────────────────────┤
//! │ contig descriptor         │ variable size
//! │ ...                       │
//! └───────────────────────────┘
//! ```

mod builder;
mod cache;

pub use builder::IndexBuilder;
pub use cache::default_index_path;

use std::collections::HashMap;

use crate::core::{ContigDescriptor, Interval, SummaryStats};
use crate::error::{RangeError, Result};
use crate::INDEX_VERSION;

/// Index of the contigs of one Wiggle file
#[derive(Debug, Clone, PartialEq)]
pub struct TrackIndex {
    /// Checksum of the source file at build time
    checksum: u64,

    /// Statistics over every base pair of the file
    stats: SummaryStats,

    /// Chromosome names in order of first appearance
    chromosomes: Vec<String>,

    /// Descriptors per chromosome, in file order
    contigs: HashMap<String, Vec<ContigDescriptor>>,
}
impl TrackIndex {
    pub(crate) fn new(checksum: u64, stats: SummaryStats) -> Self {
        Self {
            checksum,
            stats,
            chromosomes: Vec::new(),
            contigs: HashMap::new(),
        }
    }

    /// Appends a descriptor under its chromosome
    pub(crate) fn push(&mut self, descriptor: ContigDescriptor) {
        match self.contigs.get_mut(descriptor.chrom()) {
            Some(list) => list.push(descriptor),
            None => {
                self.chromosomes.push(descriptor.chrom().to_string());
                self.contigs
                    .insert(descriptor.chrom().to_string(), vec![descriptor]);
            }
        }
    }

    pub(crate) fn set_checksum(&mut self, checksum: u64) {
        self.checksum = checksum;
    }

    pub(crate) fn set_stats(&mut self, stats: SummaryStats) {
        self.stats = stats;
    }

    /// Format version of the index
    #[must_use]
    pub fn version(&self) -> i64 {
        INDEX_VERSION
    }

    #[must_use]
    pub fn checksum(&self) -> u64 {
        self.checksum
    }

    /// Whole-file statistics (each value counted once per covered base pair)
    #[must_use]
    pub fn stats(&self) -> &SummaryStats {
        &self.stats
    }

    /// Chromosome names in order of first appearance
    #[must_use]
    pub fn chromosomes(&self) -> &[String] {
        &self.chromosomes
    }

    #[must_use]
    pub fn contains(&self, chrom: &str) -> bool {
        self.contigs.contains_key(chrom)
    }

    /// Descriptors of a chromosome in file order (empty for unknown chromosomes)
    #[must_use]
    pub fn descriptors(&self, chrom: &str) -> &[ContigDescriptor] {
        self.contigs.get(chrom).map_or(&[], Vec::as_slice)
    }

    /// Every descriptor, grouped by chromosome in order of first appearance
    pub fn iter_descriptors(&self) -> impl Iterator<Item = &ContigDescriptor> {
        self.chromosomes
            .iter()
            .flat_map(|chrom| self.descriptors(chrom))
    }

    #[must_use]
    pub fn num_contigs(&self) -> usize {
        self.contigs.values().map(Vec::len).sum()
    }

    /// Lowest base pair with data on a chromosome
    #[must_use]
    pub fn chrom_start(&self, chrom: &str) -> Option<u64> {
        self.descriptors(chrom).iter().map(ContigDescriptor::start).min()
    }

    /// Highest base pair with data on a chromosome
    #[must_use]
    pub fn chrom_stop(&self, chrom: &str) -> Option<u64> {
        self.descriptors(chrom).iter().map(ContigDescriptor::stop).max()
    }

    /// Descriptors of `chrom` that intersect `[low, high]`
    pub fn overlapping<'a>(
        &'a self,
        chrom: &str,
        low: u64,
        high: u64,
    ) -> impl Iterator<Item = &'a ContigDescriptor> + 'a {
        self.descriptors(chrom)
            .iter()
            .filter(move |d| d.overlaps(low, high))
    }

    /// Checks that an interval lies within the indexed extent of its chromosome.
    ///
    /// Gaps between contigs inside the extent are allowed.
    pub fn check_interval(&self, interval: &Interval) -> Result<()> {
        let chrom = interval.chrom();
        let (Some(min), Some(max)) = (self.chrom_start(chrom), self.chrom_stop(chrom)) else {
            return Err(RangeError::UnknownChromosome(chrom.to_string()).into());
        };
        if interval.low() < min || interval.high() > max {
            return Err(RangeError::OutOfRange {
                chrom: chrom.to_string(),
                start: interval.start(),
                stop: interval.stop(),
                min,
                max,
            }
            .into());
        }
        Ok(())
    }
}
