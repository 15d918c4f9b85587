use std::fmt;
use std::str::FromStr;

use crate::error::{RangeError, Result};

/// A genomic interval on one chromosome, in 1-based inclusive base pairs.
///
/// The orientation is implied by the order of the coordinates: `start <= stop`
/// is Watson (forward), `start > stop` is Crick (reverse). Values queried for a
/// Crick interval are returned in reverse order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    chrom: String,
    start: u64,
    stop: u64,
}
impl Interval {
    #[must_use]
    pub fn new(chrom: impl Into<String>, start: u64, stop: u64) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            stop,
        }
    }

    #[must_use]
    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    /// The first coordinate as given (may be greater than `stop` for Crick intervals)
    #[must_use]
    pub fn start(&self) -> u64 {
        self.start
    }

    #[must_use]
    pub fn stop(&self) -> u64 {
        self.stop
    }

    /// The lower of the two coordinates
    #[must_use]
    pub fn low(&self) -> u64 {
        self.start.min(self.stop)
    }

    /// The higher of the two coordinates
    #[must_use]
    pub fn high(&self) -> u64 {
        self.start.max(self.stop)
    }

    #[must_use]
    pub fn is_watson(&self) -> bool {
        self.start <= self.stop
    }

    #[must_use]
    pub fn is_crick(&self) -> bool {
        !self.is_watson()
    }

    /// Number of base pairs covered (always at least 1)
    #[must_use]
    pub fn length(&self) -> usize {
        (self.high() - self.low() + 1) as usize
    }

    #[must_use]
    pub fn contains(&self, bp: u64) -> bool {
        bp >= self.low() && bp <= self.high()
    }

    /// Checks whether `[low, high]` of this interval intersects `[start, stop]`
    #[must_use]
    pub fn overlaps(&self, start: u64, stop: u64) -> bool {
        self.low() <= stop && self.high() >= start
    }

    /// Returns the same interval in Watson orientation
    #[must_use]
    pub fn to_watson(&self) -> Self {
        Self::new(self.chrom.clone(), self.low(), self.high())
    }

    /// Returns the same interval with its orientation flipped
    #[must_use]
    pub fn flipped(&self) -> Self {
        Self::new(self.chrom.clone(), self.stop, self.start)
    }

    /// Offset of `bp` into an array laid out in Watson order
    pub(crate) fn offset_of(&self, bp: u64) -> usize {
        (bp - self.low()) as usize
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.stop)
    }
}

impl FromStr for Interval {
    type Err = crate::Error;

    /// Parses `chr:start-stop` (commas in coordinates are ignored)
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || RangeError::InvalidInterval(s.to_string());
        let (chrom, coords) = s.trim().rsplit_once(':').ok_or_else(invalid)?;
        let (start, stop) = coords.split_once('-').ok_or_else(invalid)?;
        let parse = |v: &str| v.replace(',', "").trim().parse::<u64>();
        match (parse(start), parse(stop)) {
            (Ok(start), Ok(stop)) if !chrom.is_empty() => Ok(Self::new(chrom, start, stop)),
            _ => Err(invalid().into()),
        }
    }
}
