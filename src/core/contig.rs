use std::borrow::Cow;
use std::cell::OnceCell;

use super::{Interval, SummaryStats};
use crate::error::{Result, WriteError};

/// A dense array of values over one interval, one value per base pair.
///
/// Missing data is stored as `NaN`. Values are laid out in the orientation of
/// the interval: for a Crick interval the first value belongs to the highest
/// base pair. Summary statistics are computed on first use and dropped on any
/// mutation.
#[derive(Debug, Clone)]
pub struct Contig {
    interval: Interval,
    values: Vec<f32>,
    stats: OnceCell<SummaryStats>,
}
impl Contig {
    /// Creates a contig from values laid out in the orientation of `interval`
    pub fn new(interval: Interval, values: Vec<f32>) -> Result<Self> {
        if values.len() != interval.length() {
            return Err(WriteError::LengthMismatch {
                expected: interval.length(),
                got: values.len(),
            }
            .into());
        }
        Ok(Self {
            interval,
            values,
            stats: OnceCell::new(),
        })
    }

    /// Creates a contig with every value missing
    #[must_use]
    pub fn nan(interval: Interval) -> Self {
        let values = vec![f32::NAN; interval.length()];
        Self {
            interval,
            values,
            stats: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    #[must_use]
    pub fn chrom(&self) -> &str {
        self.interval.chrom()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// A contig always covers at least one base pair
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Mutable access to the values; cached statistics are dropped
    pub fn values_mut(&mut self) -> &mut [f32] {
        self.stats.take();
        &mut self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<f32> {
        self.values
    }

    fn position(&self, bp: u64) -> Option<usize> {
        if !self.interval.contains(bp) {
            return None;
        }
        Some(if self.interval.is_watson() {
            (bp - self.interval.low()) as usize
        } else {
            (self.interval.high() - bp) as usize
        })
    }

    /// Value at a base pair, `None` if the base pair is outside the contig
    #[must_use]
    pub fn get(&self, bp: u64) -> Option<f32> {
        self.position(bp).map(|i| self.values[i])
    }

    /// Sets the value at a base pair
    pub fn set(&mut self, bp: u64, value: f32) -> Result<()> {
        let Some(i) = self.position(bp) else {
            return Err(WriteError::OutOfContig {
                bp,
                start: self.interval.low(),
                stop: self.interval.high(),
            }
            .into());
        };
        self.stats.take();
        self.values[i] = value;
        Ok(())
    }

    /// Reverses the orientation of the contig (values and interval)
    pub fn flip(&mut self) {
        self.values.reverse();
        self.interval = self.interval.flipped();
    }

    /// Borrows the contig in Watson orientation, copying only when it is Crick
    #[must_use]
    pub fn to_watson(&self) -> Cow<'_, Self> {
        if self.interval.is_watson() {
            Cow::Borrowed(self)
        } else {
            let mut watson = self.clone();
            watson.flip();
            Cow::Owned(watson)
        }
    }

    /// Lazily computed statistics over the finite values
    pub fn stats(&self) -> &SummaryStats {
        self.stats
            .get_or_init(|| SummaryStats::from_values(&self.values))
    }

    /// Number of base pairs with a finite value
    #[must_use]
    pub fn coverage(&self) -> u64 {
        self.stats().count()
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.stats().total()
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        self.stats().mean()
    }

    #[must_use]
    pub fn stdev(&self) -> f64 {
        self.stats().stdev()
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.stats().min()
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.stats().max()
    }

    /// Fraction of base pairs that are not NaN
    #[must_use]
    pub fn density(&self) -> f64 {
        let present = self.values.iter().filter(|v| !v.is_nan()).count();
        present as f64 / self.values.len() as f64
    }
}
