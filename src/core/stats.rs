use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::Result;

/// Size of the serialized statistics in bytes
pub const SIZE_STATS: usize = 40;

/// Running summary statistics over finite values.
///
/// NaN and infinite values are ignored. The variance is the population
/// variance, so a single value has a variance of zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryStats {
    /// Number of values accumulated
    count: u64,
    sum: f64,
    sum_squares: f64,
    min: f64,
    max: f64,
}
impl Default for SummaryStats {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sum_squares: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}
impl SummaryStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes statistics over a slice of values
    #[must_use]
    pub fn from_values(values: &[f32]) -> Self {
        let mut stats = Self::new();
        values.iter().for_each(|&v| stats.push(v));
        stats
    }

    /// Adds a single value
    pub fn push(&mut self, value: f32) {
        self.push_n(value, 1);
    }

    /// Adds `n` copies of a value (one per covered base pair)
    pub fn push_n(&mut self, value: f32, n: u64) {
        if !value.is_finite() || n == 0 {
            return;
        }
        let v = f64::from(value);
        let w = n as f64;
        self.count = self.count.saturating_add(n);
        self.sum += v * w;
        self.sum_squares += v * v * w;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }

    /// Combines the statistics of another accumulator into this one
    pub fn merge(&mut self, other: &Self) {
        self.count += other.count;
        self.sum += other.sum;
        self.sum_squares += other.sum_squares;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Number of base pairs with a finite value
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.sum
    }

    #[must_use]
    pub fn sum_squares(&self) -> f64 {
        self.sum_squares
    }

    /// Mean of the values, `NaN` when empty
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }
        self.sum / self.count as f64
    }

    /// Population variance, `NaN` when empty
    #[must_use]
    pub fn variance(&self) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }
        let mean = self.mean();
        (self.sum_squares / self.count as f64 - mean * mean).max(0.0)
    }

    /// Population standard deviation, `NaN` when empty
    #[must_use]
    pub fn stdev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Minimum value, `NaN` when empty
    #[must_use]
    pub fn min(&self) -> f64 {
        if self.is_empty() {
            f64::NAN
        } else {
            self.min
        }
    }

    /// Maximum value, `NaN` when empty
    #[must_use]
    pub fn max(&self) -> f64 {
        if self.is_empty() {
            f64::NAN
        } else {
            self.max
        }
    }

    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u64::<LittleEndian>(self.count)?;
        writer.write_f64::<LittleEndian>(self.sum)?;
        writer.write_f64::<LittleEndian>(self.sum_squares)?;
        writer.write_f64::<LittleEndian>(self.min)?;
        writer.write_f64::<LittleEndian>(self.max)?;
        Ok(())
    }

    pub fn read_bytes<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            count: reader.read_u64::<LittleEndian>()?,
            sum: reader.read_f64::<LittleEndian>()?,
            sum_squares: reader.read_f64::<LittleEndian>()?,
            min: reader.read_f64::<LittleEndian>()?,
            max: reader.read_f64::<LittleEndian>()?,
        })
    }
}
