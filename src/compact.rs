//! # Compaction planning
//!
//! Chooses the most compact Wiggle encoding of a dense value array.
//!
//! The values are split into runs: maximal stretches of equal, non-NaN values.
//! A NaN always ends a run. A contig whose runs repeat on a regular grid is
//! written as `fixedStep`, everything else as `variableStep` with the largest
//! span that divides every run.
//!
//! ```text
//! values   NaN NaN  3   3  NaN  3   3  NaN  4   4
//! runs             [ 3 x2 ]    [ 3 x2 ]    [ 4 x2 ]
//! grid              step=3      step=3      step=3   span=2
//! ```

use crate::core::Contig;
use crate::DEFAULT_DENSITY_THRESHOLD;

/// A maximal stretch of equal non-NaN values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Run {
    /// Offset of the first value of the run
    pub offset: usize,
    pub len: usize,
    pub value: f32,
}
impl Run {
    /// Offset one past the last value of the run
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Splits values into runs of equal non-NaN values
#[must_use]
pub fn runs(values: &[f32]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (offset, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match runs.last_mut() {
            Some(run) if run.end() == offset && run.value == value => run.len += 1,
            _ => runs.push(Run {
                offset,
                len: 1,
                value,
            }),
        }
    }
    runs
}

/// The encoding chosen for a contig
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// One value every `step` base pairs, starting `offset` values into the contig
    Fixed { offset: usize, span: u64, step: u64 },
    /// One `bp value` line per `span` base pairs of every run
    Variable { span: u64 },
}

/// Analyzes the runs of a value array laid out in Watson order
#[derive(Debug, Clone)]
pub struct CompactionPlanner<'a> {
    values: &'a [f32],
    runs: Vec<Run>,
}
impl<'a> CompactionPlanner<'a> {
    #[must_use]
    pub fn new(values: &'a [f32]) -> Self {
        Self {
            values,
            runs: runs(values),
        }
    }

    #[must_use]
    pub fn values(&self) -> &'a [f32] {
        self.values
    }

    #[must_use]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Whether every value is NaN
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Number of non-NaN values
    #[must_use]
    pub fn coverage(&self) -> usize {
        self.runs.iter().map(|r| r.len).sum()
    }

    /// Fraction of values that are not NaN
    #[must_use]
    pub fn density(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.coverage() as f64 / self.values.len() as f64
    }

    /// Offset one past the last non-NaN value
    #[must_use]
    pub fn data_end(&self) -> usize {
        self.runs.last().map_or(0, Run::end)
    }

    /// Length of the shortest run (1 when there is no data)
    #[must_use]
    pub fn min_span(&self) -> u64 {
        let mut min = usize::MAX;
        for run in &self.runs {
            if run.len == 1 {
                return 1;
            }
            min = min.min(run.len);
        }
        if min == usize::MAX {
            1
        } else {
            min as u64
        }
    }

    /// Largest span that divides the length of every run
    #[must_use]
    pub fn variable_step_span(&self) -> u64 {
        let mut span = self.min_span();
        for run in &self.runs {
            let len = run.len as u64;
            if len % span != 0 {
                span = gcd(span, len);
            }
        }
        span
    }

    /// Distance between the starts of the first two runs.
    ///
    /// With a single run this is the length of that run, with no data it is 1.
    #[must_use]
    pub fn min_step(&self) -> u64 {
        match self.runs.as_slice() {
            [] => 1,
            [only] => only.len as u64,
            [first, second, ..] => (second.offset - first.offset) as u64,
        }
    }

    /// Whether the values can be written as `fixedStep` without losing anything
    #[must_use]
    pub fn is_fixed_step(&self) -> bool {
        self.fixed_step_geometry().is_some()
    }

    /// The `(span, step)` of a lossless fixed-step encoding, if there is one.
    ///
    /// The step is [`min_step`](Self::min_step). The values are cut into blocks
    /// of `step` starting at the first non-NaN value. Each block must be
    /// entirely NaN, or hold `span` copies of one value followed only by NaN.
    /// The span is the length of the first run, capped at the step. The last
    /// block may not extend past the end of the values.
    #[must_use]
    pub fn fixed_step_geometry(&self) -> Option<(u64, u64)> {
        let first = self.runs.first()?;
        let step = self.min_step() as usize;
        let span = first.len.min(step);
        let end = self.data_end();
        let n = self.values.len();

        let mut offset = first.offset;
        while offset < end {
            let block = &self.values[offset..(offset + step).min(n)];
            let head = block[0];
            if head.is_nan() {
                if block.iter().any(|v| !v.is_nan()) {
                    return None;
                }
            } else {
                if span > block.len() {
                    return None;
                }
                let (covered, rest) = block.split_at(span);
                if covered.iter().any(|&v| v != head) || rest.iter().any(|v| !v.is_nan()) {
                    return None;
                }
            }
            offset += step;
        }
        Some((span as u64, step as u64))
    }

    /// Chooses the encoding, `None` when every value is NaN.
    ///
    /// Fixed-step is used when it is lossless and the density reaches
    /// `density_threshold`.
    #[must_use]
    pub fn plan(&self, density_threshold: f64) -> Option<Encoding> {
        let first = self.runs.first()?;
        if self.density() >= density_threshold {
            if let Some((span, step)) = self.fixed_step_geometry() {
                return Some(Encoding::Fixed {
                    offset: first.offset,
                    span,
                    step,
                });
            }
        }
        Some(Encoding::Variable {
            span: self.variable_step_span(),
        })
    }
}

/// Plans the encoding of a contig with the default density threshold
#[must_use]
pub fn plan(contig: &Contig) -> Option<Encoding> {
    let contig = contig.to_watson();
    CompactionPlanner::new(contig.values()).plan(DEFAULT_DENSITY_THRESHOLD)
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
