use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use auto_impl::auto_impl;
use log::{debug, info, warn};

use crate::core::{checksum, Contig, Interval, SummaryStats};
use crate::error::Result;
use crate::index::{default_index_path, IndexBuilder, TrackIndex};
use crate::parallel::{resolve_threads, ParallelProcessor};
use crate::write::WigWriter;
use crate::DEFAULT_SAMPLING;

/// Random access to the values of a track
#[auto_impl(&mut, Box)]
pub trait TrackReader {
    /// Chromosome names in order of first appearance
    fn chromosomes(&self) -> Vec<String>;

    /// Lowest base pair with data on a chromosome
    fn chrom_start(&self, chrom: &str) -> Option<u64>;

    /// Highest base pair with data on a chromosome
    fn chrom_stop(&self, chrom: &str) -> Option<u64>;

    /// Statistics over the whole track
    fn stats(&self) -> SummaryStats;

    /// Checks that `interval` can be queried
    fn check_interval(&self, interval: &Interval) -> Result<()>;

    /// Writes the values over `interval` into `out` in Watson order.
    ///
    /// `out` must hold `interval.length()` values. Base pairs without data are
    /// left untouched.
    fn fill(&mut self, interval: &Interval, out: &mut [f32]) -> Result<()>;

    /// Summary statistics over `interval` without materializing its values
    fn query_stats(&mut self, interval: &Interval) -> Result<SummaryStats>;

    /// Materializes the values over `interval` in its own orientation.
    ///
    /// Base pairs without data are `NaN`.
    fn query(&mut self, interval: &Interval) -> Result<Contig> {
        self.check_interval(interval)?;
        let watson = interval.to_watson();
        let mut contig = Contig::nan(watson.clone());
        self.fill(&watson, contig.values_mut())?;
        if interval.is_crick() {
            contig.flip();
        }
        Ok(contig)
    }
}

/// A query that is only executed once its values or statistics are needed.
///
/// The interval is validated when the query is created. Materialized values
/// are kept and reused by later calls.
pub struct QueryResult<R: TrackReader> {
    reader: R,
    interval: Interval,
    contig: Option<Contig>,
}
impl<R: TrackReader> QueryResult<R> {
    pub fn new(reader: R, interval: Interval) -> Result<Self> {
        reader.check_interval(&interval)?;
        Ok(Self {
            reader,
            interval,
            contig: None,
        })
    }

    #[must_use]
    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    /// Whether the values have been read yet
    #[must_use]
    pub fn is_materialized(&self) -> bool {
        self.contig.is_some()
    }

    /// Reads the values if needed and returns them as a contig
    pub fn contig(&mut self) -> Result<&Contig> {
        let contig = match self.contig.take() {
            Some(contig) => contig,
            None => self.reader.query(&self.interval)?,
        };
        Ok(self.contig.insert(contig))
    }

    /// Values in the orientation of the interval
    pub fn values(&mut self) -> Result<&[f32]> {
        Ok(self.contig()?.values())
    }

    /// Statistics over the finite values of the interval
    pub fn stats(&mut self) -> Result<SummaryStats> {
        Ok(*self.contig()?.stats())
    }

    pub fn into_contig(mut self) -> Result<Contig> {
        match self.contig.take() {
            Some(contig) => Ok(contig),
            None => self.reader.query(&self.interval),
        }
    }
}

/// Options for opening a [`WigReader`]
#[derive(Debug, Clone)]
pub struct WigReaderBuilder {
    sampling: u64,
    index_path: Option<PathBuf>,
    trusted_index: bool,
    cache: bool,
}
impl Default for WigReaderBuilder {
    fn default() -> Self {
        Self {
            sampling: DEFAULT_SAMPLING,
            index_path: None,
            trusted_index: false,
            cache: true,
        }
    }
}
impl WigReaderBuilder {
    /// Index every `sampling`-th data line when the index is (re)built
    #[must_use]
    pub fn sampling(mut self, sampling: u64) -> Self {
        self.sampling = sampling;
        self
    }

    /// Use an explicit location for the cached index
    #[must_use]
    pub fn index_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.index_path = Some(path.into());
        self
    }

    /// Skip the checksum check of an explicitly given index path.
    ///
    /// Has no effect unless [`index_path`](Self::index_path) is set. The
    /// version is always checked.
    #[must_use]
    pub fn trusted_index(mut self, trusted: bool) -> Self {
        self.trusted_index = trusted;
        self
    }

    /// Load and persist the index cache (default: true)
    #[must_use]
    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Opens a Wiggle file, loading or building its index
    pub fn open<P: AsRef<Path>>(self, path: P) -> Result<WigReader> {
        let path = path.as_ref();
        let index = if self.cache {
            self.load_or_build(path)?
        } else {
            IndexBuilder::new(self.sampling).build_path(path)?
        };
        WigReader::with_index(path, Arc::new(index))
    }

    fn load_or_build(&self, source: &Path) -> Result<TrackIndex> {
        let index_path = self
            .index_path
            .clone()
            .unwrap_or_else(|| default_index_path(source));

        if index_path.exists() {
            let expected = if self.trusted_index && self.index_path.is_some() {
                None
            } else {
                Some(checksum(source)?)
            };
            match TrackIndex::load(&index_path, expected) {
                Ok(index) => {
                    info!("Loaded index {}", index_path.display());
                    return Ok(index);
                }
                Err(err) => {
                    if err.is_index_mismatch() {
                        warn!("Index {} is stale ({err}), rebuilding", index_path.display());
                    } else {
                        warn!(
                            "Index {} could not be loaded ({err}), rebuilding",
                            index_path.display()
                        );
                    }
                    if let Err(err) = fs::remove_file(&index_path) {
                        warn!("Could not delete index {}: {err}", index_path.display());
                    }
                }
            }
        }

        let index = IndexBuilder::new(self.sampling).build_path(source)?;
        match index.save(&index_path) {
            Ok(()) => info!("Saved index {}", index_path.display()),
            Err(err) => warn!("Could not save index {}: {err}", index_path.display()),
        }
        Ok(index)
    }
}

/// An indexed Wiggle file
pub struct WigReader {
    path: PathBuf,
    handle: BufReader<File>,
    index: Arc<TrackIndex>,
}
impl WigReader {
    /// Opens a Wiggle file with the default options (cached index next to the file)
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        WigReaderBuilder::default().open(path)
    }

    #[must_use]
    pub fn builder() -> WigReaderBuilder {
        WigReaderBuilder::default()
    }

    /// Opens a Wiggle file with an index that has already been built for it
    pub fn with_index<P: AsRef<Path>>(path: P, index: Arc<TrackIndex>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let handle = BufReader::new(File::open(&path)?);
        debug!(
            "Opened {} with {} contigs",
            path.display(),
            index.num_contigs()
        );
        Ok(Self {
            path,
            handle,
            index,
        })
    }

    /// Opens an independent handle on the same file sharing the same index
    pub fn try_clone(&self) -> Result<Self> {
        Self::with_index(&self.path, self.index.clone())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn index(&self) -> &Arc<TrackIndex> {
        &self.index
    }

    /// Creates a lazily evaluated query over `interval`
    pub fn query_lazy(&mut self, interval: Interval) -> Result<QueryResult<&mut Self>> {
        QueryResult::new(self, interval)
    }

    /// Queries many intervals on `num_threads` threads (0 means one per CPU).
    ///
    /// Each thread works on its own file handle. The results are returned in
    /// the order of `intervals`.
    pub fn query_parallel(&self, intervals: &[Interval], num_threads: usize) -> Result<Vec<Contig>> {
        if intervals.is_empty() {
            return Ok(Vec::new());
        }
        for interval in intervals {
            self.index.check_interval(interval)?;
        }
        let num_threads = resolve_threads(num_threads).min(intervals.len());
        let per_thread = intervals.len().div_ceil(num_threads);

        thread::scope(|scope| {
            let handles = intervals
                .chunks(per_thread)
                .map(|chunk| {
                    scope.spawn(move || -> Result<Vec<Contig>> {
                        let mut reader = self.try_clone()?;
                        chunk.iter().map(|interval| reader.query(interval)).collect()
                    })
                })
                .collect::<Vec<_>>();

            // join every thread before reporting the first error
            let batches: Vec<_> = handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .map_err(|_| io::Error::other("query thread panicked"))?
                })
                .collect();

            let mut contigs = Vec::with_capacity(intervals.len());
            for batch in batches {
                contigs.extend(batch?);
            }
            Ok(contigs)
        })
    }

    /// Rewrites every contig of the file through `writer` in file order.
    ///
    /// Contigs are read `num_threads` at a time in parallel (0 means one per
    /// CPU) and written in the order of the index, so the output does not
    /// depend on the thread count. Returns the number of contigs written.
    pub fn compact_into<W: Write>(
        &self,
        writer: &mut WigWriter<W>,
        num_threads: usize,
    ) -> Result<usize> {
        let intervals: Vec<_> = self
            .index
            .iter_descriptors()
            .map(|d| Interval::new(d.chrom(), d.start(), d.stop()))
            .collect();
        let batch_size = resolve_threads(num_threads) * 4;

        let mut n_written = 0;
        for batch in intervals.chunks(batch_size) {
            for contig in self.query_parallel(batch, num_threads)? {
                if writer.write(&contig)? {
                    n_written += 1;
                }
            }
        }
        debug!("Compacted {n_written} of {} contigs", intervals.len());
        Ok(n_written)
    }

    /// Processes every contig of the file in parallel
    ///
    /// Each indexed contig is queried over its full extent and handed to a
    /// clone of `processor`.
    pub fn process_parallel<P: ParallelProcessor + 'static>(
        self,
        processor: P,
        num_threads: usize,
    ) -> Result<()> {
        let intervals = self
            .index
            .iter_descriptors()
            .map(|d| Interval::new(d.chrom(), d.start(), d.stop()))
            .collect();
        self.process_parallel_intervals(processor, num_threads, intervals)
    }

    /// Processes a set of intervals in parallel
    ///
    /// The intervals are distributed across the threads in contiguous batches
    /// and validated before any thread is started.
    ///
    /// # Arguments
    ///
    /// * `processor` - The processor to use for each contig
    /// * `num_threads` - The number of threads to spawn (0 means one per CPU)
    /// * `intervals` - The intervals to query
    pub fn process_parallel_intervals<P: ParallelProcessor + 'static>(
        self,
        processor: P,
        num_threads: usize,
        intervals: Vec<Interval>,
    ) -> Result<()> {
        if intervals.is_empty() {
            return Ok(()); // nothing to do
        }
        for interval in &intervals {
            self.index.check_interval(interval)?;
        }
        let num_threads = resolve_threads(num_threads).min(intervals.len());
        let per_thread = intervals.len().div_ceil(num_threads);

        // open every handle before any thread starts
        let readers = intervals
            .chunks(per_thread)
            .map(|_| self.try_clone())
            .collect::<Result<Vec<_>>>()?;

        let mut handles = Vec::new();
        for ((thread_id, batch), mut t_reader) in
            intervals.chunks(per_thread).enumerate().zip(readers)
        {
            let mut t_proc = processor.clone();
            t_proc.set_tid(thread_id);
            let t_intervals = batch.to_vec();

            let thread_handle = thread::spawn(move || -> Result<()> {
                for interval in &t_intervals {
                    let contig = t_reader.query(interval)?;
                    t_proc.process_contig(contig)?;
                }
                t_proc.on_batch_complete()
            });
            handles.push(thread_handle);
        }

        // join every thread before reporting the first error
        let results: Vec<Result<()>> = handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| io::Error::other("processing thread panicked"))?
            })
            .collect();
        results.into_iter().collect()
    }
}

impl TrackReader for WigReader {
    fn chromosomes(&self) -> Vec<String> {
        self.index.chromosomes().to_vec()
    }

    fn chrom_start(&self, chrom: &str) -> Option<u64> {
        self.index.chrom_start(chrom)
    }

    fn chrom_stop(&self, chrom: &str) -> Option<u64> {
        self.index.chrom_stop(chrom)
    }

    fn stats(&self) -> SummaryStats {
        *self.index.stats()
    }

    fn check_interval(&self, interval: &Interval) -> Result<()> {
        self.index.check_interval(interval)
    }

    fn fill(&mut self, interval: &Interval, out: &mut [f32]) -> Result<()> {
        self.index.check_interval(interval)?;
        let watson = interval.to_watson();
        for descriptor in self
            .index
            .overlapping(watson.chrom(), watson.low(), watson.high())
        {
            descriptor.fill(&mut self.handle, &watson, out)?;
        }
        Ok(())
    }

    fn query_stats(&mut self, interval: &Interval) -> Result<SummaryStats> {
        self.index.check_interval(interval)?;
        let mut stats = SummaryStats::new();
        for descriptor in self
            .index
            .overlapping(interval.chrom(), interval.low(), interval.high())
        {
            descriptor.visit(
                &mut self.handle,
                interval.low(),
                interval.high(),
                |from, to, value| stats.push_n(value, to - from + 1),
            )?;
        }
        Ok(stats)
    }
}
