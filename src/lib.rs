//! # wigidx
//!
//! Random access to Wiggle (`.wig`) signal tracks.
//!
//! A Wiggle file is a sequence of contigs, each introduced by a `fixedStep` or
//! `variableStep` header and followed by one value per line. This crate scans
//! a file once to build a [`TrackIndex`] describing every contig together with
//! a sparse map from base pair to byte offset. Queries then seek close to the
//! requested region and read only the lines they need.
//!
//! The index is cached next to the source file (`track.wig.idx`) and is
//! reused as long as the content checksum of the source file is unchanged.
//!
//! ## Reading
//!
//! ```rust,no_run
//! use wigidx::{Interval, TrackReader, WigReader};
//!
//! let mut reader = WigReader::from_path("track.wig").unwrap();
//! let interval: Interval = "chrI:1,000-2,000".parse().unwrap();
//! let contig = reader.query(&interval).unwrap();
//! println!("mean = {}", contig.mean());
//!
//! // Crick intervals return the values in reverse order
//! let reverse = reader.query(&Interval::new("chrI", 2000, 1000)).unwrap();
//! assert_eq!(reverse.len(), contig.len());
//! ```
//!
//! ## Writing
//!
//! [`WigWriter`] writes each contig with the most compact encoding, see
//! [`compact`] for how the encoding is chosen.
//!
//! ## Modules
//!
//! * [`core`] - Intervals, contigs, statistics, and contig descriptors
//! * [`index`] - Building and caching the track index
//! * [`compact`] - Choosing between `fixedStep` and `variableStep`
//! * [`error`] - Error definitions

/// Core types shared by the reader, the index, and the writer
pub mod core;

/// Building, saving, and loading the track index
pub mod index;

/// Choosing the most compact encoding of a contig
pub mod compact;

/// Error definitions
pub mod error;

/// Parallel processing of contigs
mod parallel;

/// Indexed random access
mod read;

/// Compact Wiggle output
mod write;

pub use crate::core::{Contig, ContigDescriptor, ContigHeader, Interval, StepKind, SummaryStats};
pub use error::{Error, IntoWigError, Result};
pub use index::{IndexBuilder, TrackIndex};
pub use parallel::ParallelProcessor;
pub use read::{QueryResult, TrackReader, WigReader, WigReaderBuilder};
pub use write::{SharedWigWriter, WigWriter, WigWriterBuilder};

/// Format version of the index cache
pub const INDEX_VERSION: i64 = 1;

/// Extension appended to a source path to locate its index cache
pub const INDEX_EXTENSION: &str = "idx";

/// Default number of data lines between two sparse index entries
pub const DEFAULT_SAMPLING: u64 = 1000;

/// Default minimum fraction of non-NaN values for `fixedStep` output
pub const DEFAULT_DENSITY_THRESHOLD: f64 = 0.55;

/// Default maximum number of fractional digits written per value
pub const DEFAULT_PRECISION: usize = 6;
