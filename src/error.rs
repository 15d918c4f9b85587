use std::error::Error as StdError;

/// Custom Result type for wigidx operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the wigidx library, encompassing all possible error cases
/// that can occur while indexing, querying, or writing Wiggle tracks.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Malformed Wiggle text (headers, values, or data before any header)
    #[error("Error parsing wiggle: {0}")]
    FormatError(#[from] FormatError),

    /// Queries that fall outside the indexed coverage
    #[error("Error in query range: {0}")]
    RangeError(#[from] RangeError),

    /// Errors related to the on-disk index cache
    #[error("Error processing Index: {0}")]
    IndexError(#[from] IndexError),

    /// Errors that occur during write operations
    #[error("Error writing file: {0}")]
    WriteError(#[from] WriteError),

    /// Standard I/O errors
    #[error("Error with IO: {0}")]
    IoError(#[from] std::io::Error),

    /// UTF-8 conversion errors
    #[error("Error with UTF8: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    /// Generic errors for other unexpected situations
    #[error("Generic error: {0}")]
    GenericError(#[from] Box<dyn StdError + Send + Sync>),
}
impl Error {
    /// Checks if the error is an index mismatch error
    ///
    /// This is useful for determining if a cached index is out of sync with its
    /// source file, which requires the index to be rebuilt.
    ///
    /// # Returns
    ///
    /// * `true` if the error is a version or checksum mismatch of the cache
    /// * `false` for all other error types
    #[must_use]
    pub fn is_index_mismatch(&self) -> bool {
        match self {
            Self::IndexError(err) => err.is_mismatch(),
            _ => false,
        }
    }

    /// Checks if the error is recoverable by the caller (a query outside coverage)
    #[must_use]
    pub fn is_range_error(&self) -> bool {
        matches!(self, Self::RangeError(_))
    }
}

/// Errors raised while parsing Wiggle text
///
/// Every variant carries the 1-based line number of the offending line.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    /// A data line appeared before any `fixedStep`/`variableStep` header
    #[error("Missing contig header before data at line {line}: {text:?}")]
    MissingContigHeader { line: u64, text: String },

    /// The header did not start with `fixedStep` or `variableStep`
    #[error("Unknown contig type at line {line}: {text:?}")]
    UnknownContigType { line: u64, text: String },

    /// A `key=value` token of a header was malformed or used an unknown key
    #[error("Invalid header token {token:?} at line {line}: {text:?}")]
    InvalidHeaderToken {
        line: u64,
        token: String,
        text: String,
    },

    /// The header has no `chrom=` key
    #[error("Missing chromosome in contig header at line {line}: {text:?}")]
    MissingChromosome { line: u64, text: String },

    /// `span` or `step` was declared as zero
    #[error("Header key {key} must be at least 1 at line {line}: {text:?}")]
    ZeroGeometry {
        line: u64,
        key: &'static str,
        text: String,
    },

    /// A value token could not be parsed as a number
    #[error("Invalid value at line {line}: {text:?}")]
    InvalidValue { line: u64, text: String },

    /// A variable-step line was not a `bp<TAB>value` pair
    #[error("Invalid variableStep data line at line {line}: {text:?}")]
    InvalidDataLine { line: u64, text: String },

    /// Variable-step positions must be strictly ascending within a contig
    #[error("Unsorted variableStep position at line {line}: {text:?}")]
    UnsortedPosition { line: u64, text: String },

    /// A `track` line appeared after the first contig header
    #[error("Unexpected track line at line {line}: {text:?}")]
    UnexpectedTrackLine { line: u64, text: String },

    /// The base pairs covered by a data line do not fit in a `u64`
    #[error("Base pair coordinate overflows at line {line}: {text:?}")]
    CoordinateOverflow { line: u64, text: String },
}
impl FormatError {
    /// The 1-based source line the error refers to
    #[must_use]
    pub fn line(&self) -> u64 {
        match self {
            Self::MissingContigHeader { line, .. }
            | Self::UnknownContigType { line, .. }
            | Self::InvalidHeaderToken { line, .. }
            | Self::MissingChromosome { line, .. }
            | Self::ZeroGeometry { line, .. }
            | Self::InvalidValue { line, .. }
            | Self::InvalidDataLine { line, .. }
            | Self::UnsortedPosition { line, .. }
            | Self::UnexpectedTrackLine { line, .. }
            | Self::CoordinateOverflow { line, .. } => *line,
        }
    }
}

/// Errors raised when a request falls outside the data that is available
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// The chromosome is not present in the index
    #[error("Unknown chromosome: {0}")]
    UnknownChromosome(String),

    /// The interval is not contained in the chromosome's indexed extent
    #[error(
        "Requested interval {chrom}:{start}-{stop} is outside of the indexed range {chrom}:{min}-{max}"
    )]
    OutOfRange {
        chrom: String,
        start: u64,
        stop: u64,
        min: u64,
        max: u64,
    },

    /// A base pair outside of a contig descriptor was requested
    #[error("Base pair {bp} is outside of contig range ({start}, {stop})")]
    BasePairOutOfRange { bp: u64, start: u64, stop: u64 },

    /// A line number outside of a contig descriptor was requested
    #[error("Line {line} is outside of contig lines ({start_line}, {stop_line})")]
    LineOutOfRange {
        line: u64,
        start_line: u64,
        stop_line: u64,
    },

    /// Line arithmetic was requested on a variable-step contig
    #[error("Contig {chrom}:{start} is not fixed-step")]
    NotFixedStep { chrom: String, start: u64 },

    /// An interval string could not be parsed (expected `chr:start-stop`)
    #[error("Invalid interval: {0:?} - expecting chr:start-stop")]
    InvalidInterval(String),
}

/// Errors related to the on-disk index cache
///
/// These are never fatal for a reader: a rejected cache is rebuilt from the
/// source file.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// The cache was written by an incompatible version
    #[error("Index version {found} does not match expected version {expected}")]
    VersionMismatch { found: i64, expected: i64 },

    /// The source file changed since the cache was written
    #[error("Index checksum {found:#018x} does not match source checksum {expected:#018x}")]
    ChecksumMismatch { found: u64, expected: u64 },

    /// An unknown contig variant discriminator was found
    #[error("Invalid contig discriminator: {0}")]
    InvalidDiscriminator(u8),

    /// A negative count or length was found in the cache
    #[error("Invalid {field} in index: {value}")]
    InvalidLength { field: &'static str, value: i64 },
}
impl IndexError {
    /// Checks if this error indicates a mismatch between the index and file
    ///
    /// This is useful to determine if the index needs to be rebuilt.
    #[must_use]
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self,
            Self::VersionMismatch { .. } | Self::ChecksumMismatch { .. }
        )
    }
}

/// Errors that can occur while building contigs or writing Wiggle text
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum WriteError {
    /// The number of values does not match the interval length
    #[error("Number of values ({got}) does not match interval length ({expected})")]
    LengthMismatch { expected: usize, got: usize },

    /// A base pair outside of the contig interval was addressed
    #[error("Base pair {bp} is outside of contig interval ({start}, {stop})")]
    OutOfContig { bp: u64, start: u64, stop: u64 },

    /// The density threshold must be within [0, 1]
    #[error("Invalid density threshold: {0}")]
    InvalidDensity(f64),

    /// The chromosome name is empty or contains whitespace
    #[error("Invalid chromosome name for output: {0:?}")]
    InvalidChromosome(String),
}

/// Trait for converting arbitrary errors into `Error`
pub trait IntoWigError {
    fn into_wig_error(self) -> Error;
}

// Implement conversion for Box<dyn Error>
impl<E> IntoWigError for E
where
    E: StdError + Send + Sync + 'static,
{
    fn into_wig_error(self) -> Error {
        Error::GenericError(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum MyError {
        #[error("Custom error: {0}")]
        CustomError(String),
    }

    #[test]
    fn test_into_wig_error() {
        let my_error = MyError::CustomError(String::from("some error"));
        let wig_error = my_error.into_wig_error();
        assert!(matches!(wig_error, Error::GenericError(_)));
    }

    #[test]
    fn test_is_index_mismatch_with_checksum() {
        let error = Error::IndexError(IndexError::ChecksumMismatch {
            found: 1,
            expected: 2,
        });
        assert!(error.is_index_mismatch());
    }

    #[test]
    fn test_is_index_mismatch_with_version() {
        let error = Error::IndexError(IndexError::VersionMismatch {
            found: 1,
            expected: 3,
        });
        assert!(error.is_index_mismatch());
    }

    #[test]
    fn test_is_index_mismatch_with_corrupt_index() {
        let error = Error::IndexError(IndexError::InvalidDiscriminator(7));
        assert!(!error.is_index_mismatch());
    }

    #[test]
    fn test_is_index_mismatch_with_non_index_error() {
        let error = Error::RangeError(RangeError::UnknownChromosome("chrX".into()));
        assert!(!error.is_index_mismatch());
        assert!(error.is_range_error());
    }

    #[test]
    fn test_format_error_carries_line() {
        let error = FormatError::InvalidValue {
            line: 42,
            text: "abc".to_string(),
        };
        assert_eq!(error.line(), 42);
        let error_str = format!("{error}");
        assert!(error_str.contains("42"));
        assert!(error_str.contains("abc"));
    }

    #[test]
    fn test_header_token_error_names_token() {
        let error = FormatError::InvalidHeaderToken {
            line: 3,
            token: "foo=bar".to_string(),
            text: "fixedStep chrom=chrI foo=bar".to_string(),
        };
        assert!(format!("{error}").contains("foo=bar"));
    }

    #[test]
    fn test_range_error_out_of_range() {
        let error = RangeError::OutOfRange {
            chrom: "chrI".to_string(),
            start: 1,
            stop: 100,
            min: 5,
            max: 50,
        };
        let error_str = format!("{error}");
        assert!(error_str.contains("chrI:1-100"));
        assert!(error_str.contains("chrI:5-50"));
    }

    #[test]
    fn test_checksum_mismatch_display() {
        let error = IndexError::ChecksumMismatch {
            found: 0xdead_beef,
            expected: 0x1234,
        };
        let error_str = format!("{error}");
        assert!(error_str.contains("0x00000000deadbeef"));
        assert!(error_str.contains("0x0000000000001234"));
    }

    #[test]
    fn test_write_error_length_mismatch() {
        let error = WriteError::LengthMismatch {
            expected: 10,
            got: 4,
        };
        let error_str = format!("{error}");
        assert!(error_str.contains("10"));
        assert!(error_str.contains('4'));
    }

    #[test]
    fn test_error_from_nested() {
        let error: Error = FormatError::MissingContigHeader {
            line: 1,
            text: "5".into(),
        }
        .into();
        assert!(matches!(error, Error::FormatError(_)));

        let error: Error = WriteError::InvalidDensity(2.0).into();
        assert!(matches!(error, Error::WriteError(_)));

        let error: Error = std::io::Error::other("boom").into();
        assert!(matches!(error, Error::IoError(_)));
    }
}
