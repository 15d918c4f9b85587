use std::fmt;

use crate::error::FormatError;

/// Keyword of a fixed-step contig header
pub const FIXED_STEP: &str = "fixedStep";

/// Keyword of a variable-step contig header
pub const VARIABLE_STEP: &str = "variableStep";

/// Keyword of a track definition line
pub const TRACK: &str = "track";

/// Keyword of a browser configuration line
pub const BROWSER: &str = "browser";

/// The role of a single line of Wiggle text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Blank lines, `#` comments, and `browser` lines
    Ignored,
    /// A `track` definition line
    Track,
    /// A `fixedStep` or `variableStep` contig header
    Header,
    /// A value line (`value` or `bp value`)
    Data,
}
impl LineKind {
    #[must_use]
    pub fn classify(text: &str) -> Self {
        let text = text.trim_start();
        let keyword = text.split_ascii_whitespace().next().unwrap_or_default();
        match keyword {
            "" => Self::Ignored,
            _ if keyword.starts_with('#') => Self::Ignored,
            BROWSER => Self::Ignored,
            TRACK => Self::Track,
            FIXED_STEP | VARIABLE_STEP => Self::Header,
            _ => Self::Data,
        }
    }
}

/// The variant-specific part of a contig's geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// One value per line, `step` base pairs apart
    Fixed { step: u64 },
    /// Each line carries its own base pair
    Variable,
}
impl StepKind {
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed { .. })
    }

    /// The step of a fixed-step contig
    #[must_use]
    pub fn step(&self) -> Option<u64> {
        match self {
            Self::Fixed { step } => Some(*step),
            Self::Variable => None,
        }
    }
}

/// A parsed `fixedStep` / `variableStep` header line
///
/// ```text
/// fixedStep chrom=chrI start=5 span=1 step=1
/// variableStep chrom=chrII span=10
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContigHeader {
    pub chrom: String,
    /// Declared start (fixed-step) or 1 until the first data line is seen (variable-step)
    pub start: u64,
    pub span: u64,
    pub kind: StepKind,
}
impl ContigHeader {
    #[must_use]
    pub fn fixed(chrom: impl Into<String>, start: u64, span: u64, step: u64) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            span,
            kind: StepKind::Fixed { step },
        }
    }

    #[must_use]
    pub fn variable(chrom: impl Into<String>, span: u64) -> Self {
        Self {
            chrom: chrom.into(),
            start: 1,
            span,
            kind: StepKind::Variable,
        }
    }

    /// Parses a header line.
    ///
    /// Missing `start`, `span`, and `step` default to 1. Unknown keys, keys that
    /// do not apply to the contig type, and malformed `key=value` tokens fail
    /// naming the token. A missing `chrom` is an error.
    pub fn parse(text: &str, line: u64) -> Result<Self, FormatError> {
        let mut tokens = text.split_ascii_whitespace();
        let fixed = match tokens.next() {
            Some(FIXED_STEP) => true,
            Some(VARIABLE_STEP) => false,
            _ => {
                return Err(FormatError::UnknownContigType {
                    line,
                    text: text.to_string(),
                })
            }
        };

        let invalid = |token: &str| FormatError::InvalidHeaderToken {
            line,
            token: token.to_string(),
            text: text.to_string(),
        };
        let positive = |key: &'static str, value: u64| {
            if value == 0 {
                Err(FormatError::ZeroGeometry {
                    line,
                    key,
                    text: text.to_string(),
                })
            } else {
                Ok(value)
            }
        };

        let mut chrom = None;
        let mut start = 1;
        let mut span = 1;
        let mut step = 1;
        for token in tokens {
            let (key, value) = token.split_once('=').ok_or_else(|| invalid(token))?;
            if value.is_empty() {
                return Err(invalid(token));
            }
            match key {
                "chrom" => chrom = Some(value.to_string()),
                "span" => {
                    let v = value.parse().map_err(|_| invalid(token))?;
                    span = positive("span", v)?;
                }
                "start" if fixed => {
                    let v = value.parse().map_err(|_| invalid(token))?;
                    start = positive("start", v)?;
                }
                "step" if fixed => {
                    let v = value.parse().map_err(|_| invalid(token))?;
                    step = positive("step", v)?;
                }
                _ => return Err(invalid(token)),
            }
        }

        let Some(chrom) = chrom else {
            return Err(FormatError::MissingChromosome {
                line,
                text: text.to_string(),
            });
        };

        Ok(if fixed {
            Self::fixed(chrom, start, span, step)
        } else {
            Self::variable(chrom, span)
        })
    }
}

impl fmt::Display for ContigHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            StepKind::Fixed { step } => write!(
                f,
                "{FIXED_STEP} chrom={} start={} span={} step={step}",
                self.chrom, self.start, self.span
            ),
            StepKind::Variable => {
                write!(f, "{VARIABLE_STEP} chrom={} span={}", self.chrom, self.span)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(LineKind::classify(""), LineKind::Ignored);
        assert_eq!(LineKind::classify("   "), LineKind::Ignored);
        assert_eq!(LineKind::classify("# comment"), LineKind::Ignored);
        assert_eq!(LineKind::classify("browser position chrI:1-10"), LineKind::Ignored);
        assert_eq!(LineKind::classify("track type=wiggle_0"), LineKind::Track);
        assert_eq!(LineKind::classify("fixedStep chrom=chrI"), LineKind::Header);
        assert_eq!(LineKind::classify("variableStep chrom=chrI"), LineKind::Header);
        assert_eq!(LineKind::classify("1.5"), LineKind::Data);
        assert_eq!(LineKind::classify("100\t1.5"), LineKind::Data);
        assert_eq!(LineKind::classify("trackless"), LineKind::Data);
    }

    #[test]
    fn test_parse_fixed() {
        let header = ContigHeader::parse("fixedStep chrom=chrI start=5 span=2 step=10", 1).unwrap();
        assert_eq!(header, ContigHeader::fixed("chrI", 5, 2, 10));
    }

    #[test]
    fn test_parse_fixed_defaults() {
        let header = ContigHeader::parse("fixedStep chrom=chrI", 1).unwrap();
        assert_eq!(header, ContigHeader::fixed("chrI", 1, 1, 1));
    }

    #[test]
    fn test_parse_variable() {
        let header = ContigHeader::parse("variableStep chrom=chrX span=25", 1).unwrap();
        assert_eq!(header, ContigHeader::variable("chrX", 25));
        assert!(!header.kind.is_fixed());
        assert_eq!(header.kind.step(), None);
    }

    #[test]
    fn test_parse_unknown_key() {
        let err = ContigHeader::parse("fixedStep chrom=chrI foo=bar", 4).unwrap_err();
        assert_eq!(
            err,
            FormatError::InvalidHeaderToken {
                line: 4,
                token: "foo=bar".to_string(),
                text: "fixedStep chrom=chrI foo=bar".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_step_on_variable() {
        let err = ContigHeader::parse("variableStep chrom=chrI step=5", 1).unwrap_err();
        assert!(matches!(err, FormatError::InvalidHeaderToken { token, .. } if token == "step=5"));
    }

    #[test]
    fn test_parse_malformed_token() {
        for text in [
            "fixedStep chrom=chrI start",
            "fixedStep chrom=chrI start=",
            "fixedStep chrom=chrI start=abc",
            "fixedStep chrom=chrI span=-1",
        ] {
            let err = ContigHeader::parse(text, 1).unwrap_err();
            assert!(matches!(err, FormatError::InvalidHeaderToken { .. }), "{text}");
        }
    }

    #[test]
    fn test_parse_zero_geometry() {
        let err = ContigHeader::parse("fixedStep chrom=chrI step=0", 9).unwrap_err();
        assert!(matches!(err, FormatError::ZeroGeometry { key: "step", line: 9, .. }));
    }

    #[test]
    fn test_parse_missing_chrom() {
        let err = ContigHeader::parse("fixedStep start=1", 2).unwrap_err();
        assert!(matches!(err, FormatError::MissingChromosome { line: 2, .. }));
    }

    #[test]
    fn test_parse_unknown_type() {
        let err = ContigHeader::parse("bedGraph chrom=chrI", 1).unwrap_err();
        assert!(matches!(err, FormatError::UnknownContigType { .. }));
    }

    #[test]
    fn test_display_roundtrip() {
        for header in [
            ContigHeader::fixed("chrI", 5, 2, 3),
            ContigHeader::variable("chr2", 4),
        ] {
            let text = header.to_string();
            let parsed = ContigHeader::parse(&text, 1).unwrap();
            assert_eq!(parsed, header);
        }
    }
}
