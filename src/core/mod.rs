mod contig;
mod descriptor;
mod header;
mod interval;
mod stats;
pub(crate) mod utils;

pub use contig::Contig;
pub use descriptor::{ContigDescriptor, IndexEntry, FIXED_DISCRIMINATOR, VARIABLE_DISCRIMINATOR};
pub use header::{ContigHeader, LineKind, StepKind, FIXED_STEP, TRACK, VARIABLE_STEP};
pub use interval::Interval;
pub use stats::{SummaryStats, SIZE_STATS};
pub use utils::{checksum, format_value, LineReader};

pub(crate) use descriptor::{parse_position, value_token};
