use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use wigidx::core::format_value;
use wigidx::index::default_index_path;
use wigidx::{
    IndexBuilder, Interval, SummaryStats, TrackReader, WigReader,
    WigReaderBuilder, WigWriterBuilder, DEFAULT_DENSITY_THRESHOLD, DEFAULT_PRECISION,
    DEFAULT_SAMPLING,
};

#[derive(Parser)]
#[command(name = "wigidx")]
#[command(about = "Indexed random access to Wiggle tracks")]
#[command(version)]
#[command(long_about = "
wigidx indexes Wiggle (fixedStep/variableStep) tracks for fast region queries.
The index is cached next to the track as <file>.idx and rebuilt whenever the
track changes.

Examples:
  wigidx index signal.wig
  wigidx query signal.wig chrI:1,000-2,000
  wigidx stats signal.wig chrII:500-100
  wigidx compact signal.wig compact.wig --threads 4
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Number of threads to use (0 uses every CPU)
    #[arg(short, long, global = true, default_value_t = 0)]
    threads: usize,

    /// Verbose output (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors are logged)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(clap::Args, Clone)]
struct IndexOptions {
    /// Number of data lines between two index entries
    #[arg(long, default_value_t = DEFAULT_SAMPLING)]
    sampling: u64,

    /// Index location (defaults to <file>.idx)
    #[arg(long)]
    index: Option<PathBuf>,

    /// Do not verify the checksum of an explicitly given index
    #[arg(long, requires = "index")]
    trusted: bool,

    /// Neither read nor write the index cache
    #[arg(long)]
    no_cache: bool,
}
impl IndexOptions {
    fn open(&self, path: &Path) -> Result<WigReader> {
        let mut builder = WigReaderBuilder::default()
            .sampling(self.sampling)
            .trusted_index(self.trusted)
            .cache(!self.no_cache);
        if let Some(index) = &self.index {
            builder = builder.index_path(index);
        }
        builder
            .open(path)
            .with_context(|| format!("Failed to open {}", path.display()))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build (or rebuild) the index of a track
    Index {
        /// Wiggle file
        file: PathBuf,

        /// Number of data lines between two index entries
        #[arg(long, default_value_t = DEFAULT_SAMPLING)]
        sampling: u64,

        /// Index location (defaults to <file>.idx)
        #[arg(long)]
        index: Option<PathBuf>,
    },

    /// Print the values of one or more regions
    Query {
        /// Wiggle file
        file: PathBuf,

        /// Regions as chr:start-stop (start > stop reads the reverse strand)
        #[arg(required = true)]
        regions: Vec<Interval>,

        /// Skip base pairs without data
        #[arg(long)]
        skip_missing: bool,

        #[command(flatten)]
        options: IndexOptions,
    },

    /// Print summary statistics of the track or of one region
    Stats {
        /// Wiggle file
        file: PathBuf,

        /// Region as chr:start-stop (whole track if omitted)
        region: Option<Interval>,

        #[command(flatten)]
        options: IndexOptions,
    },

    /// Rewrite a track with the most compact encoding of every contig
    Compact {
        /// Wiggle file
        file: PathBuf,

        /// Output file
        output: PathBuf,

        /// Minimum fraction of base pairs with data for fixedStep output
        #[arg(long, default_value_t = DEFAULT_DENSITY_THRESHOLD)]
        density: f64,

        /// Maximum number of fractional digits per value
        #[arg(long, default_value_t = DEFAULT_PRECISION)]
        precision: usize,

        /// Attributes of a track line to write first
        #[arg(long)]
        track_line: Option<String>,

        #[command(flatten)]
        options: IndexOptions,
    },
}

fn setup_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn run_index(file: &Path, sampling: u64, index: Option<PathBuf>) -> Result<()> {
    let index_path = index.unwrap_or_else(|| default_index_path(file));
    let track = IndexBuilder::new(sampling)
        .build_path(file)
        .with_context(|| format!("Failed to index {}", file.display()))?;
    track
        .save(&index_path)
        .with_context(|| format!("Failed to save index {}", index_path.display()))?;

    let mut out = BufWriter::new(io::stdout().lock());
    writeln!(out, "index\t{}", index_path.display())?;
    writeln!(out, "checksum\t{:#018x}", track.checksum())?;
    writeln!(out, "contigs\t{}", track.num_contigs())?;
    for chrom in track.chromosomes() {
        if let (Some(start), Some(stop)) = (track.chrom_start(chrom), track.chrom_stop(chrom)) {
            writeln!(
                out,
                "{chrom}\t{start}\t{stop}\t{}",
                track.descriptors(chrom).len()
            )?;
        }
    }
    out.flush()?;
    Ok(())
}

fn run_query(
    reader: &WigReader,
    regions: &[Interval],
    skip_missing: bool,
    threads: usize,
) -> Result<()> {
    let contigs = reader.query_parallel(regions, threads)?;

    let mut out = BufWriter::new(io::stdout().lock());
    let mut buf = String::new();
    for contig in &contigs {
        let interval = contig.interval();
        for (i, value) in contig.values().iter().enumerate() {
            if skip_missing && value.is_nan() {
                continue;
            }
            let bp = if interval.is_watson() {
                interval.start() + i as u64
            } else {
                interval.start() - i as u64
            };
            buf.clear();
            format_value(&mut buf, *value, DEFAULT_PRECISION);
            writeln!(out, "{}\t{bp}\t{buf}", interval.chrom())?;
        }
    }
    out.flush()?;
    Ok(())
}

fn write_stats<W: Write>(out: &mut W, label: &str, stats: &SummaryStats) -> Result<()> {
    writeln!(out, "region\t{label}")?;
    writeln!(out, "coverage\t{}", stats.count())?;
    writeln!(out, "total\t{}", stats.total())?;
    writeln!(out, "mean\t{}", stats.mean())?;
    writeln!(out, "stdev\t{}", stats.stdev())?;
    writeln!(out, "min\t{}", stats.min())?;
    writeln!(out, "max\t{}", stats.max())?;
    Ok(())
}

fn run_stats(mut reader: WigReader, region: Option<Interval>) -> Result<()> {
    let mut out = BufWriter::new(io::stdout().lock());
    match region {
        Some(region) => {
            let stats = reader.query_stats(&region)?;
            write_stats(&mut out, &region.to_string(), &stats)?;
        }
        None => write_stats(&mut out, "all", &reader.stats())?,
    }
    out.flush()?;
    Ok(())
}

fn run_compact(
    reader: &WigReader,
    output: &Path,
    builder: WigWriterBuilder,
    threads: usize,
) -> Result<()> {
    let handle = BufWriter::new(
        File::create(output).with_context(|| format!("Failed to create {}", output.display()))?,
    );
    let mut writer = builder.build(handle)?;
    let n_written = reader.compact_into(&mut writer, threads)?;
    writer.finish()?;
    info!("Wrote {n_written} contigs to {}", output.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Index {
            file,
            sampling,
            index,
        } => run_index(&file, sampling, index),
        Commands::Query {
            file,
            regions,
            skip_missing,
            options,
        } => {
            let reader = options.open(&file)?;
            run_query(&reader, &regions, skip_missing, cli.threads)
        }
        Commands::Stats {
            file,
            region,
            options,
        } => run_stats(options.open(&file)?, region),
        Commands::Compact {
            file,
            output,
            density,
            precision,
            track_line,
            options,
        } => {
            let mut builder = WigWriterBuilder::default()
                .density_threshold(density)
                .precision(precision);
            if let Some(track_line) = track_line {
                builder = builder.track_line(track_line);
            }
            run_compact(&options.open(&file)?, &output, builder, cli.threads)
        }
    }
}
