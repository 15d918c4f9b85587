use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use wigidx::core::checksum;
use wigidx::index::default_index_path;
use wigidx::{Interval, Result, TrackIndex, TrackReader, WigReader, INDEX_VERSION};

const TEXT: &str = "\
track type=wiggle_0 name=cache
fixedStep chrom=chrI start=1 step=1
1
2
3
4
variableStep chrom=chrII span=2
10\t5
20\t6
";

fn setup() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("track.wig");
    fs::write(&path, TEXT).unwrap();
    (dir, path)
}

fn value_at(reader: &mut WigReader, chrom: &str, bp: u64) -> f32 {
    reader.query(&Interval::new(chrom, bp, bp)).unwrap().values()[0]
}

/// Replaces one byte of the source without changing its length
fn mutate(path: &Path, from: &str, to: &str) {
    let text = fs::read_to_string(path).unwrap().replacen(from, to, 1);
    fs::write(path, text).unwrap();
}

#[test]
fn test_open_writes_cache() -> Result<()> {
    let (_dir, path) = setup();
    let index_path = default_index_path(&path);
    assert!(!index_path.exists());

    let first = WigReader::from_path(&path)?;
    assert!(index_path.exists());

    let cached = TrackIndex::load(&index_path, Some(checksum(&path)?))?;
    assert_eq!(**first.index(), cached);
    assert_eq!(cached.version(), INDEX_VERSION);
    Ok(())
}

#[test]
fn test_reopen_matches_fresh_build() -> Result<()> {
    let (_dir, path) = setup();
    let mut fresh = WigReader::builder().cache(false).open(&path)?;
    let _ = WigReader::from_path(&path)?;
    let mut cached = WigReader::from_path(&path)?;

    assert_eq!(fresh.index(), cached.index());
    for interval in [
        Interval::new("chrI", 1, 4),
        Interval::new("chrII", 21, 10),
    ] {
        let a = fresh.query(&interval)?;
        let b = cached.query(&interval)?;
        assert_eq!(
            a.values().iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            b.values().iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }
    Ok(())
}

#[test]
fn test_rebuild_is_idempotent() -> Result<()> {
    let (_dir, path) = setup();
    let a = WigReader::builder().cache(false).open(&path)?;
    let b = WigReader::builder().cache(false).open(&path)?;

    let mut bytes_a = Vec::new();
    let mut bytes_b = Vec::new();
    a.index().write_bytes(&mut bytes_a)?;
    b.index().write_bytes(&mut bytes_b)?;
    assert_eq!(bytes_a, bytes_b);
    Ok(())
}

#[test]
fn test_checksum_gate_rebuilds_stale_cache() -> Result<()> {
    let (_dir, path) = setup();
    let mut reader = WigReader::from_path(&path)?;
    let old_checksum = reader.index().checksum();
    assert!((value_at(&mut reader, "chrI", 3) - 3.0).abs() < f32::EPSILON);
    drop(reader);

    mutate(&path, "\n3\n", "\n9\n");

    let mut reader = WigReader::from_path(&path)?;
    assert_ne!(reader.index().checksum(), old_checksum);
    assert_eq!(reader.index().checksum(), checksum(&path)?);
    assert!((value_at(&mut reader, "chrI", 3) - 9.0).abs() < f32::EPSILON);

    // the rebuilt index replaced the stale one on disk
    let cached = TrackIndex::load(default_index_path(&path), None)?;
    assert_eq!(cached.checksum(), checksum(&path)?);
    Ok(())
}

#[test]
fn test_version_mismatch_rebuilds() -> Result<()> {
    let (_dir, path) = setup();
    let _ = WigReader::from_path(&path)?;
    let index_path = default_index_path(&path);

    let mut bytes = fs::read(&index_path)?;
    bytes[..8].copy_from_slice(&(INDEX_VERSION + 7).to_le_bytes());
    fs::write(&index_path, &bytes)?;

    let reader = WigReader::from_path(&path)?;
    assert_eq!(reader.index().num_contigs(), 2);
    assert!(TrackIndex::load(&index_path, Some(checksum(&path)?)).is_ok());
    Ok(())
}

#[test]
fn test_corrupt_cache_rebuilds() -> Result<()> {
    let (_dir, path) = setup();
    let index_path = default_index_path(&path);
    fs::write(&index_path, b"not an index")?;

    let mut reader = WigReader::from_path(&path)?;
    assert_eq!(reader.chromosomes(), vec!["chrI", "chrII"]);
    assert!((value_at(&mut reader, "chrII", 21) - 6.0).abs() < f32::EPSILON);
    assert!(TrackIndex::load(&index_path, None).is_ok());
    Ok(())
}

#[test]
fn test_trusted_index_skips_checksum() -> Result<()> {
    let (dir, path) = setup();
    let index_path = dir.path().join("explicit.idx");
    let reader = WigReader::builder().index_path(&index_path).open(&path)?;
    let original = reader.index().checksum();
    drop(reader);
    assert!(index_path.exists());

    mutate(&path, "\n4\n", "\n8\n");

    // trusted: the stale index is served as is
    let reader = WigReader::builder()
        .index_path(&index_path)
        .trusted_index(true)
        .open(&path)?;
    assert_eq!(reader.index().checksum(), original);
    drop(reader);

    // untrusted: the mismatch is detected
    let reader = WigReader::builder().index_path(&index_path).open(&path)?;
    assert_ne!(reader.index().checksum(), original);
    Ok(())
}

#[test]
fn test_no_cache_leaves_no_file() -> Result<()> {
    let (_dir, path) = setup();
    let reader = WigReader::builder().cache(false).open(&path)?;
    assert_eq!(reader.index().num_contigs(), 2);
    assert!(!default_index_path(&path).exists());
    Ok(())
}

#[test]
fn test_failed_build_writes_no_cache() {
    let (_dir, path) = setup();
    fs::write(&path, "fixedStep chrom=chrI\n1\nbogus\n").unwrap();

    let err = WigReader::from_path(&path).err().unwrap();
    assert!(matches!(err, wigidx::Error::FormatError(_)));
    assert!(!default_index_path(&path).exists());
}
