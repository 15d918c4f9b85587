use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;

use super::TrackIndex;
use crate::core::{ContigDescriptor, SummaryStats};
use crate::error::{IndexError, Result};
use crate::{INDEX_EXTENSION, INDEX_VERSION};

/// Default location of the cached index of `source`: the source path with `.idx` appended
#[must_use]
pub fn default_index_path<P: AsRef<Path>>(source: P) -> PathBuf {
    let mut path = OsString::from(source.as_ref().as_os_str());
    path.push(".");
    path.push(INDEX_EXTENSION);
    PathBuf::from(path)
}

impl TrackIndex {
    /// Serializes the index
    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i64::<LittleEndian>(INDEX_VERSION)?;
        writer.write_u64::<LittleEndian>(self.checksum())?;
        self.stats().write_bytes(writer)?;
        writer.write_i32::<LittleEndian>(self.num_contigs() as i32)?;
        for descriptor in self.iter_descriptors() {
            descriptor.write_bytes(writer)?;
        }
        Ok(())
    }

    /// Deserializes an index.
    ///
    /// The version must match [`INDEX_VERSION`]. When `expected_checksum` is
    /// given, the stored checksum must match it as well.
    pub fn read_bytes<R: Read>(reader: &mut R, expected_checksum: Option<u64>) -> Result<Self> {
        let version = reader.read_i64::<LittleEndian>()?;
        if version != INDEX_VERSION {
            return Err(IndexError::VersionMismatch {
                found: version,
                expected: INDEX_VERSION,
            }
            .into());
        }

        let checksum = reader.read_u64::<LittleEndian>()?;
        if let Some(expected) = expected_checksum {
            if checksum != expected {
                return Err(IndexError::ChecksumMismatch {
                    found: checksum,
                    expected,
                }
                .into());
            }
        }

        let stats = SummaryStats::read_bytes(reader)?;
        let count = reader.read_i32::<LittleEndian>()?;
        if count < 0 {
            return Err(IndexError::InvalidLength {
                field: "contig count",
                value: i64::from(count),
            }
            .into());
        }

        let mut index = Self::new(checksum, stats);
        for _ in 0..count {
            index.push(ContigDescriptor::read_bytes(reader)?);
        }
        Ok(index)
    }

    /// Writes the index to `path`.
    ///
    /// The data is written to a sibling temporary file first and moved into
    /// place once complete, so a partial index is never left at `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut tmp = OsString::from(path.as_os_str());
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let result = (|| -> Result<()> {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            self.write_bytes(&mut writer)?;
            writer.flush()?;
            fs::rename(&tmp, path)?;
            Ok(())
        })();
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result?;
        debug!("Saved index to {}", path.display());
        Ok(())
    }

    /// Loads an index from `path`, checking it against `expected_checksum` if given
    pub fn load<P: AsRef<Path>>(path: P, expected_checksum: Option<u64>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let index = Self::read_bytes(&mut reader, expected_checksum)?;
        debug!("Loaded index from {}", path.display());
        Ok(index)
    }
}
