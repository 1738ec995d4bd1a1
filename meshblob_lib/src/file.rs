use std::fs;
use std::path::Path;

use binrw::io::{Cursor, Read, Seek, SeekFrom, Write};
use binrw::{BinRead, BinReaderExt};
use meshblob_write::MeshWrite;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::formats::mesh::MeshRecord;
use crate::{round_up, write_buffered, MeshError};

pub const MESH_MAGIC: u32 = 0xC8A07F4D;
pub const MESH_VERSION: u16 = 1;

/// The header written before a single [MeshRecord] payload.
/// The payload is padded with zeros to a multiple of 4 bytes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(BinRead, MeshWrite, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: u32,
    pub version: u16,
    pub flags: u16,
    pub payload_size_in_bytes: u32,
}

impl FileHeader {
    pub const SIZE_IN_BYTES: u64 = 12;
}

// The number of bytes from the current position to the end of the reader.
pub(crate) fn remaining_bytes<R: Seek>(reader: &mut R) -> std::io::Result<u64> {
    let start = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(start))?;
    Ok(end.saturating_sub(start))
}

impl MeshRecord {
    /// Tries to read a [FileHeader] and its payload starting at the current position of `reader`.
    /// For best performance when opening from a file, use `from_file` instead.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, MeshError> {
        let available = remaining_bytes(reader)?;
        if available < FileHeader::SIZE_IN_BYTES {
            return Err(MeshError::TruncatedData {
                expected: FileHeader::SIZE_IN_BYTES,
                actual: available,
            });
        }

        let header: FileHeader = reader.read_le()?;
        if header.magic != MESH_MAGIC || header.version != MESH_VERSION {
            return Err(MeshError::Format {
                magic: header.magic,
                version: header.version as u32,
                expected_magic: MESH_MAGIC,
                expected_version: MESH_VERSION as u32,
            });
        }

        let payload_size = header.payload_size_in_bytes as u64;
        let available = available - FileHeader::SIZE_IN_BYTES;
        if available < payload_size {
            return Err(MeshError::TruncatedData {
                expected: payload_size,
                actual: available,
            });
        }

        let mut bytes = Vec::with_capacity(payload_size as usize);
        reader.by_ref().take(payload_size).read_to_end(&mut bytes)?;

        // The padding may be omitted at the end of the reader.
        let padding = (round_up(payload_size, 4) - payload_size).min(available - payload_size);
        reader.seek(SeekFrom::Current(padding as i64))?;

        Self::from_bytes(bytes)
    }

    /// Tries to read a [MeshRecord] from `path`.
    /// The entire file is buffered for performance.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MeshError> {
        let mut file = Cursor::new(fs::read(path)?);
        Self::read(&mut file)
    }

    /// Writes a [FileHeader] followed by the record's bytes and any padding.
    /// For best performance when writing to a file, use `write_to_file` instead.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let bytes = self.as_bytes();
        let header = FileHeader {
            magic: MESH_MAGIC,
            version: MESH_VERSION,
            flags: 0,
            // Records larger than u32::MAX are rejected on creation.
            payload_size_in_bytes: bytes.len() as u32,
        };
        header.mesh_write(writer)?;
        writer.write_all(bytes)?;

        let size = bytes.len() as u64;
        let padding = round_up(size, 4) - size;
        writer.write_all(&vec![0u8; padding as usize])?;
        Ok(())
    }

    /// Writes the data to the given path.
    /// The entire file is buffered for performance.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let mut file = fs::File::create(path)?;
        write_buffered(&mut file, |c| self.write(c))?;
        Ok(())
    }
}
