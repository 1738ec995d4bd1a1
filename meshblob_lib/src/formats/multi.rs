//! An append only container for storing multiple [MeshRecord] payloads in a single file.
//!
//! Each payload is stored with its own [FileHeader](crate::FileHeader) exactly like a single mesh file.
//! The directory of [DirectoryEntry] values and the [ContainerHeader] are always the final bytes of the file.
//! Appending a mesh writes the new payload where the old directory started
//! and then writes the updated directory and header at the new end of the file.
//! Previously written payloads are never moved or rewritten.
use std::fs::OpenOptions;
use std::io::BufReader;
use std::path::Path;

use binrw::io::{Read, Seek, SeekFrom, Write};
use binrw::{BinRead, BinReaderExt};
use log::debug;
use meshblob_write::MeshWrite;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::formats::mesh::MeshRecord;
use crate::{BlobElement, MeshError, OffsetRef};

pub const MULTI_MAGIC: u32 = 0x21207DD9;
pub const MULTI_VERSION: u32 = 1;

/// The location of a single mesh payload in the container.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(BinRead, MeshWrite, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// The absolute position of the mesh's [FileHeader](crate::FileHeader) in the file.
    pub mesh_byte_offset: u64,
    pub mesh_id: u32,
    pub padding: u32,
}

impl BlobElement for DirectoryEntry {
    const SIZE_IN_BYTES: u64 = 16;
}

/// The final bytes of a container file.
/// [entries](#structfield.entries) is relative to the start of the directory entries immediately preceding the header.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(BinRead, MeshWrite, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub magic: u32,
    pub version: u32,
    pub entries: OffsetRef<DirectoryEntry>,
}

impl ContainerHeader {
    pub const SIZE_IN_BYTES: u64 = 16;
}

/// The decoded directory of a container.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiMeshInfo {
    pub entries: Vec<DirectoryEntry>,
    /// The absolute position of the first directory entry.
    /// This is also the end of the mesh payload data and the next append point.
    pub directory_offset: u64,
}

impl MultiMeshInfo {
    /// The largest mesh id in the directory or `0` if the directory is empty.
    pub fn highest_id(&self) -> u32 {
        self.entries.iter().map(|e| e.mesh_id).max().unwrap_or(0)
    }

    pub fn find(&self, id: u32) -> Option<&DirectoryEntry> {
        self.entries.iter().find(|e| e.mesh_id == id)
    }
}

/// Returns `true` if the final bytes of `reader` are a [ContainerHeader] with the expected magic.
/// The position of `reader` is unchanged.
pub fn is_multi<R: Read + Seek>(reader: &mut R) -> bool {
    let check = |reader: &mut R| -> Result<bool, MeshError> {
        let end = reader.seek(SeekFrom::End(0))?;
        if end < ContainerHeader::SIZE_IN_BYTES {
            return Ok(false);
        }
        reader.seek(SeekFrom::Start(end - ContainerHeader::SIZE_IN_BYTES))?;
        let magic: u32 = reader.read_le()?;
        Ok(magic == MULTI_MAGIC)
    };

    match reader.stream_position() {
        Ok(start) => {
            let result = check(reader);
            reader.seek(SeekFrom::Start(start)).is_ok() && matches!(result, Ok(true))
        }
        Err(_) => false,
    }
}

/// Reads the trailing [ContainerHeader] and the directory entries preceding it.
pub fn read_multi_header<R: Read + Seek>(reader: &mut R) -> Result<MultiMeshInfo, MeshError> {
    let end = reader.seek(SeekFrom::End(0))?;
    if end < ContainerHeader::SIZE_IN_BYTES {
        return Err(MeshError::TruncatedData {
            expected: ContainerHeader::SIZE_IN_BYTES,
            actual: end,
        });
    }

    let header_offset = end - ContainerHeader::SIZE_IN_BYTES;
    reader.seek(SeekFrom::Start(header_offset))?;
    let header: ContainerHeader = reader.read_le()?;
    if header.magic != MULTI_MAGIC || header.version != MULTI_VERSION {
        return Err(MeshError::Format {
            magic: header.magic,
            version: header.version,
            expected_magic: MULTI_MAGIC,
            expected_version: MULTI_VERSION,
        });
    }

    // The directory run ends where the header starts.
    let run_size = header.entries.count as u64 * DirectoryEntry::SIZE_IN_BYTES;
    let directory_offset = header_offset
        .checked_sub(run_size)
        .ok_or(MeshError::TruncatedData {
            expected: run_size + ContainerHeader::SIZE_IN_BYTES,
            actual: end,
        })?;

    reader.seek(SeekFrom::Start(directory_offset))?;
    let mut run = Vec::with_capacity(run_size as usize);
    reader.by_ref().take(run_size).read_to_end(&mut run)?;
    let entries = header.entries.read_elements(&run)?;

    Ok(MultiMeshInfo {
        entries,
        directory_offset,
    })
}

/// The largest mesh id in the container or `0` if `reader` is not a container.
pub fn highest_multi_version<R: Read + Seek>(reader: &mut R) -> Result<u32, MeshError> {
    if !is_multi(reader) {
        return Ok(0);
    }
    Ok(read_multi_header(reader)?.highest_id())
}

impl MeshRecord {
    /// Reads the mesh with the given `id` from a container.
    pub fn read_multi<R: Read + Seek>(reader: &mut R, id: u32) -> Result<Self, MeshError> {
        let info = read_multi_header(reader)?;
        let entry = info.find(id).ok_or(MeshError::NotFound { id })?;

        reader.seek(SeekFrom::Start(entry.mesh_byte_offset))?;
        Self::read(reader)
    }

    /// Appends the mesh to a container and returns the assigned id.
    ///
    /// An `id` of 0 assigns one more than the highest id in the container.
    /// Writing an id that already exists replaces the directory entry,
    /// but the previous payload remains in the file.
    /// A stream that is not yet a container is converted by appending after its existing data.
    pub fn write_multi<S: Read + Write + Seek>(
        &self,
        stream: &mut S,
        id: u32,
    ) -> Result<u32, MeshError> {
        let (mut entries, append_offset) = if is_multi(stream) {
            let info = read_multi_header(stream)?;
            (info.entries, info.directory_offset)
        } else {
            (Vec::new(), stream.seek(SeekFrom::End(0))?)
        };

        let id = match id {
            0 => entries
                .iter()
                .map(|e| e.mesh_id)
                .max()
                .unwrap_or(0)
                .checked_add(1)
                .ok_or(MeshError::IdOverflow)?,
            id => id,
        };

        let entry = DirectoryEntry {
            mesh_byte_offset: append_offset,
            mesh_id: id,
            padding: 0,
        };
        match entries.iter_mut().find(|e| e.mesh_id == id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }

        let mut buffer = Vec::new();
        self.write(&mut buffer)?;
        let directory_offset = append_offset + buffer.len() as u64;
        entries.mesh_write(&mut buffer)?;

        let count = u32::try_from(entries.len())
            .map_err(|_| MeshError::RecordTooLarge(entries.len() as u64))?;
        let header = ContainerHeader {
            magic: MULTI_MAGIC,
            version: MULTI_VERSION,
            entries: OffsetRef::new(0, count),
        };
        header.mesh_write(&mut buffer)?;

        // The new directory always ends after the old one, so nothing is left to truncate.
        stream.seek(SeekFrom::Start(append_offset))?;
        stream.write_all(&buffer)?;

        debug!(
            "Appended mesh {} at offset {} with directory of {} entries at offset {}",
            id,
            append_offset,
            entries.len(),
            directory_offset
        );

        Ok(id)
    }

    /// Reads the mesh with the given `id` from the container at `path`.
    /// The entire file is buffered for performance.
    pub fn read_multi_from_file<P: AsRef<Path>>(path: P, id: u32) -> Result<Self, MeshError> {
        let mut file = binrw::io::Cursor::new(std::fs::read(path)?);
        Self::read_multi(&mut file, id)
    }

    /// Appends the mesh to the container at `path` and returns the assigned id.
    /// The file is created if it does not exist.
    pub fn write_multi_to_file<P: AsRef<Path>>(&self, path: P, id: u32) -> Result<u32, MeshError> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        self.write_multi(&mut file, id)
    }
}

/// Reads the directory of the container at `path`.
pub fn read_multi_header_from_file<P: AsRef<Path>>(path: P) -> Result<MultiMeshInfo, MeshError> {
    let file = std::fs::File::open(path)?;
    read_multi_header(&mut BufReader::new(file))
}
