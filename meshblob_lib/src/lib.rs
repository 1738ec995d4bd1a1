//! # meshblob_lib
//!
//! meshblob_lib is a library for safe and efficient reading and writing of relocatable mesh blobs.
//! A [MeshRecord](crate::formats::mesh::MeshRecord) stores all of its data in a single contiguous buffer.
//! Every variable length field is addressed by an [OffsetRef] relative to the start of the record,
//! so a record can be moved, memory mapped, or copied as opaque bytes without any fixups.
//!
//! The library serves two purposes.
//!
//! The first is to provide high level and unambiguous documentation for the binary layout.
//! Strongly typed wrapper types such as [OffsetRef] replace ambiguous [u32] offsets.
//! Enums such as [ComponentType] and [DrawMode] provide additional typing information vs [u32] fields.
//!
//! The second is to eliminate the need to write tedious and error prone code for parsing and exporting binary data.
//! [binrw](https://crates.io/crates/binrw) generates the parsing code and [meshblob_write](../meshblob_write/index.html) generates the exporting code.
//! [BlobArena] enforces the conventions used for calculating offsets and alignment when laying out new records.
//!
//! ## Containers
//! Multiple records can share a single file using the append only container format in [formats::multi].
//! Appending a record never moves or rewrites the payloads of previously written records.
//!
//! ## Example
//! ```no_run
//! use meshblob_lib::formats::mesh::MeshRecord;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mesh = MeshRecord::from_file("model.mesh")?;
//! for attribute in mesh.attributes()? {
//!     println!("{} {:?}x{}", attribute.name, attribute.component_type, attribute.component_count);
//! }
//! mesh.write_to_file("model_copy.mesh")?;
//! # Ok(())
//! # }
//! ```
pub mod formats;

mod arena;
mod enums;
mod file;
mod offsets;
mod vectors;

pub use arena::BlobArena;
pub use enums::{ComponentType, DrawMode, Winding};
pub use file::{FileHeader, MESH_MAGIC, MESH_VERSION};
pub use offsets::{BlobElement, OffsetRef};
pub use vectors::{Matrix4x4, Vector3, Vector4};

pub use meshblob_write::MeshWrite;

use thiserror::Error;

/// Errors while reading, validating, or writing mesh blobs and containers.
#[derive(Debug, Error)]
pub enum MeshError {
    /// The file header had an unrecognized magic or version.
    #[error(
        "unrecognized header with magic {magic:#010x} and version {version}, expected magic {expected_magic:#010x} and version {expected_version}"
    )]
    Format {
        magic: u32,
        version: u32,
        expected_magic: u32,
        expected_version: u32,
    },

    /// The reader contained fewer bytes than the data declared.
    #[error("expected at least {expected} bytes but found {actual} bytes")]
    TruncatedData { expected: u64, actual: u64 },

    /// The container directory has no entry for the requested mesh id.
    #[error("no mesh with id {id} exists in the container directory")]
    NotFound { id: u32 },

    /// An [OffsetRef] resolved past the end of its owning buffer.
    #[error(
        "data at offset {offset} with size {size} is out of range for a buffer of {buffer_size} bytes"
    )]
    OutOfRange {
        offset: u64,
        size: u64,
        buffer_size: u64,
    },

    /// Index buffers only support [ComponentType::U8] and [ComponentType::U16].
    #[error("index component type {0:?} is not supported, expected U8 or U16")]
    UnsupportedIndexWidth(ComponentType),

    /// Vertex attributes must have between 1 and 4 components.
    #[error("component count {0} is not in the supported range 1 to 4")]
    InvalidComponentCount(u32),

    /// Offsets are stored as [u32], so a record can't exceed 4 GiB.
    #[error("record size of {0} bytes exceeds the maximum of 4294967295 bytes")]
    RecordTooLarge(u64),

    /// Every mesh id up to [u32::MAX] is already used by the container.
    #[error("the container has no remaining mesh ids")]
    IdOverflow,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    BinRead(#[from] binrw::Error),
}

/// Rounds `n` up to the nearest multiple of `alignment`.
/// An `alignment` of 0 leaves `n` unchanged.
/**
```rust
# use meshblob_lib::round_up;
assert_eq!(0, round_up(0, 4));
assert_eq!(8, round_up(5, 4));
assert_eq!(8, round_up(8, 4));
assert_eq!(3, round_up(3, 0));
```
*/
pub fn round_up(n: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return n;
    }
    ((n + alignment - 1) / alignment) * alignment
}

// Buffer the entire write operation into memory to improve performance.
// This avoids lots of small writes when writing directly to a file.
pub(crate) fn write_buffered<
    W: std::io::Write,
    F: Fn(&mut Vec<u8>) -> std::io::Result<()>,
>(
    writer: &mut W,
    write_data: F,
) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    write_data(&mut buffer)?;

    writer.write_all(&buffer)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn hex_bytes(hex: &str) -> Vec<u8> {
    // Remove any whitespace used to make the tests more readable.
    let no_whitespace: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(no_whitespace).unwrap()
}
