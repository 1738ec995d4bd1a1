use std::marker::PhantomData;

use binrw::io::{Cursor, Read, Seek};
use binrw::{BinRead, BinReaderExt, BinResult, ReadOptions};
use meshblob_write::MeshWrite;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::MeshError;

/// A type with a fixed size when stored contiguously in a blob.
pub trait BlobElement {
    /// The offset in bytes between successive elements.
    const SIZE_IN_BYTES: u64;
}

impl BlobElement for u8 {
    const SIZE_IN_BYTES: u64 = 1;
}

impl BlobElement for u16 {
    const SIZE_IN_BYTES: u64 = 2;
}

/// A reference to `count` contiguous elements of type `T` stored `offset` bytes from the start of the owning record.
/// An [OffsetRef] is never an absolute address, so records can be moved or copied as opaque bytes.
/**
```rust
use meshblob_lib::OffsetRef;

let buffer = [0u8, 0, 0, 0, 1, 2, 3, 4];
let data = OffsetRef::<u8>::new(4, 3);
assert_eq!(&[1u8, 2, 3], data.resolve(&buffer).unwrap());

// References to empty data are stored as offset 0 and count 0.
let empty = OffsetRef::<u8>::null();
assert!(empty.resolve(&buffer).unwrap().is_empty());
```
 */
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(bound = ""))]
pub struct OffsetRef<T> {
    /// The offset in bytes from the start of the owning record.
    pub offset: u32,
    /// The number of elements, not the number of bytes.
    pub count: u32,
    #[cfg_attr(feature = "serde", serde(skip))]
    phantom: PhantomData<fn() -> T>,
}

impl<T> OffsetRef<T> {
    pub fn new(offset: u32, count: u32) -> Self {
        Self {
            offset,
            count,
            phantom: PhantomData,
        }
    }

    /// The reference for empty data with an offset and count of 0.
    pub fn null() -> Self {
        Self::new(0, 0)
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl<T: BlobElement> OffsetRef<T> {
    /// The number of bytes referenced by `self`.
    pub fn byte_count(&self) -> u64 {
        self.count as u64 * T::SIZE_IN_BYTES
    }

    /// Returns the bytes of `base` referenced by `self`
    /// or [MeshError::OutOfRange] if the data does not fit in `base`.
    pub fn resolve<'a>(&self, base: &'a [u8]) -> Result<&'a [u8], MeshError> {
        let start = self.offset as u64;
        let size = self.byte_count();
        // The u64 arithmetic can't overflow for u32 offsets and counts.
        let end = start + size;
        if end > base.len() as u64 {
            return Err(MeshError::OutOfRange {
                offset: start,
                size,
                buffer_size: base.len() as u64,
            });
        }

        Ok(&base[start as usize..end as usize])
    }
}

impl<T: BlobElement + BinRead<Args = ()>> OffsetRef<T> {
    /// Resolves `self` against `base` and decodes each little-endian element.
    pub fn read_elements(&self, base: &[u8]) -> Result<Vec<T>, MeshError> {
        let bytes = self.resolve(base)?;
        let mut reader = Cursor::new(bytes);

        let mut elements = Vec::with_capacity(self.count as usize);
        for _ in 0..self.count {
            elements.push(reader.read_le::<T>()?);
        }
        Ok(elements)
    }
}

// Implement traits manually to avoid requiring T to implement them.
impl<T> Clone for OffsetRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for OffsetRef<T> {}

impl<T> PartialEq for OffsetRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset && self.count == other.count
    }
}

impl<T> Eq for OffsetRef<T> {}

impl<T> Default for OffsetRef<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> std::fmt::Debug for OffsetRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffsetRef")
            .field("offset", &self.offset)
            .field("count", &self.count)
            .finish()
    }
}

impl<T: 'static> BinRead for OffsetRef<T> {
    type Args = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        options: &ReadOptions,
        _args: Self::Args,
    ) -> BinResult<Self> {
        let offset = u32::read_options(reader, options, ())?;
        let count = u32::read_options(reader, options, ())?;
        Ok(Self::new(offset, count))
    }
}

impl<T> MeshWrite for OffsetRef<T> {
    fn mesh_write<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.offset.mesh_write(writer)?;
        self.count.mesh_write(writer)?;
        Ok(())
    }

    fn size_in_bytes(&self) -> u64 {
        8
    }

    fn alignment_in_bytes() -> u64 {
        4
    }
}
