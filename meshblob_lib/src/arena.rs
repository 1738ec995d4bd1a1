use meshblob_write::MeshWrite;

use crate::{round_up, BlobElement, MeshError, OffsetRef};

// The minimum alignment for all data in a record.
// Element types may request a larger alignment with MeshWrite::alignment_in_bytes.
const BLOB_ALIGNMENT: u64 = 4;

/// A growable byte buffer for laying out a new record.
/// Each push appends aligned data and returns an [OffsetRef] relative to the start of the buffer.
/// The first `reserved` bytes are zeroed and set aside for the record's header.
/**
```rust
use meshblob_lib::BlobArena;

let mut arena = BlobArena::new(8);
let name = arena.push_str("Position0").unwrap();
assert_eq!((8, 9), (name.offset, name.count));

// Data always starts at a 4-byte aligned offset.
let data = arena.push_bytes(&[1, 2, 3]).unwrap();
assert_eq!((20, 3), (data.offset, data.count));

arena.write_at(0, &name).unwrap();
let bytes = arena.into_bytes().unwrap();
assert_eq!(24, bytes.len());
```
 */
#[derive(Debug, Default)]
pub struct BlobArena {
    bytes: Vec<u8>,
}

impl BlobArena {
    pub fn new(reserved: usize) -> Self {
        Self {
            bytes: vec![0u8; reserved],
        }
    }

    /// The current size in bytes including the reserved region.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<OffsetRef<u8>, MeshError> {
        self.push_raw(bytes, bytes.len(), BLOB_ALIGNMENT)
    }

    /// Appends the little-endian representation of each element.
    /// The data starts at a multiple of the element's [alignment](MeshWrite::alignment_in_bytes)
    /// and is always at least 4-byte aligned.
    pub fn push_elements<T: MeshWrite + BlobElement>(
        &mut self,
        elements: &[T],
    ) -> Result<OffsetRef<T>, MeshError> {
        let mut bytes = Vec::with_capacity(elements.len() * T::SIZE_IN_BYTES as usize);
        for element in elements {
            element.mesh_write(&mut bytes)?;
        }
        self.push_raw(&bytes, elements.len(), T::alignment_in_bytes().max(BLOB_ALIGNMENT))
    }

    /// Appends the UTF-8 bytes of `value` without a null terminator.
    pub fn push_str(&mut self, value: &str) -> Result<OffsetRef<u8>, MeshError> {
        self.push_bytes(value.as_bytes())
    }

    /// Appends the UTF-16 code units of `value` without a null terminator.
    pub fn push_utf16(&mut self, value: &str) -> Result<OffsetRef<u16>, MeshError> {
        let code_units: Vec<u16> = value.encode_utf16().collect();
        self.push_elements(&code_units)
    }

    /// Overwrites the bytes starting at `position` with `value`.
    /// This is used to fill in the header once the offsets of all the data are known.
    pub fn write_at<T: MeshWrite>(&mut self, position: usize, value: &T) -> Result<(), MeshError> {
        let bytes = value.to_bytes()?;
        let end = position + bytes.len();
        if end > self.bytes.len() {
            self.bytes.resize(end, 0u8);
        }
        self.bytes[position..end].copy_from_slice(&bytes);
        Ok(())
    }

    /// Pads the buffer to the blob alignment and returns the bytes.
    pub fn into_bytes(mut self) -> Result<Vec<u8>, MeshError> {
        self.align(BLOB_ALIGNMENT)?;
        Ok(self.bytes)
    }

    fn align(&mut self, alignment: u64) -> Result<u64, MeshError> {
        let aligned = round_up(self.bytes.len() as u64, alignment);
        if aligned > u32::MAX as u64 {
            return Err(MeshError::RecordTooLarge(aligned));
        }
        self.bytes.resize(aligned as usize, 0u8);
        Ok(aligned)
    }

    fn push_raw<T>(
        &mut self,
        bytes: &[u8],
        count: usize,
        alignment: u64,
    ) -> Result<OffsetRef<T>, MeshError> {
        if count == 0 {
            return Ok(OffsetRef::null());
        }

        let offset = self.align(alignment)?;
        let end = offset + bytes.len() as u64;
        if end > u32::MAX as u64 {
            return Err(MeshError::RecordTooLarge(end));
        }
        let count = u32::try_from(count).map_err(|_| MeshError::RecordTooLarge(end))?;

        self.bytes.extend_from_slice(bytes);
        Ok(OffsetRef::new(offset as u32, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_empty_data() {
        let mut arena = BlobArena::new(4);
        assert_eq!(OffsetRef::null(), arena.push_bytes(&[]).unwrap());
        assert_eq!(OffsetRef::null(), arena.push_str("").unwrap());
        assert_eq!(OffsetRef::null(), arena.push_utf16("").unwrap());
        assert_eq!(4, arena.len());
    }

    #[test]
    fn push_aligned_offsets() {
        let mut arena = BlobArena::new(6);
        let a = arena.push_bytes(&[1]).unwrap();
        let b = arena.push_elements(&[2u16, 3u16]).unwrap();

        assert_eq!(OffsetRef::new(8, 1), a);
        assert_eq!(OffsetRef::new(12, 2), b);
        assert_eq!(
            vec![0u8, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 2, 0, 3, 0],
            arena.into_bytes().unwrap()
        );
    }

    #[test]
    fn push_utf16_code_units() {
        let mut arena = BlobArena::new(0);
        let name = arena.push_utf16("ab").unwrap();
        assert_eq!(OffsetRef::new(0, 2), name);
        assert_eq!(vec![0x61u8, 0, 0x62, 0], arena.into_bytes().unwrap());
    }

    #[test]
    fn push_str_counts_bytes() {
        let mut arena = BlobArena::new(0);
        // The count is in bytes for UTF-8 strings.
        let name = arena.push_str("é").unwrap();
        assert_eq!(2, name.count);
    }

    #[test]
    fn push_elements_with_larger_alignment() {
        #[derive(Debug, MeshWrite)]
        #[meshwrite(alignment = 16)]
        struct Aligned {
            value: u32,
        }

        impl BlobElement for Aligned {
            const SIZE_IN_BYTES: u64 = 4;
        }

        let mut arena = BlobArena::new(0);
        arena.push_bytes(&[1]).unwrap();
        let a = arena.push_elements(&[Aligned { value: 2 }]).unwrap();
        // Types with a smaller alignment still use the minimum of 4 bytes.
        let b = arena.push_bytes(&[3]).unwrap();
        let c = arena.push_elements(&[Aligned { value: 4 }]).unwrap();

        assert_eq!(OffsetRef::new(16, 1), a);
        assert_eq!(OffsetRef::new(20, 1), b);
        assert_eq!(OffsetRef::new(32, 1), c);
        assert_eq!(36, arena.into_bytes().unwrap().len());
    }

    #[test]
    fn write_at_header() {
        let mut arena = BlobArena::new(8);
        let data = arena.push_bytes(&[7, 7, 7, 7]).unwrap();
        arena.write_at(0, &data).unwrap();

        assert_eq!(
            vec![8u8, 0, 0, 0, 4, 0, 0, 0, 7, 7, 7, 7],
            arena.into_bytes().unwrap()
        );
    }

    #[test]
    fn into_bytes_pads_to_alignment() {
        let mut arena = BlobArena::new(0);
        arena.push_bytes(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(8, arena.into_bytes().unwrap().len());
    }
}
