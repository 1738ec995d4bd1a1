use std::io::Write;

pub use meshblob_write_derive::MeshWrite;

/// A trait for writing the fixed-size little-endian records that make up a mesh blob.
/**
```rust
use meshblob_write::MeshWrite;

#[derive(MeshWrite)]
struct Range {
    offset: u32,
    count: u32,
}

let bytes = Range { offset: 8, count: 2 }.to_bytes().unwrap();
assert_eq!(vec![8, 0, 0, 0, 2, 0, 0, 0], bytes);
```
 */
pub trait MeshWrite: Sized {
    /// Writes the little-endian byte representation of `self` to `writer`.
    fn mesh_write<W: Write>(&self, writer: &mut W) -> std::io::Result<()>;

    /// The number of bytes written by [mesh_write](MeshWrite::mesh_write).
    /// This is the sum of the field sizes and does not include any Rust padding.
    fn size_in_bytes(&self) -> u64 {
        std::mem::size_of::<Self>() as u64
    }

    /// The alignment in bytes of the type when placed in a blob.
    fn alignment_in_bytes() -> u64 {
        std::mem::align_of::<Self>() as u64
    }

    /// Writes `self` to a new buffer.
    fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.size_in_bytes() as usize);
        self.mesh_write(&mut bytes)?;
        Ok(bytes)
    }
}

impl<T: MeshWrite> MeshWrite for &[T] {
    fn mesh_write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for element in self.iter() {
            element.mesh_write(writer)?;
        }
        Ok(())
    }

    fn size_in_bytes(&self) -> u64 {
        self.iter().map(MeshWrite::size_in_bytes).sum()
    }

    fn alignment_in_bytes() -> u64 {
        T::alignment_in_bytes()
    }
}

impl<T: MeshWrite> MeshWrite for Vec<T> {
    fn mesh_write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.as_slice().mesh_write(writer)
    }

    fn size_in_bytes(&self) -> u64 {
        self.as_slice().size_in_bytes()
    }

    fn alignment_in_bytes() -> u64 {
        T::alignment_in_bytes()
    }
}

impl<T: MeshWrite, const N: usize> MeshWrite for [T; N] {
    fn mesh_write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.as_slice().mesh_write(writer)
    }

    fn size_in_bytes(&self) -> u64 {
        self.as_slice().size_in_bytes()
    }

    fn alignment_in_bytes() -> u64 {
        T::alignment_in_bytes()
    }
}

macro_rules! mesh_write_impl {
    ($($id:ident),*) => {
        $(
            impl MeshWrite for $id {
                fn mesh_write<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
                    writer.write_all(&self.to_le_bytes())?;
                    Ok(())
                }

                fn size_in_bytes(&self) -> u64 {
                    std::mem::size_of::<Self>() as u64
                }

                fn alignment_in_bytes() -> u64 {
                    std::mem::align_of::<Self>() as u64
                }
            }
        )*
    }
}

mesh_write_impl!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);
