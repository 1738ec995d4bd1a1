use binrw::BinRead;
use half::f16;
use meshblob_write::MeshWrite;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The data type of a single component of a vertex attribute or index.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(BinRead, MeshWrite, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[br(repr(u32))]
#[meshwrite(repr(u32))]
pub enum ComponentType {
    U8 = 0,
    I8 = 1,
    U16 = 2,
    I16 = 3,
    U32 = 4,
    I32 = 5,
    U64 = 6,
    I64 = 7,
    /// Half precision floating point.
    F16 = 8,
    F32 = 9,
    F64 = 10,
}

impl ComponentType {
    /// The size in bytes of a single component.
    /**
    ```rust
    # use meshblob_lib::ComponentType;
    assert_eq!(1, ComponentType::U8.size_in_bytes());
    assert_eq!(2, ComponentType::F16.size_in_bytes());
    assert_eq!(8, ComponentType::F64.size_in_bytes());
    ```
    */
    pub fn size_in_bytes(&self) -> usize {
        match self {
            ComponentType::U8 | ComponentType::I8 => 1,
            ComponentType::U16 | ComponentType::I16 | ComponentType::F16 => 2,
            ComponentType::U32 | ComponentType::I32 | ComponentType::F32 => 4,
            ComponentType::U64 | ComponentType::I64 | ComponentType::F64 => 8,
        }
    }

    /// Returns `true` for the types supported by index buffers.
    pub fn is_index_type(&self) -> bool {
        matches!(self, ComponentType::U8 | ComponentType::U16)
    }

    /// Decodes the first component in the little-endian `bytes` as an [f64].
    /// Returns `None` if `bytes` is shorter than [size_in_bytes](ComponentType::size_in_bytes).
    /// 64-bit integers outside the range exactly representable by [f64] are rounded.
    /**
    ```rust
    # use meshblob_lib::ComponentType;
    assert_eq!(Some(-2.0), ComponentType::I16.decode_f64(&[0xfe, 0xff]));
    assert_eq!(Some(1.0), ComponentType::F16.decode_f64(&[0x00, 0x3c]));
    assert_eq!(None, ComponentType::F32.decode_f64(&[0x00, 0x00]));
    ```
    */
    pub fn decode_f64(&self, bytes: &[u8]) -> Option<f64> {
        let value = match self {
            ComponentType::U8 => *bytes.first()? as f64,
            ComponentType::I8 => *bytes.first()? as i8 as f64,
            ComponentType::U16 => u16::from_le_bytes(array(bytes)?) as f64,
            ComponentType::I16 => i16::from_le_bytes(array(bytes)?) as f64,
            ComponentType::U32 => u32::from_le_bytes(array(bytes)?) as f64,
            ComponentType::I32 => i32::from_le_bytes(array(bytes)?) as f64,
            ComponentType::U64 => u64::from_le_bytes(array(bytes)?) as f64,
            ComponentType::I64 => i64::from_le_bytes(array(bytes)?) as f64,
            ComponentType::F16 => f16::from_bits(u16::from_le_bytes(array(bytes)?)).to_f64(),
            ComponentType::F32 => f32::from_le_bytes(array(bytes)?) as f64,
            ComponentType::F64 => f64::from_le_bytes(array(bytes)?),
        };
        Some(value)
    }
}

fn array<const N: usize>(bytes: &[u8]) -> Option<[u8; N]> {
    bytes.get(..N)?.try_into().ok()
}

/// Determines how the vertices or indices are assembled into primitives.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(BinRead, MeshWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[br(repr(u32))]
#[meshwrite(repr(u32))]
pub enum DrawMode {
    Points = 0,
    LineStrip = 1,
    LineLoop = 2,
    Lines = 3,
    TriangleStrip = 4,
    TriangleFan = 5,
    Triangles = 6,
}

impl Default for DrawMode {
    fn default() -> Self {
        DrawMode::Triangles
    }
}

/// The vertex order of front facing triangles.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(BinRead, MeshWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[br(repr(u32))]
#[meshwrite(repr(u32))]
pub enum Winding {
    Clockwise = 0,
    CounterClockwise = 1,
}

impl Default for Winding {
    fn default() -> Self {
        Winding::CounterClockwise
    }
}

#[cfg(test)]
mod tests {
    use binrw::io::Cursor;
    use binrw::BinReaderExt;

    use crate::hex_bytes;

    use super::*;

    #[test]
    fn read_component_type() {
        let mut reader = Cursor::new(hex_bytes("08000000"));
        assert_eq!(ComponentType::F16, reader.read_le::<ComponentType>().unwrap());
    }

    #[test]
    fn read_unknown_component_type() {
        let mut reader = Cursor::new(hex_bytes("0b000000"));
        assert!(reader.read_le::<ComponentType>().is_err());
    }

    #[test]
    fn write_draw_mode() {
        assert_eq!(hex_bytes("06000000"), DrawMode::Triangles.to_bytes().unwrap());
        assert_eq!(4, DrawMode::Triangles.size_in_bytes());
    }

    #[test]
    fn read_winding() {
        let mut reader = Cursor::new(hex_bytes("01000000"));
        assert_eq!(Winding::CounterClockwise, reader.read_le::<Winding>().unwrap());
    }

    #[test]
    fn decode_all_component_types() {
        assert_eq!(Some(255.0), ComponentType::U8.decode_f64(&[0xff]));
        assert_eq!(Some(-1.0), ComponentType::I8.decode_f64(&[0xff]));
        assert_eq!(Some(65535.0), ComponentType::U16.decode_f64(&[0xff, 0xff]));
        assert_eq!(Some(-1.0), ComponentType::I16.decode_f64(&[0xff, 0xff]));
        assert_eq!(
            Some(16777216.0),
            ComponentType::U32.decode_f64(&hex_bytes("00000001"))
        );
        assert_eq!(
            Some(-2.0),
            ComponentType::I32.decode_f64(&hex_bytes("feffffff"))
        );
        assert_eq!(
            Some(1.0),
            ComponentType::U64.decode_f64(&hex_bytes("01000000 00000000"))
        );
        assert_eq!(
            Some(-1.0),
            ComponentType::I64.decode_f64(&hex_bytes("ffffffff ffffffff"))
        );
        assert_eq!(Some(-2.0), ComponentType::F16.decode_f64(&[0x00, 0xc0]));
        assert_eq!(
            Some(0.5),
            ComponentType::F32.decode_f64(&hex_bytes("0000003f"))
        );
        assert_eq!(
            Some(1.0),
            ComponentType::F64.decode_f64(&hex_bytes("00000000 0000f03f"))
        );
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        assert_eq!(Some(1.0), ComponentType::U16.decode_f64(&[1, 0, 9, 9]));
    }

    #[test]
    fn index_types() {
        assert!(ComponentType::U8.is_index_type());
        assert!(ComponentType::U16.is_index_type());
        assert!(!ComponentType::U32.is_index_type());
    }
}
