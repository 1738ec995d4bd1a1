use binrw::BinRead;
use meshblob_write::MeshWrite;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 3 contiguous floats for encoding XYZ or RGB data.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(BinRead, MeshWrite, Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Vector3 {
        Vector3 { x, y, z }
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from(v: [f32; 3]) -> Self {
        Self {
            x: v[0],
            y: v[1],
            z: v[2],
        }
    }
}

impl From<Vector3> for [f32; 3] {
    fn from(v: Vector3) -> Self {
        v.to_array()
    }
}

/// 4 contiguous floats for encoding XYZW or RGBA data.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(BinRead, MeshWrite, Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vector4 {
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Vector4 {
        Vector4 { x, y, z, w }
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }
}

impl From<[f32; 4]> for Vector4 {
    fn from(v: [f32; 4]) -> Self {
        Self {
            x: v[0],
            y: v[1],
            z: v[2],
            w: v[3],
        }
    }
}

/// A column-major 4x4 matrix of contiguous floats.
/// The translation is stored in the last column [w](#structfield.w).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(BinRead, MeshWrite, Debug, Clone, Copy, PartialEq)]
pub struct Matrix4x4 {
    pub x: Vector4,
    pub y: Vector4,
    pub z: Vector4,
    pub w: Vector4,
}

impl Matrix4x4 {
    /// The identity transformation matrix.
    ///
    /**
    ```rust
    use meshblob_lib::{Vector4, Matrix4x4};

    let m = Matrix4x4::identity();
    assert_eq!(Vector4::new(1f32, 0f32, 0f32, 0f32), m.x);
    assert_eq!(Vector4::new(0f32, 1f32, 0f32, 0f32), m.y);
    assert_eq!(Vector4::new(0f32, 0f32, 1f32, 0f32), m.z);
    assert_eq!(Vector4::new(0f32, 0f32, 0f32, 1f32), m.w);
    ```
    */
    pub fn identity() -> Matrix4x4 {
        Matrix4x4 {
            x: Vector4::new(1f32, 0f32, 0f32, 0f32),
            y: Vector4::new(0f32, 1f32, 0f32, 0f32),
            z: Vector4::new(0f32, 0f32, 1f32, 0f32),
            w: Vector4::new(0f32, 0f32, 0f32, 1f32),
        }
    }

    /// Converts the elements to a 2d array in column-major order.
    /// This matches the layout used by `glam::Mat4::to_cols_array_2d`.
    /**
    ```rust
    use meshblob_lib::{Vector4, Matrix4x4};

    let m = Matrix4x4 {
        x: Vector4::new(1f32, 2f32, 3f32, 4f32),
        y: Vector4::new(5f32, 6f32, 7f32, 8f32),
        z: Vector4::new(9f32, 10f32, 11f32, 12f32),
        w: Vector4::new(13f32, 14f32, 15f32, 16f32),
    };

    assert_eq!(
        [
            [1f32, 2f32, 3f32, 4f32],
            [5f32, 6f32, 7f32, 8f32],
            [9f32, 10f32, 11f32, 12f32],
            [13f32, 14f32, 15f32, 16f32],
        ],
        m.to_cols_array_2d(),
    );
    ```
    */
    pub fn to_cols_array_2d(&self) -> [[f32; 4]; 4] {
        [
            self.x.to_array(),
            self.y.to_array(),
            self.z.to_array(),
            self.w.to_array(),
        ]
    }

    /// Creates the matrix from a 2d array in column-major order.
    /**
    ```rust
    # use meshblob_lib::Matrix4x4;
    let elements = [
        [1f32, 2f32, 3f32, 4f32],
        [5f32, 6f32, 7f32, 8f32],
        [9f32, 10f32, 11f32, 12f32],
        [13f32, 14f32, 15f32, 16f32],
    ];
    let m = Matrix4x4::from_cols_array_2d(&elements);
    assert_eq!(elements, m.to_cols_array_2d());
    ```
    */
    pub fn from_cols_array_2d(cols: &[[f32; 4]; 4]) -> Matrix4x4 {
        Matrix4x4 {
            x: cols[0].into(),
            y: cols[1].into(),
            z: cols[2].into(),
            w: cols[3].into(),
        }
    }
}

impl Default for Matrix4x4 {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use binrw::io::Cursor;
    use binrw::BinReaderExt;

    use crate::hex_bytes;

    use super::*;

    #[test]
    fn read_vector3() {
        let mut reader = Cursor::new(hex_bytes("0000803F 000000C0 0000003F"));
        let value = reader.read_le::<Vector3>().unwrap();
        assert_eq!(1.0f32, value.x);
        assert_eq!(-2.0f32, value.y);
        assert_eq!(0.5f32, value.z);
    }

    #[test]
    fn write_vector3() {
        let value = Vector3::new(1.0, -2.0, 0.5);
        assert_eq!(
            hex_bytes("0000803F 000000C0 0000003F"),
            value.to_bytes().unwrap()
        );
    }

    #[test]
    fn read_vector4() {
        let mut reader = Cursor::new(hex_bytes("0000803F 000000C0 0000003F 0000803F"));
        let value = reader.read_le::<Vector4>().unwrap();
        assert_eq!(Vector4::new(1.0, -2.0, 0.5, 1.0), value);
    }

    #[test]
    fn read_matrix4x4_translation() {
        let mut reader = Cursor::new(hex_bytes(
            "0000803F 00000000 00000000 00000000
             00000000 0000803F 00000000 00000000
             00000000 00000000 0000803F 00000000
             0000803F 00000040 00004040 0000803F",
        ));
        let value = reader.read_le::<Matrix4x4>().unwrap();
        assert_eq!(Vector4::new(1f32, 0f32, 0f32, 0f32), value.x);
        assert_eq!(Vector4::new(0f32, 1f32, 0f32, 0f32), value.y);
        assert_eq!(Vector4::new(0f32, 0f32, 1f32, 0f32), value.z);
        assert_eq!(Vector4::new(1f32, 2f32, 3f32, 1f32), value.w);
    }

    #[test]
    fn matrix4x4_size() {
        assert_eq!(64, Matrix4x4::identity().size_in_bytes());
    }
}
