use half::f16;
use meshblob_lib::formats::mesh::MeshRecord;
use meshblob_lib::{ComponentType, MeshError};

/// A primitive type that can be stored as a vertex attribute component.
pub trait Component: Copy {
    const COMPONENT_TYPE: ComponentType;

    /// Appends the little-endian bytes of `self` to `bytes`.
    fn write_le(&self, bytes: &mut Vec<u8>);
}

macro_rules! component_impl {
    ($($ty:ty => $component_type:ident),*) => {
        $(
            impl Component for $ty {
                const COMPONENT_TYPE: ComponentType = ComponentType::$component_type;

                fn write_le(&self, bytes: &mut Vec<u8>) {
                    bytes.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

component_impl!(
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64
);

impl Component for f16 {
    const COMPONENT_TYPE: ComponentType = ComponentType::F16;

    fn write_le(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&self.to_bits().to_le_bytes());
    }
}

/// The tightly packed data for a single named vertex attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexColumn {
    pub name: String,
    pub component_type: ComponentType,
    pub component_count: u32,
    /// The little-endian data for each vertex without any padding between vertices.
    pub data: Vec<u8>,
}

impl VertexColumn {
    /// Creates a column with `N` components per vertex.
    /**
    ```rust
    # use meshblob_data::mesh_builder::VertexColumn;
    # use meshblob_lib::ComponentType;
    let column = VertexColumn::new("Position0", &[[0f32, 1f32, 2f32], [3f32, 4f32, 5f32]]);
    assert_eq!(ComponentType::F32, column.component_type);
    assert_eq!(3, column.component_count);
    assert_eq!(2, column.len());
    assert_eq!(24, column.data.len());
    ```
    */
    pub fn new<T: Component, const N: usize>(name: &str, values: &[[T; N]]) -> Self {
        let mut data = Vec::with_capacity(values.len() * N * T::COMPONENT_TYPE.size_in_bytes());
        for value in values {
            for component in value {
                component.write_le(&mut data);
            }
        }

        Self {
            name: name.to_string(),
            component_type: T::COMPONENT_TYPE,
            component_count: N as u32,
            data,
        }
    }

    pub fn from_bytes(
        name: &str,
        component_type: ComponentType,
        component_count: u32,
        data: Vec<u8>,
    ) -> Self {
        Self {
            name: name.to_string(),
            component_type,
            component_count,
            data,
        }
    }

    /// The size in bytes of the data for a single vertex.
    pub fn row_size_in_bytes(&self) -> usize {
        self.component_count as usize * self.component_type.size_in_bytes()
    }

    /// The number of complete vertices.
    pub fn len(&self) -> usize {
        match self.row_size_in_bytes() {
            0 => 0,
            row_size => self.data.len() / row_size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decodes each vertex to a [Vec] of [f64] with one element per component.
    /**
    ```rust
    # use meshblob_data::mesh_builder::VertexColumn;
    let column = VertexColumn::new("Color0", &[[255u8, 0u8], [1u8, 2u8]]);
    assert_eq!(vec![vec![255.0, 0.0], vec![1.0, 2.0]], column.to_f64_vectors());
    ```
    */
    pub fn to_f64_vectors(&self) -> Vec<Vec<f64>> {
        let component_size = self.component_type.size_in_bytes();
        match self.row_size_in_bytes() {
            0 => Vec::new(),
            row_size => self
                .data
                .chunks_exact(row_size)
                .map(|row| {
                    row.chunks_exact(component_size)
                        .filter_map(|c| self.component_type.decode_f64(c))
                        .collect()
                })
                .collect(),
        }
    }
}

/// De-interleaves the data for the attribute `name` from the vertex buffer of `record`.
/// Returns `None` if there is no attribute with the given name.
pub fn read_vertex_column(
    record: &MeshRecord,
    name: &str,
) -> Result<Option<VertexColumn>, MeshError> {
    let attribute = match record.find_attribute(name)? {
        Some(attribute) => attribute,
        None => return Ok(None),
    };

    let stride = record.stride() as usize;
    let offset = attribute.first_item_byte_offset as usize;
    let row_size = attribute.size_in_bytes() as usize;
    let vertex_data = record.vertex_data()?;

    let mut data = Vec::with_capacity(record.vertex_count() * row_size);
    for i in 0..record.vertex_count() {
        let start = i * stride + offset;
        // Records validate that every attribute fits inside the stride.
        if let Some(row) = vertex_data.get(start..start + row_size) {
            data.extend_from_slice(row);
        }
    }

    Ok(Some(VertexColumn {
        name: attribute.name,
        component_type: attribute.component_type,
        component_count: attribute.component_count,
        data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use meshblob_lib::formats::mesh::{MeshRecordParts, VertexAttribute};
    use meshblob_lib::{DrawMode, Winding};

    #[test]
    fn column_f16() {
        let column = VertexColumn::new(
            "Uv0",
            &[[f16::from_f32(1.0), f16::from_f32(-2.0)]],
        );
        assert_eq!(ComponentType::F16, column.component_type);
        assert_eq!(vec![0x00, 0x3c, 0x00, 0xc0], column.data);
        assert_eq!(vec![vec![1.0, -2.0]], column.to_f64_vectors());
    }

    #[test]
    fn column_i16_len() {
        let column = VertexColumn::new("Bone", &[[-1i16], [2i16], [3i16]]);
        assert_eq!(3, column.len());
        assert_eq!(2, column.row_size_in_bytes());
        assert_eq!(
            vec![vec![-1.0], vec![2.0], vec![3.0]],
            column.to_f64_vectors()
        );
    }

    #[test]
    fn column_empty() {
        let column = VertexColumn::new::<f32, 3>("Position0", &[]);
        assert!(column.is_empty());
        assert!(column.to_f64_vectors().is_empty());
    }

    #[test]
    fn read_interleaved_column() {
        // 2 vertices with a u16 id at offset 0 and a u8 color at offset 2.
        let attributes = vec![
            VertexAttribute {
                name: "Id".to_string(),
                component_type: ComponentType::U16,
                component_count: 1,
                first_item_byte_offset: 0,
            },
            VertexAttribute {
                name: "Color".to_string(),
                component_type: ComponentType::U8,
                component_count: 2,
                first_item_byte_offset: 2,
            },
        ];
        let record = MeshRecord::from_parts(&MeshRecordParts {
            attributes: &attributes,
            stride: 4,
            vertex_data: &[1, 0, 10, 11, 2, 0, 20, 21],
            index_component_type: ComponentType::U16,
            index_data: &[],
            subsets: &[],
            joints: &[],
            draw_mode: DrawMode::Points,
            winding: Winding::CounterClockwise,
        })
        .unwrap();

        let color = read_vertex_column(&record, "Color").unwrap().unwrap();
        assert_eq!(vec![10, 11, 20, 21], color.data);
        assert_eq!(2, color.len());

        let id = read_vertex_column(&record, "Id").unwrap().unwrap();
        assert_eq!(vec![vec![1.0], vec![2.0]], id.to_f64_vectors());

        assert_eq!(None, read_vertex_column(&record, "Normal0").unwrap());
    }
}
