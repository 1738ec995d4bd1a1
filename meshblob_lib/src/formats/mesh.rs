//! The [MeshRecord] stores the vertex, index, subset, and joint data for a single mesh in one contiguous buffer.
//! The buffer starts with a [MeshRecordHeader], and every variable length field is an [OffsetRef] relative to the start of the buffer.
//!
//! Vertex attributes are interleaved into a single vertex buffer described by [VertexBufferDescriptor].
//! Each [Subset] selects a range of the index buffer (or the vertex buffer for non-indexed meshes)
//! that is drawn with a single material.
use std::ops::Range;

use binrw::io::Cursor;
use binrw::{BinRead, BinReaderExt};
use meshblob_write::MeshWrite;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    BlobArena, BlobElement, ComponentType, DrawMode, Matrix4x4, MeshError, OffsetRef, Vector3,
    Winding,
};

/// The [Subset::count] value for drawing all the remaining indices or vertices after [Subset::offset].
pub const SUBSET_ALL: u32 = u32::MAX;

/// An axis-aligned bounding box.
/// Empty boxes are stored with `min` set to [f32::MAX] and `max` set to `-`[f32::MAX]
/// so that including any point produces a valid box.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(BinRead, MeshWrite, Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vector3,
    pub max: Vector3,
}

impl BoundingBox {
    /**
    ```rust
    # use meshblob_lib::formats::mesh::BoundingBox;
    let mut bounds = BoundingBox::empty();
    assert!(bounds.is_empty());

    bounds.include([1.0, -2.0, 0.5]);
    bounds.include([-1.0, 2.0, 0.5]);
    assert_eq!([-1.0, -2.0, 0.5], bounds.min.to_array());
    assert_eq!([1.0, 2.0, 0.5], bounds.max.to_array());
    ```
    */
    pub fn empty() -> Self {
        Self {
            min: Vector3::new(f32::MAX, f32::MAX, f32::MAX),
            max: Vector3::new(-f32::MAX, -f32::MAX, -f32::MAX),
        }
    }

    pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    /// Returns `true` if the box contains no points.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expands the box to contain `point`.
    pub fn include(&mut self, point: [f32; 3]) {
        self.min = Vector3::new(
            self.min.x.min(point[0]),
            self.min.y.min(point[1]),
            self.min.z.min(point[2]),
        );
        self.max = Vector3::new(
            self.max.x.max(point[0]),
            self.max.y.max(point[1]),
            self.max.z.max(point[2]),
        );
    }

    /// The smallest box containing both `self` and `other`.
    /// The union with an empty box is the other box.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }

        let mut bounds = *self;
        bounds.include(other.min.to_array());
        bounds.include(other.max.to_array());
        bounds
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

/// The interleaved vertex data and the attributes describing its layout.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(BinRead, MeshWrite, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexBufferDescriptor {
    pub entries: OffsetRef<VertexBufferEntry>,
    /// The offset in bytes between the start of consecutive vertices.
    pub stride: u32,
    pub data: OffsetRef<u8>,
}

/// A single vertex attribute such as positions or texture coordinates.
/// The attribute for vertex `i` starts at `i * stride + first_item_byte_offset` in the vertex data.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(BinRead, MeshWrite, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferEntry {
    /// The UTF-8 name of the attribute without a null terminator.
    pub name: OffsetRef<u8>,
    pub component_type: ComponentType,
    /// The number of components from 1 to 4.
    pub component_count: u32,
    pub first_item_byte_offset: u32,
}

impl BlobElement for VertexBufferEntry {
    const SIZE_IN_BYTES: u64 = 20;
}

/// The index data for indexed meshes.
/// Empty [data](#structfield.data) indicates a non-indexed mesh.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(BinRead, MeshWrite, Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBufferDescriptor {
    /// Only [ComponentType::U8] and [ComponentType::U16] are supported.
    pub component_type: ComponentType,
    pub data: OffsetRef<u8>,
}

impl Default for IndexBufferDescriptor {
    fn default() -> Self {
        Self {
            component_type: ComponentType::U16,
            data: OffsetRef::null(),
        }
    }
}

/// A drawable range of a mesh that shares the mesh's vertex and index storage.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(BinRead, MeshWrite, Debug, Clone, Copy, PartialEq)]
pub struct Subset {
    /// The number of indices or vertices to draw or [SUBSET_ALL] for all remaining elements.
    pub count: u32,
    /// The first index for indexed meshes or the first vertex for non-indexed meshes.
    pub offset: u32,
    pub bounds: BoundingBox,
    /// The UTF-16 name without a null terminator.
    /// Subsets with the same name use the same material.
    pub name: OffsetRef<u16>,
}

impl BlobElement for Subset {
    const SIZE_IN_BYTES: u64 = 40;
}

/// A skinning joint with column-major transforms.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(BinRead, MeshWrite, Debug, Clone, Copy, PartialEq)]
pub struct Joint {
    pub id: i32,
    /// The [id](#structfield.id) of the parent joint or -1 for root joints.
    pub parent_id: i32,
    pub inverse_bind_pose: Matrix4x4,
    pub local_to_global_bone_space: Matrix4x4,
}

impl BlobElement for Joint {
    const SIZE_IN_BYTES: u64 = 136;
}

/// The header stored at offset 0 of every [MeshRecord].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(BinRead, MeshWrite, Debug, Clone, Copy, PartialEq)]
pub struct MeshRecordHeader {
    pub vertex_buffer: VertexBufferDescriptor,
    pub index_buffer: IndexBufferDescriptor,
    pub subsets: OffsetRef<Subset>,
    pub joints: OffsetRef<Joint>,
    pub draw_mode: DrawMode,
    pub winding: Winding,
}

impl MeshRecordHeader {
    pub const SIZE_IN_BYTES: u64 = 56;
}

/// A decoded [VertexBufferEntry] with an owned name.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub name: String,
    pub component_type: ComponentType,
    pub component_count: u32,
    pub first_item_byte_offset: u32,
}

impl VertexAttribute {
    /// The size in bytes of the attribute's data for a single vertex.
    pub fn size_in_bytes(&self) -> u64 {
        self.component_count as u64 * self.component_type.size_in_bytes() as u64
    }
}

/// A decoded [Subset] with an owned name.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetInfo {
    pub name: String,
    pub count: u32,
    pub offset: u32,
    pub bounds: BoundingBox,
}

/// The data used to lay out a new [MeshRecord] with [MeshRecord::from_parts].
#[derive(Debug, Clone, Copy)]
pub struct MeshRecordParts<'a> {
    pub attributes: &'a [VertexAttribute],
    pub stride: u32,
    pub vertex_data: &'a [u8],
    /// Ignored if [index_data](#structfield.index_data) is empty.
    pub index_component_type: ComponentType,
    pub index_data: &'a [u8],
    pub subsets: &'a [SubsetInfo],
    pub joints: &'a [Joint],
    pub draw_mode: DrawMode,
    pub winding: Winding,
}

/// The element range selected by a subset's `count` and `offset` clamped to `element_count`.
/**
```rust
# use meshblob_lib::formats::mesh::{subset_range, SUBSET_ALL};
assert_eq!(2..5, subset_range(3, 2, 10));
assert_eq!(2..10, subset_range(SUBSET_ALL, 2, 10));
assert_eq!(8..10, subset_range(5, 8, 10));
assert_eq!(10..10, subset_range(5, 12, 10));
```
*/
pub fn subset_range(count: u32, offset: u32, element_count: usize) -> Range<usize> {
    let start = (offset as usize).min(element_count);
    let end = if count == SUBSET_ALL {
        element_count
    } else {
        start.saturating_add(count as usize).min(element_count)
    };
    start..end
}

/// Decodes little-endian `data` with the given index `component_type`.
/// Only [ComponentType::U8] and [ComponentType::U16] are supported.
/// Trailing bytes that don't form a complete index are ignored.
pub fn read_indices(data: &[u8], component_type: ComponentType) -> Result<Vec<u32>, MeshError> {
    match component_type {
        ComponentType::U8 => Ok(data.iter().map(|i| *i as u32).collect()),
        ComponentType::U16 => Ok(data
            .chunks_exact(2)
            .map(|i| u16::from_le_bytes([i[0], i[1]]) as u32)
            .collect()),
        _ => Err(MeshError::UnsupportedIndexWidth(component_type)),
    }
}

/// A single mesh stored as one contiguous relocatable buffer.
/// Records are immutable once created and only compare equal if their bytes are equal.
/// All accessors resolve [OffsetRef] values against the record's own buffer.
#[derive(Debug, Clone)]
pub struct MeshRecord {
    header: MeshRecordHeader,
    bytes: Vec<u8>,
}

impl PartialEq for MeshRecord {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for MeshRecord {}

impl MeshRecord {
    /// Validates `bytes` and creates a record that owns the buffer.
    ///
    /// Every [OffsetRef] in the header, vertex entries, and subsets must resolve inside `bytes`,
    /// and every vertex entry must fit inside the vertex stride.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, MeshError> {
        if bytes.len() as u64 > u32::MAX as u64 {
            return Err(MeshError::RecordTooLarge(bytes.len() as u64));
        }
        if (bytes.len() as u64) < MeshRecordHeader::SIZE_IN_BYTES {
            return Err(MeshError::OutOfRange {
                offset: 0,
                size: MeshRecordHeader::SIZE_IN_BYTES,
                buffer_size: bytes.len() as u64,
            });
        }

        let header = Cursor::new(&bytes).read_le::<MeshRecordHeader>()?;
        validate(&header, &bytes)?;

        Ok(Self { header, bytes })
    }

    /// Lays out a new record from `parts` and validates the result.
    /**
    ```rust
    use meshblob_lib::formats::mesh::{MeshRecord, MeshRecordParts, VertexAttribute};
    use meshblob_lib::{ComponentType, DrawMode, Winding};

    let attributes = vec![VertexAttribute {
        name: "Position0".to_string(),
        component_type: ComponentType::F32,
        component_count: 3,
        first_item_byte_offset: 0,
    }];
    let vertex_data = vec![0u8; 36];

    let mesh = MeshRecord::from_parts(&MeshRecordParts {
        attributes: &attributes,
        stride: 12,
        vertex_data: &vertex_data,
        index_component_type: ComponentType::U16,
        index_data: &[0, 0, 1, 0, 2, 0],
        subsets: &[],
        joints: &[],
        draw_mode: DrawMode::Triangles,
        winding: Winding::CounterClockwise,
    })
    .unwrap();

    assert_eq!(3, mesh.vertex_count());
    assert_eq!(vec![0, 1, 2], mesh.indices().unwrap());
    ```
    */
    pub fn from_parts(parts: &MeshRecordParts) -> Result<Self, MeshError> {
        let mut arena = BlobArena::new(MeshRecordHeader::SIZE_IN_BYTES as usize);

        let mut entries = Vec::with_capacity(parts.attributes.len());
        for attribute in parts.attributes {
            entries.push(VertexBufferEntry {
                name: arena.push_str(&attribute.name)?,
                component_type: attribute.component_type,
                component_count: attribute.component_count,
                first_item_byte_offset: attribute.first_item_byte_offset,
            });
        }
        let entries = arena.push_elements(&entries)?;
        let vertex_data = arena.push_bytes(parts.vertex_data)?;
        let index_data = arena.push_bytes(parts.index_data)?;

        let mut subsets = Vec::with_capacity(parts.subsets.len());
        for subset in parts.subsets {
            subsets.push(Subset {
                count: subset.count,
                offset: subset.offset,
                bounds: subset.bounds,
                name: arena.push_utf16(&subset.name)?,
            });
        }
        let subsets = arena.push_elements(&subsets)?;
        let joints = arena.push_elements(parts.joints)?;

        let header = MeshRecordHeader {
            vertex_buffer: VertexBufferDescriptor {
                entries,
                stride: parts.stride,
                data: vertex_data,
            },
            index_buffer: IndexBufferDescriptor {
                component_type: parts.index_component_type,
                data: index_data,
            },
            subsets,
            joints,
            draw_mode: parts.draw_mode,
            winding: parts.winding,
        };
        arena.write_at(0, &header)?;

        Self::from_bytes(arena.into_bytes()?)
    }

    pub fn header(&self) -> &MeshRecordHeader {
        &self.header
    }

    /// The entire record including the header.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Resolves `offset_ref` against the start of the record.
    pub fn resolve<T: BlobElement>(&self, offset_ref: OffsetRef<T>) -> Result<&[u8], MeshError> {
        offset_ref.resolve(&self.bytes)
    }

    pub fn vertex_entries(&self) -> Result<Vec<VertexBufferEntry>, MeshError> {
        self.header.vertex_buffer.entries.read_elements(&self.bytes)
    }

    /// The name of `entry` with any invalid UTF-8 replaced.
    pub fn entry_name(&self, entry: &VertexBufferEntry) -> Result<String, MeshError> {
        let bytes = entry.name.resolve(&self.bytes)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn attributes(&self) -> Result<Vec<VertexAttribute>, MeshError> {
        self.vertex_entries()?
            .iter()
            .map(|entry| {
                Ok(VertexAttribute {
                    name: self.entry_name(entry)?,
                    component_type: entry.component_type,
                    component_count: entry.component_count,
                    first_item_byte_offset: entry.first_item_byte_offset,
                })
            })
            .collect()
    }

    /// Finds the first attribute with the given `name`.
    pub fn find_attribute(&self, name: &str) -> Result<Option<VertexAttribute>, MeshError> {
        Ok(self.attributes()?.into_iter().find(|a| a.name == name))
    }

    pub fn stride(&self) -> u32 {
        self.header.vertex_buffer.stride
    }

    /// The interleaved data for all vertex attributes.
    pub fn vertex_data(&self) -> Result<&[u8], MeshError> {
        self.header.vertex_buffer.data.resolve(&self.bytes)
    }

    /// The number of complete vertices in the vertex data.
    pub fn vertex_count(&self) -> usize {
        match self.stride() {
            0 => 0,
            stride => (self.header.vertex_buffer.data.count / stride) as usize,
        }
    }

    /// The index type or `None` for non-indexed meshes.
    pub fn index_component_type(&self) -> Option<ComponentType> {
        if self.header.index_buffer.data.is_empty() {
            None
        } else {
            Some(self.header.index_buffer.component_type)
        }
    }

    pub fn index_data(&self) -> Result<&[u8], MeshError> {
        self.header.index_buffer.data.resolve(&self.bytes)
    }

    pub fn index_count(&self) -> usize {
        match self.index_component_type() {
            Some(component_type) => {
                self.header.index_buffer.data.count as usize / component_type.size_in_bytes()
            }
            None => 0,
        }
    }

    /// The decoded indices or an empty list for non-indexed meshes.
    pub fn indices(&self) -> Result<Vec<u32>, MeshError> {
        match self.index_component_type() {
            Some(component_type) => read_indices(self.index_data()?, component_type),
            None => Ok(Vec::new()),
        }
    }

    pub fn subsets(&self) -> Result<Vec<Subset>, MeshError> {
        self.header.subsets.read_elements(&self.bytes)
    }

    /// The name of `subset` with any invalid UTF-16 replaced.
    pub fn subset_name(&self, subset: &Subset) -> Result<String, MeshError> {
        let code_units = subset.name.read_elements(&self.bytes)?;
        Ok(String::from_utf16_lossy(&code_units))
    }

    pub fn subset_infos(&self) -> Result<Vec<SubsetInfo>, MeshError> {
        self.subsets()?
            .iter()
            .map(|subset| {
                Ok(SubsetInfo {
                    name: self.subset_name(subset)?,
                    count: subset.count,
                    offset: subset.offset,
                    bounds: subset.bounds,
                })
            })
            .collect()
    }

    pub fn joints(&self) -> Result<Vec<Joint>, MeshError> {
        self.header.joints.read_elements(&self.bytes)
    }

    pub fn draw_mode(&self) -> DrawMode {
        self.header.draw_mode
    }

    pub fn winding(&self) -> Winding {
        self.header.winding
    }
}

fn validate(header: &MeshRecordHeader, bytes: &[u8]) -> Result<(), MeshError> {
    let stride = header.vertex_buffer.stride as u64;
    for entry in header.vertex_buffer.entries.read_elements(bytes)? {
        entry.name.resolve(bytes)?;

        if !(1..=4).contains(&entry.component_count) {
            return Err(MeshError::InvalidComponentCount(entry.component_count));
        }

        // Projecting the entry with the stride must stay inside each vertex.
        let size = entry.component_count as u64 * entry.component_type.size_in_bytes() as u64;
        if entry.first_item_byte_offset as u64 + size > stride {
            return Err(MeshError::OutOfRange {
                offset: entry.first_item_byte_offset as u64,
                size,
                buffer_size: stride,
            });
        }
    }
    header.vertex_buffer.data.resolve(bytes)?;

    let index_buffer = &header.index_buffer;
    index_buffer.data.resolve(bytes)?;
    if !index_buffer.data.is_empty() && !index_buffer.component_type.is_index_type() {
        return Err(MeshError::UnsupportedIndexWidth(
            index_buffer.component_type,
        ));
    }

    for subset in header.subsets.read_elements(bytes)? {
        subset.name.resolve(bytes)?;
    }
    header.joints.resolve(bytes)?;

    Ok(())
}
