//! Types for creating a [MeshRecord] from vertex, index, subset, and joint data.
//!
//! A [MeshBuilder] accumulates data until [get_mesh](MeshBuilder::get_mesh) or [finalize](MeshBuilder::finalize)
//! lays out the relocatable record. The builder validates the data as it's added,
//! so most errors are reported by the method that introduced the invalid data.
//!
//! # Examples
//! Create an indexed quad with positions and normals.
/*!
```rust
use meshblob_data::mesh_builder::{MeshBuilder, VertexColumn};
use meshblob_lib::formats::mesh::SUBSET_ALL;

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let mut builder = MeshBuilder::new();
builder.set_vertex_buffer(&[
    VertexColumn::new(
        "Position0",
        &[
            [-1f32, -1f32, 0f32],
            [1f32, -1f32, 0f32],
            [1f32, 1f32, 0f32],
            [-1f32, 1f32, 0f32],
        ],
    ),
    VertexColumn::new("Normal0", &[[0f32, 0f32, 1f32]; 4]),
])?;
builder.set_index_buffer_u16(&[0, 1, 2, 2, 3, 0])?;
// Calculate the bounds from the attribute at index 0.
builder.add_mesh_subset("quad", SUBSET_ALL, 0, 0)?;

let mesh = builder.finalize()?;
assert_eq!(24, mesh.stride());
assert_eq!(4, mesh.vertex_count());
# Ok(())
# }
```
 */
use glam::Mat4;
use log::{debug, warn};
use meshblob_lib::formats::mesh::{
    read_indices, BoundingBox, Joint, MeshRecord, MeshRecordParts, SubsetInfo,
    VertexAttribute, SUBSET_ALL,
};
use meshblob_lib::{ComponentType, DrawMode, Matrix4x4, MeshError, Winding};
use thiserror::Error;

mod bounds;
mod connect;
mod optimize;
mod vertex_data;

pub use optimize::{average_cache_miss_ratio, optimize_triangle_order, OptimizeOptions};
pub use vertex_data::{read_vertex_column, Component, VertexColumn};

/// Errors while creating a [MeshRecord] with a [MeshBuilder].
#[derive(Error, Debug)]
pub enum MeshBuilderError {
    /// The mesh was requested before setting a vertex buffer.
    #[error("A vertex buffer must be set before creating the mesh.")]
    NoVertexBuffer,

    /// Index buffers only support [ComponentType::U8] and [ComponentType::U16].
    #[error("Index component type {0:?} is not supported. Expected U8 or U16.")]
    UnsupportedIndexWidth(ComponentType),

    /// The draw mode is not supported by the operation.
    /// Optimizing requires [DrawMode::Triangles].
    /// Connecting subsets requires [DrawMode::Triangles], [DrawMode::Lines], or [DrawMode::Points].
    #[error("Draw mode {0:?} is not supported by this operation.")]
    InvalidDrawMode(DrawMode),

    /// Vertex attributes must have between 1 and 4 components.
    #[error(
        "Attribute {} has {} components, but attributes must have 1 to 4 components.",
        name,
        component_count
    )]
    InvalidComponentCount { name: String, component_count: u32 },

    /// All vertex columns must have the same number of vertices.
    #[error(
        "Attribute {} has {} vertices, but the vertex buffer has {} vertices.",
        name,
        count,
        expected
    )]
    VertexCountMismatch {
        name: String,
        count: usize,
        expected: usize,
    },

    /// The attribute's data for a single vertex extends past the vertex stride.
    #[error(
        "Attribute {} ends at byte {}, which exceeds the vertex stride of {} bytes.",
        name,
        end,
        stride
    )]
    AttributeOutsideStride { name: String, end: u64, stride: u32 },

    /// The combined size of the attributes does not fit in a [u32] stride.
    #[error("Vertex stride of {} bytes exceeds the maximum of {} bytes.", stride, u32::MAX)]
    StrideTooLarge { stride: u64 },

    /// The vertex data size is not a multiple of the stride.
    #[error(
        "Vertex data with {} bytes is not a multiple of the stride {}.",
        size,
        stride
    )]
    MisalignedVertexData { size: usize, stride: u32 },

    /// The index data size is not a multiple of the index size.
    #[error(
        "Index data with {} bytes is not a multiple of the index size {}.",
        size,
        index_size
    )]
    MisalignedIndexData { size: usize, index_size: usize },

    /// The attribute index used for calculating bounds does not exist.
    #[error(
        "Attribute index {} is out of range for {} attributes.",
        index,
        count
    )]
    AttributeIndexOutOfRange { index: u32, count: usize },

    /// Bounds can only be calculated from attributes with 3 [ComponentType::F32] components.
    #[error(
        "Position attributes must have 3 F32 components but found {} {:?} components.",
        component_count,
        component_type
    )]
    InvalidPositionAttribute {
        component_type: ComponentType,
        component_count: u32,
    },

    /// An index refers to a vertex past the end of the vertex buffer.
    #[error(
        "Vertex index {} is out of range for a vertex count of {}.",
        index,
        vertex_count
    )]
    IndexOutOfRange { index: u32, vertex_count: usize },

    /// An error occurred while creating or reading the record.
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// The lifecycle of a [MeshBuilder].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    /// No data has been added since creation or the last [reset](MeshBuilder::reset).
    Empty,
    /// Data was added or modified since the last created mesh.
    Building,
    /// The cached mesh is up to date with the builder's data.
    Finalized,
}

/// Accumulates mesh data and creates a validated [MeshRecord].
/// Any method that modifies the data moves the builder to [BuilderState::Building]
/// and invalidates the mesh returned by [get_mesh](#method.get_mesh).
#[derive(Debug, Clone)]
pub struct MeshBuilder {
    attributes: Vec<VertexAttribute>,
    stride: u32,
    vertex_data: Vec<u8>,
    has_vertex_buffer: bool,
    index_component_type: ComponentType,
    index_data: Vec<u8>,
    subsets: Vec<SubsetInfo>,
    joints: Vec<Joint>,
    draw_mode: DrawMode,
    winding: Winding,
    mesh: Option<MeshRecord>,
    state: BuilderState,
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshBuilder {
    /// Creates an empty builder with [DrawMode::Triangles] and [Winding::CounterClockwise].
    pub fn new() -> Self {
        Self {
            attributes: Vec::new(),
            stride: 0,
            vertex_data: Vec::new(),
            has_vertex_buffer: false,
            index_component_type: ComponentType::U16,
            index_data: Vec::new(),
            subsets: Vec::new(),
            joints: Vec::new(),
            draw_mode: DrawMode::default(),
            winding: Winding::default(),
            mesh: None,
            state: BuilderState::Empty,
        }
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// Removes all data and returns to [BuilderState::Empty].
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn modified(&mut self) {
        self.mesh = None;
        self.state = BuilderState::Building;
    }

    fn vertex_count(&self) -> usize {
        match self.stride {
            0 => 0,
            stride => self.vertex_data.len() / stride as usize,
        }
    }

    fn index_type(&self) -> Option<ComponentType> {
        if self.index_data.is_empty() {
            None
        } else {
            Some(self.index_component_type)
        }
    }

    /// Interleaves the data in `columns` to create the vertex buffer.
    /// The attributes are stored in the order of `columns` with no padding between attributes.
    pub fn set_vertex_buffer(&mut self, columns: &[VertexColumn]) -> Result<(), MeshBuilderError> {
        let expected = columns.first().map(|c| c.len()).unwrap_or(0);

        for column in columns {
            check_component_count(&column.name, column.component_count)?;

            let row_size = column.row_size_in_bytes();
            if column.len() != expected || column.data.len() % row_size != 0 {
                return Err(MeshBuilderError::VertexCountMismatch {
                    name: column.name.clone(),
                    count: column.len(),
                    expected,
                });
            }
        }

        let row_sizes: Vec<_> = columns.iter().map(|c| c.row_size_in_bytes() as u64).collect();
        let (offsets, stride) = packed_offsets(&row_sizes)?;

        let attributes = columns
            .iter()
            .zip(offsets)
            .map(|(column, offset)| VertexAttribute {
                name: column.name.clone(),
                component_type: column.component_type,
                component_count: column.component_count,
                first_item_byte_offset: offset,
            })
            .collect();

        let mut vertex_data = Vec::with_capacity(stride as usize * expected);
        for i in 0..expected {
            for column in columns {
                let row_size = column.row_size_in_bytes();
                vertex_data.extend_from_slice(&column.data[i * row_size..(i + 1) * row_size]);
            }
        }

        self.attributes = attributes;
        self.stride = stride;
        self.vertex_data = vertex_data;
        self.has_vertex_buffer = true;
        self.modified();
        Ok(())
    }

    /// Sets vertex data that is already interleaved with the given `stride`.
    pub fn set_vertex_buffer_interleaved(
        &mut self,
        attributes: &[VertexAttribute],
        stride: u32,
        vertex_data: &[u8],
    ) -> Result<(), MeshBuilderError> {
        for attribute in attributes {
            check_component_count(&attribute.name, attribute.component_count)?;

            let end = attribute.first_item_byte_offset as u64 + attribute.size_in_bytes();
            if end > stride as u64 {
                return Err(MeshBuilderError::AttributeOutsideStride {
                    name: attribute.name.clone(),
                    end,
                    stride,
                });
            }
        }

        let misaligned = match stride {
            0 => !vertex_data.is_empty(),
            stride => vertex_data.len() % stride as usize != 0,
        };
        if misaligned {
            return Err(MeshBuilderError::MisalignedVertexData {
                size: vertex_data.len(),
                stride,
            });
        }

        self.attributes = attributes.to_vec();
        self.stride = stride;
        self.vertex_data = vertex_data.to_vec();
        self.has_vertex_buffer = true;
        self.modified();
        Ok(())
    }

    /// Sets little-endian index data with the given `component_type`.
    /// Empty `index_data` creates a non-indexed mesh.
    pub fn set_index_buffer(
        &mut self,
        index_data: &[u8],
        component_type: ComponentType,
    ) -> Result<(), MeshBuilderError> {
        if !component_type.is_index_type() {
            return Err(MeshBuilderError::UnsupportedIndexWidth(component_type));
        }

        let index_size = component_type.size_in_bytes();
        if index_data.len() % index_size != 0 {
            return Err(MeshBuilderError::MisalignedIndexData {
                size: index_data.len(),
                index_size,
            });
        }

        self.index_component_type = component_type;
        self.index_data = index_data.to_vec();
        self.modified();
        Ok(())
    }

    /// Sets [ComponentType::U16] index data.
    pub fn set_index_buffer_u16(&mut self, indices: &[u16]) -> Result<(), MeshBuilderError> {
        let bytes: Vec<_> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
        self.set_index_buffer(&bytes, ComponentType::U16)
    }

    pub fn set_draw_mode(&mut self, draw_mode: DrawMode) {
        self.draw_mode = draw_mode;
        self.modified();
    }

    pub fn set_winding(&mut self, winding: Winding) {
        self.winding = winding;
        self.modified();
    }

    /// Adds a joint with column-major transforms.
    /// Use a `parent_id` of -1 for root joints.
    pub fn add_joint(
        &mut self,
        id: i32,
        parent_id: i32,
        inverse_bind_pose: Mat4,
        local_to_global_bone_space: Mat4,
    ) {
        self.joints.push(Joint {
            id,
            parent_id,
            inverse_bind_pose: Matrix4x4::from_cols_array_2d(
                &inverse_bind_pose.to_cols_array_2d(),
            ),
            local_to_global_bone_space: Matrix4x4::from_cols_array_2d(
                &local_to_global_bone_space.to_cols_array_2d(),
            ),
        });
        self.modified();
    }

    /// Adds a subset starting at `offset` with `count` elements or [SUBSET_ALL] for all remaining elements.
    /// The elements are indices for indexed meshes and vertices for non-indexed meshes.
    ///
    /// The bounds are calculated from the positions stored in the attribute at `bounds_attribute_index`.
    /// Use an index of [SUBSET_ALL] to skip the calculation and store empty bounds.
    pub fn add_mesh_subset(
        &mut self,
        name: &str,
        count: u32,
        offset: u32,
        bounds_attribute_index: u32,
    ) -> Result<(), MeshBuilderError> {
        let bounds = if bounds_attribute_index == SUBSET_ALL {
            BoundingBox::empty()
        } else {
            let position = self
                .attributes
                .get(bounds_attribute_index as usize)
                .ok_or(MeshBuilderError::AttributeIndexOutOfRange {
                    index: bounds_attribute_index,
                    count: self.attributes.len(),
                })?;

            Self::calculate_subset_bounds(
                position,
                &self.vertex_data,
                self.stride,
                &self.index_data,
                self.index_type(),
                count,
                offset,
            )?
        };

        self.add_mesh_subset_with_bounds(name, count, offset, bounds);
        Ok(())
    }

    /// Adds a subset with precalculated `bounds`.
    pub fn add_mesh_subset_with_bounds(
        &mut self,
        name: &str,
        count: u32,
        offset: u32,
        bounds: BoundingBox,
    ) {
        self.subsets.push(SubsetInfo {
            name: name.to_string(),
            count,
            offset,
            bounds,
        });
        self.modified();
    }

    /// Calculates the bounds of the positions used by the subset with the given `count` and `offset`.
    /// Returns [BoundingBox::empty] if the subset contains no elements.
    ///
    /// Ranges are clamped to the available data, and indices past the vertex count are skipped.
    pub fn calculate_subset_bounds(
        position: &VertexAttribute,
        vertex_data: &[u8],
        stride: u32,
        index_data: &[u8],
        index_component_type: Option<ComponentType>,
        count: u32,
        offset: u32,
    ) -> Result<BoundingBox, MeshBuilderError> {
        bounds::subset_bounds(
            position,
            vertex_data,
            stride,
            index_data,
            index_component_type,
            count,
            offset,
        )
    }

    /// Optimizes the index order for vertex cache reuse using the default [OptimizeOptions].
    pub fn optimize_mesh(&mut self) -> Result<(), MeshBuilderError> {
        self.optimize_mesh_with(OptimizeOptions::default())
    }

    /// Reorders the triangles within each subset to improve vertex cache reuse.
    /// The set of triangles and the vertex order of each triangle are preserved.
    /// Subsets with overlapping index ranges are skipped.
    /// Non-indexed meshes are left unchanged.
    pub fn optimize_mesh_with(&mut self, options: OptimizeOptions) -> Result<(), MeshBuilderError> {
        if self.draw_mode != DrawMode::Triangles {
            return Err(MeshBuilderError::InvalidDrawMode(self.draw_mode));
        }

        let component_type = match self.index_type() {
            Some(component_type) => component_type,
            None => return Ok(()),
        };

        let mut indices = read_indices(&self.index_data, component_type)?;
        let vertex_count = self.vertex_count();
        if let Some(index) = indices.iter().find(|i| **i as usize >= vertex_count) {
            return Err(MeshBuilderError::IndexOutOfRange {
                index: *index,
                vertex_count,
            });
        }

        let before = average_cache_miss_ratio(&indices, options.cache_size);
        for range in optimize::subset_index_ranges(&self.subsets, indices.len()) {
            let optimized = optimize_triangle_order(&indices[range.clone()], options.cache_size);
            indices[range].copy_from_slice(&optimized);
        }
        let after = average_cache_miss_ratio(&indices, options.cache_size);
        debug!(
            "Optimized {} indices with ACMR {} -> {}",
            indices.len(),
            before,
            after
        );

        if options.reorder_vertices {
            let old_indices = optimize::first_use_order(&mut indices, vertex_count);
            let stride = self.stride as usize;

            let mut vertex_data = Vec::with_capacity(self.vertex_data.len());
            for old in old_indices {
                vertex_data.extend_from_slice(&self.vertex_data[old * stride..(old + 1) * stride]);
            }
            self.vertex_data = vertex_data;
        }

        self.index_data = write_indices(&indices, component_type);
        self.modified();
        Ok(())
    }

    /// Merges subsets with the same name into a single subset with a contiguous index range.
    /// Merged subsets are ordered by the first occurrence of each name, and their bounds are combined.
    /// Indices not used by any subset are removed.
    /// Non-indexed meshes are left unchanged.
    ///
    /// Strips, fans, and loops depend on the order of neighboring indices,
    /// so only [DrawMode::Triangles], [DrawMode::Lines], and [DrawMode::Points] can be connected.
    pub fn connect_sub_meshes(&mut self) -> Result<(), MeshBuilderError> {
        if !matches!(
            self.draw_mode,
            DrawMode::Triangles | DrawMode::Lines | DrawMode::Points
        ) {
            return Err(MeshBuilderError::InvalidDrawMode(self.draw_mode));
        }

        let component_type = match self.index_type() {
            Some(component_type) => component_type,
            None => {
                if connect::has_duplicate_names(&self.subsets) {
                    warn!("Subsets of non-indexed meshes cannot be connected.");
                }
                return Ok(());
            }
        };

        let indices = read_indices(&self.index_data, component_type)?;
        if let Some((subsets, indices)) = connect::connect_subsets(&self.subsets, &indices) {
            self.subsets = subsets;
            self.index_data = write_indices(&indices, component_type);
            self.modified();
        }
        Ok(())
    }

    /// Creates the mesh or returns the cached mesh if no data changed since the last call.
    pub fn get_mesh(&mut self) -> Result<&MeshRecord, MeshBuilderError> {
        let mesh = match self.mesh.take() {
            Some(mesh) => mesh,
            None => self.create_mesh()?,
        };
        self.state = BuilderState::Finalized;
        Ok(self.mesh.insert(mesh))
    }

    /// Creates the mesh and consumes the builder.
    pub fn finalize(mut self) -> Result<MeshRecord, MeshBuilderError> {
        match self.mesh.take() {
            Some(mesh) => Ok(mesh),
            None => self.create_mesh(),
        }
    }

    fn create_mesh(&self) -> Result<MeshRecord, MeshBuilderError> {
        if !self.has_vertex_buffer {
            return Err(MeshBuilderError::NoVertexBuffer);
        }

        let mesh = MeshRecord::from_parts(&MeshRecordParts {
            attributes: &self.attributes,
            stride: self.stride,
            vertex_data: &self.vertex_data,
            index_component_type: self.index_component_type,
            index_data: &self.index_data,
            subsets: &self.subsets,
            joints: &self.joints,
            draw_mode: self.draw_mode,
            winding: self.winding,
        })?;
        Ok(mesh)
    }
}

fn check_component_count(name: &str, component_count: u32) -> Result<(), MeshBuilderError> {
    if (1..=4).contains(&component_count) {
        Ok(())
    } else {
        Err(MeshBuilderError::InvalidComponentCount {
            name: name.to_string(),
            component_count,
        })
    }
}

// The offset of each attribute and the total stride with no padding between attributes.
fn packed_offsets(row_sizes: &[u64]) -> Result<(Vec<u32>, u32), MeshBuilderError> {
    let to_u32 = |stride: u64| u32::try_from(stride).map_err(|_| MeshBuilderError::StrideTooLarge { stride });

    let mut offsets = Vec::with_capacity(row_sizes.len());
    let mut stride = 0u64;
    for row_size in row_sizes {
        offsets.push(to_u32(stride)?);
        stride = stride.saturating_add(*row_size);
    }
    Ok((offsets, to_u32(stride)?))
}

// Indices are only read from U8 or U16 data, and remapping never increases the vertex count.
fn write_indices(indices: &[u32], component_type: ComponentType) -> Vec<u8> {
    match component_type {
        ComponentType::U8 => indices.iter().map(|i| *i as u8).collect(),
        _ => indices
            .iter()
            .flat_map(|i| (*i as u16).to_le_bytes())
            .collect(),
    }
}
