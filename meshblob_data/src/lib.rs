//! # meshblob_data
//!
//! meshblob_data provides a higher level API for creating and decoding mesh blobs built on meshblob_lib.
//!
//! ## Features
//! - Interleaving of per attribute vertex data into a single vertex buffer
//! - Automatic layout of names, buffers, subsets, and joints into a relocatable record
//! - Bounding box calculation for subsets
//! - Vertex cache optimization of index buffers
//! - Merging of subsets that share a material
//! - Errors for invalid data such as mismatched vertex counts or out of bounds vertex indices
//!
//! ## Getting Started
//! The easiest way to access important items like [MeshBuilder](crate::mesh_builder::MeshBuilder) is to import the [prelude].
/*!
```no_run
use meshblob_data::prelude::*;

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let mesh = MeshRecord::from_file("model.mesh")?;
let positions = read_vertex_column(&mesh, "Position0")?;

let mut builder = MeshBuilder::new();
builder.set_vertex_buffer(&positions.into_iter().collect::<Vec<_>>())?;
builder.set_index_buffer_u16(&[0, 1, 2])?;
builder.optimize_mesh()?;
builder.finalize()?.write_to_file("model_new.mesh")?;
# Ok(())
# }
```
 */
pub mod mesh_builder;

pub use mesh_builder::MeshBuilderError;

/// Common imports for top level types and important functions.
pub mod prelude {
    pub use crate::mesh_builder::{
        read_vertex_column, MeshBuilder, MeshBuilderError, OptimizeOptions, VertexColumn,
    };
    pub use meshblob_lib::formats::mesh::{MeshRecord, SUBSET_ALL};
}
