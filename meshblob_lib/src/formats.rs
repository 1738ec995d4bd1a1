//! The binary formats built on the relocatable blob layout.
//! [mesh] defines the [MeshRecord](mesh::MeshRecord) and its fixed-size records.
//! [multi] defines the append only container for storing multiple records in a single file.
pub mod mesh;
pub mod multi;
