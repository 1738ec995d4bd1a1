use log::error;
use meshblob_lib::formats::mesh::{Joint, MeshRecord, MeshRecordHeader, SubsetInfo, VertexAttribute};
use meshblob_lib::formats::multi::{is_multi, read_multi_header};
use meshblob_lib::{ComponentType, DrawMode, MeshError, Winding};
use serde::Serialize;
use std::env;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Serialize)]
struct MeshSummary {
    header: MeshRecordHeader,
    size_in_bytes: usize,
    stride: u32,
    vertex_count: usize,
    attributes: Vec<VertexAttribute>,
    index_component_type: Option<ComponentType>,
    index_count: usize,
    subsets: Vec<SubsetInfo>,
    joints: Vec<Joint>,
    draw_mode: DrawMode,
    winding: Winding,
}

impl MeshSummary {
    fn new(mesh: &MeshRecord) -> Result<Self, MeshError> {
        Ok(Self {
            header: *mesh.header(),
            size_in_bytes: mesh.as_bytes().len(),
            stride: mesh.stride(),
            vertex_count: mesh.vertex_count(),
            attributes: mesh.attributes()?,
            index_component_type: mesh.index_component_type(),
            index_count: mesh.index_count(),
            subsets: mesh.subset_infos()?,
            joints: mesh.joints()?,
            draw_mode: mesh.draw_mode(),
            winding: mesh.winding(),
        })
    }
}

#[derive(Serialize)]
struct ContainerEntry {
    mesh_id: u32,
    mesh_byte_offset: u64,
    mesh: MeshSummary,
}

fn read_json(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    let mut reader = BufReader::new(File::open(path)?);

    if is_multi(&mut reader) {
        let info = read_multi_header(&mut reader)?;

        let mut entries = Vec::new();
        for entry in &info.entries {
            let mesh = MeshRecord::read_multi(&mut reader, entry.mesh_id)?;
            entries.push(ContainerEntry {
                mesh_id: entry.mesh_id,
                mesh_byte_offset: entry.mesh_byte_offset,
                mesh: MeshSummary::new(&mesh)?,
            });
        }
        Ok(serde_json::to_string_pretty(&entries)?)
    } else {
        let mesh = MeshRecord::read(&mut reader)?;
        Ok(serde_json::to_string_pretty(&MeshSummary::new(&mesh)?)?)
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage:");
        eprintln!("\tmeshblob_json <file>");
        eprintln!("\tmeshblob_json <file> <json output>");
        return;
    }

    let input = &args[1];
    let input_path = Path::new(input);
    // Modify the input if no output is specified to allow dragging a file onto the executable.
    let output_path = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(input.to_string() + ".json"));

    let parse_start_time = Instant::now();
    match read_json(input_path) {
        Ok(json) => {
            eprintln!("Parse: {:?}", parse_start_time.elapsed());

            let result = File::create(&output_path).and_then(|mut f| f.write_all(json.as_bytes()));
            if let Err(e) = result {
                error!("Failed to write {:?}: {}", output_path, e);
            }
        }
        Err(e) => error!("Failed to read {:?}: {}", input_path, e),
    }
}
