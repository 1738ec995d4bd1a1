use clap::Parser;
use log::{error, warn};
use meshblob_lib::formats::mesh::MeshRecord;
use meshblob_lib::formats::multi::{is_multi, read_multi_header};
use rayon::prelude::*;
use std::{io::Cursor, path::Path};

/// Test read/write for all mesh files recursively in a folder.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// The root folder containing the mesh files
    root_folder: String,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let folder = Path::new(&cli.root_folder);
    let start = std::time::Instant::now();

    match globwalk::GlobWalkerBuilder::from_patterns(folder, &["*.mesh"]).build() {
        Ok(walker) => walker
            .filter_map(|p| p.ok())
            .par_bridge()
            .for_each(|path| check_read_write(path.path())),
        Err(e) => error!("Failed to search {:?}: {}", folder, e),
    }

    println!("Finished in {:?}", start.elapsed());
}

fn check_read_write(path: &Path) {
    let before = match std::fs::read(path) {
        Ok(before) => before,
        Err(e) => {
            error!("Error reading {path:?}: {e}");
            return;
        }
    };

    let mut reader = Cursor::new(&before);
    if is_multi(&mut reader) {
        check_read_write_multi(path, &mut reader);
    } else {
        match MeshRecord::read(&mut reader) {
            Ok(mesh) => {
                // Check any supported file for 1:1 read/write.
                let mut writer = Cursor::new(Vec::new());
                if let Err(e) = mesh.write(&mut writer) {
                    error!("Error writing {path:?}: {e}");
                } else if before != writer.into_inner() {
                    println!("Read/write not 1:1 for {path:?}");
                }
            }
            Err(e) => {
                println!("Error reading {path:?}: {e}");
            }
        }
    }
}

fn check_read_write_multi(path: &Path, reader: &mut Cursor<&Vec<u8>>) {
    let info = match read_multi_header(reader) {
        Ok(info) => info,
        Err(e) => {
            println!("Error reading {path:?}: {e}");
            return;
        }
    };

    for entry in &info.entries {
        let start = entry.mesh_byte_offset as usize;
        match MeshRecord::read_multi(reader, entry.mesh_id) {
            Ok(mesh) => {
                // Each payload should be stored exactly like a single mesh file.
                let mut writer = Vec::new();
                if let Err(e) = mesh.write(&mut writer) {
                    error!("Error writing mesh {} in {path:?}: {e}", entry.mesh_id);
                    continue;
                }
                if reader.get_ref().get(start..start + writer.len()) != Some(&writer[..]) {
                    println!("Read/write not 1:1 for mesh {} in {path:?}", entry.mesh_id);
                }
            }
            Err(e) => {
                warn!("Error reading mesh {} in {path:?}: {e}", entry.mesh_id);
            }
        }
    }
}
