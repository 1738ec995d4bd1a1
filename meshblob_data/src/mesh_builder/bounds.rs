use glam::Vec3;
use log::warn;
use meshblob_lib::formats::mesh::{
    read_indices, subset_range, BoundingBox, VertexAttribute, SUBSET_ALL,
};
use meshblob_lib::ComponentType;

use super::MeshBuilderError;

pub(crate) fn subset_bounds(
    position: &VertexAttribute,
    vertex_data: &[u8],
    stride: u32,
    index_data: &[u8],
    index_component_type: Option<ComponentType>,
    count: u32,
    offset: u32,
) -> Result<BoundingBox, MeshBuilderError> {
    if position.component_type != ComponentType::F32 || position.component_count != 3 {
        return Err(MeshBuilderError::InvalidPositionAttribute {
            component_type: position.component_type,
            component_count: position.component_count,
        });
    }

    let stride = stride as usize;
    let vertex_count = match stride {
        0 => 0,
        _ => vertex_data.len() / stride,
    };

    let read_position = |vertex: usize| {
        if vertex >= vertex_count {
            return None;
        }
        let start = vertex * stride + position.first_item_byte_offset as usize;
        read_vec3(vertex_data.get(start..start + 12)?)
    };

    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(-f32::MAX);
    let mut include = |point: Vec3| {
        min = min.min(point);
        max = max.max(point);
    };

    match index_component_type {
        Some(component_type) => {
            let indices = read_indices(index_data, component_type)?;
            let range = clamped_range(count, offset, indices.len());

            let mut skipped = 0;
            for index in &indices[range] {
                match read_position(*index as usize) {
                    Some(point) => include(point),
                    None => skipped += 1,
                }
            }
            if skipped > 0 {
                warn!(
                    "Skipped {} indices past the vertex count {} when calculating bounds",
                    skipped, vertex_count
                );
            }
        }
        None => {
            for vertex in clamped_range(count, offset, vertex_count) {
                if let Some(point) = read_position(vertex) {
                    include(point);
                }
            }
        }
    }

    Ok(BoundingBox::new(min.to_array(), max.to_array()))
}

fn clamped_range(count: u32, offset: u32, element_count: usize) -> std::ops::Range<usize> {
    let range = subset_range(count, offset, element_count);
    if count != SUBSET_ALL && range.len() < count as usize {
        warn!(
            "Subset with offset {} and count {} exceeds the {} available elements and was clamped to {:?}",
            offset, count, element_count, range
        );
    }
    range
}

fn read_vec3(bytes: &[u8]) -> Option<Vec3> {
    let mut components = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]));
    Some(Vec3::new(
        components.next()?,
        components.next()?,
        components.next()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn position(first_item_byte_offset: u32) -> VertexAttribute {
        VertexAttribute {
            name: "Position0".to_string(),
            component_type: ComponentType::F32,
            component_count: 3,
            first_item_byte_offset,
        }
    }

    fn vertex_bytes(points: &[[f32; 3]]) -> Vec<u8> {
        points
            .iter()
            .flat_map(|p| p.iter().flat_map(|f| f.to_le_bytes()))
            .collect()
    }

    fn u16_bytes(indices: &[u16]) -> Vec<u8> {
        indices.iter().flat_map(|i| i.to_le_bytes()).collect()
    }

    #[test]
    fn bounds_non_indexed_all() {
        let data = vertex_bytes(&[[0.0, 1.0, 2.0], [-1.0, 5.0, 0.5], [3.0, 2.0, -4.0]]);
        let bounds = subset_bounds(&position(0), &data, 12, &[], None, SUBSET_ALL, 0).unwrap();
        assert_eq!(BoundingBox::new([-1.0, 1.0, -4.0], [3.0, 5.0, 2.0]), bounds);
    }

    #[test]
    fn bounds_non_indexed_range() {
        let data = vertex_bytes(&[[0.0, 1.0, 2.0], [-1.0, 5.0, 0.5], [3.0, 2.0, -4.0]]);
        let bounds = subset_bounds(&position(0), &data, 12, &[], None, 1, 1).unwrap();
        assert_eq!(BoundingBox::new([-1.0, 5.0, 0.5], [-1.0, 5.0, 0.5]), bounds);
    }

    #[test]
    fn bounds_indexed_range() {
        let data = vertex_bytes(&[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0], [3.0, 3.0, 3.0]]);
        let indices = u16_bytes(&[0, 1, 2, 3, 2, 1]);
        let bounds = subset_bounds(
            &position(0),
            &data,
            12,
            &indices,
            Some(ComponentType::U16),
            3,
            3,
        )
        .unwrap();
        assert_eq!(BoundingBox::new([1.0, 1.0, 1.0], [3.0, 3.0, 3.0]), bounds);
    }

    #[test]
    fn bounds_interleaved_offset() {
        // Each vertex has 4 bytes of other data before the position.
        let mut data = Vec::new();
        for p in [[1.0f32, 2.0, 3.0], [-1.0, 0.5, 0.25]] {
            data.extend_from_slice(&[0xff; 4]);
            data.extend(p.iter().flat_map(|f| f.to_le_bytes()));
        }

        let bounds = subset_bounds(&position(4), &data, 16, &[], None, SUBSET_ALL, 0).unwrap();
        assert_relative_eq!(-1.0, bounds.min.x);
        assert_relative_eq!(0.25, bounds.min.z);
        assert_relative_eq!(2.0, bounds.max.y);
    }

    #[test]
    fn bounds_count_zero_is_empty() {
        let data = vertex_bytes(&[[0.0, 1.0, 2.0]]);
        let bounds = subset_bounds(&position(0), &data, 12, &[], None, 0, 0).unwrap();
        assert!(bounds.is_empty());
        assert_eq!(BoundingBox::empty(), bounds);
    }

    #[test]
    fn bounds_clamped_range() {
        let data = vertex_bytes(&[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]);
        let bounds = subset_bounds(&position(0), &data, 12, &[], None, 10, 1).unwrap();
        assert_eq!(BoundingBox::new([1.0, 1.0, 1.0], [1.0, 1.0, 1.0]), bounds);
    }

    #[test]
    fn bounds_skip_indices_past_vertex_count() {
        let data = vertex_bytes(&[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]);
        let bounds = subset_bounds(
            &position(0),
            &data,
            12,
            &[0, 1, 7],
            Some(ComponentType::U8),
            SUBSET_ALL,
            0,
        )
        .unwrap();
        assert_eq!(BoundingBox::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]), bounds);
    }

    #[test]
    fn bounds_invalid_position() {
        let attribute = VertexAttribute {
            name: "Uv0".to_string(),
            component_type: ComponentType::F32,
            component_count: 2,
            first_item_byte_offset: 0,
        };
        let result = subset_bounds(&attribute, &[], 8, &[], None, SUBSET_ALL, 0);
        assert!(matches!(
            result,
            Err(MeshBuilderError::InvalidPositionAttribute {
                component_type: ComponentType::F32,
                component_count: 2
            })
        ));
    }
}
