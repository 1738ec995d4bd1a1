//! Vertex cache optimization based on Tom Forsyth's linear-speed vertex cache optimization.
//! Triangles are emitted greedily by picking the unemitted triangle with the highest score
//! among the triangles using vertices in a simulated cache.
//! If no cached vertex has any remaining triangles, the next unemitted triangle in the input order is used.
use std::collections::VecDeque;
use std::ops::Range;

use bitvec::prelude::*;
use itertools::Itertools;
use log::warn;
use meshblob_lib::formats::mesh::{subset_range, SubsetInfo};

const CACHE_DECAY_POWER: f32 = 1.5;
const LAST_TRIANGLE_SCORE: f32 = 0.75;
const VALENCE_BOOST_SCALE: f32 = 2.0;
const VALENCE_BOOST_POWER: f32 = 0.5;

// The last triangle's vertices use a fixed score, so the cache needs at least one more entry.
const MIN_CACHE_SIZE: usize = 4;

/// Options for [optimize_mesh_with](super::MeshBuilder::optimize_mesh_with).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeOptions {
    /// The number of entries in the simulated post transform vertex cache.
    pub cache_size: usize,
    /// Reorders the vertex data to match the order vertices are first used by the optimized indices.
    pub reorder_vertices: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            cache_size: 32,
            reorder_vertices: false,
        }
    }
}

fn vertex_score(cache_position: Option<usize>, remaining_valence: u32, cache_size: usize) -> f32 {
    if remaining_valence == 0 {
        // The vertex isn't used by any remaining triangles.
        return -1.0;
    }

    let cache_score = match cache_position {
        Some(position) if position < 3 => LAST_TRIANGLE_SCORE,
        Some(position) => {
            let scale = 1.0 / (cache_size - 3) as f32;
            (1.0 - (position - 3) as f32 * scale).powf(CACHE_DECAY_POWER)
        }
        None => 0.0,
    };

    let valence_score = VALENCE_BOOST_SCALE * (remaining_valence as f32).powf(-VALENCE_BOOST_POWER);
    cache_score + valence_score
}

/// Reorders the triangles in `indices` to improve vertex cache reuse.
/// The vertex order within each triangle is unchanged to preserve the winding.
/// Trailing indices that don't form a complete triangle are kept at the end.
pub fn optimize_triangle_order(indices: &[u32], cache_size: usize) -> Vec<u32> {
    let cache_size = cache_size.max(MIN_CACHE_SIZE);
    let triangles: Vec<[usize; 3]> = indices
        .iter()
        .map(|i| *i as usize)
        .tuples()
        .map(|(v0, v1, v2)| [v0, v1, v2])
        .collect();
    let vertex_count = indices.iter().max().map(|i| *i as usize + 1).unwrap_or(0);

    let mut valence = vec![0u32; vertex_count];
    for v in triangles.iter().flatten() {
        valence[*v] += 1;
    }

    // Store the triangles for each vertex contiguously.
    let mut adjacency_start = vec![0usize; vertex_count + 1];
    for (v, count) in valence.iter().enumerate() {
        adjacency_start[v + 1] = adjacency_start[v] + *count as usize;
    }
    let mut adjacency = vec![0usize; triangles.len() * 3];
    let mut next_slot = adjacency_start.clone();
    for (t, triangle) in triangles.iter().enumerate() {
        for v in triangle {
            adjacency[next_slot[*v]] = t;
            next_slot[*v] += 1;
        }
    }

    let mut cache_position: Vec<Option<usize>> = vec![None; vertex_count];
    let mut scores: Vec<f32> = valence
        .iter()
        .map(|v| vertex_score(None, *v, cache_size))
        .collect();

    let mut emitted = bitvec![0; triangles.len()];
    let mut cache: Vec<usize> = Vec::with_capacity(cache_size + 3);
    let mut output = Vec::with_capacity(indices.len());

    let mut best_triangle: Option<usize> = None;
    let mut next_unemitted = 0;

    for _ in 0..triangles.len() {
        let t = match best_triangle {
            Some(t) => t,
            None => {
                while next_unemitted < triangles.len() && emitted[next_unemitted] {
                    next_unemitted += 1;
                }
                next_unemitted
            }
        };
        let triangle = match triangles.get(t) {
            Some(triangle) => *triangle,
            None => break,
        };

        emitted.set(t, true);
        output.extend(triangle.iter().map(|v| *v as u32));
        for v in &triangle {
            valence[*v] -= 1;
        }

        // Move the triangle's vertices to the front of the cache.
        let mut new_cache = Vec::with_capacity(cache_size + 3);
        for v in triangle.iter().chain(cache.iter()) {
            if !new_cache.contains(v) {
                new_cache.push(*v);
            }
        }
        for (position, v) in new_cache.iter().enumerate() {
            cache_position[*v] = if position < cache_size {
                Some(position)
            } else {
                None
            };
            scores[*v] = vertex_score(cache_position[*v], valence[*v], cache_size);
        }
        new_cache.truncate(cache_size);
        cache = new_cache;

        // Only triangles using cached vertices had their scores change.
        best_triangle = None;
        let mut best_score = f32::MIN;
        for v in &cache {
            for adjacent in &adjacency[adjacency_start[*v]..adjacency_start[*v + 1]] {
                if emitted[*adjacent] {
                    continue;
                }
                let score: f32 = triangles[*adjacent].iter().map(|v| scores[*v]).sum();
                if score > best_score {
                    best_score = score;
                    best_triangle = Some(*adjacent);
                }
            }
        }
    }

    output.extend_from_slice(&indices[triangles.len() * 3..]);
    output
}

/// The index ranges to optimize independently so triangles never move between subsets.
/// Ranges that overlap a previous range are skipped.
pub(crate) fn subset_index_ranges(subsets: &[SubsetInfo], index_count: usize) -> Vec<Range<usize>> {
    if subsets.is_empty() {
        return vec![0..index_count];
    }

    let mut ranges: Vec<_> = subsets
        .iter()
        .map(|s| (s, subset_range(s.count, s.offset, index_count)))
        .filter(|(_, range)| !range.is_empty())
        .collect();
    ranges.sort_by_key(|(_, range)| (range.start, range.end));

    let mut result = Vec::new();
    let mut end = 0;
    for (subset, range) in ranges {
        if range.start < end {
            warn!(
                "Skipped optimizing subset {} with index range {:?} that overlaps another subset",
                subset.name, range
            );
            continue;
        }
        end = range.end;
        result.push(range);
    }
    result
}

/// The average number of vertex cache misses per triangle for a FIFO cache with `cache_size` entries.
/// Lower values indicate better reuse with a minimum of about 0.5 for large regular meshes.
/**
```rust
# use meshblob_data::mesh_builder::average_cache_miss_ratio;
// Two triangles forming a quad share 2 vertices.
assert_eq!(2.0, average_cache_miss_ratio(&[0, 1, 2, 2, 1, 3], 16));
```
*/
pub fn average_cache_miss_ratio(indices: &[u32], cache_size: usize) -> f32 {
    let triangle_count = indices.len() / 3;
    if triangle_count == 0 {
        return 0.0;
    }

    let mut cache = VecDeque::with_capacity(cache_size);
    let mut misses = 0;
    for index in &indices[..triangle_count * 3] {
        if !cache.contains(index) {
            misses += 1;
            if cache.len() >= cache_size {
                cache.pop_front();
            }
            cache.push_back(*index);
        }
    }

    misses as f32 / triangle_count as f32
}

/// Remaps the vertices in `indices` to the order they are first used.
/// Returns the old vertex index for each new vertex index.
/// Vertices that are never used keep their relative order after all used vertices.
pub(crate) fn first_use_order(indices: &mut [u32], vertex_count: usize) -> Vec<usize> {
    let mut new_index: Vec<Option<u32>> = vec![None; vertex_count];
    let mut old_indices = Vec::with_capacity(vertex_count);

    for index in indices.iter_mut() {
        if let Some(remapped) = new_index.get_mut(*index as usize) {
            let value = *remapped.get_or_insert_with(|| {
                old_indices.push(*index as usize);
                (old_indices.len() - 1) as u32
            });
            *index = value;
        }
    }

    for (v, remapped) in new_index.iter().enumerate() {
        if remapped.is_none() {
            old_indices.push(v);
        }
    }

    old_indices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_set(indices: &[u32]) -> Vec<[u32; 3]> {
        indices
            .iter()
            .copied()
            .tuples()
            .map(|(a, b, c)| {
                // Rotate so the smallest index is first to preserve the winding.
                let t = [a, b, c];
                let start = (0..3).min_by_key(|i| t[*i]).unwrap();
                [t[start], t[(start + 1) % 3], t[(start + 2) % 3]]
            })
            .sorted()
            .collect()
    }

    fn grid_indices(width: u32, height: u32) -> Vec<u32> {
        let mut indices = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v0 = y * (width + 1) + x;
                let v1 = v0 + 1;
                let v2 = v0 + width + 1;
                let v3 = v2 + 1;
                indices.extend_from_slice(&[v0, v1, v2, v2, v1, v3]);
            }
        }
        indices
    }

    fn shuffle_triangles(indices: &[u32], step: usize) -> Vec<u32> {
        let triangles: Vec<_> = indices.chunks_exact(3).collect();
        (0..triangles.len())
            .flat_map(|i| triangles[(i * step) % triangles.len()].to_vec())
            .collect()
    }

    #[test]
    fn optimize_empty() {
        assert!(optimize_triangle_order(&[], 32).is_empty());
    }

    #[test]
    fn optimize_single_triangle() {
        assert_eq!(vec![2, 0, 1], optimize_triangle_order(&[2, 0, 1], 32));
    }

    #[test]
    fn optimize_keeps_trailing_indices() {
        let result = optimize_triangle_order(&[0, 1, 2, 3, 4], 32);
        assert_eq!(vec![0, 1, 2, 3, 4], result);
    }

    #[test]
    fn optimize_preserves_triangles() {
        let indices = shuffle_triangles(&grid_indices(8, 8), 37);
        let optimized = optimize_triangle_order(&indices, 16);

        assert_eq!(indices.len(), optimized.len());
        assert_eq!(triangle_set(&indices), triangle_set(&optimized));
    }

    #[test]
    fn optimize_improves_cache_reuse() {
        // 512 triangles with a step coprime to the triangle count visits every triangle once.
        let indices = shuffle_triangles(&grid_indices(16, 16), 97);
        let optimized = optimize_triangle_order(&indices, 32);

        let before = average_cache_miss_ratio(&indices, 32);
        let after = average_cache_miss_ratio(&optimized, 32);
        assert!(before > 2.0, "{}", before);
        assert!(after < before / 2.0, "{} {}", before, after);
    }

    #[test]
    fn optimize_small_cache_size() {
        let indices = grid_indices(4, 4);
        let optimized = optimize_triangle_order(&indices, 0);
        assert_eq!(triangle_set(&indices), triangle_set(&optimized));
    }

    #[test]
    fn acmr_no_triangles() {
        assert_eq!(0.0, average_cache_miss_ratio(&[0, 1], 32));
    }

    #[test]
    fn acmr_no_reuse() {
        assert_eq!(3.0, average_cache_miss_ratio(&[0, 1, 2, 3, 4, 5], 32));
    }

    #[test]
    fn acmr_cache_eviction() {
        // The cache only holds 3 vertices, so 0 is evicted before it's used again.
        assert_eq!(
            3.0,
            average_cache_miss_ratio(&[0, 1, 2, 3, 4, 5, 0, 1, 2], 3)
        );
    }

    fn subset(name: &str, count: u32, offset: u32) -> SubsetInfo {
        SubsetInfo {
            name: name.to_string(),
            count,
            offset,
            bounds: Default::default(),
        }
    }

    #[test]
    fn index_ranges_no_subsets() {
        assert_eq!(vec![0..12], subset_index_ranges(&[], 12));
    }

    #[test]
    fn index_ranges_sorted() {
        let subsets = [subset("b", u32::MAX, 6), subset("a", 6, 0), subset("c", 0, 3)];
        assert_eq!(vec![0..6, 6..12], subset_index_ranges(&subsets, 12));
    }

    #[test]
    fn index_ranges_skip_overlapping() {
        let subsets = [subset("a", 6, 0), subset("b", 6, 3), subset("c", 3, 9)];
        assert_eq!(vec![0..6, 9..12], subset_index_ranges(&subsets, 12));
    }

    #[test]
    fn first_use_remap() {
        let mut indices = vec![3, 1, 3, 0];
        let old_indices = first_use_order(&mut indices, 5);
        assert_eq!(vec![0, 1, 0, 2], indices);
        assert_eq!(vec![3, 1, 0, 2, 4], old_indices);
    }

    #[test]
    fn vertex_scores() {
        assert_eq!(-1.0, vertex_score(Some(0), 0, 32));
        assert_eq!(LAST_TRIANGLE_SCORE + 2.0, vertex_score(Some(2), 1, 32));
        assert_eq!(1.0 + 2.0, vertex_score(Some(3), 1, 32));
        approx::assert_relative_eq!(1.0, vertex_score(None, 4, 32));
    }
}
