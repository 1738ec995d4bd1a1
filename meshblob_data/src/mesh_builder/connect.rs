use ahash::AHashMap;
use meshblob_lib::formats::mesh::{subset_range, SubsetInfo};
use std::ops::Range;

pub(crate) fn has_duplicate_names(subsets: &[SubsetInfo]) -> bool {
    let mut counts = AHashMap::new();
    subsets.iter().any(|s| {
        let count = counts.entry(s.name.as_str()).or_insert(0usize);
        *count += 1;
        *count > 1
    })
}

/// Groups subsets by name in order of first occurrence and concatenates each group's indices.
/// Ranges within a group are emitted in index order, and overlapping ranges are combined
/// so that no index is copied twice.
/// Returns `None` if no subsets share a name.
pub(crate) fn connect_subsets(
    subsets: &[SubsetInfo],
    indices: &[u32],
) -> Option<(Vec<SubsetInfo>, Vec<u32>)> {
    if subsets.len() < 2 || !has_duplicate_names(subsets) {
        return None;
    }

    let mut group_index = AHashMap::new();
    let mut groups: Vec<Vec<&SubsetInfo>> = Vec::new();
    for subset in subsets {
        let i = *group_index.entry(subset.name.as_str()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[i].push(subset);
    }

    let mut new_indices = Vec::with_capacity(indices.len());
    let mut new_subsets = Vec::with_capacity(groups.len());
    for group in groups {
        let start = new_indices.len();
        let mut bounds = group[0].bounds;
        for subset in &group {
            bounds = bounds.union(&subset.bounds);
        }

        let ranges = group
            .iter()
            .map(|s| subset_range(s.count, s.offset, indices.len()));
        for range in merge_ranges(ranges) {
            new_indices.extend_from_slice(&indices[range]);
        }

        new_subsets.push(SubsetInfo {
            name: group[0].name.clone(),
            count: (new_indices.len() - start) as u32,
            offset: start as u32,
            bounds,
        });
    }

    Some((new_subsets, new_indices))
}

// Sorted, non overlapping ranges covering the same indices as the input.
fn merge_ranges(ranges: impl Iterator<Item = Range<usize>>) -> Vec<Range<usize>> {
    let mut ranges: Vec<_> = ranges.filter(|r| !r.is_empty()).collect();
    ranges.sort_by_key(|r| (r.start, r.end));

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start < last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    use ahash::AHashSet;
    use meshblob_lib::formats::mesh::{BoundingBox, SUBSET_ALL};
    use pretty_assertions::assert_eq;

    fn subset(name: &str, count: u32, offset: u32, bounds: BoundingBox) -> SubsetInfo {
        SubsetInfo {
            name: name.to_string(),
            count,
            offset,
            bounds,
        }
    }

    fn vertices(subsets: &[SubsetInfo], indices: &[u32], name: &str) -> AHashSet<u32> {
        subsets
            .iter()
            .filter(|s| s.name == name)
            .flat_map(|s| indices[subset_range(s.count, s.offset, indices.len())].to_vec())
            .collect()
    }

    #[test]
    fn duplicate_names() {
        let bounds = BoundingBox::empty();
        assert!(!has_duplicate_names(&[]));
        assert!(!has_duplicate_names(&[
            subset("a", 3, 0, bounds),
            subset("b", 3, 3, bounds)
        ]));
        assert!(has_duplicate_names(&[
            subset("a", 3, 0, bounds),
            subset("b", 3, 3, bounds),
            subset("a", 3, 6, bounds)
        ]));
    }

    #[test]
    fn connect_single_subset() {
        let subsets = [subset("a", SUBSET_ALL, 0, BoundingBox::empty())];
        assert_eq!(None, connect_subsets(&subsets, &[0, 1, 2]));
    }

    #[test]
    fn connect_no_duplicates() {
        let subsets = [
            subset("a", 3, 0, BoundingBox::empty()),
            subset("b", 3, 3, BoundingBox::empty()),
        ];
        assert_eq!(None, connect_subsets(&subsets, &[0, 1, 2, 3, 4, 5]));
    }

    #[test]
    fn connect_first_occurrence_order() {
        let indices = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];
        let subsets = [
            subset("b", 3, 0, BoundingBox::new([0.0; 3], [1.0; 3])),
            subset("a", 3, 3, BoundingBox::new([0.0; 3], [1.0; 3])),
            subset("b", 3, 6, BoundingBox::new([-2.0; 3], [0.5; 3])),
            subset("a", SUBSET_ALL, 9, BoundingBox::empty()),
        ];

        let (new_subsets, new_indices) = connect_subsets(&subsets, &indices).unwrap();
        assert_eq!(
            vec![
                subset("b", 6, 0, BoundingBox::new([-2.0; 3], [1.0; 3])),
                subset("a", 6, 6, BoundingBox::new([0.0; 3], [1.0; 3])),
            ],
            new_subsets
        );
        assert_eq!(vec![0, 1, 2, 6, 7, 8, 3, 4, 5, 9, 10, 11], new_indices);

        for name in ["a", "b"] {
            assert_eq!(
                vertices(&subsets, &indices, name),
                vertices(&new_subsets, &new_indices, name)
            );
        }
    }

    #[test]
    fn connect_drops_unused_indices() {
        let indices = [0, 1, 2, 3, 4, 5, 6, 7, 8];
        let subsets = [
            subset("a", 3, 0, BoundingBox::empty()),
            subset("a", 3, 6, BoundingBox::empty()),
        ];

        let (new_subsets, new_indices) = connect_subsets(&subsets, &indices).unwrap();
        assert_eq!(vec![subset("a", 6, 0, BoundingBox::empty())], new_subsets);
        assert_eq!(vec![0, 1, 2, 6, 7, 8], new_indices);
    }

    #[test]
    fn connect_overlapping_ranges() {
        let indices = [0, 1, 2, 3, 4, 5, 6, 7, 8];
        let subsets = [
            subset("a", SUBSET_ALL, 0, BoundingBox::new([0.0; 3], [1.0; 3])),
            subset("a", 3, 3, BoundingBox::new([-1.0; 3], [0.0; 3])),
        ];

        let (new_subsets, new_indices) = connect_subsets(&subsets, &indices).unwrap();
        assert_eq!(
            vec![subset("a", 9, 0, BoundingBox::new([-1.0; 3], [1.0; 3]))],
            new_subsets
        );
        assert_eq!(indices.to_vec(), new_indices);
    }

    #[test]
    fn connect_partially_overlapping_ranges() {
        let indices = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];
        let subsets = [
            subset("a", 6, 3, BoundingBox::empty()),
            subset("b", 3, 0, BoundingBox::empty()),
            subset("a", 6, 0, BoundingBox::empty()),
        ];

        let (new_subsets, new_indices) = connect_subsets(&subsets, &indices).unwrap();
        assert_eq!(
            vec![
                subset("a", 9, 0, BoundingBox::empty()),
                subset("b", 3, 9, BoundingBox::empty()),
            ],
            new_subsets
        );
        assert_eq!(vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 0, 1, 2], new_indices);
    }

    #[test]
    fn merge_adjacent_ranges() {
        assert_eq!(
            vec![0..3, 3..6, 9..12],
            merge_ranges(vec![9..12, 3..6, 0..3, 4..4].into_iter())
        );
        assert_eq!(vec![0..8], merge_ranges(vec![2..8, 0..3, 4..5].into_iter()));
    }
}
