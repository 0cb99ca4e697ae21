//! Spiral of ground offsets so several drops of one kill fan out.
//!
//! Index 0 is the centre cell. Ring `r` holds the `8r` cells on the border of
//! the square `[-r, r] x [-r, r]`, walked clockwise from its top-left corner.

use crate::geometry::Vec2;

/// Grid cell of the `index`-th drop
pub fn ring_cell(index: usize) -> (i32, i32) {
    if index == 0 {
        return (0, 0);
    }
    let mut ring = 1usize;
    let mut first = 1usize;
    while index >= first + 8 * ring {
        first += 8 * ring;
        ring += 1;
    }

    let k = index - first;
    let side = k / (2 * ring);
    let along = (k % (2 * ring)) as i32;
    let r = ring as i32;
    match side {
        0 => (-r + along, -r),
        1 => (r, -r + along),
        2 => (r - along, r),
        _ => (-r, r - along),
    }
}

/// World-space offset of the `index`-th drop
pub fn offset(index: usize, spacing: f32) -> Vec2 {
    let (x, z) = ring_cell(index);
    Vec2::new(x as f32 * spacing, z as f32 * spacing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_cells_are_unique_and_ring_sized() {
        let cells: Vec<(i32, i32)> = (0..25).map(ring_cell).collect();
        let unique: HashSet<_> = cells.iter().copied().collect();
        assert_eq!(unique.len(), 25);

        // 1 centre + 8 on ring one + 16 on ring two
        assert!(cells[1..9].iter().all(|(x, z)| x.abs().max(z.abs()) == 1));
        assert!(cells[9..25].iter().all(|(x, z)| x.abs().max(z.abs()) == 2));
    }

    #[test]
    fn test_offset_scales_with_spacing() {
        assert_eq!(offset(0, 2.0), Vec2::new(0.0, 0.0));
        assert_eq!(offset(1, 2.0), Vec2::new(-2.0, -2.0));
    }
}
