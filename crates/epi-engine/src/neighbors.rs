//! Neighbor geometry on the hex-approximated square grid.
//!
//! Adjacency is the six-direction axial offset pattern, the logical hex
//! layout embedded in the square array. The ranged queries back the droplet
//! and aerosol transmission channels and pair each neighbor with its
//! Euclidean distance so callers can apply per-distance decay.

use epi_core::Position;

/// Axial hex offsets defining contact adjacency.
pub const CONTACT_OFFSETS: [(i32, i32); 6] = [(1, 0), (-1, 0), (0, 1), (0, -1), (1, -1), (-1, 1)];

/// Up to six adjacent cells, filtered to the grid bounds.
pub fn contact_neighbors(pos: Position, side: i32) -> Vec<Position> {
    CONTACT_OFFSETS
        .iter()
        .map(|&(dr, dc)| pos.add(dr, dc))
        .filter(|p| p.row >= 0 && p.row < side && p.col >= 0 && p.col < side)
        .collect()
}

/// Every other in-bounds cell within `radius` of `pos`, with its distance.
///
/// Scans the bounding box row-major and keeps cells whose Euclidean distance
/// is at most `radius`. The origin cell is excluded; radius zero yields no
/// neighbors.
pub fn range_neighbors(pos: Position, side: i32, radius: i32) -> Vec<(Position, f64)> {
    let mut neighbors = Vec::new();
    for row in (pos.row - radius).max(0)..=(pos.row + radius).min(side - 1) {
        for col in (pos.col - radius).max(0)..=(pos.col + radius).min(side - 1) {
            let candidate = Position::new(row, col);
            if candidate == pos {
                continue;
            }
            let distance = pos.euclidean_distance(&candidate);
            if distance <= radius as f64 {
                neighbors.push((candidate, distance));
            }
        }
    }
    neighbors
}
