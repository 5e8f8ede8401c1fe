//! Frame transforms and connected-component labeling.
//!
//! Observations arrive in an egocentric local frame: a window of cells
//! rotated so the observing agent's forward direction points up, with the
//! agent at a fixed window position. Folding those cells into the global
//! belief grid requires undoing that rotation and translating by the
//! offset between the agent's window position and its global position.
//!
//! The four transforms are fixed affine maps, one per [`Orientation`],
//! and [`global_to_local`] is the exact inverse of [`local_to_global`]
//! for every orientation (round-trip tested below).
//!
//! [`connected_components`] labels contiguous clusters of same-typed
//! cells (e.g. apple patches) with stable ids derived from a row-major
//! traversal, so repeated runs over the same grid produce identical
//! labelings.

use std::collections::{BTreeMap, VecDeque};

use commons_types::{Orientation, Position, Symbol};

use crate::grid::Grid;

/// Convert a local (observation-window) position to global map
/// coordinates.
///
/// `local_self` is the observer's fixed position inside the window,
/// `global_self` its position on the map, and `orientation` its facing.
/// Orientation [`Orientation::North`] is a pure translation; the other
/// three undo the window's 90/180/270 degree rotation.
pub const fn local_to_global(
    local: Position,
    local_self: Position,
    global_self: Position,
    orientation: Orientation,
) -> Position {
    let dr = local.row.saturating_sub(local_self.row);
    let dc = local.col.saturating_sub(local_self.col);
    match orientation {
        Orientation::North => Position::new(
            global_self.row.saturating_add(dr),
            global_self.col.saturating_add(dc),
        ),
        Orientation::East => Position::new(
            global_self.row.saturating_add(dc),
            global_self.col.saturating_sub(dr),
        ),
        Orientation::South => Position::new(
            global_self.row.saturating_sub(dr),
            global_self.col.saturating_sub(dc),
        ),
        Orientation::West => Position::new(
            global_self.row.saturating_sub(dc),
            global_self.col.saturating_add(dr),
        ),
    }
}

/// Convert a global map position back into the local observation frame.
///
/// Exact inverse of [`local_to_global`] for each orientation.
pub const fn global_to_local(
    global: Position,
    local_self: Position,
    global_self: Position,
    orientation: Orientation,
) -> Position {
    let dr = global.row.saturating_sub(global_self.row);
    let dc = global.col.saturating_sub(global_self.col);
    match orientation {
        Orientation::North => Position::new(
            local_self.row.saturating_add(dr),
            local_self.col.saturating_add(dc),
        ),
        Orientation::East => Position::new(
            local_self.row.saturating_sub(dc),
            local_self.col.saturating_add(dr),
        ),
        Orientation::South => Position::new(
            local_self.row.saturating_sub(dr),
            local_self.col.saturating_sub(dc),
        ),
        Orientation::West => Position::new(
            local_self.row.saturating_add(dc),
            local_self.col.saturating_sub(dr),
        ),
    }
}

// ---------------------------------------------------------------------------
// Connected components
// ---------------------------------------------------------------------------

/// One 4-connected cluster of same-typed cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Integer-rounded centroid of the member cells.
    pub center: Position,
    /// All member cells, in discovery (row-major flood) order.
    pub elements: Vec<Position>,
}

/// Label 4-connected components of cells whose symbol is in `targets`.
///
/// Components are numbered from 1 in row-major discovery order, so ids
/// are stable across runs on the same grid. The centroid is the
/// truncating integer mean of member coordinates.
pub fn connected_components(
    grid: &Grid<Symbol>,
    targets: &[Symbol],
) -> BTreeMap<u32, Component> {
    let mut components = BTreeMap::new();
    let mut visited: Grid<bool> = Grid::filled(grid.height(), grid.width(), false);
    let mut next_id: u32 = 1;

    for start in grid.positions() {
        if visited.get(start).copied().unwrap_or(true) {
            continue;
        }
        let Some(&symbol) = grid.get(start) else {
            continue;
        };
        if !targets.contains(&symbol) {
            continue;
        }

        // Flood fill this component.
        let mut elements = Vec::new();
        let mut queue = VecDeque::new();
        visited.set(start, true);
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            elements.push(current);
            for direction in [
                Orientation::North,
                Orientation::East,
                Orientation::South,
                Orientation::West,
            ] {
                let (dr, dc) = direction.delta();
                let Some(neighbor) = current.offset(dr, dc) else {
                    continue;
                };
                if visited.get(neighbor).copied().unwrap_or(true) {
                    continue;
                }
                let Some(&neighbor_symbol) = grid.get(neighbor) else {
                    continue;
                };
                if targets.contains(&neighbor_symbol) {
                    visited.set(neighbor, true);
                    queue.push_back(neighbor);
                }
            }
        }

        components.insert(next_id, Component {
            center: centroid(&elements),
            elements,
        });
        next_id = next_id.saturating_add(1);
    }

    components
}

/// Truncating integer mean of a non-empty cell list.
fn centroid(elements: &[Position]) -> Position {
    let count = i64::try_from(elements.len().max(1)).unwrap_or(1);
    let (mut row_sum, mut col_sum) = (0_i64, 0_i64);
    for p in elements {
        row_sum = row_sum.saturating_add(i64::from(p.row));
        col_sum = col_sum.saturating_add(i64::from(p.col));
    }
    let row = i32::try_from(row_sum.checked_div(count).unwrap_or(0)).unwrap_or(0);
    let col = i32::try_from(col_sum.checked_div(count).unwrap_or(0)).unwrap_or(0);
    Position::new(row, col)
}

// ===========================================================================
// Tests
// ===========================================================================
