//! The default shared-resource harvesting scenario.
//!
//! A small walled orchard with three apple clusters over grass. Used by
//! the demo binary and by tests that need a realistic map without
//! constructing one by hand. The layout is immutable for the lifetime of
//! a run; agents build their own beliefs about it tick by tick.

use commons_types::{Position, Symbol};

use crate::error::WorldError;
use crate::grid::Grid;

/// Ascii layout of the default orchard.
///
/// `W` wall, space floor, `A` apple, `G` grass.
const DEFAULT_MAP: &str = "\
WWWWWWWWWWWWWWWW
W              W
W  AA      GA  W
W  AAG      A  W
W   G          W
W              W
W      GG      W
W     GAAG     W
W      GG      W
W              W
WWWWWWWWWWWWWWWW";

/// Spawn points for up to four agents, all on open floor.
pub const SPAWN_POINTS: [Position; 4] = [
    Position::new(1, 1),
    Position::new(1, 14),
    Position::new(9, 1),
    Position::new(9, 14),
];

/// Build the default scenario map.
///
/// # Errors
///
/// Returns [`WorldError::MalformedMap`] only if the embedded layout is
/// broken, which the tests below rule out.
pub fn starting_map() -> Result<Grid<Symbol>, WorldError> {
    Grid::from_ascii(DEFAULT_MAP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::connected_components;

    #[test]
    fn starting_map_parses() {
        let map = starting_map();
        assert!(map.is_ok());
        if let Ok(map) = map {
            assert_eq!(map.height(), 11);
            assert_eq!(map.width(), 16);
        }
    }

    #[test]
    fn spawn_points_are_open_floor() {
        let Ok(map) = starting_map() else {
            return;
        };
        for spawn in SPAWN_POINTS {
            assert_eq!(map.get(spawn), Some(&Symbol::FLOOR), "spawn {spawn}");
        }
    }

    #[test]
    fn map_has_three_resource_clusters() {
        let Ok(map) = starting_map() else {
            return;
        };
        let clusters =
            connected_components(&map, &[Symbol::APPLE, Symbol::GRASS]);
        assert_eq!(clusters.len(), 3);
    }
}
