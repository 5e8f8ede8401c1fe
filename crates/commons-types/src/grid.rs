//! Grid primitives: positions, orientations, cell symbols, primitive steps.
//!
//! The world is a rectangular grid addressed by `(row, col)` pairs in
//! global map coordinates. Row 0 is the northern edge and rows increase
//! southward; column 0 is the western edge and columns increase eastward.
//!
//! Agents face one of four cardinal [`Orientation`]s. Observations arrive
//! in an egocentric frame rotated so the agent's forward direction points
//! "up" in the observation window; the same convention applies to movement
//! commands, so `move up` always means "step in my current forward
//! direction" regardless of where the agent actually faces on the map.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A cell address in global map coordinates.
///
/// Coordinates are signed so frame transforms can pass through
/// intermediate out-of-bounds values; grid containers reject addresses
/// outside their extent at access time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    /// Row index (increases southward).
    pub row: i32,
    /// Column index (increases eastward).
    pub col: i32,
}

impl Position {
    /// Create a position from row and column indices.
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Manhattan distance to another position.
    pub const fn manhattan_distance(&self, other: &Self) -> u32 {
        self.row
            .abs_diff(other.row)
            .saturating_add(self.col.abs_diff(other.col))
    }

    /// Return the position offset by `(delta_row, delta_col)`, or `None`
    /// if the arithmetic overflows.
    pub const fn offset(&self, delta_row: i32, delta_col: i32) -> Option<Self> {
        let Some(row) = self.row.checked_add(delta_row) else {
            return None;
        };
        let Some(col) = self.col.checked_add(delta_col) else {
            return None;
        };
        Some(Self { row, col })
    }

    /// Extract the first `(row, col)` pair embedded in free text.
    ///
    /// Accepts both `(r, c)` and `[r, c]` delimiters, as produced by the
    /// reasoning model and by environment observation strings such as
    /// `"an apple at position (3, 4)"`. Returns `None` when no
    /// well-formed pair is present.
    pub fn parse_embedded(text: &str) -> Option<Self> {
        let chars: Vec<char> = text.chars().collect();
        for (i, &c) in chars.iter().enumerate() {
            let closer = match c {
                '(' => ')',
                '[' => ']',
                _ => continue,
            };
            let Some(rest) = chars.get(i.saturating_add(1)..) else {
                continue;
            };
            let Some(end) = rest.iter().position(|&r| r == closer) else {
                continue;
            };
            let inner: String = rest.get(..end).unwrap_or(&[]).iter().collect();
            let mut parts = inner.split(',');
            let row = parts.next().and_then(|p| p.trim().parse::<i32>().ok());
            let col = parts.next().and_then(|p| p.trim().parse::<i32>().ok());
            if let (Some(row), Some(col)) = (row, col)
                && parts.next().is_none()
            {
                return Some(Self { row, col });
            }
        }
        None
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

// ---------------------------------------------------------------------------
// Orientation
// ---------------------------------------------------------------------------

/// One of the four cardinal directions, encoded 0-3.
///
/// Doubles as a facing (which way an agent looks) and as a movement
/// direction (which way a step goes). Rotations compose modulo 4.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Orientation {
    /// Toward row 0 (up on the map).
    North,
    /// Toward increasing columns (right on the map).
    East,
    /// Toward increasing rows (down on the map).
    South,
    /// Toward decreasing columns (left on the map).
    West,
}

impl Orientation {
    /// Numeric encoding: North 0, East 1, South 2, West 3.
    pub const fn index(self) -> u8 {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }

    /// Decode from a numeric index, wrapping modulo 4.
    pub const fn from_index(index: u8) -> Self {
        match index % 4 {
            1 => Self::East,
            2 => Self::South,
            3 => Self::West,
            _ => Self::North,
        }
    }

    /// The orientation after a quarter turn to the right.
    pub const fn rotated_right(self) -> Self {
        Self::from_index(self.index().wrapping_add(1))
    }

    /// The orientation after a quarter turn to the left.
    pub const fn rotated_left(self) -> Self {
        Self::from_index(self.index().wrapping_add(3))
    }

    /// Unit step `(delta_row, delta_col)` for a move in this direction.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (-1, 0),
            Self::East => (0, 1),
            Self::South => (1, 0),
            Self::West => (0, -1),
        }
    }

    /// This direction expressed relative to a facing, as a quarter-turn
    /// count: 0 forward, 1 right, 2 backward, 3 left.
    pub const fn relative_to(self, facing: Self) -> u8 {
        self.index().wrapping_add(4).wrapping_sub(facing.index()) % 4
    }

    /// The movement direction matching a `(delta_row, delta_col)` unit
    /// step, or `None` for a non-unit offset.
    pub const fn from_delta(delta_row: i32, delta_col: i32) -> Option<Self> {
        match (delta_row, delta_col) {
            (-1, 0) => Some(Self::North),
            (0, 1) => Some(Self::East),
            (1, 0) => Some(Self::South),
            (0, -1) => Some(Self::West),
            _ => None,
        }
    }
}

impl core::fmt::Display for Orientation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::North => "north",
            Self::East => "east",
            Self::South => "south",
            Self::West => "west",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Primitive steps
// ---------------------------------------------------------------------------

/// One atomic command accepted by the environment.
///
/// The environment consumes exactly one primitive step per agent per tick.
/// Movement steps are egocentric: `MoveUp` is a step in the agent's current
/// forward direction. Turning changes facing without moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveStep {
    /// Step forward.
    MoveUp,
    /// Step backward.
    MoveDown,
    /// Strafe left.
    MoveLeft,
    /// Strafe right.
    MoveRight,
    /// Rotate 90 degrees counter-clockwise.
    TurnLeft,
    /// Rotate 90 degrees clockwise.
    TurnRight,
    /// Fire the interaction beam at the faced target.
    Attack,
    /// Fire the cleaning beam at the faced target.
    Clean,
    /// Do nothing this tick.
    StayPut,
}

impl PrimitiveStep {
    /// The exact wire string the environment accepts for this step.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MoveUp => "move up",
            Self::MoveDown => "move down",
            Self::MoveLeft => "move left",
            Self::MoveRight => "move right",
            Self::TurnLeft => "turn left",
            Self::TurnRight => "turn right",
            Self::Attack => "attack",
            Self::Clean => "clean",
            Self::StayPut => "stay put",
        }
    }

    /// Parse an environment wire string back into a step.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "move up" => Some(Self::MoveUp),
            "move down" => Some(Self::MoveDown),
            "move left" => Some(Self::MoveLeft),
            "move right" => Some(Self::MoveRight),
            "turn left" => Some(Self::TurnLeft),
            "turn right" => Some(Self::TurnRight),
            "attack" => Some(Self::Attack),
            "clean" => Some(Self::Clean),
            "stay put" => Some(Self::StayPut),
            _ => None,
        }
    }

    /// The movement step for a direction expressed relative to the
    /// walker's facing (quarter-turn count: 0 forward .. 3 left).
    pub const fn move_for_relative(relative: u8) -> Self {
        match relative % 4 {
            1 => Self::MoveRight,
            2 => Self::MoveDown,
            3 => Self::MoveLeft,
            _ => Self::MoveUp,
        }
    }
}

impl core::fmt::Display for PrimitiveStep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Cell symbols
// ---------------------------------------------------------------------------

/// The last-observed tag of a single map cell.
///
/// A cell's displayed symbol is ephemeral: agents only ever know the most
/// recently observed symbol and when it was observed. The alphabet is
/// small and substrate-defined; the named constants below cover the
/// shared-resource harvesting substrate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Symbol(pub char);

impl Symbol {
    /// Impassable wall.
    pub const WALL: Self = Self('W');
    /// Open floor.
    pub const FLOOR: Self = Self(' ');
    /// A harvestable apple.
    pub const APPLE: Self = Self('A');
    /// Grass from which apples regrow.
    pub const GRASS: Self = Self('G');
    /// A cell occupied by some agent.
    pub const AGENT: Self = Self('@');
    /// An interaction beam in flight.
    pub const BEAM: Self = Self('B');
    /// Never observed.
    pub const UNKNOWN: Self = Self('?');
    /// Outside the map extent.
    pub const OUT_OF_BOUNDS: Self = Self('-');

    /// The raw character for this symbol.
    pub const fn as_char(self) -> char {
        self.0
    }

    /// Whether this cell has never been observed.
    pub const fn is_unknown(self) -> bool {
        self.0 == Self::UNKNOWN.0
    }

    /// Whether this cell was last seen occupied by an agent.
    pub const fn is_agent(self) -> bool {
        self.0 == Self::AGENT.0
    }
}

impl From<char> for Symbol {
    fn from(c: char) -> Self {
        Self(c)
    }
}

impl core::fmt::Display for Symbol {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Position
    // -----------------------------------------------------------------------

    #[test]
    fn manhattan_distance_symmetric() {
        let a = Position::new(1, 2);
        let b = Position::new(4, 0);
        assert_eq!(a.manhattan_distance(&b), 5);
        assert_eq!(b.manhattan_distance(&a), 5);
    }

    #[test]
    fn offset_applies_deltas() {
        let p = Position::new(3, 3);
        assert_eq!(p.offset(-1, 0), Some(Position::new(2, 3)));
        assert_eq!(p.offset(0, 2), Some(Position::new(3, 5)));
    }

    #[test]
    fn parse_embedded_parentheses() {
        let p = Position::parse_embedded("an apple at position (3, 4)");
        assert_eq!(p, Some(Position::new(3, 4)));
    }

    #[test]
    fn parse_embedded_brackets() {
        let p = Position::parse_embedded("go to [10, 2]");
        assert_eq!(p, Some(Position::new(10, 2)));
    }

    #[test]
    fn parse_embedded_negative_coordinates() {
        let p = Position::parse_embedded("(-1, 7)");
        assert_eq!(p, Some(Position::new(-1, 7)));
    }

    #[test]
    fn parse_embedded_skips_malformed_pairs() {
        // The first group is not a coordinate pair; the second is.
        let p = Position::parse_embedded("(nearby) agent at (2, 2)");
        assert_eq!(p, Some(Position::new(2, 2)));
    }

    #[test]
    fn parse_embedded_none_when_absent() {
        assert_eq!(Position::parse_embedded("nothing to see here"), None);
        assert_eq!(Position::parse_embedded("(1, 2, 3)"), None);
    }

    // -----------------------------------------------------------------------
    // Orientation
    // -----------------------------------------------------------------------

    #[test]
    fn orientation_index_roundtrip() {
        for o in [
            Orientation::North,
            Orientation::East,
            Orientation::South,
            Orientation::West,
        ] {
            assert_eq!(Orientation::from_index(o.index()), o);
        }
    }

    #[test]
    fn rotations_compose_mod_four() {
        let mut o = Orientation::North;
        for _ in 0..4 {
            o = o.rotated_right();
        }
        assert_eq!(o, Orientation::North);
        assert_eq!(Orientation::North.rotated_left(), Orientation::West);
        assert_eq!(Orientation::West.rotated_right(), Orientation::North);
    }

    #[test]
    fn deltas_match_compass() {
        assert_eq!(Orientation::North.delta(), (-1, 0));
        assert_eq!(Orientation::South.delta(), (1, 0));
        assert_eq!(Orientation::East.delta(), (0, 1));
        assert_eq!(Orientation::West.delta(), (0, -1));
    }

    #[test]
    fn relative_to_quarter_turns() {
        // Facing East, a southward move is one right turn away.
        assert_eq!(Orientation::South.relative_to(Orientation::East), 1);
        // Facing East, a northward move is one left turn away.
        assert_eq!(Orientation::North.relative_to(Orientation::East), 3);
        // Same direction is forward.
        assert_eq!(Orientation::West.relative_to(Orientation::West), 0);
    }

    #[test]
    fn from_delta_rejects_non_unit() {
        assert_eq!(Orientation::from_delta(1, 0), Some(Orientation::South));
        assert_eq!(Orientation::from_delta(1, 1), None);
        assert_eq!(Orientation::from_delta(0, 0), None);
    }

    // -----------------------------------------------------------------------
    // Primitive steps
    // -----------------------------------------------------------------------

    #[test]
    fn step_wire_strings_roundtrip() {
        let all = [
            PrimitiveStep::MoveUp,
            PrimitiveStep::MoveDown,
            PrimitiveStep::MoveLeft,
            PrimitiveStep::MoveRight,
            PrimitiveStep::TurnLeft,
            PrimitiveStep::TurnRight,
            PrimitiveStep::Attack,
            PrimitiveStep::Clean,
            PrimitiveStep::StayPut,
        ];
        for step in all {
            assert_eq!(PrimitiveStep::parse(step.as_str()), Some(step));
        }
        assert_eq!(PrimitiveStep::parse("moonwalk"), None);
    }

    #[test]
    fn move_for_relative_covers_quadrants() {
        assert_eq!(PrimitiveStep::move_for_relative(0), PrimitiveStep::MoveUp);
        assert_eq!(PrimitiveStep::move_for_relative(1), PrimitiveStep::MoveRight);
        assert_eq!(PrimitiveStep::move_for_relative(2), PrimitiveStep::MoveDown);
        assert_eq!(PrimitiveStep::move_for_relative(3), PrimitiveStep::MoveLeft);
    }

    // -----------------------------------------------------------------------
    // Symbols
    // -----------------------------------------------------------------------

    #[test]
    fn symbol_predicates() {
        assert!(Symbol::UNKNOWN.is_unknown());
        assert!(!Symbol::FLOOR.is_unknown());
        assert!(Symbol::AGENT.is_agent());
        assert!(!Symbol::APPLE.is_agent());
    }

    #[test]
    fn symbol_char_roundtrip() {
        assert_eq!(Symbol::from('A'), Symbol::APPLE);
        assert_eq!(Symbol::WALL.as_char(), 'W');
    }
}
