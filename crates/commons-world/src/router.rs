//! BFS route planning over a partially-known symbol grid.
//!
//! [`route`] turns a start/end pair into a sequence of primitive steps.
//! The search is a plain breadth-first search over the 4-neighborhood
//! with cells whose symbol is in the hard `blocked` set treated as
//! impassable.
//!
//! # Two-phase fallback
//!
//! Some obstacles are only *probably* in the way -- another agent standing
//! in a corridor will usually have moved by the time the walker arrives.
//! The first search pass therefore also blocks the `optional_blocked`
//! symbols, preferring a fully unobstructed path. If that pass fails, a
//! lenient pass blocks only the hard set; the lenient result is then
//! patched by re-probing the strict search from progressively earlier
//! cells along the path (walking back from the destination) and splicing
//! the earliest strict sub-route onto the lenient prefix. When no strict
//! sub-route exists at any cut point the lenient path is returned
//! unmodified -- reachability beats strictness.
//!
//! # Egocentric output
//!
//! Movement steps are emitted relative to the walker's facing at planning
//! time: a global eastward move by a north-facing walker comes out as
//! [`PrimitiveStep::MoveRight`]. Moving never changes facing, so one
//! rotation applies to the whole sequence.
//!
//! Routing failures are never errors: an unreachable destination yields
//! an empty sequence and the caller decides what to do with the tick.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use commons_types::{Orientation, Position, PrimitiveStep, Symbol};

use crate::grid::Grid;

/// Parameters for one routing request.
#[derive(Debug, Clone)]
pub struct RouteQuery<'a> {
    /// Where the walker stands now.
    pub start: Position,
    /// The destination cell.
    pub end: Position,
    /// Symbols that are always impassable (e.g. walls).
    pub blocked: &'a [Symbol],
    /// Symbols avoided when possible but passable as a last resort
    /// (e.g. other agents).
    pub optional_blocked: &'a [Symbol],
    /// The walker's facing at planning time.
    pub orientation: Orientation,
    /// When `true`, append a trailing turn so the walker ends facing the
    /// direction of its last move. When `false`, append turns to face the
    /// destination cell instead (used for ranged interactions).
    pub reach_end: bool,
    /// When `false`, the final tile of the path is excluded from the walk
    /// (the walker stops one tile short of the destination).
    pub include_last_pos: bool,
}

/// Plan a route and translate it into primitive steps.
///
/// Returns exactly `[StayPut]` when `start == end`, and an empty sequence
/// when no path exists -- callers must treat the empty sequence as "no-op
/// this tick", never as an error.
pub fn route(grid: &Grid<Symbol>, query: &RouteQuery<'_>) -> Vec<PrimitiveStep> {
    if query.start == query.end {
        return vec![PrimitiveStep::StayPut];
    }

    let cells = match bfs_path(
        grid,
        query.start,
        query.end,
        query.blocked,
        query.optional_blocked,
    ) {
        Some(strict) => strict,
        None => {
            let Some(lenient) =
                bfs_path(grid, query.start, query.end, query.blocked, &[])
            else {
                return Vec::new();
            };
            patch_tail(grid, lenient, query)
        }
    };

    steps_from_cells(&cells, query)
}

/// Patch a lenient path by splicing in the earliest strict sub-route.
///
/// Walks backwards from the destination over the lenient cell sequence
/// and re-probes the strict (hard + optional blocked) search from each
/// cut point to the destination. Among the successful probes the one with
/// the earliest cut point wins, maximizing the strictly-valid portion of
/// the final path. With no successful probe the lenient path is returned
/// as found.
fn patch_tail(
    grid: &Grid<Symbol>,
    lenient: Vec<Position>,
    query: &RouteQuery<'_>,
) -> Vec<Position> {
    let len = lenient.len();
    if len < 3 {
        return lenient;
    }

    let mut best: Option<(usize, Vec<Position>)> = None;
    // Cut points run from the cell just before the destination back to
    // the cell just after the start (index 0 is the full strict search
    // that already failed).
    let mut i = len.saturating_sub(2);
    while i >= 1 {
        let Some(&cut) = lenient.get(i) else {
            break;
        };
        if let Some(strict_tail) = bfs_path(
            grid,
            cut,
            query.end,
            query.blocked,
            query.optional_blocked,
        ) {
            best = Some((i, strict_tail));
        }
        i = i.saturating_sub(1);
    }

    match best {
        Some((cut_index, strict_tail)) => {
            let mut spliced: Vec<Position> = lenient
                .get(..=cut_index)
                .unwrap_or(&[])
                .to_vec();
            spliced.extend(strict_tail.into_iter().skip(1));
            spliced
        }
        None => lenient,
    }
}

/// Breadth-first search over the 4-neighborhood.
///
/// Returns the full cell sequence from `start` to `end` inclusive, or
/// `None` when no path exists. The `soft` set is ignored for the
/// destination cell itself (a walker may plan *toward* an occupied cell);
/// the `hard` set is ignored only for the start cell (the walker's own
/// cell may carry an occupant marker).
fn bfs_path(
    grid: &Grid<Symbol>,
    start: Position,
    end: Position,
    hard: &[Symbol],
    soft: &[Symbol],
) -> Option<Vec<Position>> {
    if !grid.contains(start) || !grid.contains(end) {
        return None;
    }
    // A hard-blocked destination is unreachable by definition.
    if grid.get(end).is_some_and(|s| hard.contains(s)) {
        return None;
    }

    let mut prev: BTreeMap<Position, Position> = BTreeMap::new();
    let mut visited: BTreeSet<Position> = BTreeSet::new();
    let mut queue: VecDeque<Position> = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);

    'search: while let Some(current) = queue.pop_front() {
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
            if visited.contains(&neighbor) {
                continue;
            }
            let Some(&symbol) = grid.get(neighbor) else {
                continue;
            };
            if hard.contains(&symbol) {
                continue;
            }
            if neighbor != end && soft.contains(&symbol) {
                continue;
            }
            visited.insert(neighbor);
            prev.insert(neighbor, current);
            if neighbor == end {
                break 'search;
            }
            queue.push_back(neighbor);
        }
    }

    if !prev.contains_key(&end) {
        return None;
    }

    // Reconstruct via the predecessor table.
    let mut path = VecDeque::new();
    let mut current = end;
    path.push_front(current);
    while let Some(&predecessor) = prev.get(&current) {
        path.push_front(predecessor);
        current = predecessor;
        if current == start {
            break;
        }
    }

    Some(path.into_iter().collect())
}

/// Translate a cell sequence into egocentric primitive steps.
fn steps_from_cells(
    cells: &[Position],
    query: &RouteQuery<'_>,
) -> Vec<PrimitiveStep> {
    // Global move directions between consecutive cells.
    let mut directions: Vec<Orientation> = Vec::new();
    for pair in cells.windows(2) {
        let (Some(from), Some(to)) = (pair.first(), pair.get(1)) else {
            continue;
        };
        let dr = to.row.saturating_sub(from.row);
        let dc = to.col.saturating_sub(from.col);
        if let Some(direction) = Orientation::from_delta(dr, dc) {
            directions.push(direction);
        }
    }

    if !query.include_last_pos {
        directions.pop();
    }

    let mut steps: Vec<PrimitiveStep> = directions
        .iter()
        .map(|d| PrimitiveStep::move_for_relative(d.relative_to(query.orientation)))
        .collect();

    if query.reach_end {
        if let Some(last) = directions.last() {
            steps.extend(facing_fix(last.relative_to(query.orientation)));
        }
    } else {
        // Face the destination cell from wherever the walk stops.
        let standing = if query.include_last_pos {
            cells.last()
        } else {
            cells.get(cells.len().saturating_sub(2))
        };
        if let Some(&standing) = standing {
            let dr = query.end.row.saturating_sub(standing.row);
            let dc = query.end.col.saturating_sub(standing.col);
            if let Some(direction) = Orientation::from_delta(dr, dc) {
                steps.extend(facing_fix(direction.relative_to(query.orientation)));
            }
        }
    }

    steps
}

/// Turn sequence that rotates the walker by the given quarter-turn count.
///
/// Backward rotation uses two right turns; there is no "turn around"
/// primitive.
fn facing_fix(relative: u8) -> Vec<PrimitiveStep> {
    match relative % 4 {
        1 => vec![PrimitiveStep::TurnRight],
        2 => vec![PrimitiveStep::TurnRight, PrimitiveStep::TurnRight],
        3 => vec![PrimitiveStep::TurnLeft],
        _ => Vec::new(),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn open_grid(side: usize) -> Grid<Symbol> {
        Grid::filled(side, side, Symbol::FLOOR)
    }

    fn query<'a>(start: Position, end: Position) -> RouteQuery<'a> {
        RouteQuery {
            start,
            end,
            blocked: &[],
            optional_blocked: &[],
            orientation: Orientation::North,
            reach_end: true,
            include_last_pos: true,
        }
    }

    fn is_move(step: PrimitiveStep) -> bool {
        matches!(
            step,
            PrimitiveStep::MoveUp
                | PrimitiveStep::MoveDown
                | PrimitiveStep::MoveLeft
                | PrimitiveStep::MoveRight
        )
    }

    // -----------------------------------------------------------------------
    // Core search
    // -----------------------------------------------------------------------

    #[test]
    fn empty_grid_diagonal_route() {
        let grid = open_grid(3);
        let steps = route(&grid, &query(Position::new(0, 0), Position::new(2, 2)));

        let moves: Vec<PrimitiveStep> =
            steps.iter().copied().filter(|&s| is_move(s)).collect();
        assert_eq!(moves.len(), 4);
        let rights = moves
            .iter()
            .filter(|&&m| m == PrimitiveStep::MoveRight)
            .count();
        let downs = moves
            .iter()
            .filter(|&&m| m == PrimitiveStep::MoveDown)
            .count();
        assert_eq!(rights, 2);
        assert_eq!(downs, 2);

        // Moves first, then only orientation-fix turns.
        let tail: Vec<PrimitiveStep> =
            steps.iter().copied().skip(4).collect();
        assert!(!tail.is_empty());
        assert!(tail.iter().all(|s| matches!(
            s,
            PrimitiveStep::TurnLeft | PrimitiveStep::TurnRight
        )));
    }

    #[test]
    fn same_start_and_end_stays_put() {
        let grid = open_grid(3);
        let p = Position::new(1, 1);
        let steps = route(&grid, &query(p, p));
        assert_eq!(steps, vec![PrimitiveStep::StayPut]);
    }

    #[test]
    fn fully_blocked_grid_returns_empty() {
        let mut grid = open_grid(3);
        // Wall off the middle row entirely.
        for col in 0..3 {
            grid.set(Position::new(1, col), Symbol::WALL);
        }
        let mut q = query(Position::new(0, 0), Position::new(2, 2));
        q.blocked = &[Symbol::WALL];
        let steps = route(&grid, &q);
        assert!(steps.is_empty());
    }

    #[test]
    fn hard_blocked_destination_returns_empty() {
        let mut grid = open_grid(3);
        grid.set(Position::new(2, 2), Symbol::WALL);
        let mut q = query(Position::new(0, 0), Position::new(2, 2));
        q.blocked = &[Symbol::WALL];
        assert!(route(&grid, &q).is_empty());
    }

    #[test]
    fn out_of_bounds_endpoints_return_empty() {
        let grid = open_grid(3);
        assert!(route(&grid, &query(Position::new(0, 0), Position::new(9, 9))).is_empty());
        assert!(route(&grid, &query(Position::new(-1, 0), Position::new(2, 2))).is_empty());
    }

    #[test]
    fn route_respects_walls() {
        // Corridor: walker must go around the wall at (1,1).
        let mut grid = open_grid(3);
        grid.set(Position::new(1, 1), Symbol::WALL);
        let mut q = query(Position::new(1, 0), Position::new(1, 2));
        q.blocked = &[Symbol::WALL];
        let steps = route(&grid, &q);
        let moves = steps.iter().filter(|&&s| is_move(s)).count();
        // Detour is 4 moves instead of the straight-line 2.
        assert_eq!(moves, 4);
    }

    // -----------------------------------------------------------------------
    // Egocentric rotation
    // -----------------------------------------------------------------------

    #[test]
    fn steps_are_rotated_into_walker_frame() {
        let grid = open_grid(3);
        // Two cells east of the walker; facing East that is straight ahead.
        let mut q = query(Position::new(0, 0), Position::new(0, 2));
        q.orientation = Orientation::East;
        let steps = route(&grid, &q);
        assert_eq!(
            steps,
            vec![PrimitiveStep::MoveUp, PrimitiveStep::MoveUp]
        );
    }

    #[test]
    fn forward_moves_get_no_trailing_turn() {
        let grid = open_grid(3);
        // Straight south while facing South: all forward, no fix needed.
        let mut q = query(Position::new(0, 1), Position::new(2, 1));
        q.orientation = Orientation::South;
        let steps = route(&grid, &q);
        assert_eq!(
            steps,
            vec![PrimitiveStep::MoveUp, PrimitiveStep::MoveUp]
        );
    }

    #[test]
    fn backward_final_move_turns_right_twice() {
        let grid = open_grid(3);
        // Straight south while facing North: every move is backward.
        let q = query(Position::new(0, 1), Position::new(2, 1));
        let steps = route(&grid, &q);
        assert_eq!(
            steps,
            vec![
                PrimitiveStep::MoveDown,
                PrimitiveStep::MoveDown,
                PrimitiveStep::TurnRight,
                PrimitiveStep::TurnRight,
            ]
        );
    }

    // -----------------------------------------------------------------------
    // Ranged interactions (reach_end = false, include_last_pos = false)
    // -----------------------------------------------------------------------

    #[test]
    fn stop_short_and_face_target() {
        let grid = open_grid(3);
        let mut q = query(Position::new(0, 0), Position::new(0, 2));
        q.reach_end = false;
        q.include_last_pos = false;
        let steps = route(&grid, &q);
        // One move east (stopping at (0,1)), then turn right to face the
        // target at (0,2) while facing North.
        assert_eq!(
            steps,
            vec![PrimitiveStep::MoveRight, PrimitiveStep::TurnRight]
        );
    }

    #[test]
    fn adjacent_target_only_turns() {
        let grid = open_grid(3);
        let mut q = query(Position::new(1, 1), Position::new(2, 1));
        q.reach_end = false;
        q.include_last_pos = false;
        let steps = route(&grid, &q);
        // Already adjacent: no move, two right turns to face south.
        assert_eq!(
            steps,
            vec![PrimitiveStep::TurnRight, PrimitiveStep::TurnRight]
        );
    }

    // -----------------------------------------------------------------------
    // Two-phase fallback
    // -----------------------------------------------------------------------

    #[test]
    fn strict_phase_avoids_optional_obstacles() {
        // An agent sits on the straight-line path; a clear detour exists.
        let mut grid = open_grid(3);
        grid.set(Position::new(1, 1), Symbol::AGENT);
        let mut q = query(Position::new(1, 0), Position::new(1, 2));
        q.optional_blocked = &[Symbol::AGENT];
        let steps = route(&grid, &q);
        let moves = steps.iter().filter(|&&s| is_move(s)).count();
        // Took the 4-move detour rather than walking through the agent.
        assert_eq!(moves, 4);
    }

    #[test]
    fn lenient_phase_walks_through_optional_when_unavoidable() {
        // 1x3 corridor with an agent in the middle: no strict path.
        let mut grid = Grid::filled(1, 3, Symbol::FLOOR);
        grid.set(Position::new(0, 1), Symbol::AGENT);
        let mut q = query(Position::new(0, 0), Position::new(0, 2));
        q.optional_blocked = &[Symbol::AGENT];
        let steps = route(&grid, &q);
        let moves = steps.iter().filter(|&&s| is_move(s)).count();
        assert_eq!(moves, 2);
    }

    #[test]
    fn tail_patch_reroutes_after_unavoidable_cell() {
        // Column 1 is fully occupied by agents, so every path crosses one;
        // after crossing, the strict search can still finish cleanly.
        let mut grid = open_grid(3);
        for row in 0..3 {
            grid.set(Position::new(row, 1), Symbol::AGENT);
        }
        let mut q = query(Position::new(1, 0), Position::new(1, 2));
        q.optional_blocked = &[Symbol::AGENT];
        let steps = route(&grid, &q);
        // Still reaches: 2 moves through the agent column.
        let moves = steps.iter().filter(|&&s| is_move(s)).count();
        assert_eq!(moves, 2);
    }

    #[test]
    fn optional_blocked_destination_is_still_reachable() {
        // Attack-style query: destination is an agent cell.
        let mut grid = open_grid(3);
        grid.set(Position::new(0, 2), Symbol::AGENT);
        let mut q = query(Position::new(0, 0), Position::new(0, 2));
        q.optional_blocked = &[Symbol::AGENT];
        q.reach_end = false;
        q.include_last_pos = false;
        let steps = route(&grid, &q);
        assert_eq!(
            steps,
            vec![PrimitiveStep::MoveRight, PrimitiveStep::TurnRight]
        );
    }
}
