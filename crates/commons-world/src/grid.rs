//! Rectangular grids addressed by [`Position`].
//!
//! [`Grid`] is the shared container for everything cell-shaped in this
//! crate: symbol maps (the scenario map, an agent's known map), timestamp
//! maps, and update-frequency counters. Storage is a flat row-major
//! vector; all access is bounds-checked and out-of-range addresses simply
//! return `None` rather than erroring, because frame transforms routinely
//! produce positions outside the map.

use commons_types::{Position, Symbol};

use crate::error::WorldError;

/// A rectangular grid of cells addressed by global `(row, col)` positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    cells: Vec<T>,
    height: usize,
    width: usize,
}

impl<T: Clone> Grid<T> {
    /// Create a grid of the given extent with every cell set to `fill`.
    pub fn filled(height: usize, width: usize, fill: T) -> Self {
        Self {
            cells: vec![fill; height.saturating_mul(width)],
            height,
            width,
        }
    }

    /// Number of rows.
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Number of columns.
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Whether a position lies inside the grid extent.
    pub fn contains(&self, pos: Position) -> bool {
        self.index_of(pos).is_some()
    }

    /// Read the cell at `pos`, or `None` when out of range.
    pub fn get(&self, pos: Position) -> Option<&T> {
        self.index_of(pos).and_then(|i| self.cells.get(i))
    }

    /// Write the cell at `pos`. Returns `false` (and does nothing) when
    /// the position is out of range.
    pub fn set(&mut self, pos: Position, value: T) -> bool {
        let Some(i) = self.index_of(pos) else {
            return false;
        };
        match self.cells.get_mut(i) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// All positions of the grid in row-major order.
    pub fn positions(&self) -> Vec<Position> {
        let mut out = Vec::with_capacity(self.cells.len());
        for row in 0..self.height {
            for col in 0..self.width {
                if let (Ok(r), Ok(c)) = (i32::try_from(row), i32::try_from(col)) {
                    out.push(Position::new(r, c));
                }
            }
        }
        out
    }

    /// Flat row-major index for a position, if in range.
    fn index_of(&self, pos: Position) -> Option<usize> {
        let row = usize::try_from(pos.row).ok()?;
        let col = usize::try_from(pos.col).ok()?;
        if row >= self.height || col >= self.width {
            return None;
        }
        row.checked_mul(self.width)?.checked_add(col)
    }
}

impl Grid<Symbol> {
    /// Parse an ascii map into a symbol grid.
    ///
    /// Rows are newline-separated; short rows are padded on the right with
    /// [`Symbol::OUT_OF_BOUNDS`] so ragged observation windows parse
    /// cleanly.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::MalformedMap`] when the text contains no rows.
    pub fn from_ascii(text: &str) -> Result<Self, WorldError> {
        let rows: Vec<&str> = text
            .split('\n')
            .map(|r| r.strip_suffix('\r').unwrap_or(r))
            .collect();
        let rows: Vec<&str> = match (rows.first(), rows.last()) {
            // Tolerate a single trailing newline.
            (_, Some(&"")) if rows.len() > 1 => {
                rows.get(..rows.len().saturating_sub(1))
                    .unwrap_or(&[])
                    .to_vec()
            }
            _ => rows,
        };

        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        if rows.is_empty() || width == 0 {
            return Err(WorldError::MalformedMap {
                reason: String::from("map text has no cells"),
            });
        }

        let mut cells = Vec::with_capacity(rows.len().saturating_mul(width));
        for row in &rows {
            let mut count = 0_usize;
            for c in row.chars() {
                cells.push(Symbol::from(c));
                count = count.saturating_add(1);
            }
            while count < width {
                cells.push(Symbol::OUT_OF_BOUNDS);
                count = count.saturating_add(1);
            }
        }

        Ok(Self {
            cells,
            height: rows.len(),
            width,
        })
    }

    /// Render the grid back to newline-separated ascii.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity(
            self.cells.len().saturating_add(self.height),
        );
        for (i, cell) in self.cells.iter().enumerate() {
            if i > 0 && i % self.width.max(1) == 0 {
                out.push('\n');
            }
            out.push(cell.as_char());
        }
        out
    }
}

// ===========================================================================
// Tests
// ===========================================================================
