//! # Level Grids
//!
//! Fixed-size row-major grids for terrain cells and per-cell boolean masks.

use super::{Position, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Terrain cell kinds a generated level is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TerrainKind {
    /// Solid rock
    #[default]
    Wall,
    /// Open ground
    Floor,
    /// Passable vegetation that blocks sight
    Foliage,
    /// Passable debris
    Rubble,
    /// Impassable wall that can be seen through
    TranslucentWall,
}

impl TerrainKind {
    /// Returns whether creatures can walk on this kind of cell.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::TerrainKind;
    ///
    /// assert!(TerrainKind::Foliage.is_passable());
    /// assert!(!TerrainKind::TranslucentWall.is_passable());
    /// ```
    pub fn is_passable(self) -> bool {
        matches!(
            self,
            TerrainKind::Floor | TerrainKind::Foliage | TerrainKind::Rubble
        )
    }

    /// Character used for ASCII dumps of a level.
    pub fn glyph(self) -> char {
        match self {
            TerrainKind::Wall => '#',
            TerrainKind::Floor => '.',
            TerrainKind::Foliage => '"',
            TerrainKind::Rubble => ':',
            TerrainKind::TranslucentWall => 'W',
        }
    }
}

/// A fixed-size two-dimensional grid stored row by row.
///
/// Indexing with a [`Position`] panics when it lies outside the grid; use
/// [`Grid::get`] for checked access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: i32,
    height: i32,
    cells: Vec<T>,
}

/// The terrain layer of a level.
pub type TerrainGrid = Grid<TerrainKind>;

/// A per-cell flag layer (vault footprints, tunnels, scratch visits).
pub type Mask = Grid<bool>;

impl<T: Clone> Grid<T> {
    /// Creates a grid with every cell set to `fill`.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{Grid, Position, TerrainKind};
    ///
    /// let grid = Grid::new(80, 21, TerrainKind::Wall);
    /// assert_eq!(grid.width(), 80);
    /// assert_eq!(grid[Position::new(79, 20)], TerrainKind::Wall);
    /// ```
    pub fn new(width: i32, height: i32, fill: T) -> Self {
        let len = (width.max(0) * height.max(0)) as usize;
        Self {
            width,
            height,
            cells: vec![fill; len],
        }
    }
}

impl<T> Grid<T> {
    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The rectangle covering the whole grid.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// Checks whether a position lies inside the grid.
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    /// Checks whether a position lies on the outermost ring of the grid.
    pub fn on_border(&self, pos: Position) -> bool {
        self.in_bounds(pos)
            && (pos.x == 0 || pos.y == 0 || pos.x == self.width - 1 || pos.y == self.height - 1)
    }

    fn index_of(&self, pos: Position) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| (pos.y * self.width + pos.x) as usize)
    }

    /// Gets a reference to a cell, or `None` outside the grid.
    pub fn get(&self, pos: Position) -> Option<&T> {
        self.index_of(pos).map(|index| &self.cells[index])
    }

    /// Gets a mutable reference to a cell, or `None` outside the grid.
    pub fn get_mut(&mut self, pos: Position) -> Option<&mut T> {
        self.index_of(pos).map(move |index| &mut self.cells[index])
    }

    /// Iterates over every position of the grid, row by row.
    pub fn positions(&self) -> impl Iterator<Item = Position> {
        self.bounds().positions()
    }

    /// Iterates over `(position, cell)` pairs, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &T)> + '_ {
        self.positions().zip(self.cells.iter())
    }

    /// Counts cells matching a predicate.
    pub fn count_where(&self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        self.cells.iter().filter(|cell| predicate(cell)).count()
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    fn index(&self, pos: Position) -> &T {
        match self.index_of(pos) {
            Some(index) => &self.cells[index],
            None => panic!(
                "position {:?} outside {}x{} grid",
                pos, self.width, self.height
            ),
        }
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    fn index_mut(&mut self, pos: Position) -> &mut T {
        match self.index_of(pos) {
            Some(index) => &mut self.cells[index],
            None => panic!(
                "position {:?} outside {}x{} grid",
                pos, self.width, self.height
            ),
        }
    }
}

impl Grid<TerrainKind> {
    /// Returns whether the cell is inside the grid and passable.
    pub fn is_passable(&self, pos: Position) -> bool {
        self.get(pos).is_some_and(|kind| kind.is_passable())
    }

    /// Counts passable cells.
    pub fn passable_count(&self) -> usize {
        self.count_where(|kind| kind.is_passable())
    }
}

impl Grid<bool> {
    /// Returns whether the flag is set; positions outside the grid are unset.
    pub fn is_set(&self, pos: Position) -> bool {
        self.get(pos).copied().unwrap_or(false)
    }

    /// Positions of every set flag, row by row.
    pub fn set_positions(&self) -> Vec<Position> {
        self.iter()
            .filter(|(_, &flag)| flag)
            .map(|(pos, _)| pos)
            .collect()
    }
}

impl fmt::Display for Grid<TerrainKind> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.width.max(1) as usize) {
            let line: String = row.iter().map(|kind| kind.glyph()).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_indexing_is_row_major() {
        let mut grid = Grid::new(4, 3, 0u8);
        grid[Position::new(3, 1)] = 7;
        assert_eq!(grid.get(Position::new(3, 1)), Some(&7));
        assert_eq!(grid.iter().position(|(_, &v)| v == 7), Some(7));
        assert_eq!(grid.get(Position::new(4, 1)), None);
        assert_eq!(grid.get(Position::new(-1, 0)), None);
    }

    #[test]
    fn test_border_detection() {
        let grid = Grid::new(5, 4, TerrainKind::Wall);
        assert!(grid.on_border(Position::new(0, 2)));
        assert!(grid.on_border(Position::new(4, 3)));
        assert!(!grid.on_border(Position::new(2, 2)));
        assert!(!grid.on_border(Position::new(5, 2)));
    }

    #[test]
    fn test_passable_helpers() {
        let mut grid = Grid::new(3, 3, TerrainKind::Wall);
        grid[Position::new(1, 1)] = TerrainKind::Rubble;
        grid[Position::new(2, 1)] = TerrainKind::TranslucentWall;
        assert!(grid.is_passable(Position::new(1, 1)));
        assert!(!grid.is_passable(Position::new(2, 1)));
        assert!(!grid.is_passable(Position::new(9, 9)));
        assert_eq!(grid.passable_count(), 1);
    }

    #[test]
    fn test_display_renders_rows() {
        let mut grid = Grid::new(3, 2, TerrainKind::Wall);
        grid[Position::new(1, 0)] = TerrainKind::Floor;
        grid[Position::new(2, 1)] = TerrainKind::Foliage;
        assert_eq!(grid.to_string(), "#.#\n##\"\n");
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_out_of_bounds_index_panics() {
        let grid = Grid::new(2, 2, false);
        let _ = grid[Position::new(2, 0)];
    }
}
