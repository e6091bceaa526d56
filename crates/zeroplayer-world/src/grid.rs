//! Location grids, cells, and relative shift patterns.
//!
//! Every location owns a rectangular [`Grid`] of cells, each holding at most
//! one entity. Coordinates handed to the grid are always clamped into
//! bounds rather than rejected, so movement and spawn targets computed near
//! an edge land on the edge.

use rand::Rng;
use serde::{Deserialize, Serialize};
use zeroplayer_types::EntityId;

use crate::error::WorldError;

/// A cell coordinate on a location grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Column, `0..width`.
    pub x: u32,
    /// Row, `0..height`.
    pub y: u32,
}

impl Cell {
    /// Create a cell coordinate.
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance between two cells.
    pub fn distance(self, other: Self) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.hypot(dy)
    }

    /// Unclamped coordinate of this cell shifted by `(dx, dy)`.
    pub fn shifted(self, (dx, dy): (i64, i64)) -> (i64, i64) {
        (
            i64::from(self.x).saturating_add(dx),
            i64::from(self.y).saturating_add(dy),
        )
    }
}

impl core::fmt::Display for Cell {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Rectangular occupancy map of a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
    /// Row-major occupancy, `y * width + x`.
    cells: Vec<Option<EntityId>>,
}

impl Grid {
    /// Create an empty grid.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] if either side is zero or
    /// the cell count does not fit in memory.
    pub fn new(width: u32, height: u32) -> Result<Self, WorldError> {
        let invalid = || WorldError::InvalidDimensions { width, height };
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        let count = usize::try_from(width)
            .ok()
            .zip(usize::try_from(height).ok())
            .and_then(|(w, h)| w.checked_mul(h))
            .ok_or_else(invalid)?;
        Ok(Self {
            width,
            height,
            cells: vec![None; count],
        })
    }

    /// Grid width in cells.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Clamp an arbitrary coordinate into the grid.
    pub fn clamp(&self, x: i64, y: i64) -> Cell {
        let max_x = i64::from(self.width.saturating_sub(1));
        let max_y = i64::from(self.height.saturating_sub(1));
        Cell {
            x: u32::try_from(x.clamp(0, max_x)).unwrap_or(0),
            y: u32::try_from(y.clamp(0, max_y)).unwrap_or(0),
        }
    }

    /// Whether `cell` lies inside the grid.
    pub const fn contains(&self, cell: Cell) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.y).ok()?;
        let col = usize::try_from(cell.x).ok()?;
        let width = usize::try_from(self.width).ok()?;
        row.checked_mul(width)?.checked_add(col)
    }

    /// The entity occupying `cell`, if any.
    pub fn occupant(&self, cell: Cell) -> Option<EntityId> {
        self.index(cell)
            .and_then(|i| self.cells.get(i))
            .copied()
            .flatten()
    }

    /// Whether `cell` is inside the grid and unoccupied.
    pub fn is_free(&self, cell: Cell) -> bool {
        self.contains(cell) && self.occupant(cell).is_none()
    }

    pub(crate) fn occupy(&mut self, cell: Cell, entity: EntityId) {
        if let Some(slot) = self.index(cell).and_then(|i| self.cells.get_mut(i)) {
            *slot = Some(entity);
        }
    }

    /// Clear `cell` if it is held by `entity`.
    pub(crate) fn vacate(&mut self, cell: Cell, entity: EntityId) {
        if let Some(slot) = self.index(cell).and_then(|i| self.cells.get_mut(i)) {
            if *slot == Some(entity) {
                *slot = None;
            }
        }
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Cell::new(x, y)))
    }

    /// Occupied cells with their occupants, in row-major order.
    pub fn occupied(&self) -> impl Iterator<Item = (Cell, EntityId)> + '_ {
        self.cells()
            .filter_map(|cell| self.occupant(cell).map(|id| (cell, id)))
    }

    /// Unoccupied cells in row-major order.
    pub fn free_cells(&self) -> Vec<Cell> {
        self.cells().filter(|cell| self.is_free(*cell)).collect()
    }

    /// A uniformly random cell, occupied or not.
    pub fn random_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Cell {
        Cell {
            x: rng.random_range(0..self.width),
            y: rng.random_range(0..self.height),
        }
    }

    /// Cells reached from `origin` through `shifts`, clamped into bounds.
    pub fn destinations(&self, origin: Cell, shifts: &[(i64, i64)]) -> Vec<Cell> {
        shifts
            .iter()
            .map(|&shift| {
                let (x, y) = origin.shifted(shift);
                self.clamp(x, y)
            })
            .collect()
    }
}

/// Per-tick movement options of a movable entity.
///
/// Every pattern starts with "stay", so an entity surrounded on all sides
/// simply keeps its cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftPattern {
    /// Stay, left, right, up, down.
    #[default]
    Cardinal,
    /// Stay, then every offset within a square of the given radius.
    Square {
        /// Largest offset on either axis.
        radius: u32,
    },
}

impl ShiftPattern {
    /// The relative shifts in enumeration order; ties between equally good
    /// destinations resolve to the earliest entry.
    pub fn shifts(self) -> Vec<(i64, i64)> {
        match self {
            Self::Cardinal => vec![(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1)],
            Self::Square { radius } => {
                let mut shifts = vec![(0, 0)];
                shifts.extend(square_shifts(radius));
                shifts
            }
        }
    }
}

/// Every offset within `radius` on both axes, excluding `(0, 0)`, with `dx`
/// as the outer loop.
pub fn square_shifts(radius: u32) -> Vec<(i64, i64)> {
    let r = i64::from(radius);
    let mut shifts = Vec::new();
    for dx in -r..=r {
        for dy in -r..=r {
            if dx != 0 || dy != 0 {
                shifts.push((dx, dy));
            }
        }
    }
    shifts
}
