//! Uniform spatial hash for neighbor queries
//!
//! Fixed-size flat arrays sized from the arena, rebuilt every tick with no
//! allocation. Each cell holds at most `max_per_cell` particle indices;
//! particles landing in a full cell are left out of that cell for the tick.

use glam::Vec2;

/// Upper bound on cells along one axis; positions past it share the edge cells
const MAX_CELLS_PER_AXIS: usize = 512;

/// Spatial hash grid over the arena
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    cols: usize,
    rows: usize,
    max_per_cell: usize,
    /// `cols * rows * max_per_cell` slot indices
    slots: Vec<u32>,
    /// Occupant count per cell
    counts: Vec<u32>,
}

impl SpatialGrid {
    pub fn new(width: f32, height: f32, cell_size: f32, max_per_cell: usize) -> Self {
        let mut grid = Self {
            cell_size,
            cols: 0,
            rows: 0,
            max_per_cell: max_per_cell.max(1),
            slots: Vec::new(),
            counts: Vec::new(),
        };
        grid.resize(width, height);
        grid
    }

    /// Resize to cover a new arena; contents are discarded
    pub fn resize(&mut self, width: f32, height: f32) {
        let span = |extent: f32| {
            // NaN and negative extents saturate to 0
            let cells = (extent / self.cell_size).ceil() as usize;
            cells.min(MAX_CELLS_PER_AXIS) + 1
        };
        self.cols = span(width);
        self.rows = span(height);
        let cells = self.cols * self.rows;
        self.slots = vec![0; cells * self.max_per_cell];
        self.counts = vec![0; cells];
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn clear(&mut self) {
        self.counts.fill(0);
    }

    /// Cell coordinate of a position, clamped into the grid
    #[inline]
    pub fn cell_of(&self, pos: Vec2) -> (usize, usize) {
        // `as usize` saturates negatives and NaN to 0
        let col = ((pos.x / self.cell_size) as usize).min(self.cols - 1);
        let row = ((pos.y / self.cell_size) as usize).min(self.rows - 1);
        (col, row)
    }

    /// Add a particle; returns false when its cell is already full
    #[inline]
    pub fn insert(&mut self, index: u32, pos: Vec2) -> bool {
        let (col, row) = self.cell_of(pos);
        let cell = row * self.cols + col;
        let count = self.counts[cell] as usize;
        if count >= self.max_per_cell {
            return false;
        }
        self.slots[cell * self.max_per_cell + count] = index;
        self.counts[cell] += 1;
        true
    }

    /// Occupants of one cell
    #[inline]
    pub fn cell(&self, col: usize, row: usize) -> &[u32] {
        let cell = row * self.cols + col;
        let start = cell * self.max_per_cell;
        &self.slots[start..start + self.counts[cell] as usize]
    }

    /// Occupants of the 3x3 block of cells around `(col, row)`
    pub fn neighborhood(&self, col: usize, row: usize) -> impl Iterator<Item = u32> + '_ {
        let col_range = col.saturating_sub(1)..=(col + 1).min(self.cols - 1);
        let row_range = row.saturating_sub(1)..=(row + 1).min(self.rows - 1);
        row_range.flat_map(move |r| {
            col_range
                .clone()
                .flat_map(move |c| self.cell(c, r).iter().copied())
        })
    }
}
