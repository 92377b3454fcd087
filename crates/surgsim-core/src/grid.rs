//! Fixed-extent uniform grid mapping 3D space onto a flat cell array.

use crate::error::ConfigError;
use crate::math::{Real, Vec3d};

/// Uniform spatial grid storing one `CellData` per cell.
///
/// The grid covers `[lower, upper)` with cubic cells of edge `cell_size`;
/// the per-axis resolution is `ceil((upper - lower) / cell_size)`. The
/// semantics of `CellData` are up to the owner — the neighbor search stores
/// a locked index list, other callers may store anything `Default`.
///
/// Looking up a point outside the configured extent is a programmer error:
/// it is caught by debug assertions and undefined in release builds. Callers
/// must re-initialize the grid before querying points beyond the extent.
pub struct UniformSpatialGrid<CellData> {
    lower: Vec3d,
    upper: Vec3d,
    cell_size: Real,
    inv_cell_size: Real,
    resolution: [u32; 3],
    num_cells: usize,
    cells: Vec<CellData>,
}

impl<CellData: Default> UniformSpatialGrid<CellData> {
    /// Grid over `[lower, upper)` with the given cell edge length.
    pub fn new(lower: Vec3d, upper: Vec3d, cell_size: Real) -> Result<Self, ConfigError> {
        let mut grid = Self {
            lower: Vec3d::ZERO,
            upper: Vec3d::ZERO,
            cell_size: 1.0,
            inv_cell_size: 1.0,
            resolution: [0; 3],
            num_cells: 0,
            cells: Vec::new(),
        };
        grid.initialize(lower, upper, cell_size)?;
        Ok(grid)
    }

    /// Re-extent the grid. All cell data is reset to `CellData::default()`.
    pub fn initialize(
        &mut self,
        lower: Vec3d,
        upper: Vec3d,
        cell_size: Real,
    ) -> Result<(), ConfigError> {
        if cell_size <= 0.0 {
            return Err(ConfigError::NonPositiveCellSize(cell_size));
        }

        let mut resolution = [0u32; 3];
        let mut num_cells = 1usize;
        for axis in 0..3 {
            let extent = upper[axis] - lower[axis];
            let cells = (extent / cell_size).ceil();
            if cells <= 0.0 {
                return Err(ConfigError::EmptyGridAxis {
                    axis,
                    lower: lower[axis],
                    upper: upper[axis],
                    cell_size,
                });
            }
            resolution[axis] = cells as u32;
            num_cells *= resolution[axis] as usize;
        }

        self.lower = lower;
        self.upper = upper;
        self.cell_size = cell_size;
        self.inv_cell_size = 1.0 / cell_size;
        self.resolution = resolution;
        self.num_cells = num_cells;

        self.cells.clear();
        self.cells.resize_with(num_cells, CellData::default);
        Ok(())
    }

    pub fn lower_corner(&self) -> Vec3d {
        self.lower
    }

    pub fn upper_corner(&self) -> Vec3d {
        self.upper
    }

    pub fn cell_size(&self) -> Real {
        self.cell_size
    }

    /// Number of cells in x/y/z.
    pub fn resolution(&self) -> [u32; 3] {
        self.resolution
    }

    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    /// Integer cell coordinates of a position (may be out of range for
    /// points outside the extent; check with [`Self::is_valid_cell_indices`]).
    #[inline]
    pub fn cell_index(&self, position: Vec3d) -> [i32; 3] {
        [
            ((position.x - self.lower.x) * self.inv_cell_size).floor() as i32,
            ((position.y - self.lower.y) * self.inv_cell_size).floor() as i32,
            ((position.z - self.lower.z) * self.inv_cell_size).floor() as i32,
        ]
    }

    /// Whether `idx` is a valid cell coordinate along `axis`.
    #[inline]
    pub fn is_valid_cell_index(&self, axis: usize, idx: i32) -> bool {
        idx >= 0 && (idx as u32) < self.resolution[axis]
    }

    /// Whether all three cell coordinates are in range.
    #[inline]
    pub fn is_valid_cell_indices(&self, idx: [i32; 3]) -> bool {
        self.is_valid_cell_index(0, idx[0])
            && self.is_valid_cell_index(1, idx[1])
            && self.is_valid_cell_index(2, idx[2])
    }

    /// Linearized index of the cell `(i, j, k)`.
    #[inline]
    pub fn flat_index(&self, i: i32, j: i32, k: i32) -> usize {
        debug_assert!(
            self.is_valid_cell_indices([i, j, k]),
            "cell index ({i}, {j}, {k}) out of range {:?}",
            self.resolution
        );
        (k as usize * self.resolution[1] as usize + j as usize) * self.resolution[0] as usize
            + i as usize
    }

    /// Cell payload at integer coordinates.
    #[inline]
    pub fn cell_data(&self, i: i32, j: i32, k: i32) -> &CellData {
        &self.cells[self.flat_index(i, j, k)]
    }

    #[inline]
    pub fn cell_data_mut(&mut self, i: i32, j: i32, k: i32) -> &mut CellData {
        let idx = self.flat_index(i, j, k);
        &mut self.cells[idx]
    }

    /// Cell payload containing the position. The position must be inside
    /// the grid extent.
    #[inline]
    pub fn cell_data_at(&self, position: Vec3d) -> &CellData {
        let idx = self.cell_index(position);
        self.cell_data(idx[0], idx[1], idx[2])
    }

    /// All cell payloads in flat-index order.
    pub fn all_cell_data(&self) -> &[CellData] {
        &self.cells
    }

    pub fn all_cell_data_mut(&mut self) -> &mut [CellData] {
        &mut self.cells
    }
}
