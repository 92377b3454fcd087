//! Fixed-radius neighbor search over point sets.
//!
//! Two interchangeable backends: a uniform grid rebuilt per query batch, and
//! the separate-chaining spatial hash. Both write, for each point `p` of set
//! A, the indices `q` of set B with `|A[p] - B[q]| < radius`. When A and B
//! are the same array the point itself may appear in its own list; filtering
//! self-pairs is the caller's convention. Ordering within a result list is
//! implementation defined — sort before comparing.

use std::sync::Mutex;

use crate::error::ConfigError;
use crate::grid::UniformSpatialGrid;
use crate::math::{Real, Vec3d};
use crate::parallel;
use crate::spatial_hash::SpatialHashTableSeparateChaining;

/// Backend selection, fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    UniformGridBasedSearch,
    SpatialHashing,
}

/// Per-cell payload of the search grid: an index list behind its own lock.
///
/// The lock is held only for the single push during the parallel fill; the
/// collection pass runs after the fill barrier and takes it uncontended.
#[derive(Default)]
pub struct CellIndexList {
    indices: Mutex<Vec<usize>>,
}

/// Grid-backed fixed-radius search.
///
/// The grid extent is derived per call from the bounding box of set B,
/// expanded by a tenth of the radius to absorb round-off on the upper corner.
pub struct GridBasedNeighborSearch {
    radius: Real,
    radius_sqr: Real,
    grid: UniformSpatialGrid<CellIndexList>,
}

impl GridBasedNeighborSearch {
    pub fn new(radius: Real) -> Result<Self, ConfigError> {
        if radius <= 0.0 {
            return Err(ConfigError::NonPositiveSearchRadius(radius));
        }
        Ok(Self {
            radius,
            radius_sqr: radius * radius,
            grid: UniformSpatialGrid::new(Vec3d::ZERO, Vec3d::ONE, 1.0)?,
        })
    }

    pub fn set_search_radius(&mut self, radius: Real) -> Result<(), ConfigError> {
        if radius <= 0.0 {
            return Err(ConfigError::NonPositiveSearchRadius(radius));
        }
        self.radius = radius;
        self.radius_sqr = radius * radius;
        Ok(())
    }

    /// For each point of `set_a`, collect the indices of `set_b` within the
    /// search radius. Previous contents of the result lists are discarded.
    pub fn get_neighbors(
        &mut self,
        result: &mut Vec<Vec<usize>>,
        set_a: &[Vec3d],
        set_b: &[Vec3d],
    ) {
        if set_a.is_empty() || set_b.is_empty() {
            result.resize_with(set_a.len(), Vec::new);
            for list in result.iter_mut() {
                list.clear();
            }
            return;
        }

        let (lower, mut upper) = parallel::find_aabb(set_b);
        upper += Vec3d::splat(self.radius) * 0.1;

        self.grid
            .initialize(lower, upper, self.radius)
            .expect("search AABB always spans at least one cell");

        // Fill buckets in parallel; each push holds only its own cell's lock.
        let grid = &self.grid;
        parallel::parallel_for(set_b.len(), |q| {
            let cell = grid.cell_data_at(set_b[q]);
            cell.indices.lock().unwrap().push(q);
        });

        // Collect neighbors per query point over the 3x3x3 cell block.
        let radius_sqr = self.radius_sqr;
        let lists = parallel::parallel_map(set_a.len(), |p| {
            let mut neighbors = Vec::new();
            let ppos = set_a[p];
            let cell_idx = grid.cell_index(ppos);
            for dk in -1..=1 {
                let k = cell_idx[2] + dk;
                if !grid.is_valid_cell_index(2, k) {
                    continue;
                }
                for dj in -1..=1 {
                    let j = cell_idx[1] + dj;
                    if !grid.is_valid_cell_index(1, j) {
                        continue;
                    }
                    for di in -1..=1 {
                        let i = cell_idx[0] + di;
                        if !grid.is_valid_cell_index(0, i) {
                            continue;
                        }
                        let cell = grid.cell_data(i, j, k);
                        for &q in cell.indices.lock().unwrap().iter() {
                            if (ppos - set_b[q]).length_squared() < radius_sqr {
                                neighbors.push(q);
                            }
                        }
                    }
                }
            }
            neighbors
        });

        *result = lists;
    }
}

/// Unified fixed-radius neighbor query over either backend.
pub struct NeighborSearch {
    method: Method,
    radius: Real,
    grid_searcher: Option<GridBasedNeighborSearch>,
    hash_searcher: Option<SpatialHashTableSeparateChaining>,
}

impl NeighborSearch {
    pub fn new(method: Method, radius: Real) -> Result<Self, ConfigError> {
        if radius <= 0.0 {
            return Err(ConfigError::NonPositiveSearchRadius(radius));
        }
        let mut search = Self {
            method,
            radius,
            grid_searcher: None,
            hash_searcher: None,
        };
        match method {
            Method::UniformGridBasedSearch => {
                search.grid_searcher = Some(GridBasedNeighborSearch::new(radius)?);
            }
            Method::SpatialHashing => {
                let mut table = SpatialHashTableSeparateChaining::new();
                table.set_cell_size(radius, radius, radius);
                search.hash_searcher = Some(table);
            }
        }
        Ok(search)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn search_radius(&self) -> Real {
        self.radius
    }

    pub fn set_search_radius(&mut self, radius: Real) -> Result<(), ConfigError> {
        if radius <= 0.0 {
            return Err(ConfigError::NonPositiveSearchRadius(radius));
        }
        self.radius = radius;
        if let Some(grid) = &mut self.grid_searcher {
            grid.set_search_radius(radius)?;
        }
        if let Some(hash) = &mut self.hash_searcher {
            hash.set_cell_size(radius, radius, radius);
        }
        Ok(())
    }

    /// Neighbors of every point of `points` within the point set itself.
    pub fn get_self_neighbors(&mut self, result: &mut Vec<Vec<usize>>, points: &[Vec3d]) {
        self.get_neighbors(result, points, points);
    }

    /// For each point of `set_a`, the indices of `set_b` within the radius.
    pub fn get_neighbors(
        &mut self,
        result: &mut Vec<Vec<usize>>,
        set_a: &[Vec3d],
        set_b: &[Vec3d],
    ) {
        match self.method {
            Method::UniformGridBasedSearch => {
                self.grid_searcher
                    .as_mut()
                    .expect("grid searcher present for grid method")
                    .get_neighbors(result, set_a, set_b);
            }
            Method::SpatialHashing => {
                let radius = self.radius;
                let table = self
                    .hash_searcher
                    .as_mut()
                    .expect("hash table present for hashing method");
                table.clear();
                table.insert_points(set_b);

                let table = &*table;
                let lists = parallel::parallel_map(set_a.len(), |p| {
                    let mut neighbors = Vec::new();
                    table.points_in_sphere(&mut neighbors, set_a[p], radius);
                    neighbors
                });
                *result = lists;
            }
        }
    }
}
