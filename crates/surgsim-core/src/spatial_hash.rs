//! Separate-chaining spatial hash over an unbounded point set.

use std::collections::HashSet;

use crate::math::{Real, Vec3d};

/// Primes used to mix the quantized coordinates into a bucket index.
const HASH_PRIME_X: i64 = 104_729;
const HASH_PRIME_Y: i64 = 104_743;
const HASH_PRIME_Z: i64 = 104_759;

const DEFAULT_BUCKET_COUNT: usize = 1024;

/// One stored point: position plus the id handed out at insertion.
#[derive(Clone, Copy, Debug)]
pub struct PointEntry {
    pub point: Vec3d,
    pub id: usize,
}

/// Spatial hash table with separate chaining.
///
/// Points are bucketed by their quantized coordinates; ids are handed out
/// monotonically from 0 and restart after [`Self::clear`]. Changing the cell
/// size rebuilds every bucket so stored entries stay consistent with the new
/// quantization. Queries never fail: an empty region yields an empty result.
///
/// Mutating the table (`insert_*`, `clear`, `set_cell_size`) while queries
/// run concurrently is a programmer error and is not defended against.
pub struct SpatialHashTableSeparateChaining {
    cell_size: [Real; 3],
    buckets: Vec<Vec<PointEntry>>,
    num_points: usize,
    current_id: usize,
    load_factor_max: f32,
}

impl Default for SpatialHashTableSeparateChaining {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialHashTableSeparateChaining {
    pub fn new() -> Self {
        Self {
            cell_size: [0.1, 0.1, 0.1],
            buckets: vec![Vec::new(); DEFAULT_BUCKET_COUNT],
            num_points: 0,
            current_id: 0,
            load_factor_max: 10.0,
        }
    }

    pub fn cell_size(&self) -> [Real; 3] {
        self.cell_size
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Bucket index a point hashes to under the current quantization.
    #[inline]
    pub fn bucket(&self, point: Vec3d) -> usize {
        let x = (point.x / self.cell_size[0]).floor() as i64;
        let y = (point.y / self.cell_size[1]).floor() as i64;
        let z = (point.z / self.cell_size[2]).floor() as i64;
        let h = HASH_PRIME_X
            .wrapping_mul(x)
            .wrapping_add(HASH_PRIME_Y.wrapping_mul(y))
            .wrapping_add(HASH_PRIME_Z.wrapping_mul(z));
        (h as u64 % self.buckets.len() as u64) as usize
    }

    /// Insert a point, assigning it the next id.
    pub fn insert_point(&mut self, point: Vec3d) {
        let entry = PointEntry {
            point,
            id: self.current_id,
        };
        let bucket = self.bucket(point);
        self.buckets[bucket].push(entry);
        self.current_id += 1;
        self.num_points += 1;

        self.grow_to_load_factor();
    }

    /// Batch insert; ids are assigned in slice order.
    pub fn insert_points(&mut self, points: &[Vec3d]) {
        for &p in points {
            self.insert_point(p);
        }
    }

    /// Empty the table and restart ids at 0. The bucket array is kept.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.num_points = 0;
        self.current_id = 0;
    }

    /// Change the quantization and rebuild every entry's bucket position.
    pub fn set_cell_size(&mut self, x: Real, y: Real, z: Real) {
        self.cell_size = [x, y, z];
        self.rehash(self.buckets.len());
    }

    /// Cap the average chain length; rehashes if the current load exceeds it.
    pub fn set_load_factor_max(&mut self, load_factor_max: f32) {
        self.load_factor_max = load_factor_max;
        self.grow_to_load_factor();
    }

    fn load_factor(&self) -> f32 {
        self.num_points as f32 / self.buckets.len() as f32
    }

    fn grow_to_load_factor(&mut self) {
        if self.load_factor() <= self.load_factor_max {
            return;
        }
        let mut target = self.buckets.len();
        while self.num_points as f32 / target as f32 > self.load_factor_max {
            target *= 2;
        }
        self.rehash(target);
    }

    fn rehash(&mut self, new_bucket_count: usize) {
        log::debug!(
            "rehashing spatial hash: {} points into {} buckets",
            self.num_points,
            new_bucket_count
        );
        let entries: Vec<PointEntry> = self.buckets.iter().flatten().copied().collect();
        self.buckets.clear();
        self.buckets.resize(new_bucket_count, Vec::new());
        for entry in entries {
            let bucket = self.bucket(entry.point);
            self.buckets[bucket].push(entry);
        }
    }

    /// Ids of all stored points geometrically inside the axis-aligned box
    /// spanned by the two corners (in any order).
    ///
    /// Coarse pass probes every covered cell's bucket (false positives
    /// possible from chaining), fine pass filters per point.
    pub fn points_in_aabb(&self, result: &mut Vec<usize>, corner1: Vec3d, corner2: Vec3d) {
        let min = crate::math::min_corner(corner1, corner2);
        let max = crate::math::max_corner(corner1, corner2);

        let mut visited = HashSet::new();
        result.clear();

        let mut x = min.x;
        while x < max.x + self.cell_size[0] {
            let mut y = min.y;
            while y < max.y + self.cell_size[1] {
                let mut z = min.z;
                while z < max.z + self.cell_size[2] {
                    let bucket = self.bucket(Vec3d::new(x, y, z));
                    if visited.insert(bucket) {
                        for entry in &self.buckets[bucket] {
                            let p = entry.point;
                            if p.x >= min.x
                                && p.x <= max.x
                                && p.y >= min.y
                                && p.y <= max.y
                                && p.z >= min.z
                                && p.z <= max.z
                            {
                                result.push(entry.id);
                            }
                        }
                    }
                    z += self.cell_size[2];
                }
                y += self.cell_size[1];
            }
            x += self.cell_size[0];
        }
    }

    /// Ids of all stored points strictly within `radius` of `center`.
    ///
    /// Visits a `ceil(radius / cell_size)` halo of cells around the center;
    /// buckets are deduplicated through a visited set because distinct probe
    /// cells can collide onto one bucket.
    pub fn points_in_sphere(&self, result: &mut Vec<usize>, center: Vec3d, radius: Real) {
        let cell_span = [
            (radius / self.cell_size[0]).ceil() as i32,
            (radius / self.cell_size[1]).ceil() as i32,
            (radius / self.cell_size[2]).ceil() as i32,
        ];
        let radius_sqr = radius * radius;

        let mut visited =
            HashSet::with_capacity((cell_span[0] * cell_span[1] * cell_span[2]).max(1) as usize);
        result.clear();

        for i in -cell_span[0]..=cell_span[0] {
            for j in -cell_span[1]..=cell_span[1] {
                for k in -cell_span[2]..=cell_span[2] {
                    let probe = Vec3d::new(
                        center.x + self.cell_size[0] * i as Real,
                        center.y + self.cell_size[1] * j as Real,
                        center.z + self.cell_size[2] * k as Real,
                    );
                    let bucket = self.bucket(probe);
                    if !visited.insert(bucket) {
                        continue;
                    }
                    for entry in &self.buckets[bucket] {
                        let d2 = (center - entry.point).length_squared();
                        if d2 < radius_sqr {
                            result.push(entry.id);
                        }
                    }
                }
            }
        }
    }

    /// Iterate all stored entries (bucket order).
    pub fn entries(&self) -> impl Iterator<Item = &PointEntry> {
        self.buckets.iter().flatten()
    }

    /// The entries currently chained in one bucket.
    pub fn bucket_entries(&self, bucket: usize) -> &[PointEntry] {
        &self.buckets[bucket]
    }
}
