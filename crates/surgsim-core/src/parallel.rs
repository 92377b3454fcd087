//! Thin rayon wrappers shared by the neighbor search and the fluid pipeline.

use rayon::prelude::*;

use crate::math::{max_corner, min_corner, Vec3d};

/// Run `body(i)` for every index in `0..count` on the worker pool.
///
/// The closure must only write to state it exclusively owns for index `i`
/// (or take a lock); the caller gets a happens-before edge with everything
/// after the call returns.
pub fn parallel_for<F>(count: usize, body: F)
where
    F: Fn(usize) + Sync + Send,
{
    (0..count).into_par_iter().for_each(body);
}

/// Map `0..count` through `body` into a freshly collected vector.
pub fn parallel_map<T, F>(count: usize, body: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    (0..count).into_par_iter().map(body).collect()
}

/// Parallel reduction of the axis-aligned bounding box of a point set.
///
/// Returns `(lower, upper)`. An empty slice yields an inverted box of
/// infinities that any subsequent merge will overwrite.
pub fn find_aabb(points: &[Vec3d]) -> (Vec3d, Vec3d) {
    points
        .par_iter()
        .fold(
            || (Vec3d::splat(f64::INFINITY), Vec3d::splat(f64::NEG_INFINITY)),
            |(lo, hi), p| (min_corner(lo, *p), max_corner(hi, *p)),
        )
        .reduce(
            || (Vec3d::splat(f64::INFINITY), Vec3d::splat(f64::NEG_INFINITY)),
            |(lo1, hi1), (lo2, hi2)| (min_corner(lo1, lo2), max_corner(hi1, hi2)),
        )
}
