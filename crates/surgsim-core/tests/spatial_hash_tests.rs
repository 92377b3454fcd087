use surgsim_core::math::Vec3d;
use surgsim_core::spatial_hash::SpatialHashTableSeparateChaining;

fn sample_points() -> Vec<Vec3d> {
    let mut points = Vec::new();
    for i in 0..6 {
        for j in 0..6 {
            for k in 0..6 {
                points.push(Vec3d::new(
                    i as f64 * 0.07 - 0.2,
                    j as f64 * 0.07,
                    k as f64 * 0.07 + 0.1,
                ));
            }
        }
    }
    points
}

#[test]
fn test_ids_are_monotonic_and_reset_on_clear() {
    let mut table = SpatialHashTableSeparateChaining::new();
    table.insert_points(&[Vec3d::ZERO, Vec3d::X, Vec3d::Y]);
    let mut ids: Vec<usize> = table.entries().map(|e| e.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1, 2]);

    table.clear();
    assert_eq!(table.num_points(), 0);
    table.insert_point(Vec3d::Z);
    assert_eq!(table.entries().next().unwrap().id, 0, "ids restart at 0");
}

#[test]
fn test_points_in_sphere_filters_by_distance() {
    let mut table = SpatialHashTableSeparateChaining::new();
    table.set_cell_size(0.1, 0.1, 0.1);
    let points = sample_points();
    table.insert_points(&points);

    let center = points[77];
    let radius = 0.1;
    let mut result = Vec::new();
    table.points_in_sphere(&mut result, center, radius);
    result.sort_unstable();

    let mut expected: Vec<usize> = points
        .iter()
        .enumerate()
        .filter(|(_, p)| (**p - center).length() < radius)
        .map(|(i, _)| i)
        .collect();
    expected.sort_unstable();

    assert_eq!(result, expected);
}

#[test]
fn test_points_in_sphere_empty_region() {
    let mut table = SpatialHashTableSeparateChaining::new();
    table.set_cell_size(0.1, 0.1, 0.1);
    table.insert_points(&sample_points());

    let mut result = vec![123];
    table.points_in_sphere(&mut result, Vec3d::new(50.0, 50.0, 50.0), 0.2);
    assert!(result.is_empty(), "queries over empty regions return empty");
}

#[test]
fn test_points_in_aabb() {
    let mut table = SpatialHashTableSeparateChaining::new();
    table.set_cell_size(0.1, 0.1, 0.1);
    let points = sample_points();
    table.insert_points(&points);

    let c1 = Vec3d::new(-0.1, 0.05, 0.1);
    let c2 = Vec3d::new(0.1, 0.3, 0.3);
    let mut result = Vec::new();
    // Corners in either order.
    table.points_in_aabb(&mut result, c2, c1);
    result.sort_unstable();

    let mut expected: Vec<usize> = points
        .iter()
        .enumerate()
        .filter(|(_, p)| {
            p.x >= c1.x && p.x <= c2.x && p.y >= c1.y && p.y <= c2.y && p.z >= c1.z && p.z <= c2.z
        })
        .map(|(i, _)| i)
        .collect();
    expected.sort_unstable();

    assert_eq!(result, expected);
}

#[test]
fn test_set_cell_size_rebuilds_buckets() {
    // Reinsertion invariant: after a cell size change every stored entry
    // must live in the bucket dictated by the new quantization.
    let mut table = SpatialHashTableSeparateChaining::new();
    table.set_cell_size(0.1, 0.1, 0.1);
    table.insert_points(&sample_points());

    table.set_cell_size(0.03, 0.05, 0.2);

    let mut seen = 0;
    for bucket in 0..table.bucket_count() {
        for entry in table.bucket_entries(bucket) {
            assert_eq!(
                table.bucket(entry.point),
                bucket,
                "entry {} sits in a stale bucket",
                entry.id
            );
            seen += 1;
        }
    }
    assert_eq!(seen, table.num_points());
}

#[test]
fn test_clear_then_reinsert_matches_fresh_table() {
    let points = sample_points();

    let mut recycled = SpatialHashTableSeparateChaining::new();
    recycled.set_cell_size(0.08, 0.08, 0.08);
    recycled.insert_points(&points);
    recycled.clear();
    recycled.insert_points(&points);

    let mut fresh = SpatialHashTableSeparateChaining::new();
    fresh.set_cell_size(0.08, 0.08, 0.08);
    fresh.insert_points(&points);

    assert_eq!(recycled.num_points(), fresh.num_points());
    assert_eq!(recycled.bucket_count(), fresh.bucket_count());
    for bucket in 0..fresh.bucket_count() {
        let a: Vec<usize> = recycled.bucket_entries(bucket).iter().map(|e| e.id).collect();
        let b: Vec<usize> = fresh.bucket_entries(bucket).iter().map(|e| e.id).collect();
        assert_eq!(a, b, "bucket {bucket} distribution differs");
    }
}

#[test]
fn test_load_factor_rehash_preserves_queries() {
    let mut table = SpatialHashTableSeparateChaining::new();
    table.set_cell_size(0.1, 0.1, 0.1);
    let points = sample_points();
    table.insert_points(&points);

    let mut before = Vec::new();
    table.points_in_sphere(&mut before, points[0], 0.15);
    before.sort_unstable();

    table.set_load_factor_max(0.05);

    let mut after = Vec::new();
    table.points_in_sphere(&mut after, points[0], 0.15);
    after.sort_unstable();

    assert_eq!(before, after);
}
