use surgsim_core::body::{ParticleId, PbdBody, PbdState};
use surgsim_core::constraints::{
    AreaConstraint, BendConstraint, Constraint, ConstantDensityConstraint, DihedralConstraint,
    DistanceConstraint, PointNormalConstraint, PointTriangleConstraint, SolverType,
    VolumeConstraint,
};
use surgsim_core::math::Vec3d;

fn state_with_particles(positions: &[Vec3d], inv_masses: &[f64]) -> PbdState {
    let mut body = PbdBody::from_positions(positions.to_vec(), 1.0);
    body.inv_masses.copy_from_slice(inv_masses);
    let mut state = PbdState::new();
    state.add_body(body);
    state
}

fn ids<const N: usize>() -> [ParticleId; N] {
    std::array::from_fn(|i| ParticleId::new(0, i))
}

#[test]
fn test_distance_gradients_sum_to_zero() {
    let p0 = Vec3d::new(0.2, -0.1, 0.4);
    let p1 = Vec3d::new(1.1, 0.3, -0.2);
    let c = DistanceConstraint::new(p0, p1, ids(), 1.0);

    let value = c.evaluate(&[p0 + Vec3d::Y, p1, Vec3d::ZERO, Vec3d::ZERO]).unwrap();
    let sum: Vec3d = value.dcdx.iter().copied().sum();
    let norm: f64 = value.dcdx.iter().map(|g| g.length()).sum();
    assert!(sum.length() < 1.0e-10 * norm.max(1.0), "sum = {sum:?}");
}

#[test]
fn test_bend_gradients_sum_to_zero() {
    let p = [
        Vec3d::new(0.0, 0.0, 0.0),
        Vec3d::new(0.5, 0.0, 0.0),
        Vec3d::new(1.0, 0.0, 0.0),
    ];
    let c = BendConstraint::new(p[0], p[1], p[2], ids(), 1.0);

    let value = c
        .evaluate(&[
            Vec3d::new(0.0, 0.1, 0.0),
            p[1],
            Vec3d::new(1.0, 0.1, 0.0),
            Vec3d::ZERO,
        ])
        .unwrap();
    let sum: Vec3d = value.dcdx[..3].iter().copied().sum();
    let norm: f64 = value.dcdx[..3].iter().map(|g| g.length()).sum();
    assert!(sum.length() < 1.0e-10 * norm, "sum = {sum:?}");
}

#[test]
fn test_dihedral_gradients_sum_to_zero() {
    let p0 = Vec3d::new(0.0, 0.3, 0.1);
    let p1 = Vec3d::new(0.1, -0.4, 0.0);
    let p2 = Vec3d::new(-0.5, 0.0, -0.1);
    let p3 = Vec3d::new(0.6, 0.0, 0.0);
    let c = DihedralConstraint::new(p0, p1, p2, p3, ids(), 1.0);

    let bent = [p0 + Vec3d::new(0.0, 0.2, 0.1), p1, p2, p3];
    let value = c.evaluate(&bent).unwrap();
    let sum: Vec3d = value.dcdx.iter().copied().sum();
    let norm: f64 = value.dcdx.iter().map(|g| g.length()).sum();
    assert!(sum.length() < 1.0e-10 * norm, "sum = {sum:?}");
}

#[test]
fn test_area_and_volume_gradients_sum_to_zero() {
    let p0 = Vec3d::new(0.0, 0.0, 0.0);
    let p1 = Vec3d::new(1.0, 0.1, 0.0);
    let p2 = Vec3d::new(0.2, 0.9, 0.3);
    let p3 = Vec3d::new(0.3, 0.2, 1.1);

    let area = AreaConstraint::new(p0, p1, p2, ids(), 1.0);
    let value = area
        .evaluate(&[p0, p1 + Vec3d::new(0.2, 0.0, 0.0), p2, Vec3d::ZERO])
        .unwrap();
    let sum: Vec3d = value.dcdx[..3].iter().copied().sum();
    let norm: f64 = value.dcdx[..3].iter().map(|g| g.length()).sum();
    assert!(sum.length() < 1.0e-10 * norm, "area sum = {sum:?}");

    let volume = VolumeConstraint::new(p0, p1, p2, p3, ids(), 1.0);
    let value = volume
        .evaluate(&[p0, p1, p2, p3 + Vec3d::new(0.0, 0.4, 0.0)])
        .unwrap();
    let sum: Vec3d = value.dcdx.iter().copied().sum();
    let norm: f64 = value.dcdx.iter().map(|g| g.length()).sum();
    assert!(sum.length() < 1.0e-10 * norm, "volume sum = {sum:?}");
}

#[test]
fn test_degenerate_distance_is_skipped() {
    let p = Vec3d::new(0.5, 0.5, 0.5);
    let c = DistanceConstraint::new(Vec3d::ZERO, Vec3d::X, ids(), 1.0);
    // Coincident particles: no defined gradient, no update.
    assert!(c.evaluate(&[p, p, Vec3d::ZERO, Vec3d::ZERO]).is_none());
}

#[test]
fn test_bend_constraint_convergence() {
    // Three collinear particles, middle pinned; endpoints perturbed to
    // y = 0.1 must settle back onto the line.
    let rest = [
        Vec3d::new(0.0, 0.0, 0.0),
        Vec3d::new(0.5, 0.0, 0.0),
        Vec3d::new(1.0, 0.0, 0.0),
    ];
    let mut state = state_with_particles(&rest, &[1.0, 0.0, 1.0]);
    state.bodies[0].positions[0].y = 0.1;
    state.bodies[0].positions[2].y = 0.1;

    let mut constraint = Constraint::Bend(BendConstraint::new(
        rest[0], rest[1], rest[2], ids(), 1.0e20,
    ));
    for _ in 0..500 {
        constraint.project(&mut state, 0.01, SolverType::Xpbd);
    }

    assert!(state.bodies[0].positions[0].y.abs() <= 1.0e-15);
    assert!(state.bodies[0].positions[2].y.abs() <= 1.0e-15);
    // The pinned middle particle must not have moved at all.
    assert_eq!(state.bodies[0].positions[1], rest[1]);
}

#[test]
fn test_xpbd_residual_after_one_iteration() {
    // With the second particle pinned and unit mass the distance constraint
    // is exactly linear in lambda, so the xPBD consistency condition
    // `c_after + alpha * lambda_after = 0` must hold to round-off after a
    // single inner iteration.
    let rest = [Vec3d::ZERO, Vec3d::new(1.0, 0.0, 0.0)];
    let mut state = state_with_particles(&rest, &[1.0, 0.0]);
    state.bodies[0].positions[0] = Vec3d::new(-0.3, 0.0, 0.0);

    let stiffness = 100.0;
    let dt = 0.01;
    let inner = DistanceConstraint::new(rest[0], rest[1], ids(), stiffness);
    let alpha = inner.compliance / (dt * dt);
    let mut constraint = Constraint::Distance(inner);

    constraint.project(&mut state, dt, SolverType::Xpbd);
    let lambda_after = constraint.lambda();

    let c_after = match &constraint {
        Constraint::Distance(c) => {
            let x0 = state.position(ParticleId::new(0, 0));
            let x1 = state.position(ParticleId::new(0, 1));
            c.evaluate(&[x0, x1, Vec3d::ZERO, Vec3d::ZERO]).unwrap().c
        }
        _ => unreachable!(),
    };

    let residual = c_after + alpha * lambda_after;
    assert!(residual.abs() < 1.0e-10, "residual = {residual}");
}

#[test]
fn test_classical_pbd_does_not_accumulate_lambda() {
    let rest = [Vec3d::ZERO, Vec3d::new(1.0, 0.0, 0.0)];
    let mut state = state_with_particles(&rest, &[1.0, 1.0]);
    state.bodies[0].positions[0] = Vec3d::new(-0.5, 0.0, 0.0);

    let mut constraint = Constraint::Distance(DistanceConstraint::new(rest[0], rest[1], ids(), 1.0));
    constraint.project(&mut state, 0.01, SolverType::Pbd);

    assert_eq!(constraint.lambda(), 0.0);
    // Full-stiffness classical projection restores the rest length in one pass.
    let len = (state.position(ParticleId::new(0, 0)) - state.position(ParticleId::new(0, 1)))
        .length();
    assert!((len - 1.0).abs() < 1.0e-12, "len = {len}");
}

#[test]
fn test_point_triangle_pushes_point_out() {
    let positions = [
        Vec3d::new(0.25, 0.25, 0.005), // point slightly above the triangle
        Vec3d::new(0.0, 0.0, 0.0),
        Vec3d::new(1.0, 0.0, 0.0),
        Vec3d::new(0.0, 1.0, 0.0),
    ];
    let mut state = state_with_particles(&positions, &[1.0, 1.0, 1.0, 1.0]);

    let mut constraint =
        Constraint::PointTriangle(PointTriangleConstraint::new(ids(), 0.05, 1.0));
    let z_before = state.bodies[0].positions[0].z;
    for _ in 0..50 {
        constraint.project(&mut state, 0.01, SolverType::Pbd);
    }
    let z_after = state.bodies[0].positions[0].z;
    assert!(
        z_after > z_before,
        "point must be pushed along the triangle normal: {z_before} -> {z_after}"
    );
}

#[test]
fn test_point_triangle_outside_is_skipped() {
    let positions = [
        Vec3d::new(5.0, 5.0, 0.005),
        Vec3d::new(0.0, 0.0, 0.0),
        Vec3d::new(1.0, 0.0, 0.0),
        Vec3d::new(0.0, 1.0, 0.0),
    ];
    let mut state = state_with_particles(&positions, &[1.0, 1.0, 1.0, 1.0]);
    let mut constraint =
        Constraint::PointTriangle(PointTriangleConstraint::new(ids(), 0.05, 1.0));
    constraint.project(&mut state, 0.01, SolverType::Pbd);
    assert_eq!(state.bodies[0].positions[0], positions[0]);
}

#[test]
fn test_point_normal_resolves_penetration() {
    let contact = Vec3d::ZERO;
    // Particle 2 cm below the floor; resolving direction is +y.
    let penetration = Vec3d::new(0.0, 0.02, 0.0);
    let positions = [Vec3d::new(0.0, -0.02, 0.0)];
    let mut state = state_with_particles(&positions, &[1.0]);

    let mut constraint = Constraint::PointNormal(PointNormalConstraint::new(
        ParticleId::new(0, 0),
        contact,
        penetration,
        1.0,
    ));
    for _ in 0..10 {
        constraint.project(&mut state, 0.01, SolverType::Pbd);
    }

    let y = state.bodies[0].positions[0].y;
    assert!(y > -1.0e-9, "particle still penetrating: y = {y}");
}

#[test]
fn test_constant_density_expands_compressed_cluster() {
    // A 3x3x3 cluster packed well above the rest density must spread out
    // under the density constraint.
    let mut positions = Vec::new();
    for i in 0..3 {
        for j in 0..3 {
            for k in 0..3 {
                positions.push(Vec3d::new(
                    i as f64 * 0.05,
                    j as f64 * 0.05,
                    k as f64 * 0.05,
                ));
            }
        }
    }
    let centroid: Vec3d = positions.iter().copied().sum::<Vec3d>() / positions.len() as f64;
    let mean_radius = |ps: &[Vec3d]| -> f64 {
        ps.iter().map(|p| (*p - centroid).length()).sum::<f64>() / ps.len() as f64
    };
    let radius_before = mean_radius(&positions);

    let mut state = PbdState::new();
    let body = state.add_body(PbdBody::from_positions(positions, 1.0));

    let mut constraint = Constraint::ConstantDensity(ConstantDensityConstraint::new(
        body,
        state.bodies[body].num_particles(),
        0.2,
        1000.0,
    ));
    for _ in 0..10 {
        constraint.project(&mut state, 0.01, SolverType::Xpbd);
    }

    let radius_after = mean_radius(&state.bodies[body].positions);
    assert!(
        radius_after > radius_before + 1.0e-6,
        "cluster did not expand: {radius_before} -> {radius_after}"
    );
    for p in &state.bodies[body].positions {
        assert!(p.is_finite());
    }
}

#[test]
fn test_constant_density_respects_pinned_particles() {
    let positions = vec![Vec3d::ZERO, Vec3d::new(0.05, 0.0, 0.0)];
    let mut state = PbdState::new();
    let mut body = PbdBody::from_positions(positions, 1.0);
    body.set_fixed_indices(&[0]);
    let body = state.add_body(body);

    let mut constraint = Constraint::ConstantDensity(ConstantDensityConstraint::new(
        body, 2, 0.2, 1000.0,
    ));
    for _ in 0..5 {
        constraint.project(&mut state, 0.01, SolverType::Xpbd);
    }

    assert_eq!(state.bodies[body].positions[0], Vec3d::ZERO);
}

#[test]
fn test_pinned_particles_never_move() {
    // Quantified invariant 1: inverse mass 0 means identical position before
    // and after any projection.
    let rest = [Vec3d::ZERO, Vec3d::new(1.0, 0.0, 0.0)];
    let mut state = state_with_particles(&rest, &[0.0, 1.0]);
    state.bodies[0].positions[1] = Vec3d::new(2.0, 0.0, 0.0);

    let mut constraint = Constraint::Distance(DistanceConstraint::new(rest[0], rest[1], ids(), 1.0));
    for _ in 0..20 {
        constraint.project(&mut state, 0.01, SolverType::Xpbd);
    }

    assert_eq!(state.bodies[0].positions[0], Vec3d::ZERO);
}
