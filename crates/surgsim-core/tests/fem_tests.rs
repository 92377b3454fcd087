use surgsim_core::body::{ParticleId, PbdBody, PbdState};
use surgsim_core::constraints::{
    Constraint, FemMaterial, FemTetConstraint, FemTetMaterialConfig, SolverType,
};
use surgsim_core::math::{Mat3d, Vec3d};

fn unit_tet() -> [Vec3d; 4] {
    [
        Vec3d::new(0.5, 0.0, -1.0 / 3.0),
        Vec3d::new(-0.5, 0.0, -1.0 / 3.0),
        Vec3d::new(0.0, 0.0, 2.0 / 3.0),
        Vec3d::new(0.0, 1.0, 0.0),
    ]
}

fn ids() -> [ParticleId; 4] {
    std::array::from_fn(|i| ParticleId::new(0, i))
}

fn deformation_gradient(rest: &[Vec3d; 4], current: &[Vec3d]) -> Mat3d {
    let rest_mat = Mat3d::from_cols(rest[0] - rest[3], rest[1] - rest[3], rest[2] - rest[3]);
    let curr_mat = Mat3d::from_cols(
        current[0] - current[3],
        current[1] - current[3],
        current[2] - current[3],
    );
    curr_mat * rest_mat.inverse()
}

/// Invert the apex of the unit tet, project for 600 iterations and require
/// a positive deformation-gradient determinant at the end.
fn run_inversion_recovery(material: FemMaterial) {
    let rest = unit_tet();
    let mut body = PbdBody::from_positions(rest.to_vec(), 1.0 / 400.0);
    // Push the apex through the base plane.
    body.positions[3] += Vec3d::new(0.1, -2.6, -0.1);
    let mut state = PbdState::new();
    state.add_body(body);

    let config = FemTetMaterialConfig::new(344.82, 3103.44);
    let mut constraint = Constraint::FemTet(
        FemTetConstraint::new(
            rest[0], rest[1], rest[2], rest[3], ids(), material, config,
        )
        .expect("rest tet is non-degenerate"),
    );

    {
        let f = deformation_gradient(&rest, &state.bodies[0].positions);
        assert!(f.determinant() < 0.0, "setup must start inverted");
    }

    for _ in 0..600 {
        constraint.project(&mut state, 0.01, SolverType::Xpbd);
    }

    let f = deformation_gradient(&rest, &state.bodies[0].positions);
    assert!(
        f.determinant() > 0.0,
        "{material:?} did not recover: det(F) = {}",
        f.determinant()
    );
}

#[test]
fn test_tet_inversion_recovery_stvk() {
    run_inversion_recovery(FemMaterial::StVk);
}

#[test]
fn test_tet_inversion_recovery_neo_hookean() {
    run_inversion_recovery(FemMaterial::NeoHookean);
}

#[test]
fn test_tet_inversion_recovery_corotational() {
    run_inversion_recovery(FemMaterial::Corotational);
}

#[test]
fn test_rest_configuration_is_stationary() {
    let rest = unit_tet();
    let mut state = PbdState::new();
    state.add_body(PbdBody::from_positions(rest.to_vec(), 1.0));

    let config = FemTetMaterialConfig::from_young_poisson(1000.0, 0.45);
    let mut constraint = Constraint::FemTet(
        FemTetConstraint::new(
            rest[0],
            rest[1],
            rest[2],
            rest[3],
            ids(),
            FemMaterial::StVk,
            config,
        )
        .unwrap(),
    );

    for _ in 0..10 {
        constraint.project(&mut state, 0.01, SolverType::Xpbd);
    }
    for (i, &p) in rest.iter().enumerate() {
        let moved = (state.bodies[0].positions[i] - p).length();
        assert!(moved < 1.0e-9, "vertex {i} drifted {moved} at rest");
    }
}

#[test]
fn test_gradients_sum_to_zero_under_stretch() {
    let rest = unit_tet();
    let config = FemTetMaterialConfig::new(344.82, 3103.44);
    let constraint = FemTetConstraint::new(
        rest[0],
        rest[1],
        rest[2],
        rest[3],
        ids(),
        FemMaterial::StVk,
        config,
    )
    .unwrap();

    let stretched = [
        rest[0],
        rest[1],
        rest[2],
        rest[3] + Vec3d::new(0.0, 0.5, 0.0),
    ];
    let value = constraint.evaluate(&stretched).unwrap();
    let sum: Vec3d = value.dcdx.iter().copied().sum();
    let norm: f64 = value.dcdx.iter().map(|g| g.length()).sum();
    assert!(sum.length() < 1.0e-10 * norm, "sum = {sum:?}");
    assert!(value.c > 0.0, "stretching stores elastic energy");
}

#[test]
fn test_degenerate_rest_tet_is_rejected() {
    // Coplanar rest vertices have no invertible edge matrix.
    let constraint = FemTetConstraint::new(
        Vec3d::ZERO,
        Vec3d::X,
        Vec3d::Y,
        Vec3d::new(0.5, 0.5, 0.0),
        ids(),
        FemMaterial::StVk,
        FemTetMaterialConfig::new(344.82, 3103.44),
    );
    assert!(constraint.is_none());
}

#[test]
fn test_lame_conversion() {
    let config = FemTetMaterialConfig::from_young_poisson(1000.0, 0.45);
    assert!((config.mu - 344.8275862068966).abs() < 1.0e-9);
    assert!((config.lambda - 3103.448275862069).abs() < 1.0e-9);
}
