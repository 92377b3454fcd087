use surgsim_core::body::{ParticleId, PbdBody, PbdState};
use surgsim_core::constraints::{
    AngularDistanceConstraint, Constraint, DistanceConstraint, HingeConstraint, SolverType,
};
use surgsim_core::math::{Quatd, Vec3d};
use surgsim_core::solver::{PbdConfig, PbdSolver, PbdTask};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn zero_gravity_config() -> PbdConfig {
    PbdConfig {
        gravity: Vec3d::ZERO,
        damping: 0.0,
        ..PbdConfig::default()
    }
}

#[test]
fn test_config_validation() {
    assert!(PbdConfig::default().validate().is_ok());
    assert!(PbdConfig {
        iterations: 0,
        ..PbdConfig::default()
    }
    .validate()
    .is_err());
    assert!(PbdConfig {
        damping: 1.5,
        ..PbdConfig::default()
    }
    .validate()
    .is_err());
    assert!(PbdConfig {
        dt: 0.0,
        ..PbdConfig::default()
    }
    .validate()
    .is_err());
}

#[test]
fn test_identity_step_without_forces() {
    // A body at rest with a satisfied constraint must not move: zero
    // displacement gradients produce an identity step.
    let mut solver = PbdSolver::new(zero_gravity_config()).unwrap();
    let rest = vec![Vec3d::ZERO, Vec3d::new(1.0, 0.0, 0.0)];
    let body = solver.state.add_body(PbdBody::from_positions(rest.clone(), 1.0));
    solver.add_constraint(Constraint::Distance(DistanceConstraint::new(
        rest[0],
        rest[1],
        [ParticleId::new(body, 0), ParticleId::new(body, 1)],
        1.0,
    )));

    solver.step();

    assert_eq!(solver.state.bodies[0].positions, rest);
    assert_eq!(
        solver.state.bodies[0].velocities,
        vec![Vec3d::ZERO, Vec3d::ZERO]
    );
}

#[test]
fn test_free_fall_matches_gravity() {
    let config = PbdConfig {
        damping: 0.0,
        ..PbdConfig::default()
    };
    let mut solver = PbdSolver::new(config).unwrap();
    solver
        .state
        .add_body(PbdBody::from_positions(vec![Vec3d::ZERO], 1.0));

    solver.step();

    let dt = config.dt;
    let expected_v = config.gravity * dt;
    let expected_x = config.gravity * dt * dt;
    let v = solver.state.bodies[0].velocities[0];
    let x = solver.state.bodies[0].positions[0];
    assert!((v - expected_v).length() < 1.0e-12, "v = {v:?}");
    assert!((x - expected_x).length() < 1.0e-12, "x = {x:?}");
}

#[test]
fn test_pinned_particles_are_immovable_across_steps() {
    let mut solver = PbdSolver::new(PbdConfig::default()).unwrap();
    let rest = vec![Vec3d::ZERO, Vec3d::new(1.0, 0.0, 0.0)];
    let mut body = PbdBody::from_positions(rest.clone(), 1.0);
    body.set_fixed_indices(&[0]);
    let body = solver.state.add_body(body);
    solver.add_constraint(Constraint::Distance(DistanceConstraint::new(
        rest[0],
        rest[1],
        [ParticleId::new(body, 0), ParticleId::new(body, 1)],
        1000.0,
    )));

    for _ in 0..50 {
        solver.step();
    }

    assert_eq!(
        solver.state.bodies[0].positions[0],
        Vec3d::ZERO,
        "pinned particle moved"
    );
    // The free particle hangs below within the rest length.
    let stretch = (solver.state.bodies[0].positions[1] - Vec3d::ZERO).length();
    assert!(stretch < 1.5, "chain stretched unboundedly: {stretch}");
}

#[test]
fn test_damping_reduces_velocity() {
    let config = PbdConfig {
        gravity: Vec3d::ZERO,
        damping: 1.0,
        ..PbdConfig::default()
    };
    let mut solver = PbdSolver::new(config).unwrap();
    let mut body = PbdBody::from_positions(vec![Vec3d::ZERO], 1.0);
    body.velocities[0] = Vec3d::new(1.0, 0.0, 0.0);
    solver.state.add_body(body);

    solver.step();

    let v = solver.state.bodies[0].velocities[0].x;
    let expected = 1.0 - config.damping * config.dt;
    assert!((v - expected).abs() < 1.0e-12, "v = {v}");
}

#[test]
fn test_external_forces_accelerate_particles() {
    let mut solver = PbdSolver::new(zero_gravity_config()).unwrap();
    let mut body = PbdBody::from_positions(vec![Vec3d::ZERO], 2.0);
    body.external_forces[0] = Vec3d::new(4.0, 0.0, 0.0);
    solver.state.add_body(body);

    solver.step();

    // a = f w = 4 / 2 = 2.
    let dt = solver.config().dt;
    let x = solver.state.bodies[0].positions[0].x;
    assert!((x - 2.0 * dt * dt).abs() < 1.0e-12, "x = {x}");
}

#[test]
fn test_post_step_hook_fires_every_step() {
    let mut solver = PbdSolver::new(PbdConfig::default()).unwrap();
    solver
        .state
        .add_body(PbdBody::from_positions(vec![Vec3d::ZERO], 1.0));

    let counter = Arc::new(AtomicUsize::new(0));
    let hook_counter = Arc::clone(&counter);
    solver.set_post_step(move |_state| {
        hook_counter.fetch_add(1, Ordering::SeqCst);
    });

    for _ in 0..3 {
        solver.step();
    }
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[test]
fn test_published_task_graph_covers_pipeline() {
    let solver = PbdSolver::new(PbdConfig::default()).unwrap();
    let graph = solver.task_graph();

    let mut tasks = Vec::new();
    graph
        .execute(|_name, task: &PbdTask| tasks.push(*task))
        .unwrap();
    assert_eq!(
        tasks,
        vec![
            PbdTask::IntegratePositions,
            PbdTask::SolveConstraints,
            PbdTask::UpdateVelocity
        ]
    );
}

#[test]
fn test_hinge_constraint_aligns_up_axis() {
    let mut state = PbdState::new();
    let body = state.add_body(PbdBody::from_positions(vec![Vec3d::ZERO], 1.0).with_orientations());

    let hinge_axis = Vec3d::new(1.0, 0.0, 0.0);
    let mut constraint = Constraint::Hinge(HingeConstraint::new(
        ParticleId::new(body, 0),
        hinge_axis,
        1.0,
    ));

    for _ in 0..200 {
        constraint.project(&mut state, 0.01, SolverType::Pbd);
    }

    let up = state.bodies[body].orientations[0].mul_vec3(Vec3d::Y);
    assert!(
        up.dot(hinge_axis) > 0.999,
        "up axis not aligned to hinge: {up:?}"
    );
}

#[test]
fn test_angular_distance_constraint_aligns_bodies() {
    let mut state = PbdState::new();
    let mut body = PbdBody::from_positions(vec![Vec3d::ZERO, Vec3d::X], 1.0).with_orientations();
    // Lock the target particle's rotation by zeroing its inverse inertia.
    let target_rotation = Quatd::from_rotation_z(0.5);
    body.orientations[1] = target_rotation;
    body.inv_inertias[1] = surgsim_core::math::Mat3d::ZERO;
    let body = state.add_body(body);

    let mut constraint = Constraint::AngularDistance(AngularDistanceConstraint::new(
        ParticleId::new(body, 0),
        ParticleId::new(body, 1),
        1.0,
    ));

    for _ in 0..200 {
        constraint.project(&mut state, 0.01, SolverType::Pbd);
    }

    let q0 = state.bodies[body].orientations[0];
    let q1 = state.bodies[body].orientations[1];
    assert!(
        (q1 * target_rotation.inverse()).to_axis_angle().1.abs() < 1.0e-9,
        "locked particle rotated"
    );
    let misalignment = (q1 * q0.inverse()).to_axis_angle().1.abs();
    assert!(
        misalignment < 1.0e-3,
        "bodies not aligned, delta angle = {misalignment}"
    );
}
