//! Structure-of-arrays state for the SPH fluid.

use crate::math::{Real, Vec3d};

/// Role of one fluid particle.
///
/// Inlet and Outlet particles have prescribed kinematics; Buffer particles
/// are inactive storage parked far outside the domain. The type of a
/// particle may change over the simulation, its identity and the total
/// particle count never do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SphParticleType {
    Fluid,
    Wall,
    Inlet,
    Outlet,
    Buffer,
}

/// Per-particle fluid state plus the per-step acceleration scratch arrays.
pub struct SphState {
    pub positions: Vec<Vec3d>,
    pub velocities: Vec<Vec3d>,
    pub densities: Vec<Real>,
    pub pressures: Vec<Real>,
    pub particle_types: Vec<SphParticleType>,

    pub pressure_accels: Vec<Vec3d>,
    pub viscous_accels: Vec<Vec3d>,
    pub surface_tension_accels: Vec<Vec3d>,
    pub accels: Vec<Vec3d>,
    /// Surface normals for the curvature term of the surface tension model.
    pub normals: Vec<Vec3d>,

    pub neighbor_lists: Vec<Vec<usize>>,
}

impl SphState {
    /// State over the given positions; every particle starts as Fluid with
    /// zero velocity.
    pub fn new(positions: Vec<Vec3d>) -> Self {
        let n = positions.len();
        Self {
            positions,
            velocities: vec![Vec3d::ZERO; n],
            densities: vec![0.0; n],
            pressures: vec![0.0; n],
            particle_types: vec![SphParticleType::Fluid; n],
            pressure_accels: vec![Vec3d::ZERO; n],
            viscous_accels: vec![Vec3d::ZERO; n],
            surface_tension_accels: vec![Vec3d::ZERO; n],
            accels: vec![Vec3d::ZERO; n],
            normals: vec![Vec3d::ZERO; n],
            neighbor_lists: vec![Vec::new(); n],
        }
    }

    pub fn num_particles(&self) -> usize {
        self.positions.len()
    }

    /// Particles that participate in the solve (everything but Buffer).
    pub fn is_active(&self, i: usize) -> bool {
        self.particle_types[i] != SphParticleType::Buffer
    }

    /// Number of particles currently of the given type.
    pub fn count_of_type(&self, ty: SphParticleType) -> usize {
        self.particle_types.iter().filter(|&&t| t == ty).count()
    }

    /// Zero every per-step acceleration array.
    pub fn clear_accels(&mut self) {
        for a in self
            .pressure_accels
            .iter_mut()
            .chain(self.viscous_accels.iter_mut())
            .chain(self.surface_tension_accels.iter_mut())
            .chain(self.accels.iter_mut())
        {
            *a = Vec3d::ZERO;
        }
    }
}
