//! Particle state owned by the PBD solver.

use crate::math::{Mat3d, Quatd, Real, Vec3d};

/// Stable handle to one particle: the owning body plus the local index.
///
/// Constraints store these instead of pointers, so they survive reallocation
/// of the underlying arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParticleId {
    pub body: usize,
    pub index: usize,
}

impl ParticleId {
    pub fn new(body: usize, index: usize) -> Self {
        Self { body, index }
    }
}

/// One deformable body: structure-of-arrays particle state.
///
/// A particle with inverse mass 0 is pinned and is never displaced by a
/// constraint projection. The orientation arrays are populated only for
/// bodies carrying oriented particles (rigid elements, hinge joints); they
/// are empty otherwise and angular constraints must not reference such
/// bodies.
#[derive(Default)]
pub struct PbdBody {
    pub positions: Vec<Vec3d>,
    pub prev_positions: Vec<Vec3d>,
    pub velocities: Vec<Vec3d>,
    pub inv_masses: Vec<Real>,
    /// Per-step external force on each particle, consumed by the predictor.
    pub external_forces: Vec<Vec3d>,

    pub orientations: Vec<Quatd>,
    pub prev_orientations: Vec<Quatd>,
    pub angular_velocities: Vec<Vec3d>,
    /// Body-frame inverse inertia tensors (diagonal for primitive shapes).
    pub inv_inertias: Vec<Mat3d>,
}

impl PbdBody {
    /// Body from rest positions with uniform particle mass.
    ///
    /// `mass` is the per-particle mass; zero or negative pins every particle.
    pub fn from_positions(positions: Vec<Vec3d>, mass: Real) -> Self {
        let n = positions.len();
        let inv_mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };
        Self {
            prev_positions: positions.clone(),
            velocities: vec![Vec3d::ZERO; n],
            inv_masses: vec![inv_mass; n],
            external_forces: vec![Vec3d::ZERO; n],
            positions,
            ..Default::default()
        }
    }

    pub fn num_particles(&self) -> usize {
        self.positions.len()
    }

    /// Pin the listed particles (inverse mass 0).
    pub fn set_fixed_indices(&mut self, indices: &[usize]) {
        for &i in indices {
            self.inv_masses[i] = 0.0;
        }
    }

    /// Attach identity orientation state to every particle.
    pub fn with_orientations(mut self) -> Self {
        let n = self.num_particles();
        self.orientations = vec![Quatd::IDENTITY; n];
        self.prev_orientations = vec![Quatd::IDENTITY; n];
        self.angular_velocities = vec![Vec3d::ZERO; n];
        self.inv_inertias = vec![Mat3d::IDENTITY; n];
        self
    }

    pub fn has_orientations(&self) -> bool {
        !self.orientations.is_empty()
    }

    /// Zero the per-step external force inputs.
    pub fn clear_external_forces(&mut self) {
        for f in &mut self.external_forces {
            *f = Vec3d::ZERO;
        }
    }
}

/// All bodies owned by one simulation, addressed through [`ParticleId`].
#[derive(Default)]
pub struct PbdState {
    pub bodies: Vec<PbdBody>,
}

impl PbdState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a body and return its index for building [`ParticleId`]s.
    pub fn add_body(&mut self, body: PbdBody) -> usize {
        self.bodies.push(body);
        self.bodies.len() - 1
    }

    #[inline]
    pub fn position(&self, id: ParticleId) -> Vec3d {
        self.bodies[id.body].positions[id.index]
    }

    #[inline]
    pub fn set_position(&mut self, id: ParticleId, p: Vec3d) {
        self.bodies[id.body].positions[id.index] = p;
    }

    #[inline]
    pub fn inv_mass(&self, id: ParticleId) -> Real {
        self.bodies[id.body].inv_masses[id.index]
    }

    #[inline]
    pub fn orientation(&self, id: ParticleId) -> Quatd {
        self.bodies[id.body].orientations[id.index]
    }

    #[inline]
    pub fn set_orientation(&mut self, id: ParticleId, q: Quatd) {
        self.bodies[id.body].orientations[id.index] = q;
    }

    #[inline]
    pub fn inv_inertia(&self, id: ParticleId) -> Mat3d {
        self.bodies[id.body].inv_inertias[id.index]
    }
}
