//! Inlet/outlet boundary conditions for pipe-like fluid domains.

use crate::math::{Real, Vec3d};
use crate::sph::state::SphParticleType;

use std::f64::consts::PI;

/// Default size of the Buffer particle reserve.
const NUM_BUFFER_PARTICLES: usize = 10_000;

/// Axis-aligned box, stored as (lower, upper) corners.
pub type Domain = (Vec3d, Vec3d);

#[inline]
fn contains(domain: &Domain, p: Vec3d, slack: Real) -> bool {
    p.x >= domain.0.x - slack
        && p.y >= domain.0.y - slack
        && p.z >= domain.0.z - slack
        && p.x <= domain.1.x + slack
        && p.y <= domain.1.y + slack
        && p.z <= domain.1.z + slack
}

/// Inlet, outlet and fluid domains of an open fluid system.
///
/// The inlet drives a parabolic velocity profile over a disc of the given
/// radius and (axis-aligned, unit) normal, scaled so the integrated flow
/// matches the requested rate. A reserve of Buffer particles parked at a far
/// coordinate keeps the total particle count constant: particles leaving
/// through the outlet are parked, and the reserve refills the inlet plane.
pub struct SphBoundaryConditions {
    inlet_domain: Domain,
    outlet_domains: Vec<Domain>,
    fluid_domain: Domain,

    inlet_center_point: Vec3d,
    inlet_radius: Real,
    inlet_normal: Vec3d,
    inlet_cross_sectional_area: Real,
    inlet_velocity: Vec3d,

    buffer_coord: Vec3d,
    buffer_indices: Vec<usize>,
    particle_types: Vec<SphParticleType>,
}

impl SphBoundaryConditions {
    /// Classify `main_positions`, then append the wall and buffer particles
    /// to it (walls keep their position, buffers park at the far coordinate).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        inlet_domain: Domain,
        outlet_domains: Vec<Domain>,
        fluid_domain: Domain,
        inlet_normal: Vec3d,
        inlet_radius: Real,
        inlet_center_point: Vec3d,
        inlet_flow_rate: Real,
        main_positions: &mut Vec<Vec3d>,
        wall_positions: &[Vec3d],
    ) -> Self {
        Self::with_buffer_count(
            inlet_domain,
            outlet_domains,
            fluid_domain,
            inlet_normal,
            inlet_radius,
            inlet_center_point,
            inlet_flow_rate,
            main_positions,
            wall_positions,
            NUM_BUFFER_PARTICLES,
        )
    }

    /// Same as [`Self::new`] with an explicit Buffer reserve size.
    #[allow(clippy::too_many_arguments)]
    pub fn with_buffer_count(
        inlet_domain: Domain,
        outlet_domains: Vec<Domain>,
        fluid_domain: Domain,
        inlet_normal: Vec3d,
        inlet_radius: Real,
        inlet_center_point: Vec3d,
        inlet_flow_rate: Real,
        main_positions: &mut Vec<Vec3d>,
        wall_positions: &[Vec3d],
        num_buffer_particles: usize,
    ) -> Self {
        let inlet_cross_sectional_area = PI * inlet_radius * inlet_radius;
        let mut bc = Self {
            inlet_domain,
            outlet_domains,
            fluid_domain,
            inlet_center_point,
            inlet_radius,
            inlet_normal: inlet_normal.normalize(),
            inlet_cross_sectional_area,
            inlet_velocity: Vec3d::ZERO,
            buffer_coord: Vec3d::new(100.0, 0.0, 0.0),
            buffer_indices: Vec::new(),
            particle_types: Vec::new(),
        };
        bc.set_inlet_velocity(inlet_flow_rate);
        bc.set_particle_types(main_positions, wall_positions.len(), num_buffer_particles);
        bc.add_boundary_particles(main_positions, wall_positions, num_buffer_particles);
        bc
    }

    pub fn is_in_inlet_domain(&self, position: Vec3d) -> bool {
        contains(&self.inlet_domain, position, 0.0)
    }

    pub fn is_in_outlet_domain(&self, position: Vec3d) -> bool {
        self.outlet_domains.iter().any(|d| contains(d, position, 0.0))
    }

    /// Fluid domain check with a small slack so particles on the boundary
    /// are not reaped by round-off.
    pub fn is_in_fluid_domain(&self, position: Vec3d) -> bool {
        contains(&self.fluid_domain, position, 0.1)
    }

    fn set_particle_types(
        &mut self,
        main_positions: &[Vec3d],
        num_wall_particles: usize,
        num_buffer_particles: usize,
    ) {
        self.particle_types
            .reserve(main_positions.len() + num_wall_particles + num_buffer_particles);
        for &p in main_positions {
            let ty = if self.is_in_inlet_domain(p) {
                SphParticleType::Inlet
            } else if self.is_in_outlet_domain(p) {
                SphParticleType::Outlet
            } else {
                SphParticleType::Fluid
            };
            self.particle_types.push(ty);
        }
        self.particle_types
            .extend(std::iter::repeat(SphParticleType::Wall).take(num_wall_particles));
        self.particle_types
            .extend(std::iter::repeat(SphParticleType::Buffer).take(num_buffer_particles));

        let total = self.particle_types.len();
        self.buffer_indices
            .extend(total - num_buffer_particles..total);
    }

    fn add_boundary_particles(
        &self,
        main_positions: &mut Vec<Vec3d>,
        wall_positions: &[Vec3d],
        num_buffer_particles: usize,
    ) {
        main_positions.extend_from_slice(wall_positions);
        main_positions.extend(std::iter::repeat(self.buffer_coord).take(num_buffer_particles));
    }

    /// Peak inlet velocity so the parabolic profile integrates to the flow
    /// rate: `v_peak = 2 Q / A` against the inlet normal.
    pub fn set_inlet_velocity(&mut self, flow_rate: Real) {
        self.inlet_velocity =
            -self.inlet_normal * (flow_rate / self.inlet_cross_sectional_area * 2.0);
    }

    pub fn inlet_velocity(&self) -> Vec3d {
        self.inlet_velocity
    }

    pub fn inlet_normal(&self) -> Vec3d {
        self.inlet_normal
    }

    pub fn inlet_coord(&self) -> Vec3d {
        self.inlet_domain.0
    }

    pub fn buffer_coord(&self) -> Vec3d {
        self.buffer_coord
    }

    pub fn particle_types(&self) -> &[SphParticleType] {
        &self.particle_types
    }

    pub fn take_particle_types(&mut self) -> Vec<SphParticleType> {
        std::mem::take(&mut self.particle_types)
    }

    /// Pop a parked particle index from the reserve, if any remain.
    pub fn pop_buffer_index(&mut self) -> Option<usize> {
        self.buffer_indices.pop()
    }

    /// Return a particle index to the reserve.
    pub fn push_buffer_index(&mut self, index: usize) {
        self.buffer_indices.push(index);
    }

    /// Parabolic profile across the inlet disc: full velocity on the axis,
    /// zero at the rim and outside it.
    ///
    /// Assumes the inlet normal is a signed unit axis vector.
    pub fn compute_parabolic_inlet_velocity(&self, position: Vec3d) -> Vec3d {
        let one = Vec3d::ONE;
        let axis_center = (one + self.inlet_normal) * self.inlet_center_point
            + self.inlet_normal * position.dot(self.inlet_normal);
        let distance = (position - axis_center).length();
        if distance > self.inlet_radius {
            Vec3d::ZERO
        } else {
            let ratio = distance / self.inlet_radius;
            self.inlet_velocity * (1.0 - ratio * ratio)
        }
    }

    /// Project a position onto the inlet plane, keeping its transverse
    /// coordinates. Used to respawn reserve particles at the inlet.
    ///
    /// Assumes the inlet normal is a signed unit axis vector.
    pub fn place_particle_at_inlet(&self, position: Vec3d) -> Vec3d {
        (Vec3d::ONE + self.inlet_normal) * position
            - self.inlet_center_point * self.inlet_normal
    }
}
