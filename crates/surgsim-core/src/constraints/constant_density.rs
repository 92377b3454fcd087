//! Global constant-density constraint for position-based fluids.
//!
//! Reference: "Position Based Fluids", Macklin & Muller, SIGGRAPH 2013.

use crate::body::PbdState;
use crate::math::{Real, Vec3d};
use crate::neighbor_search::{Method, NeighborSearch};
use crate::parallel;

use std::f64::consts::PI;

/// Keeps a body of particles at a constant rest density.
///
/// Unlike the geometric constraints this one spans every particle of its
/// body: each projection runs a fixed-radius neighbor search, estimates
/// densities with the poly6 kernel, solves one relaxed Lagrange multiplier
/// per particle and applies the summed spiky-gradient corrections.
pub struct ConstantDensityConstraint {
    /// Index of the fluid body inside the solver state.
    pub body: usize,

    max_dist: Real,
    max_dist_sqr: Real,
    rest_density: Real,
    relaxation: Real,
    w_poly6_coeff: Real,
    w_spiky_coeff: Real,

    neighbor_searcher: NeighborSearch,
    neighbor_lists: Vec<Vec<usize>>,
    densities: Vec<Real>,
    lambdas: Vec<Real>,
}

impl ConstantDensityConstraint {
    /// `max_dist` is the interaction radius (also the neighbor search
    /// radius and the kernel support).
    pub fn new(body: usize, num_particles: usize, max_dist: Real, rest_density: Real) -> Self {
        let mut constraint = Self {
            body,
            max_dist: 0.0,
            max_dist_sqr: 0.0,
            rest_density,
            relaxation: 600.0,
            w_poly6_coeff: 0.0,
            w_spiky_coeff: 0.0,
            neighbor_searcher: NeighborSearch::new(Method::UniformGridBasedSearch, max_dist)
                .expect("positive interaction radius"),
            neighbor_lists: vec![Vec::new(); num_particles],
            densities: vec![0.0; num_particles],
            lambdas: vec![0.0; num_particles],
        };
        constraint.set_max_neighbor_distance(max_dist);
        constraint
    }

    pub fn densities(&self) -> &[Real] {
        &self.densities
    }

    pub fn rest_density(&self) -> Real {
        self.rest_density
    }

    pub fn set_rest_density(&mut self, density: Real) {
        self.rest_density = density;
    }

    pub fn set_relaxation(&mut self, relaxation: Real) {
        self.relaxation = relaxation;
    }

    pub fn set_max_neighbor_distance(&mut self, dist: Real) {
        self.max_dist = dist;
        self.max_dist_sqr = dist * dist;
        self.w_poly6_coeff = 315.0 / (64.0 * PI * dist.powi(9));
        self.w_spiky_coeff = 15.0 / (PI * dist.powi(6));
        self.neighbor_searcher
            .set_search_radius(dist)
            .expect("positive interaction radius");
    }

    fn w_poly6(&self, pi: Vec3d, pj: Vec3d) -> Real {
        let r_sqr = (pi - pj).length_squared();
        if r_sqr > self.max_dist_sqr || r_sqr < 1.0e-20 {
            return 0.0;
        }
        let diff = self.max_dist_sqr - r_sqr;
        self.w_poly6_coeff * diff * diff * diff
    }

    fn grad_spiky(&self, pi: Vec3d, pj: Vec3d) -> Vec3d {
        let r = pi - pj;
        let r_sqr = r.length_squared();
        if r_sqr > self.max_dist_sqr || r_sqr < 1.0e-20 {
            return Vec3d::ZERO;
        }
        let r_len = r_sqr.sqrt();
        let hr = self.max_dist - r_len;
        r * (self.w_spiky_coeff * hr * hr)
    }

    /// Solve the constraint over the whole body: neighbor search, density
    /// and lambda estimation in parallel, then the position update.
    pub fn project(&mut self, state: &mut PbdState) {
        let n = state.bodies[self.body].positions.len();
        if self.densities.len() != n {
            self.neighbor_lists.resize(n, Vec::new());
            self.densities.resize(n, 0.0);
            self.lambdas.resize(n, 0.0);
        }

        self.neighbor_searcher
            .get_self_neighbors(&mut self.neighbor_lists, &state.bodies[self.body].positions);

        let positions = &state.bodies[self.body].positions;
        let lists = &self.neighbor_lists;

        let densities = parallel::parallel_map(n, |p| {
            let mut sum = 0.0;
            for &q in &lists[p] {
                sum += self.w_poly6(positions[p], positions[q]);
            }
            sum
        });

        let lambdas = parallel::parallel_map(n, |p| {
            let c = densities[p] / self.rest_density - 1.0;
            let mut gradient_sum = 0.0;
            for &q in &lists[p] {
                gradient_sum +=
                    self.grad_spiky(positions[p], positions[q]).length_squared() / self.rest_density;
            }
            c / (gradient_sum + self.relaxation)
        });

        let deltas = parallel::parallel_map(n, |p| {
            let mut grad_lambda_sum = Vec3d::ZERO;
            for &q in &lists[p] {
                grad_lambda_sum +=
                    self.grad_spiky(positions[p], positions[q]) * (lambdas[p] + lambdas[q]);
            }
            grad_lambda_sum / self.rest_density
        });

        self.densities = densities;
        self.lambdas = lambdas;

        let body = &mut state.bodies[self.body];
        for p in 0..n {
            if body.inv_masses[p] > 0.0 {
                body.positions[p] += deltas[p];
            }
        }
    }
}
