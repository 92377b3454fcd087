//! Position-based dynamics constraints.
//!
//! Every constraint variant exposes a value-and-gradient evaluation that is
//! a pure function of the referenced particle positions; the shared xPBD /
//! PBD projection in this module turns those into position (or orientation)
//! updates. Degenerate geometry makes `evaluate` return `None`: the
//! projection is skipped for that inner iteration and the solver advances.
//!
//! Reference: "XPBD: Position-Based Simulation of Compliant Constrained
//! Dynamics", Macklin et al., 2016.

pub mod angular;
pub mod area;
pub mod bend;
pub mod collision;
pub mod constant_density;
pub mod dihedral;
pub mod distance;
pub mod fem_tet;
pub mod volume;

use crate::body::{ParticleId, PbdState};
use crate::math::{Quatd, Real, Vec3d, REAL_EPS};

pub use angular::{AngularDistanceConstraint, HingeConstraint};
pub use area::AreaConstraint;
pub use bend::BendConstraint;
pub use collision::{EdgeEdgeCcdConstraint, PointNormalConstraint, PointTriangleConstraint};
pub use constant_density::ConstantDensityConstraint;
pub use dihedral::DihedralConstraint;
pub use distance::DistanceConstraint;
pub use fem_tet::{FemMaterial, FemTetConstraint, FemTetMaterialConfig};
pub use volume::VolumeConstraint;

/// Projection formulation used by the solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverType {
    /// Compliance-based with accumulated Lagrange multipliers.
    Xpbd,
    /// Classical stiffness-scaled projection, no multiplier accumulation.
    Pbd,
}

/// Value and per-particle gradients of one constraint evaluation.
///
/// Gradients are stored in the order of the constraint's particle list;
/// entries past the arity are zero.
pub struct ConstraintValue {
    pub c: Real,
    pub dcdx: [Vec3d; 4],
}

/// Tagged union over every constraint the solver can project.
pub enum Constraint {
    Distance(DistanceConstraint),
    Bend(BendConstraint),
    Dihedral(DihedralConstraint),
    Area(AreaConstraint),
    Volume(VolumeConstraint),
    FemTet(FemTetConstraint),
    Hinge(HingeConstraint),
    AngularDistance(AngularDistanceConstraint),
    PointTriangle(PointTriangleConstraint),
    EdgeEdgeCcd(EdgeEdgeCcdConstraint),
    PointNormal(PointNormalConstraint),
    ConstantDensity(ConstantDensityConstraint),
}

impl Constraint {
    /// Particles coupled by this constraint (empty for the global
    /// constant-density constraint, which spans a whole body).
    pub fn particles(&self) -> &[ParticleId] {
        match self {
            Constraint::Distance(c) => &c.particles,
            Constraint::Bend(c) => &c.particles,
            Constraint::Dihedral(c) => &c.particles,
            Constraint::Area(c) => &c.particles,
            Constraint::Volume(c) => &c.particles,
            Constraint::FemTet(c) => &c.particles,
            Constraint::Hinge(c) => &c.particles,
            Constraint::AngularDistance(c) => &c.particles,
            Constraint::PointTriangle(c) => &c.particles,
            Constraint::EdgeEdgeCcd(c) => &c.particles,
            Constraint::PointNormal(c) => &c.particles,
            Constraint::ConstantDensity(_) => &[],
        }
    }

    /// Accumulated Lagrange multiplier.
    pub fn lambda(&self) -> Real {
        match self {
            Constraint::Distance(c) => c.lambda,
            Constraint::Bend(c) => c.lambda,
            Constraint::Dihedral(c) => c.lambda,
            Constraint::Area(c) => c.lambda,
            Constraint::Volume(c) => c.lambda,
            Constraint::FemTet(c) => c.lambda,
            Constraint::Hinge(c) => c.lambda,
            Constraint::AngularDistance(c) => c.lambda,
            Constraint::PointTriangle(c) => c.lambda,
            Constraint::EdgeEdgeCcd(c) => c.lambda,
            Constraint::PointNormal(c) => c.lambda,
            Constraint::ConstantDensity(_) => 0.0,
        }
    }

    fn lambda_mut(&mut self) -> Option<&mut Real> {
        match self {
            Constraint::Distance(c) => Some(&mut c.lambda),
            Constraint::Bend(c) => Some(&mut c.lambda),
            Constraint::Dihedral(c) => Some(&mut c.lambda),
            Constraint::Area(c) => Some(&mut c.lambda),
            Constraint::Volume(c) => Some(&mut c.lambda),
            Constraint::FemTet(c) => Some(&mut c.lambda),
            Constraint::Hinge(c) => Some(&mut c.lambda),
            Constraint::AngularDistance(c) => Some(&mut c.lambda),
            Constraint::PointTriangle(c) => Some(&mut c.lambda),
            Constraint::EdgeEdgeCcd(c) => Some(&mut c.lambda),
            Constraint::PointNormal(c) => Some(&mut c.lambda),
            Constraint::ConstantDensity(_) => None,
        }
    }

    /// Stiffness (classical PBD) and compliance (xPBD) pair.
    fn coefficients(&self) -> (Real, Real) {
        match self {
            Constraint::Distance(c) => (c.stiffness, c.compliance),
            Constraint::Bend(c) => (c.stiffness, c.compliance),
            Constraint::Dihedral(c) => (c.stiffness, c.compliance),
            Constraint::Area(c) => (c.stiffness, c.compliance),
            Constraint::Volume(c) => (c.stiffness, c.compliance),
            Constraint::FemTet(c) => (c.stiffness, c.compliance),
            Constraint::Hinge(c) => (c.stiffness, c.compliance),
            Constraint::AngularDistance(c) => (c.stiffness, c.compliance),
            Constraint::PointTriangle(c) => (c.stiffness, c.compliance),
            Constraint::EdgeEdgeCcd(c) => (c.stiffness, c.compliance),
            Constraint::PointNormal(c) => (c.stiffness, c.compliance),
            Constraint::ConstantDensity(_) => (1.0, 0.0),
        }
    }

    /// Reset the accumulated Lagrange multiplier. Called once per step.
    pub fn zero_lambda(&mut self) {
        if let Some(lambda) = self.lambda_mut() {
            *lambda = 0.0;
        }
    }

    /// Evaluate a positional variant against the gathered positions.
    fn evaluate_positional(&self, x: &[Vec3d; 4]) -> Option<ConstraintValue> {
        match self {
            Constraint::Distance(c) => c.evaluate(x),
            Constraint::Bend(c) => c.evaluate(x),
            Constraint::Dihedral(c) => c.evaluate(x),
            Constraint::Area(c) => c.evaluate(x),
            Constraint::Volume(c) => c.evaluate(x),
            Constraint::FemTet(c) => c.evaluate(x),
            Constraint::PointTriangle(c) => c.evaluate(x),
            Constraint::EdgeEdgeCcd(c) => c.evaluate(x),
            Constraint::PointNormal(c) => c.evaluate(x),
            _ => None,
        }
    }

    /// Project the constraint once against the current state.
    pub fn project(&mut self, state: &mut PbdState, dt: Real, solver: SolverType) {
        if dt == 0.0 {
            return;
        }
        match self {
            Constraint::Hinge(_) | Constraint::AngularDistance(_) => {
                let value = match self {
                    Constraint::Hinge(c) => c.evaluate(state),
                    Constraint::AngularDistance(c) => c.evaluate(state),
                    _ => unreachable!(),
                };
                if let Some(value) = value {
                    self.apply_angular(state, &value, dt, solver);
                }
            }
            Constraint::ConstantDensity(c) => c.project(state),
            _ => {
                let ids = copy_ids(self.particles());
                let x = gather(state, ids.as_slice());
                if let Some(value) = self.evaluate_positional(&x) {
                    self.apply_positional(state, ids.as_slice(), &value, dt, solver);
                }
            }
        }
    }

    /// Shared positional projection step.
    ///
    /// xPBD: `dl = -(c + alpha*lambda) / (sum_i w_i |g_i|^2 + alpha)` with
    /// `alpha = compliance / dt^2`, accumulating `lambda`. Classical PBD:
    /// `dl = -c * stiffness / sum_i w_i |g_i|^2`. Pinned particles (inverse
    /// mass 0) are never displaced.
    fn apply_positional(
        &mut self,
        state: &mut PbdState,
        ids: &[ParticleId],
        value: &ConstraintValue,
        dt: Real,
        solver: SolverType,
    ) {
        let mut dc_midc = 0.0;
        for (id, grad) in ids.iter().zip(&value.dcdx) {
            dc_midc += state.inv_mass(*id) * grad.length_squared();
        }
        if dc_midc < REAL_EPS {
            return;
        }

        let (stiffness, compliance) = self.coefficients();
        let dl = match solver {
            SolverType::Xpbd => {
                let lambda = self.lambda_mut().expect("positional constraints carry lambda");
                let alpha = compliance / (dt * dt);
                let dl = -(value.c + alpha * *lambda) / (dc_midc + alpha);
                *lambda += dl;
                dl
            }
            SolverType::Pbd => -value.c * stiffness / dc_midc,
        };

        for (id, grad) in ids.iter().zip(&value.dcdx) {
            let w = state.inv_mass(*id);
            if w > 0.0 {
                let p = state.position(*id);
                state.set_position(*id, p + *grad * (w * dl));
            }
        }
    }

    /// Shared angular projection step.
    ///
    /// Gradients are rotation generators in world space; the generalized
    /// inverse mass comes from the body-frame inverse inertia. Each applied
    /// rotation is clamped to 0.5 rad to keep the small-angle quaternion
    /// update stable.
    fn apply_angular(
        &mut self,
        state: &mut PbdState,
        value: &ConstraintValue,
        dt: Real,
        solver: SolverType,
    ) {
        let ids = copy_ids(self.particles());

        let mut w_sum = 0.0;
        for (id, grad) in ids.as_slice().iter().zip(&value.dcdx) {
            let q = state.orientation(*id);
            let inv_inertia = state.inv_inertia(*id);
            let l = q.inverse().mul_vec3(*grad);
            w_sum += l.x * l.x * inv_inertia.x_axis.x
                + l.y * l.y * inv_inertia.y_axis.y
                + l.z * l.z * inv_inertia.z_axis.z;
        }
        if w_sum < REAL_EPS {
            return;
        }

        let (stiffness, compliance) = self.coefficients();
        let dl = match solver {
            SolverType::Xpbd => {
                let lambda = self.lambda_mut().expect("angular constraints carry lambda");
                let alpha = compliance / (dt * dt);
                let dl = -(value.c + alpha * *lambda) / (w_sum + alpha);
                *lambda += dl;
                dl
            }
            SolverType::Pbd => -value.c * stiffness / w_sum,
        };

        for (id, grad) in ids.as_slice().iter().zip(&value.dcdx) {
            let q = state.orientation(*id);
            let inv_inertia = state.inv_inertia(*id);

            // Transform to the rest frame, apply inertia, transform back.
            let mut rot = q.inverse().mul_vec3(*grad * dl);
            rot = inv_inertia.mul_vec3(rot);
            rot = q.mul_vec3(rot);

            let phi = rot.length();
            let scale = if phi > 0.5 { 0.5 / phi } else { 1.0 };
            rot *= scale;

            let dq = Quatd::from_xyzw(rot.x, rot.y, rot.z, 0.0) * q;
            let updated = Quatd::from_xyzw(
                q.x + 0.5 * dq.x,
                q.y + 0.5 * dq.y,
                q.z + 0.5 * dq.z,
                q.w + 0.5 * dq.w,
            )
            .normalize();
            state.set_orientation(*id, updated);
        }
    }
}

/// Owned copy of a particle-id list (arity <= 4).
struct IdList {
    ids: [ParticleId; 4],
    len: usize,
}

impl IdList {
    fn as_slice(&self) -> &[ParticleId] {
        &self.ids[..self.len]
    }
}

fn copy_ids(ids: &[ParticleId]) -> IdList {
    let mut out = IdList {
        ids: [ParticleId::new(0, 0); 4],
        len: ids.len(),
    };
    out.ids[..ids.len()].copy_from_slice(ids);
    out
}

/// Fetch the positions of the referenced particles (padded with zeros).
fn gather(state: &PbdState, ids: &[ParticleId]) -> [Vec3d; 4] {
    let mut x = [Vec3d::ZERO; 4];
    for (slot, id) in x.iter_mut().zip(ids) {
        *slot = state.position(*id);
    }
    x
}
