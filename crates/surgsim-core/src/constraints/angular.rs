use crate::body::{ParticleId, PbdState};
use crate::constraints::ConstraintValue;
use crate::math::{rotation_vector, Quatd, Real, Vec3d, REAL_EPS};

/// Orients a particle so its local up axis (+Y) follows a world hinge axis.
///
/// The residual is the rotation generator `hinge x up`: zero when aligned,
/// with magnitude `sin` of the misalignment angle.
pub struct HingeConstraint {
    pub particles: [ParticleId; 1],
    pub hinge_axis: Vec3d,
    pub stiffness: Real,
    pub compliance: Real,
    pub lambda: Real,
}

impl HingeConstraint {
    pub fn new(id: ParticleId, hinge_axis: Vec3d, stiffness: Real) -> Self {
        Self {
            particles: [id],
            hinge_axis: hinge_axis.normalize(),
            stiffness,
            compliance: 1.0 / stiffness,
            lambda: 0.0,
        }
    }

    pub fn evaluate(&self, state: &PbdState) -> Option<ConstraintValue> {
        let up = state.orientation(self.particles[0]).mul_vec3(Vec3d::Y);
        let dir = self.hinge_axis.cross(up);
        let c = dir.length();
        if c < REAL_EPS {
            return None;
        }
        Some(ConstraintValue {
            c,
            dcdx: [dir / c, Vec3d::ZERO, Vec3d::ZERO, Vec3d::ZERO],
        })
    }
}

/// Aligns the orientation of one particle to another, with an optional fixed
/// rotational offset.
///
/// The residual is the axis-angle log of the delta rotation; the first
/// particle is driven toward `q1 * offset`, the second the opposite way,
/// split by their inverse inertias.
pub struct AngularDistanceConstraint {
    pub particles: [ParticleId; 2],
    pub offset: Quatd,
    pub stiffness: Real,
    pub compliance: Real,
    pub lambda: Real,
}

impl AngularDistanceConstraint {
    pub fn new(id0: ParticleId, id1: ParticleId, stiffness: Real) -> Self {
        Self {
            particles: [id0, id1],
            offset: Quatd::IDENTITY,
            stiffness,
            compliance: 1.0 / stiffness,
            lambda: 0.0,
        }
    }

    /// Keep a fixed relative rotation between the two bodies instead of
    /// exact alignment.
    pub fn with_offset(mut self, offset: Quatd) -> Self {
        self.offset = offset.normalize();
        self
    }

    pub fn evaluate(&self, state: &PbdState) -> Option<ConstraintValue> {
        let q0 = state.orientation(self.particles[0]);
        let q1 = state.orientation(self.particles[1]);

        let dq = (q1 * self.offset) * q0.inverse();
        let rot = rotation_vector(dq);
        let c = rot.length();
        if c < REAL_EPS {
            return None;
        }
        let axis = rot / c;
        Some(ConstraintValue {
            c,
            dcdx: [-axis, axis, Vec3d::ZERO, Vec3d::ZERO],
        })
    }
}
