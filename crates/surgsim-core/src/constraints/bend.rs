use crate::body::ParticleId;
use crate::constraints::ConstraintValue;
use crate::math::{Real, Vec3d, REAL_EPS};

/// Resists bending of three consecutive particles.
///
/// Instead of the angle between the two segments, the constraint tracks the
/// distance from the middle particle to the centroid of the triple, which is
/// zero for a straight (or evenly spread) configuration and cheaper to
/// differentiate.
pub struct BendConstraint {
    pub particles: [ParticleId; 3],
    pub rest_length: Real,
    pub stiffness: Real,
    pub compliance: Real,
    pub lambda: Real,
}

impl BendConstraint {
    /// Build from the rest positions of the three particles, middle second.
    pub fn new(p0: Vec3d, p1: Vec3d, p2: Vec3d, ids: [ParticleId; 3], stiffness: Real) -> Self {
        let center = (p0 + p1 + p2) / 3.0;
        Self {
            particles: ids,
            rest_length: (p1 - center).length(),
            stiffness,
            compliance: 1.0 / stiffness,
            lambda: 0.0,
        }
    }

    pub fn evaluate(&self, x: &[Vec3d; 4]) -> Option<ConstraintValue> {
        let center = (x[0] + x[1] + x[2]) / 3.0;
        let diff = x[1] - center;
        let dist = diff.length();
        if dist < REAL_EPS {
            return None;
        }

        let g0 = diff * (-2.0 / dist);
        Some(ConstraintValue {
            c: dist - self.rest_length,
            dcdx: [g0, -2.0 * g0, g0, Vec3d::ZERO],
        })
    }
}
