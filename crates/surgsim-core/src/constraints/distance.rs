use crate::body::ParticleId;
use crate::constraints::ConstraintValue;
use crate::math::{Real, Vec3d};

/// Keeps two particles at their rest distance.
pub struct DistanceConstraint {
    pub particles: [ParticleId; 2],
    pub rest_length: Real,
    pub stiffness: Real,
    pub compliance: Real,
    pub lambda: Real,
}

impl DistanceConstraint {
    /// Build from the rest positions of the two particles.
    pub fn new(p0: Vec3d, p1: Vec3d, ids: [ParticleId; 2], stiffness: Real) -> Self {
        Self {
            particles: ids,
            rest_length: (p0 - p1).length(),
            stiffness,
            compliance: 1.0 / stiffness,
            lambda: 0.0,
        }
    }

    /// `c = |p0 - p1| - L`. Undefined for a zero-length edge.
    pub fn evaluate(&self, x: &[Vec3d; 4]) -> Option<ConstraintValue> {
        let diff = x[0] - x[1];
        let len = diff.length();
        if len == 0.0 {
            return None;
        }
        let n = diff / len;
        Some(ConstraintValue {
            c: len - self.rest_length,
            dcdx: [n, -n, Vec3d::ZERO, Vec3d::ZERO],
        })
    }
}
