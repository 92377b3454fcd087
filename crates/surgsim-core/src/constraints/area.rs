use crate::body::ParticleId;
use crate::constraints::ConstraintValue;
use crate::math::{Real, Vec3d, REAL_EPS};

/// Preserves the area of a triangle.
pub struct AreaConstraint {
    pub particles: [ParticleId; 3],
    pub rest_area: Real,
    pub stiffness: Real,
    pub compliance: Real,
    pub lambda: Real,
}

impl AreaConstraint {
    /// Build from the rest positions of the triangle corners.
    pub fn new(p0: Vec3d, p1: Vec3d, p2: Vec3d, ids: [ParticleId; 3], stiffness: Real) -> Self {
        Self {
            particles: ids,
            rest_area: 0.5 * (p1 - p0).cross(p2 - p0).length(),
            stiffness,
            compliance: 1.0 / stiffness,
            lambda: 0.0,
        }
    }

    pub fn evaluate(&self, x: &[Vec3d; 4]) -> Option<ConstraintValue> {
        let e1 = x[0] - x[1];
        let e2 = x[1] - x[2];
        let e3 = x[2] - x[0];

        let mut n = e1.cross(e2);
        let area = 0.5 * n.length();
        if area < REAL_EPS {
            return None;
        }
        n /= 2.0 * area;

        Some(ConstraintValue {
            c: area - self.rest_area,
            dcdx: [e2.cross(n), e3.cross(n), e1.cross(n), Vec3d::ZERO],
        })
    }
}
