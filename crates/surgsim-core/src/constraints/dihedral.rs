use crate::body::ParticleId;
use crate::constraints::ConstraintValue;
use crate::math::{Real, Vec3d, REAL_EPS};

/// Preserves the dihedral angle between two triangles sharing an edge.
///
/// Particle order is `(p0, p1, p2, p3)` with triangles `(p0, p2, p3)` and
/// `(p1, p3, p2)` hinging along the shared edge `p2 -- p3`.
pub struct DihedralConstraint {
    pub particles: [ParticleId; 4],
    pub rest_angle: Real,
    pub stiffness: Real,
    pub compliance: Real,
    pub lambda: Real,
}

impl DihedralConstraint {
    /// Build from rest positions; the rest angle is the signed dihedral of
    /// the rest configuration.
    pub fn new(
        p0: Vec3d,
        p1: Vec3d,
        p2: Vec3d,
        p3: Vec3d,
        ids: [ParticleId; 4],
        stiffness: Real,
    ) -> Self {
        let n1 = (p2 - p0).cross(p3 - p0).normalize();
        let n2 = (p3 - p1).cross(p2 - p1).normalize();
        let e = p3 - p2;
        let rest_angle = n1.cross(n2).dot(e).atan2(e.length() * n1.dot(n2));
        Self {
            particles: ids,
            rest_angle,
            stiffness,
            compliance: 1.0 / stiffness,
            lambda: 0.0,
        }
    }

    pub fn evaluate(&self, x: &[Vec3d; 4]) -> Option<ConstraintValue> {
        let (p0, p1, p2, p3) = (x[0], x[1], x[2], x[3]);

        let e = p3 - p2;
        let e1 = p3 - p0;
        let e2 = p0 - p2;
        let e3 = p3 - p1;
        let e4 = p1 - p2;

        let mut n1 = e1.cross(e);
        let mut n2 = e.cross(e3);
        let a1 = n1.length();
        let a2 = n2.length();
        let l = e.length();
        if l < REAL_EPS || a1 < REAL_EPS || a2 < REAL_EPS {
            return None;
        }
        n1 /= a1;
        n2 /= a2;

        let dcdx = [
            n1 * (-l / a1),
            n2 * (-l / a2),
            n1 * (e.dot(e1) / (a1 * l)) + n2 * (e.dot(e3) / (a2 * l)),
            n1 * (e.dot(e2) / (a1 * l)) + n2 * (e.dot(e4) / (a2 * l)),
        ];
        let c = n1.cross(n2).dot(e).atan2(l * n1.dot(n2)) - self.rest_angle;

        Some(ConstraintValue { c, dcdx })
    }
}
