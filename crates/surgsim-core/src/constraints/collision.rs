//! Collision response constraints: point vs triangle, segment vs segment
//! with continuous detection, and point vs analytic contact.

use crate::body::ParticleId;
use crate::ccd::{CcdResult, EdgeEdgeCcdState};
use crate::constraints::ConstraintValue;
use crate::math::{Real, Vec3d, REAL_EPS};

/// Keeps a point a proximity distance away from a triangle.
///
/// Particle order: `(point, t0, t1, t2)`. Projection is gated on the point
/// projecting inside the triangle and within the proximity depth; otherwise
/// the constraint is inactive for the iteration.
pub struct PointTriangleConstraint {
    pub particles: [ParticleId; 4],
    /// Combined proximity of the two colliding surfaces.
    pub proximity: Real,
    pub stiffness: Real,
    pub compliance: Real,
    pub lambda: Real,
}

impl PointTriangleConstraint {
    pub fn new(ids: [ParticleId; 4], proximity: Real, stiffness: Real) -> Self {
        Self {
            particles: ids,
            proximity,
            stiffness,
            compliance: 1.0 / stiffness,
            lambda: 0.0,
        }
    }

    pub fn evaluate(&self, x: &[Vec3d; 4]) -> Option<ConstraintValue> {
        let (x0, x1, x2, x3) = (x[0], x[1], x[2], x[3]);

        let x12 = x2 - x1;
        let x13 = x3 - x1;
        let mut n = x12.cross(x13);
        let nn = n.dot(n);
        if nn < REAL_EPS {
            return None;
        }
        let x01 = x0 - x1;

        let alpha = n.dot(x12.cross(x01)) / nn;
        let beta = n.dot(x01.cross(x13)) / nn;
        if alpha < 0.0 || beta < 0.0 || alpha + beta > 1.0 {
            // Projection point outside the triangle.
            return None;
        }

        n = n.normalize();
        let l = x01.dot(n);
        if l > self.proximity {
            return None;
        }
        let gamma = 1.0 - alpha - beta;

        Some(ConstraintValue {
            c: l - self.proximity,
            dcdx: [n, -alpha * n, -beta * n, -gamma * n],
        })
    }
}

/// Resolves a segment-segment collision found by the CCD classifier.
///
/// Holds the previous-step endpoints by value; only the four current-step
/// particles receive gradients. The correction acts along the closest-point
/// axis, split across the endpoints by the closest-point parameters.
pub struct EdgeEdgeCcdConstraint {
    /// Current-step particles `(a0, a1, b0, b1)`.
    pub particles: [ParticleId; 4],
    pub prev_a: [Vec3d; 2],
    pub prev_b: [Vec3d; 2],
    pub stiffness: Real,
    pub compliance: Real,
    pub lambda: Real,
}

impl EdgeEdgeCcdConstraint {
    pub fn new(
        ids: [ParticleId; 4],
        prev_a: [Vec3d; 2],
        prev_b: [Vec3d; 2],
        stiffness: Real,
    ) -> Self {
        Self {
            particles: ids,
            prev_a,
            prev_b,
            stiffness,
            compliance: 1.0 / stiffness,
            lambda: 0.0,
        }
    }

    pub fn evaluate(&self, x: &[Vec3d; 4]) -> Option<ConstraintValue> {
        let prev = EdgeEdgeCcdState::new(self.prev_a[0], self.prev_a[1], self.prev_b[0], self.prev_b[1]);
        let curr = EdgeEdgeCcdState::new(x[0], x[1], x[2], x[3]);

        let (kind, _toi) = EdgeEdgeCcdState::test_collision(&prev, &curr);
        if kind == CcdResult::None {
            return None;
        }

        let s = curr.si();
        let t = curr.sj();
        let n0 = prev.pi() - prev.pj();
        let n1 = curr.pi() - curr.pj();

        // Invert the normal if the segments crossed during the interval.
        let crossing = n0.dot(n1) < 0.0;
        let mut n = if crossing { -n1 } else { n1 };

        let d = n.length();
        if d <= 0.0 {
            return None;
        }
        n /= d;

        let c = if crossing {
            d + curr.thickness()
        } else {
            (d - curr.thickness()).abs()
        };

        Some(ConstraintValue {
            c,
            dcdx: [(1.0 - s) * n, s * n, -(1.0 - t) * n, -t * n],
        })
    }
}

/// Pushes a single particle out along a fixed penetration direction, as
/// produced by collision against analytic geometry.
pub struct PointNormalConstraint {
    pub particles: [ParticleId; 1],
    pub contact_point: Vec3d,
    /// Unit penetration direction.
    pub normal: Vec3d,
    pub penetration_depth: Real,
    pub stiffness: Real,
    pub compliance: Real,
    pub lambda: Real,
}

impl PointNormalConstraint {
    /// `penetration_vector` is the displacement that resolves the contact:
    /// it points from the penetrated position back toward the surface, with
    /// the penetration depth as its magnitude.
    pub fn new(id: ParticleId, contact_point: Vec3d, penetration_vector: Vec3d, stiffness: Real) -> Self {
        Self {
            particles: [id],
            contact_point,
            normal: penetration_vector.normalize(),
            penetration_depth: penetration_vector.length(),
            stiffness,
            compliance: 1.0 / stiffness,
            lambda: 0.0,
        }
    }

    pub fn evaluate(&self, x: &[Vec3d; 4]) -> Option<ConstraintValue> {
        let diff = x[0] - self.contact_point;
        // Remaining penetration along the normal, clamped to what the
        // original contact reported.
        let c = diff.dot(-self.normal).min(self.penetration_depth).max(0.0);

        Some(ConstraintValue {
            c,
            dcdx: [-self.normal, Vec3d::ZERO, Vec3d::ZERO, Vec3d::ZERO],
        })
    }
}
