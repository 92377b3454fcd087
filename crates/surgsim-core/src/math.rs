//! Scalar/vector type aliases and small dense-linear-algebra helpers.
//!
//! All simulation state is double precision; `glam`'s f64 types are aliased
//! to the names used throughout the crate.

pub use glam::{DMat3 as Mat3d, DQuat as Quatd, DVec3 as Vec3d};

/// Floating point type used for all simulation state.
pub type Real = f64;

/// Tolerance used by constraint projections to reject degenerate geometry.
pub const REAL_EPS: Real = 1.0e-16;

/// GLSL-style `mix(a, b, t)` for scalars.
#[inline]
pub fn lerp(a: Real, b: Real, t: Real) -> Real {
    a * (1.0 - t) + b * t
}

/// Component-wise minimum of two points (lower corner of their AABB).
#[inline]
pub fn min_corner(a: Vec3d, b: Vec3d) -> Vec3d {
    Vec3d::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z))
}

/// Component-wise maximum of two points (upper corner of their AABB).
#[inline]
pub fn max_corner(a: Vec3d, b: Vec3d) -> Vec3d {
    Vec3d::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z))
}

/// Rotation vector (axis * angle) of a unit quaternion, the log map of SO(3).
///
/// Returns `Vec3d::ZERO` for the identity rotation.
pub fn rotation_vector(q: Quatd) -> Vec3d {
    let v = Vec3d::new(q.x, q.y, q.z);
    let s = v.length();
    if s < 1.0e-12 {
        return Vec3d::ZERO;
    }
    // Keep the angle in (-pi, pi] so the residual is the short way around.
    let angle = 2.0 * s.atan2(q.w.abs());
    let sign = if q.w < 0.0 { -1.0 } else { 1.0 };
    v / s * angle * sign
}

/// Eigen-decomposition of a symmetric 3x3 matrix by cyclic Jacobi sweeps.
///
/// Returns eigenvalues in descending order and the matching orthonormal
/// eigenvectors as columns of a rotation matrix.
fn sym_eigen(a: &Mat3d) -> (Vec3d, Mat3d) {
    let mut m = [
        [a.x_axis.x, a.y_axis.x, a.z_axis.x],
        [a.x_axis.y, a.y_axis.y, a.z_axis.y],
        [a.x_axis.z, a.y_axis.z, a.z_axis.z],
    ];
    let mut v = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    for _ in 0..24 {
        // Largest off-diagonal element.
        let mut p = 0;
        let mut q = 1;
        let mut off = m[0][1].abs();
        if m[0][2].abs() > off {
            p = 0;
            q = 2;
            off = m[0][2].abs();
        }
        if m[1][2].abs() > off {
            p = 1;
            q = 2;
            off = m[1][2].abs();
        }
        if off < 1.0e-15 {
            break;
        }

        // Jacobi rotation zeroing m[p][q].
        let apq = m[p][q];
        let theta = (m[q][q] - m[p][p]) / (2.0 * apq);
        let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
        let c = 1.0 / (t * t + 1.0).sqrt();
        let s = t * c;

        for k in 0..3 {
            let mkp = m[k][p];
            let mkq = m[k][q];
            m[k][p] = c * mkp - s * mkq;
            m[k][q] = s * mkp + c * mkq;
        }
        for k in 0..3 {
            let mpk = m[p][k];
            let mqk = m[q][k];
            m[p][k] = c * mpk - s * mqk;
            m[q][k] = s * mpk + c * mqk;
        }
        for k in 0..3 {
            let vkp = v[k][p];
            let vkq = v[k][q];
            v[k][p] = c * vkp - s * vkq;
            v[k][q] = s * vkp + c * vkq;
        }
    }

    let mut vals = [m[0][0], m[1][1], m[2][2]];
    let mut cols = [
        Vec3d::new(v[0][0], v[1][0], v[2][0]),
        Vec3d::new(v[0][1], v[1][1], v[2][1]),
        Vec3d::new(v[0][2], v[1][2], v[2][2]),
    ];
    // Sort descending.
    for i in 0..2 {
        for j in (i + 1)..3 {
            if vals[j] > vals[i] {
                vals.swap(i, j);
                cols.swap(i, j);
            }
        }
    }
    (
        Vec3d::new(vals[0], vals[1], vals[2]),
        Mat3d::from_cols(cols[0], cols[1], cols[2]),
    )
}

/// Signed singular value decomposition of a 3x3 matrix: `a = u * diag(s) * v^T`.
///
/// `u` and `v` are proper rotations; reflections are folded into the smallest
/// singular value, so `s.x >= s.y >= |s.z|` and `sign(s.z) == sign(det(a))`.
/// This is the convention used by invertible-element FEM: re-signing `s.z`
/// yields the nearest deformation with positive determinant.
pub fn svd3(a: &Mat3d) -> (Mat3d, Vec3d, Mat3d) {
    let ata = a.transpose().mul_mat3(a);
    let (eigvals, mut v) = sym_eigen(&ata);

    let mut sigma = Vec3d::new(
        eigvals.x.max(0.0).sqrt(),
        eigvals.y.max(0.0).sqrt(),
        eigvals.z.max(0.0).sqrt(),
    );

    if v.determinant() < 0.0 {
        v.z_axis = -v.z_axis;
    }

    // u_i = a * v_i / sigma_i; rebuild near-zero columns from the cross
    // product so u stays orthonormal for rank-deficient inputs.
    let mut u0 = a.mul_vec3(v.x_axis);
    let mut u1 = a.mul_vec3(v.y_axis);
    if sigma.x > 1.0e-12 {
        u0 /= sigma.x;
    } else {
        u0 = Vec3d::X;
    }
    if sigma.y > 1.0e-12 {
        u1 /= sigma.y;
    } else {
        u1 = u0.any_orthonormal_vector();
    }
    u1 = (u1 - u0 * u0.dot(u1)).normalize_or_zero();
    if u1 == Vec3d::ZERO {
        u1 = u0.any_orthonormal_vector();
    }
    let u2 = u0.cross(u1);
    let u = Mat3d::from_cols(u0, u1, u2);

    // u was completed to a proper rotation, so any reflection in `a` shows up
    // as a sign flip on the smallest singular value.
    if a.determinant() < 0.0 {
        sigma.z = -sigma.z;
    }

    (u, sigma, v)
}

/// Frobenius inner product `sum_ij a_ij * b_ij`.
#[inline]
pub fn frobenius_dot(a: &Mat3d, b: &Mat3d) -> Real {
    a.x_axis.dot(b.x_axis) + a.y_axis.dot(b.y_axis) + a.z_axis.dot(b.z_axis)
}
