use crate::body::ParticleId;
use crate::constraints::ConstraintValue;
use crate::math::{frobenius_dot, svd3, Mat3d, Real, Vec3d, REAL_EPS};

/// Hyperelastic material model evaluated on the deformation gradient.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FemMaterial {
    /// St. Venant-Kirchhoff.
    StVk,
    /// Co-rotational linear elasticity.
    Corotational,
    /// Compressible neo-Hookean.
    NeoHookean,
}

/// Lame constants for the FEM tet constraint, optionally derived from
/// engineering parameters.
#[derive(Clone, Copy, Debug)]
pub struct FemTetMaterialConfig {
    pub mu: Real,
    pub lambda: Real,
}

impl FemTetMaterialConfig {
    pub fn new(mu: Real, lambda: Real) -> Self {
        Self { mu, lambda }
    }

    /// Convert Young's modulus and Poisson's ratio to Lame constants.
    pub fn from_young_poisson(young_modulus: Real, poisson_ratio: Real) -> Self {
        let mu = young_modulus / (2.0 * (1.0 + poisson_ratio));
        let lambda = young_modulus * poisson_ratio
            / ((1.0 + poisson_ratio) * (1.0 - 2.0 * poisson_ratio));
        Self { mu, lambda }
    }
}

/// Elastic energy of a linear tetrahedral finite element.
///
/// The constraint value is the strain energy of the element scaled by its
/// rest volume; gradients are the per-vertex elastic forces obtained from
/// the first Piola-Kirchhoff stress of the chosen material.
///
/// Inverted elements (`det(F) <= 0`) are handled by diagonalizing F,
/// re-signing the smallest singular value and evaluating the material on the
/// un-reflected deformation, which produces forces that restore positive
/// volume. The inverted/normal decision is recomputed on every projection
/// and carries no persistent state.
pub struct FemTetConstraint {
    pub particles: [ParticleId; 4],
    pub material: FemMaterial,
    pub config: FemTetMaterialConfig,
    pub inv_rest_mat: Mat3d,
    pub element_volume: Real,
    pub stiffness: Real,
    pub compliance: Real,
    pub lambda: Real,
}

impl FemTetConstraint {
    /// Build from the rest positions of the four tet vertices.
    ///
    /// Returns `None` for a degenerate (coplanar) rest tet; the caller is
    /// expected to warn and drop the element.
    pub fn new(
        p0: Vec3d,
        p1: Vec3d,
        p2: Vec3d,
        p3: Vec3d,
        ids: [ParticleId; 4],
        material: FemMaterial,
        config: FemTetMaterialConfig,
    ) -> Option<Self> {
        let element_volume = (1.0 / 6.0) * (p3 - p0).dot((p1 - p0).cross(p2 - p0));

        let m = Mat3d::from_cols(p0 - p3, p1 - p3, p2 - p3);
        if m.determinant().abs() <= REAL_EPS {
            log::warn!("degenerate rest tetrahedron, dropping FEM constraint");
            return None;
        }

        let stiffness = config.lambda + 2.0 * config.mu;
        Some(Self {
            particles: ids,
            material,
            config,
            inv_rest_mat: m.inverse(),
            element_volume,
            stiffness,
            compliance: 1.0 / stiffness,
            lambda: 0.0,
        })
    }

    pub fn evaluate(&self, x: &[Vec3d; 4]) -> Option<ConstraintValue> {
        let m = Mat3d::from_cols(x[0] - x[3], x[1] - x[3], x[2] - x[3]);

        // Deformation gradient.
        let mut f = m * self.inv_rest_mat;

        // Inverted element: re-sign the smallest singular value so the
        // material sees the nearest deformation with positive determinant.
        if f.determinant() <= 0.0 {
            let (u, s, v) = svd3(&f);
            let s_hat = Vec3d::new(s.x, s.y, s.z.abs());
            f = u * Mat3d::from_diagonal(s_hat) * v.transpose();
        }

        let mu = self.config.mu;
        let lambda = self.config.lambda;

        // First Piola-Kirchhoff stress and energy density per material.
        let (p, c) = match self.material {
            // P(F) = F * (2 mu E + lambda tr(E) I), E = (F^T F - I) / 2
            FemMaterial::StVk => {
                let e = (f.transpose() * f - Mat3d::IDENTITY) * 0.5;
                let tr = e.x_axis.x + e.y_axis.y + e.z_axis.z;
                let p = f * (e * (2.0 * mu) + Mat3d::from_diagonal(Vec3d::splat(lambda * tr)));
                let c = mu * frobenius_dot(&e, &e) + 0.5 * lambda * tr * tr;
                (p, c)
            }
            // P(F) = 2 mu (F - R) + lambda (J - 1) J F^-T
            FemMaterial::Corotational => {
                let (u, s, v) = svd3(&f);
                if s.x.abs() < REAL_EPS || s.y.abs() < REAL_EPS || s.z.abs() < REAL_EPS {
                    return None;
                }
                let r = u * v.transpose();
                let j = s.x * s.y * s.z;
                let inv_ft =
                    u * Mat3d::from_diagonal(Vec3d::new(1.0 / s.x, 1.0 / s.y, 1.0 / s.z))
                        * v.transpose();
                let fr = f - r;
                let p = fr * (2.0 * mu) + inv_ft * (lambda * (j - 1.0) * j);
                let c = mu * frobenius_dot(&fr, &fr) + 0.5 * lambda * (j - 1.0) * (j - 1.0);
                (p, c)
            }
            // P(F) = mu (F - F^-T) + lambda log(J) F^-T
            FemMaterial::NeoHookean => {
                let j = f.determinant();
                if j <= REAL_EPS {
                    return None;
                }
                let inv_ft = f.inverse().transpose();
                let log_j = j.ln();
                let p = (f - inv_ft) * mu + inv_ft * (lambda * log_j);
                let c = 0.5 * mu * (frobenius_dot(&f, &f) - 3.0) - mu * log_j
                    + 0.5 * lambda * log_j * log_j;
                (p, c)
            }
        };

        let grad = p * self.inv_rest_mat.transpose() * self.element_volume;
        let dcdx = [
            grad.x_axis,
            grad.y_axis,
            grad.z_axis,
            -grad.x_axis - grad.y_axis - grad.z_axis,
        ];

        Some(ConstraintValue {
            c: c * self.element_volume,
            dcdx,
        })
    }
}
