//! Smoothing kernels for the SPH integrator.
//!
//! Each kernel precomputes its normalization coefficients from the kernel
//! radius `h`; values vanish outside the support and gradients vanish at
//! r = 0 to avoid the singularity at coincident particles.

use crate::math::{Real, Vec3d};

use std::f64::consts::PI;

/// Poly6 kernel, used for density estimation and velocity smoothing.
///
/// `W(r, h) = 315 / (64 pi h^9) (h^2 - |r|^2)^3` for `|r| <= h`.
#[derive(Clone, Copy, Debug)]
pub struct Poly6Kernel {
    radius2: Real,
    k: Real,
    l: Real,
    w0: Real,
}

impl Poly6Kernel {
    pub fn new(radius: Real) -> Self {
        let radius2 = radius * radius;
        let k = 315.0 / (64.0 * PI * radius.powi(9));
        let l = -945.0 / (32.0 * PI * radius.powi(9));
        let mut kernel = Self {
            radius2,
            k,
            l,
            w0: 0.0,
        };
        kernel.w0 = kernel.w(Vec3d::ZERO);
        kernel
    }

    pub fn w(&self, r: Vec3d) -> Real {
        let r2 = r.length_squared();
        if r2 <= self.radius2 {
            let diff = self.radius2 - r2;
            diff * diff * diff * self.k
        } else {
            0.0
        }
    }

    /// W at zero separation.
    pub fn w0(&self) -> Real {
        self.w0
    }

    /// `grad W(r, h) = r (-945 / (32 pi h^9)) (h^2 - |r|^2)^2`.
    pub fn grad_w(&self, r: Vec3d) -> Vec3d {
        let r2 = r.length_squared();
        if r2 <= self.radius2 && r2 > 1.0e-12 {
            let tmp = self.radius2 - r2;
            r * (self.l * tmp * tmp)
        } else {
            Vec3d::ZERO
        }
    }

    /// `laplacian W(r, h) = (-945 / (32 pi h^9)) (h^2 - |r|^2) (3 h^2 - 7 |r|^2)`.
    pub fn laplacian(&self, r: Vec3d) -> Real {
        let r2 = r.length_squared();
        if r2 <= self.radius2 {
            let tmp = self.radius2 - r2;
            let tmp2 = 3.0 * self.radius2 - 7.0 * r2;
            self.l * tmp * tmp2
        } else {
            0.0
        }
    }
}

/// Spiky kernel, used for the pressure gradient.
///
/// `W(r, h) = 15 / (pi h^6) (h - |r|)^3` for `|r| <= h`.
#[derive(Clone, Copy, Debug)]
pub struct SpikyKernel {
    radius: Real,
    radius2: Real,
    k: Real,
    l: Real,
    w0: Real,
}

impl SpikyKernel {
    pub fn new(radius: Real) -> Self {
        let radius6 = radius.powi(6);
        let mut kernel = Self {
            radius,
            radius2: radius * radius,
            k: 15.0 / (PI * radius6),
            l: -45.0 / (PI * radius6),
            w0: 0.0,
        };
        kernel.w0 = kernel.w(Vec3d::ZERO);
        kernel
    }

    pub fn w(&self, r: Vec3d) -> Real {
        let r2 = r.length_squared();
        if r2 <= self.radius2 {
            let hr = self.radius - r2.sqrt();
            hr * hr * hr * self.k
        } else {
            0.0
        }
    }

    pub fn w0(&self) -> Real {
        self.w0
    }

    /// `grad W(r, h) = -r / |r| (45 / (pi h^6)) (h - |r|)^2`.
    pub fn grad_w(&self, r: Vec3d) -> Vec3d {
        let r2 = r.length_squared();
        if r2 <= self.radius2 && r2 > 1.0e-12 {
            let rl = r2.sqrt();
            let hr = self.radius - rl;
            r * (self.l * hr * hr / rl)
        } else {
            Vec3d::ZERO
        }
    }
}

/// Viscosity kernel; only its laplacian is used.
///
/// `laplacian W(r, h) = 45 / (pi h^6) (h - |r|)` for `|r| <= h`.
#[derive(Clone, Copy, Debug)]
pub struct ViscosityKernel {
    radius: Real,
    radius2: Real,
    k: Real,
}

impl ViscosityKernel {
    pub fn new(radius: Real) -> Self {
        let radius2 = radius * radius;
        Self {
            radius,
            radius2,
            k: 45.0 / PI / (radius2 * radius2 * radius2),
        }
    }

    pub fn laplacian(&self, r: Vec3d) -> Real {
        let r2 = r.length_squared();
        if r2 <= self.radius2 {
            self.k * (self.radius - r2.sqrt())
        } else {
            0.0
        }
    }
}

/// Akinci cohesion kernel for surface tension.
///
/// ```text
/// W(r, h) = (32 / (pi h^9)) (h - r)^3 r^3              if h/2 < r <= h
///           (32 / (pi h^9)) (2 (h - r)^3 r^3 - h^6/64) if 0 <= r <= h/2
/// ```
#[derive(Clone, Copy, Debug)]
pub struct CohesionKernel {
    radius: Real,
    radius2: Real,
    k: Real,
    c: Real,
}

impl CohesionKernel {
    pub fn new(radius: Real) -> Self {
        Self {
            radius,
            radius2: radius * radius,
            k: 32.0 / (PI * radius.powi(9)),
            c: radius.powi(6) / 64.0,
        }
    }

    pub fn w(&self, r: Vec3d) -> Real {
        let r2 = r.length_squared();
        if r2 > self.radius2 {
            return 0.0;
        }
        let r1 = r2.sqrt();
        let r3 = r2 * r1;
        let hr = self.radius - r1;
        if r1 > 0.5 * self.radius {
            self.k * hr * hr * hr * r3
        } else {
            self.k * 2.0 * hr * hr * hr * r3 - self.c
        }
    }
}

/// Akinci adhesion kernel for fluid-boundary attraction.
///
/// `W(r, h) = (0.007 / h^3.25) (-4 r^2 / h + 6 r - 2 h)^0.25` for
/// `h/2 < r <= h`, zero elsewhere.
#[derive(Clone, Copy, Debug)]
pub struct AdhesionKernel {
    radius: Real,
    radius2: Real,
    k: Real,
}

impl AdhesionKernel {
    pub fn new(radius: Real) -> Self {
        Self {
            radius,
            radius2: radius * radius,
            k: 0.007 / radius.powf(3.25),
        }
    }

    pub fn w(&self, r: Vec3d) -> Real {
        let r2 = r.length_squared();
        if r2 > self.radius2 {
            return 0.0;
        }
        let r1 = r2.sqrt();
        if r1 > 0.5 * self.radius {
            self.k * (-4.0 * r2 / self.radius + 6.0 * r1 - 2.0 * self.radius).powf(0.25)
        } else {
            0.0
        }
    }
}

/// The kernel set used by one fluid integration, all sharing one radius.
#[derive(Clone, Copy, Debug)]
pub struct SimulationKernels {
    pub poly6: Poly6Kernel,
    pub spiky: SpikyKernel,
    pub viscosity: ViscosityKernel,
    pub cohesion: CohesionKernel,
    pub adhesion: AdhesionKernel,
}

impl SimulationKernels {
    pub fn new(kernel_radius: Real) -> Self {
        Self {
            poly6: Poly6Kernel::new(kernel_radius),
            spiky: SpikyKernel::new(kernel_radius),
            viscosity: ViscosityKernel::new(kernel_radius),
            cohesion: CohesionKernel::new(kernel_radius),
            adhesion: AdhesionKernel::new(kernel_radius),
        }
    }
}
