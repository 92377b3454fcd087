//! Continuous collision detection between line segments.
//!
//! Used for suture- and thread-like geometry: closed-form closest-point
//! algebra between two segments, a collision classification over two time
//! samples, and a sweep over segment-mesh pairs.

use crate::math::{Real, Vec3d};

/// How two moving segments collided between the previous and current state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CcdResult {
    /// No collision.
    None = 0,
    /// Segments overlap within thickness with an internal intersection.
    LinesOverlap = 1,
    /// Closest endpoint pair overlaps within thickness (external intersection).
    VertexOverlap = 2,
    /// Segments passed through each other during the interval.
    Crossing = 3,
}

/// Closest-point state for one pair of segments `(xi, xi1)` and `(xj, xj1)`.
///
/// All derived quantities are computed at construction: edge vectors, the
/// segment-parameterized closest-point coordinates `si`/`sj`, the closest
/// points themselves, and the shortest distance vector `w` between the
/// infinite carrier lines.
pub struct EdgeEdgeCcdState {
    pub xi: Vec3d,
    pub xi1: Vec3d,
    pub xj: Vec3d,
    pub xj1: Vec3d,
    /// Edge vectors of the two segments.
    pub ei: Vec3d,
    pub ej: Vec3d,
    /// Offset between the segment origins.
    pub w0: Vec3d,
    /// Shortest distance vector between the infinite lines.
    pub w: Vec3d,
    si: Real,
    sj: Real,
    pi: Vec3d,
    pj: Vec3d,
    thickness: Real,
    epsilon: Real,
    /// Slack on the [0, 1] interval when deciding internal vs external
    /// intersection. Hosts scaling far beyond the default thickness should
    /// widen this accordingly.
    pub tolerance: Real,
}

impl EdgeEdgeCcdState {
    pub fn new(i0: Vec3d, i1: Vec3d, j0: Vec3d, j1: Vec3d) -> Self {
        let ei = i1 - i0;
        let ej = j1 - j0;
        let w0 = j0 - i0;
        let mut state = Self {
            xi: i0,
            xi1: i1,
            xj: j0,
            xj1: j1,
            ei,
            ej,
            w0,
            w: Vec3d::ZERO,
            si: 0.0,
            sj: 0.0,
            pi: Vec3d::ZERO,
            pj: Vec3d::ZERO,
            thickness: 0.0016,
            epsilon: 1.0e-10,
            tolerance: 0.01,
        };
        state.w = state.shortest_distance_vector();
        state.si = state.compute_si();
        state.sj = state.compute_sj();
        state.pi = state.xi + state.ei * state.si;
        state.pj = state.xj + state.ej * state.sj;
        state
    }

    /// Parameter of the closest point on `xi -- xi1` (inside [0, 1] for an
    /// internal intersection; the parallel-line sentinel is -1).
    pub fn si(&self) -> Real {
        self.si
    }

    /// Parameter of the closest point on `xj -- xj1`.
    pub fn sj(&self) -> Real {
        self.sj
    }

    /// Closest point on segment `xi -- xi1`.
    pub fn pi(&self) -> Vec3d {
        self.pi
    }

    /// Closest point on segment `xj -- xj1`.
    pub fn pj(&self) -> Vec3d {
        self.pj
    }

    pub fn thickness(&self) -> Real {
        self.thickness
    }

    pub fn set_thickness(&mut self, thickness: Real) {
        self.thickness = thickness;
    }

    pub fn set_epsilon(&mut self, epsilon: Real) {
        self.epsilon = epsilon;
    }

    fn a(&self) -> Real {
        self.ei.dot(self.ei)
    }

    fn b(&self) -> Real {
        self.ei.dot(self.ej)
    }

    fn c(&self) -> Real {
        self.ej.dot(self.ej)
    }

    fn d(&self) -> Real {
        self.ei.dot(self.w0)
    }

    fn e(&self) -> Real {
        self.ej.dot(self.w0)
    }

    fn denom(&self) -> Real {
        self.a() * self.c() - self.b() * self.b()
    }

    fn compute_si(&self) -> Real {
        let ac_bb = self.denom();
        if ac_bb.abs() < self.epsilon {
            // Parallel lines: signal "not an internal intersection" so the
            // caller falls back to endpoint checks.
            return -1.0;
        }
        // w0 points from segment i to segment j, hence the sign flip.
        -(self.b() * self.e() - self.c() * self.d()) / ac_bb
    }

    fn compute_sj(&self) -> Real {
        let ac_bb = self.denom();
        if ac_bb.abs() < self.epsilon {
            if self.b() < self.epsilon {
                return -1.0;
            }
            return self.d() / self.b();
        }
        -(self.a() * self.e() - self.b() * self.d()) / ac_bb
    }

    fn shortest_distance_vector(&self) -> Vec3d {
        let n = self.ei.cross(self.ej).normalize_or_zero();
        n * self.w0.dot(n)
    }

    /// Smallest of the four endpoint-pair vectors between the segments.
    ///
    /// Used when no internal intersection exists; ties may resolve to any of
    /// the minimal pairs.
    pub fn compute_w_bar(&self) -> Vec3d {
        let candidates = [
            self.xj - self.xi,
            self.xj1 - self.xi,
            self.xj - self.xi1,
            self.xj1 - self.xi1,
        ];
        let mut best = candidates[0];
        for &v in &candidates[1..] {
            if v.length() < best.length() {
                best = v;
            }
        }
        best
    }

    /// Classify the collision between the two time samples.
    ///
    /// Returns the collision kind and the estimated relative time of impact
    /// in [0, 1] (0 = previous sample, 1 = current sample).
    pub fn test_collision(prev: &EdgeEdgeCcdState, curr: &EdgeEdgeCcdState) -> (CcdResult, Real) {
        let tol = curr.tolerance;
        let external_intersection = curr.si < -tol
            || curr.si > 1.0 + tol
            || curr.sj < -tol
            || curr.sj > 1.0 + tol;

        let curr_wbar = if external_intersection {
            curr.compute_w_bar()
        } else {
            curr.w
        };

        if curr_wbar.length() < prev.thickness + prev.epsilon {
            // Impact happens within the current time step.
            let kind = if external_intersection {
                CcdResult::VertexOverlap
            } else {
                CcdResult::LinesOverlap
            };
            return (kind, 1.0);
        }

        let crossed_each_other = prev.w.dot(curr.w) < 0.0;
        if crossed_each_other && !external_intersection {
            let m = curr.w.dot(prev.w).signum();
            let denom = prev.w.length() - m * curr.w.length();
            let toi = if denom > prev.epsilon {
                prev.w.length() / denom
            } else {
                0.0
            };
            return (CcdResult::Crossing, toi);
        }

        (CcdResult::None, 0.0)
    }
}

/// Vertex positions plus segment connectivity of a thin structure.
#[derive(Clone, Debug, Default)]
pub struct LineSegmentMesh {
    pub vertices: Vec<Vec3d>,
    pub segments: Vec<[usize; 2]>,
}

impl LineSegmentMesh {
    /// Polyline through the given points: segment i connects point i to i+1.
    pub fn from_polyline(points: &[Vec3d]) -> Self {
        let segments = (1..points.len()).map(|i| [i - 1, i]).collect();
        Self {
            vertices: points.to_vec(),
            segments,
        }
    }
}

/// One colliding segment reported by the sweep: the vertex ids of the edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollisionElement {
    pub ids: [usize; 2],
}

/// Segment-mesh vs segment-mesh CCD sweep.
///
/// Caches the previous time step's vertex positions; every segment pair is
/// classified with [`EdgeEdgeCcdState::test_collision`] and colliding pairs
/// are reported on both sides. Self collision skips a segment against itself
/// and its immediate polyline neighbors.
#[derive(Default)]
pub struct LineMeshToLineMeshCcd {
    prev_a: Vec<Vec3d>,
    prev_b: Vec<Vec3d>,
    thickness: Option<Real>,
}

impl LineMeshToLineMeshCcd {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the segment thickness used by the pair tests.
    pub fn set_thickness(&mut self, thickness: Real) {
        self.thickness = Some(thickness);
    }

    /// Snapshot the geometry of the previous time step (positions only).
    pub fn update_previous_geometry(&mut self, mesh_a: &LineSegmentMesh, mesh_b: &LineSegmentMesh) {
        self.prev_a.clear();
        self.prev_a.extend_from_slice(&mesh_a.vertices);
        self.prev_b.clear();
        self.prev_b.extend_from_slice(&mesh_b.vertices);
    }

    /// Sweep all segment pairs of the current geometry against the cached
    /// previous geometry, collecting colliding edges per side.
    ///
    /// For self collision pass the same mesh as both inputs.
    pub fn compute_collision(
        &self,
        mesh_a: &LineSegmentMesh,
        mesh_b: &LineSegmentMesh,
        elements_a: &mut Vec<CollisionElement>,
        elements_b: &mut Vec<CollisionElement>,
    ) {
        elements_a.clear();
        elements_b.clear();

        if mesh_a.vertices.len() != self.prev_a.len() || mesh_b.vertices.len() != self.prev_b.len()
        {
            log::warn!("stale previous-step cache: vertex counts do not match current geometry");
            return;
        }

        let self_collision = std::ptr::eq(mesh_a, mesh_b);

        for (i, cell_a) in mesh_a.segments.iter().enumerate() {
            let j_start = if self_collision { i + 2 } else { 0 };
            for j in j_start..mesh_b.segments.len() {
                // Immediate polyline neighbors share a vertex; skip them.
                if self_collision && j.abs_diff(i) <= 1 {
                    continue;
                }
                let cell_b = mesh_b.segments[j];

                let mut curr = EdgeEdgeCcdState::new(
                    mesh_a.vertices[cell_a[0]],
                    mesh_a.vertices[cell_a[1]],
                    mesh_b.vertices[cell_b[0]],
                    mesh_b.vertices[cell_b[1]],
                );
                let mut prev = EdgeEdgeCcdState::new(
                    self.prev_a[cell_a[0]],
                    self.prev_a[cell_a[1]],
                    self.prev_b[cell_b[0]],
                    self.prev_b[cell_b[1]],
                );
                if let Some(thickness) = self.thickness {
                    curr.set_thickness(thickness);
                    prev.set_thickness(thickness);
                }

                let (kind, _toi) = EdgeEdgeCcdState::test_collision(&prev, &curr);
                if kind != CcdResult::None {
                    elements_a.push(CollisionElement { ids: *cell_a });
                    elements_b.push(CollisionElement { ids: cell_b });
                }
            }
        }
    }
}
