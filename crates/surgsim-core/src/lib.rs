//! Simulation core for interactive soft-tissue and fluid simulation.
//!
//! The crate couples a position-based dynamics constraint solver over
//! deformable bodies with a weakly compressible SPH fluid integrator. Both
//! share a spatial-acceleration layer (uniform grid and separate-chaining
//! spatial hash) for fixed-radius neighbor queries, and a segment-segment
//! continuous collision detection state machine for thin structures such as
//! sutures. Pipelines are published as task graphs so a host can interleave
//! its own work between stages.
//!
//! The core is a pure library: configuration comes in as explicit data,
//! results are read back from the owned state, and logging goes through the
//! `log` facade.

pub mod body;
pub mod ccd;
pub mod constraints;
pub mod error;
pub mod grid;
pub mod math;
pub mod neighbor_search;
pub mod parallel;
pub mod solver;
pub mod spatial_hash;
pub mod sph;
pub mod task_graph;

pub use body::{ParticleId, PbdBody, PbdState};
pub use error::ConfigError;
pub use math::{Mat3d, Quatd, Real, Vec3d};
pub use solver::{PbdConfig, PbdSolver, PbdTask};
pub use sph::{SphConfig, SphSystem};
