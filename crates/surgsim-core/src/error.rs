use thiserror::Error;

/// Configuration errors surfaced at initialize/configure time.
///
/// Everything else the core encounters at runtime is either recovered locally
/// (degenerate constraint geometry, numerical explosion) or a programmer
/// error guarded by debug assertions.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("cell size must be positive, got {0}")]
    NonPositiveCellSize(f64),

    #[error("grid axis {axis} has zero cells ({lower} .. {upper}, cell size {cell_size})")]
    EmptyGridAxis {
        axis: usize,
        lower: f64,
        upper: f64,
        cell_size: f64,
    },

    #[error("particle radius must be positive, got {0}")]
    NonPositiveParticleRadius(f64),

    #[error("time step must be positive, got {0}")]
    NonPositiveTimeStep(f64),

    #[error("solver iteration count must be positive")]
    InvalidIterationCount,

    #[error("velocity damping must lie in [0, 1], got {0}")]
    InvalidDamping(f64),

    #[error("neighbor search radius must be positive, got {0}")]
    NonPositiveSearchRadius(f64),

    #[error("task graph contains a cycle involving node `{0}`")]
    CycleInTaskGraph(String),
}
