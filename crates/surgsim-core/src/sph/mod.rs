//! Weakly compressible SPH fluid integrator.
//!
//! The pipeline is a staged task graph over the particle set: neighbor
//! search, density, pressure, viscosity and surface tension, acceleration
//! summation, CFL time step, semi-implicit Euler integration, optional XSPH
//! velocity smoothing, and the position update with inlet/outlet boundary
//! conditions. Each stage's body is a parallel loop over particles.
//!
//! Surface tension follows Akinci et al. 2013, "Versatile Surface Tension
//! and Adhesion for SPH Fluids".

pub mod boundary;
pub mod kernels;
pub mod state;

pub use boundary::SphBoundaryConditions;
pub use kernels::SimulationKernels;
pub use state::{SphParticleType, SphState};

use crate::error::ConfigError;
use crate::math::{Real, Vec3d};
use crate::neighbor_search::{Method, NeighborSearch};
use crate::parallel;
use crate::task_graph::TaskGraph;

/// Fluid configuration. Public fields are inputs; the derived quantities are
/// filled in by [`SphConfig::new`].
#[derive(Clone, Copy, Debug)]
pub struct SphConfig {
    pub particle_radius: Real,
    pub rest_density: Real,
    pub speed_of_sound: Real,
    /// Kernel radius expressed as a multiple of the particle radius.
    pub kernel_over_particle_radius_ratio: Real,
    pub pressure_stiffness: Real,
    pub dynamic_viscosity: Real,
    pub boundary_viscosity: Real,
    pub surface_tension_stiffness: Real,
    pub gravity: Vec3d,
    pub cfl_factor: Real,
    pub min_timestep: Real,
    pub max_timestep: Real,
    pub normalize_density: bool,
    pub density_with_boundary: bool,
    /// XSPH velocity smoothing coefficient; zero disables the pass.
    pub eta: Real,
    /// Fluid speed above which the integrator declares an explosion.
    pub explosion_speed: Real,
    pub neighbor_search_method: Method,

    // Derived.
    pub kernel_radius: Real,
    pub kernel_radius_sqr: Real,
    pub particle_mass: Real,
    pub rest_density_inv: Real,
    pub rest_density_sqr: Real,
}

impl SphConfig {
    /// Defaults for a water-like fluid of the given particle radius.
    pub fn new(particle_radius: Real) -> Result<Self, ConfigError> {
        if particle_radius <= 0.0 {
            return Err(ConfigError::NonPositiveParticleRadius(particle_radius));
        }
        let mut config = Self {
            particle_radius,
            rest_density: 1000.0,
            speed_of_sound: 18.7,
            kernel_over_particle_radius_ratio: 4.0,
            pressure_stiffness: 50_000.0,
            dynamic_viscosity: 1.0e-2,
            boundary_viscosity: 1.0e-5,
            surface_tension_stiffness: 1.0,
            gravity: Vec3d::new(0.0, -9.81, 0.0),
            cfl_factor: 1.0,
            min_timestep: 1.0e-6,
            max_timestep: 1.0e-3,
            normalize_density: false,
            density_with_boundary: false,
            eta: 0.5,
            explosion_speed: 18.7,
            neighbor_search_method: Method::UniformGridBasedSearch,
            kernel_radius: 0.0,
            kernel_radius_sqr: 0.0,
            particle_mass: 0.0,
            rest_density_inv: 0.0,
            rest_density_sqr: 0.0,
        };
        config.update_derived()?;
        Ok(config)
    }

    /// Recompute the derived quantities after editing the input fields.
    pub fn update_derived(&mut self) -> Result<(), ConfigError> {
        if self.particle_radius <= 0.0 {
            return Err(ConfigError::NonPositiveParticleRadius(self.particle_radius));
        }
        if self.min_timestep <= 0.0 {
            return Err(ConfigError::NonPositiveTimeStep(self.min_timestep));
        }
        if self.max_timestep <= 0.0 {
            return Err(ConfigError::NonPositiveTimeStep(self.max_timestep));
        }
        self.kernel_radius = self.particle_radius * self.kernel_over_particle_radius_ratio;
        self.kernel_radius_sqr = self.kernel_radius * self.kernel_radius;
        let d = 2.0 * self.particle_radius;
        self.particle_mass = self.rest_density * d * d * d;
        self.rest_density_inv = 1.0 / self.rest_density;
        self.rest_density_sqr = self.rest_density * self.rest_density;
        Ok(())
    }
}

/// Pipeline stages published as task-graph nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SphTask {
    FindParticleNeighbors,
    ComputeDensity,
    NormalizeDensity,
    ComputePressureAccel,
    ComputeViscosity,
    ComputeSurfaceTension,
    SumAccels,
    ComputeTimeStepSize,
    Integrate,
    UpdateVelocity,
    MoveParticles,
}

/// The SPH fluid system: particle state plus the staged pipeline.
pub struct SphSystem {
    pub config: SphConfig,
    pub state: SphState,
    kernels: SimulationKernels,
    neighbor_searcher: NeighborSearch,
    boundary_conditions: Option<SphBoundaryConditions>,
    graph: TaskGraph<SphTask>,
    /// Execution order derived from the graph once at construction.
    order: Vec<SphTask>,
    dt: Real,
    exploded_this_step: bool,
    /// Active-particle compaction scratch (global indices of non-Buffer
    /// particles, rebuilt by the neighbor stage).
    active: Vec<usize>,
    active_positions: Vec<Vec3d>,
    compact_lists: Vec<Vec<usize>>,
}

impl SphSystem {
    /// Build the system over freely placed fluid particles.
    pub fn new(config: SphConfig, positions: Vec<Vec3d>) -> Result<Self, ConfigError> {
        let kernels = SimulationKernels::new(config.kernel_radius);
        let neighbor_searcher =
            NeighborSearch::new(config.neighbor_search_method, config.kernel_radius)?;

        let graph = Self::build_graph(&config);
        let order = graph
            .topological_order()?
            .into_iter()
            .filter_map(|id| graph.node(id).payload)
            .collect();

        Ok(Self {
            state: SphState::new(positions),
            kernels,
            neighbor_searcher,
            boundary_conditions: None,
            graph,
            order,
            dt: config.max_timestep,
            exploded_this_step: false,
            active: Vec::new(),
            active_positions: Vec::new(),
            compact_lists: Vec::new(),
            config,
        })
    }

    /// Attach inlet/outlet boundary conditions. The boundary object carries
    /// the particle classification computed at construction; it is moved
    /// into the state here.
    pub fn set_boundary_conditions(&mut self, mut bc: SphBoundaryConditions) {
        let types = bc.take_particle_types();
        debug_assert_eq!(types.len(), self.state.num_particles());
        self.state.particle_types = types;
        self.boundary_conditions = Some(bc);
    }

    pub fn boundary_conditions(&self) -> Option<&SphBoundaryConditions> {
        self.boundary_conditions.as_ref()
    }

    /// Prescribe one velocity for every non-wall particle.
    pub fn set_initial_velocities(&mut self, velocity: Vec3d) {
        for i in 0..self.state.num_particles() {
            if self.state.particle_types[i] != SphParticleType::Wall {
                self.state.velocities[i] = velocity;
            }
        }
    }

    /// Task graph of the fluid pipeline, for nesting into a host graph.
    pub fn task_graph(&self) -> &TaskGraph<SphTask> {
        &self.graph
    }

    /// Time step used by the last integration (CFL-limited).
    pub fn time_step(&self) -> Real {
        self.dt
    }

    /// Whether the explosion guard fired during the last step.
    pub fn exploded_this_step(&self) -> bool {
        self.exploded_this_step
    }

    fn build_graph(config: &SphConfig) -> TaskGraph<SphTask> {
        let mut graph = TaskGraph::new("SphSystem_Source", "SphSystem_Sink");

        let neighbors =
            graph.add_node("SphSystem_FindParticleNeighbors", SphTask::FindParticleNeighbors);
        let density = graph.add_node("SphSystem_ComputeDensity", SphTask::ComputeDensity);
        let pressure =
            graph.add_node("SphSystem_ComputePressureAccel", SphTask::ComputePressureAccel);
        let viscosity = graph.add_node("SphSystem_ComputeViscosity", SphTask::ComputeViscosity);
        let tension =
            graph.add_node("SphSystem_ComputeSurfaceTension", SphTask::ComputeSurfaceTension);
        let sum = graph.add_node("SphSystem_SumAccels", SphTask::SumAccels);
        let timestep =
            graph.add_node("SphSystem_ComputeTimeStepSize", SphTask::ComputeTimeStepSize);
        let integrate = graph.add_node("SphSystem_Integrate", SphTask::Integrate);
        let update_velocity = graph.add_node("SphSystem_UpdateVelocity", SphTask::UpdateVelocity);
        let move_particles = graph.add_node("SphSystem_MoveParticles", SphTask::MoveParticles);

        graph.add_edge(graph.source(), neighbors);
        graph.add_edge(neighbors, density);

        let density_out = if config.normalize_density {
            let normalize = graph.add_node("SphSystem_NormalizeDensity", SphTask::NormalizeDensity);
            graph.add_edge(density, normalize);
            normalize
        } else {
            density
        };

        // The three force stages are independent of each other.
        graph.add_edge(density_out, pressure);
        graph.add_edge(density_out, viscosity);
        graph.add_edge(density_out, tension);
        graph.add_edge(pressure, sum);
        graph.add_edge(viscosity, sum);
        graph.add_edge(tension, sum);

        graph.add_edge(sum, timestep);
        graph.add_edge(timestep, integrate);
        graph.add_edge(integrate, update_velocity);
        graph.add_edge(update_velocity, move_particles);
        graph.add_edge(move_particles, graph.sink());
        graph
    }

    /// Advance the fluid by one CFL-limited step.
    pub fn step(&mut self) {
        self.exploded_this_step = false;
        for i in 0..self.order.len() {
            let task = self.order[i];
            self.run_task(task);
        }
    }

    /// Dispatch one published pipeline stage; hosts driving the system
    /// through a nested task graph call this per node.
    pub fn run_task(&mut self, task: SphTask) {
        match task {
            SphTask::FindParticleNeighbors => self.find_particle_neighbors(),
            SphTask::ComputeDensity => self.compute_density(),
            SphTask::NormalizeDensity => self.normalize_density(),
            SphTask::ComputePressureAccel => self.compute_pressure_accel(),
            SphTask::ComputeViscosity => self.compute_viscosity(),
            SphTask::ComputeSurfaceTension => self.compute_surface_tension(),
            SphTask::SumAccels => self.sum_accels(),
            SphTask::ComputeTimeStepSize => self.compute_time_step_size(),
            SphTask::Integrate => self.integrate(),
            SphTask::UpdateVelocity => self.update_velocity(),
            SphTask::MoveParticles => self.move_particles(),
        }
    }

    /// Rebuild the per-particle neighbor lists over the active (non-Buffer)
    /// particles with the kernel radius.
    fn find_particle_neighbors(&mut self) {
        let state = &mut self.state;
        self.active.clear();
        self.active
            .extend((0..state.num_particles()).filter(|&i| state.is_active(i)));
        self.active_positions.clear();
        self.active_positions
            .extend(self.active.iter().map(|&i| state.positions[i]));

        self.neighbor_searcher
            .get_self_neighbors(&mut self.compact_lists, &self.active_positions);

        for list in &mut state.neighbor_lists {
            list.clear();
        }
        for (ci, &gi) in self.active.iter().enumerate() {
            let list = &mut state.neighbor_lists[gi];
            list.extend(
                self.compact_lists[ci]
                    .iter()
                    .map(|&cj| self.active[cj])
                    .filter(|&gj| gi != gj),
            );
        }
    }

    /// `rho_p = m W(0) + sum_q m W(p - q)`.
    ///
    /// Wall particles get a density too (they act as dummy pressure
    /// particles); with `density_with_boundary` off, wall neighbors do not
    /// contribute to fluid densities.
    fn compute_density(&mut self) {
        let state = &self.state;
        let config = &self.config;
        let kernels = &self.kernels;
        let with_boundary = config.density_with_boundary;

        let densities = parallel::parallel_map(state.num_particles(), |p| {
            if !state.is_active(p) {
                return config.rest_density;
            }
            let mut rho = kernels.poly6.w0();
            for &q in &state.neighbor_lists[p] {
                if state.particle_types[q] == SphParticleType::Wall && !with_boundary {
                    continue;
                }
                rho += kernels.poly6.w(state.positions[p] - state.positions[q]);
            }
            rho * config.particle_mass
        });
        self.state.densities = densities;
    }

    /// Shepard filter: divide each density by the kernel-weighted volume sum
    /// of its neighborhood, smoothing the density field near free surfaces.
    fn normalize_density(&mut self) {
        let state = &self.state;
        let config = &self.config;
        let kernels = &self.kernels;

        let densities = parallel::parallel_map(state.num_particles(), |p| {
            if !state.is_active(p) {
                return state.densities[p];
            }
            let mut shepard = config.particle_mass / state.densities[p] * kernels.poly6.w0();
            for &q in &state.neighbor_lists[p] {
                shepard += config.particle_mass / state.densities[q]
                    * kernels.poly6.w(state.positions[p] - state.positions[q]);
            }
            if shepard > 1.0e-10 {
                state.densities[p] / shepard
            } else {
                state.densities[p]
            }
        });
        self.state.densities = densities;
    }

    /// Tait equation of state, exponent 7, negative pressures clamped.
    fn particle_pressure(&self, density: Real) -> Real {
        let ratio = density * self.config.rest_density_inv;
        let p = self.config.pressure_stiffness * (ratio.powi(7) - 1.0);
        p.max(0.0)
    }

    /// Pressure and its acceleration:
    /// `a_P = -sum_q m (P_p / rho_p^2 + P_q / rho_q^2) grad W(p - q)`.
    fn compute_pressure_accel(&mut self) {
        let pressures = parallel::parallel_map(self.state.num_particles(), |p| {
            self.particle_pressure(self.state.densities[p])
        });
        self.state.pressures = pressures;

        let state = &self.state;
        let config = &self.config;
        let kernels = &self.kernels;

        let accels = parallel::parallel_map(state.num_particles(), |p| {
            if state.particle_types[p] != SphParticleType::Fluid {
                return Vec3d::ZERO;
            }
            let rho_p = state.densities[p];
            let term_p = state.pressures[p] / (rho_p * rho_p);
            let mut accel = Vec3d::ZERO;
            for &q in &state.neighbor_lists[p] {
                let rho_q = state.densities[q];
                let term_q = state.pressures[q] / (rho_q * rho_q);
                let grad = kernels.spiky.grad_w(state.positions[p] - state.positions[q]);
                accel -= grad * (config.particle_mass * (term_p + term_q));
            }
            accel
        });
        self.state.pressure_accels = accels;
    }

    /// Viscous acceleration:
    /// `a_V = nu sum_q m (v_q - v_p) / rho_q laplace W(p - q)`, with the
    /// boundary coefficient for wall neighbors.
    fn compute_viscosity(&mut self) {
        let state = &self.state;
        let config = &self.config;
        let kernels = &self.kernels;

        let accels = parallel::parallel_map(state.num_particles(), |p| {
            if state.particle_types[p] != SphParticleType::Fluid {
                return Vec3d::ZERO;
            }
            let mut accel = Vec3d::ZERO;
            for &q in &state.neighbor_lists[p] {
                let nu = if state.particle_types[q] == SphParticleType::Wall {
                    config.boundary_viscosity
                } else {
                    config.dynamic_viscosity
                };
                let lap = kernels
                    .viscosity
                    .laplacian(state.positions[p] - state.positions[q]);
                accel += (state.velocities[q] - state.velocities[p])
                    * (nu * config.particle_mass / state.densities[q] * lap);
            }
            accel
        });
        self.state.viscous_accels = accels;
    }

    /// Akinci cohesion + curvature surface tension, gated by kernel support.
    fn compute_surface_tension(&mut self) {
        // Particle normals first: n_p = h sum_q (m / rho_q) grad W(p - q).
        let state = &self.state;
        let config = &self.config;
        let kernels = &self.kernels;

        let normals = parallel::parallel_map(state.num_particles(), |p| {
            if state.particle_types[p] != SphParticleType::Fluid {
                return Vec3d::ZERO;
            }
            let mut n = Vec3d::ZERO;
            for &q in &state.neighbor_lists[p] {
                n += kernels.poly6.grad_w(state.positions[p] - state.positions[q])
                    * (config.particle_mass / state.densities[q]);
            }
            n * config.kernel_radius
        });
        self.state.normals = normals;

        let state = &self.state;
        let accels = parallel::parallel_map(state.num_particles(), |p| {
            if state.particle_types[p] != SphParticleType::Fluid {
                return Vec3d::ZERO;
            }
            let mut accel = Vec3d::ZERO;
            for &q in &state.neighbor_lists[p] {
                if state.particle_types[q] != SphParticleType::Fluid {
                    continue;
                }
                let r = state.positions[p] - state.positions[q];
                let r_len = r.length();
                if r_len < 1.0e-10 || r_len * r_len > config.kernel_radius_sqr {
                    continue;
                }
                // Symmetric factor keeps the pair force balanced when the
                // neighborhood is deficient near the surface.
                let k = 2.0 * config.rest_density
                    / (state.densities[p] + state.densities[q]);
                let cohesion = r / r_len * (config.particle_mass * kernels.cohesion.w(r));
                let curvature = state.normals[p] - state.normals[q];
                accel -= (cohesion + curvature) * (config.surface_tension_stiffness * k);
            }
            accel
        });
        self.state.surface_tension_accels = accels;
    }

    /// `a = a_P + a_V + a_ST + g` for fluid particles.
    fn sum_accels(&mut self) {
        let state = &self.state;
        let gravity = self.config.gravity;
        let accels = parallel::parallel_map(state.num_particles(), |p| {
            if state.particle_types[p] != SphParticleType::Fluid {
                return Vec3d::ZERO;
            }
            state.pressure_accels[p]
                + state.viscous_accels[p]
                + state.surface_tension_accels[p]
                + gravity
        });
        self.state.accels = accels;
    }

    /// CFL condition on the fastest active particle.
    fn compute_time_step_size(&mut self) {
        let mut max_speed_sqr: Real = 0.0;
        for i in 0..self.state.num_particles() {
            if self.state.is_active(i) {
                max_speed_sqr = max_speed_sqr.max(self.state.velocities[i].length_squared());
            }
        }
        let config = &self.config;
        self.dt = if max_speed_sqr > 0.0 {
            (config.cfl_factor * config.kernel_radius / max_speed_sqr.sqrt())
                .clamp(config.min_timestep, config.max_timestep)
        } else {
            config.max_timestep
        };
    }

    /// Semi-implicit Euler: `v += dt a`, with the explosion guard.
    ///
    /// On explosion every velocity and acceleration is zeroed, positions are
    /// kept, and the per-step flag is raised so the host can react.
    fn integrate(&mut self) {
        let dt = self.dt;
        let state = &self.state;
        let threshold_sqr = self.config.explosion_speed * self.config.explosion_speed;

        let velocities = parallel::parallel_map(state.num_particles(), |p| {
            if state.particle_types[p] == SphParticleType::Fluid {
                state.velocities[p] + state.accels[p] * dt
            } else {
                state.velocities[p]
            }
        });
        self.state.velocities = velocities;

        let exploded = self
            .state
            .velocities
            .iter()
            .zip(&self.state.particle_types)
            .any(|(v, &ty)| ty == SphParticleType::Fluid && v.length_squared() > threshold_sqr);
        if exploded {
            log::warn!(
                "fluid velocity exceeded {} m/s, resetting velocities and forces",
                self.config.explosion_speed
            );
            self.exploded_this_step = true;
            for v in &mut self.state.velocities {
                *v = Vec3d::ZERO;
            }
            self.state.clear_accels();
        }
    }

    /// XSPH velocity smoothing:
    /// `v_p += eta sum_q (m / rho_q) (v_q - v_p) W(p - q)`.
    fn update_velocity(&mut self) {
        if self.config.eta == 0.0 {
            return;
        }
        let state = &self.state;
        let config = &self.config;
        let kernels = &self.kernels;

        let velocities = parallel::parallel_map(state.num_particles(), |p| {
            if state.particle_types[p] != SphParticleType::Fluid {
                return state.velocities[p];
            }
            let mut contribution = Vec3d::ZERO;
            for &q in &state.neighbor_lists[p] {
                contribution += (state.velocities[q] - state.velocities[p])
                    * (config.particle_mass / state.densities[q]
                        * kernels.poly6.w(state.positions[p] - state.positions[q]));
            }
            state.velocities[p] + contribution * config.eta
        });
        self.state.velocities = velocities;
    }

    /// Advance positions and apply the inlet/outlet boundary conditions.
    fn move_particles(&mut self) {
        let dt = self.dt;
        for p in 0..self.state.num_particles() {
            match self.state.particle_types[p] {
                SphParticleType::Fluid | SphParticleType::Inlet | SphParticleType::Outlet => {
                    let v = self.state.velocities[p];
                    self.state.positions[p] += v * dt;
                }
                _ => {}
            }
        }

        let Some(bc) = &mut self.boundary_conditions else {
            return;
        };
        let state = &mut self.state;

        for p in 0..state.num_particles() {
            let position = state.positions[p];
            match state.particle_types[p] {
                SphParticleType::Inlet => {
                    // Prescribed parabolic kinematics while inside the inlet
                    // region; past it the particle joins the fluid and a
                    // reserve particle refills the inlet plane.
                    if bc.is_in_inlet_domain(position) {
                        state.velocities[p] = bc.compute_parabolic_inlet_velocity(position);
                    } else {
                        state.particle_types[p] = SphParticleType::Fluid;
                        if let Some(spawn) = bc.pop_buffer_index() {
                            let spawn_pos = bc.place_particle_at_inlet(position);
                            state.positions[spawn] = spawn_pos;
                            state.velocities[spawn] =
                                bc.compute_parabolic_inlet_velocity(spawn_pos);
                            state.particle_types[spawn] = SphParticleType::Inlet;
                        }
                    }
                }
                SphParticleType::Fluid => {
                    if bc.is_in_outlet_domain(position) {
                        state.particle_types[p] = SphParticleType::Outlet;
                    } else if !bc.is_in_fluid_domain(position) {
                        // Escaped the domain entirely; park it.
                        state.particle_types[p] = SphParticleType::Buffer;
                        state.positions[p] = bc.buffer_coord();
                        state.velocities[p] = Vec3d::ZERO;
                        bc.push_buffer_index(p);
                    }
                }
                SphParticleType::Outlet => {
                    if !bc.is_in_outlet_domain(position) {
                        state.particle_types[p] = SphParticleType::Buffer;
                        state.positions[p] = bc.buffer_coord();
                        state.velocities[p] = Vec3d::ZERO;
                        bc.push_buffer_index(p);
                    }
                }
                _ => {}
            }
        }
    }
}
