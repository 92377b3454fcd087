//! Time stepping for position-based deformable bodies.

use crate::body::PbdState;
use crate::constraints::{Constraint, SolverType};
use crate::error::ConfigError;
use crate::math::{Quatd, Real, Vec3d};
use crate::task_graph::TaskGraph;

/// Solver configuration, validated at construction.
#[derive(Clone, Copy, Debug)]
pub struct PbdConfig {
    /// Constraint projection iterations per step.
    pub iterations: u32,
    /// Velocity damping coefficient in [0, 1].
    pub damping: Real,
    /// Fixed step duration in seconds.
    pub dt: Real,
    pub solver_type: SolverType,
    pub gravity: Vec3d,
}

impl Default for PbdConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            damping: 0.01,
            dt: 0.01,
            solver_type: SolverType::Xpbd,
            gravity: Vec3d::new(0.0, -9.81, 0.0),
        }
    }
}

impl PbdConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations == 0 {
            return Err(ConfigError::InvalidIterationCount);
        }
        if !(0.0..=1.0).contains(&self.damping) {
            return Err(ConfigError::InvalidDamping(self.damping));
        }
        if self.dt <= 0.0 {
            return Err(ConfigError::NonPositiveTimeStep(self.dt));
        }
        Ok(())
    }
}

/// Pipeline stages the solver publishes as task-graph nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PbdTask {
    IntegratePositions,
    SolveConstraints,
    UpdateVelocity,
}

/// Position-based dynamics solver.
///
/// Owns the particle state and the constraint set for its lifetime.
/// Constraints are projected in registration order, which is stable across
/// steps; iteration-to-iteration ordering is sequential by design, so no
/// constraint coloring is required.
pub struct PbdSolver {
    pub state: PbdState,
    pub constraints: Vec<Constraint>,
    config: PbdConfig,
    graph: TaskGraph<PbdTask>,
    post_step: Option<Box<dyn FnMut(&PbdState) + Send>>,
}

impl PbdSolver {
    pub fn new(config: PbdConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut graph = TaskGraph::new("PbdSolver_Source", "PbdSolver_Sink");
        let integrate = graph.add_node("PbdSolver_IntegratePositions", PbdTask::IntegratePositions);
        let solve = graph.add_node("PbdSolver_SolveConstraints", PbdTask::SolveConstraints);
        let update = graph.add_node("PbdSolver_UpdateVelocity", PbdTask::UpdateVelocity);
        graph.add_edge(graph.source(), integrate);
        graph.add_edge(integrate, solve);
        graph.add_edge(solve, update);
        graph.add_edge(update, graph.sink());

        Ok(Self {
            state: PbdState::new(),
            constraints: Vec::new(),
            config,
            graph,
            post_step: None,
        })
    }

    pub fn config(&self) -> &PbdConfig {
        &self.config
    }

    /// Task graph of the solver pipeline, for nesting into a host graph.
    pub fn task_graph(&self) -> &TaskGraph<PbdTask> {
        &self.graph
    }

    /// Hook fired after each step with the final particle state.
    pub fn set_post_step<F>(&mut self, hook: F)
    where
        F: FnMut(&PbdState) + Send + 'static,
    {
        self.post_step = Some(Box::new(hook));
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Advance the simulation by one step of `config.dt`.
    pub fn step(&mut self) {
        self.run_task(PbdTask::IntegratePositions);
        self.run_task(PbdTask::SolveConstraints);
        self.run_task(PbdTask::UpdateVelocity);

        if let Some(hook) = &mut self.post_step {
            hook(&self.state);
        }
    }

    /// Dispatch one published pipeline stage; hosts driving the solver
    /// through a nested task graph call this per node.
    pub fn run_task(&mut self, task: PbdTask) {
        match task {
            PbdTask::IntegratePositions => self.integrate_positions(),
            PbdTask::SolveConstraints => self.solve_constraints(),
            PbdTask::UpdateVelocity => self.update_velocity(),
        }
    }

    /// Predict positions from velocities and the per-step external forces.
    fn integrate_positions(&mut self) {
        let dt = self.config.dt;
        let gravity = self.config.gravity;
        for body in &mut self.state.bodies {
            for i in 0..body.num_particles() {
                body.prev_positions[i] = body.positions[i];
                let w = body.inv_masses[i];
                if w > 0.0 {
                    let accel = gravity + body.external_forces[i] * w;
                    body.positions[i] += body.velocities[i] * dt + accel * (dt * dt);
                }
            }
            for i in 0..body.orientations.len() {
                body.prev_orientations[i] = body.orientations[i];
                let omega = body.angular_velocities[i];
                let q = body.orientations[i];
                let dq = Quatd::from_xyzw(omega.x, omega.y, omega.z, 0.0) * q;
                body.orientations[i] = Quatd::from_xyzw(
                    q.x + 0.5 * dt * dq.x,
                    q.y + 0.5 * dt * dq.y,
                    q.z + 0.5 * dt * dq.z,
                    q.w + 0.5 * dt * dq.w,
                )
                .normalize();
            }
        }
    }

    /// Project every constraint for the configured number of iterations.
    ///
    /// Order within the constraint list is stable across steps; projections
    /// inside one iteration are sequential.
    fn solve_constraints(&mut self) {
        for constraint in &mut self.constraints {
            constraint.zero_lambda();
        }

        let dt = self.config.dt;
        let solver_type = self.config.solver_type;
        for _ in 0..self.config.iterations {
            for constraint in &mut self.constraints {
                constraint.project(&mut self.state, dt, solver_type);
            }
        }
    }

    /// Derive velocities from the position delta and apply damping.
    fn update_velocity(&mut self) {
        let dt = self.config.dt;
        let damp = 1.0 - self.config.damping * dt;
        for body in &mut self.state.bodies {
            for i in 0..body.num_particles() {
                body.velocities[i] = (body.positions[i] - body.prev_positions[i]) / dt;
                body.velocities[i] *= damp;
            }
            for i in 0..body.orientations.len() {
                let dq = body.orientations[i] * body.prev_orientations[i].inverse();
                body.angular_velocities[i] = crate::math::rotation_vector(dq) / dt * damp;
            }
        }
    }
}
