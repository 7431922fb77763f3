//! Operating point sweep over one panel mesh.
//!
//! A [`Task`] is built on the caller's thread, where the configuration is
//! validated, and then run on a worker thread of the caller's choosing.
//! Observers hold [`TaskController`] handles to read the status, request
//! cancellation and drain the message queue.
//!
//! Per operating point:
//!
//! ```text
//! bank mesh → wake → assemble → [release, solve, advect]* → solve / twist loop
//!           → panel loads → Trefftz plane → totals → stability batch
//! ```

use super::messages::{MessageQueue, TaskMessage};
use super::result::{OperatingPoint, OperatingPointResult};
use super::status::{CancellationToken, SharedStatus, TaskStatus};
use crate::config::{AnalysisConfig, WakeKind};
use crate::core_types::{wind_direction, Frame, Vec3};
use crate::error::{AeroResult, ConfigurationError};
use crate::forces::{
    integrate_totals, perturbed_onsets, span_distribs, trefftz_plane, AeroForces,
    CoefficientSet, PanelLoads, ReferenceDimensions, StabilityDerivatives, StationViscous,
};
use crate::geometry::PanelMesh;
use crate::solver::assembly::evaluate_points;
use crate::solver::{
    create_analysis_method, AnalysisMethod, KernelSettings, LinearSystem, ProfilerScope,
};
use crate::viscous::{TwistLoop, TwistOutcome, ViscousPolar};
use crate::wake::{AdvectionEngine, FlatWake, InducedVelocity, ParticleWake, WakeModel};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Surface strengths for one onset field.
struct Solution {
    onset: Vec<Vec3>,
    mu: Vec<f64>,
    sigma: Vec<f64>,
}

/// Factorized system of one operating point plus what is needed to turn
/// onset fields into strengths and loads.
struct PointSolver<'a> {
    mesh: &'a PanelMesh,
    method: &'a dyn AnalysisMethod,
    system: &'a LinearSystem,
    max_rhs: usize,
    qinf: f64,
    density: f64,
}

impl PointSolver<'_> {
    fn solve(&self, onsets: Vec<Vec<Vec3>>) -> AeroResult<Vec<Solution>> {
        let _scope = ProfilerScope::new("batched solve", onsets.len());
        let sigmas: Vec<Vec<f64>> = onsets
            .iter()
            .map(|onset| self.method.source_strengths(self.mesh, onset))
            .collect();
        let rhs: Vec<Vec<f64>> = onsets
            .iter()
            .zip(&sigmas)
            .map(|(onset, sigma)| self.method.build_rhs(self.mesh, self.system, onset, sigma))
            .collect();
        let batch = self.method.solve(self.system, &rhs, self.max_rhs)?;
        debug!(
            "Solved {} right-hand sides in {} batches",
            rhs.len(),
            batch.n_batches
        );

        Ok(onsets
            .into_iter()
            .zip(sigmas)
            .zip(batch.strengths)
            .map(|((onset, sigma), mu)| Solution { onset, mu, sigma })
            .collect())
    }

    fn solve_one(&self, onset: Vec<Vec3>) -> AeroResult<Solution> {
        let mut solutions = self.solve(vec![onset])?;
        Ok(solutions.swap_remove(0))
    }

    fn loads(&self, solution: &Solution) -> PanelLoads {
        self.method.integrate_forces(
            self.mesh,
            &solution.mu,
            &solution.onset,
            self.qinf,
            self.density,
        )
    }
}

/// Lift coefficient of each strip, on the strip area.
fn station_lift(
    mesh: &PanelMesh,
    loads: &PanelLoads,
    wind: &Frame,
    dynamic_pressure: f64,
) -> Vec<f64> {
    mesh.strip_geometry()
        .iter()
        .enumerate()
        .map(|(station, strip)| {
            let (force, _) = loads.subset(mesh.strip_panels(station), &strip.quarter_chord());
            let scale = dynamic_pressure * strip.area;
            if scale > 0.0 {
                force.dot(&wind.k) / scale
            } else {
                0.0
            }
        })
        .collect()
}

fn column_strengths(wake: &WakeModel, mu: &[f64]) -> Vec<f64> {
    wake.columns().iter().map(|column| column.strength(mu)).collect()
}

/// Shared handle on a running [`Task`].
#[derive(Debug, Clone)]
pub struct TaskController {
    status: SharedStatus,
    token: CancellationToken,
    messages: Arc<MessageQueue>,
}

impl TaskController {
    /// Requests cancellation. Idempotent; a finished task stays finished.
    pub fn cancel(&self) {
        self.token.cancel();
        self.status.finish(TaskStatus::Cancelled);
    }

    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.status.get()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    #[must_use]
    pub fn messages(&self) -> Arc<MessageQueue> {
        Arc::clone(&self.messages)
    }
}

/// Sweep of operating points over a borrowed mesh.
///
/// The mesh is never mutated: each point works on its own banked copy. The
/// only state carried between points is the virtual twist, and only when
/// [`crate::config::ViscousConfig::reuse_twist`] is set.
pub struct Task<'g> {
    mesh: &'g PanelMesh,
    reference: ReferenceDimensions,
    config: AnalysisConfig,
    polar: Option<Arc<dyn ViscousPolar>>,
    points: VecDeque<OperatingPoint>,
    status: SharedStatus,
    token: CancellationToken,
    messages: Arc<MessageQueue>,
    twist: Vec<f64>,
    results: Vec<OperatingPointResult>,
}

impl<'g> Task<'g> {
    /// Validates the inputs and queues the points.
    ///
    /// # Arguments
    ///
    /// * `mesh` - Reference panel set, borrowed for the task's lifetime
    /// * `reference` - Reference dimensions for the coefficients
    /// * `config` - Analysis settings
    /// * `polar` - Section polars, required when the viscous loop is enabled
    /// * `points` - Operating points, evaluated in order
    ///
    /// # Errors
    ///
    /// [`crate::AeroError::Configuration`] for an invalid setting, reference
    /// dimension or operating point, or a viscous loop without polars.
    pub fn new(
        mesh: &'g PanelMesh,
        reference: ReferenceDimensions,
        config: AnalysisConfig,
        polar: Option<Arc<dyn ViscousPolar>>,
        points: Vec<OperatingPoint>,
    ) -> AeroResult<Self> {
        config.validate()?;
        reference.validate()?;
        for point in &points {
            point.validate()?;
        }
        if config.viscous.enabled && polar.is_none() {
            return Err(ConfigurationError::InvalidParameter {
                name: "viscous.enabled",
                value: 1.0,
                reason: "the viscous loop needs section polars",
            }
            .into());
        }

        info!(
            "Created task: {} panels, {} stations, {} operating points, {:?} method, {:?} wake",
            mesh.n_panels(),
            mesh.n_stations(),
            points.len(),
            config.solver.method,
            config.wake.kind
        );

        Ok(Self {
            mesh,
            reference,
            config,
            polar,
            points: points.into(),
            status: SharedStatus::new(),
            token: CancellationToken::new(),
            messages: Arc::new(MessageQueue::new()),
            twist: Vec::new(),
            results: Vec::new(),
        })
    }

    #[must_use]
    pub fn controller(&self) -> TaskController {
        TaskController {
            status: self.status.clone(),
            token: self.token.clone(),
            messages: Arc::clone(&self.messages),
        }
    }

    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.status.get()
    }

    #[must_use]
    pub fn messages(&self) -> Arc<MessageQueue> {
        Arc::clone(&self.messages)
    }

    /// Points not evaluated yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn results(&self) -> &[OperatingPointResult] {
        &self.results
    }

    #[must_use]
    pub fn into_results(self) -> Vec<OperatingPointResult> {
        self.results
    }

    /// Evaluates the queued points in order.
    ///
    /// A point whose solve fails is published as a failed record and the
    /// sweep moves on. Cancellation leaves the points evaluated so far in
    /// [`Self::results`].
    ///
    /// # Returns
    ///
    /// The terminal status: `Finished`, or `Cancelled` once the token was seen.
    pub fn run(&mut self) -> TaskStatus {
        if !self.status.transition(TaskStatus::Pending, TaskStatus::Running) {
            return self.status.get();
        }
        let total = self.points.len();
        info!("Starting sweep of {} operating points", total);

        while let Some(point) = self.points.pop_front() {
            if self.token.is_cancelled() {
                self.points.push_front(point);
                break;
            }
            let index = total - self.points.len();
            info!(
                "Operating point {}/{}: alpha={:.2}° beta={:.2}° phi={:.2}° Q={:.2} m/s",
                index, total, point.alpha, point.beta, point.phi, point.qinf
            );

            match self.evaluate(&point) {
                Ok(result) => self.publish(result),
                Err(err) if err.is_cancellation() => {
                    self.points.push_front(point);
                    break;
                }
                Err(err) => {
                    warn!("Operating point alpha={:.2}° failed: {}", point.alpha, err);
                    self.messages.log(format!("alpha={:.2}°: {}", point.alpha, err));
                    self.results.push(OperatingPointResult::failed(
                        point,
                        self.reference,
                        self.config.fluid.density,
                        err.to_string(),
                    ));
                }
            }
        }

        let end = if self.token.is_cancelled() {
            TaskStatus::Cancelled
        } else {
            TaskStatus::Finished
        };
        let status = self.status.finish(end);
        info!(
            "Sweep {:?} with {} of {} points evaluated",
            status,
            self.results.len(),
            total
        );
        status
    }

    fn publish(&mut self, result: OperatingPointResult) {
        let alpha = result.point.alpha;
        for warning in &result.warnings {
            self.messages.log(format!("alpha={alpha:.2}°: {warning}"));
        }
        let forces = &result.forces;
        self.messages.log(format!(
            "alpha={:.2}° CL={:.5} CD={:.6} Cm={:.5}{}",
            alpha,
            forces.cl(),
            forces.cd(),
            forces.cm(),
            if result.converged { "" } else { " (not converged)" }
        ));
        if self.config.viscous.reuse_twist {
            self.twist.clone_from(&result.virtual_twist);
        }
        self.results.push(result);
    }

    fn evaluate(&self, point: &OperatingPoint) -> AeroResult<OperatingPointResult> {
        let config = &self.config;
        let chord = self.reference.chord;
        let multithread = config.solver.multithread;
        let density = config.fluid.density;

        let mesh = self.mesh.rotated_for_bank(point.phi);
        let method = create_analysis_method(config.solver.method);
        let settings = KernelSettings {
            far_field_factor: config.solver.far_field_factor,
            core_radius: config.solver.core_radius * chord,
            vorton_core: config.wake.vorton_core_size * chord,
            mirror: config.fluid.ground_effect.mirror(),
        };
        let mut forces =
            AeroForces::new(self.reference, density, point.qinf, point.alpha, point.beta);
        let wind = forces.wind;
        let freestream = wind.i * point.qinf;

        let lines: Vec<(Vec3, Vec3)> = (0..mesh.wake_columns().len())
            .map(|column| method.shedding_line(&mesh, column))
            .collect();
        let mut wake = match config.wake.kind {
            WakeKind::Flat => WakeModel::Flat(FlatWake::new(
                mesh.wake_columns(),
                &lines,
                &wind.i,
                &config.wake,
                chord,
            )),
            WakeKind::Particle => WakeModel::Particle(ParticleWake::new(
                mesh.wake_columns(),
                &lines,
                &wind.i,
                &config.wake,
                chord,
            )),
        };

        let system = {
            let _scope = ProfilerScope::new("assembly and factorization", mesh.n_panels());
            method.assemble_influence(&mesh, &wake, &settings, multithread)?
        };
        self.token.check()?;
        let solver = PointSolver {
            mesh: &mesh,
            method: method.as_ref(),
            system: &system,
            max_rhs: config.solver.max_rhs,
            qinf: point.qinf,
            density,
        };
        let eval_points: Vec<Vec3> = mesh
            .panels()
            .iter()
            .map(|panel| method.evaluation_point(panel))
            .collect();

        let engine = wake.as_particle().map(|particle| {
            AdvectionEngine::new(
                particle.step_length(),
                point.qinf,
                particle.max_length(),
                multithread,
                config.wake.vorton_stretching,
            )
        });
        if let Some(engine) = engine {
            for iteration in 1..=config.wake.vorton_iterations {
                self.token.check()?;
                let free = evaluate_points(&eval_points, multithread, |p| {
                    wake.free_velocity(p, &settings)
                });
                let onset = free.iter().map(|w| freestream + w).collect();
                let solution = solver.solve_one(onset)?;
                let strengths = column_strengths(&wake, &solution.mu);

                if let Some(particle) = wake.as_particle_mut() {
                    particle.release_row(&strengths);
                }
                let advected = match wake.as_particle() {
                    Some(particle) => {
                        let field = |p: &Vec3| {
                            let surface = method.induced_velocity(
                                &mesh,
                                p,
                                &solution.mu,
                                &solution.sigma,
                                &settings,
                            );
                            surface + wake.induced_velocity(p, &strengths, &settings)
                        };
                        engine.advance(particle.rows(), &freestream, &field)
                    }
                    None => Vec::new(),
                };
                if let Some(particle) = wake.as_particle_mut() {
                    particle.publish_rows(advected);
                    debug!(
                        "Wake iteration {}: {} rows, {} active vortons",
                        iteration,
                        particle.rows().len(),
                        particle.n_active()
                    );
                    if config.wake.live_update {
                        self.messages.push(TaskMessage::LiveUpdate {
                            control: point.control,
                            vortons: particle.rows().to_vec(),
                        });
                    }
                }
            }
        }

        // The vortons are frozen from here on.
        let free = evaluate_points(&eval_points, multithread, |p| {
            wake.free_velocity(p, &settings)
        });
        let onset_for = |twist: &[f64]| -> Vec<Vec3> {
            mesh.panels()
                .iter()
                .zip(&free)
                .map(|(panel, w)| {
                    let gamma = panel
                        .strip
                        .and_then(|station| twist.get(station))
                        .copied()
                        .unwrap_or(0.0);
                    wind_direction(point.alpha + gamma, point.beta) * point.qinf + w
                })
                .collect()
        };
        let dynamic_pressure = forces.dynamic_pressure();
        let chords: Vec<f64> = mesh.strip_geometry().iter().map(|s| s.chord).collect();
        let mut warnings = Vec::new();

        let (solution, loads, outcome) = match (&self.polar, config.viscous.enabled) {
            (Some(polar), true) => {
                let looped = TwistLoop::new(polar.as_ref(), &config.viscous, point.qinf);
                let seed = if config.viscous.reuse_twist {
                    self.twist.clone()
                } else {
                    Vec::new()
                };
                let mut last = None;
                let outcome = looped.run(&chords, seed, &self.token, |twist| {
                    let solution = solver.solve_one(onset_for(twist))?;
                    let loads = solver.loads(&solution);
                    let lift = station_lift(&mesh, &loads, &wind, dynamic_pressure);
                    last = Some((solution, loads));
                    Ok(lift)
                })?;
                let (solution, loads) = match last {
                    Some(last) => last,
                    None => {
                        let solution = solver.solve_one(onset_for(&outcome.twist))?;
                        let loads = solver.loads(&solution);
                        (solution, loads)
                    }
                };
                (solution, loads, Some(outcome))
            }
            _ => {
                let solution = solver.solve_one(onset_for(&[]))?;
                let loads = solver.loads(&solution);
                (solution, loads, None)
            }
        };

        let strengths = column_strengths(&wake, &solution.mu);
        let trefftz = trefftz_plane(
            &lines,
            &strengths,
            &wind,
            point.qinf,
            density,
            config.solver.trefftz_distance * chord,
            &settings,
        );

        let viscous: Option<Vec<StationViscous>> = match (&outcome, &self.polar) {
            (Some(outcome), _) => Some(outcome.stations.clone()),
            (None, Some(polar)) => {
                let looped = TwistLoop::new(polar.as_ref(), &config.viscous, point.qinf);
                let lift = station_lift(&mesh, &loads, &wind, dynamic_pressure);
                let (stations, missed) = looped.sections_at_lift(&chords, &lift);
                for message in &missed {
                    warn!("Profile drag lookup failed at {}", message);
                }
                warnings.extend(missed);
                Some(stations)
            }
            (None, None) => None,
        };

        integrate_totals(
            &loads,
            &trefftz,
            mesh.strip_geometry(),
            viscous.as_deref(),
            &config.fluid,
            &mut forces,
        );
        let mut span = span_distribs(&mesh, &loads, &trefftz, &forces);
        if let Some(viscous) = &viscous {
            span.apply_viscous(viscous);
        }

        let stability = if !config.solver.stability_derivatives {
            None
        } else if wake.as_particle().is_some() {
            // The release rings are one step long; the perturbed cases run on
            // full rigid columns with the vortons left out.
            self.token.check()?;
            let flat = WakeModel::Flat(FlatWake::new(
                mesh.wake_columns(),
                &lines,
                &wind.i,
                &config.wake,
                chord,
            ));
            let system = {
                let _scope = ProfilerScope::new("stability factorization", mesh.n_panels());
                method.assemble_influence(&mesh, &flat, &settings, multithread)?
            };
            self.token.check()?;
            let flat_solver = PointSolver {
                system: &system,
                ..solver
            };
            let base: Vec<Vec3> = solution
                .onset
                .iter()
                .zip(&free)
                .map(|(onset, w)| onset - w)
                .collect();
            self.stability_batch(&flat_solver, &eval_points, &base, &forces)?
        } else {
            self.token.check()?;
            self.stability_batch(&solver, &eval_points, &solution.onset, &forces)?
        };

        let (virtual_twist, viscous_iterations, converged) = match outcome {
            Some(TwistOutcome {
                twist,
                iterations,
                converged,
                failure,
                ..
            }) => {
                if let Some(failure) = failure {
                    warnings.push(failure.to_string());
                }
                (twist, iterations, converged)
            }
            None => (vec![0.0; mesh.n_stations()], 0, true),
        };

        info!(
            "alpha={:.2}°: CL={:.5} CD={:.6} Cm={:.5} e={:.3}",
            point.alpha,
            forces.cl(),
            forces.cd(),
            forces.cm(),
            forces.oswald_efficiency()
        );

        Ok(OperatingPointResult {
            point: *point,
            cp: loads.cp,
            mu: solution.mu,
            sigma: solution.sigma,
            forces,
            span,
            stability,
            vortons: wake.as_particle().map(|particle| particle.rows().to_vec()),
            virtual_twist,
            viscous_iterations,
            converged,
            warnings,
        })
    }

    /// Solves the perturbed onsets against one factorization.
    fn stability_batch(
        &self,
        solver: &PointSolver<'_>,
        eval_points: &[Vec3],
        base: &[Vec3],
        forces: &AeroForces,
    ) -> AeroResult<Option<StabilityDerivatives>> {
        let onsets = perturbed_onsets(
            eval_points,
            base,
            forces.qinf,
            &self.reference,
            &forces.stability,
        );
        let sets: Vec<CoefficientSet> = solver
            .solve(onsets)?
            .iter()
            .map(|solution| {
                let loads = solver.loads(solution);
                let mut case = AeroForces::new(
                    self.reference,
                    forces.density,
                    forces.qinf,
                    forces.alpha,
                    forces.beta,
                );
                integrate_totals(
                    &loads,
                    &[],
                    solver.mesh.strip_geometry(),
                    None,
                    &self.config.fluid,
                    &mut case,
                );
                CoefficientSet::from_forces(&case)
            })
            .collect();
        Ok(StabilityDerivatives::from_cases(&sets))
    }
}
