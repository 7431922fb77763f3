//! Analysis method trait definition
//!
//! An [`AnalysisMethod`] turns a panel mesh and a wake into a factorized
//! influence system, builds right-hand sides from onset velocities, and
//! converts the solved doublet strengths into panel loads. One method is
//! selected per operating point.

use super::kernels::KernelSettings;
use super::linear::{BatchSolution, LinearSystem};
use crate::config::MethodKind;
use crate::core_types::Vec3;
use crate::error::AeroResult;
use crate::forces::PanelLoads;
use crate::geometry::{Panel4, PanelMesh};
use crate::wake::WakeModel;

/// Singularity formulation of the surface.
pub trait AnalysisMethod: Send + Sync {
    fn kind(&self) -> MethodKind;

    /// Line from which wake column `column` is shed.
    fn shedding_line(&self, mesh: &PanelMesh, column: usize) -> (Vec3, Vec3);

    /// Point where the boundary condition of `panel` is imposed.
    fn evaluation_point(&self, panel: &Panel4) -> Vec3;

    /// Assembles and factorizes the influence matrix.
    ///
    /// # Arguments
    ///
    /// * `mesh` - Working panel set
    /// * `wake` - Wake whose ring columns join the shedding panels' unknowns
    /// * `settings` - Kernel lengths and mirror plane
    /// * `multithread` - Fill row blocks on the rayon pool
    ///
    /// # Errors
    ///
    /// A [`crate::SolveFailure`] when a coefficient is not finite or the
    /// matrix is singular.
    fn assemble_influence(
        &self,
        mesh: &PanelMesh,
        wake: &WakeModel,
        settings: &KernelSettings,
        multithread: bool,
    ) -> AeroResult<LinearSystem>;

    /// Source strengths for the onset velocities at the evaluation points.
    fn source_strengths(&self, mesh: &PanelMesh, onset: &[Vec3]) -> Vec<f64>;

    /// Right-hand side for the onset velocities at the evaluation points.
    fn build_rhs(
        &self,
        mesh: &PanelMesh,
        system: &LinearSystem,
        onset: &[Vec3],
        sigma: &[f64],
    ) -> Vec<f64>;

    /// Solves every right-hand side against one factorization.
    ///
    /// # Errors
    ///
    /// Propagates the failures of [`LinearSystem::solve_batch`].
    fn solve(
        &self,
        system: &LinearSystem,
        rhs: &[Vec<f64>],
        max_rhs: usize,
    ) -> AeroResult<BatchSolution> {
        system.solve_batch(rhs, max_rhs)
    }

    /// Velocity induced by the surface singularities at `point`.
    fn induced_velocity(
        &self,
        mesh: &PanelMesh,
        point: &Vec3,
        mu: &[f64],
        sigma: &[f64],
        settings: &KernelSettings,
    ) -> Vec3;

    /// Per-panel forces and pressure coefficients.
    ///
    /// # Arguments
    ///
    /// * `mu` - Doublet strengths
    /// * `onset` - Onset velocity at each evaluation point
    /// * `qinf` - Freestream speed (m/s)
    /// * `density` - Fluid density (kg/m³)
    fn integrate_forces(
        &self,
        mesh: &PanelMesh,
        mu: &[f64],
        onset: &[Vec3],
        qinf: f64,
        density: f64,
    ) -> PanelLoads;
}
