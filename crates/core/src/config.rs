//! Analysis configuration
//!
//! All tunable settings are passed explicitly into [`crate::Task::new`]; nothing
//! is read from global state. Lengths given as "chords" are multiples of the
//! reference chord.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};

/// Singularity formulation used to build the influence system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodKind {
    /// Ring vortex lattice on thin surfaces, control points at 3/4 chord.
    Vlm,
    /// Quad doublet panels, with sources on thick surfaces.
    Panel,
}

/// Wake representation behind the trailing edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WakeKind {
    /// Rigid wake columns aligned with the freestream.
    Flat,
    /// Release rings followed by advected vortex particles.
    Particle,
}

/// Mirror plane below the geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GroundEffect {
    None,
    /// Solid ground at `z = -height`.
    Ground { height: f64 },
    /// Free surface at `z = -height`.
    FreeSurface { height: f64 },
}

impl GroundEffect {
    /// Plane height and image coefficient, or `None` without a mirror plane.
    #[must_use]
    pub fn mirror(&self) -> Option<(f64, f64)> {
        match *self {
            Self::None => None,
            Self::Ground { height } => Some((height, 1.0)),
            Self::FreeSurface { height } => Some((height, -1.0)),
        }
    }
}

/// Influence matrix and linear solver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    pub method: MethodKind,
    /// Distance, in panel sizes, beyond which the far-field kernels are used.
    pub far_field_factor: f64,
    /// Vortex segment core radius (chords).
    pub core_radius: f64,
    /// Maximum number of right-hand sides solved per batch.
    pub max_rhs: usize,
    pub multithread: bool,
    /// Length of the trailing legs used for the Trefftz-plane integration (chords).
    pub trefftz_distance: f64,
    /// Also compute stability derivatives from a batched solve.
    pub stability_derivatives: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: MethodKind::Vlm,
            // ~0.5% kernel error at 7 panel sizes
            far_field_factor: 7.0,
            core_radius: 1.0e-6,
            max_rhs: 100,
            multithread: true,
            trefftz_distance: 250.0,
            stability_derivatives: false,
        }
    }
}

/// Wake geometry and vortex particle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeConfig {
    pub kind: WakeKind,
    /// First wake segment length, also the particle release step (chords).
    pub first_panel_length: f64,
    /// Ratio between consecutive flat wake segments.
    pub growth_factor: f64,
    /// Flat wake length (chords).
    pub flat_wake_length: f64,
    /// Vortons further than this from their release point are dropped (chords).
    pub vorton_max_length: f64,
    /// Mollification radius of the vortons (chords).
    pub vorton_core_size: f64,
    /// Number of release/advection steps per operating point.
    pub vorton_iterations: usize,
    /// Reserved: strength update from the velocity gradient.
    pub vorton_stretching: bool,
    /// Post a vorton snapshot to the message queue after each step.
    pub live_update: bool,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            kind: WakeKind::Flat,
            first_panel_length: 0.1,
            growth_factor: 1.1,
            flat_wake_length: 30.0,
            vorton_max_length: 30.0,
            // Twice the release step so neighbouring cores overlap
            vorton_core_size: 0.2,
            vorton_iterations: 35,
            vorton_stretching: false,
            live_update: false,
        }
    }
}

/// Virtual-twist loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViscousConfig {
    pub enabled: bool,
    pub relaxation: f64,
    /// Convergence threshold on the largest station angle correction (degrees).
    pub precision: f64,
    pub max_iterations: usize,
    /// Seed each point with the twist converged at the previous one.
    pub reuse_twist: bool,
    /// Kinematic viscosity (m²/s).
    pub kinematic_viscosity: f64,
}

impl Default for ViscousConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            relaxation: 0.5,
            precision: 0.01,
            max_iterations: 35,
            reuse_twist: false,
            // Air at 15°C
            kinematic_viscosity: 1.5e-5,
        }
    }
}

/// Fluid properties and extra drag terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluidConfig {
    /// Density (kg/m³)
    pub density: f64,
    pub ground_effect: GroundEffect,
    /// Fuselage drag area `Cd·A` (m²)
    pub fuselage_drag_area: f64,
    /// Additional drag area `Cd·A` (m²)
    pub extra_drag_area: f64,
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            // ISA sea level
            density: 1.225,
            ground_effect: GroundEffect::None,
            fuselage_drag_area: 0.0,
            extra_drag_area: 0.0,
        }
    }
}

/// Complete configuration for one analysis task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub solver: SolverConfig,
    pub wake: WakeConfig,
    pub viscous: ViscousConfig,
    pub fluid: FluidConfig,
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidParameter {
            name,
            value,
            reason: "must be positive",
        })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidParameter {
            name,
            value,
            reason: "must not be negative",
        })
    }
}

impl AnalysisConfig {
    /// Checks every setting before a sweep starts.
    ///
    /// # Errors
    ///
    /// Returns the first invalid parameter found as a [`ConfigurationError`].
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let solver = &self.solver;
        positive("far_field_factor", solver.far_field_factor)?;
        non_negative("core_radius", solver.core_radius)?;
        positive("trefftz_distance", solver.trefftz_distance)?;
        if solver.max_rhs == 0 {
            return Err(ConfigurationError::InvalidParameter {
                name: "max_rhs",
                value: 0.0,
                reason: "at least one right-hand side per batch",
            });
        }

        let wake = &self.wake;
        positive("first_panel_length", wake.first_panel_length)?;
        positive("flat_wake_length", wake.flat_wake_length)?;
        positive("vorton_max_length", wake.vorton_max_length)?;
        positive("vorton_core_size", wake.vorton_core_size)?;
        if !(wake.growth_factor.is_finite() && wake.growth_factor >= 1.0) {
            return Err(ConfigurationError::InvalidParameter {
                name: "growth_factor",
                value: wake.growth_factor,
                reason: "must be at least 1",
            });
        }

        let viscous = &self.viscous;
        if !(viscous.relaxation > 0.0 && viscous.relaxation <= 1.0) {
            return Err(ConfigurationError::InvalidParameter {
                name: "relaxation",
                value: viscous.relaxation,
                reason: "must lie in (0, 1]",
            });
        }
        positive("precision", viscous.precision)?;
        positive("kinematic_viscosity", viscous.kinematic_viscosity)?;

        let fluid = &self.fluid;
        positive("density", fluid.density)?;
        non_negative("fuselage_drag_area", fluid.fuselage_drag_area)?;
        non_negative("extra_drag_area", fluid.extra_drag_area)?;
        if let Some((height, _)) = fluid.ground_effect.mirror() {
            positive("ground_height", height)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.solver.far_field_factor, 7.0);
        assert_eq!(config.solver.max_rhs, 100);
        assert_eq!(config.viscous.max_iterations, 35);
    }

    #[test]
    fn test_rejects_shrinking_wake() {
        let mut config = AnalysisConfig::default();
        config.wake.growth_factor = 0.9;
        let err = config.validate().unwrap_err();
        assert!(
            matches!(
                err,
                ConfigurationError::InvalidParameter {
                    name: "growth_factor",
                    ..
                }
            ),
            "Unexpected error {err:?}"
        );
    }

    #[test]
    fn test_rejects_zero_rhs_batch() {
        let mut config = AnalysisConfig::default();
        config.solver.max_rhs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ground_mirror_coefficients() {
        assert_eq!(GroundEffect::None.mirror(), None);
        assert_eq!(GroundEffect::Ground { height: 2.0 }.mirror(), Some((2.0, 1.0)));
        assert_eq!(
            GroundEffect::FreeSurface { height: 2.0 }.mirror(),
            Some((2.0, -1.0))
        );
    }
}
