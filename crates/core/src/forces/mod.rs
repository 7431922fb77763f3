//! Force and moment integration.
//!
//! Turns solved strengths into [`AeroForces`] and [`SpanDistribs`]. Nothing
//! here mutates the panels or the wake.

pub mod aero_forces;
pub mod integrator;
pub mod span;
pub mod stability;

pub use aero_forces::{AeroForces, ReferenceDimensions, MIN_REFERENCE_DIMENSION};
pub use integrator::{
    integrate_totals, profile_drag, span_distribs, trefftz_plane, PanelLoads, TrefftzStation,
};
pub use span::{SpanDistribs, StationLoad, StationViscous};
pub use stability::{
    perturbed_onsets, CoefficientSet, Perturbation, StabilityDerivatives, RATE_PERTURBATION,
    VELOCITY_PERTURBATION,
};
