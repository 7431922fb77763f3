//! Stability derivatives by finite differences on one factorization.
//!
//! Seven onset fields share the influence matrix: the base point, the three
//! velocity perturbations along the stability axes and the three rotation
//! rates about the reference point. Rates are non-dimensional:
//!
//! ```text
//! p̂ = p b / 2Q∞      q̂ = q c / 2Q∞      r̂ = r b / 2Q∞
//! ```

use super::aero_forces::{AeroForces, ReferenceDimensions, MIN_REFERENCE_DIMENSION};
use crate::core_types::{Frame, Vec3};
use serde::{Deserialize, Serialize};

/// Velocity perturbation, as a fraction of the freestream speed.
pub const VELOCITY_PERTURBATION: f64 = 1.0e-3;

/// Non-dimensional rotation rate perturbation.
pub const RATE_PERTURBATION: f64 = 1.0e-2;

/// Onset cases in batch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perturbation {
    Base,
    U,
    V,
    W,
    P,
    Q,
    R,
}

impl Perturbation {
    pub const ALL: [Self; 7] = [
        Self::Base,
        Self::U,
        Self::V,
        Self::W,
        Self::P,
        Self::Q,
        Self::R,
    ];
}

/// Force and moment coefficients of one onset case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoefficientSet {
    pub cl: f64,
    pub cy: f64,
    pub cm: f64,
    pub croll: f64,
    pub cn: f64,
}

impl CoefficientSet {
    #[must_use]
    pub fn from_forces(forces: &AeroForces) -> Self {
        Self {
            cl: forces.cl(),
            cy: forces.cy(),
            cm: forces.cm(),
            croll: forces.croll(),
            cn: forces.cn(),
        }
    }
}

/// Derivatives per radian of angle and per unit non-dimensional rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StabilityDerivatives {
    /// Lift change per unit `Δu / Q∞`
    pub cl_u: f64,
    pub cl_alpha: f64,
    pub cy_beta: f64,
    pub cm_alpha: f64,
    pub croll_beta: f64,
    pub cn_beta: f64,
    pub cl_q: f64,
    pub cm_q: f64,
    pub croll_p: f64,
    pub cn_r: f64,
}

impl StabilityDerivatives {
    /// Differences the coefficient sets, given in [`Perturbation::ALL`]
    /// order. Returns `None` for any other number of cases.
    #[must_use]
    pub fn from_cases(cases: &[CoefficientSet]) -> Option<Self> {
        let [base, u, v, w, p, q, r] = <[CoefficientSet; 7]>::try_from(cases).ok()?;
        let dv = VELOCITY_PERTURBATION;
        let dr = RATE_PERTURBATION;
        // A positive side velocity is a negative sideslip.
        let dbeta = -dv.atan();
        let dalpha = dv.atan();
        Some(Self {
            cl_u: (u.cl - base.cl) / dv,
            cl_alpha: (w.cl - base.cl) / dalpha,
            cy_beta: (v.cy - base.cy) / dbeta,
            cm_alpha: (w.cm - base.cm) / dalpha,
            croll_beta: (v.croll - base.croll) / dbeta,
            cn_beta: (v.cn - base.cn) / dbeta,
            cl_q: (q.cl - base.cl) / dr,
            cm_q: (q.cm - base.cm) / dr,
            croll_p: (p.croll - base.croll) / dr,
            cn_r: (r.cn - base.cn) / dr,
        })
    }
}

/// Onset velocities of every case at the given points.
///
/// # Arguments
///
/// * `points` - Evaluation points
/// * `base` - Onset of the operating point at each evaluation point
/// * `qinf` - Freestream speed (m/s)
/// * `reference` - Span and chord scale the rates, `cog` is the rotation centre
/// * `stability` - Stability axes of the operating point
#[must_use]
pub fn perturbed_onsets(
    points: &[Vec3],
    base: &[Vec3],
    qinf: f64,
    reference: &ReferenceDimensions,
    stability: &Frame,
) -> Vec<Vec<Vec3>> {
    let dv = VELOCITY_PERTURBATION * qinf;
    let rate = |length: f64| {
        if length < MIN_REFERENCE_DIMENSION {
            0.0
        } else {
            RATE_PERTURBATION * 2.0 * qinf / length
        }
    };

    Perturbation::ALL
        .iter()
        .map(|case| {
            let (shift, omega) = match case {
                Perturbation::Base => (Vec3::zeros(), Vec3::zeros()),
                Perturbation::U => (stability.i * dv, Vec3::zeros()),
                Perturbation::V => (stability.j * dv, Vec3::zeros()),
                Perturbation::W => (stability.k * dv, Vec3::zeros()),
                Perturbation::P => (Vec3::zeros(), stability.i * rate(reference.span)),
                Perturbation::Q => (Vec3::zeros(), stability.j * rate(reference.chord)),
                Perturbation::R => (Vec3::zeros(), stability.k * rate(reference.span)),
            };
            points
                .iter()
                .zip(base)
                .map(|(point, onset)| onset + shift - omega.cross(&(point - reference.cog)))
                .collect()
        })
        .collect()
}
