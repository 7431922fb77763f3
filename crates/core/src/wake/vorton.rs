//! Vortex particles and negating vortex segments.
//!
//! A vorton carries a vector strength `ω = Γ·dl`. Its velocity field is the
//! Biot–Savart law regularized with the algebraic mollifier
//!
//! ```text
//! ζ(λ) = 15/(8π) (1 + λ²)^(-9/2),      λ = |r| / σ
//! ```
//!
//! used through its normalized cumulative form, so the field tends to the
//! singular law far from the core and stays finite at `r = 0`:
//!
//! ```text
//! u(r) = (ω × r) K(t) / (4π σ³),       t = λ²,  s = t / (1 + t)
//! K(t) = 105/8 (1/3 - 2s/5 + s²/7) (1 + t)^(-3/2)
//! ```

use crate::core_types::Vec3;
use crate::solver::kernels::segment_velocity;
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Exponent of the mollifier's algebraic decay.
pub const MOLLIFIER_EXPONENT: f64 = 4.5;

/// Vorton regularization profile `ζ(λ)`.
#[must_use]
pub fn mollification_factor(lambda: f64) -> f64 {
    15.0 / (8.0 * PI) * (1.0 + lambda * lambda).powf(-MOLLIFIER_EXPONENT)
}

/// Normalized cumulative kernel `K(t)` and its derivative `dK/dt`.
fn cumulative_kernel(t: f64) -> (f64, f64) {
    let s = t / (1.0 + t);
    let p = 1.0 / 3.0 - 0.4 * s + s * s / 7.0;
    let dp = -0.4 + 2.0 * s / 7.0;
    let base = (1.0 + t).powf(-1.5);
    let k = 105.0 / 8.0 * p * base;
    let dk = 105.0 / 8.0 * base / (1.0 + t) * (dp / (1.0 + t) - 1.5 * p);
    (k, dk)
}

/// A vortex particle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vorton {
    pub position: Vec3,
    /// Vector strength, circulation times length (m³/s).
    pub omega: Vec3,
    pub release_point: Vec3,
    /// Advection steps survived.
    pub age: usize,
    /// Free scalars carried for visualization.
    pub attributes: Vec<f64>,
    active: bool,
}

impl Vorton {
    #[must_use]
    pub fn new(position: Vec3, omega: Vec3) -> Self {
        Self {
            position,
            omega,
            release_point: position,
            age: 0,
            attributes: Vec::new(),
            active: true,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Permanently removes the vorton from the flow.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Distance travelled since release.
    #[must_use]
    pub fn travelled(&self) -> f64 {
        (self.position - self.release_point).norm()
    }

    /// Induced velocity at `point` for core size `core`.
    #[must_use]
    pub fn velocity_at(&self, point: &Vec3, core: f64) -> Vec3 {
        let r = point - self.position;
        let t = r.norm_squared() / (core * core);
        let (k, _) = cumulative_kernel(t);
        self.omega.cross(&r) * (k / (4.0 * PI * core.powi(3)))
    }

    /// Velocity gradient `∂u_i/∂x_j` at `point`.
    #[must_use]
    pub fn velocity_gradient_at(&self, point: &Vec3, core: f64) -> Matrix3<f64> {
        let r = point - self.position;
        let core_sq = core * core;
        let t = r.norm_squared() / core_sq;
        let (k, dk) = cumulative_kernel(t);
        let scale = 1.0 / (4.0 * PI * core.powi(3));
        self.omega.cross_matrix() * (k * scale)
            + self.omega.cross(&r) * r.transpose() * (2.0 * dk * scale / core_sq)
    }
}

/// Vortons released together at one step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VortonRow {
    pub vortons: Vec<Vorton>,
}

impl VortonRow {
    #[must_use]
    pub fn has_active(&self) -> bool {
        self.vortons.iter().any(Vorton::is_active)
    }

    pub fn active(&self) -> impl Iterator<Item = &Vorton> {
        self.vortons.iter().filter(|v| v.is_active())
    }

    /// Sum of the active vorton strengths.
    #[must_use]
    pub fn total_omega(&self) -> Vec3 {
        self.active().map(|v| v.omega).sum()
    }
}

/// Straight vortex segment cancelling the circulation of a shed row at the
/// release line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NegatingVortex {
    pub a: Vec3,
    pub b: Vec3,
    /// Circulation (m²/s), oriented from `a` to `b`.
    pub circulation: f64,
}

impl NegatingVortex {
    #[must_use]
    pub fn velocity_at(&self, point: &Vec3, core_radius: f64) -> Vec3 {
        segment_velocity(&self.a, &self.b, point, core_radius) * (self.circulation / (4.0 * PI))
    }

    /// Vector strength `Γ·(b - a)`, comparable to a vorton's `ω`.
    #[must_use]
    pub fn omega(&self) -> Vec3 {
        (self.b - self.a) * self.circulation
    }
}
