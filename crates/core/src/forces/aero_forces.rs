//! Aggregate forces of one operating point and their coefficients.
//!
//! Coefficients are referred to the dynamic pressure `q = ½ρQ∞²` and the
//! reference dimensions:
//!
//! ```text
//! CL  = F_near · k_wind / (q S)          CY  = F_near · j_wind / (q S)
//! ICd = F_far  · i_wind / (q S)          PCd = (D_profile + D_fus + D_extra) / (q S)
//! Cm  = M · j_stab / (q S c)             Cl  = M · i_stab / (q S b)
//! Cn  = M · k_stab / (q S b)
//! ```

use crate::core_types::{Frame, Vec3};
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Reference dimensions and speeds below this are treated as zero.
pub const MIN_REFERENCE_DIMENSION: f64 = 1.0e-5;

/// Reference area, chord, span and moment reference point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDimensions {
    /// Reference area (m²)
    pub area: f64,
    /// Reference chord (m)
    pub chord: f64,
    /// Reference span (m)
    pub span: f64,
    /// Moment reference point
    pub cog: Vec3,
}

impl ReferenceDimensions {
    /// Checks that every dimension is finite and strictly positive.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::InvalidReference`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("area", self.area),
            ("chord", self.chord),
            ("span", self.span),
        ] {
            if !(value.is_finite() && value >= MIN_REFERENCE_DIMENSION) {
                return Err(ConfigurationError::InvalidReference { name, value });
            }
        }
        if !(self.cog.x.is_finite() && self.cog.y.is_finite() && self.cog.z.is_finite()) {
            return Err(ConfigurationError::InvalidReference {
                name: "cog",
                value: self.cog.norm(),
            });
        }
        Ok(())
    }

    /// Span² / area, or 0 for a vanishing area.
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        if self.area < MIN_REFERENCE_DIMENSION {
            0.0
        } else {
            self.span * self.span / self.area
        }
    }
}

/// Force and moment totals of one operating point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AeroForces {
    /// Sum of the panel forces (N)
    pub near_force: Vec3,
    /// Moment of the panel forces about the reference point (N·m)
    pub near_moment: Vec3,
    /// Trefftz-plane force (N)
    pub far_force: Vec3,
    /// Section profile drag integrated over the span (N)
    pub profile_drag: f64,
    /// Moment of the profile drag about the reference point (N·m)
    pub viscous_moment: Vec3,
    pub fuselage_drag: f64,
    pub extra_drag: f64,
    pub reference: ReferenceDimensions,
    /// Fluid density (kg/m³)
    pub density: f64,
    /// Freestream speed (m/s)
    pub qinf: f64,
    /// Angle of attack (degrees)
    pub alpha: f64,
    /// Sideslip angle (degrees)
    pub beta: f64,
    pub wind: Frame,
    pub stability: Frame,
}

impl AeroForces {
    /// Empty record for an operating point.
    #[must_use]
    pub fn new(
        reference: ReferenceDimensions,
        density: f64,
        qinf: f64,
        alpha: f64,
        beta: f64,
    ) -> Self {
        Self {
            near_force: Vec3::zeros(),
            near_moment: Vec3::zeros(),
            far_force: Vec3::zeros(),
            profile_drag: 0.0,
            viscous_moment: Vec3::zeros(),
            fuselage_drag: 0.0,
            extra_drag: 0.0,
            reference,
            density,
            qinf,
            alpha,
            beta,
            wind: Frame::wind(alpha, beta),
            stability: Frame::stability(alpha),
        }
    }

    /// Dynamic pressure `½ρQ∞²` (Pa)
    #[must_use]
    pub fn dynamic_pressure(&self) -> f64 {
        0.5 * self.density * self.qinf * self.qinf
    }

    /// `value / (q S length)`, or 0 when any factor is below the minimum.
    fn coefficient(&self, value: f64, length: f64) -> f64 {
        let q = self.dynamic_pressure();
        if self.qinf < MIN_REFERENCE_DIMENSION
            || q < MIN_REFERENCE_DIMENSION
            || self.reference.area < MIN_REFERENCE_DIMENSION
            || length < MIN_REFERENCE_DIMENSION
        {
            return 0.0;
        }
        value / (q * self.reference.area * length)
    }

    /// Total moment about the reference point, viscous drag included.
    #[must_use]
    pub fn total_moment(&self) -> Vec3 {
        self.near_moment + self.viscous_moment
    }

    /// Viscous drag of every source (N)
    #[must_use]
    pub fn viscous_drag(&self) -> f64 {
        self.profile_drag + self.fuselage_drag + self.extra_drag
    }

    /// Lift coefficient from the panel forces.
    #[must_use]
    pub fn cl(&self) -> f64 {
        self.coefficient(self.near_force.dot(&self.wind.k), 1.0)
    }

    /// Side force coefficient.
    #[must_use]
    pub fn cy(&self) -> f64 {
        self.coefficient(self.near_force.dot(&self.wind.j), 1.0)
    }

    /// Lift coefficient from the Trefftz plane.
    #[must_use]
    pub fn cl_far(&self) -> f64 {
        self.coefficient(self.far_force.dot(&self.wind.k), 1.0)
    }

    /// Induced drag coefficient from the Trefftz plane.
    #[must_use]
    pub fn icd(&self) -> f64 {
        self.coefficient(self.far_force.dot(&self.wind.i), 1.0)
    }

    /// Viscous drag coefficient.
    #[must_use]
    pub fn pcd(&self) -> f64 {
        self.coefficient(self.viscous_drag(), 1.0)
    }

    #[must_use]
    pub fn cd(&self) -> f64 {
        self.icd() + self.pcd()
    }

    /// Pitching moment coefficient about the reference point.
    #[must_use]
    pub fn cm(&self) -> f64 {
        self.coefficient(self.total_moment().dot(&self.stability.j), self.reference.chord)
    }

    /// Rolling moment coefficient.
    #[must_use]
    pub fn croll(&self) -> f64 {
        self.coefficient(self.total_moment().dot(&self.stability.i), self.reference.span)
    }

    /// Yawing moment coefficient.
    #[must_use]
    pub fn cn(&self) -> f64 {
        self.coefficient(self.total_moment().dot(&self.stability.k), self.reference.span)
    }

    /// Span efficiency `CL² / (π AR ICd)`, or 0 without induced drag.
    #[must_use]
    pub fn oswald_efficiency(&self) -> f64 {
        let icd = self.icd();
        let aspect_ratio = self.reference.aspect_ratio();
        if icd.abs() < f64::EPSILON || aspect_ratio < MIN_REFERENCE_DIMENSION {
            return 0.0;
        }
        let cl = self.cl();
        cl * cl / (PI * aspect_ratio * icd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference() -> ReferenceDimensions {
        ReferenceDimensions {
            area: 2.0,
            chord: 0.5,
            span: 4.0,
            cog: Vec3::zeros(),
        }
    }

    #[test]
    fn test_lift_coefficient_uses_wind_normal() {
        let mut forces = AeroForces::new(reference(), 1.0, 10.0, 0.0, 0.0);
        forces.near_force = Vec3::new(3.0, 0.0, 50.0);
        // q S = 50 · 2
        assert_relative_eq!(forces.cl(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(forces.cy(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_drag_sums_induced_and_viscous() {
        let mut forces = AeroForces::new(reference(), 1.0, 10.0, 0.0, 0.0);
        forces.far_force = Vec3::new(2.0, 0.0, 0.0);
        forces.profile_drag = 1.0;
        forces.extra_drag = 1.0;
        assert_relative_eq!(forces.icd(), 0.02, epsilon = 1e-12);
        assert_relative_eq!(forces.pcd(), 0.02, epsilon = 1e-12);
        assert_relative_eq!(forces.cd(), 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_moment_coefficients_use_their_length() {
        let mut forces = AeroForces::new(reference(), 1.0, 10.0, 0.0, 0.0);
        forces.near_moment = Vec3::new(40.0, 10.0, -20.0);
        assert_relative_eq!(forces.cm(), 0.2, epsilon = 1e-12);
        assert_relative_eq!(forces.croll(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(forces.cn(), -0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_reference_gives_zero_coefficients() {
        let mut zero = reference();
        zero.area = 0.0;
        zero.chord = 0.0;
        let mut forces = AeroForces::new(zero, 1.0, 10.0, 5.0, 0.0);
        forces.near_force = Vec3::new(1.0, 1.0, 1.0);
        forces.near_moment = Vec3::new(1.0, 1.0, 1.0);
        forces.far_force = Vec3::new(1.0, 0.0, 0.0);
        for value in [
            forces.cl(),
            forces.cd(),
            forces.cm(),
            forces.cn(),
            forces.oswald_efficiency(),
        ] {
            assert!(value == 0.0, "Expected zero coefficient, got {}", value);
        }

        let still = AeroForces::new(reference(), 1.0, 0.0, 5.0, 0.0);
        assert!(still.cl() == 0.0);
    }

    #[test]
    fn test_reference_validation() {
        assert!(reference().validate().is_ok());
        let mut bad = reference();
        bad.span = -1.0;
        assert!(matches!(
            bad.validate(),
            Err(ConfigurationError::InvalidReference { name: "span", .. })
        ));
        bad.span = f64::NAN;
        assert!(bad.validate().is_err());
    }
}
