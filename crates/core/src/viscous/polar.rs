//! Section polar interface and two in-crate providers.
//!
//! The analysis only consumes polars: a lookup by angle of attack or by lift
//! coefficient at a given Reynolds number. Angles are in degrees.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

/// Section data at one angle of attack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarPoint {
    pub alpha: f64,
    pub cl: f64,
    pub cd: f64,
    pub cm: f64,
    /// Upper side transition, as a chord fraction.
    pub xtr_top: f64,
    pub xtr_bottom: f64,
}

impl PolarPoint {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Self {
            alpha: mix(self.alpha, other.alpha),
            cl: mix(self.cl, other.cl),
            cd: mix(self.cd, other.cd),
            cm: mix(self.cm, other.cm),
            xtr_top: mix(self.xtr_top, other.xtr_top),
            xtr_bottom: mix(self.xtr_bottom, other.xtr_bottom),
        }
    }
}

/// Lookup outside the range of the section data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolarLookupError {
    #[error("Reynolds number {re:.0} outside [{min:.0}, {max:.0}]")]
    ReynoldsOutOfRange { re: f64, min: f64, max: f64 },

    #[error("angle of attack {alpha:.3}° outside [{min:.3}°, {max:.3}°]")]
    AlphaOutOfRange { alpha: f64, min: f64, max: f64 },

    #[error("lift coefficient {cl:.4} not reached by the polar")]
    LiftOutOfRange { cl: f64 },

    #[error("no polar data")]
    Empty,
}

/// Provider of 2D viscous section data per span station.
pub trait ViscousPolar: Send + Sync {
    /// Zero-lift angle (degrees) of the section at `station`.
    fn zero_lift_angle(&self, station: usize, re: f64) -> f64;

    /// Section data at an angle of attack (degrees).
    ///
    /// # Errors
    ///
    /// A [`PolarLookupError`] when `re` or `alpha` is outside the data.
    fn at_alpha(
        &self,
        station: usize,
        re: f64,
        alpha: f64,
    ) -> Result<PolarPoint, PolarLookupError>;

    /// Section data at a lift coefficient.
    ///
    /// # Errors
    ///
    /// A [`PolarLookupError`] when `re` or `cl` is outside the data.
    fn at_cl(&self, station: usize, re: f64, cl: f64) -> Result<PolarPoint, PolarLookupError>;
}

/// Analytic section: linear lift up to a stall limit, parabolic drag.
///
/// ```text
/// Cl = a (α - α0)          α_min ≤ α ≤ α_max
/// Cd = Cd0 + k Cl²
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearPolar {
    /// Lift slope (1/rad)
    pub slope: f64,
    /// Zero-lift angle (degrees)
    pub alpha0: f64,
    pub alpha_min: f64,
    pub alpha_max: f64,
    pub cd0: f64,
    pub k: f64,
    pub cm0: f64,
    pub re_min: f64,
    pub re_max: f64,
    pub xtr_top: f64,
    pub xtr_bottom: f64,
}

impl Default for LinearPolar {
    fn default() -> Self {
        Self {
            slope: 2.0 * PI,
            alpha0: 0.0,
            alpha_min: -12.0,
            alpha_max: 12.0,
            cd0: 0.008,
            k: 0.01,
            cm0: 0.0,
            re_min: 0.0,
            re_max: f64::INFINITY,
            xtr_top: 1.0,
            xtr_bottom: 1.0,
        }
    }
}

impl LinearPolar {
    /// Thin-airfoil section with the given slope factor on `2π`.
    #[must_use]
    pub fn with_slope_factor(factor: f64) -> Self {
        Self {
            slope: 2.0 * PI * factor,
            ..Self::default()
        }
    }

    /// Restricts the valid angle range (degrees).
    #[must_use]
    pub fn with_alpha_range(mut self, min: f64, max: f64) -> Self {
        self.alpha_min = min;
        self.alpha_max = max;
        self
    }

    fn check_re(&self, re: f64) -> Result<(), PolarLookupError> {
        if re < self.re_min || re > self.re_max {
            return Err(PolarLookupError::ReynoldsOutOfRange {
                re,
                min: self.re_min,
                max: self.re_max,
            });
        }
        Ok(())
    }

    fn point(&self, alpha: f64) -> Result<PolarPoint, PolarLookupError> {
        if !(alpha >= self.alpha_min && alpha <= self.alpha_max) {
            return Err(PolarLookupError::AlphaOutOfRange {
                alpha,
                min: self.alpha_min,
                max: self.alpha_max,
            });
        }
        let cl = self.slope * (alpha - self.alpha0).to_radians();
        Ok(PolarPoint {
            alpha,
            cl,
            cd: self.cd0 + self.k * cl * cl,
            cm: self.cm0,
            xtr_top: self.xtr_top,
            xtr_bottom: self.xtr_bottom,
        })
    }
}

impl ViscousPolar for LinearPolar {
    fn zero_lift_angle(&self, _station: usize, _re: f64) -> f64 {
        self.alpha0
    }

    fn at_alpha(
        &self,
        _station: usize,
        re: f64,
        alpha: f64,
    ) -> Result<PolarPoint, PolarLookupError> {
        self.check_re(re)?;
        self.point(alpha)
    }

    fn at_cl(&self, _station: usize, re: f64, cl: f64) -> Result<PolarPoint, PolarLookupError> {
        self.check_re(re)?;
        if self.slope.abs() < f64::EPSILON {
            return Err(PolarLookupError::LiftOutOfRange { cl });
        }
        self.point(self.alpha0 + (cl / self.slope).to_degrees())
            .map_err(|_| PolarLookupError::LiftOutOfRange { cl })
    }
}

/// Polar curve at one Reynolds number, sorted by angle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReynoldsTable {
    pub re: f64,
    pub points: Vec<PolarPoint>,
}

impl ReynoldsTable {
    fn at_alpha(&self, alpha: f64) -> Result<PolarPoint, PolarLookupError> {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(PolarLookupError::Empty),
        };
        if !(alpha >= first.alpha && alpha <= last.alpha) {
            return Err(PolarLookupError::AlphaOutOfRange {
                alpha,
                min: first.alpha,
                max: last.alpha,
            });
        }
        for pair in self.points.windows(2) {
            let (lo, hi) = (&pair[0], &pair[1]);
            if alpha <= hi.alpha {
                let span = hi.alpha - lo.alpha;
                let t = if span > 0.0 { (alpha - lo.alpha) / span } else { 0.0 };
                return Ok(lo.lerp(hi, t));
            }
        }
        Ok(*last)
    }

    /// First bracket of `cl` from the lowest angle up.
    fn alpha_at_cl(&self, cl: f64) -> Result<f64, PolarLookupError> {
        if self.points.len() == 1 && (self.points[0].cl - cl).abs() < f64::EPSILON {
            return Ok(self.points[0].alpha);
        }
        for pair in self.points.windows(2) {
            let (lo, hi) = (&pair[0], &pair[1]);
            let (min, max) = (lo.cl.min(hi.cl), lo.cl.max(hi.cl));
            if cl >= min && cl <= max {
                let span = hi.cl - lo.cl;
                let t = if span.abs() > 0.0 { (cl - lo.cl) / span } else { 0.0 };
                return Ok(lo.alpha + t * (hi.alpha - lo.alpha));
            }
        }
        Err(PolarLookupError::LiftOutOfRange { cl })
    }
}

/// Tabulated section data, shared by every station, interpolated linearly
/// in angle and in Reynolds number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabulatedPolar {
    tables: Vec<ReynoldsTable>,
}

impl TabulatedPolar {
    /// Sorts the tables by Reynolds number and their points by angle.
    #[must_use]
    pub fn new(mut tables: Vec<ReynoldsTable>) -> Self {
        tables.retain(|table| !table.points.is_empty());
        for table in &mut tables {
            table.points.sort_by(|a, b| a.alpha.total_cmp(&b.alpha));
        }
        tables.sort_by(|a, b| a.re.total_cmp(&b.re));
        Self { tables }
    }

    /// Bracketing tables and the interpolation weight of the upper one.
    fn bracket(
        &self,
        re: f64,
    ) -> Result<(&ReynoldsTable, &ReynoldsTable, f64), PolarLookupError> {
        let (first, last) = match (self.tables.first(), self.tables.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(PolarLookupError::Empty),
        };
        if self.tables.len() == 1 {
            return Ok((first, first, 0.0));
        }
        if !(re >= first.re && re <= last.re) {
            return Err(PolarLookupError::ReynoldsOutOfRange {
                re,
                min: first.re,
                max: last.re,
            });
        }
        for pair in self.tables.windows(2) {
            let (lo, hi) = (&pair[0], &pair[1]);
            if re <= hi.re {
                let span = hi.re - lo.re;
                let t = if span > 0.0 { (re - lo.re) / span } else { 0.0 };
                return Ok((lo, hi, t));
            }
        }
        Ok((last, last, 0.0))
    }
}

impl ViscousPolar for TabulatedPolar {
    fn zero_lift_angle(&self, station: usize, re: f64) -> f64 {
        self.at_cl(station, re, 0.0).map_or(0.0, |point| point.alpha)
    }

    fn at_alpha(
        &self,
        _station: usize,
        re: f64,
        alpha: f64,
    ) -> Result<PolarPoint, PolarLookupError> {
        let (lo, hi, t) = self.bracket(re)?;
        let low = lo.at_alpha(alpha)?;
        let high = hi.at_alpha(alpha)?;
        Ok(low.lerp(&high, t))
    }

    fn at_cl(&self, station: usize, re: f64, cl: f64) -> Result<PolarPoint, PolarLookupError> {
        let (lo, hi, t) = self.bracket(re)?;
        let alpha = lo.alpha_at_cl(cl)? * (1.0 - t) + hi.alpha_at_cl(cl)? * t;
        self.at_alpha(station, re, alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table(re: f64, slope_per_deg: f64) -> ReynoldsTable {
        let points = (-4..=8)
            .map(|a| {
                let alpha = f64::from(a);
                let cl = slope_per_deg * (alpha + 2.0);
                PolarPoint {
                    alpha,
                    cl,
                    cd: 0.01 + 0.01 * cl * cl,
                    cm: -0.05,
                    xtr_top: 0.5,
                    xtr_bottom: 0.8,
                }
            })
            .collect();
        ReynoldsTable { re, points }
    }

    #[test]
    fn test_linear_polar_slope() {
        let polar = LinearPolar::default();
        let point = polar.at_alpha(0, 1.0e6, 5.0).unwrap();
        assert_relative_eq!(point.cl, 2.0 * PI * 5.0_f64.to_radians(), epsilon = 1e-12);

        let back = polar.at_cl(0, 1.0e6, point.cl).unwrap();
        assert_relative_eq!(back.alpha, 5.0, epsilon = 1e-10);
    }

    #[test]
    fn test_linear_polar_range() {
        let polar = LinearPolar::default().with_alpha_range(-1.0, 1.0);
        assert!(matches!(
            polar.at_alpha(0, 1.0e6, 3.0),
            Err(PolarLookupError::AlphaOutOfRange { .. })
        ));
        assert!(matches!(
            polar.at_cl(0, 1.0e6, 1.0),
            Err(PolarLookupError::LiftOutOfRange { .. })
        ));
    }

    #[test]
    fn test_tabulated_interpolates_in_reynolds() {
        let polar = TabulatedPolar::new(vec![table(2.0e5, 0.1), table(1.0e6, 0.11)]);
        let point = polar.at_alpha(0, 6.0e5, 3.0).unwrap();
        // Halfway between 0.5 and 0.55
        assert_relative_eq!(point.cl, 0.525, epsilon = 1e-12);
        assert_relative_eq!(point.xtr_top, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_tabulated_zero_lift_angle() {
        let polar = TabulatedPolar::new(vec![table(2.0e5, 0.1), table(1.0e6, 0.11)]);
        assert_relative_eq!(polar.zero_lift_angle(0, 5.0e5), -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tabulated_out_of_range() {
        let polar = TabulatedPolar::new(vec![table(2.0e5, 0.1), table(1.0e6, 0.11)]);
        assert!(matches!(
            polar.at_alpha(0, 5.0e6, 2.0),
            Err(PolarLookupError::ReynoldsOutOfRange { .. })
        ));
        assert!(matches!(
            polar.at_alpha(0, 5.0e5, 20.0),
            Err(PolarLookupError::AlphaOutOfRange { .. })
        ));
        assert!(matches!(
            TabulatedPolar::new(Vec::new()).at_alpha(0, 1.0, 0.0),
            Err(PolarLookupError::Empty)
        ));
    }
}
