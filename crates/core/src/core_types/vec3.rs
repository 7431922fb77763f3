//! Vector type alias and aerodynamic axis helpers.
//!
//! Body axes follow the usual panel-code convention: x points downstream,
//! y to the right wing tip and z up. Angles are passed in degrees.

use nalgebra::{Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};

/// 3D vector type for positions, velocities and force vectors.
///
/// Double precision is used throughout: influence coefficients of distant
/// panels are several orders of magnitude below the self terms.
pub type Vec3 = Vector3<f64>;

/// Unit freestream direction for an angle of attack and a sideslip angle.
#[must_use]
pub fn wind_direction(alpha_deg: f64, beta_deg: f64) -> Vec3 {
    let (sa, ca) = alpha_deg.to_radians().sin_cos();
    let (sb, cb) = (-beta_deg).to_radians().sin_cos();
    Vec3::new(ca * cb, sb, sa * cb)
}

/// Unit lift direction, normal to the freestream in the symmetry plane.
#[must_use]
pub fn wind_normal(alpha_deg: f64, _beta_deg: f64) -> Vec3 {
    let (sa, ca) = alpha_deg.to_radians().sin_cos();
    Vec3::new(-sa, 0.0, ca)
}

/// Unit side-force direction.
#[must_use]
pub fn wind_side(alpha_deg: f64, beta_deg: f64) -> Vec3 {
    let (sa, ca) = alpha_deg.to_radians().sin_cos();
    let (sb, cb) = (-beta_deg).to_radians().sin_cos();
    Vec3::new(-ca * sb, cb, -sa * sb)
}

/// Rotates `point` by `angle_deg` about the line through `centre` along `axis`.
///
/// A zero-length axis leaves the point unchanged.
#[must_use]
pub fn rotate_about(point: &Vec3, centre: &Vec3, axis: &Vec3, angle_deg: f64) -> Vec3 {
    match Unit::try_new(*axis, 1.0e-12) {
        Some(unit_axis) => {
            let rotation = Rotation3::from_axis_angle(&unit_axis, angle_deg.to_radians());
            centre + rotation * (point - centre)
        }
        None => *point,
    }
}

/// Orthonormal frame, stored as its three unit axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub i: Vec3,
    pub j: Vec3,
    pub k: Vec3,
}

impl Frame {
    /// Wind axes: i along the freestream, k along the lift direction.
    #[must_use]
    pub fn wind(alpha_deg: f64, beta_deg: f64) -> Self {
        Self {
            i: wind_direction(alpha_deg, beta_deg),
            j: wind_side(alpha_deg, beta_deg),
            k: wind_normal(alpha_deg, beta_deg),
        }
    }

    /// Stability axes: body axes rotated by the angle of attack only.
    #[must_use]
    pub fn stability(alpha_deg: f64) -> Self {
        let (sa, ca) = alpha_deg.to_radians().sin_cos();
        Self {
            i: Vec3::new(ca, 0.0, sa),
            j: Vec3::new(0.0, 1.0, 0.0),
            k: Vec3::new(-sa, 0.0, ca),
        }
    }

    /// Components of a global vector in this frame.
    #[must_use]
    pub fn to_local(&self, v: &Vec3) -> Vec3 {
        Vec3::new(v.dot(&self.i), v.dot(&self.j), v.dot(&self.k))
    }
}
