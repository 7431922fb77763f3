//! Near-field and far-field force integration.
//!
//! The near field sums the panel forces. The far field evaluates each wake
//! column as a horseshoe in the Trefftz plane:
//!
//! ```text
//! W_c  = ½ Σ_k μ_k [v(a_k, a_k + D i) + v(b_k + D i, b_k)]   at m_c + (D/2) i
//! F_c  = ρ 4π μ_c ((V∞ + W_c) × (a_c - b_c))
//! ```
//!
//! Halving the velocity at mid-length of the legs gives the downwash on the
//! lifting line.

use super::aero_forces::AeroForces;
use super::span::{SpanDistribs, StationLoad, StationViscous};
use crate::config::FluidConfig;
use crate::core_types::{Frame, Vec3};
use crate::geometry::{PanelMesh, StripGeometry};
use crate::solver::kernels::{segment_velocity, KernelSettings};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Force, application point and pressure coefficient of every panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelLoads {
    pub forces: Vec<Vec3>,
    pub points: Vec<Vec3>,
    pub cp: Vec<f64>,
}

impl PanelLoads {
    #[must_use]
    pub fn with_capacity(n: usize) -> Self {
        Self {
            forces: Vec::with_capacity(n),
            points: Vec::with_capacity(n),
            cp: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, force: Vec3, point: Vec3, cp: f64) {
        self.forces.push(force);
        self.points.push(point);
        self.cp.push(cp);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.forces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    #[must_use]
    pub fn total_force(&self) -> Vec3 {
        self.forces.iter().sum()
    }

    /// Moment of the panel forces about `centre`.
    #[must_use]
    pub fn moment_about(&self, centre: &Vec3) -> Vec3 {
        self.forces
            .iter()
            .zip(&self.points)
            .map(|(force, point)| (point - centre).cross(force))
            .sum()
    }

    /// Force and moment of a subset of panels.
    #[must_use]
    pub fn subset(&self, panels: &[usize], centre: &Vec3) -> (Vec3, Vec3) {
        panels.iter().fold(
            (Vec3::zeros(), Vec3::zeros()),
            |(force, moment), &index| {
                let f = self.forces[index];
                (force + f, moment + (self.points[index] - centre).cross(&f))
            },
        )
    }
}

/// Far-field state of one wake column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrefftzStation {
    /// Column circulation `4πμ` (m²/s)
    pub circulation: f64,
    pub downwash: Vec3,
    pub force: Vec3,
    /// Induced angle (degrees)
    pub induced_angle: f64,
}

/// Evaluates every column as a horseshoe of leg length `distance`.
///
/// # Arguments
///
/// * `lines` - Shedding line `(a, b)` of each column
/// * `strengths` - Column doublet strengths
/// * `wind` - Wind axes of the operating point
/// * `qinf` - Freestream speed (m/s)
/// * `density` - Fluid density (kg/m³)
/// * `distance` - Trailing leg length (m)
/// * `settings` - Core radius and mirror plane
#[must_use]
pub fn trefftz_plane(
    lines: &[(Vec3, Vec3)],
    strengths: &[f64],
    wind: &Frame,
    qinf: f64,
    density: f64,
    distance: f64,
    settings: &KernelSettings,
) -> Vec<TrefftzStation> {
    let legs = wind.i * distance;
    let freestream = wind.i * qinf;
    let legs_velocity = |point: &Vec3| {
        lines
            .iter()
            .zip(strengths)
            .fold(Vec3::zeros(), |acc, ((a, b), &mu)| {
                let left = segment_velocity(a, &(a + legs), point, settings.core_radius);
                let right = segment_velocity(&(b + legs), b, point, settings.core_radius);
                acc + (left + right) * mu
            })
    };

    lines
        .iter()
        .zip(strengths)
        .map(|((a, b), &mu)| {
            let point = (a + b) * 0.5 + legs * 0.5;
            let downwash = settings.with_mirror(&point, &legs_velocity) * 0.5;
            let circulation = 4.0 * PI * mu;
            let force = (freestream + downwash).cross(&(a - b)) * (density * circulation);
            TrefftzStation {
                circulation,
                downwash,
                force,
                induced_angle: downwash.dot(&wind.k).atan2(qinf).to_degrees(),
            }
        })
        .collect()
}

/// Profile drag force and its moment about `cog`, from the station drag
/// coefficients at the strip quarter chords.
#[must_use]
pub fn profile_drag(
    strips: &[StripGeometry],
    viscous: &[StationViscous],
    wind: &Frame,
    dynamic_pressure: f64,
    cog: &Vec3,
) -> (f64, Vec3) {
    strips
        .iter()
        .zip(viscous)
        .fold((0.0, Vec3::zeros()), |(drag, moment), (strip, state)| {
            let station_drag = dynamic_pressure * state.cd * strip.area;
            let lever = strip.quarter_chord() - cog;
            (drag + station_drag, moment + lever.cross(&(wind.i * station_drag)))
        })
}

/// Fills the totals of `forces` from the panel loads, the Trefftz stations
/// and the viscous station state.
pub fn integrate_totals(
    loads: &PanelLoads,
    trefftz: &[TrefftzStation],
    strips: &[StripGeometry],
    viscous: Option<&[StationViscous]>,
    fluid: &FluidConfig,
    forces: &mut AeroForces,
) {
    let cog = forces.reference.cog;
    let q = forces.dynamic_pressure();
    forces.near_force = loads.total_force();
    forces.near_moment = loads.moment_about(&cog);
    forces.far_force = trefftz.iter().map(|s| s.force).sum();
    if let Some(viscous) = viscous {
        let (drag, moment) = profile_drag(strips, viscous, &forces.wind, q, &cog);
        forces.profile_drag = drag;
        forces.viscous_moment = moment;
    }
    forces.fuselage_drag = q * fluid.fuselage_drag_area;
    forces.extra_drag = q * fluid.extra_drag_area;
}

/// Per-station distributions of the inviscid loads.
#[must_use]
pub fn span_distribs(
    mesh: &PanelMesh,
    loads: &PanelLoads,
    trefftz: &[TrefftzStation],
    forces: &AeroForces,
) -> SpanDistribs {
    let q = forces.dynamic_pressure();
    let ratio = |value: f64, scale: f64| {
        if q * scale > 0.0 {
            value / (q * scale)
        } else {
            0.0
        }
    };

    let strips = mesh.strip_geometry();
    let lifts: Vec<f64> = (0..mesh.n_stations())
        .map(|station| {
            let (force, _) = loads.subset(mesh.strip_panels(station), &Vec3::zeros());
            force.dot(&forces.wind.k)
        })
        .collect();

    let stations = strips
        .iter()
        .zip(trefftz)
        .enumerate()
        .map(|(station, (strip, far))| {
            let (force, moment) =
                loads.subset(mesh.strip_panels(station), &strip.quarter_chord());
            let bending_moment = strips
                .iter()
                .zip(&lifts)
                .filter(|(other, _)| {
                    (strip.span_pos >= 0.0 && other.span_pos > strip.span_pos)
                        || (strip.span_pos < 0.0 && other.span_pos < strip.span_pos)
                })
                .map(|(other, lift)| lift * (other.span_pos - strip.span_pos).abs())
                .sum();
            StationLoad {
                span_pos: strip.span_pos,
                chord: strip.chord,
                area: strip.area,
                cl: ratio(force.dot(&forces.wind.k), strip.area),
                icd: ratio(far.force.dot(&forces.wind.i), strip.area),
                pcd: 0.0,
                cm: ratio(moment.dot(&forces.stability.j), strip.area * strip.chord),
                bending_moment,
                induced_angle: far.induced_angle,
                circulation: far.circulation,
                downwash: far.downwash,
                force: far.force,
                reynolds: 0.0,
                virtual_twist: 0.0,
                alpha0: 0.0,
                transition_top: 1.0,
                transition_bottom: 1.0,
                out_of_range: false,
            }
        })
        .collect();
    SpanDistribs { stations }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn settings() -> KernelSettings {
        KernelSettings {
            far_field_factor: 7.0,
            core_radius: 1.0e-9,
            vorton_core: 0.1,
            mirror: None,
        }
    }

    #[test]
    fn test_panel_loads_moment() {
        let mut loads = PanelLoads::with_capacity(2);
        loads.push(Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0), 0.0);
        loads.push(Vec3::new(0.0, 0.0, 1.0), Vec3::new(-1.0, 2.0, 0.0), 0.0);

        assert_relative_eq!(loads.total_force(), Vec3::new(0.0, 0.0, 2.0));
        // r × F: (1,0,0)×(0,0,1) + (-1,2,0)×(0,0,1)
        assert_relative_eq!(
            loads.moment_about(&Vec3::zeros()),
            Vec3::new(2.0, 0.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_single_horseshoe_downwash_and_forces() {
        let lines = [(Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0))];
        let wind = Frame::wind(0.0, 0.0);
        let stations = trefftz_plane(&lines, &[-1.0], &wind, 10.0, 1.0, 1.0e4, &settings());
        let station = stations[0];

        // Γ / (π w) with Γ = -4π, w = 2; the legs end 1e4 m downstream
        assert_relative_eq!(station.downwash.z, -2.0, max_relative = 1e-6);
        // Lift ρ Γ Q w and drag ρ Γ w_i w
        assert_relative_eq!(station.force.z, 80.0 * PI, max_relative = 1e-6);
        assert_relative_eq!(station.force.x, 16.0 * PI, max_relative = 1e-6);
        assert!(station.induced_angle < 0.0);
    }

    #[test]
    fn test_ground_mirror_reduces_downwash() {
        let lines = [(Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0))];
        let wind = Frame::wind(0.0, 0.0);
        let free = trefftz_plane(&lines, &[-1.0], &wind, 10.0, 1.0, 1.0e4, &settings());
        let mut near_ground = settings();
        near_ground.mirror = Some((0.5, 1.0));
        let ground = trefftz_plane(&lines, &[-1.0], &wind, 10.0, 1.0, 1.0e4, &near_ground);

        assert!(
            ground[0].downwash.z.abs() < free[0].downwash.z.abs(),
            "Ground downwash {} should be below free {}",
            ground[0].downwash.z,
            free[0].downwash.z
        );
    }

    #[test]
    fn test_profile_drag_along_wind() {
        let strip = StripGeometry {
            span_pos: 2.0,
            chord: 1.0,
            area: 0.5,
            leading_mid: Vec3::new(0.0, 2.0, 0.0),
            trailing_mid: Vec3::new(1.0, 2.0, 0.0),
            width: 0.5,
        };
        let state = StationViscous {
            cd: 0.02,
            ..StationViscous::default()
        };
        let wind = Frame::wind(0.0, 0.0);
        let (drag, moment) = profile_drag(&[strip], &[state], &wind, 100.0, &Vec3::zeros());

        assert_relative_eq!(drag, 1.0, epsilon = 1e-12);
        // Drag at y = 2 yaws the nose towards that side
        assert_relative_eq!(moment, Vec3::new(0.0, 0.0, -2.0), epsilon = 1e-12);
    }
}
