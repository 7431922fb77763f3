//! Span-wise load distributions.

use crate::core_types::Vec3;
use serde::{Deserialize, Serialize};

/// Loads and viscous state of one span station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationLoad {
    /// Spanwise coordinate of the station trailing edge (m)
    pub span_pos: f64,
    pub chord: f64,
    /// Strip area (m²)
    pub area: f64,
    pub cl: f64,
    /// Induced drag coefficient of the strip, from the Trefftz plane.
    pub icd: f64,
    /// Profile drag coefficient from the section polar.
    pub pcd: f64,
    /// Pitching moment coefficient about the strip quarter chord.
    pub cm: f64,
    /// Bending moment of the outboard lift about this station (N·m)
    pub bending_moment: f64,
    /// Induced angle (degrees)
    pub induced_angle: f64,
    /// Column circulation `4πμ` (m²/s)
    pub circulation: f64,
    /// Trefftz downwash at the station
    pub downwash: Vec3,
    /// Trefftz force of the strip (N)
    pub force: Vec3,
    pub reynolds: f64,
    /// Virtual twist from the viscous loop (degrees)
    pub virtual_twist: f64,
    /// Zero-lift angle of the section polar (degrees)
    pub alpha0: f64,
    /// Transition location on the upper side, as a chord fraction.
    pub transition_top: f64,
    pub transition_bottom: f64,
    /// Section data could not be interpolated at this station.
    pub out_of_range: bool,
}

/// Viscous state of one station, from the virtual-twist loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationViscous {
    pub reynolds: f64,
    pub virtual_twist: f64,
    pub alpha0: f64,
    pub cd: f64,
    pub transition_top: f64,
    pub transition_bottom: f64,
    pub out_of_range: bool,
}

impl Default for StationViscous {
    fn default() -> Self {
        Self {
            reynolds: 0.0,
            virtual_twist: 0.0,
            alpha0: 0.0,
            cd: 0.0,
            transition_top: 1.0,
            transition_bottom: 1.0,
            out_of_range: false,
        }
    }
}

/// One record per span station, in station order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanDistribs {
    pub stations: Vec<StationLoad>,
}

impl SpanDistribs {
    #[must_use]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Station lift coefficients.
    #[must_use]
    pub fn cl(&self) -> Vec<f64> {
        self.stations.iter().map(|s| s.cl).collect()
    }

    /// Copies the viscous results into the stations.
    pub fn apply_viscous(&mut self, viscous: &[StationViscous]) {
        for (station, state) in self.stations.iter_mut().zip(viscous) {
            station.reynolds = state.reynolds;
            station.virtual_twist = state.virtual_twist;
            station.alpha0 = state.alpha0;
            station.pcd = state.cd;
            station.transition_top = state.transition_top;
            station.transition_bottom = state.transition_bottom;
            station.out_of_range = state.out_of_range;
        }
    }

    /// Area-weighted mean of a station value.
    #[must_use]
    pub fn area_weighted(&self, value: impl Fn(&StationLoad) -> f64) -> f64 {
        let area: f64 = self.stations.iter().map(|s| s.area).sum();
        if area <= 0.0 {
            return 0.0;
        }
        self.stations.iter().map(|s| value(s) * s.area).sum::<f64>() / area
    }
}
