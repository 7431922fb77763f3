//! Rigid wake columns.
//!
//! Each wake column starts on a shedding line and runs along the freestream
//! in segments of geometrically growing length:
//!
//! ```text
//! l_k = l0 · g^k,     Σ l_k = wake length (last segment clipped)
//! ```

use crate::config::WakeConfig;
use crate::core_types::Vec3;
use crate::geometry::{QuadGeometry, WakeColumnSpec};
use crate::solver::kernels::{doublet_potential, doublet_velocity, KernelSettings};
use serde::{Deserialize, Serialize};

/// One ring of a wake column, oriented like the surface panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WakePanel {
    pub geom: QuadGeometry,
    pub column: usize,
}

/// Wake rings shed by one span station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WakeColumn {
    pub station: usize,
    /// `(panel, sign)` pairs whose signed doublets set the column strength.
    pub shedding: Vec<(usize, f64)>,
    pub panels: Vec<WakePanel>,
}

impl WakeColumn {
    /// Builds the rings from the shedding line `a → b` downstream along
    /// `direction`.
    #[must_use]
    pub fn new(
        station: usize,
        spec: &WakeColumnSpec,
        line: (Vec3, Vec3),
        direction: &Vec3,
        lengths: &[f64],
    ) -> Self {
        let (mut a, mut b) = line;
        let mut panels = Vec::with_capacity(lengths.len());
        for &length in lengths {
            let next_a = a + direction * length;
            let next_b = b + direction * length;
            panels.push(WakePanel {
                geom: QuadGeometry::new([a, next_a, next_b, b]),
                column: station,
            });
            a = next_a;
            b = next_b;
        }
        Self {
            station,
            shedding: spec.shedding.clone(),
            panels,
        }
    }

    /// Column doublet strength from the surface doublets.
    #[must_use]
    pub fn strength(&self, mu: &[f64]) -> f64 {
        self.shedding.iter().map(|&(panel, sign)| sign * mu[panel]).sum()
    }

    /// Shedding line `(a, b)` at the head of the column.
    #[must_use]
    pub fn shedding_line(&self) -> Option<(Vec3, Vec3)> {
        self.panels
            .first()
            .map(|p| (p.geom.corners[0], p.geom.corners[3]))
    }

    /// Velocity of the column at unit strength.
    #[must_use]
    pub fn unit_velocity(&self, point: &Vec3, settings: &KernelSettings) -> Vec3 {
        settings.with_mirror(point, |p| {
            self.panels.iter().fold(Vec3::zeros(), |acc, panel| {
                acc + doublet_velocity(
                    &panel.geom,
                    p,
                    settings.far_field_factor,
                    settings.core_radius,
                )
            })
        })
    }

    /// Potential of the column at unit strength.
    #[must_use]
    pub fn unit_potential(&self, point: &Vec3, settings: &KernelSettings) -> f64 {
        settings.with_mirror_potential(point, |p| {
            self.panels
                .iter()
                .map(|panel| doublet_potential(&panel.geom, p, settings.far_field_factor))
                .sum()
        })
    }
}

/// Segment lengths `l0·g^k` filling `total`, the last one clipped.
#[must_use]
pub fn segment_lengths(first: f64, growth: f64, total: f64) -> Vec<f64> {
    let mut lengths = Vec::new();
    let mut covered = 0.0;
    let mut next = first;
    while total - covered > 1.0e-9 * first {
        let length = next.min(total - covered);
        lengths.push(length);
        covered += length;
        next *= growth;
    }
    lengths
}

/// Rigid wake behind every station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatWake {
    pub columns: Vec<WakeColumn>,
}

impl FlatWake {
    /// Builds one column per shedding line.
    ///
    /// # Arguments
    ///
    /// * `specs` - Wake column topology from the mesh
    /// * `lines` - Shedding line of each column
    /// * `direction` - Unit freestream direction
    /// * `config` - Segment lengths, in reference chords
    /// * `ref_chord` - Reference chord (m)
    #[must_use]
    pub fn new(
        specs: &[WakeColumnSpec],
        lines: &[(Vec3, Vec3)],
        direction: &Vec3,
        config: &WakeConfig,
        ref_chord: f64,
    ) -> Self {
        let lengths = segment_lengths(
            config.first_panel_length * ref_chord,
            config.growth_factor,
            config.flat_wake_length * ref_chord,
        );
        let columns = specs
            .iter()
            .zip(lines)
            .enumerate()
            .map(|(station, (spec, line))| {
                WakeColumn::new(station, spec, *line, direction, &lengths)
            })
            .collect();
        Self { columns }
    }

    #[must_use]
    pub fn n_panels(&self) -> usize {
        self.columns.iter().map(|c| c.panels.len()).sum()
    }
}
