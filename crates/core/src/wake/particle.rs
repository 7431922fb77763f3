//! Free wake: release rings followed by vortex particles.
//!
//! Each step releases one row of vortons from the release rings. The left
//! and right legs of the ring that would continue column `c` become two
//! vortons half a step downstream of the ring's trailing edge:
//!
//! ```text
//! ω_left  =  Γ_c · dl · d_A       at A1 + d_A · dl/2
//! ω_right = -Γ_c · dl · d_B       at B1 + d_B · dl/2
//! ```
//!
//! where `Γ_c = 4π μ_c`. Neighbouring columns share legs, so coincident
//! vortons are merged and carry the spanwise circulation jump. A negating
//! vortex of circulation `-Γ_c` on each release ring trailing edge closes the
//! ring system.

use super::flat::WakeColumn;
use super::vorton::{NegatingVortex, Vorton, VortonRow};
use crate::config::WakeConfig;
use crate::core_types::Vec3;
use crate::geometry::WakeColumnSpec;
use crate::solver::kernels::KernelSettings;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Vortons closer than this fraction of the release step are merged.
pub const VORTON_MERGE_DISTANCE: f64 = 1.0e-6;

/// Vortex-particle wake state for one operating point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleWake {
    /// One release ring per column.
    pub release: Vec<WakeColumn>,
    /// Newest row first.
    rows: Vec<VortonRow>,
    negating: Vec<NegatingVortex>,
    step_length: f64,
    core_size: f64,
    max_length: f64,
}

impl ParticleWake {
    /// Builds the release rings, without any vortons yet.
    ///
    /// # Arguments
    ///
    /// * `specs` - Wake column topology from the mesh
    /// * `lines` - Shedding line of each column
    /// * `direction` - Unit freestream direction
    /// * `config` - Step, core and truncation lengths, in reference chords
    /// * `ref_chord` - Reference chord (m)
    #[must_use]
    pub fn new(
        specs: &[WakeColumnSpec],
        lines: &[(Vec3, Vec3)],
        direction: &Vec3,
        config: &WakeConfig,
        ref_chord: f64,
    ) -> Self {
        let step_length = config.first_panel_length * ref_chord;
        let release = specs
            .iter()
            .zip(lines)
            .enumerate()
            .map(|(station, (spec, line))| {
                WakeColumn::new(station, spec, *line, direction, &[step_length])
            })
            .collect();
        Self {
            release,
            rows: Vec::new(),
            negating: Vec::new(),
            step_length,
            core_size: config.vorton_core_size * ref_chord,
            max_length: config.vorton_max_length * ref_chord,
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[VortonRow] {
        &self.rows
    }

    #[must_use]
    pub fn negating(&self) -> &[NegatingVortex] {
        &self.negating
    }

    /// Release step length (m).
    #[must_use]
    pub fn step_length(&self) -> f64 {
        self.step_length
    }

    /// Vorton mollification radius (m).
    #[must_use]
    pub fn core_size(&self) -> f64 {
        self.core_size
    }

    /// Truncation distance from the release point (m).
    #[must_use]
    pub fn max_length(&self) -> f64 {
        self.max_length
    }

    #[must_use]
    pub fn n_active(&self) -> usize {
        self.rows.iter().map(|r| r.active().count()).sum()
    }

    /// Builds the row and negating vortices for the column strengths `μ_c`.
    #[must_use]
    pub fn make_row(&self, strengths: &[f64]) -> (VortonRow, Vec<NegatingVortex>) {
        let merge_distance = VORTON_MERGE_DISTANCE * self.step_length;
        let mut vortons: Vec<Vorton> = Vec::with_capacity(2 * self.release.len());
        let mut negating = Vec::with_capacity(self.release.len());

        for (column, &strength) in self.release.iter().zip(strengths) {
            let Some(ring) = column.panels.first() else {
                continue;
            };
            let [a0, a1, b1, b0] = ring.geom.corners;
            let circulation = 4.0 * PI * strength;
            let dir_a = (a1 - a0).normalize();
            let dir_b = (b1 - b0).normalize();
            let half = 0.5 * self.step_length;

            for (position, omega) in [
                (a1 + dir_a * half, dir_a * (circulation * self.step_length)),
                (b1 + dir_b * half, dir_b * (-circulation * self.step_length)),
            ] {
                match vortons
                    .iter_mut()
                    .find(|v| (v.position - position).norm() < merge_distance)
                {
                    Some(existing) => existing.omega += omega,
                    None => vortons.push(Vorton::new(position, omega)),
                }
            }

            negating.push(NegatingVortex {
                a: a1,
                b: b1,
                circulation: -circulation,
            });
        }

        for vorton in &mut vortons {
            vorton.attributes = vec![vorton.omega.norm()];
        }
        (VortonRow { vortons }, negating)
    }

    /// Prepends a new row and replaces the negating vortices.
    pub fn release_row(&mut self, strengths: &[f64]) {
        let (row, negating) = self.make_row(strengths);
        self.rows.insert(0, row);
        self.negating = negating;
    }

    /// Publishes an advected set of rows and drops exhausted old rows.
    pub fn publish_rows(&mut self, mut rows: Vec<VortonRow>) {
        std::mem::swap(&mut self.rows, &mut rows);
        while self.rows.last().is_some_and(|row| !row.has_active()) {
            self.rows.pop();
        }
    }

    /// Velocity induced by the active vortons.
    #[must_use]
    pub fn vorton_velocity(&self, point: &Vec3, settings: &KernelSettings) -> Vec3 {
        settings.with_mirror(point, |p| {
            self.rows
                .iter()
                .flat_map(VortonRow::active)
                .map(|v| v.velocity_at(p, self.core_size))
                .sum()
        })
    }

    /// Velocity induced by the negating vortices.
    #[must_use]
    pub fn negating_velocity(&self, point: &Vec3, settings: &KernelSettings) -> Vec3 {
        settings.with_mirror(point, |p| {
            self.negating
                .iter()
                .map(|n| n.velocity_at(p, settings.core_radius))
                .sum()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn three_columns() -> ParticleWake {
        let specs: Vec<WakeColumnSpec> = (0..3)
            .map(|c| WakeColumnSpec {
                shedding: vec![(c, 1.0)],
                node_a: c,
                node_b: c + 1,
            })
            .collect();
        let lines: Vec<(Vec3, Vec3)> = (0..3_u32)
            .map(|c| {
                (
                    Vec3::new(1.0, f64::from(c), 0.0),
                    Vec3::new(1.0, f64::from(c + 1), 0.0),
                )
            })
            .collect();
        let config = WakeConfig {
            first_panel_length: 0.25,
            ..WakeConfig::default()
        };
        ParticleWake::new(&specs, &lines, &Vec3::x(), &config, 1.0)
    }

    #[test]
    fn test_row_merges_shared_legs() {
        let wake = three_columns();
        let (row, negating) = wake.make_row(&[1.0, 1.0, 1.0]);

        assert_eq!(row.vortons.len(), 4);
        assert_eq!(negating.len(), 3);
        // Uniform loading leaves only the tip vortons
        assert_abs_diff_eq!(row.vortons[1].omega.norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(
            row.vortons[0].position,
            Vec3::new(1.375, 0.0, 0.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(row.vortons[0].omega.x, 4.0 * PI * 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_release_line_circulation_cancels() {
        let wake = three_columns();
        let strengths = [0.4, 1.0, 0.7];
        let (row, negating) = wake.make_row(&strengths);

        for ((column, segment), strength) in wake.release.iter().zip(&negating).zip(strengths) {
            let [_, a1, b1, _] = column.panels[0].geom.corners;
            let bound = (b1 - a1) * (4.0 * PI * strength);
            assert_relative_eq!(bound + segment.omega(), Vec3::zeros(), epsilon = 1e-12);
        }

        // Trailing circulation shed by the row telescopes to zero
        let shed: Vec3 = row.vortons.iter().map(|v| v.omega).sum();
        assert_abs_diff_eq!(shed.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rows_are_prepended_and_retired() {
        let mut wake = three_columns();
        wake.release_row(&[1.0, 1.0, 1.0]);
        wake.release_row(&[2.0, 2.0, 2.0]);
        assert_eq!(wake.rows().len(), 2);
        assert!(wake.rows()[0].vortons[0].omega.x > wake.rows()[1].vortons[0].omega.x);

        let mut rows = wake.rows().to_vec();
        for vorton in &mut rows[1].vortons {
            vorton.deactivate();
        }
        wake.publish_rows(rows);
        assert_eq!(wake.rows().len(), 1);
        assert_eq!(wake.n_active(), 4);
    }
}
