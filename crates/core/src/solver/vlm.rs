//! Ring vortex lattice on thin surfaces.
//!
//! Each panel carries a vortex ring from its 1/4 chord line to the 1/4 chord
//! line of the downstream panel. Behind the trailing edge the ring extends a
//! quarter panel:
//!
//! ```text
//! ring_i = [VA_i, RA_i, RB_i, VB_i]
//! RA_i   = VA_downstream                  inner panels
//!        = TA + (TA - VA) / 3             trailing panels
//! ```
//!
//! The no-penetration condition is imposed at the 3/4 chord control points.

use super::assembly::{add_wake_columns, assemble_matrix};
use super::kernels::{ring_velocity, KernelSettings};
use super::linear::LinearSystem;
use super::r#trait::AnalysisMethod;
use crate::config::MethodKind;
use crate::core_types::Vec3;
use crate::error::AeroResult;
use crate::forces::PanelLoads;
use crate::geometry::{Panel4, PanelMesh};
use crate::wake::WakeModel;
use std::f64::consts::PI;

/// Ring vortex lattice method.
#[derive(Debug, Clone, Copy, Default)]
pub struct VortexLatticeMethod;

impl VortexLatticeMethod {
    /// Vortex ring of panel `index`.
    #[must_use]
    pub fn ring(mesh: &PanelMesh, index: usize) -> [Vec3; 4] {
        let panels = mesh.panels();
        let panel = &panels[index];
        let (rear_a, rear_b) = match panel.neighbours.downstream {
            Some(next) => (panels[next].vortex_a, panels[next].vortex_b),
            None => {
                let [_, ta, tb, _] = panel.geom.corners;
                (
                    ta + (ta - panel.vortex_a) / 3.0,
                    tb + (tb - panel.vortex_b) / 3.0,
                )
            }
        };
        [panel.vortex_a, rear_a, rear_b, panel.vortex_b]
    }
}

/// Kutta–Joukowski force on the leading segment `ring[3] → ring[0]` of a
/// thin panel ring, net of the upstream ring's trailing segment.
pub(crate) fn bound_vortex_load(
    mesh: &PanelMesh,
    ring: &[Vec3; 4],
    index: usize,
    mu: &[f64],
    onset: &Vec3,
    density: f64,
) -> (Vec3, Vec3) {
    let panel = &mesh.panels()[index];
    let upstream = panel.neighbours.upstream.map_or(0.0, |k| mu[k]);
    let circulation = 4.0 * PI * (mu[index] - upstream);
    let bound = ring[0] - ring[3];
    let force = onset.cross(&bound) * (density * circulation);
    (force, (ring[0] + ring[3]) * 0.5)
}

impl AnalysisMethod for VortexLatticeMethod {
    fn kind(&self) -> MethodKind {
        MethodKind::Vlm
    }

    fn shedding_line(&self, mesh: &PanelMesh, column: usize) -> (Vec3, Vec3) {
        let spec = &mesh.wake_columns()[column];
        match spec.shedding.first() {
            Some(&(panel, _)) => {
                let ring = Self::ring(mesh, panel);
                (ring[1], ring[2])
            }
            None => mesh.column_edge(column),
        }
    }

    fn evaluation_point(&self, panel: &Panel4) -> Vec3 {
        panel.ctrl_pt
    }

    fn assemble_influence(
        &self,
        mesh: &PanelMesh,
        wake: &WakeModel,
        settings: &KernelSettings,
        multithread: bool,
    ) -> AeroResult<LinearSystem> {
        let n = mesh.n_panels();
        let rings: Vec<[Vec3; 4]> = (0..n).map(|index| Self::ring(mesh, index)).collect();
        let panels = mesh.panels();
        let columns = wake.columns();

        let matrix = assemble_matrix(n, n, multithread, |i, row| {
            let point = panels[i].ctrl_pt;
            let normal = panels[i].normal();
            for (value, ring) in row.iter_mut().zip(&rings) {
                *value = settings
                    .with_mirror(&point, |p| ring_velocity(ring, p, settings.core_radius))
                    .dot(&normal);
            }
            add_wake_columns(row, columns, |column| {
                column.unit_velocity(&point, settings).dot(&normal)
            });
        })?;
        LinearSystem::factorize(matrix)
    }

    fn source_strengths(&self, mesh: &PanelMesh, _onset: &[Vec3]) -> Vec<f64> {
        vec![0.0; mesh.n_panels()]
    }

    fn build_rhs(
        &self,
        mesh: &PanelMesh,
        _system: &LinearSystem,
        onset: &[Vec3],
        _sigma: &[f64],
    ) -> Vec<f64> {
        mesh.panels()
            .iter()
            .zip(onset)
            .map(|(panel, v)| -v.dot(&panel.normal()))
            .collect()
    }

    fn induced_velocity(
        &self,
        mesh: &PanelMesh,
        point: &Vec3,
        mu: &[f64],
        _sigma: &[f64],
        settings: &KernelSettings,
    ) -> Vec3 {
        settings.with_mirror(point, |p| {
            (0..mesh.n_panels()).fold(Vec3::zeros(), |acc, j| {
                acc + ring_velocity(&Self::ring(mesh, j), p, settings.core_radius) * mu[j]
            })
        })
    }

    fn integrate_forces(
        &self,
        mesh: &PanelMesh,
        mu: &[f64],
        onset: &[Vec3],
        qinf: f64,
        density: f64,
    ) -> PanelLoads {
        let dynamic_pressure = 0.5 * density * qinf * qinf;
        let mut loads = PanelLoads::with_capacity(mesh.n_panels());
        for panel in mesh.panels() {
            let ring = Self::ring(mesh, panel.index);
            let (force, point) =
                bound_vortex_load(mesh, &ring, panel.index, mu, &onset[panel.index], density);
            let cp = if dynamic_pressure > 0.0 {
                force.dot(&panel.normal()) / (dynamic_pressure * panel.area())
            } else {
                0.0
            };
            loads.push(force, point, cp);
        }
        loads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LiftingSurfaceBuilder;
    use approx::assert_relative_eq;

    #[test]
    fn test_rings_chain_along_the_chord() {
        let mesh = LiftingSurfaceBuilder::rectangular(2.0, 1.0)
            .with_panels(4, 2)
            .build()
            .unwrap();
        let first = VortexLatticeMethod::ring(&mesh, 0);
        let second = VortexLatticeMethod::ring(&mesh, 1);
        let last = VortexLatticeMethod::ring(&mesh, 3);

        assert_relative_eq!(first[1], second[0], epsilon = 1e-12);
        assert_relative_eq!(first[0].x, 0.0625, epsilon = 1e-12);
        // Quarter panel behind the trailing edge
        assert_relative_eq!(last[1].x, 1.0625, epsilon = 1e-12);
    }

    #[test]
    fn test_shedding_line_is_ring_rear() {
        let mesh = LiftingSurfaceBuilder::rectangular(2.0, 1.0)
            .with_panels(4, 2)
            .build()
            .unwrap();
        let (a, b) = VortexLatticeMethod.shedding_line(&mesh, 1);
        assert_relative_eq!(a.x, 1.0625, epsilon = 1e-12);
        assert_relative_eq!(b.x, 1.0625, epsilon = 1e-12);
        assert!(b.y > a.y);
    }
}
