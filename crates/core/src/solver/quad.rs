//! Quad doublet/source panel method.
//!
//! Thin panels carry a doublet, equivalent to a vortex ring on their
//! corners, with the no-penetration condition at the collocation point.
//! Thick panels carry a doublet and a source. Their condition is a zero
//! perturbation potential inside the body:
//!
//! ```text
//! Σ_j μ_j D_ij + Σ_j σ_j S_ij + Σ_w μ_w W_iw = 0,      σ_j = -V_j · n_j / 4π
//! ```
//!
//! On thick panels the surface speed comes from the doublet gradient,
//! `V = V_t - 4π ∇μ`, fitted by least squares over the neighbours.

use super::assembly::{add_wake_columns, assemble_matrix};
use super::kernels::{
    doublet_potential, doublet_velocity, source_potential, source_velocity, KernelSettings,
};
use super::linear::LinearSystem;
use super::r#trait::AnalysisMethod;
use super::vlm::bound_vortex_load;
use crate::config::MethodKind;
use crate::core_types::Vec3;
use crate::error::AeroResult;
use crate::forces::PanelLoads;
use crate::geometry::{Panel4, PanelMesh};
use crate::wake::WakeModel;
use nalgebra::{Matrix2, Vector2};
use std::f64::consts::PI;

/// Quad doublet/source panel method.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuadPanelMethod;

impl QuadPanelMethod {
    /// Least-squares doublet gradient of a panel, in global axes.
    #[must_use]
    pub fn doublet_gradient(mesh: &PanelMesh, index: usize, mu: &[f64]) -> Vec3 {
        let panels = mesh.panels();
        let panel = &panels[index];
        let mut normal_matrix = Matrix2::zeros();
        let mut moments = Vector2::zeros();
        for k in panel.neighbours.iter() {
            let offset = panels[k].geom.coll_pt - panel.geom.coll_pt;
            let d = Vector2::new(offset.dot(&panel.geom.l), offset.dot(&panel.geom.m));
            normal_matrix += d * d.transpose();
            moments += d * (mu[k] - mu[index]);
        }

        let trace = normal_matrix.trace();
        if trace <= 0.0 {
            return Vec3::zeros();
        }
        let gradient = if normal_matrix.determinant().abs() > 1.0e-10 * trace * trace {
            normal_matrix
                .try_inverse()
                .map_or_else(Vector2::zeros, |inverse| inverse * moments)
        } else {
            // Neighbours along a single direction only
            moments / trace
        };
        panel.geom.l * gradient.x + panel.geom.m * gradient.y
    }

    fn has_sources(mesh: &PanelMesh) -> bool {
        !mesh.is_thin()
    }
}

impl AnalysisMethod for QuadPanelMethod {
    fn kind(&self) -> MethodKind {
        MethodKind::Panel
    }

    fn shedding_line(&self, mesh: &PanelMesh, column: usize) -> (Vec3, Vec3) {
        mesh.column_edge(column)
    }

    fn evaluation_point(&self, panel: &Panel4) -> Vec3 {
        panel.geom.coll_pt
    }

    fn assemble_influence(
        &self,
        mesh: &PanelMesh,
        wake: &WakeModel,
        settings: &KernelSettings,
        multithread: bool,
    ) -> AeroResult<LinearSystem> {
        let n = mesh.n_panels();
        let panels = mesh.panels();
        let columns = wake.columns();
        let rff = settings.far_field_factor;

        let doublets = assemble_matrix(n, n, multithread, |i, row| {
            let target = &panels[i];
            let point = target.geom.coll_pt;
            let normal = target.normal();
            if target.is_thin() {
                for (value, source) in row.iter_mut().zip(panels) {
                    *value = settings
                        .with_mirror(&point, |x| {
                            doublet_velocity(&source.geom, x, rff, settings.core_radius)
                        })
                        .dot(&normal);
                }
                add_wake_columns(row, columns, |column| {
                    column.unit_velocity(&point, settings).dot(&normal)
                });
            } else {
                for (value, source) in row.iter_mut().zip(panels) {
                    *value = settings
                        .with_mirror_potential(&point, |x| doublet_potential(&source.geom, x, rff));
                }
                add_wake_columns(row, columns, |column| column.unit_potential(&point, settings));
            }
        })?;
        let system = LinearSystem::factorize(doublets)?;

        if !Self::has_sources(mesh) {
            return Ok(system);
        }
        let sources = assemble_matrix(n, n, multithread, |i, row| {
            let target = &panels[i];
            let point = target.geom.coll_pt;
            for (value, source) in row.iter_mut().zip(panels) {
                if source.is_thin() {
                    *value = 0.0;
                } else if target.is_thin() {
                    *value = settings
                        .with_mirror(&point, |x| source_velocity(&source.geom, x, rff))
                        .dot(&target.normal());
                } else {
                    *value = settings
                        .with_mirror_potential(&point, |x| source_potential(&source.geom, x, rff));
                }
            }
        })?;
        Ok(system.with_source_influence(sources))
    }

    fn source_strengths(&self, mesh: &PanelMesh, onset: &[Vec3]) -> Vec<f64> {
        mesh.panels()
            .iter()
            .zip(onset)
            .map(|(panel, v)| {
                if panel.is_thin() {
                    0.0
                } else {
                    -v.dot(&panel.normal()) / (4.0 * PI)
                }
            })
            .collect()
    }

    fn build_rhs(
        &self,
        mesh: &PanelMesh,
        system: &LinearSystem,
        onset: &[Vec3],
        sigma: &[f64],
    ) -> Vec<f64> {
        let source_terms = system.source_influence().map(|sources| {
            sources * nalgebra::DVector::from_column_slice(sigma)
        });
        mesh.panels()
            .iter()
            .zip(onset)
            .enumerate()
            .map(|(i, (panel, v))| {
                let base = if panel.is_thin() {
                    -v.dot(&panel.normal())
                } else {
                    0.0
                };
                base - source_terms.as_ref().map_or(0.0, |terms| terms[i])
            })
            .collect()
    }

    fn induced_velocity(
        &self,
        mesh: &PanelMesh,
        point: &Vec3,
        mu: &[f64],
        sigma: &[f64],
        settings: &KernelSettings,
    ) -> Vec3 {
        let rff = settings.far_field_factor;
        settings.with_mirror(point, |x| {
            mesh.panels().iter().fold(Vec3::zeros(), |acc, panel| {
                let mut v = acc
                    + doublet_velocity(&panel.geom, x, rff, settings.core_radius)
                        * mu[panel.index];
                if sigma[panel.index] != 0.0 {
                    v += source_velocity(&panel.geom, x, rff) * sigma[panel.index];
                }
                v
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
            let v_onset = onset[panel.index];
            let normal = panel.normal();
            if panel.is_thin() {
                let corners = &panel.geom.corners;
                let (force, point) =
                    bound_vortex_load(mesh, corners, panel.index, mu, &v_onset, density);
                let cp = if dynamic_pressure > 0.0 {
                    force.dot(&normal) / (dynamic_pressure * panel.area())
                } else {
                    0.0
                };
                loads.push(force, point, cp);
            } else {
                let tangential = v_onset - normal * v_onset.dot(&normal);
                let gradient = Self::doublet_gradient(mesh, panel.index, mu);
                let surface = tangential - gradient * (4.0 * PI);
                let cp = if qinf > 0.0 {
                    1.0 - surface.norm_squared() / (qinf * qinf)
                } else {
                    0.0
                };
                let force = normal * (-cp * dynamic_pressure * panel.area());
                loads.push(force, panel.geom.coll_pt, cp);
            }
        }
        loads
    }
}
