//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use panel_aero_core::geometry::{PanelMesh, PanelSpec, SurfacePosition};
use panel_aero_core::{AnalysisConfig, LiftingSurfaceBuilder, ReferenceDimensions, Vec3};
use std::f64::consts::PI;
use tracing_subscriber::EnvFilter;

/// Installs a test subscriber once per test binary; `RUST_LOG` selects the level.
#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Flat rectangular wing with cosine spanwise spacing.
pub fn rectangular_wing(
    span: f64,
    chord: f64,
    chordwise: usize,
    spanwise: usize,
) -> (PanelMesh, ReferenceDimensions) {
    let builder = LiftingSurfaceBuilder::rectangular(span, chord).with_panels(chordwise, spanwise);
    (builder.build().unwrap(), builder.reference())
}

/// Closed unit sphere of `n_theta × n_phi` thick panels with outward normals.
pub fn sphere(n_theta: usize, n_phi: usize) -> PanelMesh {
    let mut nodes = vec![Vec3::new(0.0, 0.0, 1.0)];
    for i in 1..n_theta {
        let theta = PI * i as f64 / n_theta as f64;
        for j in 0..n_phi {
            let phi = 2.0 * PI * j as f64 / n_phi as f64;
            nodes.push(Vec3::new(
                theta.sin() * phi.cos(),
                theta.sin() * phi.sin(),
                theta.cos(),
            ));
        }
    }
    let south = nodes.len();
    nodes.push(Vec3::new(0.0, 0.0, -1.0));

    let node = |i: usize, j: usize| {
        if i == 0 {
            0
        } else if i == n_theta {
            south
        } else {
            1 + (i - 1) * n_phi + j % n_phi
        }
    };
    let mut specs = Vec::with_capacity(n_theta * n_phi);
    for i in 0..n_theta {
        for j in 0..n_phi {
            specs.push(PanelSpec {
                nodes: [node(i, j), node(i + 1, j), node(i + 1, j + 1), node(i, j + 1)],
                position: if i < n_theta / 2 {
                    SurfacePosition::Top
                } else {
                    SurfacePosition::Bottom
                },
                is_trailing: false,
            });
        }
    }
    PanelMesh::new(nodes, &specs).unwrap()
}

/// Serial configuration, so that results do not depend on the pool size.
pub fn serial_config() -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.solver.multithread = false;
    config
}

/// Prandtl lifting-line lift coefficient of an elliptic wing.
pub fn lifting_line_cl(alpha_deg: f64, aspect_ratio: f64) -> f64 {
    2.0 * PI * alpha_deg.to_radians() * aspect_ratio / (aspect_ratio + 2.0)
}
