//! Panel geometry: quad panels, the shared-node mesh and a parametric wing
//! builder.

pub mod builder;
pub mod mesh;
pub mod panel;

pub use builder::{LiftingSurfaceBuilder, PanelDistribution, WingSection};
pub use mesh::{PanelMesh, StripGeometry, WakeColumnSpec};
pub use panel::{
    Neighbours, Panel4, PanelSpec, QuadGeometry, SurfacePosition, DEGENERATE_PANEL_RATIO,
};
