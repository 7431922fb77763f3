//! Quadrilateral panel with its local frame.
//!
//! Corner order is `[LA, TA, TB, LB]`: leading-left, trailing-left,
//! trailing-right, leading-right. The frame is
//!
//! ```text
//! n = (TB - LA) × (LB - TA) / |…|        outward (or upward) normal
//! m = unit(mid(LB, TB) - collocation)     spanwise
//! l = m × n                               chordwise, pointing downstream
//! ```

use crate::core_types::Vec3;
use crate::error::{AeroResult, ConfigurationError};
use serde::{Deserialize, Serialize};

/// Below this ratio of `|d1 × d2| / (|d1| |d2|)` the diagonals are treated as
/// parallel and the panel as degenerate.
pub const DEGENERATE_PANEL_RATIO: f64 = 1.0e-6;

/// Corners closer than this are merged when computing the collocation point.
pub(crate) const COINCIDENT_CORNER_DISTANCE: f64 = 1.0e-10;

/// Which side of a surface a panel lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfacePosition {
    /// Zero-thickness surface.
    Mid,
    Top,
    Bottom,
    /// Tip patches and other closing panels.
    Side,
}

impl SurfacePosition {
    #[must_use]
    pub fn is_thin(self) -> bool {
        self == Self::Mid
    }
}

/// Input description of one panel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelSpec {
    /// Node indices `[LA, TA, TB, LB]`.
    pub nodes: [usize; 4],
    pub position: SurfacePosition,
    /// Whether the `TA–TB` edge lies on a trailing edge and sheds a wake.
    pub is_trailing: bool,
}

/// Indices of the panels sharing each edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbours {
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub upstream: Option<usize>,
    pub downstream: Option<usize>,
}

impl Neighbours {
    /// Neighbours that exist, in left/right/upstream/downstream order.
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        [self.left, self.right, self.upstream, self.downstream]
            .into_iter()
            .flatten()
    }
}

/// Corners and local frame of a quadrilateral, shared by surface and wake
/// panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadGeometry {
    /// Corner positions `[LA, TA, TB, LB]`.
    pub corners: [Vec3; 4],
    pub normal: Vec3,
    pub l: Vec3,
    pub m: Vec3,
    pub area: f64,
    pub coll_pt: Vec3,
    /// Distance from the collocation point to the right edge midpoint.
    pub size_spanwise: f64,
    /// Distance from the collocation point to the trailing edge midpoint.
    pub size_chordwise: f64,
}

impl QuadGeometry {
    /// Frame of four corners. The diagonals must not be parallel.
    #[must_use]
    pub fn new(corners: [Vec3; 4]) -> Self {
        let [la, ta, tb, lb] = corners;

        let cross = (tb - la).cross(&(lb - ta));
        let cross_norm = cross.norm();
        let normal = cross / cross_norm;
        let coll_pt = distinct_centroid(&corners);

        let to_right = (lb + tb) * 0.5 - coll_pt;
        let size_spanwise = to_right.norm();
        let size_chordwise = ((ta + tb) * 0.5 - coll_pt).norm();
        let m = to_right / size_spanwise;

        Self {
            corners,
            normal,
            l: m.cross(&normal),
            m,
            area: 0.5 * cross_norm,
            coll_pt,
            size_spanwise,
            size_chordwise,
        }
    }

    /// Larger of the two in-plane panel sizes, the far-field length scale.
    #[must_use]
    pub fn max_size(&self) -> f64 {
        self.size_spanwise.max(self.size_chordwise)
    }

    /// Midpoint of the leading edge `LA–LB`.
    #[must_use]
    pub fn leading_mid(&self) -> Vec3 {
        (self.corners[0] + self.corners[3]) * 0.5
    }

    /// Midpoint of the trailing edge `TA–TB`.
    #[must_use]
    pub fn trailing_mid(&self) -> Vec3 {
        (self.corners[1] + self.corners[2]) * 0.5
    }

    /// Expresses a global vector in the `(l, m, n)` frame.
    #[must_use]
    pub fn global_to_local(&self, v: &Vec3) -> Vec3 {
        Vec3::new(v.dot(&self.l), v.dot(&self.m), v.dot(&self.normal))
    }

    /// Converts local `(l, m, n)` components back to global axes.
    #[must_use]
    pub fn local_to_global(&self, v: &Vec3) -> Vec3 {
        self.l * v.x + self.m * v.y + self.normal * v.z
    }
}

/// A quadrilateral surface panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panel4 {
    pub index: usize,
    pub nodes_idx: [usize; 4],
    pub geom: QuadGeometry,
    pub position: SurfacePosition,
    pub is_leading: bool,
    pub is_trailing: bool,
    /// 3/4 chord point, used as the VLM control point.
    pub ctrl_pt: Vec3,
    /// Bound vortex end points on the 1/4 chord line.
    pub vortex_a: Vec3,
    pub vortex_b: Vec3,
    pub neighbours: Neighbours,
    pub strip: Option<usize>,
    pub wake_column: Option<usize>,
}

impl Panel4 {
    /// Builds a panel from its specification and the shared node array.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::NodeIndexOutOfRange`] when a node index is not
    /// in `nodes`, [`ConfigurationError::DegeneratePanel`] when the two
    /// diagonals are parallel.
    pub fn new(index: usize, spec: &PanelSpec, nodes: &[Vec3]) -> AeroResult<Self> {
        for &node in &spec.nodes {
            if node >= nodes.len() {
                return Err(ConfigurationError::NodeIndexOutOfRange {
                    panel: index,
                    node,
                    n_nodes: nodes.len(),
                }
                .into());
            }
        }

        let corners = spec.nodes.map(|k| nodes[k]);
        let ratio = diagonal_ratio(&corners);
        if ratio < DEGENERATE_PANEL_RATIO {
            return Err(ConfigurationError::DegeneratePanel {
                panel: index,
                ratio,
            }
            .into());
        }

        let mut panel = Self {
            index,
            nodes_idx: spec.nodes,
            geom: QuadGeometry::new(corners),
            position: spec.position,
            is_leading: false,
            is_trailing: spec.is_trailing,
            ctrl_pt: Vec3::zeros(),
            vortex_a: Vec3::zeros(),
            vortex_b: Vec3::zeros(),
            neighbours: Neighbours::default(),
            strip: None,
            wake_column: None,
        };
        panel.refresh(nodes);
        Ok(panel)
    }

    /// Recomputes the geometry after the nodes moved.
    pub fn refresh(&mut self, nodes: &[Vec3]) {
        let corners = self.nodes_idx.map(|k| nodes[k]);
        let [la, ta, tb, lb] = corners;
        self.geom = QuadGeometry::new(corners);
        self.vortex_a = la + (ta - la) * 0.25;
        self.vortex_b = lb + (tb - lb) * 0.25;
        self.ctrl_pt = ((la + (ta - la) * 0.75) + (lb + (tb - lb) * 0.75)) * 0.5;
    }

    #[must_use]
    pub fn is_thin(&self) -> bool {
        self.position.is_thin()
    }

    #[must_use]
    pub fn normal(&self) -> Vec3 {
        self.geom.normal
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        self.geom.area
    }

    /// Vector from `vortex_a` to `vortex_b`.
    #[must_use]
    pub fn bound_vector(&self) -> Vec3 {
        self.vortex_b - self.vortex_a
    }
}

fn diagonal_ratio(corners: &[Vec3; 4]) -> f64 {
    let [la, ta, tb, lb] = *corners;
    let d1 = tb - la;
    let d2 = lb - ta;
    let lengths = d1.norm() * d2.norm();
    if lengths <= f64::MIN_POSITIVE {
        return 0.0;
    }
    d1.cross(&d2).norm() / lengths
}

/// Average of the corners, counting collapsed corners once.
fn distinct_centroid(corners: &[Vec3; 4]) -> Vec3 {
    let mut sum = Vec3::zeros();
    let mut count = 0.0;
    for (k, corner) in corners.iter().enumerate() {
        let repeated = corners[..k]
            .iter()
            .any(|other| (corner - other).norm() < COINCIDENT_CORNER_DISTANCE);
        if !repeated {
            sum += corner;
            count += 1.0;
        }
    }
    sum / count
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]
    }

    fn spec(nodes: [usize; 4]) -> PanelSpec {
        PanelSpec {
            nodes,
            position: SurfacePosition::Mid,
            is_trailing: false,
        }
    }

    #[test]
    fn test_square_panel_frame() {
        let panel = Panel4::new(0, &spec([0, 1, 2, 3]), &unit_square()).unwrap();

        assert_relative_eq!(panel.area(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(panel.normal(), Vec3::z(), epsilon = 1e-12);
        assert_relative_eq!(panel.geom.l, Vec3::x(), epsilon = 1e-12);
        assert_relative_eq!(panel.geom.m, Vec3::y(), epsilon = 1e-12);
        assert_relative_eq!(panel.geom.coll_pt, Vec3::new(0.5, 0.5, 0.0), epsilon = 1e-12);
        assert_relative_eq!(panel.ctrl_pt, Vec3::new(0.75, 0.5, 0.0), epsilon = 1e-12);
        assert_relative_eq!(panel.vortex_a, Vec3::new(0.25, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(panel.vortex_b, Vec3::new(0.25, 1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(panel.geom.max_size(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_triangle_is_accepted() {
        let mut nodes = unit_square();
        nodes[3] = nodes[0];
        let panel = Panel4::new(0, &spec([0, 1, 2, 3]), &nodes).unwrap();

        assert_relative_eq!(panel.area(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(
            panel.geom.coll_pt,
            Vec3::new(2.0 / 3.0, 1.0 / 3.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_collinear_corners_are_rejected() {
        let nodes = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
        ];
        let err = Panel4::new(4, &spec([0, 1, 2, 3]), &nodes).unwrap_err();
        assert!(
            matches!(
                err,
                crate::error::AeroError::Configuration(ConfigurationError::DegeneratePanel {
                    panel: 4,
                    ..
                })
            ),
            "Unexpected error {err:?}"
        );
    }

    #[test]
    fn test_out_of_range_node_is_rejected() {
        let err = Panel4::new(0, &spec([0, 1, 2, 9]), &unit_square()).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("node 9"), "Unexpected message: {err}");
    }

    #[test]
    fn test_local_frame_round_trip() {
        let panel = Panel4::new(0, &spec([0, 1, 2, 3]), &unit_square()).unwrap();
        let v = Vec3::new(0.3, -1.2, 2.5);
        let back = panel.geom.local_to_global(&panel.geom.global_to_local(&v));
        assert_relative_eq!(back, v, epsilon = 1e-12);
    }
}
