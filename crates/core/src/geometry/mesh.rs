//! Panel set over a shared node array.
//!
//! The mesh owns the nodes and the panels built on them, stitches neighbours
//! through shared edges and groups trailing panels into wake columns. Each
//! wake column defines one span station.

use super::panel::{Panel4, PanelSpec, SurfacePosition, COINCIDENT_CORNER_DISTANCE};
use crate::core_types::vec3::rotate_about;
use crate::core_types::Vec3;
use crate::error::{AeroResult, ConfigurationError};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Panels whose combined trailing edge sheds one wake column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WakeColumnSpec {
    /// `(panel, sign)`: the column strength is `Σ sign·μ`.
    pub shedding: Vec<(usize, f64)>,
    /// Trailing-edge node indices, left then right.
    pub node_a: usize,
    pub node_b: usize,
}

/// Chordwise strip geometry for one span station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StripGeometry {
    /// Spanwise (y) coordinate of the trailing-edge midpoint.
    pub span_pos: f64,
    pub chord: f64,
    /// Planform area of the strip.
    pub area: f64,
    pub leading_mid: Vec3,
    pub trailing_mid: Vec3,
    /// Trailing edge width `|B - A|`.
    pub width: f64,
}

impl StripGeometry {
    /// Quarter-chord point, the reference for strip pitching moments.
    #[must_use]
    pub fn quarter_chord(&self) -> Vec3 {
        self.leading_mid + (self.trailing_mid - self.leading_mid) * 0.25
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeSide {
    Upstream,
    Downstream,
    Left,
    Right,
}

/// Discretized surface: shared nodes plus the panels built on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelMesh {
    nodes: Vec<Vec3>,
    panels: Vec<Panel4>,
    columns: Vec<WakeColumnSpec>,
    strips: Vec<Vec<usize>>,
    strip_geometry: Vec<StripGeometry>,
}

impl PanelMesh {
    /// Validates indices, builds every panel and derives the topology.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::EmptyMesh`] without panels, or the first panel
    /// construction error.
    pub fn new(nodes: Vec<Vec3>, specs: &[PanelSpec]) -> AeroResult<Self> {
        if specs.is_empty() {
            return Err(ConfigurationError::EmptyMesh.into());
        }

        let panels = specs
            .iter()
            .enumerate()
            .map(|(index, spec)| Panel4::new(index, spec, &nodes))
            .collect::<AeroResult<Vec<_>>>()?;

        let mut mesh = Self {
            nodes,
            panels,
            columns: Vec::new(),
            strips: Vec::new(),
            strip_geometry: Vec::new(),
        };
        mesh.stitch_neighbours();
        mesh.build_wake_columns();
        mesh.assign_strips();
        mesh.strip_geometry = mesh.compute_strip_geometry();
        Ok(mesh)
    }

    #[must_use]
    pub fn panels(&self) -> &[Panel4] {
        &self.panels
    }

    #[must_use]
    pub fn nodes(&self) -> &[Vec3] {
        &self.nodes
    }

    #[must_use]
    pub fn n_panels(&self) -> usize {
        self.panels.len()
    }

    /// Number of span stations, one per wake column.
    #[must_use]
    pub fn n_stations(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn wake_columns(&self) -> &[WakeColumnSpec] {
        &self.columns
    }

    /// Panels of one station, in ascending index order.
    #[must_use]
    pub fn strip_panels(&self, station: usize) -> &[usize] {
        self.strips.get(station).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn strip_geometry(&self) -> &[StripGeometry] {
        &self.strip_geometry
    }

    /// Indices of all panels flagged as trailing.
    #[must_use]
    pub fn trailing_panels(&self) -> Vec<usize> {
        self.panels
            .iter()
            .filter(|p| p.is_trailing)
            .map(|p| p.index)
            .collect()
    }

    /// Whether every panel is a zero-thickness panel.
    #[must_use]
    pub fn is_thin(&self) -> bool {
        self.panels.iter().all(Panel4::is_thin)
    }

    /// Sum of the panel areas.
    #[must_use]
    pub fn wetted_area(&self) -> f64 {
        self.panels.iter().map(Panel4::area).sum()
    }

    /// Trailing-edge end points of a wake column.
    #[must_use]
    pub fn column_edge(&self, column: usize) -> (Vec3, Vec3) {
        let spec = &self.columns[column];
        (self.nodes[spec.node_a], self.nodes[spec.node_b])
    }

    pub fn translate(&mut self, offset: &Vec3) {
        for node in &mut self.nodes {
            *node += offset;
        }
        self.refresh();
    }

    /// Rotates all nodes about the axis through `centre`.
    pub fn rotate(&mut self, centre: &Vec3, axis: &Vec3, angle_deg: f64) {
        for node in &mut self.nodes {
            *node = rotate_about(node, centre, axis, angle_deg);
        }
        self.refresh();
    }

    /// Uniform scaling about the origin.
    ///
    /// # Errors
    ///
    /// Rejects a non-positive or non-finite factor.
    pub fn scale(&mut self, factor: f64) -> AeroResult<()> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(ConfigurationError::InvalidParameter {
                name: "scale",
                value: factor,
                reason: "must be positive",
            }
            .into());
        }
        for node in &mut self.nodes {
            *node *= factor;
        }
        self.refresh();
        Ok(())
    }

    /// Copy of the mesh banked by `phi_deg` about the x axis.
    #[must_use]
    pub fn rotated_for_bank(&self, phi_deg: f64) -> Self {
        let mut banked = self.clone();
        if phi_deg.abs() > f64::EPSILON {
            banked.rotate(&Vec3::zeros(), &Vec3::x(), phi_deg);
        }
        banked
    }

    fn refresh(&mut self) {
        for panel in &mut self.panels {
            panel.refresh(&self.nodes);
        }
        self.strip_geometry = self.compute_strip_geometry();
    }

    fn stitch_neighbours(&mut self) {
        let mut edges: FxHashMap<(usize, usize), Vec<(usize, EdgeSide)>> = FxHashMap::default();
        for panel in &self.panels {
            let [la, ta, tb, lb] = panel.nodes_idx;
            for (a, b, side) in [
                (la, lb, EdgeSide::Upstream),
                (ta, tb, EdgeSide::Downstream),
                (la, ta, EdgeSide::Left),
                (lb, tb, EdgeSide::Right),
            ] {
                if a != b {
                    edges
                        .entry((a.min(b), a.max(b)))
                        .or_default()
                        .push((panel.index, side));
                }
            }
        }

        for sharing in edges.values() {
            let [(p, side_p), (q, side_q)] = match sharing.as_slice() {
                [first, second] => [*first, *second],
                _ => continue,
            };
            // Top and bottom trailing panels meet at the trailing edge without
            // being neighbours.
            let trailing_seam = side_p == EdgeSide::Downstream
                && side_q == EdgeSide::Downstream
                && self.panels[p].is_trailing
                && self.panels[q].is_trailing;
            if trailing_seam {
                continue;
            }
            self.set_neighbour(p, side_p, q);
            self.set_neighbour(q, side_q, p);
        }

        for panel in &mut self.panels {
            panel.is_leading = panel.neighbours.upstream.is_none();
        }
    }

    fn set_neighbour(&mut self, panel: usize, side: EdgeSide, other: usize) {
        let neighbours = &mut self.panels[panel].neighbours;
        match side {
            EdgeSide::Upstream => neighbours.upstream = Some(other),
            EdgeSide::Downstream => neighbours.downstream = Some(other),
            EdgeSide::Left => neighbours.left = Some(other),
            EdgeSide::Right => neighbours.right = Some(other),
        }
    }

    fn build_wake_columns(&mut self) {
        let mut by_edge: FxHashMap<(usize, usize), usize> = FxHashMap::default();
        let mut columns: Vec<WakeColumnSpec> = Vec::new();

        for panel in self.panels.iter().filter(|p| p.is_trailing) {
            let [_, ta, tb, _] = panel.nodes_idx;
            // A pointed trailing edge sheds nothing.
            if ta == tb || (self.nodes[ta] - self.nodes[tb]).norm() < COINCIDENT_CORNER_DISTANCE {
                warn!("Trailing panel {} has a zero-width trailing edge", panel.index);
                continue;
            }
            let sign = if panel.position == SurfacePosition::Bottom {
                -1.0
            } else {
                1.0
            };
            let key = (ta.min(tb), ta.max(tb));
            if let Some(&column) = by_edge.get(&key) {
                let spec = &mut columns[column];
                spec.shedding.push((panel.index, sign));
                if panel.position != SurfacePosition::Bottom {
                    spec.node_a = ta;
                    spec.node_b = tb;
                }
            } else {
                by_edge.insert(key, columns.len());
                columns.push(WakeColumnSpec {
                    shedding: vec![(panel.index, sign)],
                    node_a: ta,
                    node_b: tb,
                });
            }
        }

        for (column, spec) in columns.iter().enumerate() {
            for &(panel, _) in &spec.shedding {
                self.panels[panel].wake_column = Some(column);
            }
        }
        self.columns = columns;
    }

    /// Flood fill along chordwise links from each column's shedding panels.
    fn assign_strips(&mut self) {
        let mut strips = vec![Vec::new(); self.columns.len()];
        for (station, column) in self.columns.iter().enumerate() {
            let mut stack: Vec<usize> = column.shedding.iter().map(|&(p, _)| p).collect();
            while let Some(index) = stack.pop() {
                let panel = &mut self.panels[index];
                if panel.strip.is_some() {
                    continue;
                }
                panel.strip = Some(station);
                strips[station].push(index);
                stack.extend(panel.neighbours.upstream);
                stack.extend(panel.neighbours.downstream);
            }
        }
        for strip in &mut strips {
            strip.sort_unstable();
        }
        self.strips = strips;
    }

    fn compute_strip_geometry(&self) -> Vec<StripGeometry> {
        (0..self.columns.len())
            .map(|station| {
                let (a, b) = self.column_edge(station);
                let trailing_mid = (a + b) * 0.5;
                let mut leading_mid = trailing_mid;
                let mut area = 0.0;
                for &index in self.strip_panels(station) {
                    let panel = &self.panels[index];
                    let candidate = panel.geom.leading_mid();
                    if (candidate - trailing_mid).norm() > (leading_mid - trailing_mid).norm() {
                        leading_mid = candidate;
                    }
                    // Top and bottom panels both cover the planform.
                    area += if panel.is_thin() {
                        panel.area()
                    } else {
                        0.5 * panel.area()
                    };
                }
                StripGeometry {
                    span_pos: trailing_mid.y,
                    chord: (trailing_mid - leading_mid).norm(),
                    area,
                    leading_mid,
                    trailing_mid,
                    width: (b - a).norm(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Two strips of two panels each on the plane z = 0.
    fn two_by_two() -> PanelMesh {
        let mut nodes = Vec::new();
        for j in 0..3_u32 {
            for i in 0..3_u32 {
                nodes.push(Vec3::new(f64::from(i), f64::from(j), 0.0));
            }
        }
        let node = |i: usize, j: usize| j * 3 + i;
        let mut specs = Vec::new();
        for j in 0..2 {
            for i in 0..2 {
                specs.push(PanelSpec {
                    nodes: [node(i, j), node(i + 1, j), node(i + 1, j + 1), node(i, j + 1)],
                    position: SurfacePosition::Mid,
                    is_trailing: i == 1,
                });
            }
        }
        PanelMesh::new(nodes, &specs).unwrap()
    }

    #[test]
    fn test_neighbour_stitching() {
        let mesh = two_by_two();
        let p = mesh.panels();

        assert_eq!(p[0].neighbours.downstream, Some(1));
        assert_eq!(p[1].neighbours.upstream, Some(0));
        assert_eq!(p[0].neighbours.right, Some(2));
        assert_eq!(p[2].neighbours.left, Some(0));
        assert_eq!(p[0].neighbours.left, None);
        assert_eq!(p[1].neighbours.downstream, None);
        assert!(p[0].is_leading && !p[1].is_leading);
    }

    #[test]
    fn test_neighbours_are_in_range() {
        let mesh = two_by_two();
        for panel in mesh.panels() {
            for n in panel.neighbours.iter() {
                assert!(n < mesh.n_panels(), "Panel {} has neighbour {n}", panel.index);
            }
        }
    }

    #[test]
    fn test_wake_columns_and_strips() {
        let mesh = two_by_two();

        assert_eq!(mesh.n_stations(), 2);
        assert_eq!(mesh.trailing_panels(), vec![1, 3]);
        assert_eq!(mesh.strip_panels(0), &[0, 1]);
        assert_eq!(mesh.strip_panels(1), &[2, 3]);
        assert_eq!(mesh.panels()[3].wake_column, Some(1));

        let strip = mesh.strip_geometry()[1];
        assert_relative_eq!(strip.chord, 2.0, epsilon = 1e-12);
        assert_relative_eq!(strip.area, 2.0, epsilon = 1e-12);
        assert_relative_eq!(strip.span_pos, 1.5, epsilon = 1e-12);
        assert_relative_eq!(strip.quarter_chord().x, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_thick_trailing_edge_forms_one_column() {
        let nodes = vec![
            Vec3::new(0.0, 0.0, 0.1),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.1),
            Vec3::new(0.0, 0.0, -0.1),
            Vec3::new(0.0, 1.0, -0.1),
        ];
        let specs = [
            PanelSpec {
                nodes: [0, 1, 2, 3],
                position: SurfacePosition::Top,
                is_trailing: true,
            },
            PanelSpec {
                nodes: [5, 2, 1, 4],
                position: SurfacePosition::Bottom,
                is_trailing: true,
            },
        ];
        let mesh = PanelMesh::new(nodes, &specs).unwrap();

        assert_eq!(mesh.n_stations(), 1);
        assert_eq!(mesh.wake_columns()[0].shedding, vec![(0, 1.0), (1, -1.0)]);
        assert_eq!(mesh.panels()[0].neighbours.downstream, None);
        assert_eq!(mesh.column_edge(0).0, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_bank_rotation_leaves_original_untouched() {
        let mesh = two_by_two();
        let banked = mesh.rotated_for_bank(90.0);

        assert_relative_eq!(mesh.panels()[0].normal(), Vec3::z(), epsilon = 1e-12);
        assert_relative_eq!(banked.panels()[0].normal(), -Vec3::y(), epsilon = 1e-12);
        assert_relative_eq!(banked.wetted_area(), mesh.wetted_area(), epsilon = 1e-12);
    }

    #[test]
    fn test_rigid_transforms_rebuild_frames() {
        let mut mesh = two_by_two();
        mesh.translate(&Vec3::new(0.0, 0.0, 2.0));
        assert_relative_eq!(mesh.panels()[0].geom.coll_pt.z, 2.0, epsilon = 1e-12);

        mesh.scale(2.0).unwrap();
        assert_relative_eq!(mesh.panels()[0].area(), 4.0, epsilon = 1e-12);
        assert_relative_eq!(mesh.strip_geometry()[0].chord, 4.0, epsilon = 1e-12);
        assert!(mesh.scale(0.0).is_err());
    }

    #[test]
    fn test_pointed_trailing_edge_sheds_no_column() {
        let nodes = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.5, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(1.0, 2.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ];
        let specs = [
            PanelSpec {
                nodes: [0, 1, 1, 2],
                position: SurfacePosition::Mid,
                is_trailing: true,
            },
            PanelSpec {
                nodes: [2, 5, 4, 3],
                position: SurfacePosition::Mid,
                is_trailing: true,
            },
        ];
        let mesh = PanelMesh::new(nodes, &specs).unwrap();

        assert_eq!(mesh.n_stations(), 1);
        assert_eq!(mesh.panels()[0].wake_column, None);
        assert_eq!(mesh.panels()[1].wake_column, Some(0));
        let (a, b) = mesh.column_edge(0);
        assert!((a - b).norm() > 0.5);
        assert!(mesh.strip_geometry().iter().all(|s| s.area.is_finite()));
    }

    #[test]
    fn test_empty_mesh_is_rejected() {
        let err = PanelMesh::new(vec![Vec3::zeros()], &[]).unwrap_err();
        assert!(err.is_fatal());
    }
}
