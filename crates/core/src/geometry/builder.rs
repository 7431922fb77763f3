//! Parametric thin wing.
//!
//! Produces `Mid` panels over a list of span sections, strip by strip from
//! left to right and leading to trailing edge inside each strip. Sections are
//! interpolated linearly between their stations.

use super::mesh::PanelMesh;
use super::panel::{PanelSpec, SurfacePosition};
use crate::core_types::vec3::rotate_about;
use crate::core_types::Vec3;
use crate::error::{AeroResult, ConfigurationError};
use crate::forces::ReferenceDimensions;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Node spacing along one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanelDistribution {
    Uniform,
    /// Clustered towards both ends.
    Cosine,
}

impl PanelDistribution {
    /// `n + 1` increasing fractions from 0 to 1.
    #[must_use]
    pub fn fractions(self, n: usize) -> Vec<f64> {
        (0..=n)
            .map(|k| {
                let t = k as f64 / n as f64;
                match self {
                    Self::Uniform => t,
                    Self::Cosine => 0.5 * (1.0 - (PI * t).cos()),
                }
            })
            .collect()
    }
}

/// One span station of the wing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WingSection {
    /// Spanwise position (m)
    pub y: f64,
    /// Chord (m)
    pub chord: f64,
    /// Leading-edge x offset (m)
    pub offset_x: f64,
    /// Nose-up twist about the quarter chord (degrees)
    pub twist_deg: f64,
    /// Leading-edge height (m)
    pub dihedral_z: f64,
}

impl WingSection {
    #[must_use]
    pub fn new(y: f64, chord: f64) -> Self {
        Self {
            y,
            chord,
            offset_x: 0.0,
            twist_deg: 0.0,
            dihedral_z: 0.0,
        }
    }

    fn lerp(&self, other: &Self, t: f64) -> Self {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Self {
            y: mix(self.y, other.y),
            chord: mix(self.chord, other.chord),
            offset_x: mix(self.offset_x, other.offset_x),
            twist_deg: mix(self.twist_deg, other.twist_deg),
            dihedral_z: mix(self.dihedral_z, other.dihedral_z),
        }
    }
}

/// Builder for tapered, twisted single-surface wings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiftingSurfaceBuilder {
    sections: Vec<WingSection>,
    chordwise_panels: usize,
    /// Panels between each pair of consecutive sections.
    spanwise_panels: usize,
    chordwise_distribution: PanelDistribution,
    spanwise_distribution: PanelDistribution,
}

impl LiftingSurfaceBuilder {
    #[must_use]
    pub fn new(sections: Vec<WingSection>) -> Self {
        Self {
            sections,
            chordwise_panels: 4,
            spanwise_panels: 16,
            chordwise_distribution: PanelDistribution::Uniform,
            spanwise_distribution: PanelDistribution::Cosine,
        }
    }

    /// Flat rectangular wing centred on the origin.
    #[must_use]
    pub fn rectangular(span: f64, chord: f64) -> Self {
        Self::new(vec![
            WingSection::new(-0.5 * span, chord),
            WingSection::new(0.5 * span, chord),
        ])
    }

    pub fn with_panels(mut self, chordwise: usize, spanwise: usize) -> Self {
        self.chordwise_panels = chordwise;
        self.spanwise_panels = spanwise;
        self
    }

    pub fn with_distributions(
        mut self,
        chordwise: PanelDistribution,
        spanwise: PanelDistribution,
    ) -> Self {
        self.chordwise_distribution = chordwise;
        self.spanwise_distribution = spanwise;
        self
    }

    /// Applies the same twist to every section.
    pub fn with_twist(mut self, twist_deg: f64) -> Self {
        for section in &mut self.sections {
            section.twist_deg = twist_deg;
        }
        self
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.sections.len() < 2 {
            return Err(ConfigurationError::InvalidParameter {
                name: "sections",
                value: self.sections.len() as f64,
                reason: "at least two sections are needed",
            });
        }
        if self.chordwise_panels == 0 || self.spanwise_panels == 0 {
            return Err(ConfigurationError::InvalidParameter {
                name: "panel_count",
                value: 0.0,
                reason: "at least one panel in each direction",
            });
        }
        for pair in self.sections.windows(2) {
            if pair[1].y <= pair[0].y {
                return Err(ConfigurationError::InvalidParameter {
                    name: "section_y",
                    value: pair[1].y,
                    reason: "sections must be ordered by increasing y",
                });
            }
        }
        for section in &self.sections {
            if !(section.chord.is_finite() && section.chord > 0.0) {
                return Err(ConfigurationError::InvalidParameter {
                    name: "section_chord",
                    value: section.chord,
                    reason: "must be positive",
                });
            }
        }
        Ok(())
    }

    /// Span stations at every node row, left to right.
    fn stations(&self) -> Vec<WingSection> {
        let fractions = self.spanwise_distribution.fractions(self.spanwise_panels);
        let mut stations = vec![self.sections[0]];
        for pair in self.sections.windows(2) {
            stations.extend(fractions[1..].iter().map(|&t| pair[0].lerp(&pair[1], t)));
        }
        stations
    }

    /// Builds the panel mesh.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] for fewer than two sections, zero
    /// panel counts, unordered sections or non-positive chords.
    pub fn build(&self) -> AeroResult<PanelMesh> {
        self.validate()?;

        let nx = self.chordwise_panels;
        let chord_fractions = self.chordwise_distribution.fractions(nx);
        let stations = self.stations();

        let mut nodes = Vec::with_capacity(stations.len() * (nx + 1));
        for station in &stations {
            let quarter = Vec3::new(
                station.offset_x + 0.25 * station.chord,
                station.y,
                station.dihedral_z,
            );
            for &f in &chord_fractions {
                let flat = Vec3::new(
                    station.offset_x + f * station.chord,
                    station.y,
                    station.dihedral_z,
                );
                nodes.push(rotate_about(&flat, &quarter, &Vec3::y(), station.twist_deg));
            }
        }

        let node = |s: usize, i: usize| s * (nx + 1) + i;
        let mut specs = Vec::with_capacity((stations.len() - 1) * nx);
        for s in 0..stations.len() - 1 {
            for i in 0..nx {
                specs.push(PanelSpec {
                    nodes: [node(s, i), node(s, i + 1), node(s + 1, i + 1), node(s + 1, i)],
                    position: SurfacePosition::Mid,
                    is_trailing: i + 1 == nx,
                });
            }
        }

        PanelMesh::new(nodes, &specs)
    }

    /// Planform reference: area, mean aerodynamic chord, span, and a moment
    /// reference at the root quarter-MAC point.
    #[must_use]
    pub fn reference(&self) -> ReferenceDimensions {
        let mut area = 0.0;
        let mut chord_squared = 0.0;
        for pair in self.sections.windows(2) {
            let (c1, c2) = (pair[0].chord, pair[1].chord);
            let dy = pair[1].y - pair[0].y;
            area += 0.5 * (c1 + c2) * dy;
            chord_squared += dy * (c1 * c1 + c1 * c2 + c2 * c2) / 3.0;
        }
        let span = match (self.sections.first(), self.sections.last()) {
            (Some(first), Some(last)) => last.y - first.y,
            _ => 0.0,
        };
        let mac = if area > 0.0 { chord_squared / area } else { 0.0 };
        let root = self
            .sections
            .iter()
            .min_by(|a, b| a.y.abs().total_cmp(&b.y.abs()))
            .copied()
            .unwrap_or_else(|| WingSection::new(0.0, 0.0));

        ReferenceDimensions {
            area,
            chord: mac,
            span,
            cog: Vec3::new(root.offset_x + 0.25 * mac, 0.0, root.dihedral_z),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cosine_fractions_cluster_at_ends() {
        let f = PanelDistribution::Cosine.fractions(4);
        assert_eq!(f.len(), 5);
        assert_relative_eq!(f[0], 0.0);
        assert_relative_eq!(f[2], 0.5, epsilon = 1e-12);
        assert_relative_eq!(f[4], 1.0, epsilon = 1e-12);
        assert!(f[1] < 0.25, "First interval should be short, got {}", f[1]);
    }

    #[test]
    fn test_rectangular_wing_layout() {
        let builder = LiftingSurfaceBuilder::rectangular(8.0, 1.0).with_panels(4, 16);
        let mesh = builder.build().unwrap();

        assert_eq!(mesh.n_panels(), 64);
        assert_eq!(mesh.n_stations(), 16);
        assert_relative_eq!(mesh.wetted_area(), 8.0, epsilon = 1e-10);
        assert!(mesh.is_thin());
        for station in 0..16 {
            let strip = mesh.strip_panels(station);
            assert_eq!(strip.len(), 4, "Station {station} has {} panels", strip.len());
            assert!(mesh.panels()[strip[3]].is_trailing);
            assert!(mesh.panels()[strip[0]].is_leading);
        }

        let reference = builder.reference();
        assert_relative_eq!(reference.area, 8.0, epsilon = 1e-12);
        assert_relative_eq!(reference.chord, 1.0, epsilon = 1e-12);
        assert_relative_eq!(reference.span, 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_twist_raises_leading_edge() {
        let mesh = LiftingSurfaceBuilder::rectangular(2.0, 1.0)
            .with_panels(2, 2)
            .with_twist(5.0)
            .build()
            .unwrap();
        let leading = mesh.nodes()[0];
        let trailing = mesh.nodes()[2];
        assert!(leading.z > 0.0, "Leading edge z = {}", leading.z);
        assert!(trailing.z < 0.0, "Trailing edge z = {}", trailing.z);
    }

    #[test]
    fn test_tapered_reference_chord() {
        let builder = LiftingSurfaceBuilder::new(vec![
            WingSection::new(-1.0, 0.5),
            WingSection::new(0.0, 1.0),
            WingSection::new(1.0, 0.5),
        ]);
        let reference = builder.reference();
        assert_relative_eq!(reference.area, 1.5, epsilon = 1e-12);
        // MAC of a trapezoid: 2/3 c_r (1 + λ + λ²)/(1 + λ) with λ = 0.5
        assert_relative_eq!(reference.chord, 2.0 / 3.0 * 1.75 / 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_unordered_sections_are_rejected() {
        let builder = LiftingSurfaceBuilder::new(vec![
            WingSection::new(1.0, 1.0),
            WingSection::new(-1.0, 1.0),
        ]);
        assert!(builder.build().is_err());
    }
}
