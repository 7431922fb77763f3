//! Influence kernels of unit-strength quad singularities.
//!
//! Kernels carry no `1/4π` factor: a unit doublet panel is equivalent to a
//! vortex ring of circulation `4π` on its corners, and a unit source panel
//! emits a flux of `4π` per unit area. Velocities are gradients of the
//! matching potentials.
//!
//! Near field (per edge, `a = P - node_i`, `b = P - node_i+1`, `s = node_i+1 - node_i`):
//!
//! ```text
//! Al   = (a·m)(s·l) - (a·l)(s·m)
//! PA   = PN² (s·l) + Al (a·m)          PB = PA - Al (s·m)
//! CJK  = atan2((s·m) PN (|b| PA - |a| PB), PA PB + PN² |a| |b| (s·m)²)
//! GL   = ln|(|a| + |b| + |s|) / (|a| + |b| - |s|)| / |s|
//!
//! doublet potential   φ = -Σ CJK
//! source potential    φ = -Σ (Al GL - PN CJK)
//! source velocity     V =  Σ (n CJK + l (s·m) GL - m (s·l) GL)
//! ```
//!
//! Far field (`|P - C| > RFF · max_size`), with `P` relative to the
//! collocation point `C`:
//!
//! ```text
//! doublet potential   φ = -PN A / |P|³
//! source potential    φ = -A / |P|
//! source velocity     V =  P A / |P|³
//! doublet velocity    V = (3 PN P - n |P|²) A / |P|⁵
//! ```

use crate::core_types::Vec3;
use crate::geometry::QuadGeometry;

/// Fraction of the panel size below which a point counts as lying in the
/// panel plane.
const PLANAR_TOLERANCE: f64 = 1.0e-10;

/// Edges shorter than this are collapsed and contribute nothing.
const MIN_EDGE_LENGTH: f64 = 1.0e-12;

struct EdgeTerms {
    cjk: f64,
    gl: f64,
    al: f64,
    sm: f64,
    sl: f64,
}

/// Per-edge terms of the quad integrals at `point` for normal distance `pn`.
fn edge_terms<'a>(
    quad: &'a QuadGeometry,
    point: &Vec3,
    pn: f64,
) -> impl Iterator<Item = EdgeTerms> + 'a {
    let point = *point;
    (0..4).filter_map(move |edge| {
        let n0 = quad.corners[edge];
        let n1 = quad.corners[(edge + 1) % 4];
        let s = n1 - n0;
        let s_len = s.norm();
        if s_len < MIN_EDGE_LENGTH {
            return None;
        }
        let a = point - n0;
        let b = point - n1;
        let a_len = a.norm();
        let b_len = b.norm();

        let sm = s.dot(&quad.m);
        let sl = s.dot(&quad.l);
        let am = a.dot(&quad.m);
        let al_proj = a.dot(&quad.l);
        let al = am * sl - al_proj * sm;
        let pa = pn * pn * sl + al * am;
        let pb = pa - al * sm;
        let rnum = sm * pn * (b_len * pa - a_len * pb);
        let dnom = pa * pb + pn * pn * a_len * b_len * sm * sm;

        let gap = a_len + b_len - s_len;
        let gl = if gap > MIN_EDGE_LENGTH {
            ((a_len + b_len + s_len) / gap).abs().ln() / s_len
        } else {
            0.0
        };

        Some(EdgeTerms {
            cjk: rnum.atan2(dnom),
            gl,
            al,
            sm,
            sl,
        })
    })
}

/// Normal distance, moved off the plane to the requested side when the
/// point lies in it.
fn normal_distance(quad: &QuadGeometry, offset: &Vec3, interior_side: bool) -> f64 {
    let pn = offset.dot(&quad.normal);
    let tolerance = PLANAR_TOLERANCE * quad.max_size();
    if pn.abs() >= tolerance {
        pn
    } else if interior_side {
        -tolerance
    } else {
        tolerance
    }
}

fn is_far(quad: &QuadGeometry, offset: &Vec3, far_field_factor: f64) -> bool {
    offset.norm() > far_field_factor * quad.max_size()
}

/// Potential of a unit doublet panel.
///
/// Points in the panel plane take the interior limit, so the value at the
/// panel's own collocation point is `2π`.
#[must_use]
pub fn doublet_potential(quad: &QuadGeometry, point: &Vec3, far_field_factor: f64) -> f64 {
    let offset = point - quad.coll_pt;
    if is_far(quad, &offset, far_field_factor) {
        let r = offset.norm();
        return -offset.dot(&quad.normal) * quad.area / (r * r * r);
    }
    let pn = normal_distance(quad, &offset, true);
    -edge_terms(quad, point, pn).map(|t| t.cjk).sum::<f64>()
}

/// Potential of a unit source panel.
#[must_use]
pub fn source_potential(quad: &QuadGeometry, point: &Vec3, far_field_factor: f64) -> f64 {
    let offset = point - quad.coll_pt;
    if is_far(quad, &offset, far_field_factor) {
        return -quad.area / offset.norm();
    }
    let pn = normal_distance(quad, &offset, true);
    -edge_terms(quad, point, pn)
        .map(|t| t.al * t.gl - pn * t.cjk)
        .sum::<f64>()
}

/// Velocity of a unit source panel.
///
/// Points in the panel plane take the exterior limit, `2π·n` at the panel's
/// own collocation point.
#[must_use]
pub fn source_velocity(quad: &QuadGeometry, point: &Vec3, far_field_factor: f64) -> Vec3 {
    let offset = point - quad.coll_pt;
    if is_far(quad, &offset, far_field_factor) {
        let r = offset.norm();
        return offset * (quad.area / (r * r * r));
    }
    let pn = normal_distance(quad, &offset, false);
    edge_terms(quad, point, pn).fold(Vec3::zeros(), |acc, t| {
        acc + quad.normal * t.cjk + quad.l * (t.sm * t.gl) - quad.m * (t.sl * t.gl)
    })
}

/// Velocity of a unit doublet panel: the corner vortex ring near, a point
/// dipole far.
#[must_use]
pub fn doublet_velocity(
    quad: &QuadGeometry,
    point: &Vec3,
    far_field_factor: f64,
    core_radius: f64,
) -> Vec3 {
    let offset = point - quad.coll_pt;
    if is_far(quad, &offset, far_field_factor) {
        let r2 = offset.norm_squared();
        let pn = offset.dot(&quad.normal);
        let r5 = r2 * r2 * r2.sqrt();
        return (offset * (3.0 * pn) - quad.normal * r2) * (quad.area / r5);
    }
    ring_velocity(&quad.corners, point, core_radius)
}

/// Velocity of a closed ring `c0 → c1 → c2 → c3 → c0` of circulation `4π`.
#[must_use]
pub fn ring_velocity(corners: &[Vec3; 4], point: &Vec3, core_radius: f64) -> Vec3 {
    (0..4).fold(Vec3::zeros(), |acc, i| {
        acc + segment_velocity(&corners[i], &corners[(i + 1) % 4], point, core_radius)
    })
}

/// Velocity of a straight vortex segment `a → b` of circulation `4π`.
///
/// The core radius smooths the singularity on the segment line. Points on a
/// vertex and zero-length segments induce nothing.
#[must_use]
pub fn segment_velocity(a: &Vec3, b: &Vec3, point: &Vec3, core_radius: f64) -> Vec3 {
    let r0 = b - a;
    let r1 = point - a;
    let r2 = point - b;
    let r0_sq = r0.norm_squared();
    let r1_len = r1.norm();
    let r2_len = r2.norm();
    if r0_sq < MIN_EDGE_LENGTH * MIN_EDGE_LENGTH
        || r1_len < MIN_EDGE_LENGTH
        || r2_len < MIN_EDGE_LENGTH
    {
        return Vec3::zeros();
    }

    let h = r1.cross(&r2);
    let denominator = h.norm_squared() + core_radius * core_radius * r0_sq;
    if denominator < f64::MIN_POSITIVE {
        return Vec3::zeros();
    }
    h * (r0.dot(&(r1 / r1_len - r2 / r2_len)) / denominator)
}

/// Lengths and mirror plane shared by all kernel evaluations of one
/// operating point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelSettings {
    pub far_field_factor: f64,
    /// Vortex segment core radius (m)
    pub core_radius: f64,
    /// Vorton mollification radius (m)
    pub vorton_core: f64,
    /// Plane height and image coefficient.
    pub mirror: Option<(f64, f64)>,
}

impl KernelSettings {
    /// Velocity of `field` at `point` plus its mirror image, if any.
    pub fn with_mirror(&self, point: &Vec3, field: impl Fn(&Vec3) -> Vec3) -> Vec3 {
        let direct = field(point);
        match self.mirror {
            Some((height, coef)) => {
                direct + mirror_vector(&field(&mirror_point(point, height))) * coef
            }
            None => direct,
        }
    }

    /// Potential of `field` at `point` plus its mirror image, if any.
    pub fn with_mirror_potential(&self, point: &Vec3, field: impl Fn(&Vec3) -> f64) -> f64 {
        let direct = field(point);
        match self.mirror {
            Some((height, coef)) => direct + coef * field(&mirror_point(point, height)),
            None => direct,
        }
    }
}

/// Mirror of a point in the plane `z = -height`.
#[must_use]
pub fn mirror_point(point: &Vec3, height: f64) -> Vec3 {
    Vec3::new(point.x, point.y, -point.z - 2.0 * height)
}

/// Mirror of a velocity vector in a horizontal plane.
#[must_use]
pub fn mirror_vector(v: &Vec3) -> Vec3 {
    Vec3::new(v.x, v.y, -v.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use std::f64::consts::PI;

    const NEAR_ONLY: f64 = f64::INFINITY;

    fn quad(corners: [[f64; 3]; 4]) -> QuadGeometry {
        QuadGeometry::new(corners.map(|c| Vec3::new(c[0], c[1], c[2])))
    }

    fn unit_square() -> QuadGeometry {
        quad([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]])
    }

    /// Unit cube with outward normals.
    fn cube() -> Vec<QuadGeometry> {
        vec![
            quad([[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]]),
            quad([[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0], [1.0, 0.0, 0.0]]),
            quad([[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0], [1.0, 0.0, 1.0]]),
            quad([[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0]]),
            quad([[0.0, 1.0, 0.0], [0.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0]]),
            quad([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]]),
        ]
    }

    #[test]
    fn test_closed_body_doublet_potential() {
        let faces = cube();
        let inside: f64 = faces
            .iter()
            .map(|f| doublet_potential(f, &Vec3::new(0.3, 0.6, 0.4), NEAR_ONLY))
            .sum();
        let outside: f64 = faces
            .iter()
            .map(|f| doublet_potential(f, &Vec3::new(2.3, 0.6, 0.4), NEAR_ONLY))
            .sum();

        assert_relative_eq!(inside, 4.0 * PI, epsilon = 1e-10);
        assert_abs_diff_eq!(outside, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_self_influence_limits() {
        let q = unit_square();
        assert_relative_eq!(doublet_potential(&q, &q.coll_pt, 7.0), 2.0 * PI, epsilon = 1e-9);
        assert_relative_eq!(
            source_velocity(&q, &q.coll_pt, 7.0),
            Vec3::z() * (2.0 * PI),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_far_field_matches_near_field_at_ten_sizes() {
        let q = unit_square();
        for direction in [
            Vec3::new(1.0, 0.3, 0.7),
            Vec3::new(0.2, -1.0, 0.4),
            Vec3::new(0.5, 0.5, 1.0),
        ] {
            let point = q.coll_pt + direction.normalize() * (10.0 * q.max_size());

            let near = doublet_potential(&q, &point, NEAR_ONLY);
            let far = doublet_potential(&q, &point, 7.0);
            assert_relative_eq!(near, far, max_relative = 0.02);

            let near = source_potential(&q, &point, NEAR_ONLY);
            let far = source_potential(&q, &point, 7.0);
            assert_relative_eq!(near, far, max_relative = 0.02);

            let near = source_velocity(&q, &point, NEAR_ONLY);
            let far = source_velocity(&q, &point, 7.0);
            assert!((near - far).norm() < 0.02 * near.norm(), "{near} vs {far}");

            let near = doublet_velocity(&q, &point, NEAR_ONLY, 0.0);
            let far = doublet_velocity(&q, &point, 7.0, 0.0);
            assert!((near - far).norm() < 0.02 * near.norm(), "{near} vs {far}");
        }
    }

    #[test]
    fn test_velocities_are_potential_gradients() {
        let panel = quad([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.1, 1.0, 0.0], [0.0, 1.2, 0.0]]);
        let point = Vec3::new(0.7, 0.3, 0.4);
        let gradient = |potential: &dyn Fn(&Vec3) -> f64| {
            let step_size = 1.0e-6;
            Vec3::from_fn(|axis, _| {
                let mut step = Vec3::zeros();
                step[axis] = step_size;
                (potential(&(point + step)) - potential(&(point - step))) / (2.0 * step_size)
            })
        };

        let doublet = gradient(&|x| doublet_potential(&panel, x, NEAR_ONLY));
        assert_relative_eq!(
            doublet,
            doublet_velocity(&panel, &point, NEAR_ONLY, 0.0),
            epsilon = 1e-6
        );

        let source = gradient(&|x| source_potential(&panel, x, NEAR_ONLY));
        assert_relative_eq!(
            source,
            source_velocity(&panel, &point, NEAR_ONLY),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_segment_velocity_degenerate_cases() {
        let a = Vec3::zeros();
        let b = Vec3::x();
        assert_eq!(segment_velocity(&a, &b, &a, 0.0), Vec3::zeros());
        assert_eq!(segment_velocity(&a, &a, &Vec3::y(), 0.0), Vec3::zeros());

        let on_line = segment_velocity(&a, &b, &Vec3::new(0.5, 0.0, 0.0), 0.0);
        assert!(on_line.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_infinite_line_limit() {
        // Long segment along x with circulation 4π: |V| = 4π/(2π d) = 2/d
        let v = segment_velocity(
            &Vec3::new(-1.0e4, 0.0, 0.0),
            &Vec3::new(1.0e4, 0.0, 0.0),
            &Vec3::new(0.0, 0.0, 0.5),
            0.0,
        );
        assert_relative_eq!(v.norm(), 4.0, max_relative = 1e-6);
        assert!(v.y < 0.0, "Expected -y swirl above a +x vortex, got {v}");
    }

    #[test]
    fn test_mirror_point() {
        let p = mirror_point(&Vec3::new(1.0, 2.0, 0.5), 1.0);
        assert_relative_eq!(p, Vec3::new(1.0, 2.0, -2.5));
    }
}
