//! Time marching of the vorton rows.
//!
//! Midpoint rule with `dt = l0 / Q∞`:
//!
//! ```text
//! V1 = U(P0)
//! P½ = P0 + (V∞ + V1) dt/2
//! V2 = U(P½)
//! P1 = P0 + (V∞ + V2) dt
//! ```
//!
//! `U` reads only the step-n snapshot. Rows are advanced into a back buffer,
//! in parallel when enabled, and the buffer is published once every row is
//! done.

use super::vorton::{Vorton, VortonRow};
use crate::core_types::Vec3;
use crate::solver::ProfilerScope;
use rayon::prelude::*;
use tracing::{debug, warn};

/// Settings and step size of the vorton integrator.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvectionEngine {
    dt: f64,
    max_length: f64,
    multithread: bool,
}

impl AdvectionEngine {
    /// # Arguments
    ///
    /// * `step_length` - Release step `l0` (m)
    /// * `qinf` - Freestream speed (m/s)
    /// * `max_length` - Truncation distance from the release point (m)
    /// * `multithread` - Advance rows on the rayon pool
    /// * `stretching` - Reserved strength update, only reported
    #[must_use]
    pub fn new(
        step_length: f64,
        qinf: f64,
        max_length: f64,
        multithread: bool,
        stretching: bool,
    ) -> Self {
        if stretching {
            warn!("Vorton stretching is not implemented, strengths are kept constant");
        }
        Self {
            dt: step_length / qinf,
            max_length,
            multithread,
        }
    }

    /// Time step (s)
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Advances every active vorton of `front` by one step.
    ///
    /// # Arguments
    ///
    /// * `front` - Current rows, read only
    /// * `freestream` - Freestream velocity vector
    /// * `field` - Induced velocity of the step-n system, without freestream
    ///
    /// # Returns
    ///
    /// The advected rows, to be published in place of `front`.
    pub fn advance<F>(&self, front: &[VortonRow], freestream: &Vec3, field: &F) -> Vec<VortonRow>
    where
        F: Fn(&Vec3) -> Vec3 + Sync,
    {
        let active = front.iter().map(|row| row.active().count()).sum();
        let _scope = ProfilerScope::new("vorton advection", active);
        let mut back = front.to_vec();

        let advance_row = |row: &mut VortonRow| {
            for vorton in row.vortons.iter_mut().filter(|v| v.is_active()) {
                self.advance_vorton(vorton, freestream, field);
            }
        };
        if self.multithread {
            back.par_iter_mut().for_each(advance_row);
        } else {
            back.iter_mut().for_each(advance_row);
        }

        debug!(
            "Advected {} rows, {} active vortons",
            back.len(),
            back.iter().map(|r| r.active().count()).sum::<usize>()
        );
        back
    }

    fn advance_vorton<F>(&self, vorton: &mut Vorton, freestream: &Vec3, field: &F)
    where
        F: Fn(&Vec3) -> Vec3,
    {
        let start = vorton.position;
        let v1 = field(&start);
        let half = start + (freestream + v1) * (0.5 * self.dt);
        let v2 = field(&half);
        vorton.position = start + (freestream + v2) * self.dt;
        vorton.age += 1;
        if vorton.travelled() > self.max_length {
            vorton.deactivate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn row(y: f64) -> VortonRow {
        VortonRow {
            vortons: vec![
                Vorton::new(Vec3::new(0.0, y, 0.0), Vec3::x()),
                Vorton::new(Vec3::new(0.0, y + 1.0, 0.0), -Vec3::x()),
            ],
        }
    }

    #[test]
    fn test_uniform_field_translates_rows() {
        let engine = AdvectionEngine::new(0.5, 10.0, 100.0, false, false);
        let rows = vec![row(0.0)];
        let advected = engine.advance(&rows, &Vec3::new(10.0, 0.0, 0.0), &|_: &Vec3| {
            Vec3::new(0.0, 0.0, -1.0)
        });

        assert_relative_eq!(engine.dt(), 0.05);
        assert_relative_eq!(
            advected[0].vortons[0].position,
            Vec3::new(0.5, 0.0, -0.05),
            epsilon = 1e-12
        );
        assert_eq!(advected[0].vortons[0].age, 1);
        // Front buffer untouched
        assert_eq!(rows[0].vortons[0].position, Vec3::zeros());
    }

    #[test]
    fn test_midpoint_rule_uses_half_step_velocity() {
        let engine = AdvectionEngine::new(1.0, 1.0, 100.0, false, false);
        // Velocity proportional to x: exact midpoint value for one step
        let field = |p: &Vec3| Vec3::new(p.x, 0.0, 0.0);
        let advected = engine.advance(&[row(0.0)], &Vec3::x(), &field);
        // P½ = 0.5, V2 = 1 + 0.5, P1 = 1.5
        assert_relative_eq!(advected[0].vortons[0].position.x, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_truncation_deactivates() {
        let engine = AdvectionEngine::new(1.0, 1.0, 2.5, false, false);
        let mut rows = vec![row(0.0)];
        let mut was_inactive = false;
        for _ in 0..5 {
            rows = engine.advance(&rows, &Vec3::x(), &|_: &Vec3| Vec3::zeros());
            let active = rows[0].vortons[0].is_active();
            assert!(!(was_inactive && active), "Vorton re-activated");
            was_inactive |= !active;
        }
        assert!(was_inactive);
        // Inactive vortons stop moving
        assert_relative_eq!(rows[0].vortons[0].position.x, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let rows: Vec<VortonRow> = (0..8_u32).map(|k| row(f64::from(k) * 2.0)).collect();
        let field = |p: &Vec3| Vec3::new(0.1 * p.y.sin(), 0.05 * p.x, -0.2 * p.y.cos());
        let serial = AdvectionEngine::new(0.3, 2.0, 50.0, false, false);
        let parallel = AdvectionEngine::new(0.3, 2.0, 50.0, true, false);

        let a = serial.advance(&rows, &Vec3::new(2.0, 0.0, 0.1), &field);
        let b = parallel.advance(&rows, &Vec3::new(2.0, 0.0, 0.1), &field);
        assert_eq!(a, b);
    }
}
