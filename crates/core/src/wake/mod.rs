//! Wake models behind the trailing edges.
//!
//! Two exclusive strategies are available: a rigid [`FlatWake`] and a
//! [`ParticleWake`] made of release rings and advected vortons. Both expose
//! the same ring columns to the influence matrix and the same velocity query
//! to the force integrator.

pub mod advection;
pub mod flat;
pub mod particle;
pub mod vorton;

pub use advection::AdvectionEngine;
pub use flat::{segment_lengths, FlatWake, WakeColumn, WakePanel};
pub use particle::{ParticleWake, VORTON_MERGE_DISTANCE};
pub use vorton::{mollification_factor, NegatingVortex, Vorton, VortonRow, MOLLIFIER_EXPONENT};

use crate::core_types::Vec3;
use crate::solver::kernels::KernelSettings;

/// Velocity field of a wake for given column strengths.
pub trait InducedVelocity {
    /// Velocity at `point` with column doublet strengths `strengths`.
    fn induced_velocity(&self, point: &Vec3, strengths: &[f64], settings: &KernelSettings) -> Vec3;
}

/// Wake representation of one operating point.
#[derive(Debug, Clone, PartialEq)]
pub enum WakeModel {
    Flat(FlatWake),
    Particle(ParticleWake),
}

impl WakeModel {
    /// Ring columns entering the influence matrix.
    #[must_use]
    pub fn columns(&self) -> &[WakeColumn] {
        match self {
            Self::Flat(flat) => &flat.columns,
            Self::Particle(particle) => &particle.release,
        }
    }

    /// Velocity of the wake parts whose strengths are already known: the
    /// vortons and negating vortices. Zero for a flat wake.
    #[must_use]
    pub fn free_velocity(&self, point: &Vec3, settings: &KernelSettings) -> Vec3 {
        match self {
            Self::Flat(_) => Vec3::zeros(),
            Self::Particle(particle) => {
                particle.vorton_velocity(point, settings)
                    + particle.negating_velocity(point, settings)
            }
        }
    }

    #[must_use]
    pub fn as_particle(&self) -> Option<&ParticleWake> {
        match self {
            Self::Particle(particle) => Some(particle),
            Self::Flat(_) => None,
        }
    }

    pub fn as_particle_mut(&mut self) -> Option<&mut ParticleWake> {
        match self {
            Self::Particle(particle) => Some(particle),
            Self::Flat(_) => None,
        }
    }
}

impl InducedVelocity for WakeModel {
    fn induced_velocity(&self, point: &Vec3, strengths: &[f64], settings: &KernelSettings) -> Vec3 {
        let rings = self
            .columns()
            .iter()
            .zip(strengths)
            .fold(Vec3::zeros(), |acc, (column, &strength)| {
                acc + column.unit_velocity(point, settings) * strength
            });
        rings + self.free_velocity(point, settings)
    }
}
