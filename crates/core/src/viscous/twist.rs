//! Virtual-twist coupling of the inviscid solution with section polars.
//!
//! Each station receives an extra incidence `γ` so that its inviscid lift
//! matches the section polar at the station's effective angle:
//!
//! ```text
//! Re    = c Q∞ / ν
//! α_eff = α0(Re) + (Cl_inv / 2π)·(180/π) - γ
//! δ     = (Cl_polar(α_eff) - Cl_inv) / 2π · (180/π)
//! γ    += relaxation · δ          until max|δ| < precision
//! ```

use super::polar::{PolarLookupError, ViscousPolar};
use crate::config::ViscousConfig;
use crate::error::{AeroError, AeroResult};
use crate::forces::StationViscous;
use crate::task::CancellationToken;
use std::f64::consts::PI;
use tracing::{debug, warn};

/// Result of the twist iteration for one operating point.
#[derive(Debug)]
pub struct TwistOutcome {
    /// Virtual twist per station (degrees)
    pub twist: Vec<f64>,
    pub stations: Vec<StationViscous>,
    /// Number of inviscid solutions performed.
    pub iterations: usize,
    /// Largest station correction of the last iteration (degrees)
    pub error: f64,
    pub converged: bool,
    /// Recovered failure, reported on the result.
    pub failure: Option<AeroError>,
}

/// Fixed-point iteration on the station twist.
pub struct TwistLoop<'a> {
    polar: &'a dyn ViscousPolar,
    config: &'a ViscousConfig,
    qinf: f64,
}

impl<'a> TwistLoop<'a> {
    #[must_use]
    pub fn new(polar: &'a dyn ViscousPolar, config: &'a ViscousConfig, qinf: f64) -> Self {
        Self {
            polar,
            config,
            qinf,
        }
    }

    /// Chord Reynolds number.
    #[must_use]
    pub fn reynolds(&self, chord: f64) -> f64 {
        chord * self.qinf / self.config.kinematic_viscosity
    }

    /// Runs the loop.
    ///
    /// # Arguments
    ///
    /// * `chords` - Station chords (m)
    /// * `initial` - Starting twist per station (degrees)
    /// * `token` - Polled before each iteration
    /// * `solve` - Inviscid station lift coefficients for a twist array
    ///
    /// # Errors
    ///
    /// Cancellation and solve failures from `solve`. Polar lookup failures
    /// and missed precision are returned in [`TwistOutcome::failure`].
    pub fn run<F>(
        &self,
        chords: &[f64],
        initial: Vec<f64>,
        token: &CancellationToken,
        mut solve: F,
    ) -> AeroResult<TwistOutcome>
    where
        F: FnMut(&[f64]) -> AeroResult<Vec<f64>>,
    {
        let mut twist = initial;
        twist.resize(chords.len(), 0.0);
        let max_iterations = self.config.max_iterations.max(1);
        let mut stations = vec![StationViscous::default(); chords.len()];
        let mut error = 0.0;
        let mut worst = 0;

        for iteration in 1..=max_iterations {
            token.check()?;
            let lift = solve(&twist)?;

            let mut deltas = Vec::with_capacity(chords.len());
            error = 0.0;
            for (station, (&chord, &cl_inv)) in chords.iter().zip(&lift).enumerate() {
                match self.station_update(station, chord, cl_inv, twist[station]) {
                    Ok((state, delta)) => {
                        stations[station] = state;
                        deltas.push(delta);
                        if delta.abs() > error {
                            error = delta.abs();
                            worst = station;
                        }
                    }
                    Err(lookup) => {
                        warn!(
                            "Viscous loop stopped at station {} (chord {:.4} m): {}",
                            station, chord, lookup
                        );
                        stations[station].out_of_range = true;
                        return Ok(TwistOutcome {
                            twist,
                            stations,
                            iterations: iteration,
                            error,
                            converged: false,
                            failure: Some(AeroError::ViscousConvergence {
                                station,
                                iterations: iteration,
                                reason: lookup.to_string(),
                            }),
                        });
                    }
                }
            }
            debug!(
                "Viscous iteration {}: largest twist correction {:.5}°",
                iteration, error
            );

            if error < self.config.precision {
                return Ok(TwistOutcome {
                    twist,
                    stations,
                    iterations: iteration,
                    error,
                    converged: true,
                    failure: None,
                });
            }
            if iteration == max_iterations {
                break;
            }
            for (gamma, delta) in twist.iter_mut().zip(&deltas) {
                *gamma += self.config.relaxation * delta;
            }
        }

        warn!(
            "Viscous loop not converged after {} iterations, error {:.4}°",
            max_iterations, error
        );
        Ok(TwistOutcome {
            twist,
            stations,
            iterations: max_iterations,
            error,
            converged: false,
            failure: Some(AeroError::ViscousConvergence {
                station: worst,
                iterations: max_iterations,
                reason: format!(
                    "correction {:.4}° above precision {:.4}°",
                    error, self.config.precision
                ),
            }),
        })
    }

    fn station_update(
        &self,
        station: usize,
        chord: f64,
        cl_inv: f64,
        gamma: f64,
    ) -> Result<(StationViscous, f64), PolarLookupError> {
        let re = self.reynolds(chord);
        let alpha0 = self.polar.zero_lift_angle(station, re);
        let alpha_eff = alpha0 + (cl_inv / (2.0 * PI)).to_degrees() - gamma;
        let point = self.polar.at_alpha(station, re, alpha_eff)?;
        let delta = ((point.cl - cl_inv) / (2.0 * PI)).to_degrees();
        let state = StationViscous {
            reynolds: re,
            virtual_twist: gamma,
            alpha0,
            cd: point.cd,
            transition_top: point.xtr_top,
            transition_bottom: point.xtr_bottom,
            out_of_range: false,
        };
        Ok((state, delta))
    }

    /// Section drag and transition from the polar at the inviscid station
    /// lift, without any twist correction.
    ///
    /// # Returns
    ///
    /// The station states and a message per station outside the polar.
    #[must_use]
    pub fn sections_at_lift(
        &self,
        chords: &[f64],
        lift: &[f64],
    ) -> (Vec<StationViscous>, Vec<String>) {
        let mut warnings = Vec::new();
        let stations = chords
            .iter()
            .zip(lift)
            .enumerate()
            .map(|(station, (&chord, &cl))| {
                let re = self.reynolds(chord);
                let alpha0 = self.polar.zero_lift_angle(station, re);
                match self.polar.at_cl(station, re, cl) {
                    Ok(point) => StationViscous {
                        reynolds: re,
                        virtual_twist: 0.0,
                        alpha0,
                        cd: point.cd,
                        transition_top: point.xtr_top,
                        transition_bottom: point.xtr_bottom,
                        out_of_range: false,
                    },
                    Err(lookup) => {
                        warnings.push(format!("station {station}: {lookup}"));
                        StationViscous {
                            reynolds: re,
                            alpha0,
                            out_of_range: true,
                            ..StationViscous::default()
                        }
                    }
                }
            })
            .collect();
        (stations, warnings)
    }
}
