//! Operating points and their results.

use crate::error::ConfigurationError;
use crate::forces::{AeroForces, ReferenceDimensions, SpanDistribs, StabilityDerivatives};
use crate::wake::VortonRow;
use serde::{Deserialize, Serialize};

/// One flight condition of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatingPoint {
    /// Angle of attack (degrees)
    pub alpha: f64,
    /// Sideslip angle (degrees)
    pub beta: f64,
    /// Bank angle (degrees)
    pub phi: f64,
    /// Control value that labels the point in a control sweep.
    pub control: f64,
    /// Freestream speed (m/s)
    pub qinf: f64,
}

impl OperatingPoint {
    #[must_use]
    pub fn new(alpha: f64, qinf: f64) -> Self {
        Self {
            alpha,
            beta: 0.0,
            phi: 0.0,
            control: 0.0,
            qinf,
        }
    }

    #[must_use]
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    #[must_use]
    pub fn with_bank(mut self, phi: f64) -> Self {
        self.phi = phi;
        self
    }

    #[must_use]
    pub fn with_control(mut self, control: f64) -> Self {
        self.control = control;
        self
    }

    /// Rejects non-finite angles and a non-positive speed.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::InvalidParameter`] naming the bad field.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("alpha", self.alpha),
            ("beta", self.beta),
            ("phi", self.phi),
            ("control", self.control),
        ] {
            if !value.is_finite() {
                return Err(ConfigurationError::InvalidParameter {
                    name,
                    value,
                    reason: "must be finite",
                });
            }
        }
        if !(self.qinf.is_finite() && self.qinf > 0.0) {
            return Err(ConfigurationError::InvalidParameter {
                name: "qinf",
                value: self.qinf,
                reason: "must be positive",
            });
        }
        Ok(())
    }
}

/// Converged or best-effort snapshot of one operating point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingPointResult {
    pub point: OperatingPoint,
    /// Doublet strength per panel
    pub mu: Vec<f64>,
    /// Source strength per panel
    pub sigma: Vec<f64>,
    /// Pressure coefficient per panel
    pub cp: Vec<f64>,
    pub forces: AeroForces,
    pub span: SpanDistribs,
    pub stability: Option<StabilityDerivatives>,
    /// Vorton rows at the end of the wake iterations.
    pub vortons: Option<Vec<VortonRow>>,
    /// Virtual twist per station (degrees)
    pub virtual_twist: Vec<f64>,
    pub viscous_iterations: usize,
    pub converged: bool,
    pub warnings: Vec<String>,
}

impl OperatingPointResult {
    /// Record of a point whose solve failed.
    #[must_use]
    pub fn failed(
        point: OperatingPoint,
        reference: ReferenceDimensions,
        density: f64,
        warning: String,
    ) -> Self {
        Self {
            point,
            mu: Vec::new(),
            sigma: Vec::new(),
            cp: Vec::new(),
            forces: AeroForces::new(reference, density, point.qinf, point.alpha, point.beta),
            span: SpanDistribs::default(),
            stability: None,
            vortons: None,
            virtual_twist: Vec::new(),
            viscous_iterations: 0,
            converged: false,
            warnings: vec![warning],
        }
    }
}
