//! Error taxonomy for the aerodynamic analysis.
//!
//! Only [`AeroError::Configuration`] stops a sweep. Solve and viscous failures
//! are recovered per operating point and reported on the result record.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type AeroResult<T> = Result<T, AeroError>;

/// Top-level analysis error.
#[derive(Debug, Error)]
pub enum AeroError {
    /// Invalid input detected before any solve.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The influence system could not be solved for one operating point.
    #[error("solve failure: {0}")]
    Solve(#[from] SolveFailure),

    /// The virtual-twist loop failed at one span station.
    #[error("viscous loop failed at station {station} after {iterations} iterations: {reason}")]
    ViscousConvergence {
        station: usize,
        iterations: usize,
        reason: String,
    },
}

impl AeroError {
    /// Whether the error stops the whole sweep.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Whether the error is the internal cancellation marker.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Solve(SolveFailure::Cancelled))
    }
}

/// Invalid geometry, reference dimensions or settings.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("invalid reference dimension {name} = {value}")]
    InvalidReference { name: &'static str, value: f64 },

    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("panel {panel} references node {node} but only {n_nodes} nodes exist")]
    NodeIndexOutOfRange {
        panel: usize,
        node: usize,
        n_nodes: usize,
    },

    #[error("panel {panel} is degenerate (diagonal cross ratio {ratio:.3e})")]
    DegeneratePanel { panel: usize, ratio: f64 },

    #[error("mesh has no panels")]
    EmptyMesh,
}

/// Failure of the linear solve for one operating point.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolveFailure {
    #[error("influence matrix is singular (pivot ratio {pivot_ratio:.3e})")]
    SingularMatrix { pivot_ratio: f64 },

    #[error("non-finite influence coefficient at row {row}, column {col}")]
    NumericalError { row: usize, col: usize },

    /// Cancellation observed inside the solve path. Never reported as a fault.
    #[error("cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_configuration_errors_are_fatal() {
        let config: AeroError = ConfigurationError::EmptyMesh.into();
        let solve: AeroError = SolveFailure::SingularMatrix { pivot_ratio: 0.0 }.into();
        let viscous = AeroError::ViscousConvergence {
            station: 3,
            iterations: 35,
            reason: "not converged".to_string(),
        };

        assert!(config.is_fatal());
        assert!(!solve.is_fatal());
        assert!(!viscous.is_fatal());
    }

    #[test]
    fn test_error_messages_name_the_station() {
        let err = AeroError::ViscousConvergence {
            station: 7,
            iterations: 12,
            reason: "alpha out of range".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("station 7"), "Unexpected message: {text}");
        assert!(text.contains("alpha out of range"), "Unexpected message: {text}");
    }

    #[test]
    fn test_cancellation_marker() {
        let err: AeroError = SolveFailure::Cancelled.into();
        assert!(err.is_cancellation());
        assert!(!err.is_fatal());
    }
}
