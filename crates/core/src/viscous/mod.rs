//! Viscous coupling through section polars.
//!
//! [`polar`] defines the section data interface, [`twist`] the virtual-twist
//! iteration that aligns the inviscid station lift with it.

pub mod polar;
pub mod twist;

pub use polar::{
    LinearPolar, PolarLookupError, PolarPoint, ReynoldsTable, TabulatedPolar, ViscousPolar,
};
pub use twist::{TwistLoop, TwistOutcome};
