//! Panel Method Aerodynamics Core Library
//!
//! Potential-flow analysis of lifting surfaces built from quadrilateral
//! panels. A sweep of operating points is solved against one influence
//! matrix per point, with a rigid or a vortex-particle wake, and the inviscid
//! loads can be coupled with section polars through a virtual-twist loop.
//!
//! ## Components
//!
//! - [`geometry`]: panels over a shared node array, wing builder
//! - [`solver`]: singularity kernels, influence assembly, batched LU solve
//! - [`wake`]: flat wake columns, vorton rows and their advection
//! - [`forces`]: panel loads, Trefftz plane, coefficients, stability derivatives
//! - [`viscous`]: section polars and the virtual-twist loop
//! - [`task`]: sweep lifecycle, cancellation and progress messages

// Core types and utilities
pub mod config;
pub mod core_types;
pub mod error;

// Analysis modules
pub mod forces;
pub mod geometry;
pub mod solver;
pub mod task;
pub mod viscous;
pub mod wake;

// Re-export core types
pub use config::{
    AnalysisConfig, FluidConfig, GroundEffect, MethodKind, SolverConfig, ViscousConfig,
    WakeConfig, WakeKind,
};
pub use core_types::{Frame, Vec3};
pub use error::{AeroError, AeroResult, ConfigurationError, SolveFailure};

// Re-export analysis types
pub use forces::{AeroForces, ReferenceDimensions, SpanDistribs, StabilityDerivatives};
pub use geometry::{LiftingSurfaceBuilder, PanelMesh, PanelSpec, SurfacePosition};
pub use task::{
    MessageQueue, OperatingPoint, OperatingPointResult, Task, TaskController, TaskMessage,
    TaskStatus,
};
pub use viscous::{LinearPolar, TabulatedPolar, ViscousPolar};
