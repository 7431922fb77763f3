//! Influence matrix assembly and linear solution of the surface strengths.
//!
//! The core abstraction is the [`AnalysisMethod`] trait, with a ring vortex
//! lattice and a quad doublet/source implementation. Both share the kernels
//! in [`kernels`], the parallel row assembly in [`assembly`] and the LU
//! factorization in [`linear`].
//!
//! # Example
//!
//! ```rust,ignore
//! use panel_aero_core::config::MethodKind;
//! use panel_aero_core::solver::create_analysis_method;
//!
//! let method = create_analysis_method(MethodKind::Vlm);
//! let system = method.assemble_influence(&mesh, &wake, &settings, true)?;
//! ```

pub mod assembly;
pub mod kernels;
pub mod linear;
pub mod profiler;
pub mod quad;
#[allow(clippy::module_name_repetitions)]
mod r#trait;
pub mod vlm;

// Re-exports
pub use kernels::KernelSettings;
pub use linear::{BatchSolution, LinearSystem, SINGULAR_PIVOT_RATIO};
pub use profiler::ProfilerScope;
pub use quad::QuadPanelMethod;
pub use r#trait::AnalysisMethod;
pub use vlm::VortexLatticeMethod;

use crate::config::MethodKind;
use tracing::info;

/// Creates the analysis method for one operating point.
///
/// # Arguments
///
/// * `kind` - Selected singularity formulation
///
/// # Returns
///
/// A boxed `AnalysisMethod` trait object
pub fn create_analysis_method(kind: MethodKind) -> Box<dyn AnalysisMethod> {
    match kind {
        MethodKind::Vlm => {
            info!("Using ring vortex lattice method");
            Box::new(VortexLatticeMethod)
        }
        MethodKind::Panel => {
            info!("Using quad doublet/source panel method");
            Box::new(QuadPanelMethod)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_selects_kind() {
        assert_eq!(create_analysis_method(MethodKind::Vlm).kind(), MethodKind::Vlm);
        assert_eq!(
            create_analysis_method(MethodKind::Panel).kind(),
            MethodKind::Panel
        );
    }
}
