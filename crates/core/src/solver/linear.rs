//! Dense LU factorization with batched right-hand sides.

use crate::error::{AeroResult, SolveFailure};
use nalgebra::{DMatrix, Dyn, LU};
use tracing::debug;

/// Smallest accepted ratio between the smallest and largest LU pivot.
pub const SINGULAR_PIVOT_RATIO: f64 = 1.0e-13;

/// Factorized influence system.
pub struct LinearSystem {
    lu: LU<f64, Dyn, Dyn>,
    size: usize,
    pivot_ratio: f64,
    /// Source influence on each boundary condition, when sources are present.
    source_influence: Option<DMatrix<f64>>,
}

/// Strengths for every right-hand side of a batch solve.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSolution {
    /// One strength array per right-hand side, each of system size.
    pub strengths: Vec<Vec<f64>>,
    pub n_batches: usize,
    /// Largest number of right-hand sides solved together.
    pub widest_batch: usize,
}

impl LinearSystem {
    /// Factorizes a square influence matrix.
    ///
    /// # Errors
    ///
    /// [`SolveFailure::SingularMatrix`] when a pivot is zero or negligible
    /// against the largest one.
    pub fn factorize(matrix: DMatrix<f64>) -> AeroResult<Self> {
        let size = matrix.nrows();
        let lu = matrix.lu();
        let pivots = lu.u().diagonal().map(f64::abs);
        let largest = pivots.max();
        let smallest = pivots.min();
        let pivot_ratio = if largest > 0.0 { smallest / largest } else { 0.0 };

        if !(pivot_ratio.is_finite() && pivot_ratio >= SINGULAR_PIVOT_RATIO) {
            return Err(SolveFailure::SingularMatrix { pivot_ratio }.into());
        }
        debug!("Factorized {}x{} system, pivot ratio {:.3e}", size, size, pivot_ratio);

        Ok(Self {
            lu,
            size,
            pivot_ratio,
            source_influence: None,
        })
    }

    /// Attaches the source influence matrix used to build right-hand sides.
    #[must_use]
    pub fn with_source_influence(mut self, source: DMatrix<f64>) -> Self {
        self.source_influence = Some(source);
        self
    }

    #[must_use]
    pub fn source_influence(&self) -> Option<&DMatrix<f64>> {
        self.source_influence.as_ref()
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn pivot_ratio(&self) -> f64 {
        self.pivot_ratio
    }

    /// Solves all right-hand sides against the single factorization, at most
    /// `max_rhs` at a time.
    ///
    /// Every right-hand side must have [`Self::size`] entries.
    ///
    /// # Errors
    ///
    /// [`SolveFailure::SingularMatrix`] if the back substitution fails,
    /// [`SolveFailure::NumericalError`] for a non-finite strength.
    pub fn solve_batch(&self, rhs: &[Vec<f64>], max_rhs: usize) -> AeroResult<BatchSolution> {
        let width = max_rhs.max(1);
        let mut strengths = Vec::with_capacity(rhs.len());
        let mut n_batches = 0;
        let mut widest_batch = 0;

        for (batch, chunk) in rhs.chunks(width).enumerate() {
            let block = DMatrix::from_fn(self.size, chunk.len(), |row, col| chunk[col][row]);
            let solved = self.lu.solve(&block).ok_or(SolveFailure::SingularMatrix {
                pivot_ratio: self.pivot_ratio,
            })?;
            for (offset, column) in solved.column_iter().enumerate() {
                if let Some(row) = column.iter().position(|v| !v.is_finite()) {
                    return Err(SolveFailure::NumericalError {
                        row,
                        col: batch * width + offset,
                    }
                    .into());
                }
                strengths.push(column.iter().copied().collect());
            }
            n_batches += 1;
            widest_batch = widest_batch.max(chunk.len());
        }

        Ok(BatchSolution {
            strengths,
            n_batches,
            widest_batch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn system() -> DMatrix<f64> {
        DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.5, 1.0, 3.0, 0.2, 0.5, 0.2, 2.0])
    }

    #[test]
    fn test_batches_respect_max_rhs() {
        let lu = LinearSystem::factorize(system()).unwrap();
        let rhs: Vec<Vec<f64>> = (0..7_u32).map(|k| vec![f64::from(k), 1.0, -1.0]).collect();

        let solution = lu.solve_batch(&rhs, 3).unwrap();
        assert_eq!(solution.strengths.len(), 7);
        assert_eq!(solution.n_batches, 3);
        assert_eq!(solution.widest_batch, 3);
        assert!(solution.strengths.iter().all(|s| s.len() == 3));
    }

    #[test]
    fn test_batch_width_does_not_change_strengths() {
        let lu = LinearSystem::factorize(system()).unwrap();
        let rhs: Vec<Vec<f64>> = (0..5_u32)
            .map(|k| vec![1.0, f64::from(k), 0.5 * f64::from(k)])
            .collect();

        let one = lu.solve_batch(&rhs, 1).unwrap();
        let all = lu.solve_batch(&rhs, 100).unwrap();
        assert_eq!(one.n_batches, 5);
        assert_eq!(all.n_batches, 1);
        for (a, b) in one.strengths.iter().zip(&all.strengths) {
            for (x, y) in a.iter().zip(b) {
                assert_relative_eq!(x, y, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_solution_satisfies_system() {
        let matrix = system();
        let lu = LinearSystem::factorize(matrix.clone()).unwrap();
        let solution = lu.solve_batch(&[vec![1.0, 2.0, 3.0]], 10).unwrap();
        let x = nalgebra::DVector::from_vec(solution.strengths[0].clone());
        let residual = matrix * x - nalgebra::DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(residual.norm() < 1e-12, "Residual {}", residual.norm());
    }

    #[test]
    fn test_singular_matrix_is_reported() {
        let singular = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let err = LinearSystem::factorize(singular).err().unwrap();
        assert!(
            matches!(
                err,
                crate::error::AeroError::Solve(SolveFailure::SingularMatrix { .. })
            ),
            "Unexpected error {err:?}"
        );
    }
}
