//! Row-parallel assembly of dense influence matrices and vectors.
//!
//! Rows are independent: each worker fills its own row of a row-major buffer
//! and reads only shared immutable geometry.

use super::ProfilerScope;
use crate::core_types::Vec3;
use crate::error::{AeroResult, SolveFailure};
use crate::wake::WakeColumn;
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Builds an `n_rows × n_cols` matrix from a per-row fill function.
///
/// # Errors
///
/// [`SolveFailure::NumericalError`] at the first non-finite coefficient.
pub fn assemble_matrix<F>(
    n_rows: usize,
    n_cols: usize,
    multithread: bool,
    fill_row: F,
) -> AeroResult<DMatrix<f64>>
where
    F: Fn(usize, &mut [f64]) + Sync + Send,
{
    let _scope = ProfilerScope::new("influence rows", n_rows);
    let mut buffer = vec![0.0; n_rows * n_cols];
    if n_cols > 0 {
        if multithread {
            buffer
                .par_chunks_mut(n_cols)
                .enumerate()
                .for_each(|(row, values)| fill_row(row, values));
        } else {
            buffer
                .chunks_mut(n_cols)
                .enumerate()
                .for_each(|(row, values)| fill_row(row, values));
        }
    }

    if let Some(k) = buffer.iter().position(|v| !v.is_finite()) {
        return Err(SolveFailure::NumericalError {
            row: k / n_cols,
            col: k % n_cols,
        }
        .into());
    }
    Ok(DMatrix::from_row_slice(n_rows, n_cols, &buffer))
}

/// Evaluates `value` for every index.
pub fn assemble_vector<T, F>(n: usize, multithread: bool, value: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    if multithread {
        (0..n).into_par_iter().map(value).collect()
    } else {
        (0..n).map(value).collect()
    }
}

/// Evaluates a velocity field at many points.
pub fn evaluate_points<F>(points: &[Vec3], multithread: bool, field: F) -> Vec<Vec3>
where
    F: Fn(&Vec3) -> Vec3 + Sync + Send,
{
    assemble_vector(points.len(), multithread, |k| field(&points[k]))
}

/// Adds the wake column influences to the columns of their shedding panels.
pub fn add_wake_columns<F>(row: &mut [f64], columns: &[WakeColumn], unit_influence: F)
where
    F: Fn(&WakeColumn) -> f64,
{
    for column in columns {
        let influence = unit_influence(column);
        for &(panel, sign) in &column.shedding {
            row[panel] += sign * influence;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_and_serial_assembly_match() {
        let fill = |row: usize, values: &mut [f64]| {
            for (col, v) in values.iter_mut().enumerate() {
                *v = 1.0 / (1.0 + row as f64 + 2.0 * col as f64);
            }
        };
        let serial = assemble_matrix(5, 4, false, fill).unwrap();
        let parallel = assemble_matrix(5, 4, true, fill).unwrap();

        assert_eq!(serial, parallel);
        assert_eq!(serial[(2, 3)], 1.0 / 9.0);
    }

    #[test]
    fn test_non_finite_coefficient_is_located() {
        let err = assemble_matrix(3, 3, true, |row, values| {
            values.fill(1.0);
            if row == 2 {
                values[1] = f64::NAN;
            }
        })
        .unwrap_err();
        assert!(
            matches!(
                err,
                crate::error::AeroError::Solve(SolveFailure::NumericalError { row: 2, col: 1 })
            ),
            "Unexpected error {err:?}"
        );
    }

    #[test]
    fn test_vector_order_is_preserved() {
        let values = assemble_vector(100, true, |k| k * k);
        assert_eq!(values[7], 49);
        assert_eq!(values.len(), 100);
    }
}
