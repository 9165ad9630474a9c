//! Dense linear-system backends for the DC flow solve.
//!
//! The DC approximation reduces a snapshot solve to one `B' theta = P`
//! system per connected component. Systems stay small (bus count per
//! component), so dense backends are sufficient; swap in [`FaerSolver`] for
//! LU with partial pivoting or [`GaussSolver`] when a dependency-free
//! elimination is preferred in tests.

use anyhow::{anyhow, Result};
use faer::{prelude::*, solvers::PartialPivLu, Mat};

/// Trait for solving dense linear systems (Ax = b).
pub trait LinearSystemBackend: Send + Sync {
    /// Solve the linear system Ax = b
    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>>;
}

fn check_shape(matrix: &[Vec<f64>], rhs: &[f64]) -> Result<usize> {
    let n = matrix.len();
    if rhs.len() != n {
        return Err(anyhow!(
            "rhs length ({}) does not match matrix dimension {}",
            rhs.len(),
            n
        ));
    }
    if matrix.iter().any(|row| row.len() != n) {
        return Err(anyhow!("matrix must be square"));
    }
    Ok(n)
}

/// Gaussian elimination with partial pivoting. No external dependencies;
/// the default backend for unit tests and tiny systems.
#[derive(Debug, Clone, Default)]
pub struct GaussSolver;

impl LinearSystemBackend for GaussSolver {
    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>> {
        let n = check_shape(matrix, rhs)?;
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut a = matrix.to_vec();
        let mut b = rhs.to_vec();

        for i in 0..n {
            let mut pivot = i;
            for row in i + 1..n {
                if a[row][i].abs() > a[pivot][i].abs() {
                    pivot = row;
                }
            }
            if pivot != i {
                a.swap(i, pivot);
                b.swap(i, pivot);
            }

            let diag = a[i][i];
            if diag.abs() < 1e-12 {
                return Err(anyhow!("singular matrix"));
            }

            for value in a[i][i..].iter_mut() {
                *value /= diag;
            }
            b[i] /= diag;

            let pivot_segment = a[i][i..].to_vec();
            for row in 0..n {
                if row == i {
                    continue;
                }
                let factor = a[row][i];
                for (target, &pivot_value) in a[row][i..].iter_mut().zip(pivot_segment.iter()) {
                    *target -= factor * pivot_value;
                }
                b[row] -= factor * b[i];
            }
        }

        Ok(b)
    }
}

/// LU factorization with partial pivoting via `faer`.
#[derive(Debug, Clone, Default)]
pub struct FaerSolver;

impl LinearSystemBackend for FaerSolver {
    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>> {
        let n = check_shape(matrix, rhs)?;
        if n == 0 {
            return Ok(Vec::new());
        }

        let mat = Mat::from_fn(n, n, |i, j| matrix[i][j]);
        let rhs_mat = Mat::from_fn(n, 1, |i, _| rhs[i]);
        let lu = PartialPivLu::new(mat.as_ref());
        let sol = lu.solve(&rhs_mat);

        let mut solution = Vec::with_capacity(n);
        for i in 0..n {
            solution.push(sol.read(i, 0));
        }
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve_2x2(backend: &dyn LinearSystemBackend) -> Vec<f64> {
        // 2x + y = 5, x + 3y = 10 -> x = 1, y = 3
        let matrix = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        backend.solve(&matrix, &[5.0, 10.0]).unwrap()
    }

    #[test]
    fn test_gauss_solver() {
        let x = solve_2x2(&GaussSolver);
        assert!((x[0] - 1.0).abs() < 1e-9);
        assert!((x[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_faer_solver() {
        let x = solve_2x2(&FaerSolver);
        assert!((x[0] - 1.0).abs() < 1e-9);
        assert!((x[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_gauss_rejects_singular() {
        let matrix = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(GaussSolver.solve(&matrix, &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_shape_mismatch() {
        let matrix = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert!(GaussSolver.solve(&matrix, &[1.0]).is_err());
        let ragged = vec![vec![1.0], vec![3.0, 4.0]];
        assert!(FaerSolver.solve(&ragged, &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_empty_system() {
        let empty: Vec<Vec<f64>> = Vec::new();
        assert!(GaussSolver.solve(&empty, &[]).unwrap().is_empty());
    }
}
